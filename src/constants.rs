//! # Bridge Constants
//!
//! Header names shared by every adapter and the defaults used when a handler
//! is built without explicit configuration.

/// Message header names read by request builders and written on replies.
///
/// The `aws_` prefix keeps bridge headers apart from application headers.
pub mod headers {
    /// Kinesis stream name
    pub const STREAM: &str = "aws_stream";
    /// Kinesis partition key
    pub const PARTITION_KEY: &str = "aws_partitionKey";
    /// Kinesis sequence number (ordering on send, assigned on reply)
    pub const SEQUENCE_NUMBER: &str = "aws_sequenceNumber";
    /// Kinesis shard that accepted the record
    pub const SHARD: &str = "aws_shard";

    /// SQS queue name or URL
    pub const QUEUE: &str = "aws_queue";
    /// Provider-assigned message id
    pub const MESSAGE_ID: &str = "aws_messageId";
    /// SQS FIFO message group id
    pub const MESSAGE_GROUP_ID: &str = "aws_messageGroupId";
    /// SQS FIFO deduplication id
    pub const MESSAGE_DEDUPLICATION_ID: &str = "aws_messageDeduplicationId";
    /// SQS delivery delay in seconds
    pub const DELAY: &str = "aws_delay";

    /// S3 bucket
    pub const BUCKET: &str = "aws_bucket";
    /// S3 object key
    pub const KEY: &str = "aws_key";
    /// S3 entity tag returned on upload or copy
    pub const ETAG: &str = "aws_etag";
    /// S3 command selecting upload, download or copy
    pub const S3_COMMAND: &str = "s3Command";

    /// Serialized provider result for batch replies
    pub const SERVICE_RESULT: &str = "aws_serviceResult";
}

/// Default values for handler configuration
pub mod defaults {
    /// Maximum records accepted by a single Kinesis `PutRecords` call
    pub const KINESIS_MAX_BATCH_RECORDS: usize = 500;

    /// Maximum entries accepted by a single SQS `SendMessageBatch` call
    pub const SQS_MAX_BATCH_ENTRIES: usize = 10;

    /// Largest delay SQS accepts for a single message (seconds)
    pub const SQS_MAX_DELAY_SECONDS: u32 = 900;

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "AWS_BRIDGE";
}

/// Component names used in structured logs and configuration errors
pub mod components {
    pub const KINESIS: &str = "kinesis";
    pub const S3: &str = "s3";
    pub const SQS: &str = "sqs";
    pub const COMPLETION: &str = "completion";
}
