//! Kinesis request and result values.

use bytes::Bytes;
use serde::Serialize;

/// Put a single record on a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecordRequest {
    pub stream_name: String,
    pub partition_key: String,
    pub data: Bytes,
    pub sequence_number_for_ordering: Option<String>,
    pub explicit_hash_key: Option<String>,
}

impl PutRecordRequest {
    pub fn new(stream_name: impl Into<String>, partition_key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            stream_name: stream_name.into(),
            partition_key: partition_key.into(),
            data: data.into(),
            sequence_number_for_ordering: None,
            explicit_hash_key: None,
        }
    }

    pub fn with_sequence_number_for_ordering(mut self, sequence_number: impl Into<String>) -> Self {
        self.sequence_number_for_ordering = Some(sequence_number.into());
        self
    }

    pub fn with_explicit_hash_key(mut self, hash_key: impl Into<String>) -> Self {
        self.explicit_hash_key = Some(hash_key.into());
        self
    }
}

/// One record of a batch put
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecordsRequestEntry {
    pub data: Bytes,
    pub partition_key: String,
    pub explicit_hash_key: Option<String>,
}

impl PutRecordsRequestEntry {
    pub fn new(partition_key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            partition_key: partition_key.into(),
            explicit_hash_key: None,
        }
    }
}

/// Put a batch of records on a stream in one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecordsRequest {
    pub stream_name: String,
    pub records: Vec<PutRecordsRequestEntry>,
}

impl PutRecordsRequest {
    pub fn new(stream_name: impl Into<String>, records: Vec<PutRecordsRequestEntry>) -> Self {
        Self {
            stream_name: stream_name.into(),
            records,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRecordResult {
    pub shard_id: String,
    pub sequence_number: String,
    pub encryption_type: Option<String>,
}

/// Per-record outcome of a batch put
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRecordsResultEntry {
    pub shard_id: Option<String>,
    pub sequence_number: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl PutRecordsResultEntry {
    pub fn succeeded(shard_id: impl Into<String>, sequence_number: impl Into<String>) -> Self {
        Self {
            shard_id: Some(shard_id.into()),
            sequence_number: Some(sequence_number.into()),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            shard_id: None,
            sequence_number: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error_code.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRecordsResult {
    pub failed_record_count: usize,
    pub records: Vec<PutRecordsResultEntry>,
}

impl PutRecordsResult {
    pub fn new(records: Vec<PutRecordsResultEntry>) -> Self {
        let failed_record_count = records.iter().filter(|r| r.is_failure()).count();
        Self {
            failed_record_count,
            records,
        }
    }
}

/// Request accepted by a Kinesis provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KinesisRequest {
    PutRecord(PutRecordRequest),
    PutRecords(PutRecordsRequest),
}

impl KinesisRequest {
    pub fn stream_name(&self) -> &str {
        match self {
            KinesisRequest::PutRecord(request) => &request.stream_name,
            KinesisRequest::PutRecords(request) => &request.stream_name,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            KinesisRequest::PutRecord(_) => "put_record",
            KinesisRequest::PutRecords(_) => "put_records",
        }
    }

    pub fn record_count(&self) -> usize {
        match self {
            KinesisRequest::PutRecord(_) => 1,
            KinesisRequest::PutRecords(request) => request.records.len(),
        }
    }
}

impl From<PutRecordRequest> for KinesisRequest {
    fn from(value: PutRecordRequest) -> Self {
        KinesisRequest::PutRecord(value)
    }
}

impl From<PutRecordsRequest> for KinesisRequest {
    fn from(value: PutRecordsRequest) -> Self {
        KinesisRequest::PutRecords(value)
    }
}

/// Result reported by a Kinesis provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KinesisResult {
    PutRecord(PutRecordResult),
    PutRecords(PutRecordsResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accessors() {
        let single: KinesisRequest = PutRecordRequest::new("foo", "fooKey", &b"message"[..])
            .with_sequence_number_for_ordering("10")
            .into();
        assert_eq!(single.stream_name(), "foo");
        assert_eq!(single.operation(), "put_record");
        assert_eq!(single.record_count(), 1);

        let batch: KinesisRequest = PutRecordsRequest::new(
            "foo",
            vec![
                PutRecordsRequestEntry::new("k1", &b"a"[..]),
                PutRecordsRequestEntry::new("k2", &b"b"[..]),
            ],
        )
        .into();
        assert_eq!(batch.operation(), "put_records");
        assert_eq!(batch.record_count(), 2);
    }

    #[test]
    fn test_batch_result_counts_failures() {
        let result = PutRecordsResult::new(vec![
            PutRecordsResultEntry::succeeded("shard-1", "1"),
            PutRecordsResultEntry::failed("ProvisionedThroughputExceededException", "slow down"),
        ]);
        assert_eq!(result.failed_record_count, 1);

        let json = serde_json::to_value(KinesisResult::PutRecords(result)).unwrap();
        assert_eq!(json["failedRecordCount"], 1);
        assert_eq!(json["records"][0]["shardId"], "shard-1");
    }
}
