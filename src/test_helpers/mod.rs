// Test Helpers Module - Stub AWS clients
//
// Scripted in-memory providers used by unit tests, integration tests and
// benchmarks in place of the real Kinesis, S3 and SQS clients.

pub mod stub_provider;
pub mod stub_s3;

pub use stub_provider::{kinesis_stub, sqs_stub, Reply, StubKinesisClient, StubProvider, StubSqsClient, STUB_SHARD_ID};
pub use stub_s3::StubS3Client;
