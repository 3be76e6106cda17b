//! In-memory [`S3Client`] for tests.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs;
use std::thread;
use std::time::Duration;

use crate::error::ProviderError;
use crate::s3::{
    content_md5, CopyObjectRequest, CopyObjectResult, ObjectBody, PutObjectRequest, PutObjectResult, S3Client,
    S3ObjectSummary, SetObjectAclRequest,
};

/// Bucket/key keyed object store recording every mutating call
#[derive(Debug, Default)]
pub struct StubS3Client {
    objects: Mutex<BTreeMap<(String, String), Bytes>>,
    puts: Mutex<Vec<PutObjectRequest>>,
    acls: Mutex<Vec<SetObjectAclRequest>>,
    copies: Mutex<Vec<CopyObjectRequest>>,
    failures: Mutex<VecDeque<String>>,
    missing_buckets: Mutex<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
}

impl StubS3Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object
    pub fn insert(&self, bucket: &str, key: &str, content: impl Into<Bytes>) {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), content.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Fail the next client call with this message
    pub fn fail_next(&self, message: impl Into<String>) {
        self.failures.lock().push_back(message.into());
    }

    /// Block every put for this long before answering
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn mark_missing(&self, bucket: impl Into<String>) {
        self.missing_buckets.lock().insert(bucket.into());
    }

    pub fn puts(&self) -> Vec<PutObjectRequest> {
        self.puts.lock().clone()
    }

    pub fn acls(&self) -> Vec<SetObjectAclRequest> {
        self.acls.lock().clone()
    }

    pub fn copies(&self) -> Vec<CopyObjectRequest> {
        self.copies.lock().clone()
    }

    fn check_failure(&self) -> Result<(), ProviderError> {
        match self.failures.lock().pop_front() {
            Some(message) => Err(ProviderError::new(message)),
            None => Ok(()),
        }
    }
}

fn read_body(body: &ObjectBody) -> Result<Bytes, ProviderError> {
    match body {
        ObjectBody::File(path) => fs::read(path).map(Bytes::from).map_err(ProviderError::from_source),
        ObjectBody::Bytes(bytes) => Ok(bytes.clone()),
        ObjectBody::Stream(stream) => stream.read_all().map_err(ProviderError::from_source),
    }
}

impl S3Client for StubS3Client {
    fn put_object(&self, request: &PutObjectRequest) -> Result<PutObjectResult, ProviderError> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            thread::sleep(latency);
        }
        self.check_failure()?;
        let content = read_body(&request.body)?;
        let etag = content_md5(&content);
        self.insert(&request.bucket, &request.key, content);
        self.puts.lock().push(request.clone());
        Ok(PutObjectResult {
            etag: Some(etag),
            version_id: None,
            content_md5: request.metadata.content_md5.clone(),
        })
    }

    fn set_object_acl(&self, request: &SetObjectAclRequest) -> Result<(), ProviderError> {
        self.check_failure()?;
        self.acls.lock().push(request.clone());
        Ok(())
    }

    fn copy_object(&self, request: &CopyObjectRequest) -> Result<CopyObjectResult, ProviderError> {
        self.check_failure()?;
        let content = self
            .object(&request.source_bucket, &request.source_key)
            .ok_or_else(|| {
                ProviderError::with_code(
                    "NoSuchKey",
                    format!("{}/{} does not exist", request.source_bucket, request.source_key),
                )
            })?;
        let etag = content_md5(&content);
        self.insert(&request.destination_bucket, &request.destination_key, content);
        self.copies.lock().push(request.clone());
        Ok(CopyObjectResult {
            etag: Some(etag),
            last_modified: Some(chrono::Utc::now()),
        })
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<S3ObjectSummary>, ProviderError> {
        self.check_failure()?;
        Ok(self
            .objects
            .lock()
            .iter()
            .filter(|((b, key), _)| b == bucket && key.starts_with(prefix))
            .map(|((b, key), content)| S3ObjectSummary {
                bucket: b.clone(),
                key: key.clone(),
                size: content.len() as u64,
            })
            .collect())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, ProviderError> {
        self.check_failure()?;
        self.object(bucket, key)
            .ok_or_else(|| ProviderError::with_code("NoSuchKey", format!("{bucket}/{key} does not exist")))
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool, ProviderError> {
        Ok(!self.missing_buckets.lock().contains(bucket))
    }
}
