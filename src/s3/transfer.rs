//! # S3 Transfer
//!
//! Higher-level transfer operations (upload with ACL, prefix download, copy)
//! composed from the low-level blocking [`S3Client`] calls. [`S3Transfer`] is
//! the blocking provider the S3 bridge dispatches to.

use bytes::Bytes;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::types::{
    CopyObjectRequest, CopyObjectResult, CopyOutcome, DownloadOutcome, DownloadRequest, PutObjectRequest,
    PutObjectResult, S3ObjectSummary, S3Request, S3Result, SetObjectAclRequest, UploadOutcome,
};
use crate::bridge::BlockingProvider;
use crate::error::ProviderError;

/// Low-level blocking S3 API
pub trait S3Client: Send + Sync {
    fn put_object(&self, request: &PutObjectRequest) -> Result<PutObjectResult, ProviderError>;

    fn set_object_acl(&self, request: &SetObjectAclRequest) -> Result<(), ProviderError>;

    fn copy_object(&self, request: &CopyObjectRequest) -> Result<CopyObjectResult, ProviderError>;

    /// Every object whose key starts with `prefix`
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<S3ObjectSummary>, ProviderError>;

    fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, ProviderError>;

    fn bucket_exists(&self, _bucket: &str) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Transfer manager over an [`S3Client`]
pub struct S3Transfer<C: ?Sized> {
    client: Arc<C>,
}

impl<C: S3Client + ?Sized> S3Transfer<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    fn upload(&self, request: &PutObjectRequest) -> Result<UploadOutcome, ProviderError> {
        let result = self.client.put_object(request)?;
        if let Some(canned_acl) = request.canned_acl {
            self.client.set_object_acl(&SetObjectAclRequest {
                bucket: request.bucket.clone(),
                key: request.key.clone(),
                canned_acl,
            })?;
            debug!(bucket = %request.bucket, key = %request.key, acl = canned_acl.header_value(), "Applied object ACL");
        }
        Ok(UploadOutcome {
            bucket: request.bucket.clone(),
            key: request.key.clone(),
            result,
            acl_applied: request.canned_acl,
        })
    }

    fn download(&self, request: &DownloadRequest) -> Result<DownloadOutcome, ProviderError> {
        let mut files = Vec::new();
        if request.directory {
            for summary in self.client.list_objects(&request.bucket, &request.key)? {
                // Folder placeholder objects have no content to write
                if summary.key.ends_with('/') {
                    continue;
                }
                let target = request.target.join(relative_key_path(&summary.key));
                self.fetch_to(&request.bucket, &summary.key, &target)?;
                files.push(target);
            }
        } else {
            self.fetch_to(&request.bucket, &request.key, &request.target)?;
            files.push(request.target.clone());
        }
        files.sort();
        Ok(DownloadOutcome {
            bucket: request.bucket.clone(),
            files,
        })
    }

    fn fetch_to(&self, bucket: &str, key: &str, target: &Path) -> Result<(), ProviderError> {
        let content = self.client.get_object(bucket, key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(ProviderError::from_source)?;
        }
        fs::write(target, &content).map_err(ProviderError::from_source)?;
        debug!(bucket, key, target = %target.display(), bytes = content.len(), "Downloaded object");
        Ok(())
    }

    fn copy(&self, request: &CopyObjectRequest) -> Result<CopyOutcome, ProviderError> {
        let result = self.client.copy_object(request)?;
        Ok(CopyOutcome {
            description: request.description(),
            result,
        })
    }
}

/// Local path for an object key, dropping empty and parent segments
fn relative_key_path(key: &str) -> PathBuf {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect()
}

impl<C: S3Client + ?Sized> BlockingProvider<S3Request> for S3Transfer<C> {
    type Output = S3Result;

    fn call(&self, request: &S3Request) -> Result<S3Result, ProviderError> {
        match request {
            S3Request::Upload(upload) => self.upload(upload).map(S3Result::Upload),
            S3Request::Download(download) => self.download(download).map(S3Result::Download),
            S3Request::Copy(copy) => self.copy(copy).map(S3Result::Copy),
        }
    }

    fn destination_exists(&self, bucket: &str) -> Result<bool, ProviderError> {
        self.client.bucket_exists(bucket)
    }
}
