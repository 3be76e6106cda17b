//! S3 commands, requests and results.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::messaging::StreamPayload;

/// Operation performed by the S3 bridge for a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum S3Command {
    #[default]
    Upload,
    Download,
    Copy,
}

impl S3Command {
    /// Parse a command name, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upload" => Some(S3Command::Upload),
            "download" => Some(S3Command::Download),
            "copy" => Some(S3Command::Copy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            S3Command::Upload => "upload",
            S3Command::Download => "download",
            S3Command::Copy => "copy",
        }
    }
}

impl fmt::Display for S3Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canned access control list applied to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl CannedAcl {
    /// Value of the `x-amz-acl` header
    pub fn header_value(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Object metadata sent with an upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub content_length: Option<u64>,
    /// Base64-encoded MD5 digest of the body
    pub content_md5: Option<String>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub user_metadata: BTreeMap<String, String>,
}

/// Upload body
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectBody {
    /// Read from the local file at send time
    File(PathBuf),
    Bytes(Bytes),
    Stream(StreamPayload),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: ObjectBody,
    pub metadata: ObjectMetadata,
    /// Applied with a separate call once the upload succeeds
    pub canned_acl: Option<CannedAcl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetObjectAclRequest {
    pub bucket: String,
    pub key: String,
    pub canned_acl: CannedAcl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyObjectRequest {
    pub source_bucket: String,
    pub source_key: String,
    pub destination_bucket: String,
    pub destination_key: String,
}

impl CopyObjectRequest {
    pub fn description(&self) -> String {
        format!(
            "Copying object from {}/{} to {}/{}",
            self.source_bucket, self.source_key, self.destination_bucket, self.destination_key
        )
    }
}

/// Download one object, or every object under a prefix into a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub bucket: String,
    /// Object key, or key prefix for directory downloads
    pub key: String,
    pub target: PathBuf,
    pub directory: bool,
}

/// Listing entry for an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3ObjectSummary {
    pub bucket: String,
    pub key: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutObjectResult {
    pub etag: Option<String>,
    pub version_id: Option<String>,
    pub content_md5: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyObjectResult {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub bucket: String,
    pub key: String,
    pub result: PutObjectResult,
    pub acl_applied: Option<CannedAcl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    pub bucket: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOutcome {
    pub description: String,
    pub result: CopyObjectResult,
}

/// Request handled by the S3 transfer provider
#[derive(Debug, Clone, PartialEq)]
pub enum S3Request {
    Upload(PutObjectRequest),
    Download(DownloadRequest),
    Copy(CopyObjectRequest),
}

impl S3Request {
    /// Bucket the request reads from or writes to
    pub fn bucket(&self) -> &str {
        match self {
            S3Request::Upload(request) => &request.bucket,
            S3Request::Download(request) => &request.bucket,
            S3Request::Copy(request) => &request.source_bucket,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            S3Request::Upload(request) => &request.key,
            S3Request::Download(request) => &request.key,
            S3Request::Copy(request) => &request.source_key,
        }
    }

    pub fn command(&self) -> S3Command {
        match self {
            S3Request::Upload(_) => S3Command::Upload,
            S3Request::Download(_) => S3Command::Download,
            S3Request::Copy(_) => S3Command::Copy,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            S3Request::Upload(_) => "put_object",
            S3Request::Download(_) => "get_object",
            S3Request::Copy(_) => "copy_object",
        }
    }
}

impl From<PutObjectRequest> for S3Request {
    fn from(value: PutObjectRequest) -> Self {
        S3Request::Upload(value)
    }
}

impl From<DownloadRequest> for S3Request {
    fn from(value: DownloadRequest) -> Self {
        S3Request::Download(value)
    }
}

impl From<CopyObjectRequest> for S3Request {
    fn from(value: CopyObjectRequest) -> Self {
        S3Request::Copy(value)
    }
}

/// Result reported by the S3 transfer provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum S3Result {
    Upload(UploadOutcome),
    Download(DownloadOutcome),
    Copy(CopyOutcome),
}
