//! # S3 Bridge
//!
//! Upload, download and copy of S3 objects driven by messages. The low-level
//! client is blocking, so requests run through a blocking dispatcher.

pub mod handler;
pub mod transfer;
pub mod types;

pub use handler::{command_from_header, content_md5, S3Adapter, S3HandlerBuilder, S3MessageHandler, UploadMetadataProvider};
pub use transfer::{S3Client, S3Transfer};
pub use types::{
    CannedAcl, CopyObjectRequest, CopyObjectResult, CopyOutcome, DownloadOutcome, DownloadRequest, ObjectBody,
    ObjectMetadata, PutObjectRequest, PutObjectResult, S3Command, S3ObjectSummary, S3Request, S3Result,
    SetObjectAclRequest, UploadOutcome,
};
