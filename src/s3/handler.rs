//! # S3 Message Handler
//!
//! Builds upload, download and copy requests from messages and dispatches
//! them to an [`S3Transfer`] through a blocking dispatcher.
//!
//! Uploads carry content length, base64 MD5 and content type computed before
//! the request is sent. A caller-supplied [`UploadMetadataProvider`] runs
//! first; computed values only fill what it left unset.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use md5::{Digest, Md5};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::transfer::{S3Client, S3Transfer};
use super::types::{
    CannedAcl, CopyObjectRequest, DownloadRequest, ObjectBody, ObjectMetadata, PutObjectRequest, S3Command,
    S3Request, S3Result,
};
use crate::bridge::{
    header_then_resolver, payload_bytes, BlockingDispatcher, BlockingMode, BlockingProvider, BridgeAdapter,
    BridgeHandler, BridgeSettings, Resolver, ResultRouter,
};
use crate::config::S3Config;
use crate::constants::{components, headers};
use crate::error::{BridgeError, BridgeResult};
use crate::messaging::{ChannelRef, Message, MessageBuilder, Payload, ProviderRequest, ProviderResult, StreamPayload};

type S3TransferRef = Arc<dyn BlockingProvider<S3Request, Output = S3Result>>;

/// Hook that customizes upload metadata before defaults are computed
pub trait UploadMetadataProvider: Send + Sync {
    fn populate(&self, metadata: &mut ObjectMetadata, message: &Message);
}

impl<F> UploadMetadataProvider for F
where
    F: Fn(&mut ObjectMetadata, &Message) + Send + Sync,
{
    fn populate(&self, metadata: &mut ObjectMetadata, message: &Message) {
        self(metadata, message)
    }
}

/// Request building and reply enrichment for S3
pub struct S3Adapter {
    static_bucket: Option<String>,
    bucket: Option<Resolver<String>>,
    command: Resolver<S3Command>,
    key: Option<Resolver<String>>,
    destination_bucket: Option<Resolver<String>>,
    destination_key: Option<Resolver<String>>,
    acl: Option<Resolver<CannedAcl>>,
    metadata_provider: Option<Arc<dyn UploadMetadataProvider>>,
    download_directory: Option<PathBuf>,
}

impl fmt::Debug for S3Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Adapter")
            .field("static_bucket", &self.static_bucket)
            .field("command", &self.command)
            .field("key", &self.key)
            .field("acl", &self.acl)
            .field("metadata_provider", &self.metadata_provider.is_some())
            .finish_non_exhaustive()
    }
}

/// Command resolver reading the `s3Command` header, defaulting to upload
pub fn command_from_header() -> Resolver<S3Command> {
    Resolver::try_new(|message: &Message| match message.headers().get_string(headers::S3_COMMAND) {
        None => Ok(Some(S3Command::Upload)),
        Some(name) => S3Command::parse(&name).map(Some).ok_or_else(|| {
            BridgeError::configuration(components::S3, format!("Unknown S3 command '{name}'"))
        }),
    })
}

impl S3Adapter {
    fn resolve_bucket(&self, message: &Message) -> BridgeResult<String> {
        header_then_resolver(message, headers::BUCKET, self.bucket.as_ref())?.ok_or_else(|| {
            BridgeError::configuration(components::S3, "'bucket' must not be null for S3 operations")
        })
    }

    fn resolve_key(&self, message: &Message) -> BridgeResult<Option<String>> {
        match &self.key {
            Some(resolver) => Ok(resolver.resolve(message)?.filter(|k| !k.is_empty())),
            None => Ok(None),
        }
    }

    fn build_upload(&self, message: &Message) -> BridgeResult<PutObjectRequest> {
        let bucket = self.resolve_bucket(message)?;
        let payload = message.payload();
        let key = match (self.resolve_key(message)?, payload) {
            (Some(key), _) => key,
            (None, Payload::File(path)) => file_name(path)?,
            (None, _) => {
                return Err(BridgeError::configuration(
                    components::S3,
                    "Specify a 'key' resolver for non-file payloads",
                ))
            }
        };

        let mut metadata = ObjectMetadata::default();
        if let Some(provider) = &self.metadata_provider {
            provider.populate(&mut metadata, message);
        }

        let body = match payload {
            Payload::File(path) => {
                let (length, md5) = digest_file(path)?;
                metadata.content_length.get_or_insert(length);
                metadata.content_md5.get_or_insert(md5);
                metadata.content_type.get_or_insert_with(|| {
                    mime_guess::from_path(path)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string()
                });
                ObjectBody::File(path.clone())
            }
            Payload::Stream(stream @ StreamPayload::Unbuffered(_)) => {
                if metadata.content_md5.is_none() {
                    return Err(BridgeError::unsupported_payload(
                        payload.type_name(),
                        "Stream payloads must be resettable unless an UploadMetadataProvider supplies the content MD5",
                    ));
                }
                metadata
                    .content_type
                    .get_or_insert_with(|| mime::APPLICATION_OCTET_STREAM.to_string());
                ObjectBody::Stream(stream.clone())
            }
            Payload::Stream(StreamPayload::Resettable(bytes)) => {
                fill_digest(&mut metadata, bytes, mime::APPLICATION_OCTET_STREAM.as_ref());
                ObjectBody::Stream(StreamPayload::Resettable(bytes.clone()))
            }
            Payload::Text(_) => {
                let bytes = payload_bytes(payload)?;
                fill_digest(&mut metadata, &bytes, mime::TEXT_PLAIN_UTF_8.as_ref());
                ObjectBody::Bytes(bytes)
            }
            Payload::Object(_) => {
                let bytes = payload_bytes(payload)?;
                fill_digest(&mut metadata, &bytes, mime::APPLICATION_JSON.as_ref());
                ObjectBody::Bytes(bytes)
            }
            Payload::Bytes(bytes) => {
                fill_digest(&mut metadata, bytes, mime::APPLICATION_OCTET_STREAM.as_ref());
                ObjectBody::Bytes(bytes.clone())
            }
            other => {
                return Err(BridgeError::unsupported_payload(
                    other.type_name(),
                    "Upload payload must be a file, bytes, text, an object or a stream",
                ))
            }
        };

        let canned_acl = match &self.acl {
            Some(resolver) => resolver.resolve(message)?,
            None => None,
        };

        Ok(PutObjectRequest {
            bucket,
            key,
            body,
            metadata,
            canned_acl,
        })
    }

    fn build_download(&self, message: &Message) -> BridgeResult<DownloadRequest> {
        let bucket = self.resolve_bucket(message)?;
        let target = match message.payload() {
            Payload::File(path) => path.clone(),
            other => self.download_directory.clone().ok_or_else(|| {
                BridgeError::unsupported_payload(
                    other.type_name(),
                    "Download payload must be a file or directory path when no download directory is configured",
                )
            })?,
        };

        let key = self.resolve_key(message)?;
        if target.is_dir() {
            return Ok(DownloadRequest {
                bucket,
                key: key.unwrap_or_default(),
                target,
                directory: true,
            });
        }
        let key = match key {
            Some(key) => key,
            None => file_name(&target)?,
        };
        Ok(DownloadRequest {
            bucket,
            key,
            target,
            directory: false,
        })
    }

    fn build_copy(&self, message: &Message) -> BridgeResult<CopyObjectRequest> {
        let source_bucket = self.resolve_bucket(message)?;
        let source_key = self.resolve_key(message)?.ok_or_else(|| {
            BridgeError::configuration(components::S3, "'key' must not be null for an S3 copy")
        })?;
        let destination_bucket = require(self.destination_bucket.as_ref(), message, "destinationBucket")?;
        let destination_key = require(self.destination_key.as_ref(), message, "destinationKey")?;
        Ok(CopyObjectRequest {
            source_bucket,
            source_key,
            destination_bucket,
            destination_key,
        })
    }
}

fn require(resolver: Option<&Resolver<String>>, message: &Message, name: &str) -> BridgeResult<String> {
    let missing = || BridgeError::configuration(components::S3, format!("'{name}' must not be null for an S3 copy"));
    match resolver {
        Some(resolver) => resolver.resolve(message)?.filter(|v| !v.is_empty()).ok_or_else(missing),
        None => Err(missing()),
    }
}

fn file_name(path: &Path) -> BridgeResult<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            BridgeError::configuration(
                components::S3,
                format!("Cannot derive an object key from '{}'", path.display()),
            )
        })
}

/// Base64 MD5 of a byte slice
pub fn content_md5(bytes: &[u8]) -> String {
    BASE64.encode(Md5::digest(bytes))
}

fn digest_file(path: &Path) -> BridgeResult<(u64, String)> {
    let mut file = File::open(path).map_err(|e| BridgeError::io("open upload file", e))?;
    let mut hasher = Md5::new();
    let length = io::copy(&mut file, &mut hasher).map_err(|e| BridgeError::io("digest upload file", e))?;
    Ok((length, BASE64.encode(hasher.finalize())))
}

fn fill_digest(metadata: &mut ObjectMetadata, bytes: &Bytes, content_type: &str) {
    metadata.content_length.get_or_insert(bytes.len() as u64);
    metadata.content_md5.get_or_insert_with(|| content_md5(bytes));
    metadata
        .content_type
        .get_or_insert_with(|| content_type.to_string());
}

impl BridgeAdapter for S3Adapter {
    type Request = S3Request;
    type Output = S3Result;

    fn component(&self) -> &'static str {
        components::S3
    }

    fn build(&self, message: &Message) -> BridgeResult<Vec<S3Request>> {
        if let Some(request) = message.payload().as_request() {
            return match request {
                ProviderRequest::S3(request) => Ok(vec![request.clone()]),
                other => Err(BridgeError::unsupported_payload(
                    other.operation(),
                    "Only S3 requests can be passed through the S3 bridge",
                )),
            };
        }

        let command = self.command.resolve(message)?.unwrap_or_default();
        let request = match command {
            S3Command::Upload => S3Request::Upload(self.build_upload(message)?),
            S3Command::Download => S3Request::Download(self.build_download(message)?),
            S3Command::Copy => S3Request::Copy(self.build_copy(message)?),
        };
        Ok(vec![request])
    }

    fn success_message(&self, original: &Message, request: &S3Request, output: S3Result) -> Message {
        let etag = match &output {
            S3Result::Upload(outcome) => outcome.result.etag.clone(),
            S3Result::Copy(outcome) => outcome.result.etag.clone(),
            S3Result::Download(_) => None,
        };
        MessageBuilder::from_message(original)
            .payload(ProviderResult::S3(output))
            .header(headers::BUCKET, request.bucket())
            .header(headers::KEY, request.key())
            .header(headers::S3_COMMAND, request.command().as_str())
            .header_if_present(headers::ETAG, etag)
            .build()
    }

    fn static_destinations(&self) -> Vec<String> {
        self.static_bucket.iter().cloned().collect()
    }
}

/// The S3 bridge
pub type S3MessageHandler = BridgeHandler<S3Adapter>;

impl BridgeHandler<S3Adapter> {
    pub fn builder<C: S3Client + ?Sized + 'static>(client: Arc<C>) -> S3HandlerBuilder {
        S3HandlerBuilder::new(Arc::new(S3Transfer::new(client)))
    }
}

/// Builder for [`S3MessageHandler`]
pub struct S3HandlerBuilder {
    transfer: S3TransferRef,
    adapter: S3Adapter,
    blocking_mode: BlockingMode,
    router: ResultRouter,
    settings: BridgeSettings,
}

impl S3HandlerBuilder {
    fn new(transfer: S3TransferRef) -> Self {
        Self {
            transfer,
            adapter: S3Adapter {
                static_bucket: None,
                bucket: None,
                command: command_from_header(),
                key: None,
                destination_bucket: None,
                destination_key: None,
                acl: None,
                metadata_provider: None,
                download_directory: None,
            },
            blocking_mode: BlockingMode::default(),
            router: ResultRouter::new(components::S3),
            settings: BridgeSettings::synchronous(None),
        }
    }

    /// Pre-populate from an `s3` configuration section
    pub fn from_config(mut self, config: &S3Config) -> Self {
        if let Some(bucket) = &config.bucket {
            self = self.bucket(bucket.clone());
        }
        if let Some(command) = config.command {
            self = self.command(command);
        }
        if let Some(acl) = config.acl {
            self = self.acl(Resolver::literal(acl));
        }
        self.adapter.download_directory = config.download_directory.clone();
        self.blocking_mode = config.blocking_mode;
        self.settings = config.settings();
        self
    }

    /// Static bucket, also checked by the fail-fast existence check
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        self.adapter.bucket = Some(Resolver::literal(bucket.clone()));
        self.adapter.static_bucket = Some(bucket);
        self
    }

    pub fn bucket_resolver(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.bucket = Some(resolver);
        self.adapter.static_bucket = None;
        self
    }

    /// Fixed command for every message
    pub fn command(mut self, command: S3Command) -> Self {
        self.adapter.command = Resolver::literal(command);
        self
    }

    pub fn command_resolver(mut self, resolver: Resolver<S3Command>) -> Self {
        self.adapter.command = resolver;
        self
    }

    pub fn key(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.key = Some(resolver);
        self
    }

    pub fn destination_bucket(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.destination_bucket = Some(resolver);
        self
    }

    pub fn destination_key(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.destination_key = Some(resolver);
        self
    }

    pub fn acl(mut self, resolver: Resolver<CannedAcl>) -> Self {
        self.adapter.acl = Some(resolver);
        self
    }

    pub fn metadata_provider(mut self, provider: impl UploadMetadataProvider + 'static) -> Self {
        self.adapter.metadata_provider = Some(Arc::new(provider));
        self
    }

    pub fn download_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.adapter.download_directory = Some(directory.into());
        self
    }

    pub fn blocking_mode(mut self, mode: BlockingMode) -> Self {
        self.blocking_mode = mode;
        self
    }

    pub fn output_channel(mut self, channel: ChannelRef) -> Self {
        self.router = self.router.with_output_channel(channel);
        self
    }

    pub fn failure_channel(mut self, channel: ChannelRef) -> Self {
        self.router = self.router.with_failure_channel(channel);
        self
    }

    pub fn settings(mut self, settings: BridgeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> S3MessageHandler {
        let dispatcher = Arc::new(BlockingDispatcher::new(self.transfer, self.blocking_mode));
        BridgeHandler::new(self.adapter, dispatcher, self.router, self.settings)
    }
}
