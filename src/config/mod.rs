//! # Bridge Configuration
//!
//! Typed configuration for the Kinesis, S3 and SQS bridges plus logging.
//! Loaded from `config/bridge-config.yaml` by [`ConfigManager`], with
//! environment sections and `AWS_BRIDGE__SECTION__FIELD` variables layered on
//! top. Everything here is read once at wiring time.

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{detect_environment, ConfigManager};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::{BlockingMode, BridgeSettings};
use crate::constants::defaults;
use crate::s3::{CannedAcl, S3Command};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub kinesis: KinesisConfig,
    pub s3: S3Config,
    pub sqs: SqsConfig,
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Check cross-field constraints the types cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        validate_destination("kinesis.stream", self.kinesis.stream.as_deref())?;
        validate_timeout("kinesis.send_timeout_ms", self.kinesis.send_timeout_ms)?;

        validate_destination("s3.bucket", self.s3.bucket.as_deref())?;
        validate_timeout("s3.send_timeout_ms", self.s3.send_timeout_ms)?;

        validate_destination("sqs.queue", self.sqs.queue.as_deref())?;
        validate_timeout("sqs.send_timeout_ms", self.sqs.send_timeout_ms)?;
        if let Some(delay) = self.sqs.delay_seconds {
            if delay > defaults::SQS_MAX_DELAY_SECONDS {
                return Err(ConfigurationError::invalid_value(
                    "sqs.delay_seconds",
                    delay.to_string(),
                    format!("must be at most {}", defaults::SQS_MAX_DELAY_SECONDS),
                ));
            }
        }

        if let Some(level) = &self.logging.level {
            if level.trim().is_empty() {
                return Err(ConfigurationError::validation_error(
                    "logging.level must not be blank when set",
                ));
            }
        }
        Ok(())
    }
}

fn validate_destination(field: &str, value: Option<&str>) -> ConfigResult<()> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigurationError::invalid_value(
            field,
            v,
            "must not be blank when set",
        )),
        _ => Ok(()),
    }
}

fn validate_timeout(field: &str, value: Option<u64>) -> ConfigResult<()> {
    match value {
        Some(0) => Err(ConfigurationError::invalid_value(field, "0", "must be positive")),
        _ => Ok(()),
    }
}

fn settings(sync: bool, send_timeout_ms: Option<u64>, fail_fast: bool) -> BridgeSettings {
    BridgeSettings {
        sync,
        send_timeout: send_timeout_ms.map(Duration::from_millis),
        fail_fast,
    }
}

/// Kinesis bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinesisConfig {
    /// Static stream name; the `aws_stream` header overrides it per message
    pub stream: Option<String>,
    pub sync: bool,
    pub send_timeout_ms: Option<u64>,
    pub fail_fast: bool,
}

impl KinesisConfig {
    pub fn settings(&self) -> BridgeSettings {
        settings(self.sync, self.send_timeout_ms, self.fail_fast)
    }
}

/// S3 bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: Option<String>,
    /// Fixed command; when unset the `s3Command` header decides
    pub command: Option<S3Command>,
    pub blocking_mode: BlockingMode,
    /// Canned ACL applied to uploaded objects
    pub acl: Option<CannedAcl>,
    /// Default download target for non-file payloads
    pub download_directory: Option<PathBuf>,
    pub sync: bool,
    pub send_timeout_ms: Option<u64>,
    pub fail_fast: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: None,
            command: None,
            blocking_mode: BlockingMode::Pool,
            acl: None,
            download_directory: None,
            sync: true,
            send_timeout_ms: None,
            fail_fast: false,
        }
    }
}

impl S3Config {
    pub fn settings(&self) -> BridgeSettings {
        settings(self.sync, self.send_timeout_ms, self.fail_fast)
    }
}

/// SQS bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqsConfig {
    /// Static queue URL or name; the `aws_queue` header overrides it
    pub queue: Option<String>,
    pub delay_seconds: Option<u32>,
    pub message_group_id: Option<String>,
    /// Headers copied into SQS message attributes
    pub attribute_headers: Vec<String>,
    pub sync: bool,
    pub send_timeout_ms: Option<u64>,
    pub fail_fast: bool,
}

impl SqsConfig {
    pub fn settings(&self) -> BridgeSettings {
        settings(self.sync, self.send_timeout_ms, self.fail_fast)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; defaults by environment when unset
    pub level: Option<String>,
    /// Directory for JSON log files, `log` when unset
    pub directory: Option<PathBuf>,
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            directory: None,
            file_output: true,
        }
    }
}
