//! # Structured Logging Module
//!
//! Environment-aware structured logging for the bridges: a console layer plus
//! an optional JSON file layer, and operation helpers that keep dispatch and
//! routing events uniform across the Kinesis, S3 and SQS adapters.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{detect_environment, LoggingConfig};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment defaults
pub fn init_structured_logging() {
    init_with_config(&LoggingConfig::default());
}

/// Initialize structured logging from a logging configuration
///
/// Only the first call has any effect. If another global subscriber is
/// already installed it is left in place.
pub fn init_with_config(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let log_level = config
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(&environment));

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(log_level.clone()));

        let pid = process::id();
        let mut log_path: Option<PathBuf> = None;
        let file_layer = match prepare_log_directory(config) {
            Some(log_dir) => {
                let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
                let log_filename = format!("{environment}.{pid}.{timestamp}.log");
                log_path = Some(log_dir.join(&log_filename));

                let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                // Keep the writer alive for the life of the process
                std::mem::forget(guard);

                Some(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(EnvFilter::new(log_level)),
                )
            }
            None => None,
        };

        let subscriber = tracing_subscriber::registry().with(console).with(file_layer);
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - keeping it");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = log_path.as_ref().map(|p| p.display().to_string()),
            "STRUCTURED LOGGING: initialized"
        );
    });
}

fn prepare_log_directory(config: &LoggingConfig) -> Option<PathBuf> {
    if !config.file_output {
        return None;
    }
    let log_dir = config
        .directory
        .clone()
        .unwrap_or_else(|| PathBuf::from("log"));
    match fs::create_dir_all(&log_dir) {
        Ok(()) => Some(log_dir),
        Err(e) => {
            eprintln!(
                "Failed to create log directory {}: {e}; logging to console only",
                log_dir.display()
            );
            None
        }
    }
}

/// Default log level for an environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" | "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Structured log macro for bridge events
///
/// ```rust
/// # use aws_channel_bridge::log_bridge;
/// log_bridge!(info, "dispatch", component: "kinesis", destination: "myStream");
/// log_bridge!(debug, "route_success");
/// ```
#[macro_export]
macro_rules! log_bridge {
    ($level:ident, $operation:expr, $($key:ident: $value:expr),+ $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            $($key = ?$value,)*
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "BRIDGE_{}", $operation
        );
    };
    ($level:ident, $operation:expr $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "BRIDGE_{}", $operation
        );
    };
}

/// Log one provider call leaving the bridge
pub fn log_dispatch_operation(
    component: &str,
    operation: &str,
    destination: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::debug!(
        component = %component,
        operation = %operation,
        destination = %destination,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "DISPATCH_OPERATION"
    );
}

/// Log where a completion was routed
pub fn log_routing_operation(
    component: &str,
    route: &str,
    channel: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::debug!(
        component = %component,
        route = %route,
        channel = channel,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "ROUTING_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
