//! Configuration Loader
//!
//! Environment-aware configuration loading: YAML file discovery, environment
//! section merging and `AWS_BRIDGE__*` variable overrides.

use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

use super::error::{ConfigResult, ConfigurationError};
use super::BridgeConfig;
use crate::constants::defaults;

const CONFIG_FILE_NAMES: [&str; 2] = ["bridge-config.yaml", "bridge-config.yml"];
const ENVIRONMENTS: [&str; 3] = ["development", "test", "production"];

/// Detect the current environment from environment variables
pub fn detect_environment() -> String {
    env::var("AWS_BRIDGE_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: BridgeConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with an explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        crate::log_bridge!(info, "configuration_loaded",
            environment: environment,
            kinesis_stream: config.kinesis.stream.clone(),
            s3_bucket: config.s3.bucket.clone(),
            sqs_queue: config.sqs.queue.clone()
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn fallback() -> ConfigManager {
        warn!("Creating fallback configuration with defaults");
        ConfigManager {
            config: BridgeConfig::default(),
            environment: detect_environment(),
            config_directory: PathBuf::from("config"),
        }
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();
        for name in CONFIG_FILE_NAMES {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());
            if config_path.exists() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }
        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    fn load_and_merge_config(config_directory: &Path, environment: &str) -> ConfigResult<BridgeConfig> {
        let config_file = Self::find_config_file(config_directory)?;
        let file_path = config_file.display().to_string();

        let yaml_content = std::fs::read_to_string(&config_file)
            .map_err(|e| ConfigurationError::file_read_error(&file_path, e))?;

        let mut yaml_data: YamlValue = serde_yaml::from_str(&yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(&file_path, e))?;
        if yaml_data.is_null() {
            yaml_data = YamlValue::Mapping(Default::default());
        }

        if let Some(env_overrides) = yaml_data.get(environment).cloned() {
            debug!("Applying environment-specific overrides for: {}", environment);
            Self::merge_yaml_values(&mut yaml_data, env_overrides);
        }

        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for name in ENVIRONMENTS {
                map.remove(name);
            }
            map.remove(environment);
        }

        Self::apply_environment_variables(&file_path, &yaml_data)
    }

    /// Layer `AWS_BRIDGE__SECTION__FIELD` variables over the merged YAML
    fn apply_environment_variables(file_path: &str, yaml_data: &YamlValue) -> ConfigResult<BridgeConfig> {
        let merged = serde_yaml::to_string(yaml_data)
            .map_err(|e| ConfigurationError::invalid_yaml(file_path, e))?;

        config::Config::builder()
            .add_source(config::File::from_str(&merged, config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sqs.attribute_headers"),
            )
            .build()
            .map_err(|e| ConfigurationError::environment_override(defaults::ENV_PREFIX, e))?
            .try_deserialize::<BridgeConfig>()
            .map_err(|e| {
                ConfigurationError::invalid_yaml(file_path, format!("Failed to deserialize configuration: {e}"))
            })
    }

    /// Recursively merge YAML values (environment overrides into base config)
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }
}

static GLOBAL_CONFIG: OnceLock<Arc<ConfigManager>> = OnceLock::new();
static CONFIG_LOCK: Mutex<()> = Mutex::new(());

impl ConfigManager {
    /// Get or initialize the global configuration, falling back to defaults
    pub fn global() -> Arc<ConfigManager> {
        GLOBAL_CONFIG
            .get_or_init(|| {
                let _lock = CONFIG_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                ConfigManager::load().unwrap_or_else(|e| {
                    warn!("Configuration loading failed, using fallback: {e}");
                    Arc::new(ConfigManager::fallback())
                })
            })
            .clone()
    }

    /// Initialize the global configuration from a specific directory
    ///
    /// The first successful initialization wins.
    pub fn initialize_global(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let _lock = CONFIG_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let config_manager = ConfigManager::load_from_directory(config_dir)?;
        let _ = GLOBAL_CONFIG.set(config_manager.clone());
        Ok(config_manager)
    }
}
