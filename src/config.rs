//! Configuration management for the normalizer
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (normalizer.toml)
//! - Environment variables (NORMALIZER__*)
//!
//! ## Example config file (normalizer.toml):
//! ```toml
//! [transform]
//! strict = true
//!
//! [registry]
//! schemas_dir = "./schemas"
//!
//! [registry.schemas]
//! users = "./schemas/legacy/users.json"
//! orders = "/etc/normalizer/orders.yaml"
//!
//! [logging]
//! level = "debug"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for the normalizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Transformation settings
    #[serde(default)]
    pub transform: TransformConfig,

    /// Schema registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transformation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Fail records that miss a required field instead of defaulting it
    #[serde(default)]
    pub strict: bool,
}

/// Registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory whose schema files are all registered by file stem
    #[serde(default)]
    pub schemas_dir: Option<PathBuf>,

    /// Explicit schema name to file mappings
    #[serde(default)]
    pub schemas: BTreeMap<String, PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl NormalizerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "normalizer.toml",
            ".normalizer.toml",
            "config/normalizer.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "normalizer", "schema-normalizer") {
            let xdg_config = config_dir.config_dir().join("normalizer.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Environment variables (NORMALIZER__TRANSFORM__STRICT=true)
        builder = builder.add_source(
            Environment::with_prefix("NORMALIZER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Resolve a configured path against the current directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// The schema directory, resolved
    pub fn schemas_dir(&self) -> Option<PathBuf> {
        self.registry
            .schemas_dir
            .as_deref()
            .map(|dir| self.resolve_path(dir))
    }
}
