//! Configuration management for the brain tumor detection service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "TUMOR_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prefix for all prediction routes
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Upload size limit in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_prefix: default_api_prefix(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// ONNX classifier file
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// JSON class map (object or array form)
    #[serde(default = "default_classes_path")]
    pub classes_path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Reported model accuracy in percent, informational only
    #[serde(default = "default_model_accuracy")]
    pub model_accuracy: f64,
}

fn default_model_path() -> String {
    "models/brain_tumor_model.onnx".to_string()
}

fn default_classes_path() -> String {
    "models/class_dict.json".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

fn default_model_accuracy() -> f64 {
    98.0
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            classes_path: default_classes_path(),
            onnx_threads: default_onnx_threads(),
            model_accuracy: default_model_accuracy(),
        }
    }
}

/// Prediction storage configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// JSON-lines file; predictions are kept in memory only when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of classifications running at once
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Seconds between metrics summaries in the log (0 disables)
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_workers() -> usize {
    4
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            metrics_interval_secs: default_metrics_interval(),
        }
    }
}

/// Prediction event publishing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// NATS server URL; publishing is disabled when unset
    #[serde(default)]
    pub nats_url: Option<String>,
    /// Subject for stored prediction events
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_subject() -> String {
    "predictions.created".to_string()
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            nats_url: None,
            subject: default_subject(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `TUMOR_CONFIG` or `config/config.toml`, then
    /// `TUMOR__*` environment variables
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path. A missing file is allowed;
    /// every field has a default.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("TUMOR")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
