//! Service configuration loaded from TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::container::ContainerFormat;
use crate::error::ConfigError;
use crate::latent::TransformConfig;
use crate::sequence::Quantization;
use crate::validity::ValidityPolicy;

/// Top-level configuration. Every field has a default, so an empty file is
/// a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub transform: TransformSettings,
}

impl Config {
    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: String,
    /// Prefix of download URLs returned to clients.
    pub public_url: String,
    /// CORS origins; empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            public_url: "http://127.0.0.1:8000".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Location of the artifact areas.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
        }
    }
}

/// Pipeline behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Accepted `file_format` values, `json` and `h5`.
    pub container_formats: Vec<ContainerFormat>,
    /// Deflection used when a request does not carry one.
    pub default_deflection: f64,
    pub validity_policy: ValidityPolicy,
    /// Argument grid size; `0` reads arguments as continuous values.
    pub quantization_levels: u32,
    /// Deflection of the volume probe run after every boolean.
    pub probe_deflection: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            container_formats: crate::pipeline::available_formats(),
            default_deflection: 0.1,
            validity_policy: ValidityPolicy::Warn,
            quantization_levels: 256,
            probe_deflection: 0.1,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn quantization(&self) -> Quantization {
        Quantization::from_levels(self.quantization_levels)
    }
}

/// Latent model settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Weights file; the spectral basis is used when absent.
    pub weights: Option<PathBuf>,
    pub max_total_len: usize,
    pub latent_dim: usize,
}

impl Default for TransformSettings {
    fn default() -> Self {
        let base = TransformConfig::default();
        Self {
            weights: None,
            max_total_len: base.max_total_len,
            latent_dim: base.latent_dim,
        }
    }
}

impl TransformSettings {
    /// Combines these settings with the pipeline's quantization.
    #[must_use]
    pub fn config(&self, quantization: Quantization) -> TransformConfig {
        TransformConfig {
            max_total_len: self.max_total_len,
            latent_dim: self.latent_dim,
            quantization,
        }
    }
}
