//! Configuration providers: storage-format-independent access to the model.

use std::path::{Path, PathBuf};

use crate::schema::ModelConfig;
use crate::validate::validate_config;
use crate::variants::expand_variants;
use crate::{ModelError, ModelResult};

/// Oldest configuration version the engine accepts.
pub const MIN_VERSION: u32 = 22;

/// A source of model configuration, independent of storage format.
pub trait ConfigProvider {
    /// Load, version-gate, validate and variant-expand the configuration.
    fn load(&self) -> ModelResult<ModelConfig>;
}

/// Provider reading YAML or JSON configuration files by extension.
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for FileProvider {
    fn load(&self) -> ModelResult<ModelConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let config: ModelConfig = match extension {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ModelError::UnsupportedFormat {
                    path: self.path.display().to_string(),
                })
            }
        };
        finish_load(config)
    }
}

/// Shared tail of every provider: version gate, validation, variant
/// expansion. Exposed so in-memory providers (tests, embedding) follow the
/// same path as file loading.
pub fn finish_load(config: ModelConfig) -> ModelResult<ModelConfig> {
    if config.version < MIN_VERSION {
        return Err(ModelError::UnsupportedVersion {
            found: config.version,
            minimum: MIN_VERSION,
        });
    }
    validate_config(&config)?;
    let config = expand_variants(config)?;
    // Expansion rewrites solve lists; the result must still validate.
    validate_config(&config)?;
    Ok(config)
}
