//! rh-model: canonical configuration format, validation and providers.

pub mod provider;
pub mod schema;
pub mod validate;
pub mod variants;

pub use provider::{ConfigProvider, FileProvider, MIN_VERSION};
pub use schema::*;
pub use validate::{validate_config, ValidationError};
pub use variants::expand_variants;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(
        "Configuration version {found} is older than the engine minimum {minimum}; \
         migrate the configuration first"
    )]
    UnsupportedVersion { found: u32, minimum: u32 },

    #[error("Unsupported configuration format: {path} (expected .yaml, .yml or .json)")]
    UnsupportedFormat { path: String },

    #[error(
        "Keyed period parameters on solve '{solve}' cannot be combined with a keyed \
         parent: only a single variant nesting level is supported"
    )]
    NestedVariants { solve: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
