//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested output syntax is not supported
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Rule document or record conversion error
    #[error(transparent)]
    Mapping(#[from] lido2rdf_mapping::MappingError),

    /// Harvest or document fetch error
    #[error(transparent)]
    Harvest(#[from] lido2rdf_harvest::HarvestError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<CliError> for lido2rdf_harvest::HarvestError {
    fn from(e: CliError) -> Self {
        match e {
            CliError::Harvest(inner) => inner,
            other => lido2rdf_harvest::HarvestError::Sink(other.to_string()),
        }
    }
}
