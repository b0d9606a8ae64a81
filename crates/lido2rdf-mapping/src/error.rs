//! Error types for the mapping interpreter

use thiserror::Error;

/// Result alias for mapping operations
pub type Result<T> = std::result::Result<T, MappingError>;

/// Errors that can occur while loading or writing rule documents
///
/// Evaluation itself never fails: a rule that does not apply simply
/// contributes nothing.
#[derive(Error, Debug)]
pub enum MappingError {
    /// Rule document could not be parsed at all
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// Invalid location selector
    #[error("Invalid selector '{path}': {reason}")]
    Selector {
        /// Offending path
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Rule document serialization failed
    #[error("Write error: {0}")]
    Write(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for MappingError {
    fn from(e: quick_xml::Error) -> Self {
        MappingError::Xml(e.to_string())
    }
}

impl MappingError {
    pub(crate) fn selector(path: &str, reason: impl Into<String>) -> Self {
        MappingError::Selector {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
