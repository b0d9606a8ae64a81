//! Error types for harvesting

use lido2rdf_mapping::MappingError;
use thiserror::Error;

/// Result alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Errors that can occur while harvesting or streaming records
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Transport failure, non-503 status, or retry limit exceeded
    #[error("Network error: {0}")]
    Network(String),

    /// Server asked to back off without saying for how long
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Malformed response body
    #[error("XML error: {0}")]
    Xml(String),

    /// Page output failed
    #[error("Sink error: {0}")]
    Sink(String),

    /// Invalid harvest configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A harvest failed after consuming some pages
    #[error("{source} (resume with token: {})", .checkpoint.as_deref().unwrap_or("none"))]
    Interrupted {
        /// Token of the request that failed
        checkpoint: Option<String>,
        /// What went wrong
        #[source]
        source: Box<HarvestError>,
    },
}

impl HarvestError {
    /// Token from which an interrupted harvest can be resumed
    pub fn checkpoint(&self) -> Option<&str> {
        match self {
            HarvestError::Interrupted { checkpoint, .. } => checkpoint.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn interrupted(self, checkpoint: Option<&str>) -> Self {
        match self {
            already @ HarvestError::Interrupted { .. } => already,
            other => HarvestError::Interrupted {
                checkpoint: checkpoint.map(str::to_string),
                source: Box::new(other),
            },
        }
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(e: reqwest::Error) -> Self {
        HarvestError::Network(e.to_string())
    }
}

impl From<quick_xml::Error> for HarvestError {
    fn from(e: quick_xml::Error) -> Self {
        HarvestError::Xml(e.to_string())
    }
}

impl From<MappingError> for HarvestError {
    fn from(e: MappingError) -> Self {
        HarvestError::Xml(e.to_string())
    }
}
