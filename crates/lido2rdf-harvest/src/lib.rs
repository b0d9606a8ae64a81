//! lido2rdf Harvester
//!
//! Streams paginated OAI-PMH `ListRecords` responses through the mapping
//! interpreter.
//!
//! ## Components
//!
//! - [`RecordProcessor`]: single-pass async reader that converts one record
//!   subtree at a time and picks up resumption tokens and error elements
//! - [`PageFetcher`]: transport seam, implemented by [`HttpFetcher`]
//! - [`Harvester`]: the page loop with 503 backoff, cancellation and
//!   checkpointing
//!
//! Pages are processed strictly in order; each request depends on the token
//! of the previous response.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod harvester;
pub mod processor;

pub use config::HarvestConfig;
pub use error::{HarvestError, Result};
pub use fetch::{FetchOutcome, HttpFetcher, PageFetcher};
pub use harvester::{HarvestReport, Harvester, Page, PageSink};
pub use processor::{PageOutcome, ProtocolError, RecordProcessor, ResumptionToken};
