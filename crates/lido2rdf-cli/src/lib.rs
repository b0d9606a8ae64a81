//! lido2rdf CLI library.
//!
//! Argument parsing, configuration, output formatting and the command
//! implementations behind the `lido2rdf` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::{Formatter, RdfSyntax};
