//! CLI command definitions and argument parsing.

use clap::{ArgAction, Parser, Subcommand};
use lido2rdf_mapping::DEFAULT_RULE_FILE;
use std::path::PathBuf;

/// Marker for standard input / standard output
pub const STDIO: &str = "-";

/// lido2rdf - Convert LIDO records to CIDOC-CRM RDF.
#[derive(Debug, Parser)]
#[command(name = "lido2rdf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LIDO2RDF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert one document (file, URL or stdin)
    Convert(ConvertArgs),

    /// Harvest an OAI-PMH endpoint page by page
    Harvest(HarvestArgs),

    /// List the mappings of a rule file
    Rules(RulesArgs),
}

/// Arguments for the convert command.
#[derive(Debug, Parser)]
pub struct ConvertArgs {
    /// File path, http(s) URL, or `-` for stdin
    #[arg(default_value = STDIO)]
    pub source: String,

    /// Rule file
    #[arg(short = 'm', long = "mapping", default_value = DEFAULT_RULE_FILE)]
    pub rules: PathBuf,

    /// Output file, or `-` for stdout
    #[arg(short, long, default_value = STDIO)]
    pub output: String,

    /// Output syntax (ttl, nt, json, xml); derived from the output suffix if omitted
    #[arg(short = 't', long = "to")]
    pub format: Option<String>,
}

/// Arguments for the harvest command.
#[derive(Debug, Parser)]
pub struct HarvestArgs {
    /// Endpoint base URL
    pub url: String,

    /// Rule file
    #[arg(short = 'm', long = "mapping", default_value = DEFAULT_RULE_FILE)]
    pub rules: PathBuf,

    /// Output directory, cleared before the run
    #[arg(short = 'd', long = "dir", default_value = "rdf")]
    pub dir: PathBuf,

    /// Output syntax (ttl, nt, json, xml)
    #[arg(short = 't', long = "to")]
    pub format: Option<String>,

    /// Resume from a checkpointed resumption token
    #[arg(long)]
    pub resume: Option<String>,

    /// Override the metadata prefix
    #[arg(long)]
    pub metadata_prefix: Option<String>,

    /// Restrict to a set
    #[arg(long)]
    pub set: Option<String>,

    /// Lower datestamp bound
    #[arg(long)]
    pub from: Option<String>,

    /// Upper datestamp bound
    #[arg(long)]
    pub until: Option<String>,
}

/// Arguments for the rules command.
#[derive(Debug, Parser)]
pub struct RulesArgs {
    /// Rule file
    #[arg(short = 'm', long = "mapping", default_value = DEFAULT_RULE_FILE)]
    pub rules: PathBuf,

    /// Print the rules as JSON
    #[arg(long, conflicts_with = "x3ml")]
    pub json: bool,

    /// Print the normalized rule document
    #[arg(long)]
    pub x3ml: bool,
}
