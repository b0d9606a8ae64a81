//! lido2rdf - Command-line converter from LIDO records to CIDOC-CRM RDF.

use clap::Parser;
use lido2rdf_cli::commands;
use lido2rdf_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(cli: Cli) -> lido2rdf_cli::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let color_enabled = !cli.no_color && config.output.color;
    let formatter = Formatter::new(color_enabled);

    match cli.command {
        Command::Convert(args) => commands::execute_convert(args, &config).await?,
        Command::Harvest(args) => commands::execute_harvest(args, &config, &formatter).await?,
        Command::Rules(args) => commands::execute_rules(args, &config, &formatter)?,
    }

    Ok(())
}
