//! Harvest command implementation.

use super::load_converter;
use crate::cli::HarvestArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::{write_graph, Formatter, RdfSyntax};
use lido2rdf_harvest::{HarvestError, Harvester, HttpFetcher, Page, PageSink};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use url::Url;

/// Writes each page to `page-NNNNN.<ext>` in an output directory.
#[derive(Debug)]
pub struct PageWriter {
    dir: PathBuf,
    syntax: RdfSyntax,
    offset: usize,
}

impl PageWriter {
    /// Start a fresh run, removing files left in `dir`.
    ///
    /// Subdirectories are left alone.
    pub fn create(dir: &Path, syntax: RdfSyntax) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let mut removed = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        tracing::debug!(dir = %dir.display(), removed, "output directory cleared");
        Ok(Self {
            dir: dir.to_path_buf(),
            syntax,
            offset: 0,
        })
    }

    /// Continue a run, numbering after the pages already in `dir`.
    pub fn resume(dir: &Path, syntax: RdfSyntax) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let mut offset = 0;
        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name();
            let number = name
                .to_str()
                .and_then(|n| n.strip_prefix("page-"))
                .and_then(|n| n.split('.').next())
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(number) = number {
                offset = offset.max(number);
            }
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            syntax,
            offset,
        })
    }

    /// File for the page with run-relative number `number`.
    pub fn page_path(&self, number: usize) -> PathBuf {
        self.dir
            .join(format!("page-{:05}.{}", self.offset + number, self.syntax.extension()))
    }
}

impl PageSink for PageWriter {
    fn write_page(&mut self, page: &Page<'_>) -> lido2rdf_harvest::Result<()> {
        let path = self.page_path(page.number);
        let sink_error = |e: std::io::Error| HarvestError::Sink(format!("{}: {}", path.display(), e));

        let file = File::create(&path).map_err(sink_error)?;
        let mut writer = write_graph(page.graph, page.namespaces, self.syntax, BufWriter::new(file))?;
        writer.flush().map_err(sink_error)?;

        tracing::debug!(path = %path.display(), triples = page.graph.len(), "page written");
        Ok(())
    }
}

/// Execute the harvest command.
pub async fn execute_harvest(args: HarvestArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let syntax = match args.format.as_deref() {
        Some(name) => RdfSyntax::parse(name)?,
        None => config.default_syntax()?,
    };

    let mut harvest_config = config.harvest.clone();
    if let Some(prefix) = args.metadata_prefix {
        harvest_config.metadata_prefix = prefix;
    }
    harvest_config.set = args.set.or(harvest_config.set);
    harvest_config.from = args.from.or(harvest_config.from);
    harvest_config.until = args.until.or(harvest_config.until);
    harvest_config.validate().map_err(CliError::Config)?;
    // Checked before the output directory is cleared
    Url::parse(&args.url).map_err(HarvestError::from)?;

    let converter = load_converter(&args.rules, config)?;
    let mut sink = match args.resume {
        Some(_) => PageWriter::resume(&args.dir, syntax)?,
        None => PageWriter::create(&args.dir, syntax)?,
    };

    let fetcher = HttpFetcher::new(&harvest_config)?;
    let harvester = Harvester::new(harvest_config, fetcher, converter);

    let cancel = harvester.cancellation_token();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, stopping after the current page");
            cancel.cancel();
        }
    });

    let result = harvester
        .run(&args.url, args.resume.as_deref(), &mut sink)
        .await;
    signal.abort();

    let report = result?;
    eprintln!("{}", formatter.harvest_summary(&report));
    Ok(())
}
