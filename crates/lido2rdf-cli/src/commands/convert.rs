//! Convert command implementation.

use super::{load_converter, write_output};
use crate::cli::{ConvertArgs, STDIO};
use crate::config::Config;
use crate::error::Result;
use crate::output::RdfSyntax;
use lido2rdf_domain::TripleSet;
use lido2rdf_harvest::{FetchOutcome, HarvestError, HttpFetcher, PageFetcher, PageOutcome, RecordProcessor};
use lido2rdf_mapping::RecordConverter;
use tokio::io::BufReader;
use url::Url;

/// Execute the convert command.
pub async fn execute_convert(args: ConvertArgs, config: &Config) -> Result<()> {
    // Fail on a bad format before touching the network
    let syntax = RdfSyntax::resolve(args.format.as_deref(), &args.output, config.default_syntax()?)?;
    let converter = load_converter(&args.rules, config)?;

    let mut graph = TripleSet::new();
    let outcome = convert_source(&args.source, &converter, config, &mut graph).await?;
    tracing::info!(
        source = %args.source,
        records = outcome.records,
        triples = graph.len(),
        "document converted"
    );

    write_output(&graph, converter.namespaces(), syntax, &args.output)
}

/// Stream a file, URL or stdin through the record processor.
pub async fn convert_source(
    source: &str,
    converter: &RecordConverter,
    config: &Config,
    graph: &mut TripleSet,
) -> Result<PageOutcome> {
    let processor = RecordProcessor::new(converter);

    if source == STDIO {
        let reader = BufReader::new(tokio::io::stdin());
        return Ok(processor.process(reader, 0, graph).await?);
    }

    if source.starts_with("http://") || source.starts_with("https://") {
        let url = Url::parse(source).map_err(HarvestError::from)?;
        let fetcher = HttpFetcher::new(&config.harvest)?;
        return match fetcher.fetch(&url).await? {
            FetchOutcome::Body(body) => Ok(processor.process(body, 0, graph).await?),
            FetchOutcome::Throttled(_) => Err(HarvestError::Throttled(format!("{} answered HTTP 503", url)).into()),
        };
    }

    let file = tokio::fs::File::open(source).await?;
    Ok(processor.process(BufReader::new(file), 0, graph).await?)
}
