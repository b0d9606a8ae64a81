//! Harvesting Client
//!
//! Requests pages one after another, following resumption tokens until the
//! endpoint signals the end of the list. Each page becomes its own graph
//! handed to a [`PageSink`].

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::fetch::{FetchOutcome, PageFetcher};
use crate::processor::{PageOutcome, RecordProcessor};
use lido2rdf_domain::{NamespaceTable, TripleSet};
use lido2rdf_mapping::RecordConverter;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

/// One harvested page
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    /// 1-based page number within the run
    pub number: usize,
    /// Triples produced from this page alone
    pub graph: &'a TripleSet,
    /// Namespace table to bind when serializing
    pub namespaces: &'a NamespaceTable,
    /// Records, token and errors seen on the page
    pub outcome: &'a PageOutcome,
}

/// Receives every page as soon as it is processed
pub trait PageSink {
    /// Persist one page
    fn write_page(&mut self, page: &Page<'_>) -> Result<()>;
}

/// Collects page graphs in memory
impl PageSink for Vec<TripleSet> {
    fn write_page(&mut self, page: &Page<'_>) -> Result<()> {
        self.push(page.graph.clone());
        Ok(())
    }
}

/// Totals of a finished or cancelled run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Pages processed
    pub pages: usize,
    /// HTTP requests issued, retries included
    pub requests: usize,
    /// Records converted
    pub records: usize,
    /// Triples written
    pub triples: usize,
    /// Error elements reported by the endpoint
    pub protocol_errors: usize,
    /// Token of the last successfully consumed page
    pub last_token: Option<String>,
    /// Token to resume from when the run was cancelled
    pub resume_token: Option<String>,
    /// Whether the run stopped on cancellation
    pub cancelled: bool,
}

/// Mutable state of one run
#[derive(Debug)]
struct HarvestState {
    resumption_token: Option<String>,
    last_token: Option<String>,
    retry_count: u32,
    namespaces: NamespaceTable,
    report: HarvestReport,
}

impl HarvestState {
    fn new(namespaces: NamespaceTable, resume: Option<&str>) -> Self {
        Self {
            resumption_token: resume.map(str::to_string).filter(|t| !t.trim().is_empty()),
            last_token: None,
            retry_count: 0,
            namespaces,
            report: HarvestReport::default(),
        }
    }

    fn finish(mut self, cancelled: bool) -> HarvestReport {
        self.report.cancelled = cancelled;
        self.report.last_token = self.last_token;
        self.report.resume_token = if cancelled { self.resumption_token } else { None };
        self.report
    }
}

enum Step {
    More,
    Done,
    Cancelled,
}

/// Paginated harvester
///
/// # Examples
///
/// ```no_run
/// use lido2rdf_domain::{NamespaceTable, TripleSet};
/// use lido2rdf_harvest::{HarvestConfig, Harvester, HttpFetcher};
/// use lido2rdf_mapping::{MappingLoader, RecordConverter, RecordSchema};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let schema = RecordSchema::lido();
///     let rules = MappingLoader::new(schema.namespaces()).load_file("lido2rdf.x3ml")?;
///     let converter = RecordConverter::new(schema, rules, NamespaceTable::default());
///
///     let config = HarvestConfig::default();
///     let fetcher = HttpFetcher::new(&config)?;
///     let harvester = Harvester::new(config, fetcher, converter);
///
///     let mut pages: Vec<TripleSet> = Vec::new();
///     let report = harvester.run("https://example.org/oai", None, &mut pages).await?;
///     println!("{} records", report.records);
///     Ok(())
/// }
/// ```
pub struct Harvester<F> {
    config: HarvestConfig,
    fetcher: F,
    converter: RecordConverter,
    cancel: CancellationToken,
}

impl<F: PageFetcher> Harvester<F> {
    /// Create a harvester
    pub fn new(config: HarvestConfig, fetcher: F, converter: RecordConverter) -> Self {
        Self {
            config,
            fetcher,
            converter,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run between pages
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Harvest configuration
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Request URL for the initial request or a resumption token
    ///
    /// Token requests carry only the verb and the token.
    pub fn request_url(&self, base: &Url, token: Option<&str>) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("verb", "ListRecords");
            match token {
                Some(token) => {
                    query.append_pair("resumptionToken", token);
                }
                None => {
                    query.append_pair("metadataPrefix", &self.config.metadata_prefix);
                    for (key, value) in [
                        ("set", &self.config.set),
                        ("from", &self.config.from),
                        ("until", &self.config.until),
                    ] {
                        if let Some(value) = value {
                            query.append_pair(key, value);
                        }
                    }
                }
            }
        }
        url
    }

    /// Harvest `base_url` until the list is complete or the run is cancelled
    ///
    /// `resume` starts from a previously checkpointed token.
    ///
    /// # Errors
    ///
    /// Configuration and URL errors are returned before any request. Every
    /// later failure is wrapped in [`HarvestError::Interrupted`] carrying the
    /// token of the failed request.
    pub async fn run<P: PageSink>(&self, base_url: &str, resume: Option<&str>, sink: &mut P) -> Result<HarvestReport> {
        self.config.validate().map_err(HarvestError::Configuration)?;
        let base = Url::parse(base_url)?;
        let mut state = HarvestState::new(self.converter.namespaces().clone(), resume);

        info!(
            url = %base,
            metadata_prefix = %self.config.metadata_prefix,
            resume = ?state.resumption_token,
            "harvest started"
        );

        let cancelled = loop {
            if self.cancel.is_cancelled() {
                break true;
            }
            match self.next_page(&base, &mut state, sink).await {
                Ok(Step::More) => {}
                Ok(Step::Done) => break false,
                Ok(Step::Cancelled) => break true,
                Err(e) => return Err(e.interrupted(state.resumption_token.as_deref())),
            }
        };

        let report = state.finish(cancelled);
        if cancelled {
            info!(pages = report.pages, token = ?report.resume_token, "harvest cancelled");
        } else {
            info!(
                pages = report.pages,
                records = report.records,
                triples = report.triples,
                "harvest finished"
            );
        }
        Ok(report)
    }

    async fn next_page<P: PageSink>(&self, base: &Url, state: &mut HarvestState, sink: &mut P) -> Result<Step> {
        let url = self.request_url(base, state.resumption_token.as_deref());

        let body = loop {
            state.report.requests += 1;
            match self.fetcher.fetch(&url).await? {
                FetchOutcome::Body(body) => {
                    state.retry_count = 0;
                    break body;
                }
                FetchOutcome::Throttled(None) => {
                    return Err(HarvestError::Throttled(
                        "HTTP 503 without a usable Retry-After header".to_string(),
                    ));
                }
                FetchOutcome::Throttled(Some(delay)) => {
                    state.retry_count += 1;
                    if state.retry_count > self.config.max_retries {
                        return Err(HarvestError::Network(format!(
                            "Max retries exceeded ({}) while throttled",
                            self.config.max_retries
                        )));
                    }
                    warn!(
                        retry = state.retry_count,
                        delay_secs = delay.as_secs(),
                        "server busy, backing off"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Ok(Step::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        let mut graph = TripleSet::new();
        let outcome = RecordProcessor::new(&self.converter)
            .process(body, state.report.records, &mut graph)
            .await?;

        let number = state.report.pages + 1;
        sink.write_page(&Page {
            number,
            graph: &graph,
            namespaces: &state.namespaces,
            outcome: &outcome,
        })?;

        state.report.pages = number;
        state.report.records += outcome.records;
        state.report.triples += graph.len();
        state.report.protocol_errors += outcome.errors.len();
        state.last_token = state.resumption_token.take();
        state.resumption_token = outcome.next_token().map(str::to_string);

        info!(
            page = number,
            records = outcome.records,
            triples = graph.len(),
            token = ?state.resumption_token,
            "page harvested"
        );

        Ok(if state.resumption_token.is_some() {
            Step::More
        } else {
            Step::Done
        })
    }
}
