//! Integration tests for lido2rdf-harvest
//!
//! Full harvests against scripted fetchers and a mock HTTP endpoint.

use lido2rdf_domain::{NamespaceTable, TripleSet};
use lido2rdf_harvest::{
    FetchOutcome, HarvestConfig, HarvestError, Harvester, HttpFetcher, Page, PageFetcher, PageSink,
};
use lido2rdf_mapping::{MappingLoader, RecordConverter, RecordSchema};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RULES: &str = r#"<x3ml><mappings><mapping>
    <domain><source_node>//lido:lido</source_node>
      <target_node><entity><type>crm:E22_Human-Made_Object</type></entity></target_node></domain>
    <link>
      <path><source_relation><relation>lido:appellationValue</relation></source_relation>
        <target_relation><relationship>crm:P102_has_title</relationship></target_relation></path>
      <range><source_node>lido:titleSet/lido:appellationValue</source_node>
        <target_node><entity><type>rdfs:Literal</type></entity></target_node></range>
    </link>
  </mapping></mappings></x3ml>"#;

fn converter() -> RecordConverter {
    let schema = RecordSchema::lido();
    let rules = MappingLoader::new(schema.namespaces()).load_str(RULES).unwrap();
    RecordConverter::new(schema, rules, NamespaceTable::default())
}

/// One `ListRecords` page holding `ids` and an optional token
fn page(ids: &[&str], token: Option<&str>) -> String {
    let records: String = ids
        .iter()
        .map(|id| {
            format!(
                "<record><header><identifier>{id}</identifier></header><metadata>\
                 <lido:lido xmlns:lido=\"http://www.lido-schema.org\">\
                 <lido:lidoRecID>{id}</lido:lidoRecID>\
                 <lido:titleSet><lido:appellationValue>Title {id}</lido:appellationValue></lido:titleSet>\
                 </lido:lido></metadata></record>"
            )
        })
        .collect();
    let token = match token {
        Some(t) => format!("<resumptionToken completeListSize=\"9\" cursor=\"0\">{t}</resumptionToken>"),
        None => "<resumptionToken completeListSize=\"9\" cursor=\"0\"/>".to_string(),
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <OAI-PMH xmlns=\"http://www.openarchives.org/OAI/2.0/\">\
         <responseDate>2024-05-01T10:00:00Z</responseDate>\
         <request verb=\"ListRecords\">https://example.org/oai</request>\
         <ListRecords>{records}{token}</ListRecords></OAI-PMH>"
    )
}

enum Reply {
    Page(String),
    Busy(Option<Duration>),
    Fail,
}

/// Replays canned replies and records when each request was made
struct ScriptedFetcher {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(Url, Instant)>>,
}

impl ScriptedFetcher {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl PageFetcher for &ScriptedFetcher {
    type Body = Cursor<Vec<u8>>;

    async fn fetch(&self, url: &Url) -> lido2rdf_harvest::Result<FetchOutcome<Self::Body>> {
        self.requests.lock().unwrap().push((url.clone(), Instant::now()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Page(body)) => Ok(FetchOutcome::Body(Cursor::new(body.into_bytes()))),
            Some(Reply::Busy(delay)) => Ok(FetchOutcome::Throttled(delay)),
            Some(Reply::Fail) | None => Err(HarvestError::Network("HTTP 500".into())),
        }
    }
}

#[derive(Default)]
struct PageLog {
    numbers: Vec<usize>,
    graphs: Vec<TripleSet>,
}

impl PageSink for PageLog {
    fn write_page(&mut self, page: &Page<'_>) -> lido2rdf_harvest::Result<()> {
        self.numbers.push(page.number);
        self.graphs.push(page.graph.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_harvest_stops_at_first_page_without_token() {
    for k in 1..=4usize {
        let replies = (1..=k)
            .map(|n| {
                let id = format!("rec-{}", n);
                let token = (n < k).then(|| format!("T{}", n));
                Reply::Page(page(&[id.as_str()], token.as_deref()))
            })
            .chain(std::iter::once(Reply::Fail))
            .collect();
        let fetcher = ScriptedFetcher::new(replies);
        let harvester = Harvester::new(HarvestConfig::default(), &fetcher, converter());

        let mut log = PageLog::default();
        let report = harvester
            .run("https://example.org/oai", None, &mut log)
            .await
            .unwrap();

        assert_eq!(fetcher.requests.lock().unwrap().len(), k, "Expected exactly {} requests", k);
        assert_eq!(report.pages, k);
        assert_eq!(report.records, k);
        assert_eq!(log.numbers, (1..=k).collect::<Vec<_>>());
        assert!(!report.cancelled);
    }
}

#[tokio::test]
async fn test_pages_are_self_contained() {
    let fetcher = ScriptedFetcher::new(vec![
        Reply::Page(page(&["a", "b"], Some("T1"))),
        Reply::Page(page(&["c"], None)),
    ]);
    let harvester = Harvester::new(HarvestConfig::default(), &fetcher, converter());
    let mut log = PageLog::default();
    let report = harvester
        .run("https://example.org/oai", None, &mut log)
        .await
        .unwrap();

    assert_eq!(log.graphs[0].len(), 4);
    assert_eq!(log.graphs[1].len(), 2);
    assert_eq!(report.triples, 6);
    assert_eq!(report.last_token.as_deref(), Some("T1"));
    assert_eq!(report.resume_token, None);

    let urls: Vec<String> = fetcher
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|(url, _)| url.query().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        urls,
        vec![
            "verb=ListRecords&metadataPrefix=lido".to_string(),
            "verb=ListRecords&resumptionToken=T1".to_string()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_backoff_waits_for_retry_after() {
    let fetcher = ScriptedFetcher::new(vec![
        Reply::Busy(Some(Duration::from_secs(2))),
        Reply::Page(page(&["a"], None)),
    ]);
    let harvester = Harvester::new(HarvestConfig::default(), &fetcher, converter());
    let mut log = PageLog::default();
    let report = harvester
        .run("https://example.org/oai", None, &mut log)
        .await
        .unwrap();

    let requests = fetcher.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, requests[1].0, "The identical request is retried");
    assert!(
        requests[1].1 - requests[0].1 >= Duration::from_secs(2),
        "Retry must not happen before Retry-After elapsed"
    );
    assert_eq!(report.requests, 2);
    assert_eq!(report.pages, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_bound_fails_harvest() {
    let replies = (0..10).map(|_| Reply::Busy(Some(Duration::from_secs(2)))).collect();
    let fetcher = ScriptedFetcher::new(replies);
    let config = HarvestConfig {
        max_retries: 3,
        ..Default::default()
    };
    let harvester = Harvester::new(config, &fetcher, converter());
    let mut log = PageLog::default();
    let err = harvester
        .run("https://example.org/oai", Some("T5"), &mut log)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Max retries exceeded"), "Unexpected error: {}", err);
    assert_eq!(err.checkpoint(), Some("T5"));
    assert_eq!(fetcher.requests.lock().unwrap().len(), 4);
    assert!(log.graphs.is_empty());
}

#[tokio::test]
async fn test_503_without_delay_fails() {
    let fetcher = ScriptedFetcher::new(vec![Reply::Busy(None)]);
    let harvester = Harvester::new(HarvestConfig::default(), &fetcher, converter());
    let mut log = PageLog::default();
    let err = harvester
        .run("https://example.org/oai", None, &mut log)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Interrupted { ref source, .. } if matches!(**source, HarvestError::Throttled(_))
    ));
    assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failure_keeps_earlier_pages() {
    let fetcher = ScriptedFetcher::new(vec![Reply::Page(page(&["a"], Some("T1"))), Reply::Fail]);
    let harvester = Harvester::new(HarvestConfig::default(), &fetcher, converter());
    let mut log = PageLog::default();
    let err = harvester
        .run("https://example.org/oai", None, &mut log)
        .await
        .unwrap_err();

    assert_eq!(log.graphs.len(), 1, "Pages written before the failure are kept");
    assert_eq!(err.checkpoint(), Some("T1"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let fetcher = ScriptedFetcher::new(vec![
        Reply::Page(page(&["a"], Some("T1"))),
        Reply::Busy(Some(Duration::from_secs(60))),
    ]);
    let harvester = Harvester::new(HarvestConfig::default(), &fetcher, converter());
    let cancel = harvester.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let mut log = PageLog::default();
    let report = harvester
        .run("https://example.org/oai", None, &mut log)
        .await
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.pages, 1);
    assert_eq!(report.resume_token.as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_http_harvest_two_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListRecords"))
        .and(query_param("metadataPrefix", "lido"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&["r1", "r2"], Some("T1"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListRecords"))
        .and(query_param("resumptionToken", "T1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&["r3"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let config = HarvestConfig::default();
    let fetcher = HttpFetcher::new(&config).unwrap();
    let harvester = Harvester::new(config, fetcher, converter());
    let mut pages: Vec<TripleSet> = Vec::new();
    let report = harvester
        .run(&format!("{}/oai", server.uri()), None, &mut pages)
        .await
        .unwrap();

    assert_eq!(report.requests, 2);
    assert_eq!(pages.len(), 2, "Expected one output graph per page");
    assert_eq!(report.records, 3);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn test_http_error_status_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = HarvestConfig::default();
    let harvester = Harvester::new(config.clone(), HttpFetcher::new(&config).unwrap(), converter());
    let mut pages: Vec<TripleSet> = Vec::new();
    let err = harvester
        .run(&format!("{}/oai", server.uri()), None, &mut pages)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));
    assert_eq!(err.checkpoint(), None);
}
