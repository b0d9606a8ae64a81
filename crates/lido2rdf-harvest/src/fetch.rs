//! Page fetching
//!
//! [`PageFetcher`] is the seam between the harvest loop and the transport.
//! [`HttpFetcher`] streams response bodies with `reqwest`.

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use futures::TryStreamExt;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

/// Result of one request
pub enum FetchOutcome<B> {
    /// Successful response body
    Body(B),
    /// HTTP 503, with the delay from `Retry-After` when present
    Throttled(Option<Duration>),
}

impl<B> fmt::Debug for FetchOutcome<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Body(_) => f.write_str("Body(..)"),
            FetchOutcome::Throttled(delay) => f.debug_tuple("Throttled").field(delay).finish(),
        }
    }
}

/// Issues one request per page
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    /// Response body reader
    type Body: AsyncBufRead + Unpin;

    /// Fetch `url`
    ///
    /// Returns [`FetchOutcome::Throttled`] for HTTP 503 and an error for
    /// every other non-success status.
    async fn fetch(&self, url: &Url) -> Result<FetchOutcome<Self::Body>>;
}

/// HTTP fetcher backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the configured timeout and user agent
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| HarvestError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    type Body = Box<dyn AsyncBufRead + Unpin + Send>;

    async fn fetch(&self, url: &Url) -> Result<FetchOutcome<Self::Body>> {
        debug!(url = %url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status.is_success() {
            let stream = response.bytes_stream().map_err(std::io::Error::other);
            return Ok(FetchOutcome::Body(Box::new(StreamReader::new(Box::pin(stream)))));
        }

        if status == StatusCode::SERVICE_UNAVAILABLE {
            let delay = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Ok(FetchOutcome::Throttled(delay));
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(HarvestError::Network(format!("HTTP {}: {}", status, text.trim())))
    }
}

/// `Retry-After` in delay-seconds form
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 10 "), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-1"), None);
    }

    type Outcome = Result<FetchOutcome<Box<dyn AsyncBufRead + Unpin + Send>>>;

    /// The server is returned so it outlives the streamed body
    async fn fetch(template: ResponseTemplate) -> (MockServer, Outcome) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oai"))
            .respond_with(template)
            .expect(1)
            .mount(&server)
            .await;
        let url = Url::parse(&format!("{}/oai", server.uri())).unwrap();
        let outcome = HttpFetcher::new(&HarvestConfig::default())
            .unwrap()
            .fetch(&url)
            .await;
        (server, outcome)
    }

    #[tokio::test]
    async fn test_success_streams_body() {
        let (_server, outcome) = fetch(ResponseTemplate::new(200).set_body_string("<OAI-PMH/>")).await;
        let outcome = outcome.unwrap();
        let FetchOutcome::Body(mut body) = outcome else {
            panic!("expected a body");
        };
        let mut text = String::new();
        body.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "<OAI-PMH/>");
    }

    #[tokio::test]
    async fn test_503_with_retry_after() {
        let (_server, outcome) = fetch(ResponseTemplate::new(503).insert_header("Retry-After", "2")).await;
        let outcome = outcome.unwrap();
        assert!(matches!(outcome, FetchOutcome::Throttled(Some(d)) if d == Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_503_without_retry_after() {
        let (_server, outcome) = fetch(ResponseTemplate::new(503)).await;
        let outcome = outcome.unwrap();
        assert!(matches!(outcome, FetchOutcome::Throttled(None)));
    }

    #[tokio::test]
    async fn test_other_status_is_network_error() {
        let (_server, outcome) = fetch(ResponseTemplate::new(500).set_body_string("boom")).await;
        let err = outcome.unwrap_err();
        assert!(matches!(err, HarvestError::Network(ref msg) if msg.contains("500") && msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let fetcher = HttpFetcher::new(&HarvestConfig::default()).unwrap();
        let url = Url::parse("http://127.0.0.1:9/oai").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, HarvestError::Network(_)));
    }
}
