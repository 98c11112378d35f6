//! HTTP access to research sources.
//!
//! Web sources are fetched and scraped for a handful of page facts; API
//! sources are fetched as JSON. Both share one `reqwest` client.

mod page;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

use autoresearch_shared::{FetchConfig, ResearchError, Result};

pub use page::{ScrapedPage, extract_page};

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for source requests.
const USER_AGENT: &str = concat!("autoresearch/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Fetches web pages and JSON APIs.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a fetcher with the given options.
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET `url` and return the body as text.
    #[instrument(skip(self))]
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        debug!("fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResearchError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| ResearchError::Network(format!("{url}: failed to read body: {e}")))
    }

    /// Fetch and scrape a web page.
    pub async fn scrape_page(&self, url: &str) -> Result<ScrapedPage> {
        let html = self.fetch_html(url).await?;
        let page = extract_page(url, &html);
        info!(url, title = ?page.title, headings = page.headings.len(), "page scraped");
        Ok(page)
    }

    /// GET a JSON API, with an optional bearer token.
    ///
    /// HTTP 429 is reported as [`ResearchError::RateLimited`]; a body that is
    /// not JSON is a [`ResearchError::Parse`].
    #[instrument(skip(self, api_key))]
    pub async fn fetch_api(&self, url: &str, api_key: Option<&str>) -> Result<serde_json::Value> {
        let mut request = self.client.get(url);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResearchError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ResearchError::RateLimited {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ResearchError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResearchError::Network(format!("{url}: failed to read body: {e}")))?;

        let value = serde_json::from_str(&body)
            .map_err(|e| ResearchError::parse(format!("{url}: response is not JSON: {e}")))?;

        info!(url, "fetched data from API");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(&FetchOptions::default()).expect("build fetcher")
    }

    #[tokio::test]
    async fn scrapes_page_from_mock_server() {
        let server = MockServer::start().await;
        let html = std::fs::read_to_string("../../../fixtures/html/article.html")
            .expect("read html fixture");

        Mock::given(method("GET"))
            .and(path("/pem"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let url = format!("{}/pem", server.uri());
        let page = fetcher().scrape_page(&url).await.expect("scrape");
        assert_eq!(page.url, url);
        assert_eq!(
            page.title.as_deref(),
            Some("Understanding PEM Electrolyzer Components")
        );
        assert_eq!(page.headings.len(), 4);
    }

    #[tokio::test]
    async fn page_http_error_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let err = fetcher().fetch_html(&url).await.unwrap_err();
        assert!(matches!(err, ResearchError::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn api_sends_bearer_token_and_parses_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"count": 2, "entries": [{"API": "Cats"}]}"#),
            )
            .mount(&server)
            .await;

        let url = format!("{}/api", server.uri());
        let value = fetcher()
            .fetch_api(&url, Some("secret-token"))
            .await
            .expect("fetch api");
        assert_eq!(value["count"], 2);
        assert_eq!(value["entries"][0]["API"], "Cats");
    }

    #[tokio::test]
    async fn api_rate_limit_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let url = format!("{}/api", server.uri());
        let err = fetcher().fetch_api(&url, None).await.unwrap_err();
        assert!(matches!(err, ResearchError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn api_non_json_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/api", server.uri());
        let err = fetcher().fetch_api(&url, None).await.unwrap_err();
        assert!(matches!(err, ResearchError::Parse { .. }));
    }

    #[tokio::test]
    async fn api_server_error_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = format!("{}/api", server.uri());
        let err = fetcher().fetch_api(&url, None).await.unwrap_err();
        assert!(matches!(err, ResearchError::Network(_)));
    }
}
