//! End-to-end research pipeline: query → sources or completion → result set → XML.

use std::borrow::Cow;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use autoresearch_completion::{CompletionClient, CompletionOptions};
use autoresearch_fetch::{FetchOptions, Fetcher, ScrapedPage};
use autoresearch_shared::{Fields, Result, ResultSet, Scalar};
use autoresearch_sources::{Source, SourceKind, determine_sources, include_user_sources};

/// Category holding a completion answer.
pub const RESPONSE_CATEGORY: &str = "response";
/// Category listing the determined sources.
pub const SOURCES_CATEGORY: &str = "sources";
/// Category holding scraped web pages.
pub const WEB_PAGES_CATEGORY: &str = "web_pages";
/// Category holding API payloads.
pub const API_DATA_CATEGORY: &str = "api_data";

/// How the query is answered.
#[derive(Clone)]
pub enum ResearchMode {
    /// Pick sources by keyword; optionally fetch them.
    Sources {
        /// Scrape web sources and fetch API sources.
        fetch: bool,
    },
    /// Ask the completion endpoint directly. User sources are ignored.
    Completion {
        options: CompletionOptions,
        api_key: String,
    },
}

/// Configuration for [`run_research`].
#[derive(Clone)]
pub struct ResearchConfig {
    /// Free-text research query.
    pub query: String,
    pub mode: ResearchMode,
    /// Extra page URLs named by the user.
    pub additional_urls: Vec<String>,
    /// Extra API URLs named by the user.
    pub additional_apis: Vec<String>,
    /// HTTP settings for source fetching.
    pub fetch: FetchOptions,
    /// Bearer token sent to API sources.
    pub api_token: Option<String>,
}

/// Stands in for secrets in `Debug` output.
const REDACTED: &str = "<redacted>";

impl fmt::Debug for ResearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sources { fetch } => f.debug_struct("Sources").field("fetch", fetch).finish(),
            Self::Completion { options, .. } => f
                .debug_struct("Completion")
                .field("options", options)
                .field("api_key", &REDACTED)
                .finish(),
        }
    }
}

impl fmt::Debug for ResearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchConfig")
            .field("query", &self.query)
            .field("mode", &self.mode)
            .field("additional_urls", &self.additional_urls)
            .field("additional_apis", &self.additional_apis)
            .field("fetch", &self.fetch)
            .field("api_token", &self.api_token.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// Which path produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchMethod {
    Completion,
    Sources,
}

impl fmt::Display for ResearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion => f.write_str("completion"),
            Self::Sources => f.write_str("sources"),
        }
    }
}

/// Result of [`run_research`].
#[derive(Debug)]
pub struct ResearchReport {
    /// Gathered results, before encoding.
    pub results: ResultSet,
    /// `results` encoded as an XML document.
    pub xml: Vec<u8>,
    /// Sources considered (empty in completion mode).
    pub sources: Vec<Source>,
    pub method: ResearchMethod,
    /// The completion answer, in completion mode.
    pub answer: Option<String>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each source is fetched (successfully or not).
    fn source_fetched(&self, url: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &ResearchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_fetched(&self, _url: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &ResearchReport) {}
}

/// Run the research pipeline.
///
/// 1. Completion mode: ask the endpoint, wrap the answer as `response/Item/content`.
/// 2. Sources mode: determine sources, add the user's, optionally fetch each one.
/// 3. Encode the result set as XML.
#[instrument(skip_all, fields(query = %config.query))]
pub async fn run_research(
    config: &ResearchConfig,
    progress: &dyn ProgressReporter,
) -> Result<ResearchReport> {
    let start = Instant::now();

    let (results, sources, method, answer) = match &config.mode {
        ResearchMode::Completion { options, api_key } => {
            progress.phase("Asking completion endpoint");
            let client = CompletionClient::new(options.clone(), api_key.clone())?;
            let answer = client.complete(&config.query).await?;
            (
                completion_results(&answer),
                Vec::new(),
                ResearchMethod::Completion,
                Some(answer),
            )
        }
        ResearchMode::Sources { fetch } => {
            progress.phase("Determining sources");
            let sources = include_user_sources(
                determine_sources(&config.query),
                &config.additional_urls,
                &config.additional_apis,
            )?;

            let mut results = ResultSet::new();
            for source in &sources {
                results.push_fields(SOURCES_CATEGORY, source_fields(source));
            }

            if *fetch && !sources.is_empty() {
                progress.phase("Fetching sources");
                fetch_sources(config, &sources, &mut results, progress).await?;
            }

            (results, sources, ResearchMethod::Sources, None)
        }
    };

    progress.phase("Encoding XML");
    let xml = autoresearch_xml::encode(&results).inspect_err(|e| {
        error!(error = %e, "failed to create XML document");
    })?;

    let report = ResearchReport {
        results,
        xml,
        sources,
        method,
        answer,
        elapsed: start.elapsed(),
    };

    info!(
        method = %report.method,
        sources = report.sources.len(),
        categories = report.results.len(),
        bytes = report.xml.len(),
        "research complete"
    );
    progress.done(&report);

    Ok(report)
}

/// `{"response": [{"content": answer}]}`.
pub fn completion_results(answer: &str) -> ResultSet {
    let mut results = ResultSet::new();
    results.push_fields(
        RESPONSE_CATEGORY,
        Fields::from([(
            "content".to_string(),
            Scalar::from(autoresearch_xml::strip_illegal_chars(answer).into_owned()),
        )]),
    );
    results
}

fn source_fields(source: &Source) -> Fields {
    Fields::from([
        ("url".to_string(), Scalar::from(source.url.as_str())),
        ("kind".to_string(), Scalar::from(source.kind.as_str())),
    ])
}

/// Fetch every source in order. A failed source becomes an `{url, error}` item.
async fn fetch_sources(
    config: &ResearchConfig,
    sources: &[Source],
    results: &mut ResultSet,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let fetcher = Fetcher::new(&config.fetch)?;
    let total = sources.len();

    for (i, source) in sources.iter().enumerate() {
        let url = source.url.as_str();
        match source.kind {
            SourceKind::Web => {
                let fields = match fetcher.scrape_page(url).await {
                    Ok(page) => page_fields(&page),
                    Err(e) => {
                        warn!(url, error = %e, "failed to fetch or parse HTML content");
                        error_fields(url, "Failed to fetch or parse HTML content.", &e)
                    }
                };
                results.push_fields(WEB_PAGES_CATEGORY, xml_safe(url, fields));
            }
            SourceKind::Api => {
                let fields = match fetcher.fetch_api(url, config.api_token.as_deref()).await {
                    Ok(value) => api_fields(url, &value),
                    Err(e) => {
                        warn!(url, error = %e, "failed to fetch or parse API data");
                        error_fields(url, "Failed to fetch or parse API data.", &e)
                    }
                };
                results.push_fields(API_DATA_CATEGORY, xml_safe(url, fields));
            }
        }
        progress.source_fetched(url, i + 1, total);
    }

    Ok(())
}

fn page_fields(page: &ScrapedPage) -> Fields {
    let headings = (!page.headings.is_empty()).then(|| page.headings.join("; "));
    Fields::from([
        ("url".to_string(), Scalar::from(page.url.as_str())),
        ("title".to_string(), Scalar::from(page.title.clone())),
        ("description".to_string(), Scalar::from(page.description.clone())),
        ("headings".to_string(), Scalar::from(headings)),
    ])
}

fn error_fields(url: &str, summary: &str, err: &autoresearch_shared::ResearchError) -> Fields {
    Fields::from([
        ("url".to_string(), Scalar::from(url)),
        ("error".to_string(), Scalar::from(summary)),
        ("detail".to_string(), Scalar::from(err.to_string())),
    ])
}

/// Flatten a JSON payload into one item: top-level scalars as-is, anything
/// nested as compact JSON text. Keys are made tag-safe; a key that clashes with
/// the source `url` or an earlier key gets a numeric suffix.
fn api_fields(url: &str, value: &serde_json::Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert("url".to_string(), Scalar::from(url));

    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                insert_unique(&mut fields, tag_safe(key), json_scalar(value));
            }
        }
        other => insert_unique(&mut fields, "data".to_string(), json_scalar(other)),
    }
    fields
}

fn insert_unique(fields: &mut Fields, key: String, value: Scalar) {
    if !fields.contains_key(&key) {
        fields.insert(key, value);
        return;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{key}_{n}");
        if !fields.contains_key(&candidate) {
            fields.insert(candidate, value);
            return;
        }
        n += 1;
    }
}

/// Remove characters XML cannot carry from fetched text fields.
fn xml_safe(url: &str, mut fields: Fields) -> Fields {
    let mut stripped = 0;
    for value in fields.values_mut() {
        let Scalar::Text(text) = value else { continue };
        let clean = match autoresearch_xml::strip_illegal_chars(text) {
            Cow::Owned(clean) => clean,
            Cow::Borrowed(_) => continue,
        };
        *text = clean;
        stripped += 1;
    }
    if stripped > 0 {
        warn!(url, fields = stripped, "removed characters XML cannot represent");
    }
    fields
}

fn json_scalar(value: &serde_json::Value) -> Scalar {
    match value {
        serde_json::Value::Null => Scalar::Absent,
        serde_json::Value::Bool(b) => Scalar::Bool(*b),
        serde_json::Value::Number(n) => Scalar::Number(n.clone()),
        serde_json::Value::String(s) => Scalar::Text(s.clone()),
        nested => Scalar::Text(nested.to_string()),
    }
}

/// Replace characters that cannot appear in a tag with `_`.
fn tag_safe(key: &str) -> String {
    if autoresearch_xml::is_valid_tag(key) {
        return key.to_string();
    }
    let replaced: String = key
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    if autoresearch_xml::is_valid_tag(&replaced) {
        replaced
    } else {
        format!("_{replaced}")
    }
}
