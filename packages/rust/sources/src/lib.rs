//! Keyword-driven source determination.
//!
//! A query is tokenized and matched against a fixed table of keyword rules.
//! Each matching rule contributes its web pages and API endpoints. Sources the
//! user names explicitly are appended after the heuristic ones.

mod tokenize;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use autoresearch_shared::{ResearchError, Result};

pub use tokenize::{is_stop_word, tokenize};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// How a source is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// HTML page, scraped.
    Web,
    /// JSON API, fetched.
    Api,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate place to look for answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub kind: SourceKind,
}

impl Source {
    pub fn web(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: SourceKind::Web,
        }
    }

    pub fn api(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: SourceKind::Api,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.url)
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A keyword rule: any matching token selects all of its sources.
struct Rule {
    topic: &'static str,
    keywords: &'static [&'static str],
    web: &'static [&'static str],
    api: &'static [&'static str],
}

const PUBLIC_APIS: &str = "https://publicapis.dev/api";

const RULES: &[Rule] = &[
    Rule {
        topic: "corporate_misconduct",
        keywords: &["misconduct", "corporate"],
        web: &[
            "https://eyfinancialservicesthoughtgallery.ie/wp-content/uploads/2016/08/EY_Global_Fraud_Survey.pdf",
        ],
        api: &[PUBLIC_APIS],
    },
    Rule {
        topic: "technical_specifications",
        keywords: &["specifications", "technical"],
        web: &["https://senzahydrogen.com/understanding-pem-electrolyzer-components.html"],
        api: &[PUBLIC_APIS],
    },
];

/// Pick candidate sources for `query` from the keyword rules.
///
/// Sources appear in rule order, each URL at most once. An unmatched query
/// yields an empty list.
#[instrument(skip_all, fields(query = %query))]
pub fn determine_sources(query: &str) -> Vec<Source> {
    let tokens = tokenize(query);
    debug!(?tokens, "query tokenized");

    let mut sources: Vec<Source> = Vec::new();
    for rule in RULES {
        if !rule.keywords.iter().any(|k| tokens.iter().any(|t| t.as_str() == *k)) {
            continue;
        }
        debug!(topic = rule.topic, "keyword rule matched");

        let candidates = rule
            .web
            .iter()
            .map(|url| Source::web(*url))
            .chain(rule.api.iter().map(|url| Source::api(*url)));
        for source in candidates {
            if !sources.iter().any(|s| s.url == source.url) {
                sources.push(source);
            }
        }
    }

    info!(count = sources.len(), "sources determined");
    sources
}

/// Append user-supplied page URLs, then API URLs, to `sources`.
///
/// Entries are trimmed and blank ones skipped. Every remaining entry must be an
/// absolute `http`/`https` URL.
pub fn include_user_sources(
    mut sources: Vec<Source>,
    urls: &[String],
    apis: &[String],
) -> Result<Vec<Source>> {
    let before = sources.len();

    for url in clean(urls) {
        sources.push(Source::web(validate_url(url)?));
    }
    for api in clean(apis) {
        sources.push(Source::api(validate_url(api)?));
    }

    info!(added = sources.len() - before, "user-specified sources included");
    Ok(sources)
}

/// Split a newline-separated block into trimmed, non-empty entries.
pub fn split_lines(block: &str) -> Vec<String> {
    clean_iter(block.lines()).map(str::to_string).collect()
}

fn clean(entries: &[String]) -> impl Iterator<Item = &str> {
    clean_iter(entries.iter().map(String::as_str))
}

fn clean_iter<'a>(entries: impl Iterator<Item = &'a str>) -> impl Iterator<Item = &'a str> {
    entries.map(str::trim).filter(|e| !e.is_empty())
}

fn validate_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|e| ResearchError::validation(format!("invalid source URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(ResearchError::validation(format!(
            "unsupported scheme '{other}' in source URL '{raw}'"
        ))),
    }
}
