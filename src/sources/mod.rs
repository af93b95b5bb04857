// src/sources/mod.rs
pub mod adzuna;
pub mod dice;
pub mod extract;
pub mod hackernews;
pub mod linkedin;
pub mod remotive;
pub mod weworkremotely;

use std::time::Duration;

use anyhow::Result;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::error::SourceError;
use crate::model::{FilterSpec, Posting};

/// Polite identification for documented JSON APIs.
pub(crate) const POLITE_UA: &str = "jobscout/0.1 (job search aggregation)";

/// Browser-like identification for boards that reject obvious bots.
pub(crate) const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One operation per source: fetch, normalize, and locally filter postings
/// for the given search. Implementations must honor `cancel` at their next
/// suspension point and return whatever they have gathered so far.
#[async_trait::async_trait]
pub trait JobSource: Send + Sync {
    async fn search(&self, filters: &FilterSpec, cancel: &CancellationToken)
        -> Result<Vec<Posting>>;
    fn name(&self) -> &'static str;
}

/// One-time metrics registration (so series show up on the host's exporter).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_runs_total", "Aggregator searches started.");
        describe_counter!(
            "search_postings_total",
            "Postings parsed from sources before local filtering."
        );
        describe_counter!("search_kept_total", "Postings returned to the caller.");
        describe_counter!(
            "search_rejected_total",
            "Postings dropped by post-fetch filters or empty-title rule."
        );
        describe_counter!("source_errors_total", "Source fetch/parse failures.");
        describe_histogram!("source_fetch_ms", "Per-source wall time in milliseconds.");
        describe_gauge!("search_last_run_ts", "Unix ts of the last aggregator run.");
    });
}

/// Shared HTTP client; safe to clone across adapters.
pub(crate) fn build_http_client(cfg: &crate::config::AppConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(cfg.http_connect_timeout)
        .timeout(cfg.http_read_timeout)
        .build()
        .unwrap_or_default()
}

/// Issue a prepared request and collect the body, honoring the per-call
/// timeout and the cancellation token. Non-2xx responses are protocol
/// failures; cancellation yields `SourceError::Cancelled` so the adapter can
/// return its partial result.
pub(crate) async fn fetch_text(
    req: reqwest::RequestBuilder,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, SourceError> {
    let fetch = async {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Protocol(format!("HTTP {status}")));
        }
        Ok(resp.text().await?)
    };
    tokio::select! {
        _ = cancel.cancelled() => Err(SourceError::Cancelled),
        res = tokio::time::timeout(timeout, fetch) => match res {
            Ok(body) => body,
            Err(_) => Err(SourceError::Timeout(timeout)),
        },
    }
}

/// Normalize extracted text: decode HTML entities, strip tags, straighten
/// typographic quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Take at most `max` characters (not bytes) of `s`.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

/// Defensive string access into loosely-typed upstream JSON.
pub(crate) fn json_str(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

/// Parse the leading `YYYY-MM-DD` of an upstream timestamp; fall back to the
/// fetch date on any shortfall.
pub(crate) fn parse_posted_date(raw: Option<&str>) -> chrono::NaiveDate {
    raw.and_then(|s| s.get(..10))
        .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| chrono::Utc::now().date_naive())
}
