// src/sources/adzuna.rs
//! Adzuna JSON API adapter (documented endpoint, credentialed).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::filter::passes_filters;
use crate::model::{FilterSpec, Posting};
use crate::sources::{fetch_text, json_str, parse_posted_date, JobSource, POLITE_UA};

const DEFAULT_BASE: &str = "https://api.adzuna.com";

pub struct AdzunaSource {
    client: reqwest::Client,
    app_id: String,
    app_key: String,
    base: String,
    reputability: u8,
    cap: usize,
    timeout: Duration,
}

impl AdzunaSource {
    pub fn new(
        client: reqwest::Client,
        cfg: &SourceConfig,
        app_id: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            app_id: app_id.into(),
            app_key: app_key.into(),
            base: DEFAULT_BASE.to_string(),
            reputability: cfg.reputability,
            cap: cfg.cap,
            timeout: cfg.timeout,
        }
    }

    /// Point the adapter at a replayed fixture server (tests).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn build_url(&self, filters: &FilterSpec) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/v1/api/jobs/us/search/1", self.base))
            .context("adzuna base url")?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("app_id", &self.app_id);
            q.append_pair("app_key", &self.app_key);
            q.append_pair("results_per_page", "50");
            q.append_pair("what", filters.query.trim());
            if filters.has_location_filter() {
                q.append_pair("where", &filters.location_string());
                q.append_pair("distance", "50");
            }
            // Work model is deliberately NOT forwarded: adding "remote" to the
            // upstream query over-restricts results. The post-fetch filter
            // handles it instead.
        }
        Ok(url)
    }

    /// Map one loosely-typed upstream record; `None` drops the record.
    fn map_posting(&self, job: &Value) -> Option<Posting> {
        let title = json_str(job, "title")?;
        let url = json_str(job, "redirect_url")?;

        let company = job
            .get("company")
            .and_then(|c| json_str(c, "display_name"))
            .unwrap_or_else(|| "See posting".to_string());
        let location = job
            .get("location")
            .and_then(|l| json_str(l, "display_name"))
            .unwrap_or_else(|| "Not specified".to_string());

        let salary = match (
            job.get("salary_min").and_then(Value::as_f64),
            job.get("salary_max").and_then(Value::as_f64),
        ) {
            (Some(min), Some(max)) if min > 0.0 && max > 0.0 => {
                Some(format!("${} - ${}", group_thousands(min), group_thousands(max)))
            }
            _ => None,
        };

        Some(Posting {
            title,
            company,
            location,
            salary,
            posted_date: parse_posted_date(json_str(job, "created").as_deref()),
            url,
            description: json_str(job, "description"),
            source: "Adzuna".to_string(),
            reputability: crate::model::clamp_score(self.reputability as i32),
            relevance: 0,
        })
    }
}

#[async_trait]
impl JobSource for AdzunaSource {
    async fn search(
        &self,
        filters: &FilterSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Posting>> {
        let url = self.build_url(filters)?;
        tracing::debug!(source = "Adzuna", %url, "calling api");

        let req = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("User-Agent", POLITE_UA);

        let body = match fetch_text(req, self.timeout, cancel).await {
            Ok(b) => b,
            Err(SourceError::Cancelled) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let response: Value =
            serde_json::from_str(&body).context("decoding adzuna response")?;
        let results = response
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::Protocol("response missing `results`".into()))?;

        counter!("search_postings_total").increment(results.len() as u64);
        tracing::debug!(source = "Adzuna", raw = results.len(), "raw results");

        let mut postings = Vec::new();
        for job in results {
            if let Some(posting) = self.map_posting(job) {
                if passes_filters(&posting, filters) {
                    postings.push(posting);
                }
            }
            if postings.len() >= self.cap {
                break;
            }
        }
        Ok(postings)
    }

    fn name(&self) -> &'static str {
        "Adzuna"
    }
}

/// `70000.0` → `"70,000"`. Fractions are dropped.
fn group_thousands(n: f64) -> String {
    let whole = n.round() as i64;
    let digits = whole.abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if whole < 0 {
        format!("-{out}")
    } else {
        out
    }
}
