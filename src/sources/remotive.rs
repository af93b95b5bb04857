// src/sources/remotive.rs
//! Remotive JSON API adapter. The category endpoint cannot filter by free
//! text, so the query containment rule is applied locally before mapping.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::filter::{matches_query_terms, passes_filters};
use crate::model::{FilterSpec, Posting};
use crate::sources::{fetch_text, json_str, parse_posted_date, JobSource, BROWSER_UA};

const DEFAULT_BASE: &str = "https://remotive.com";

pub struct RemotiveSource {
    client: reqwest::Client,
    base: String,
    reputability: u8,
    cap: usize,
    timeout: Duration,
}

impl RemotiveSource {
    pub fn new(client: reqwest::Client, cfg: &SourceConfig) -> Self {
        Self {
            client,
            base: DEFAULT_BASE.to_string(),
            reputability: cfg.reputability,
            cap: cfg.cap,
            timeout: cfg.timeout,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn map_posting(&self, job: &Value) -> Option<Posting> {
        let title = json_str(job, "title")?;
        let url = json_str(job, "url")?;
        Some(Posting {
            title,
            company: json_str(job, "company_name")
                .unwrap_or_else(|| "See posting".to_string()),
            // Everything on this board is remote by definition.
            location: "Remote".to_string(),
            salary: json_str(job, "salary"),
            posted_date: parse_posted_date(json_str(job, "publication_date").as_deref()),
            url,
            description: json_str(job, "description"),
            source: "Remotive".to_string(),
            reputability: crate::model::clamp_score(self.reputability as i32),
            relevance: 0,
        })
    }
}

#[async_trait]
impl JobSource for RemotiveSource {
    async fn search(
        &self,
        filters: &FilterSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Posting>> {
        let url = format!(
            "{}/api/remote-jobs?category=software-dev&limit=50",
            self.base
        );
        tracing::debug!(source = "Remotive", %url, "calling api");

        let req = self
            .client
            .get(&url)
            .header("User-Agent", BROWSER_UA)
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", format!("{}/", self.base));

        let body = match fetch_text(req, self.timeout, cancel).await {
            Ok(b) => b,
            Err(SourceError::Cancelled) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if body.trim_start().starts_with('<') {
            return Err(
                SourceError::Protocol("HTML returned instead of JSON (blocked?)".into()).into(),
            );
        }

        let response: Value =
            serde_json::from_str(&body).context("decoding remotive response")?;
        let jobs = response
            .get("jobs")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::Protocol("response missing `jobs`".into()))?;

        counter!("search_postings_total").increment(jobs.len() as u64);
        tracing::debug!(source = "Remotive", raw = jobs.len(), "raw results");

        let mut postings = Vec::new();
        for job in jobs {
            let title = json_str(job, "title").unwrap_or_default();
            let description = json_str(job, "description").unwrap_or_default();
            if title.is_empty() {
                continue;
            }
            let combined = format!("{title} {description}").to_lowercase();
            if !matches_query_terms(&combined, &filters.query) {
                continue;
            }
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
        "Remotive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::source_config;

    fn source() -> RemotiveSource {
        RemotiveSource::new(reqwest::Client::new(), source_config("Remotive").unwrap())
    }

    #[test]
    fn mapper_fixes_location_to_remote() {
        let job = serde_json::json!({
            "title": "Backend Developer",
            "url": "https://remotive.test/jobs/1",
            "company_name": "Acme",
            "publication_date": "2025-09-15T08:30:00"
        });
        let p = source().map_posting(&job).unwrap();
        assert_eq!(p.location, "Remote");
        assert_eq!(p.company, "Acme");
        assert_eq!(p.reputability, 8);
        assert!(p.salary.is_none());
    }

    #[test]
    fn mapper_requires_title_and_url() {
        assert!(source()
            .map_posting(&serde_json::json!({"title": "Dev"}))
            .is_none());
    }
}
