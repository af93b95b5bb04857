// src/sources/weworkremotely.rs
//! We Work Remotely adapter. The search endpoint 403s non-browser clients,
//! so the category listing is scraped instead and filtered locally.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tokio_util::sync::CancellationToken;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::filter::{matches_query_terms, passes_filters};
use crate::model::{FilterSpec, Posting};
use crate::sources::extract::{looks_like_interstitial, sel};
use crate::sources::{fetch_text, JobSource, BROWSER_UA};

const DEFAULT_BASE: &str = "https://weworkremotely.com";

static LISTING_SEL: Lazy<Selector> = Lazy::new(|| sel("li"));
static JOB_LINK_SEL: Lazy<Selector> = Lazy::new(|| sel("a[href*='/remote-jobs/']"));
static TITLE_SPAN_SEL: Lazy<Selector> = Lazy::new(|| sel("span.title"));
static COMPANY_SPAN_SEL: Lazy<Selector> = Lazy::new(|| sel("span.company"));

pub struct WeWorkRemotelySource {
    client: reqwest::Client,
    base: String,
    reputability: u8,
    cap: usize,
    timeout: Duration,
}

impl WeWorkRemotelySource {
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

    fn parse_listing(&self, html: &str, filters: &FilterSpec) -> Vec<Posting> {
        let doc = Html::parse_document(html);
        let mut postings = Vec::new();
        let mut raw = 0u64;

        for listing in doc.select(&LISTING_SEL) {
            if listing.select(&JOB_LINK_SEL).next().is_none() {
                continue;
            }
            raw += 1;
            let text = listing.text().collect::<String>().to_lowercase();
            if !matches_query_terms(&text, &filters.query) {
                continue;
            }
            if let Some(posting) = self.parse_job(&listing) {
                if passes_filters(&posting, filters) {
                    postings.push(posting);
                }
            }
            if postings.len() >= self.cap {
                break;
            }
        }

        counter!("search_postings_total").increment(raw);
        postings
    }

    fn parse_job(&self, listing: &ElementRef<'_>) -> Option<Posting> {
        let link = listing.select(&JOB_LINK_SEL).next()?;

        let mut title = collapse_ws(&link.text().collect::<String>());
        if title.is_empty() {
            title = listing
                .select(&TITLE_SPAN_SEL)
                .next()
                .map(|t| collapse_ws(&t.text().collect::<String>()))
                .unwrap_or_default();
        }
        if title.is_empty() {
            return None;
        }

        // Company lives in its own span, or in "Company | Title" link text.
        let mut company = listing
            .select(&COMPANY_SPAN_SEL)
            .next()
            .map(|c| collapse_ws(&c.text().collect::<String>()))
            .unwrap_or_default();
        if company.is_empty() {
            if let Some((left, right)) = title.split_once('|') {
                company = left.trim().to_string();
                title = right.trim().to_string();
            } else {
                company = "See posting".to_string();
            }
        }

        let href = link.value().attr("href")?;
        let url = if href.starts_with('/') {
            format!("{}{}", self.base, href)
        } else {
            href.to_string()
        };

        Some(Posting {
            title,
            company,
            location: "Remote".to_string(),
            salary: None,
            posted_date: chrono::Utc::now().date_naive(),
            url,
            description: None,
            source: "WeWorkRemotely".to_string(),
            reputability: crate::model::clamp_score(self.reputability as i32),
            relevance: 0,
        })
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl JobSource for WeWorkRemotelySource {
    async fn search(
        &self,
        filters: &FilterSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Posting>> {
        let url = format!("{}/categories/remote-programming-jobs", self.base);
        tracing::debug!(source = "WeWorkRemotely", %url, "fetching category page");

        let req = self
            .client
            .get(&url)
            .header("User-Agent", BROWSER_UA)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Referer", "https://www.google.com/");

        let body = match fetch_text(req, self.timeout, cancel).await {
            Ok(b) => b,
            Err(SourceError::Cancelled) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if looks_like_interstitial(&Html::parse_document(&body)) {
            return Err(SourceError::Protocol("anti-bot interstitial".into()).into());
        }

        Ok(self.parse_listing(&body, filters))
    }

    fn name(&self) -> &'static str {
        "WeWorkRemotely"
    }
}
