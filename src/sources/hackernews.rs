// src/sources/hackernews.rs
//! Hacker News "Who is hiring?" adapter. Two-phase static scrape: locate the
//! newest hiring thread from the whoishiring submission list, then walk the
//! comment tree. Comments are free text, so field extraction is heuristic
//! and the query containment rule gates every comment.

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
use crate::sources::{fetch_text, normalize_text, truncate_chars, JobSource, BROWSER_UA};

const DEFAULT_BASE: &str = "https://news.ycombinator.com";
/// Polite gap between the submission-list fetch and the thread fetch.
const THREAD_FETCH_DELAY: Duration = Duration::from_secs(1);

static SUBMISSION_SEL: Lazy<Selector> = Lazy::new(|| sel("tr.athing"));
static SUBMISSION_TITLE_SEL: Lazy<Selector> = Lazy::new(|| sel("span.titleline a"));
static COMMENT_ROW_SEL: Lazy<Selector> = Lazy::new(|| sel("tr.comtr"));
static COMMENT_TEXT_SEL: Lazy<Selector> = Lazy::new(|| sel("div.comment"));
static COMMENT_AGE_SEL: Lazy<Selector> = Lazy::new(|| sel("span.age a"));

pub struct HackerNewsSource {
    client: reqwest::Client,
    base: String,
    reputability: u8,
    cap: usize,
    timeout: Duration,
}

impl HackerNewsSource {
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

    async fn fetch_page(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SourceError> {
        let req = self.client.get(url).header("User-Agent", BROWSER_UA);
        fetch_text(req, self.timeout, cancel).await
    }

    /// Find the newest "Who is hiring?" submission and return its item URL.
    fn find_hiring_thread(&self, submissions_html: &str) -> Option<String> {
        let doc = Html::parse_document(submissions_html);
        for submission in doc.select(&SUBMISSION_SEL) {
            let title = submission
                .select(&SUBMISSION_TITLE_SEL)
                .next()
                .map(|t| t.text().collect::<String>())
                .unwrap_or_default();
            if title.contains("Who is hiring?") {
                let id = submission.value().attr("id")?;
                return Some(format!("{}/item?id={}", self.base, id));
            }
        }
        None
    }

    /// Walk comment rows, keep the ones matching the query, up to the cap.
    fn parse_thread(
        &self,
        thread_html: &str,
        thread_url: &str,
        filters: &FilterSpec,
    ) -> Vec<Posting> {
        let doc = Html::parse_document(thread_html);
        let mut postings = Vec::new();
        let mut raw = 0u64;

        for comment in doc.select(&COMMENT_ROW_SEL) {
            raw += 1;
            let text = comment
                .text()
                .collect::<String>()
                .to_lowercase();
            if !matches_query_terms(&text, &filters.query) {
                continue;
            }
            if let Some(posting) = self.parse_comment(&comment, thread_url) {
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

    /// Heuristic extraction from one comment. Convention in these threads is
    /// `Company | Role | Location | ...` on the first line.
    fn parse_comment(&self, comment: &ElementRef<'_>, thread_url: &str) -> Option<Posting> {
        let body = comment.select(&COMMENT_TEXT_SEL).next()?;
        let text = normalize_text(&body.text().collect::<String>());
        if text.is_empty() {
            return None;
        }

        let company = match text.split('|').next().map(str::trim) {
            Some(first) if !first.is_empty() => truncate_chars(first, 50),
            _ => "See posting".to_string(),
        };
        let title = truncate_chars(&text, 100);

        let lower = text.to_lowercase();
        let location = if lower.contains("remote") {
            "Remote"
        } else if lower.contains("on-site") || lower.contains("onsite") {
            "On-site"
        } else if lower.contains("hybrid") {
            "Hybrid"
        } else {
            "See posting"
        };

        let url = comment
            .select(&COMMENT_AGE_SEL)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| format!("{}/{}", self.base, href))
            .unwrap_or_else(|| thread_url.to_string());

        Some(Posting {
            title,
            company,
            location: location.to_string(),
            salary: None,
            posted_date: chrono::Utc::now().date_naive(),
            url,
            description: Some(truncate_chars(&text, 500)),
            source: "HackerNews".to_string(),
            reputability: crate::model::clamp_score(self.reputability as i32),
            relevance: 0,
        })
    }
}

#[async_trait]
impl JobSource for HackerNewsSource {
    async fn search(
        &self,
        filters: &FilterSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Posting>> {
        let list_url = format!("{}/submitted?id=whoishiring", self.base);
        let submissions = match self.fetch_page(&list_url, cancel).await {
            Ok(b) => b,
            Err(SourceError::Cancelled) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if looks_like_interstitial(&Html::parse_document(&submissions)) {
            return Err(SourceError::Protocol("interstitial on submission list".into()).into());
        }

        let Some(thread_url) = self.find_hiring_thread(&submissions) else {
            tracing::warn!(source = "HackerNews", "no recent hiring thread found");
            return Ok(Vec::new());
        };
        tracing::debug!(source = "HackerNews", %thread_url, "found hiring thread");

        tokio::select! {
            _ = cancel.cancelled() => return Ok(Vec::new()),
            _ = tokio::time::sleep(THREAD_FETCH_DELAY) => {}
        }

        let thread = match self.fetch_page(&thread_url, cancel).await {
            Ok(b) => b,
            Err(SourceError::Cancelled) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if looks_like_interstitial(&Html::parse_document(&thread)) {
            return Err(SourceError::Protocol("interstitial on thread page".into()).into());
        }

        Ok(self.parse_thread(&thread, &thread_url, filters))
    }

    fn name(&self) -> &'static str {
        "HackerNews"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::source_config;

    fn source() -> HackerNewsSource {
        HackerNewsSource::new(reqwest::Client::new(), source_config("HackerNews").unwrap())
    }

    const SUBMITTED: &str = r#"<html><body><table>
        <tr class="athing" id="41000001">
          <td><span class="titleline"><a href="item?id=41000001">Ask HN: Who wants to be hired? (June 2025)</a></span></td>
        </tr>
        <tr class="athing" id="41000002">
          <td><span class="titleline"><a href="item?id=41000002">Ask HN: Who is hiring? (June 2025)</a></span></td>
        </tr>
    </table></body></html>"#;

    #[test]
    fn picks_the_hiring_thread_not_the_hired_thread() {
        let url = source().find_hiring_thread(SUBMITTED).unwrap();
        assert_eq!(url, "https://news.ycombinator.com/item?id=41000002");
    }

    #[test]
    fn parses_comment_fields() {
        let thread = r#"<html><body><table>
          <tr class="comtr"><td>
            <span class="age"><a href="item?id=41000099">1 day ago</a></span>
            <div class="comment">Acme Robotics | Senior Rust Developer | Remote (US) | We build robots.</div>
          </td></tr>
        </table></body></html>"#;
        let filters = FilterSpec::new("rust developer");
        let out = source().parse_thread(thread, "https://news.ycombinator.com/item?id=1", &filters);
        assert_eq!(out.len(), 1);
        let p = &out[0];
        assert_eq!(p.company, "Acme Robotics");
        assert!(p.title.starts_with("Acme Robotics | Senior Rust Developer"));
        assert_eq!(p.location, "Remote");
        assert_eq!(p.url, "https://news.ycombinator.com/item?id=41000099");
        assert_eq!(p.reputability, 8);
    }

    #[test]
    fn skips_comments_not_matching_query() {
        let thread = r#"<html><body><table>
          <tr class="comtr"><td><div class="comment">Bakery | Pastry Chef | On-site</div></td></tr>
        </table></body></html>"#;
        let filters = FilterSpec::new("rust developer");
        let out = source().parse_thread(thread, "https://t", &filters);
        assert!(out.is_empty());
    }

    #[test]
    fn thread_cap_is_forty() {
        assert_eq!(source().cap, 40);
    }
}
