// src/sources/linkedin.rs
//! LinkedIn jobs adapter (script-rendered; needs the shared browser
//! session). Experience level and work model are encoded into the search
//! URL with LinkedIn's own facet codes, and re-checked locally afterwards
//! because the upstream facets are unreliable.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tokio_util::sync::CancellationToken;

use crate::browser::BrowserSession;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::filter::passes_filters;
use crate::model::{ExperienceLevel, FilterSpec, Posting, WorkModel};
use crate::sources::extract::{first_attr, first_text, looks_like_interstitial, sel};
use crate::sources::JobSource;

const SEARCH_BASE: &str = "https://www.linkedin.com/jobs/search/";
const FALLBACK_URL: &str = "https://www.linkedin.com/jobs/";

static CARD_SEL: Lazy<Selector> = Lazy::new(|| sel("div.base-card, div.job-search-card"));
static TITLE_SELS: Lazy<Vec<Selector>> =
    Lazy::new(|| vec![sel("h3.base-search-card__title"), sel("span.sr-only")]);
static COMPANY_SELS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        sel("h4.base-search-card__subtitle"),
        sel("a.hidden-nested-link"),
    ]
});
static LOCATION_SELS: Lazy<Vec<Selector>> =
    Lazy::new(|| vec![sel("span.job-search-card__location")]);
static LINK_SELS: Lazy<Vec<Selector>> = Lazy::new(|| vec![sel("a.base-card__full-link")]);

pub struct LinkedInSource {
    session: Arc<BrowserSession>,
    reputability: u8,
    cap: usize,
    settle: Duration,
}

impl LinkedInSource {
    pub fn new(session: Arc<BrowserSession>, cfg: &SourceConfig) -> Self {
        Self {
            session,
            reputability: cfg.reputability,
            cap: cfg.cap,
            settle: cfg.settle,
        }
    }

    fn build_url(&self, filters: &FilterSpec) -> String {
        let mut url = format!(
            "{SEARCH_BASE}?keywords={}",
            filters.query.trim().replace(' ', "%20")
        );

        if filters.has_location_filter() {
            url.push_str(&format!(
                "&location={}&distance=50",
                filters.location_string().replace(' ', "%20")
            ));
        } else {
            url.push_str("&location=");
        }

        match filters.experience_level {
            ExperienceLevel::Junior => url.push_str("&f_E=1,2"),
            ExperienceLevel::Mid => url.push_str("&f_E=3"),
            ExperienceLevel::Senior => url.push_str("&f_E=4,5,6"),
            ExperienceLevel::NoPreference => {}
        }

        match filters.work_model {
            WorkModel::Remote => url.push_str("&f_WT=2"),
            WorkModel::Hybrid => url.push_str("&f_WT=3"),
            WorkModel::OnSite => url.push_str("&f_WT=1"),
            WorkModel::NoPreference => {}
        }

        // Past 24 hours only; stale postings drown out everything else.
        url.push_str("&f_TPR=r86400");
        url
    }

    fn parse_rendered(&self, html: &str, filters: &FilterSpec) -> Vec<Posting> {
        let doc = Html::parse_document(html);
        let mut postings = Vec::new();
        let mut raw = 0u64;

        for card in doc.select(&CARD_SEL) {
            raw += 1;
            if let Some(posting) = self.parse_card(&card) {
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

    fn parse_card(&self, card: &ElementRef<'_>) -> Option<Posting> {
        let title = first_text(card, &TITLE_SELS)?;
        Some(Posting {
            title,
            company: first_text(card, &COMPANY_SELS)
                .unwrap_or_else(|| "See posting".to_string()),
            location: first_text(card, &LOCATION_SELS)
                .unwrap_or_else(|| "Not specified".to_string()),
            salary: None,
            posted_date: chrono::Utc::now().date_naive(),
            url: first_attr(card, &LINK_SELS, "href")
                .map(absolutize)
                .unwrap_or_else(|| FALLBACK_URL.to_string()),
            description: None,
            source: "LinkedIn".to_string(),
            reputability: crate::model::clamp_score(self.reputability as i32),
            relevance: 0,
        })
    }
}

/// Rendered DOM hrefs may be site-relative; postings always carry an
/// absolute URL.
fn absolutize(href: String) -> String {
    if href.starts_with('/') {
        format!("https://www.linkedin.com{href}")
    } else {
        href
    }
}

#[async_trait]
impl JobSource for LinkedInSource {
    async fn search(
        &self,
        filters: &FilterSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Posting>> {
        if !self.session.is_active().await {
            tracing::warn!(source = "LinkedIn", "browser session inactive, skipping");
            return Ok(Vec::new());
        }

        let url = self.build_url(filters);
        tracing::debug!(source = "LinkedIn", %url, "rendering search page");

        let html = match self.session.render(&url, self.settle, false, cancel).await {
            Ok(h) => h,
            Err(SourceError::Cancelled) | Err(SourceError::BrowserUnavailable) => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e.into()),
        };

        if looks_like_interstitial(&Html::parse_document(&html)) {
            return Err(SourceError::Protocol("anti-bot interstitial".into()).into());
        }

        Ok(self.parse_rendered(&html, filters))
    }

    fn name(&self) -> &'static str {
        "LinkedIn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::source_config;

    fn source() -> LinkedInSource {
        LinkedInSource::new(
            Arc::new(BrowserSession::inactive()),
            source_config("LinkedIn").unwrap(),
        )
    }

    #[test]
    fn url_encodes_facets() {
        let mut filters = FilterSpec::new("software engineer");
        filters.experience_level = ExperienceLevel::Senior;
        filters.work_model = WorkModel::Remote;
        filters.city = Some("Austin".into());
        filters.state = Some("TX".into());

        let url = source().build_url(&filters);
        assert!(url.contains("keywords=software%20engineer"));
        assert!(url.contains("location=Austin,%20TX"));
        assert!(url.contains("&distance=50"));
        assert!(url.contains("&f_E=4,5,6"));
        assert!(url.contains("&f_WT=2"));
        assert!(url.contains("&f_TPR=r86400"));
    }

    #[test]
    fn parses_cards_with_defaults() {
        let html = r#"<html><head><title>Jobs</title></head><body>
          <div class="base-card">
            <h3 class="base-search-card__title">Senior Software Engineer</h3>
            <h4 class="base-search-card__subtitle">Acme</h4>
            <span class="job-search-card__location">Remote (US)</span>
            <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/1"></a>
          </div>
          <div class="job-search-card">
            <span class="sr-only">Data Engineer</span>
          </div>
        </body></html>"#;

        let filters = FilterSpec::new("engineer");
        let out = source().parse_rendered(html, &filters);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Senior Software Engineer");
        assert_eq!(out[0].company, "Acme");
        assert_eq!(out[0].url, "https://www.linkedin.com/jobs/view/1");
        assert_eq!(out[0].reputability, 10);
        // Second card exercises the selector fallbacks and defaults.
        assert_eq!(out[1].company, "See posting");
        assert_eq!(out[1].location, "Not specified");
        assert_eq!(out[1].url, FALLBACK_URL);
    }

    #[test]
    fn relative_hrefs_are_absolutized() {
        let html = r#"<div class="base-card">
            <h3 class="base-search-card__title">Software Engineer</h3>
            <a class="base-card__full-link" href="/jobs/view/42"></a>
          </div>"#;
        let filters = FilterSpec::new("engineer");
        let out = source().parse_rendered(html, &filters);
        assert_eq!(out[0].url, "https://www.linkedin.com/jobs/view/42");
    }

    #[test]
    fn cards_without_titles_are_dropped() {
        let html = r#"<div class="base-card"><h4 class="base-search-card__subtitle">Acme</h4></div>"#;
        let filters = FilterSpec::new("engineer");
        assert!(source().parse_rendered(html, &filters).is_empty());
    }

    #[tokio::test]
    async fn inactive_session_yields_empty_without_error() {
        let filters = FilterSpec::new("engineer");
        let cancel = CancellationToken::new();
        let out = source().search(&filters, &cancel).await.unwrap();
        assert!(out.is_empty());
    }
}
