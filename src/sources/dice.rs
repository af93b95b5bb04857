// src/sources/dice.rs
//! Dice adapter (script-rendered; needs the shared browser session). The
//! results page markup shifts between frontend deploys, so card and field
//! lookups go through ordered selector fallbacks with the job-detail link
//! as the anchor of last resort.

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
use crate::model::{FilterSpec, Posting, WorkModel};
use crate::sources::extract::{first_attr, first_text, looks_like_interstitial, sel};
use crate::sources::JobSource;

const SEARCH_BASE: &str = "https://www.dice.com/jobs";
const FALLBACK_URL: &str = "https://www.dice.com/jobs";

static CARD_SELS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        sel("div[id^='card-']"),
        sel("div.card"),
        sel("div[class*='job']"),
    ]
});
static DETAIL_LINK_SEL: Lazy<Selector> = Lazy::new(|| sel("a[href*='/job-detail/']"));
static TITLE_SELS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        sel("a[id^='jobTitle']"),
        sel("a.card-title-link"),
        sel("a[href*='/job-detail/']"),
    ]
});
static COMPANY_SELS: Lazy<Vec<Selector>> =
    Lazy::new(|| vec![sel("span.company"), sel("div.company"), sel("a.company")]);
static LOCATION_SELS: Lazy<Vec<Selector>> =
    Lazy::new(|| vec![sel("span.location"), sel("div.location")]);

pub struct DiceSource {
    session: Arc<BrowserSession>,
    reputability: u8,
    cap: usize,
    settle: Duration,
}

impl DiceSource {
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
            "{SEARCH_BASE}?q={}",
            filters.query.trim().replace(' ', "%20")
        );

        if filters.has_location_filter() {
            url.push_str(&format!(
                "&location={}&radius=50",
                filters.location_string().replace(' ', "%20")
            ));
        }

        if filters.work_model == WorkModel::Remote {
            url.push_str("&filters.workplaceTypes=Remote");
        }

        url.push_str("&filters.postedDate=ONE&pageSize=25");
        url
    }

    fn parse_rendered(&self, html: &str, filters: &FilterSpec) -> Vec<Posting> {
        let doc = Html::parse_document(html);

        let mut cards: Vec<ElementRef<'_>> = Vec::new();
        for selector in CARD_SELS.iter() {
            cards = doc.select(selector).collect();
            if !cards.is_empty() {
                break;
            }
        }
        // Last resort: anchor on the detail links and take their parents.
        if cards.is_empty() {
            cards = doc
                .select(&DETAIL_LINK_SEL)
                .filter_map(|link| link.parent().and_then(ElementRef::wrap))
                .collect();
        }

        let mut postings = Vec::new();
        let mut raw = 0u64;
        for card in &cards {
            raw += 1;
            if let Some(posting) = self.parse_card(card) {
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
            url: first_attr(card, &TITLE_SELS, "href")
                .map(absolutize)
                .unwrap_or_else(|| FALLBACK_URL.to_string()),
            description: None,
            source: "Dice".to_string(),
            reputability: crate::model::clamp_score(self.reputability as i32),
            relevance: 0,
        })
    }
}

/// Rendered DOM hrefs may be site-relative; postings always carry an
/// absolute URL.
fn absolutize(href: String) -> String {
    if href.starts_with('/') {
        format!("https://www.dice.com{href}")
    } else {
        href
    }
}

#[async_trait]
impl JobSource for DiceSource {
    async fn search(
        &self,
        filters: &FilterSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Posting>> {
        if !self.session.is_active().await {
            tracing::warn!(source = "Dice", "browser session inactive, skipping");
            return Ok(Vec::new());
        }

        let url = self.build_url(filters);
        tracing::debug!(source = "Dice", %url, "rendering search page");

        // Results load lazily; scroll to mid-page before extracting.
        let html = match self.session.render(&url, self.settle, true, cancel).await {
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
        "Dice"
    }
}
