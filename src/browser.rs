// src/browser.rs
//! Scoped headless-browser session shared by the dynamic adapters.
//!
//! One Chromium process per aggregator call, launched on demand and released
//! on every exit path. Page loads are serialized through an internal async
//! mutex; dynamic adapters already run sequentially inside their task group,
//! the mutex is the second layer. A failed launch yields an *inactive*
//! handle: dynamic adapters detect it and contribute empty results instead
//! of failing the search.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::SourceError;
use crate::sources::BROWSER_UA;

const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra wait after the mid-page scroll so lazy-loaded cards render.
const SCROLL_SETTLE: Duration = Duration::from_secs(2);

/// Locate a Chromium binary: `CHROME_BIN` env first, then the usual names
/// on `$PATH`.
fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }
    None
}

struct Inner {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

pub struct BrowserSession {
    inner: tokio::sync::Mutex<Option<Inner>>,
}

impl BrowserSession {
    /// Launch a headless browser. Never fails: on any error the returned
    /// handle is inactive and `render` reports `BrowserUnavailable`.
    pub async fn launch(_cfg: &AppConfig) -> Self {
        match Self::try_launch().await {
            Ok(inner) => {
                tracing::info!("headless browser session initialized");
                Self {
                    inner: tokio::sync::Mutex::new(Some(inner)),
                }
            }
            Err(e) => {
                tracing::warn!(error = ?e, "browser launch failed; dynamic sources disabled");
                Self::inactive()
            }
        }
    }

    /// A handle with no browser behind it.
    pub fn inactive() -> Self {
        Self {
            inner: tokio::sync::Mutex::new(None),
        }
    }

    async fn try_launch() -> Result<Inner> {
        let chrome = find_chromium().context("no chromium binary found")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--window-size=1920,1080")
            .arg(format!("--user-agent={BROWSER_UA}"))
            .request_timeout(PAGE_LOAD_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("launching chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Inner {
            browser,
            handler_task,
        })
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Navigate, wait the settle interval, optionally scroll to mid-page to
    /// trigger lazy loading, and return the rendered document HTML.
    pub async fn render(
        &self,
        url: &str,
        settle: Duration,
        mid_scroll: bool,
        cancel: &CancellationToken,
    ) -> Result<String, SourceError> {
        let guard = self.inner.lock().await;
        let inner = guard.as_ref().ok_or(SourceError::BrowserUnavailable)?;

        let page = tokio::select! {
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            res = tokio::time::timeout(PAGE_LOAD_TIMEOUT, inner.browser.new_page(url)) => match res {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => {
                    return Err(SourceError::Protocol(format!("navigation failed: {e}")))
                }
                Err(_) => return Err(SourceError::Timeout(PAGE_LOAD_TIMEOUT)),
            },
        };

        let result = self.settle_and_extract(&page, settle, mid_scroll, cancel).await;
        let _ = page.close().await;
        result
    }

    async fn settle_and_extract(
        &self,
        page: &chromiumoxide::page::Page,
        settle: Duration,
        mid_scroll: bool,
        cancel: &CancellationToken,
    ) -> Result<String, SourceError> {
        tokio::select! {
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            _ = tokio::time::sleep(settle) => {}
        }

        if mid_scroll {
            let _ = page
                .evaluate("window.scrollTo(0, document.body.scrollHeight/2);")
                .await;
            tokio::select! {
                _ = cancel.cancelled() => return Err(SourceError::Cancelled),
                _ = tokio::time::sleep(SCROLL_SETTLE) => {}
            }
        }

        let html = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| SourceError::Protocol(format!("dom extraction failed: {e}")))?
            .into_value::<String>()
            .map_err(|e| SourceError::Protocol(format!("dom extraction result: {e:?}")))?;
        Ok(html)
    }

    /// Shut the browser down. Idempotent; called by the aggregator on every
    /// exit path.
    pub async fn close(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(mut inner) = guard.take() {
            if let Err(e) = inner.browser.close().await {
                tracing::warn!(error = ?e, "browser close failed");
            }
            let _ = inner.browser.wait().await;
            inner.handler_task.abort();
            tracing::debug!("browser session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inactive_handle_reports_unavailable() {
        let session = BrowserSession::inactive();
        assert!(!session.is_active().await);
        let cancel = CancellationToken::new();
        let err = session
            .render("https://example.test", Duration::ZERO, false, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::BrowserUnavailable));
        // close on an inactive handle is a no-op
        session.close().await;
    }

    #[tokio::test]
    #[ignore] // Requires a Chromium binary on PATH.
    async fn renders_a_data_url() {
        let session = BrowserSession::launch(&AppConfig::default()).await;
        if !session.is_active().await {
            return;
        }
        let cancel = CancellationToken::new();
        let html = session
            .render(
                "data:text/html,<h1>Hello</h1>",
                Duration::from_millis(100),
                true,
                &cancel,
            )
            .await
            .unwrap();
        assert!(html.contains("<h1>Hello</h1>"));
        session.close().await;
    }
}
