// src/config.rs
//! Runtime configuration (environment) and the static source table.
//!
//! The table is a module-level constant, initialized once and read-only
//! thereafter; its declaration order is the merge order and therefore the
//! tie-break for equal composite scores.

use once_cell::sync::Lazy;
use std::time::Duration;

// --- env names & defaults ---
pub const ENV_ADZUNA_APP_ID: &str = "ADZUNA_APP_ID";
pub const ENV_ADZUNA_APP_KEY: &str = "ADZUNA_APP_KEY";
pub const ENV_HTTP_CONNECT_TIMEOUT_SECS: &str = "HTTP_CONNECT_TIMEOUT_SECS";
pub const ENV_HTTP_READ_TIMEOUT_SECS: &str = "HTTP_READ_TIMEOUT_SECS";
pub const ENV_GLOBAL_DEADLINE_SECS: &str = "GLOBAL_DEADLINE_SECS";
pub const ENV_PER_SOURCE_CAP: &str = "PER_SOURCE_CAP";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_GLOBAL_DEADLINE_SECS: u64 = 60;
pub const DEFAULT_PER_SOURCE_CAP: usize = 25;
/// Comment-thread sources yield many partial matches; they get a higher cap.
pub const COMMENT_THREAD_CAP: usize = 40;

/// Placeholder value that marks unconfigured Adzuna credentials.
const ADZUNA_PLACEHOLDER: &str = "YOUR_APP_ID_HERE";

/// What a source needs from the engine to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// One HTTPS GET against a documented JSON endpoint.
    JsonApi,
    /// One HTTPS GET, parsed with the CSS-selector engine.
    StaticHtml,
    /// Requires the shared headless-browser session.
    DynamicPage,
}

/// Per-source static configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Short identifier; also the `Posting::source` value.
    pub id: &'static str,
    pub kind: SourceKind,
    /// Hard-coded trust weight, `0..=10`.
    pub reputability: u8,
    /// Polite pacing: wait this long before the first request.
    pub start_delay: Duration,
    /// Per-call deadline for a single fetch or page load.
    pub timeout: Duration,
    /// Maximum number of postings this source may contribute.
    pub cap: usize,
    /// Dynamic pages only: fixed wait after navigation for scripts to render.
    pub settle: Duration,
}

/// Declaration order defines merge order and the stable-sort tie-break.
pub static SOURCE_TABLE: Lazy<Vec<SourceConfig>> = Lazy::new(|| {
    vec![
        SourceConfig {
            id: "Adzuna",
            kind: SourceKind::JsonApi,
            reputability: 9,
            start_delay: Duration::ZERO,
            timeout: Duration::from_secs(30),
            cap: DEFAULT_PER_SOURCE_CAP,
            settle: Duration::ZERO,
        },
        SourceConfig {
            id: "Remotive",
            kind: SourceKind::JsonApi,
            reputability: 8,
            start_delay: Duration::ZERO,
            timeout: Duration::from_secs(30),
            cap: DEFAULT_PER_SOURCE_CAP,
            settle: Duration::ZERO,
        },
        SourceConfig {
            id: "HackerNews",
            kind: SourceKind::StaticHtml,
            reputability: 8,
            start_delay: Duration::ZERO,
            timeout: Duration::from_secs(20),
            cap: COMMENT_THREAD_CAP,
            settle: Duration::ZERO,
        },
        SourceConfig {
            id: "WeWorkRemotely",
            kind: SourceKind::StaticHtml,
            reputability: 9,
            start_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(15),
            cap: DEFAULT_PER_SOURCE_CAP,
            settle: Duration::ZERO,
        },
        SourceConfig {
            id: "LinkedIn",
            kind: SourceKind::DynamicPage,
            reputability: 10,
            start_delay: Duration::ZERO,
            timeout: Duration::from_secs(30),
            cap: DEFAULT_PER_SOURCE_CAP,
            settle: Duration::from_secs(5),
        },
        SourceConfig {
            id: "Dice",
            kind: SourceKind::DynamicPage,
            reputability: 8,
            start_delay: Duration::ZERO,
            timeout: Duration::from_secs(30),
            cap: DEFAULT_PER_SOURCE_CAP,
            settle: Duration::from_secs(8),
        },
    ]
});

/// Look up a source entry by id.
pub fn source_config(id: &str) -> Option<&'static SourceConfig> {
    SOURCE_TABLE.iter().find(|c| c.id == id)
}

/// Runtime configuration, read once per process from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub adzuna_app_id: Option<String>,
    pub adzuna_app_key: Option<String>,
    pub http_connect_timeout: Duration,
    pub http_read_timeout: Duration,
    pub global_deadline: Duration,
    pub per_source_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            adzuna_app_id: None,
            adzuna_app_key: None,
            http_connect_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            http_read_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            global_deadline: Duration::from_secs(DEFAULT_GLOBAL_DEADLINE_SECS),
            per_source_cap: DEFAULT_PER_SOURCE_CAP,
        }
    }
}

impl AppConfig {
    /// Load from the environment. Call `dotenvy::dotenv()` first in local
    /// dev if a `.env` file should participate.
    pub fn from_env() -> Self {
        Self {
            adzuna_app_id: non_empty_env(ENV_ADZUNA_APP_ID),
            adzuna_app_key: non_empty_env(ENV_ADZUNA_APP_KEY),
            http_connect_timeout: Duration::from_secs(env_u64(
                ENV_HTTP_CONNECT_TIMEOUT_SECS,
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            http_read_timeout: Duration::from_secs(env_u64(
                ENV_HTTP_READ_TIMEOUT_SECS,
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            global_deadline: Duration::from_secs(env_u64(
                ENV_GLOBAL_DEADLINE_SECS,
                DEFAULT_GLOBAL_DEADLINE_SECS,
            )),
            per_source_cap: env_u64(ENV_PER_SOURCE_CAP, DEFAULT_PER_SOURCE_CAP as u64) as usize,
        }
    }

    /// Credentials for the Adzuna API, or `None` when absent or still the
    /// placeholder; in that case the source is skipped entirely.
    pub fn adzuna_credentials(&self) -> Option<(&str, &str)> {
        match (&self.adzuna_app_id, &self.adzuna_app_key) {
            (Some(id), Some(key))
                if !id.is_empty() && !key.is_empty() && id != ADZUNA_PLACEHOLDER =>
            {
                Some((id.as_str(), key.as_str()))
            }
            _ => None,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
