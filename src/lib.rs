// src/lib.rs
// Public library surface for integration tests (and embedding into a host
// application).

pub mod aggregate;
pub mod browser;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod score;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::Aggregator;
pub use crate::config::AppConfig;
pub use crate::error::{SearchError, SourceError};
pub use crate::model::{ExperienceLevel, FilterSpec, Posting, WorkModel};
pub use crate::sources::JobSource;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the dev tracing subscriber. Controlled by `RUST_LOG`; defaults to
/// `jobscout=info,warn`. Safe to skip when the host application installs its
/// own subscriber.
pub fn enable_dev_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobscout=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
