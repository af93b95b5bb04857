// src/aggregate.rs
//! Fan-out across all configured sources, bounded by a global deadline,
//! merged in source-table order and ranked by composite score.
//!
//! Each source writes only its own result slot, so a slow or failing source
//! never blocks or corrupts the others. Dynamic (browser) sources run
//! sequentially inside one task group because they share a single Chromium
//! session; every other source gets its own task.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::browser::BrowserSession;
use crate::config::{AppConfig, SourceKind, DEFAULT_PER_SOURCE_CAP, SOURCE_TABLE};
use crate::error::SearchError;
use crate::model::{FilterSpec, Posting};
use crate::score::score_posting;
use crate::sources::adzuna::AdzunaSource;
use crate::sources::dice::DiceSource;
use crate::sources::hackernews::HackerNewsSource;
use crate::sources::linkedin::LinkedInSource;
use crate::sources::remotive::RemotiveSource;
use crate::sources::weworkremotely::WeWorkRemotelySource;
use crate::sources::{build_http_client, ensure_metrics_described, JobSource};

/// How long already-cancelled sources get to hand back partial results
/// before their tasks are aborted outright.
const CANCEL_GRACE: Duration = Duration::from_millis(500);

/// One source inside a task group: which result slot it owns, how long to
/// wait before its first request, and the adapter itself.
pub(crate) struct GroupMember {
    pub slot: usize,
    pub delay: Duration,
    pub source: Arc<dyn JobSource>,
}

pub struct Aggregator {
    config: AppConfig,
}

impl Aggregator {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run one search across every configured source and return the merged,
    /// ranked postings. Partial results are returned when the global
    /// deadline cuts slow sources off; an individual source failure only
    /// empties that source's contribution.
    pub async fn search(&self, filters: &FilterSpec) -> Result<Vec<Posting>, SearchError> {
        let query = filters.query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidInput);
        }

        ensure_metrics_described();
        counter!("search_runs_total").increment(1);
        tracing::info!(%query, "starting aggregated search");

        let client = build_http_client(&self.config);
        let needs_browser = SOURCE_TABLE
            .iter()
            .any(|c| c.kind == SourceKind::DynamicPage);
        let session = if needs_browser {
            Some(Arc::new(BrowserSession::launch(&self.config).await))
        } else {
            None
        };

        let mut groups: Vec<Vec<GroupMember>> = Vec::new();
        let mut dynamic_group: Vec<GroupMember> = Vec::new();
        let mut slot_names: Vec<&'static str> = Vec::new();

        for entry in SOURCE_TABLE.iter() {
            let mut cfg = entry.clone();
            if cfg.cap == DEFAULT_PER_SOURCE_CAP {
                cfg.cap = self.config.per_source_cap;
            }

            let source: Arc<dyn JobSource> = match cfg.id {
                "Adzuna" => match self.config.adzuna_credentials() {
                    Some((app_id, app_key)) => {
                        Arc::new(AdzunaSource::new(client.clone(), &cfg, app_id, app_key))
                    }
                    None => {
                        tracing::info!("Adzuna credentials not configured, skipping source");
                        continue;
                    }
                },
                "Remotive" => Arc::new(RemotiveSource::new(client.clone(), &cfg)),
                "HackerNews" => Arc::new(HackerNewsSource::new(client.clone(), &cfg)),
                "WeWorkRemotely" => Arc::new(WeWorkRemotelySource::new(client.clone(), &cfg)),
                "LinkedIn" | "Dice" => {
                    let session = session
                        .as_ref()
                        .cloned()
                        .unwrap_or_else(|| Arc::new(BrowserSession::inactive()));
                    if cfg.id == "LinkedIn" {
                        Arc::new(LinkedInSource::new(session, &cfg))
                    } else {
                        Arc::new(DiceSource::new(session, &cfg))
                    }
                }
                other => {
                    tracing::warn!(source = other, "unknown source table entry, skipping");
                    continue;
                }
            };

            let member = GroupMember {
                slot: slot_names.len(),
                delay: cfg.start_delay,
                source,
            };
            slot_names.push(cfg.id);

            if cfg.kind == SourceKind::DynamicPage {
                dynamic_group.push(member);
            } else {
                groups.push(vec![member]);
            }
        }
        if !dynamic_group.is_empty() {
            groups.push(dynamic_group);
        }

        let slots = run_groups(
            groups,
            slot_names.len(),
            Arc::new(filters.clone()),
            self.config.global_deadline,
        )
        .await;

        if let Some(session) = session {
            session.close().await;
        }

        for (name, postings) in slot_names.iter().zip(&slots) {
            tracing::debug!(source = name, count = postings.len(), "source contribution");
        }

        let ranked = merge_and_rank(slots, query);
        counter!("search_kept_total").increment(ranked.len() as u64);
        gauge!("search_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(kept = ranked.len(), sources = slot_names.len(), "search finished");
        Ok(ranked)
    }
}

/// Drive all task groups to completion or to the global deadline. Slot
/// indices keep the source-table declaration order no matter which task
/// finishes first.
pub(crate) async fn run_groups(
    groups: Vec<Vec<GroupMember>>,
    slot_count: usize,
    filters: Arc<FilterSpec>,
    deadline: Duration,
) -> Vec<Vec<Posting>> {
    let cancel = CancellationToken::new();
    let mut set: JoinSet<Vec<(usize, Vec<Posting>)>> = JoinSet::new();

    for group in groups {
        let filters = filters.clone();
        let cancel = cancel.clone();
        set.spawn(async move {
            let mut results = Vec::with_capacity(group.len());
            for member in group {
                if cancel.is_cancelled() {
                    break;
                }
                results.push(run_member(member, &filters, &cancel).await);
            }
            results
        });
    }

    let mut slots: Vec<Vec<Posting>> = vec![Vec::new(); slot_count];
    let deadline_at = tokio::time::Instant::now() + deadline;

    while !set.is_empty() {
        match tokio::time::timeout_at(deadline_at, set.join_next()).await {
            Ok(Some(Ok(results))) => {
                for (slot, postings) in results {
                    slots[slot] = postings;
                }
            }
            Ok(Some(Err(e))) => {
                tracing::warn!(error = ?e, "source task aborted unexpectedly");
            }
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    deadline_secs = deadline.as_secs(),
                    "global deadline reached, cancelling remaining sources"
                );
                cancel.cancel();
                let grace_at = tokio::time::Instant::now() + CANCEL_GRACE;
                while let Ok(Some(joined)) =
                    tokio::time::timeout_at(grace_at, set.join_next()).await
                {
                    if let Ok(results) = joined {
                        for (slot, postings) in results {
                            slots[slot] = postings;
                        }
                    }
                }
                set.abort_all();
                break;
            }
        }
    }

    slots
}

async fn run_member(
    member: GroupMember,
    filters: &FilterSpec,
    cancel: &CancellationToken,
) -> (usize, Vec<Posting>) {
    let name = member.source.name();

    if !member.delay.is_zero() {
        tokio::select! {
            _ = cancel.cancelled() => return (member.slot, Vec::new()),
            _ = tokio::time::sleep(member.delay) => {}
        }
    }

    let started = std::time::Instant::now();
    match member.source.search(filters, cancel).await {
        Ok(postings) => {
            let elapsed = started.elapsed();
            histogram!("source_fetch_ms", "source" => name).record(elapsed.as_millis() as f64);
            tracing::info!(
                source = name,
                count = postings.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "source finished"
            );
            (member.slot, postings)
        }
        Err(e) => {
            let kind = e
                .downcast_ref::<crate::error::SourceError>()
                .map(|s| s.kind())
                .unwrap_or("other");
            counter!("source_errors_total", "source" => name, "kind" => kind).increment(1);
            tracing::warn!(source = name, kind, error = ?e, "source failed, contributing nothing");
            (member.slot, Vec::new())
        }
    }
}

/// Merge slot results in declaration order, drop postings with blank titles,
/// score relevance, and rank by composite score. The sort is stable, so
/// equal scores keep source-table order.
pub(crate) fn merge_and_rank(slots: Vec<Vec<Posting>>, query: &str) -> Vec<Posting> {
    let mut rejected = 0u64;
    let mut merged: Vec<Posting> = Vec::new();

    for posting in slots.into_iter().flatten() {
        if posting.title.trim().is_empty() {
            rejected += 1;
            continue;
        }
        let mut posting = posting;
        let relevance = score_posting(&posting, query);
        posting.set_relevance(relevance as i32);
        merged.push(posting);
    }

    if rejected > 0 {
        counter!("search_rejected_total").increment(rejected);
        tracing::debug!(rejected, "dropped postings with blank titles");
    }

    merged.sort_by(|a, b| b.composite_score().cmp(&a.composite_score()));
    merged
}
