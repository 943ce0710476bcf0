// src/watcher.rs
//! One polling pass: load seen-set → fetch each source → filter → notify
//! unseen → persist if anything was added.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::filter::{evaluate, FilterSpec, FilterVerdict};
use crate::model::{Candidate, InvalidCandidate, JobListing};
use crate::notify::{DeliveryReport, NotifierMux};
use crate::source::types::SourceAdapter;
use crate::store::{SeenSet, SeenStore};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watcher_candidates_total", "Raw candidates fetched from sources.");
        describe_counter!("watcher_filtered_total", "Candidates rejected by the filter chain.");
        describe_counter!("watcher_invalid_total", "Candidates dropped for missing id/title/link.");
        describe_counter!("watcher_duplicates_total", "Candidates already in the seen-set.");
        describe_counter!("watcher_notified_total", "Listings notified and recorded as seen.");
        describe_counter!("watcher_source_errors_total", "Sources that yielded nothing due to fetch errors.");
        describe_counter!("watcher_delivery_failures_total", "Failed channel deliveries.");
        describe_gauge!("watcher_seen_ids", "Ids in the seen-set after the run.");
        describe_gauge!("watcher_last_run_ts", "Unix ts of the last completed run.");
    });
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("no sources configured; nothing to do")]
    NoSources,
}

/// A source paired with the filter applied to its candidates.
pub struct WatchedSource {
    pub adapter: Box<dyn SourceAdapter>,
    pub filter: FilterSpec,
}

impl WatchedSource {
    pub fn new(adapter: Box<dyn SourceAdapter>, filter: FilterSpec) -> Self {
        Self { adapter, filter }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Notified {
        listing: JobListing,
        delivery: DeliveryReport,
    },
    AlreadySeen {
        id: String,
    },
    Filtered(FilterVerdict),
    Invalid(InvalidCandidate),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub name: String,
    pub fetched: usize,
    pub notified: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub invalid: usize,
    /// Set when the source yielded nothing because fetching failed.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub notified: Vec<JobListing>,
    pub seen_total: usize,
    pub persisted: bool,
    pub save_error: Option<String>,
}

impl RunSummary {
    pub fn new_jobs(&self) -> usize {
        self.notified.len()
    }
}

pub struct Watcher {
    sources: Vec<WatchedSource>,
    notifier: NotifierMux,
    store: SeenStore,
}

impl Watcher {
    pub fn new(sources: Vec<WatchedSource>, notifier: NotifierMux, store: SeenStore) -> Self {
        Self {
            sources,
            notifier,
            store,
        }
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    /// Individual source and delivery failures are logged and reported in the
    /// summary; only an empty source list is an error.
    pub async fn run_once(&self) -> Result<RunSummary, WatchError> {
        ensure_metrics_described();
        if self.sources.is_empty() {
            return Err(WatchError::NoSources);
        }

        let started_at = Utc::now();
        let mut seen = self.store.load().await;
        tracing::info!(seen = seen.len(), path = %self.store.path().display(), "loaded seen-set");

        let mut reports = Vec::with_capacity(self.sources.len());
        let mut notified = Vec::new();

        for src in &self.sources {
            let report = self.poll_source(src, &mut seen, &mut notified).await;
            tracing::info!(
                source = %report.name,
                fetched = report.fetched,
                new = report.notified,
                filtered = report.filtered,
                duplicates = report.duplicates,
                "source done"
            );
            reports.push(report);
        }

        let (persisted, save_error) = self.persist_if_changed(&seen).await;

        gauge!("watcher_seen_ids").set(seen.len() as f64);
        gauge!("watcher_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

        Ok(RunSummary {
            started_at,
            sources: reports,
            notified,
            seen_total: seen.len(),
            persisted,
            save_error,
        })
    }

    async fn poll_source(
        &self,
        src: &WatchedSource,
        seen: &mut SeenSet,
        notified: &mut Vec<JobListing>,
    ) -> SourceReport {
        let name = src.adapter.name().to_string();
        let mut report = SourceReport {
            name: name.clone(),
            ..Default::default()
        };

        let candidates = match src.adapter.fetch().await {
            Ok(c) => c,
            Err(e) => {
                let msg = format!("{e:#}");
                tracing::warn!(source = %name, error = %msg, "source yielded nothing");
                counter!("watcher_source_errors_total").increment(1);
                report.error = Some(msg);
                return report;
            }
        };
        report.fetched = candidates.len();
        counter!("watcher_candidates_total").increment(candidates.len() as u64);

        for c in &candidates {
            match self.handle_candidate(src, c, seen).await {
                CandidateOutcome::Notified { listing, .. } => {
                    report.notified += 1;
                    notified.push(listing);
                }
                CandidateOutcome::AlreadySeen { .. } => report.duplicates += 1,
                CandidateOutcome::Filtered(_) => report.filtered += 1,
                CandidateOutcome::Invalid(_) => report.invalid += 1,
            }
        }

        counter!("watcher_notified_total").increment(report.notified as u64);
        counter!("watcher_filtered_total").increment(report.filtered as u64);
        counter!("watcher_duplicates_total").increment(report.duplicates as u64);
        counter!("watcher_invalid_total").increment(report.invalid as u64);
        report
    }

    /// Filter, normalize, dedup, notify. The id is marked seen even when every
    /// channel failed.
    pub async fn handle_candidate(
        &self,
        src: &WatchedSource,
        candidate: &Candidate,
        seen: &mut SeenSet,
    ) -> CandidateOutcome {
        let verdict = evaluate(candidate, &src.filter);
        if !verdict.is_accept() {
            tracing::debug!(source = src.adapter.name(), title = %candidate.title, ?verdict, "filtered");
            return CandidateOutcome::Filtered(verdict);
        }

        let listing = match JobListing::from_candidate(
            candidate,
            src.adapter.company(),
            src.adapter.base_url(),
        ) {
            Ok(l) => l,
            Err(e) => {
                tracing::debug!(source = src.adapter.name(), title = %candidate.title, error = %e, "invalid candidate");
                return CandidateOutcome::Invalid(e);
            }
        };

        if seen.contains(&listing.id) {
            return CandidateOutcome::AlreadySeen { id: listing.id };
        }

        tracing::info!(source = src.adapter.name(), id = %listing.id, title = %listing.title, location = %listing.location, "new job");
        let delivery = self.notifier.notify(&listing).await;
        seen.add(listing.id.clone());

        CandidateOutcome::Notified { listing, delivery }
    }

    async fn persist_if_changed(&self, seen: &SeenSet) -> (bool, Option<String>) {
        if !seen.is_dirty() {
            tracing::info!("no new jobs found");
            return (false, None);
        }
        match self.store.save(seen).await {
            Ok(()) => {
                tracing::info!(added = seen.added(), total = seen.len(), "seen-set updated");
                (true, None)
            }
            Err(e) => {
                let msg = format!("{e:#}");
                tracing::error!(error = %msg, "failed to persist seen-set");
                (false, Some(msg))
            }
        }
    }
}
