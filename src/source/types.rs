// src/source/types.rs
use anyhow::Result;
use std::time::Duration;
use url::Url;

use crate::model::Candidate;

/// One polled site/query. Yields the raw candidates of a single pass.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Company name stamped on every listing from this source.
    fn company(&self) -> &str;

    /// Base for resolving relative links.
    fn base_url(&self) -> &Url;

    async fn fetch(&self) -> Result<Vec<Candidate>>;
}

/// A single DOM record that could not be turned into a candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("missing element `{0}`")]
    MissingElement(&'static str),
    #[error("missing attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("empty text in `{0}`")]
    EmptyText(&'static str),
    #[error("not a job link: {0}")]
    NotAJobLink(String),
}

/// How to tell that a results page has finished rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Wait until the selector matches.
    Selector(String),
    /// Pause, scroll to the bottom to trigger lazy loading, pause again.
    Settle {
        initial: Duration,
        after_scroll: Duration,
    },
}

/// Site-specific markup knowledge: readiness and record extraction.
pub trait SiteParser: Send + Sync {
    fn readiness(&self) -> Readiness;

    fn parse(&self, html: &str, base: &Url) -> Vec<Result<Candidate, RecordError>>;
}
