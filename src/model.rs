// src/model.rs
//! Candidate records as scraped, and the normalized listings that flow through
//! filtering, dedup and notification.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// A raw scraped record, before filtering and normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub raw_id: String,
    pub raw_link: String,
    /// Empty when the page gave no location.
    pub raw_location: String,
}

impl Candidate {
    pub fn new(
        title: impl Into<String>,
        raw_id: impl Into<String>,
        raw_link: impl Into<String>,
        raw_location: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            raw_id: raw_id.into(),
            raw_link: raw_link.into(),
            raw_location: raw_location.into(),
        }
    }
}

/// One discovered posting, ready to notify about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCandidate {
    #[error("candidate has no identifier")]
    MissingId,
    #[error("candidate has no title")]
    MissingTitle,
    #[error("link {link:?} cannot be resolved: {reason}")]
    BadLink { link: String, reason: String },
}

impl JobListing {
    /// Normalize a candidate scraped from `base_url`.
    ///
    /// Records without a usable identifier are rejected: an empty id would
    /// collide with every other id-less posting in the seen-set.
    pub fn from_candidate(
        candidate: &Candidate,
        company: &str,
        base_url: &Url,
    ) -> Result<Self, InvalidCandidate> {
        let id = candidate.raw_id.trim();
        if id.is_empty() {
            return Err(InvalidCandidate::MissingId);
        }

        let title = normalize_text(&candidate.title);
        if title.is_empty() {
            return Err(InvalidCandidate::MissingTitle);
        }

        let url = resolve_link(base_url, &candidate.raw_link)?;

        Ok(Self {
            id: id.to_string(),
            title,
            company: company.to_string(),
            location: normalize_text(&candidate.raw_location),
            url,
        })
    }
}

fn resolve_link(base: &Url, link: &str) -> Result<String, InvalidCandidate> {
    let link = link.trim();
    if link.is_empty() {
        return Ok(base.to_string());
    }
    base.join(link)
        .map(String::from)
        .map_err(|e| InvalidCandidate::BadLink {
            link: link.to_string(),
            reason: e.to_string(),
        })
}

/// Decode HTML entities, collapse whitespace and trim.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&decoded, " ").trim().to_string()
}
