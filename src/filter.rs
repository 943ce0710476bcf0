// src/filter.rs
//! Keyword/seniority/location predicate chain applied to every scraped candidate.
//!
//! Order is exclude → include → location allow → location deny; the first
//! failing rule decides the verdict.
//!
//! Text is matched with a leading space, so a space-prefixed marker such as
//! `" india"` means "starts a word" and also hits a bare "India".

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::model::{normalize_text, Candidate};

/// Location strings treated the same as an empty location.
const UNKNOWN_LOCATIONS: &[&str] = &["unknown", "n/a"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFilterSpec")]
pub struct FilterSpec {
    include: Vec<String>,
    exclude: Vec<String>,
    location_allow: Vec<String>,
    location_deny: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFilterSpec {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    location_allow: Vec<String>,
    #[serde(default)]
    location_deny: Vec<String>,
}

impl From<RawFilterSpec> for FilterSpec {
    fn from(raw: RawFilterSpec) -> Self {
        Self {
            include: clean_keywords(raw.include),
            exclude: clean_keywords(raw.exclude),
            location_allow: clean_keywords(raw.location_allow),
            location_deny: clean_keywords(raw.location_deny),
        }
    }
}

/// Lowercase, drop blank entries and duplicates. Surrounding spaces are kept
/// on purpose: `" ii"` must not match inside "engineering".
fn clean_keywords(items: Vec<String>) -> Vec<String> {
    let mut set = BTreeSet::new();
    for it in items {
        if !it.trim().is_empty() {
            set.insert(it.to_lowercase());
        }
    }
    set.into_iter().collect()
}

impl FilterSpec {
    pub fn new<I, S>(include: I, exclude: I, location_allow: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawFilterSpec {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
            location_allow: location_allow.into_iter().map(Into::into).collect(),
            location_deny: Vec::new(),
        }
        .into()
    }

    pub fn with_location_deny<I, S>(mut self, deny: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.location_deny = clean_keywords(deny.into_iter().map(Into::into).collect());
        self
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn location_allow(&self) -> &[String] {
        &self.location_allow
    }

    pub fn location_deny(&self) -> &[String] {
        &self.location_deny
    }
}

/// Why a candidate was accepted or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    Accept,
    Excluded { keyword: String },
    NotRelevant,
    LocationUnknown,
    LocationNotAllowed,
    LocationDenied { marker: String },
}

impl FilterVerdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterVerdict::Accept)
    }
}

pub fn evaluate(candidate: &Candidate, spec: &FilterSpec) -> FilterVerdict {
    let title = padded(&candidate.title);

    if let Some(kw) = first_match(&title, &spec.exclude) {
        return FilterVerdict::Excluded {
            keyword: kw.to_string(),
        };
    }

    if !spec.include.is_empty() && first_match(&title, &spec.include).is_none() {
        return FilterVerdict::NotRelevant;
    }

    let location = padded(&candidate.raw_location);
    let bare = location.trim_start();
    let unknown = bare.is_empty() || UNKNOWN_LOCATIONS.contains(&bare);

    if !spec.location_allow.is_empty() {
        if unknown {
            return FilterVerdict::LocationUnknown;
        }
        if first_match(&location, &spec.location_allow).is_none() {
            return FilterVerdict::LocationNotAllowed;
        }
    }

    if let Some(marker) = first_match(&location, &spec.location_deny) {
        return FilterVerdict::LocationDenied {
            marker: marker.to_string(),
        };
    }

    FilterVerdict::Accept
}

pub fn accept(candidate: &Candidate, spec: &FilterSpec) -> bool {
    evaluate(candidate, spec).is_accept()
}

/// Normalized, lowercased, with one leading space.
fn padded(text: &str) -> String {
    format!(" {}", normalize_text(text).to_lowercase())
}

fn first_match<'a>(haystack: &str, needles: &'a [String]) -> Option<&'a str> {
    needles
        .iter()
        .find(|n| haystack.contains(n.as_str()))
        .map(String::as_str)
}
