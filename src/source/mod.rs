// src/source/mod.rs
pub mod driver;
pub mod providers;
pub mod types;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{BrowserConfig, SiteKind, SourceConfig};
use crate::model::Candidate;
use crate::source::driver::PageDriver;
use crate::source::types::{Readiness, SiteParser, SourceAdapter};

pub const KEYWORD_PLACEHOLDER: &str = "{keyword}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub wait: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            wait: Duration::from_secs(15),
        }
    }
}

/// A results page to load, with the keyword that produced it (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub keyword: Option<String>,
    pub url: String,
}

/// Expand a URL template into one request per keyword. A template without
/// `{keyword}`, or an empty keyword list, yields a single request.
pub fn page_requests(template: &str, keywords: &[String]) -> Vec<PageRequest> {
    if keywords.is_empty() || !template.contains(KEYWORD_PLACEHOLDER) {
        return vec![PageRequest {
            keyword: None,
            url: template.replace(KEYWORD_PLACEHOLDER, ""),
        }];
    }
    keywords
        .iter()
        .map(|kw| {
            let encoded: String = url::form_urlencoded::byte_serialize(kw.as_bytes()).collect();
            PageRequest {
                keyword: Some(kw.clone()),
                url: template.replace(KEYWORD_PLACEHOLDER, &encoded),
            }
        })
        .collect()
}

/// Source backed by a browser page and a site parser.
pub struct BrowserSource {
    name: String,
    company: String,
    base_url: Url,
    requests: Vec<PageRequest>,
    max_results: Option<usize>,
    default_location: Option<String>,
    timeouts: Timeouts,
    site: Box<dyn SiteParser>,
    driver: Arc<dyn PageDriver>,
}

impl BrowserSource {
    pub fn new(
        cfg: &SourceConfig,
        site: Box<dyn SiteParser>,
        driver: Arc<dyn PageDriver>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            name: cfg.name.clone(),
            company: cfg.company().to_string(),
            base_url: cfg.base_url.clone(),
            requests: page_requests(&cfg.url_template, &cfg.keywords),
            max_results: cfg.max_results,
            default_location: cfg.default_location.clone(),
            timeouts,
            site,
            driver,
        }
    }

    pub fn requests(&self) -> &[PageRequest] {
        &self.requests
    }

    async fn fetch_page(&self, req: &PageRequest) -> Result<Vec<Candidate>> {
        self.driver.goto(&req.url, self.timeouts.navigation).await?;

        match self.site.readiness() {
            Readiness::Selector(sel) => self.driver.wait_for(&sel, self.timeouts.wait).await?,
            Readiness::Settle {
                initial,
                after_scroll,
            } => {
                tokio::time::sleep(initial).await;
                self.driver.scroll_to_bottom().await?;
                tokio::time::sleep(after_scroll).await;
            }
        }

        let html = self.driver.content().await?;
        let records = self.site.parse(&html, &self.base_url);
        let limit = self.max_results.unwrap_or(usize::MAX);

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for rec in records.into_iter().take(limit) {
            match rec {
                Ok(mut c) => {
                    if c.raw_location.trim().is_empty() {
                        if let Some(loc) = &self.default_location {
                            c.raw_location = loc.clone();
                        }
                    }
                    out.push(c);
                }
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(source = %self.name, error = %e, "record skipped");
                }
            }
        }
        if skipped > 0 {
            tracing::debug!(source = %self.name, skipped, "unparseable records dropped");
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for BrowserSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn company(&self) -> &str {
        &self.company
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Pages that fail are skipped; the source only fails when none loaded.
    async fn fetch(&self) -> Result<Vec<Candidate>> {
        let mut out = Vec::new();
        let mut loaded = 0usize;
        let mut last_err = None;

        for req in &self.requests {
            tracing::info!(source = %self.name, keyword = req.keyword.as_deref().unwrap_or("-"), "checking {}", req.url);
            match self.fetch_page(req).await {
                Ok(mut found) => {
                    loaded += 1;
                    out.append(&mut found);
                }
                Err(e) => {
                    tracing::warn!(
                        source = %self.name,
                        keyword = req.keyword.as_deref().unwrap_or("-"),
                        error = %format!("{e:#}"),
                        "page skipped (timeout or navigation error)"
                    );
                    last_err = Some(e);
                }
            }
        }

        if loaded == 0 {
            return Err(last_err.unwrap_or_else(|| anyhow!("no pages configured")));
        }
        Ok(out)
    }
}

/// Build one adapter per enabled source, all sharing `driver`.
pub fn build_sources(
    sources: &[SourceConfig],
    browser: &BrowserConfig,
    driver: Arc<dyn PageDriver>,
) -> Vec<BrowserSource> {
    let timeouts = browser.timeouts();
    sources
        .iter()
        .filter(|s| s.enabled)
        .map(|s| {
            let site: Box<dyn SiteParser> = match s.site {
                SiteKind::Microsoft => Box::new(providers::microsoft::MicrosoftCareers),
                SiteKind::Apple => Box::new(providers::apple::AppleJobs),
                SiteKind::MicrosoftAi => Box::new(providers::microsoft_ai::MicrosoftAiCareers::new(
                    browser.settle(),
                    browser.scroll_settle(),
                )),
            };
            BrowserSource::new(s, site, driver.clone(), timeouts)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_expands_per_keyword_with_encoding() {
        let reqs = page_requests(
            "https://jobs.example.com/search?search={keyword}&location=us",
            &["Machine Learning".to_string(), "ML".to_string()],
        );
        assert_eq!(reqs.len(), 2);
        assert_eq!(
            reqs[0].url,
            "https://jobs.example.com/search?search=Machine+Learning&location=us"
        );
        assert_eq!(reqs[0].keyword.as_deref(), Some("Machine Learning"));
        assert_eq!(reqs[1].url, "https://jobs.example.com/search?search=ML&location=us");
    }

    #[test]
    fn template_without_placeholder_is_single_request() {
        let reqs = page_requests("https://careers.example.com/jobs?q=x", &["ignored".to_string()]);
        assert_eq!(
            reqs,
            vec![PageRequest {
                keyword: None,
                url: "https://careers.example.com/jobs?q=x".into()
            }]
        );
    }

    #[test]
    fn empty_keywords_strip_placeholder() {
        let reqs = page_requests("https://x.example.com/s?search={keyword}", &[]);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].url, "https://x.example.com/s?search=");
    }
}
