use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

use super::{href, text_lines};
use crate::model::Candidate;
use crate::source::types::{Readiness, RecordError, SiteParser};

static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("link selector"));

/// microsoft.ai careers. The page is rendered lazily and has no stable job
/// markup, so every link is scanned and the filter chain picks the roles.
pub struct MicrosoftAiCareers {
    settle: Duration,
    scroll_settle: Duration,
}

impl MicrosoftAiCareers {
    pub fn new(settle: Duration, scroll_settle: Duration) -> Self {
        Self {
            settle,
            scroll_settle,
        }
    }
}

impl Default for MicrosoftAiCareers {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(3))
    }
}

impl SiteParser for MicrosoftAiCareers {
    fn readiness(&self) -> Readiness {
        Readiness::Settle {
            initial: self.settle,
            after_scroll: self.scroll_settle,
        }
    }

    fn parse(&self, html: &str, base: &Url) -> Vec<Result<Candidate, RecordError>> {
        let host = base.host_str().unwrap_or_default().to_string();
        let doc = Html::parse_document(html);
        doc.select(&LINK_SEL)
            .map(|a| parse_link(a, &host))
            .collect()
    }
}

fn parse_link(link: ElementRef<'_>, host: &str) -> Result<Candidate, RecordError> {
    let href = href(link).ok_or(RecordError::MissingAttribute("href"))?;
    let text = text_lines(link).join(" ");
    if text.is_empty() {
        return Err(RecordError::EmptyText("a"));
    }

    let on_site = href.starts_with('/') || (!host.is_empty() && href.contains(host));
    if !on_site {
        return Err(RecordError::NotAJobLink(href));
    }

    // Generic navigation ("Home", "Blog") unless the href itself looks like a posting.
    let job_like = href.contains("careers") || href.contains("job");
    if !job_like && (text.chars().count() < 5 || text.contains("Home")) {
        return Err(RecordError::NotAJobLink(href));
    }

    let parent = link
        .parent()
        .and_then(ElementRef::wrap)
        .ok_or(RecordError::MissingElement("parent"))?;
    let location = location_from_context(&text_lines(parent).join(" "));

    Ok(Candidate::new(text, href.clone(), href, location))
}

/// Collapse the surrounding card text to a location label when it names
/// Redmond or the US; otherwise hand the raw text to the filter chain.
pub fn location_from_context(context: &str) -> String {
    let lower = context.to_lowercase();
    if lower.contains("redmond") {
        "Redmond, United States".to_string()
    } else if lower.contains("united states") || lower.contains("usa") {
        "United States".to_string()
    } else {
        context.trim().to_string()
    }
}
