use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{href, text_lines};
use crate::model::Candidate;
use crate::source::types::{Readiness, RecordError, SiteParser};

static ROW_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".job-list-item").expect("row selector"));
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h3 a").expect("title selector"));

/// jobs.apple.com search results (one page per search keyword).
pub struct AppleJobs;

impl SiteParser for AppleJobs {
    fn readiness(&self) -> Readiness {
        Readiness::Selector(".job-list-item h3 a".to_string())
    }

    fn parse(&self, html: &str, _base: &Url) -> Vec<Result<Candidate, RecordError>> {
        let doc = Html::parse_document(html);
        doc.select(&ROW_SEL).map(parse_row).collect()
    }
}

fn parse_row(row: ElementRef<'_>) -> Result<Candidate, RecordError> {
    let link = row
        .select(&TITLE_SEL)
        .next()
        .ok_or(RecordError::MissingElement("h3 a"))?;
    let href = href(link).ok_or(RecordError::MissingAttribute("href"))?;
    let title = text_lines(link).join(" ");
    if title.is_empty() {
        return Err(RecordError::EmptyText("h3 a"));
    }

    Ok(Candidate::new(
        title,
        job_id(&href),
        href,
        row_location(&text_lines(row)),
    ))
}

/// `/en-us/details/200554363/software-engineer` → `200554363`.
pub fn job_id(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segments: Vec<&str> = path.split('/').collect();

    if let Some(pos) = segments.iter().position(|s| *s == "details") {
        if let Some(id) = segments.get(pos + 1).filter(|s| !s.is_empty()) {
            return id.to_string();
        }
    }
    segments
        .get(3)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Rows read "… Location | Cupertino | Actions …"; take what sits between
/// the two labels. Empty when the row has no location label.
///
/// Labels only count as whole `|`-separated tokens, so a title such as
/// "Engineer, Location Services" is not mistaken for one.
pub fn row_location(lines: &[String]) -> String {
    let Some((start, first_tail)) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| label_tail(l).map(|tail| (i, tail)))
    else {
        return String::new();
    };

    let mut parts: Vec<&str> = Vec::new();
    let chunks = std::iter::once(first_tail).chain(lines[start + 1..].iter().map(String::as_str));
    for chunk in chunks {
        for token in chunk.split('|').map(str::trim) {
            if token == ACTIONS_LABEL {
                return parts.join(" ");
            }
            if !token.is_empty() {
                parts.push(token);
            }
        }
    }
    parts.join(" ")
}

const LOCATION_LABEL: &str = "Location";
const ACTIONS_LABEL: &str = "Actions";

/// Text after the label when `line` is the label itself, either alone or
/// followed by `|`.
fn label_tail(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(LOCATION_LABEL)?;
    let trimmed = rest.trim_start();
    (trimmed.is_empty() || trimmed.starts_with('|')).then_some(rest)
}
