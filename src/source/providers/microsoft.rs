use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{href, text_lines};
use crate::model::Candidate;
use crate::source::types::{Readiness, RecordError, SiteParser};

const CARD: &str = r#"div[data-test-id="job-listing"]"#;

static CARD_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(CARD).expect("card selector"));
static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("link selector"));

/// apply.careers.microsoft.com search results. The card's first link holds
/// the title (first text line) and a relative href, which doubles as the id.
pub struct MicrosoftCareers;

impl SiteParser for MicrosoftCareers {
    fn readiness(&self) -> Readiness {
        Readiness::Selector(CARD.to_string())
    }

    fn parse(&self, html: &str, _base: &Url) -> Vec<Result<Candidate, RecordError>> {
        let doc = Html::parse_document(html);
        doc.select(&CARD_SEL).map(parse_card).collect()
    }
}

fn parse_card(card: ElementRef<'_>) -> Result<Candidate, RecordError> {
    let link = card
        .select(&LINK_SEL)
        .next()
        .ok_or(RecordError::MissingElement("a"))?;
    let href = href(link).ok_or(RecordError::MissingAttribute("href"))?;
    let title = text_lines(link)
        .into_iter()
        .next()
        .ok_or(RecordError::EmptyText("a"))?;

    Ok(Candidate::new(title, href.clone(), href, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
<html><body>
  <div data-test-id="job-listing">
    <a href="/careers/job/1970393556001">
      <span>Software Engineer</span>
      <span>Redmond, Washington, United States</span>
    </a>
  </div>
  <div data-test-id="job-listing">
    <a href="/careers/job/1970393556002"><div>Senior Software Engineer</div></a>
  </div>
  <div data-test-id="job-listing"><span>no link here</span></div>
  <div data-test-id="job-listing"><a>Data Engineer</a></div>
</body></html>"#;

    #[test]
    fn parses_cards_and_skips_broken_ones() {
        let base = Url::parse("https://apply.careers.microsoft.com").unwrap();
        let out = MicrosoftCareers.parse(HTML, &base);
        assert_eq!(out.len(), 4);

        let first = out[0].as_ref().unwrap();
        assert_eq!(first.title, "Software Engineer");
        assert_eq!(first.raw_id, "/careers/job/1970393556001");
        assert_eq!(first.raw_link, "/careers/job/1970393556001");
        assert_eq!(out[1].as_ref().unwrap().title, "Senior Software Engineer");

        assert_eq!(out[2], Err(RecordError::MissingElement("a")));
        assert_eq!(out[3], Err(RecordError::MissingAttribute("href")));
    }
}
