pub mod apple;
pub mod microsoft;
pub mod microsoft_ai;

use scraper::ElementRef;

/// Non-empty, trimmed text nodes of an element, in document order.
pub(crate) fn text_lines(el: ElementRef<'_>) -> Vec<String> {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn href(el: ElementRef<'_>) -> Option<String> {
    el.value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}
