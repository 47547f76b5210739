//! Article extraction from a single fetched page.
//!
//! Finds the main article container with readability-style heuristics and
//! pulls a title, the prose paragraphs, and an optional publication stamp.
//! Pages without a usable article produce `None`, which is a normal outcome.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use topicpress_shared::ContentRecord;

/// Article containers, most specific first.
const CONTAINER_SELECTORS: &[&str] = &[
    "article",
    ".article",
    ".post",
    ".entry",
    "main",
    ".content",
    r#"[role="main"]"#,
];

/// Title candidates: primary heading, secondary heading, title and headline roles.
const TITLE_SELECTORS: &[&str] = &["h1", "h2", ".title", ".headline"];

/// Publication timestamp candidates.
const PUBLISHED_SELECTORS: &[&str] = &["time", ".date", ".published", ".timestamp"];

/// Paragraphs shorter than this (in characters) are captions or UI chrome.
pub const MIN_PARAGRAPH_CHARS: usize = 20;

/// Stateless article extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Parse `html` and extract an article record, if the page has one.
    pub fn extract(&self, html: &str, url: &Url) -> Option<ContentRecord> {
        let doc = Html::parse_document(html);
        self.extract_document(&doc, url)
    }

    /// Extract from an already-parsed document.
    ///
    /// Containers are tried in priority order; the first one that yields an
    /// acceptable record wins, so a page contributes at most one record.
    pub fn extract_document(&self, doc: &Html, url: &Url) -> Option<ContentRecord> {
        for css in CONTAINER_SELECTORS {
            let Ok(sel) = Selector::parse(css) else {
                continue;
            };
            for container in doc.select(&sel) {
                if let Some(record) = record_from_container(doc, container, url) {
                    return Some(record);
                }
            }
        }
        None
    }
}

fn record_from_container(doc: &Html, container: ElementRef<'_>, url: &Url) -> Option<ContentRecord> {
    let title = find_title(doc, container)?;
    let body = collect_paragraphs(container);

    let record = ContentRecord {
        source_url: url.to_string(),
        title,
        body,
        published_at: find_published(container).or_else(|| find_published(doc.root_element())),
    };

    record.is_acceptable().then_some(record)
}

/// First non-empty title candidate, looked up in the container and then the page.
fn find_title(doc: &Html, container: ElementRef<'_>) -> Option<String> {
    first_text(container, TITLE_SELECTORS).or_else(|| first_text(doc.root_element(), TITLE_SELECTORS))
}

fn first_text(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|sel| {
            scope
                .select(&sel)
                .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
                .find(|text| !text.is_empty())
        })
}

/// Trimmed `<p>` texts of at least [`MIN_PARAGRAPH_CHARS`] characters, blank-line separated.
fn collect_paragraphs(container: ElementRef<'_>) -> String {
    let Ok(p_sel) = Selector::parse("p") else {
        return String::new();
    };

    container
        .select(&p_sel)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|text| text.chars().count() >= MIN_PARAGRAPH_CHARS)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn find_published(scope: ElementRef<'_>) -> Option<String> {
    PUBLISHED_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|sel| {
            scope.select(&sel).find_map(|el| {
                let text = collapse_whitespace(&el.text().collect::<String>());
                if !text.is_empty() {
                    return Some(text);
                }
                el.value()
                    .attr("datetime")
                    .map(str::trim)
                    .filter(|dt| !dt.is_empty())
                    .map(String::from)
            })
        })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://www.bbc.com/news/science-environment-1").unwrap()
    }

    const LONG_A: &str = "Wind and solar generation reached a record share of the grid this quarter.";
    const LONG_B: &str = "Analysts expect storage capacity to double before the end of the decade.";

    #[test]
    fn extracts_article_record() {
        let html = format!(
            r#"<html><body>
            <nav><p>Home | News | Sport | Weather and more links</p></nav>
            <article>
              <h1>  Renewables   break records </h1>
              <time datetime="2024-05-01">1 May 2024</time>
              <p>{LONG_A}</p>
              <p>Photo: Reuters</p>
              <p>   {LONG_B}   </p>
            </article>
            </body></html>"#
        );

        let record = Extractor::new().extract(&html, &page_url()).expect("record");
        assert_eq!(record.title, "Renewables break records");
        assert_eq!(record.body, format!("{LONG_A}\n\n{LONG_B}"));
        assert_eq!(record.published_at.as_deref(), Some("1 May 2024"));
        assert_eq!(record.source_url, page_url().to_string());
    }

    #[test]
    fn short_paragraphs_are_dropped() {
        // 19 characters is noise, 20 survives.
        let nineteen = "a".repeat(19);
        let twenty = "b".repeat(20);
        let html = format!(
            "<main><h2>Title</h2><p>{nineteen}</p><p>{twenty}</p><p>{LONG_A}</p><p>{LONG_B}</p></main>"
        );
        let record = Extractor::new().extract(&html, &page_url()).expect("record");
        assert!(!record.body.contains(&nineteen));
        assert!(record.body.starts_with(&twenty));
    }

    #[test]
    fn title_priority_and_page_fallback() {
        let html = format!(
            r#"<html><body>
            <h1>Page level headline</h1>
            <div class="post"><span class="headline">Inner headline</span><p>{LONG_A}</p><p>{LONG_B}</p></div>
            </body></html>"#
        );
        let record = Extractor::new().extract(&html, &page_url()).expect("record");
        assert_eq!(record.title, "Inner headline");

        let html = format!(r#"<h1>Page level headline</h1><main><p>{LONG_A}</p><p>{LONG_B}</p></main>"#);
        let record = Extractor::new().extract(&html, &page_url()).expect("record");
        assert_eq!(record.title, "Page level headline");
    }

    #[test]
    fn thin_page_yields_nothing() {
        let html = "<article><h1>Breaking</h1><p>Short teaser text that is not enough.</p></article>";
        assert!(Extractor::new().extract(html, &page_url()).is_none());
    }

    #[test]
    fn untitled_page_yields_nothing() {
        let html = format!("<article><p>{LONG_A}</p><p>{LONG_B}</p></article>");
        assert!(Extractor::new().extract(&html, &page_url()).is_none());
    }

    #[test]
    fn page_without_container_yields_nothing() {
        let html = format!("<body><h1>Title</h1><p>{LONG_A}</p><p>{LONG_B}</p></body>");
        assert!(Extractor::new().extract(&html, &page_url()).is_none());
    }

    #[test]
    fn falls_through_to_later_container() {
        // The <article> is a stub; the <main> holds the story.
        let html = format!(
            r#"<body><article><h2>Related</h2></article>
            <main><h1>Storage boom</h1><span class="date">Yesterday</span><p>{LONG_A}</p><p>{LONG_B}</p></main></body>"#
        );
        let record = Extractor::new().extract(&html, &page_url()).expect("record");
        assert_eq!(record.title, "Storage boom");
        assert_eq!(record.published_at.as_deref(), Some("Yesterday"));
    }

    #[test]
    fn time_datetime_attribute_used_when_text_empty() {
        let html = format!(
            r#"<article><h1>T</h1><time datetime="2024-06-02T10:00:00Z"></time><p>{LONG_A}</p><p>{LONG_B}</p></article>"#
        );
        let record = Extractor::new().extract(&html, &page_url()).expect("record");
        assert_eq!(record.published_at.as_deref(), Some("2024-06-02T10:00:00Z"));
    }

    #[test]
    fn fixture_news_article() {
        let content = std::fs::read_to_string("../../../fixtures/html/news-article.html")
            .expect("read news fixture");
        let record = Extractor::new()
            .extract(&content, &page_url())
            .expect("fixture should yield a record");
        assert_eq!(record.title, "Offshore wind farms reshape coastal economies");
        assert_eq!(record.paragraphs().count(), 3);
        assert!(record.is_acceptable());
    }
}
