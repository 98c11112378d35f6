//! Extraction of the few page facts worth reporting.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector"));

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("h1 selector"));

static DESCRIPTION_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"]"#).expect("description selector")
});

static HEADINGS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").expect("headings selector"));

/// What a scraped page contributes to the results.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPage {
    /// URL the page was fetched from.
    pub url: String,
    /// `<title>`, or the first `<h1>` when there is no title.
    pub title: Option<String>,
    /// `<meta name="description">` content.
    pub description: Option<String>,
    /// `h1`–`h3` texts in document order.
    pub headings: Vec<String>,
}

/// Parse `html` and pull out title, description and headings.
pub fn extract_page(url: &str, html: &str) -> ScrapedPage {
    let doc = Html::parse_document(html);

    let title = first_text(&doc, &TITLE_SEL).or_else(|| first_text(&doc, &H1_SEL));

    let description = doc
        .select(&DESCRIPTION_SEL)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|d| !d.is_empty());

    let headings = doc
        .select(&HEADINGS_SEL)
        .map(element_text)
        .filter(|h| !h.is_empty())
        .collect();

    ScrapedPage {
        url: url.to_string(),
        title,
        description,
        headings,
    }
}

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector).map(element_text).find(|t| !t.is_empty())
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fixture_page() {
        let html = std::fs::read_to_string("../../../fixtures/html/article.html")
            .expect("read html fixture");
        let page = extract_page("https://example.com/pem", &html);

        assert_eq!(
            page.title.as_deref(),
            Some("Understanding PEM Electrolyzer Components")
        );
        assert_eq!(
            page.description.as_deref(),
            Some("An overview of membrane, catalyst and bipolar plate design.")
        );
        assert_eq!(
            page.headings,
            [
                "PEM Electrolyzer Components",
                "Membrane Electrode Assembly",
                "Bipolar Plates",
                "Coatings",
            ]
        );
    }

    #[test]
    fn falls_back_to_h1_without_title() {
        let page = extract_page("https://x.test", "<html><body><h1> Only  heading </h1></body></html>");
        assert_eq!(page.title.as_deref(), Some("Only heading"));
        assert_eq!(page.description, None);
    }

    #[test]
    fn empty_document_has_no_facts() {
        let page = extract_page("https://x.test", "");
        assert_eq!(page.title, None);
        assert!(page.headings.is_empty());
    }
}
