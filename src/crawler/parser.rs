//! HTML parser for listing and entry pages
//!
//! This module handles parsing HTML content to extract:
//! - Link candidates with the text and attributes titles are resolved from
//! - Pagination signals (numbered page links, a "next" link)
//! - Entry page metadata (`<title>`, first heading, meta description)

use crate::title::collapse_whitespace;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

#[allow(clippy::expect_used)]
static PAGE_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/page/|[?&]paged?=)(\d+)").expect("hardcoded regex pattern is valid")
});

/// Visible texts that mark a "next page" link
const NEXT_LABELS: &[&str] = &[
    "next",
    "next page",
    "next »",
    "»",
    "›",
    "older posts",
    "older entries",
    "próxima",
    "próxima página",
    "proxima",
];

/// An `<a>` element found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// Absolute, resolved link target
    pub url: Url,
    /// Visible text, whitespace collapsed
    pub text: String,
    /// `title` attribute of the anchor
    pub title_attr: Option<String>,
    /// `alt` text of an image inside the anchor
    pub image_alt: Option<String>,
}

/// Pagination hints found on a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationSignals {
    /// Highest page number referenced by a pagination link
    pub max_numbered: Option<u32>,
    /// Whether a "next" link exists
    pub has_next: bool,
}

/// Extracted information from a listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub links: Vec<LinkCandidate>,
    pub pagination: PaginationSignals,
}

/// Metadata of an entry page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub heading: Option<String>,
    pub description: Option<String>,
}

/// Parses a listing page
///
/// # Link Extraction Rules
///
/// **Include:** every element matched by `link_selector` with an `href`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:`, `data:` links
/// - fragment-only links
/// - non-HTTP(S) targets after resolution
///
/// # Example
///
/// ```
/// use catalog_sync::crawler::parse_listing;
/// use scraper::Selector;
/// use url::Url;
///
/// let html = r#"<a href="/hades/">Hades</a><a class="next" href="/page/2/">Next</a>"#;
/// let base = Url::parse("https://origin.example/").unwrap();
/// let page = parse_listing(html, &base, &Selector::parse("a[href]").unwrap());
/// assert_eq!(page.links[0].text, "Hades");
/// assert!(page.pagination.has_next);
/// ```
pub fn parse_listing(html: &str, base_url: &Url, link_selector: &Selector) -> ListingPage {
    let document = Html::parse_document(html);

    let links = document
        .select(link_selector)
        .filter_map(|element| link_candidate(element, base_url))
        .collect();

    ListingPage {
        links,
        pagination: pagination_signals(&document, base_url),
    }
}

fn link_candidate(element: ElementRef<'_>, base_url: &Url) -> Option<LinkCandidate> {
    let href = element.value().attr("href")?;
    let url = resolve_link(href, base_url)?;

    let image_alt = Selector::parse("img[alt]").ok().and_then(|img| {
        element
            .select(&img)
            .filter_map(|i| i.value().attr("alt"))
            .map(collapse_whitespace)
            .find(|alt| !alt.is_empty())
    });

    Some(LinkCandidate {
        url,
        text: collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")),
        title_attr: element
            .value()
            .attr("title")
            .map(collapse_whitespace)
            .filter(|t| !t.is_empty()),
        image_alt,
    })
}

/// Collects numbered page links and "next" links
fn pagination_signals(document: &Html, base_url: &Url) -> PaginationSignals {
    let mut signals = PaginationSignals::default();
    let source = listing_source(base_url);

    if let Ok(anchors) = Selector::parse("a[href]") {
        for anchor in document.select(&anchors) {
            let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            else {
                continue;
            };

            // sidebars link into other categories' pages too
            if let Some(n) = page_number(&url).filter(|_| listing_source(&url) == source) {
                signals.max_numbered = Some(signals.max_numbered.map_or(n, |m| m.max(n)));
            }

            if is_next_link(anchor) {
                signals.has_next = true;
            }
        }
    }

    if let Ok(link_next) = Selector::parse("link[rel='next'][href]") {
        if document.select(&link_next).next().is_some() {
            signals.has_next = true;
        }
    }

    signals
}

fn is_next_link(anchor: ElementRef<'_>) -> bool {
    let element = anchor.value();

    if element
        .attr("rel")
        .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("next")))
        .unwrap_or(false)
    {
        return true;
    }

    if element.classes().any(|c| c == "next" || c == "nextpostslink") {
        return true;
    }

    let text = collapse_whitespace(&anchor.text().collect::<String>()).to_lowercase();
    NEXT_LABELS.contains(&text.as_str())
}

/// Host and path of the listing a page belongs to, pagination suffix removed
///
/// `/category/rpg/page/3/` and `/category/rpg/?paged=3` both belong to
/// `/category/rpg`.
fn listing_source(url: &Url) -> (Option<String>, String) {
    let path = url.path();
    let path = match path.find("/page/") {
        Some(i) => &path[..i],
        None => path,
    };
    let host = url
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase());
    (host, path.trim_end_matches('/').to_lowercase())
}

/// Page number encoded in a pagination URL (`/page/3/`, `?paged=3`)
pub fn page_number(url: &Url) -> Option<u32> {
    let target = match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    };
    PAGE_NUMBER_REGEX
        .captures(&target)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extracts `<title>`, first `<h1>`, and the meta description
pub fn parse_page_meta(html: &str) -> PageMeta {
    let document = Html::parse_document(html);

    let first_text = |selector: &str| -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        document
            .select(&selector)
            .next()
            .map(|e| collapse_whitespace(&e.text().collect::<Vec<_>>().join(" ")))
            .filter(|s| !s.is_empty())
    };

    let description = Selector::parse("meta[name='description'][content]")
        .ok()
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .and_then(|e| e.value().attr("content"))
                .map(collapse_whitespace)
        })
        .filter(|s| !s.is_empty());

    PageMeta {
        title: first_text("title"),
        heading: first_text("h1"),
        description,
    }
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None for `javascript:`, `mailto:`, `tel:`, `data:` links,
/// fragment-only links, unparseable hrefs, and non-HTTP(S) targets.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let url = base_url.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://origin.example/").unwrap()
    }

    fn listing(html: &str) -> ListingPage {
        parse_listing(html, &base_url(), &Selector::parse("a[href]").unwrap())
    }

    #[test]
    fn test_link_text_and_attributes() {
        let page = listing(
            r#"<a href="/hades/" title="Hades Page"><img src="c.jpg" alt="Hades cover"></a>
               <a href="/celeste/">  Celeste
                 Account </a>"#,
        );
        assert_eq!(page.links.len(), 2);
        assert_eq!(page.links[0].text, "");
        assert_eq!(page.links[0].title_attr.as_deref(), Some("Hades Page"));
        assert_eq!(page.links[0].image_alt.as_deref(), Some("Hades cover"));
        assert_eq!(page.links[1].text, "Celeste Account");
        assert_eq!(page.links[1].url.as_str(), "https://origin.example/celeste/");
    }

    #[test]
    fn test_skips_special_links() {
        let page = listing(
            r##"<a href="javascript:void(0)">x</a><a href="mailto:a@b.c">x</a>
                <a href="#top">x</a><a href="tel:123">x</a><a href="/ok/">ok</a>"##,
        );
        assert_eq!(page.links.len(), 1);
    }

    #[test]
    fn test_numbered_pagination() {
        let page = listing(
            r#"<div class="nav-links"><a href="/page/2/">2</a><a href="/page/7/">7</a></div>"#,
        );
        assert_eq!(page.pagination.max_numbered, Some(7));
        assert!(!page.pagination.has_next);
    }

    #[test]
    fn test_numbered_links_of_other_listings_are_ignored() {
        let base = Url::parse("https://origin.example/category/rpg/").unwrap();
        let page = parse_listing(
            r#"<nav><a href="/category/rpg/page/3/">3</a></nav>
               <aside><a href="/category/indie/page/40/">40</a><a href="/page/12/">12</a></aside>"#,
            &base,
            &Selector::parse("a[href]").unwrap(),
        );
        assert_eq!(page.pagination.max_numbered, Some(3));
    }

    #[test]
    fn test_numbered_links_seen_from_a_later_page() {
        let base = Url::parse("https://origin.example/category/rpg/page/2/").unwrap();
        let page = parse_listing(
            r#"<a href="/category/rpg/">1</a><a href="/category/rpg/page/3/">3</a>"#,
            &base,
            &Selector::parse("a[href]").unwrap(),
        );
        assert_eq!(page.pagination.max_numbered, Some(3));
    }

    #[test]
    fn test_query_pagination() {
        let page = listing(r#"<a href="/?paged=4">4</a>"#);
        assert_eq!(page.pagination.max_numbered, Some(4));
    }

    #[test]
    fn test_next_link_variants() {
        assert!(listing(r#"<a rel="next" href="/x/">go</a>"#).pagination.has_next);
        assert!(listing(r#"<a class="next page-numbers" href="/x/">go</a>"#).pagination.has_next);
        assert!(listing(r#"<a href="/x/">Próxima</a>"#).pagination.has_next);
        assert!(listing(r#"<head><link rel="next" href="/page/2/"></head>"#).pagination.has_next);
        assert!(!listing(r#"<a href="/x/">Nexus</a>"#).pagination.has_next);
    }

    #[test]
    fn test_page_number() {
        let url = Url::parse("https://origin.example/category/rpg/page/12/").unwrap();
        assert_eq!(page_number(&url), Some(12));
        let url = Url::parse("https://origin.example/hades/").unwrap();
        assert_eq!(page_number(&url), None);
    }

    #[test]
    fn test_page_meta() {
        let meta = parse_page_meta(
            r#"<html><head><title> Hades | Origin </title>
               <meta name="description" content="Shared Hades account"></head>
               <body><h1>Hades  Account</h1><h1>Other</h1></body></html>"#,
        );
        assert_eq!(meta.title.as_deref(), Some("Hades | Origin"));
        assert_eq!(meta.heading.as_deref(), Some("Hades Account"));
        assert_eq!(meta.description.as_deref(), Some("Shared Hades account"));
    }

    #[test]
    fn test_page_meta_missing() {
        let meta = parse_page_meta("<html><body></body></html>");
        assert_eq!(meta, PageMeta::default());
    }
}
