//! Pagination discovery
//!
//! Given the first page of a listing, find the follow-up pages: links inside
//! pagination containers (`.pagination`, `nav[aria-label*=pagination]`) and
//! `rel="next"` anchors or link elements.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Default page cap per listing
pub const DEFAULT_MAX_PAGES: usize = 10;

const PAGINATION_SELECTOR: &str =
    r#".pagination a, nav[aria-label*="pagination" i] a, a[rel~="next"], link[rel~="next"]"#;

/// Return the seed followed by discovered pagination URLs, in document order.
///
/// The result always starts with the seed and never exceeds `cap` entries
/// (a cap of zero is treated as one). Empty or unusable markup yields just
/// the seed.
pub fn discover_pagination_urls(html: &str, seed: &Url, cap: usize) -> Vec<Url> {
    let cap = cap.max(1);
    let mut urls = vec![seed.clone()];

    if html.trim().is_empty() || urls.len() >= cap {
        return urls;
    }

    let Ok(selector) = Selector::parse(PAGINATION_SELECTOR) else {
        return urls;
    };
    let document = Html::parse_document(html);

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let Ok(mut url) = seed.join(href) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        url.set_fragment(None);

        if !urls.contains(&url) {
            urls.push(url);
        }
        if urls.len() >= cap {
            break;
        }
    }

    debug!("Pagination for {}: {} page(s)", seed, urls.len());
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Url {
        Url::parse("https://fund.example/portfolio").unwrap()
    }

    #[test]
    fn test_cap_limits_results() {
        let links: String = (2..22)
            .map(|i| format!(r#"<a rel="next" href="/portfolio?page={}">Next</a>"#, i))
            .collect();
        let html = format!("<html><body>{}</body></html>", links);

        let urls = discover_pagination_urls(&html, &seed(), 5);

        assert_eq!(urls.len(), 5);
        assert_eq!(urls[0], seed());
        assert_eq!(urls[1].as_str(), "https://fund.example/portfolio?page=2");
        assert_eq!(urls[4].as_str(), "https://fund.example/portfolio?page=5");
    }

    #[test]
    fn test_empty_markup_returns_seed() {
        assert_eq!(discover_pagination_urls("", &seed(), 10), vec![seed()]);
        assert_eq!(discover_pagination_urls("<<<>>>not html", &seed(), 10), vec![seed()]);
        assert_eq!(discover_pagination_urls("<a href='/x'>x</a>", &seed(), 0), vec![seed()]);
    }

    #[test]
    fn test_document_order_and_resolution() {
        let html = r##"
            <html>
            <head><link rel="next" href="https://fund.example/portfolio/page/2"></head>
            <body>
                <a href="/about">About</a>
                <ul class="pagination">
                    <li><a href="#">1</a></li>
                    <li><a href="page/2">2</a></li>
                    <li><a href="/portfolio/page/3#list">3</a></li>
                    <li><a href="mailto:hi@fund.example">Mail</a></li>
                </ul>
                <a class="older" rel="next prefetch" href="https://fund.example/portfolio/page/4">Older</a>
            </body>
            </html>
        "##;

        let urls = discover_pagination_urls(html, &seed(), 10);
        let urls: Vec<_> = urls.iter().map(Url::as_str).collect();

        assert_eq!(
            urls,
            vec![
                "https://fund.example/portfolio",
                "https://fund.example/portfolio/page/2",
                "https://fund.example/page/2",
                "https://fund.example/portfolio/page/3",
                "https://fund.example/portfolio/page/4",
            ]
        );
    }

    #[test]
    fn test_nav_pagination_container() {
        let html = r#"
            <nav aria-label="Pagination"><a href="/portfolio?page=2">2</a></nav>
            <nav aria-label="Main"><a href="/team">Team</a></nav>
        "#;
        let urls = discover_pagination_urls(html, &seed(), 10);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1].as_str(), "https://fund.example/portfolio?page=2");
    }

    #[test]
    fn test_seed_not_duplicated() {
        let html = r#"<div class="pagination"><a href="/portfolio">1</a><a href="/portfolio?page=2">2</a></div>"#;
        let urls = discover_pagination_urls(html, &seed(), 10);
        assert_eq!(urls.len(), 2);
    }
}
