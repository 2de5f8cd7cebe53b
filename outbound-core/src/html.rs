//! HTML text helpers
//!
//! Text extraction skips script, style and noscript subtrees so keyword
//! matching and LLM prompts only see rendered copy.

use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Tags whose text never counts as page copy
const EXCLUDED_TAGS: &[&str] = &["script", "style", "noscript"];

/// Whether an element name is one of the excluded tags
pub fn is_excluded_tag(name: &str) -> bool {
    EXCLUDED_TAGS.contains(&name)
}

/// Extract the visible text of a whole document.
///
/// Text nodes are trimmed and joined with a single space.
pub fn document_text(document: &Html) -> String {
    element_text(document.root_element())
}

/// Visible text of one element, trimmed nodes joined with a single space
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();

    for node_ref in element.descendants() {
        if let Node::Text(text_node) = node_ref.value() {
            let in_excluded = node_ref.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| is_excluded_tag(el.name()))
                    .unwrap_or(false)
            });

            if in_excluded {
                continue;
            }

            let trimmed = text_node.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }

    parts.join(" ")
}

/// Parse markup and return its visible text with lines preserved.
///
/// Each non-empty text node becomes its own line. Used when a scrape returns
/// HTML but no markdown.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node_ref in document.root_element().descendants() {
        if let Node::Text(text_node) = node_ref.value() {
            let in_excluded = node_ref.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| is_excluded_tag(el.name()))
                    .unwrap_or(false)
            });
            if in_excluded {
                continue;
            }

            for line in text_node.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    lines.push(line.to_string());
                }
            }
        }
    }

    lines.join("\n")
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters (not bytes)
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_text_skips_scripts() {
        let html = r#"
            <html>
            <head><title>Careers</title><style>.x { color: red; }</style></head>
            <body>
                <script>var hackathon = 1;</script>
                <h1>University   Relations</h1>
                <p>Apply for our <b>Fellowship</b> today.</p>
            </body>
            </html>
        "#;

        let text = document_text(&Html::parse_document(html));

        assert!(text.contains("University   Relations"));
        assert!(text.contains("Apply for our Fellowship today."));
        assert!(!text.contains("hackathon"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_html_to_text_keeps_lines() {
        let html = "<body><h2>Jane Doe</h2><p>General Partner</p><noscript>enable js</noscript></body>";
        let text = html_to_text(html);
        assert_eq!(text, "Jane Doe\nGeneral Partner");
        assert_eq!(html_to_text("   "), "");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 240), "short");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
    }
}
