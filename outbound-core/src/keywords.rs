//! Keyword signal matching
//!
//! Each vertical owns an editorially ordered table of `(needle, category)`
//! pairs. One matcher scans a page against any table:
//! - needles match case-insensitively against the page's visible text
//! - at most one signal per needle, in table order
//! - the snippet is the whitespace-normalized text of the element enclosing
//!   the first matching text node

use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::{
    document_text, element_text, is_excluded_tag, normalize_whitespace, truncate_chars, Signal, MAX_SNIPPET_CHARS,
};

/// The productized pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vertical {
    BigTech,
    UtAlumni,
    VcPartnerships,
}

impl Vertical {
    /// Short key used for per-pipeline configuration (webhook URLs)
    pub fn key(&self) -> &'static str {
        match self {
            Vertical::BigTech => "bigtech",
            Vertical::UtAlumni => "ut",
            Vertical::VcPartnerships => "vc",
        }
    }

    /// The keyword table for this vertical
    pub fn keywords(&self) -> &'static KeywordTable {
        match self {
            Vertical::BigTech => &BIGTECH_KEYWORDS,
            Vertical::UtAlumni => &UT_ALUMNI_KEYWORDS,
            Vertical::VcPartnerships => &VC_PARTNERSHIP_KEYWORDS,
        }
    }
}

/// An ordered `(needle, category)` table
#[derive(Debug, Clone, Copy)]
pub struct KeywordTable {
    pub vertical: Vertical,
    pub entries: &'static [(&'static str, &'static str)],
}

/// Technology and outreach programs at large tech companies
pub static BIGTECH_KEYWORDS: KeywordTable = KeywordTable {
    vertical: Vertical::BigTech,
    entries: &[
        ("University Relations", "University Relations"),
        ("University Recruiting", "University Recruiting"),
        ("Academic Partnerships", "Academic Partnerships"),
        ("Developer Relations", "Developer Relations"),
        ("DevRel", "Developer Relations"),
        ("Research", "Research"),
        ("AI/ML", "AI/ML"),
        ("Education", "Education"),
        ("Campus", "Campus"),
        ("Hackathon", "Hackathon"),
        ("Fellowship", "Fellowship"),
        ("Internship", "Internship"),
        ("RFP", "RFP"),
        ("Call for Proposals", "RFP"),
    ],
};

/// Philanthropy signals on alumni and giving pages
pub static UT_ALUMNI_KEYWORDS: KeywordTable = KeywordTable {
    vertical: Vertical::UtAlumni,
    entries: &[
        ("Alumni", "UT Alumni"),
        ("Donor", "Donor"),
        ("Endowment", "Endowment"),
        ("Gift", "Gift"),
        ("Philanthropy", "Philanthropy"),
        ("Sponsorship", "Sponsorship"),
        ("Foundation", "Foundation"),
        ("Advisory", "Advisory"),
        ("Board", "Board"),
    ],
};

/// Partnership programs at portfolio companies
pub static VC_PARTNERSHIP_KEYWORDS: KeywordTable = KeywordTable {
    vertical: Vertical::VcPartnerships,
    entries: &[
        ("Partners", "Partners"),
        ("University Programs", "University Programs"),
        ("Community", "Community"),
        ("Open Innovation", "Open Innovation"),
        ("Research", "Research"),
        ("DevRel", "Developer Relations"),
        ("Developer Relations", "Developer Relations"),
        ("Hackathon", "Hackathon"),
        ("Campus", "Campus"),
        ("Case Studies", "Case Studies"),
    ],
};

/// Scans pages against one keyword table
#[derive(Debug, Clone, Copy)]
pub struct KeywordMatcher {
    table: &'static KeywordTable,
}

impl KeywordMatcher {
    pub fn new(table: &'static KeywordTable) -> Self {
        Self { table }
    }

    pub fn for_vertical(vertical: Vertical) -> Self {
        Self::new(vertical.keywords())
    }

    pub fn table(&self) -> &'static KeywordTable {
        self.table
    }

    /// Extract signals from rendered HTML.
    ///
    /// Returns at most one signal per needle, in table order. A page with no
    /// matching needle yields an empty list.
    pub fn extract(&self, html: &str, url: &str, source: &str) -> Vec<Signal> {
        let document = Html::parse_document(html);
        let text = document_text(&document).to_lowercase();

        let mut found = Vec::new();
        for (needle, category) in self.table.entries {
            let needle_lower = needle.to_lowercase();
            if !text.contains(&needle_lower) {
                continue;
            }

            let snippet = find_snippet(&document, &needle_lower).unwrap_or_else(|| needle.to_string());
            found.push(Signal::new(url, category, &snippet, source));
        }

        found
    }
}

/// Text of the element enclosing the first text node that contains the needle
fn find_snippet(document: &Html, needle_lower: &str) -> Option<String> {
    for node_ref in document.root_element().descendants() {
        let Node::Text(text_node) = node_ref.value() else {
            continue;
        };

        let in_excluded = node_ref.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| is_excluded_tag(el.name()))
                .unwrap_or(false)
        });
        if in_excluded || !text_node.to_lowercase().contains(needle_lower) {
            continue;
        }

        let snippet = match node_ref.parent().and_then(ElementRef::wrap) {
            Some(parent) => element_text(parent),
            None => text_node.to_string(),
        };
        return Some(truncate_chars(&normalize_whitespace(&snippet), MAX_SNIPPET_CHARS));
    }

    None
}
