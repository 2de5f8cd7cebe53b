//! Keyword signals
//!
//! A signal is evidence of a topic ("Hackathon", "Donor", "Partners") found on
//! a page, carrying a short snippet of the surrounding text. Each vertical
//! persists signals under its own row shape.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{truncate_chars, MAX_SNIPPET_CHARS};

/// A keyword hit on a page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    /// Page the signal was found on
    pub url: String,
    /// Category from the keyword table (e.g. "Developer Relations")
    pub signal_type: String,
    /// Surrounding text, at most 240 characters
    pub snippet: String,
    /// Where the text came from (e.g. "html", "firecrawl")
    pub source: String,
}

impl Signal {
    /// Create a signal; the snippet is truncated to [`MAX_SNIPPET_CHARS`]
    pub fn new(url: &str, signal_type: &str, snippet: &str, source: &str) -> Self {
        Self {
            url: url.to_string(),
            signal_type: signal_type.to_string(),
            snippet: truncate_chars(snippet, MAX_SNIPPET_CHARS),
            source: source.to_string(),
        }
    }

    /// Content hash over every field, stable across runs.
    ///
    /// Identical signals hash identically, so repeated upserts stay idempotent.
    pub fn origin_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [&self.url, &self.signal_type, &self.snippet, &self.source] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())[..16].to_string()
    }
}

/// UT-Alumni row shape: the category is stored as a `tag`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorSignal {
    pub url: String,
    pub snippet: String,
    /// Donor roll, quote, sponsorship, foundation affiliation
    pub tag: String,
}

impl From<Signal> for DonorSignal {
    fn from(signal: Signal) -> Self {
        Self {
            url: signal.url,
            snippet: signal.snippet,
            tag: signal.signal_type,
        }
    }
}

/// VC-Partnerships row shape: keyed by the portfolio company's domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnershipSignal {
    pub company_domain: String,
    pub url: String,
    /// Partners, University Programs, Open Innovation, etc.
    pub signal_type: String,
    pub snippet: String,
}

impl PartnershipSignal {
    pub fn from_signal(signal: Signal, company_domain: &str) -> Self {
        Self {
            company_domain: company_domain.to_string(),
            url: signal.url,
            signal_type: signal.signal_type,
            snippet: signal.snippet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_snippet_truncated() {
        let long = "x".repeat(500);
        let signal = Signal::new("https://example.com", "Research", &long, "html");
        assert_eq!(signal.snippet.chars().count(), MAX_SNIPPET_CHARS);
    }

    #[test]
    fn test_origin_hash_stable() {
        let a = Signal::new("https://example.com", "Hackathon", "Join our hackathon", "html");
        let b = a.clone();
        let c = Signal::new("https://example.com", "Hackathon", "Join our hackathon", "firecrawl");

        assert_eq!(a.origin_hash(), b.origin_hash());
        assert_ne!(a.origin_hash(), c.origin_hash());
        assert_eq!(a.origin_hash().len(), 16);
    }

    #[test]
    fn test_vertical_row_shapes() {
        let signal = Signal::new("https://utexas.edu/give", "Donor", "Donor roll 2024", "html");

        let donor = DonorSignal::from(signal.clone());
        assert_eq!(donor.tag, "Donor");

        let partnership = PartnershipSignal::from_signal(signal, "acme.io");
        assert_eq!(partnership.company_domain, "acme.io");
        assert_eq!(partnership.signal_type, "Donor");

        let json = serde_json::to_value(&donor).unwrap();
        assert!(json.get("signal_type").is_none());
        assert_eq!(json["tag"], "Donor");
    }
}
