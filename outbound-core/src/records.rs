//! Records persisted by the pipelines
//!
//! These mirror the rows written to storage and sent to the enrichment
//! webhook. Absent optional fields serialize as `null`, so every row of a
//! type carries the same keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Funding stages counted as "Series A and later"
pub const SERIES_A_PLUS: &[&str] = &["Series A", "Series B", "Series C", "Series D", "Series E"];

/// A fetched page (careers, research, alumni, portfolio listing)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    /// e.g. careers, research, engineering blog
    pub source: String,
    pub raw_html_len: usize,
    pub fetched_at: DateTime<Utc>,
}

impl PageRecord {
    pub fn new(url: &str, source: &str, raw_html_len: usize) -> Self {
        Self {
            url: url.to_string(),
            source: source.to_string(),
            raw_html_len,
            fetched_at: Utc::now(),
        }
    }
}

/// A person to reach out to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

/// An alumnus with giving and interest signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlumniRecord {
    pub name: String,
    /// Department, degree, year if known
    pub ut_affiliation: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub prior_giving_signal: Option<String>,
    /// Tech and venture interests
    #[serde(default)]
    pub interests: Vec<String>,
}

/// A company listed on a VC portfolio page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioCompany {
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub investors: Vec<String>,
    #[serde(default)]
    pub funding_stage: Option<String>,
}

impl PortfolioCompany {
    /// Whether the company has raised a Series A or later
    pub fn is_series_a_plus(&self) -> bool {
        self.funding_stage
            .as_deref()
            .map(|stage| SERIES_A_PLUS.contains(&stage))
            .unwrap_or(false)
    }
}

/// A person extracted from a fund's team pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub source_domain: Option<String>,
}

/// A company extracted from a fund's portfolio pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub source_domain: Option<String>,
}

/// A name found by the single-site people finder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPerson {
    pub name: String,
    pub role: String,
    pub signal: String,
    pub company: String,
    pub source_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_a_plus() {
        let mut company = PortfolioCompany {
            name: "Acme".to_string(),
            domain: Some("acme.io".to_string()),
            description: None,
            tags: vec![],
            investors: vec![],
            funding_stage: Some("Series B".to_string()),
        };
        assert!(company.is_series_a_plus());

        company.funding_stage = Some("Seed".to_string());
        assert!(!company.is_series_a_plus());

        company.funding_stage = None;
        assert!(!company.is_series_a_plus());
    }

    #[test]
    fn test_person_record_from_llm_json() {
        let json = r#"{"name": "Jane Doe", "title": "General Partner", "linkedin_url": ""}"#;
        let person: PersonRecord = serde_json::from_str(json).unwrap();

        assert_eq!(person.name, "Jane Doe");
        assert_eq!(person.title.as_deref(), Some("General Partner"));
        assert!(person.source_domain.is_none());

        let out = serde_json::to_value(&person).unwrap();
        assert!(out["source_domain"].is_null());
    }

    #[test]
    fn test_rows_share_keys() {
        let keys = |v: serde_json::Value| v.as_object().unwrap().keys().cloned().collect::<Vec<_>>();

        let with_title = PersonRecord {
            name: "Jane Doe".to_string(),
            title: Some("GP".to_string()),
            linkedin_url: None,
            source_domain: Some("fund.example".to_string()),
        };
        let bare = PersonRecord {
            name: "John Roe".to_string(),
            title: None,
            linkedin_url: None,
            source_domain: None,
        };

        assert_eq!(
            keys(serde_json::to_value(&with_title).unwrap()),
            keys(serde_json::to_value(&bare).unwrap())
        );
    }
}
