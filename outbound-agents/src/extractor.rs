//! LLM extraction
//!
//! Turns scraped page content into typed records. Every model call goes
//! through the shared [`RateLimiter`] first. Responses that are not the
//! requested JSON are treated as "nothing found" rather than errors.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use outbound_core::{
    truncate_chars, AlumniRecord, CompanyRecord, NamedPerson, PersonRecord, PortfolioCompany, RateLimiter,
};

use crate::prompts::{
    alumni_prompt, company_name_prompt, company_people_prompt, fund_companies_prompt, fund_people_prompt,
    names_prompt, portfolio_companies_prompt, EXTRACTION_SYSTEM_PROMPT,
};
use crate::{LlmError, SharedBackend};

/// Separator between pages in a combined prompt
pub const PAGE_BREAK: &str = "\n\n=== PAGE BREAK ===\n\n";

/// Cap on a combined page blob
pub const MAX_BLOB_CHARS: usize = 900_000;

/// Cap on cleaned single-page content
pub const MAX_CLEAN_CHARS: usize = 3000;

/// Role recorded when none was found
pub const ROLE_NOT_SPECIFIED: &str = "Not specified";

const SKIP_PATTERNS: &[&str] = &[
    "button", "click", "menu", "nav", "navigation", "footer", "header", "cookie", "subscribe", "sign up",
    "log in", "login", "search", "©", "copyright", "all rights reserved", "privacy policy", "terms",
    "follow us", "social media", "share", "tweet", "facebook", "linkedin", "---", "***", "====",
];

static LINK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[.*\]\(").unwrap());

/// Strip navigation, boilerplate and link-only lines from page markdown
pub fn clean_content_for_llm(markdown: &str) -> String {
    let kept: Vec<&str> = markdown
        .lines()
        .filter(|line| {
            let lower = line.trim().to_lowercase();
            if lower.is_empty() {
                return false;
            }
            if SKIP_PATTERNS.iter().any(|p| lower.contains(p)) {
                return false;
            }
            if LINK_LINE.is_match(&lower) {
                return false;
            }
            lower.chars().count() >= 10 || lower.chars().any(|c| c.is_ascii_digit())
        })
        .collect();

    truncate_chars(&kept.join("\n"), MAX_CLEAN_CHARS)
}

/// Remove a leading ``` fence line and a trailing fence
pub fn strip_code_fences(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }

    let mut lines: Vec<&str> = text.lines().collect();
    if lines.first().is_some_and(|l| l.starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.starts_with("```")) {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

/// Join pages with [`PAGE_BREAK`], capped at [`MAX_BLOB_CHARS`]
pub fn join_pages(pages: &[String]) -> String {
    truncate_chars(&pages.join(PAGE_BREAK), MAX_BLOB_CHARS)
}

/// Parse a JSON array of `T`, skipping elements that do not fit.
///
/// Prose around the array is tolerated; anything else yields an empty list.
pub fn parse_json_array<T: DeserializeOwned>(text: &str) -> Vec<T> {
    let text = strip_code_fences(text);

    let items: Vec<Value> = match serde_json::from_str(&text) {
        Ok(Value::Array(items)) => items,
        Ok(_) => Vec::new(),
        Err(_) => match (text.find('['), text.rfind(']')) {
            (Some(start), Some(end)) if start < end => serde_json::from_str(&text[start..=end]).unwrap_or_default(),
            _ => Vec::new(),
        },
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_person(mut person: PersonRecord) -> Option<PersonRecord> {
    person.name = person.name.trim().to_string();
    if person.name.is_empty() {
        return None;
    }
    person.title = non_empty(person.title);
    person.linkedin_url = non_empty(person.linkedin_url);
    person.source_domain = non_empty(person.source_domain);
    Some(person)
}

fn clean_company(mut company: CompanyRecord) -> Option<CompanyRecord> {
    company.company = company.company.trim().to_string();
    if company.company.is_empty() {
        return None;
    }
    company.domain = non_empty(company.domain);
    company.source_domain = non_empty(company.source_domain);
    Some(company)
}

fn strip_emphasis(text: &str) -> String {
    text.replace('*', "").trim().to_string()
}

fn after_colon(line: &str) -> &str {
    line.split_once(':').map(|(_, rest)| rest).unwrap_or(line)
}

/// Parse `Name:` / `Role:` (or `Title:`) lines into people.
///
/// Names need at least two words and more than two characters. A role line
/// applies to the most recent name.
pub fn parse_named_people(response: &str, company: &str, signals: Option<&str>, source_url: &str) -> Vec<NamedPerson> {
    if response.to_lowercase().contains("no names found") {
        return Vec::new();
    }

    let signal = signals
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("General");

    let person = |name: String, role: String| NamedPerson {
        name,
        role,
        signal: signal.to_string(),
        company: company.to_string(),
        source_url: source_url.to_string(),
    };

    let mut people = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in response.lines() {
        let line = line.trim();
        let lower = line.to_lowercase();

        if lower.contains("name:") {
            if let Some((name, role)) = current.take() {
                people.push(person(name, role));
            }

            let name = strip_emphasis(after_colon(line));
            if name.chars().count() > 2 && name.split_whitespace().count() >= 2 {
                current = Some((name, ROLE_NOT_SPECIFIED.to_string()));
            }
        } else if lower.contains("role:") || lower.contains("title:") {
            let role = strip_emphasis(after_colon(line));
            if let Some((_, current_role)) = current.as_mut() {
                if !role.is_empty() && !role.eq_ignore_ascii_case(ROLE_NOT_SPECIFIED) {
                    *current_role = role;
                }
            }
        }
    }

    if let Some((name, role)) = current {
        people.push(person(name, role));
    }

    people
}

/// People and companies extracted for one fund
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundExtraction {
    pub people: Vec<PersonRecord>,
    pub companies: Vec<CompanyRecord>,
}

/// Rate-limited LLM extractor
pub struct LlmExtractor {
    backend: SharedBackend,
    limiter: Arc<RateLimiter>,
}

impl LlmExtractor {
    pub fn new(backend: SharedBackend, limiter: Arc<RateLimiter>) -> Self {
        Self { backend, limiter }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// One gated model call; code fences are stripped from the reply
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.limiter.allow().await;
        debug!("LLM call ({} chars) via {}", prompt.len(), self.backend.model_name());

        let text = self.backend.generate(EXTRACTION_SYSTEM_PROMPT, prompt).await?;
        Ok(strip_code_fences(&text))
    }

    /// One call for the team pages and one for the portfolio pages.
    ///
    /// A side with no page content is skipped without a call.
    pub async fn extract_vcs_and_companies(
        &self,
        team_pages: &[String],
        portfolio_pages: &[String],
    ) -> Result<FundExtraction, LlmError> {
        let mut extraction = FundExtraction::default();

        let team_blob = join_pages(team_pages);
        if !team_blob.trim().is_empty() {
            let response = self.complete(&fund_people_prompt(&team_blob)).await?;
            extraction.people = parse_json_array::<PersonRecord>(&response)
                .into_iter()
                .filter_map(clean_person)
                .collect();
        }

        let portfolio_blob = join_pages(portfolio_pages);
        if !portfolio_blob.trim().is_empty() {
            let response = self.complete(&fund_companies_prompt(&portfolio_blob)).await?;
            extraction.companies = parse_json_array::<CompanyRecord>(&response)
                .into_iter()
                .filter_map(clean_company)
                .collect();
        }

        info!(
            "Extracted {} people and {} companies",
            extraction.people.len(),
            extraction.companies.len()
        );
        Ok(extraction)
    }

    /// People at a company; founders only for seed-stage companies
    pub async fn extract_company_people(
        &self,
        pages: &[String],
        stage: &str,
        signals: Option<&str>,
    ) -> Result<Vec<PersonRecord>, LlmError> {
        let content = join_pages(pages);
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self.complete(&company_people_prompt(&content, stage, signals)).await?;
        Ok(parse_json_array::<PersonRecord>(&response)
            .into_iter()
            .filter_map(clean_person)
            .collect())
    }

    /// Portfolio companies with stage, tags and investors
    pub async fn extract_portfolio_companies(&self, pages: &[String]) -> Result<Vec<PortfolioCompany>, LlmError> {
        let content = join_pages(pages);
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self.complete(&portfolio_companies_prompt(&content)).await?;
        Ok(parse_json_array::<PortfolioCompany>(&response)
            .into_iter()
            .filter(|c| !c.name.trim().is_empty())
            .map(|mut c| {
                c.domain = non_empty(c.domain).map(|d| bare_domain(&d));
                c.funding_stage = non_empty(c.funding_stage);
                c.description = non_empty(c.description);
                c
            })
            .collect())
    }

    pub async fn extract_alumni(&self, pages: &[String]) -> Result<Vec<AlumniRecord>, LlmError> {
        let content = join_pages(pages);
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self.complete(&alumni_prompt(&content)).await?;
        Ok(parse_json_array::<AlumniRecord>(&response)
            .into_iter()
            .filter(|a| !a.name.trim().is_empty())
            .collect())
    }

    /// The company behind a page, falling back to the URL's host
    pub async fn company_name(&self, content: &str, url: &str) -> Result<String, LlmError> {
        let response = self.complete(&company_name_prompt(&truncate_chars(content, 1000))).await?;
        let name = strip_emphasis(&response);

        if name.is_empty() || name.to_lowercase().contains("unknown") {
            return Ok(host_of(url));
        }
        Ok(name)
    }

    /// Person names on one page, tagged with the company and signals
    pub async fn extract_names(
        &self,
        content: &str,
        url: &str,
        signals: Option<&str>,
    ) -> Result<Vec<NamedPerson>, LlmError> {
        let company = self.company_name(content, url).await?;
        let response = self.complete(&names_prompt(content, signals)).await?;

        let people = parse_named_people(&response, &company, signals, url);
        if people.is_empty() {
            warn!("No names found on {}", url);
        }
        Ok(people)
    }
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// `https://www.acme.io/about` and `acme.io` both become `acme.io`
fn bare_domain(domain: &str) -> String {
    let with_scheme = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    };

    Url::parse(&with_scheme)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| domain.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    fn extractor(backend: Arc<ScriptedBackend>) -> LlmExtractor {
        LlmExtractor::new(backend, Arc::new(RateLimiter::new(60)))
    }

    #[test]
    fn test_clean_content_drops_boilerplate() {
        let markdown = "\
# Team

[Home](https://acme.io)
Menu
Jane Doe leads product at Acme.
Click here to subscribe
2019
Short
© 2024 Acme Inc. All rights reserved
John Smith, Chief Technology Officer";

        let cleaned = clean_content_for_llm(markdown);
        assert_eq!(
            cleaned,
            "Jane Doe leads product at Acme.\n2019\nJohn Smith, Chief Technology Officer"
        );
    }

    #[test]
    fn test_clean_content_is_capped() {
        let markdown = "A line of meaningful content here.\n".repeat(500);
        assert_eq!(clean_content_for_llm(&markdown).chars().count(), MAX_CLEAN_CHARS);
        assert_eq!(clean_content_for_llm(""), "");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("  ```\n[]\n```  "), "[]");
        assert_eq!(strip_code_fences("[1]"), "[1]");
        assert_eq!(strip_code_fences("```json\n[1]"), "[1]");
    }

    #[test]
    fn test_join_pages() {
        let pages = vec!["one".to_string(), "two".to_string()];
        assert_eq!(join_pages(&pages), "one\n\n=== PAGE BREAK ===\n\ntwo");
        assert_eq!(join_pages(&[]), "");

        let big = vec!["x".repeat(MAX_BLOB_CHARS + 10)];
        assert_eq!(join_pages(&big).len(), MAX_BLOB_CHARS);
    }

    #[test]
    fn test_parse_json_array() {
        let people: Vec<PersonRecord> = parse_json_array(r#"[{"name": "Jane Doe", "title": "Partner"}]"#);
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].title.as_deref(), Some("Partner"));

        let people: Vec<PersonRecord> =
            parse_json_array("Here you go:\n[{\"name\": \"Jane Doe\"}, {\"title\": \"no name\"}]\nThanks!");
        assert_eq!(people.len(), 1);

        let people: Vec<PersonRecord> = parse_json_array("I could not find anyone.");
        assert!(people.is_empty());

        let people: Vec<PersonRecord> = parse_json_array(r#"{"name": "Jane Doe"}"#);
        assert!(people.is_empty());
    }

    #[test]
    fn test_parse_named_people() {
        let response = "\
**Name:** Jane Doe
**Role:** Chief Executive Officer
Name: Cher
Role: Singer
Name: John Smith
Title: Not specified
Name: Ada Lovelace";

        let people = parse_named_people(response, "Acme", None, "https://acme.io/team");
        let summary: Vec<_> = people.iter().map(|p| (p.name.as_str(), p.role.as_str())).collect();

        assert_eq!(
            summary,
            vec![
                ("Jane Doe", "Chief Executive Officer"),
                ("John Smith", "Not specified"),
                ("Ada Lovelace", "Not specified"),
            ]
        );
        assert!(people.iter().all(|p| p.signal == "General" && p.company == "Acme"));
        assert_eq!(people[0].source_url, "https://acme.io/team");
    }

    #[test]
    fn test_parse_named_people_none_found() {
        assert!(parse_named_people("No names found.", "Acme", Some("founders"), "u").is_empty());
        let people = parse_named_people("Name: Jane Doe", "Acme", Some("founders"), "u");
        assert_eq!(people[0].signal, "founders");
    }

    #[test]
    fn test_bare_domain() {
        assert_eq!(bare_domain("https://www.acme.io/about"), "acme.io");
        assert_eq!(bare_domain("acme.io"), "acme.io");
        assert_eq!(host_of("https://team.acme.io/people"), "team.acme.io");
        assert_eq!(host_of("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_fund_extraction() {
        let backend = ScriptedBackend::new(&[
            "```json\n[{\"name\": \"Jane Doe\", \"title\": \"General Partner\", \"linkedin_url\": \"\"}]\n```",
            "[{\"company\": \"Acme\", \"domain\": \"acme.io\"}, {\"company\": \" \"}]",
        ]);
        let extractor = extractor(backend.clone());

        let extraction = extractor
            .extract_vcs_and_companies(&["Jane Doe, GP".to_string()], &["Acme".to_string()])
            .await
            .unwrap();

        assert_eq!(extraction.people.len(), 1);
        assert_eq!(extraction.people[0].linkedin_url, None);
        assert_eq!(extraction.companies.len(), 1);
        assert_eq!(extraction.companies[0].domain.as_deref(), Some("acme.io"));

        let prompts = backend.prompts();
        assert!(prompts[0].contains("Extract ALL people"));
        assert!(prompts[1].contains("Extract ALL portfolio companies"));
    }

    #[tokio::test]
    async fn test_fund_extraction_skips_empty_sides() {
        let backend = ScriptedBackend::new(&["[{\"company\": \"Acme\"}]"]);
        let extractor = extractor(backend.clone());

        let extraction = extractor
            .extract_vcs_and_companies(&[], &["Acme".to_string()])
            .await
            .unwrap();

        assert!(extraction.people.is_empty());
        assert_eq!(extraction.companies.len(), 1);
        assert_eq!(backend.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_company_name_fallback() {
        let backend = ScriptedBackend::new(&["**Acme Robotics**", "Unknown"]);
        let extractor = extractor(backend);

        assert_eq!(extractor.company_name("...", "https://acme.io").await.unwrap(), "Acme Robotics");
        assert_eq!(extractor.company_name("...", "https://www.acme.io/team").await.unwrap(), "www.acme.io");
    }

    #[tokio::test]
    async fn test_extract_names() {
        let backend = ScriptedBackend::new(&["Acme", "Name: Jane Doe\nRole: CTO"]);
        let extractor = extractor(backend);

        let people = extractor
            .extract_names("Jane Doe is our CTO", "https://acme.io/team", Some("engineering"))
            .await
            .unwrap();

        assert_eq!(people.len(), 1);
        assert_eq!(people[0].company, "Acme");
        assert_eq!(people[0].role, "CTO");
        assert_eq!(people[0].signal, "engineering");
    }

    #[tokio::test]
    async fn test_portfolio_companies_normalized() {
        let backend = ScriptedBackend::new(&[
            r#"[{"name": "Acme", "domain": "https://www.acme.io", "funding_stage": "Series B", "tags": ["robotics"]}]"#,
        ]);
        let extractor = extractor(backend);

        let companies = extractor.extract_portfolio_companies(&["Acme".to_string()]).await.unwrap();
        assert_eq!(companies[0].domain.as_deref(), Some("acme.io"));
        assert!(companies[0].is_series_a_plus());
    }

    #[tokio::test]
    async fn test_backend_errors_propagate() {
        let extractor = extractor(ScriptedBackend::new(&[]));
        let result = extractor.extract_alumni(&["Class of 1999".to_string()]).await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }
}
