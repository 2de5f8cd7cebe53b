//! Prompt templates for the extraction calls
//!
//! JSON prompts ask for a bare array so responses can be parsed without
//! post-processing beyond stripping code fences.

/// System prompt shared by every extraction call
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You extract structured information about people and \
companies from website content. Follow the requested output format exactly and never invent \
people, companies or URLs that are not present in the content.";

/// Focus suffix for the optional signals filter
fn focus_line(prefix: &str, signals: Option<&str>) -> String {
    match signals.map(str::trim).filter(|s| !s.is_empty()) {
        Some(signals) => format!("\n{} {}", prefix, signals),
        None => String::new(),
    }
}

/// Everyone on a fund's team pages
pub fn fund_people_prompt(team_blob: &str) -> String {
    format!(
        r#"
Extract ALL people from the content. Return strict JSON array of objects:
[
  {{"name": "...", "title": "...", "linkedin_url": "..."}}
]

Content:
{}
"#,
        team_blob
    )
}

/// Every company on a fund's portfolio pages
pub fn fund_companies_prompt(portfolio_blob: &str) -> String {
    format!(
        r#"
Extract ALL portfolio companies (company name + domain if present). Return strict JSON array:
[
  {{"company": "...", "domain": "..."}}
]

Content:
{}
"#,
        portfolio_blob
    )
}

/// Who to extract from a company's pages, given its funding stage
pub fn people_scope(stage: &str) -> &'static str {
    match stage.trim().to_lowercase().as_str() {
        "seed" | "pre-seed" | "early" => "founders/co-founders",
        _ => "all employees (leadership prioritized)",
    }
}

/// People at a portfolio company, scoped by stage
pub fn company_people_prompt(content: &str, stage: &str, signals: Option<&str>) -> String {
    format!(
        r#"
Extract {} from the content. Return strict JSON array:
[
  {{"name":"...","title":"...","linkedin_url":"..."}}
]{}

Content:
{}
"#,
        people_scope(stage),
        focus_line("Focus on people related to:", signals),
        content
    )
}

/// Portfolio companies with stage and tags, for the partnerships vertical
pub fn portfolio_companies_prompt(content: &str) -> String {
    format!(
        r#"
Extract ALL portfolio companies from the content. Return strict JSON array:
[
  {{"name": "...", "domain": "...", "description": "...", "tags": ["..."], "investors": ["..."], "funding_stage": "Seed | Series A | Series B | Series C | Series D | Series E | Public | Acquired"}}
]
Omit fields that are not present in the content.

Content:
{}
"#,
        content
    )
}

/// Alumni mentioned on university pages
pub fn alumni_prompt(content: &str) -> String {
    format!(
        r#"
Extract ALL University of Texas alumni mentioned in the content. Return strict JSON array:
[
  {{"name": "...", "ut_affiliation": "department, degree, year", "role": "...", "organization": "...", "location": "...", "prior_giving_signal": "...", "interests": ["..."]}}
]
Omit fields that are not present in the content.

Content:
{}
"#,
        content
    )
}

/// Company name from the start of a page
pub fn company_name_prompt(content: &str) -> String {
    format!(
        r#"What is the company name for this website?

Return ONLY the company name, nothing else.
If you cannot determine the company name, return: "Unknown"

Webpage content:
{}
"#,
        content
    )
}

/// Person names in `Name:` / `Role:` line format
pub fn names_prompt(content: &str, signals: Option<&str>) -> String {
    format!(
        r#"Look at this webpage content and extract all PERSON NAMES you find.

IMPORTANT: Only extract actual human names, NOT:
- Company names
- Product names
- Button text
- Navigation items
- Metadata

For each person, try to identify their role or title.

Return in this exact format:
Name: [full name]
Role: [their job title/role if found, or "Not specified"]
{}

If no person names are found, respond with: "No names found"

Webpage content:
{}
"#,
        focus_line("\nFocus on finding people who are:", signals),
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_people_scope_by_stage() {
        assert_eq!(people_scope("Seed"), "founders/co-founders");
        assert_eq!(people_scope(" pre-seed "), "founders/co-founders");
        assert_eq!(people_scope("early"), "founders/co-founders");
        assert_eq!(people_scope("Series B"), "all employees (leadership prioritized)");
        assert_eq!(people_scope(""), "all employees (leadership prioritized)");
    }

    #[test]
    fn test_company_people_focus() {
        let prompt = company_people_prompt("About us", "seed", Some("engineering leads"));
        assert!(prompt.contains("Extract founders/co-founders from the content."));
        assert!(prompt.contains("]\nFocus on people related to: engineering leads"));

        let prompt = company_people_prompt("About us", "seed", Some("  "));
        assert!(!prompt.contains("Focus on"));
    }

    #[test]
    fn test_json_prompts_escape_braces() {
        assert!(fund_people_prompt("x").contains(r#"{"name": "...", "title": "...", "linkedin_url": "..."}"#));
        assert!(fund_companies_prompt("x").contains(r#"{"company": "...", "domain": "..."}"#));
    }

    #[test]
    fn test_names_prompt() {
        let prompt = names_prompt("Jane Doe, CEO", Some("investors"));
        assert!(prompt.contains("Focus on finding people who are: investors"));
        assert!(prompt.ends_with("Jane Doe, CEO\n"));

        let prompt = names_prompt("Jane Doe, CEO", None);
        assert!(!prompt.contains("Focus on"));
    }
}
