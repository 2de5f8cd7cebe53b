//! Page router
//!
//! Resolves a fund or company domain to its most likely "team" and
//! "portfolio" pages:
//! 1. HEAD-probe a static list of well-known paths per category
//! 2. If a category is still open, read the homepage and probe the
//!    same-site links whose path or text mentions that category
//!
//! Static paths always win over discovered ones. Routing never fails; a
//! category that cannot be resolved comes back as `None`.

use std::collections::BTreeSet;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::{ProbeOutcome, SharedFetcher};

/// Page category the router resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Team,
    Portfolio,
}

impl Category {
    /// Well-known paths, probed in order
    pub fn static_paths(&self) -> &'static [&'static str] {
        match self {
            Category::Team => &[
                "/team",
                "/about/team",
                "/people",
                "/partners",
                "/leadership",
                "/our-team",
                "/meet-the-team",
                "/professionals",
                "/investment-team",
                "/management",
                "/advisors",
                "/board",
                "/who-we-are",
                "/about-us",
            ],
            Category::Portfolio => &[
                "/portfolio",
                "/companies",
                "/investments",
                "/portfolio-companies",
                "/startups",
                "/ventures",
                "/projects",
            ],
        }
    }

    /// Broader keywords matched against homepage link paths and text
    pub fn discovery_keywords(&self) -> &'static [&'static str] {
        match self {
            Category::Team => &[
                "team",
                "people",
                "leadership",
                "partners",
                "professionals",
                "investment-team",
                "management",
                "advisors",
                "board",
                "who-we-are",
                "our-team",
                "meet-the-team",
                "about",
            ],
            Category::Portfolio => &[
                "portfolio",
                "companies",
                "investments",
                "portfolio-companies",
                "startups",
                "ventures",
                "projects",
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Team => "team",
            Category::Portfolio => "portfolio",
        }
    }

    fn static_candidates(&self) -> Vec<CandidatePath> {
        self.static_paths()
            .iter()
            .map(|path| CandidatePath {
                path: path.to_string(),
                category: *self,
                source: PathSource::Static,
            })
            .collect()
    }
}

/// Which list a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    Static,
    Discovered,
}

/// A relative path to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePath {
    pub path: String,
    pub category: Category,
    pub source: PathSource,
}

/// Resolved pages for one domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub team_url: Option<Url>,
    pub portfolio_url: Option<Url>,
}

impl Route {
    pub fn is_complete(&self) -> bool {
        self.team_url.is_some() && self.portfolio_url.is_some()
    }
}

/// Candidates discovered from a homepage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredPaths {
    pub team: Vec<CandidatePath>,
    pub portfolio: Vec<CandidatePath>,
}

/// Outcome of homepage discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(DiscoveredPaths),
    /// Homepage could not be fetched; carries the reason for logging
    Unavailable(String),
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Timeout per HEAD probe
    pub probe_timeout: Duration,
    /// Timeout for the homepage fetch
    pub homepage_timeout: Duration,
    /// Discovered candidates kept per category, shortest first
    pub max_discovered: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(2),
            homepage_timeout: Duration::from_secs(5),
            max_discovered: 15,
        }
    }
}

/// Resolves domains to team and portfolio pages
pub struct PageRouter {
    fetcher: SharedFetcher,
    config: RouterConfig,
}

impl PageRouter {
    pub fn new(fetcher: SharedFetcher) -> Self {
        Self::with_config(fetcher, RouterConfig::default())
    }

    pub fn with_config(fetcher: SharedFetcher, config: RouterConfig) -> Self {
        Self { fetcher, config }
    }

    /// Resolve `domain` to its team and portfolio URLs
    pub async fn route(&self, domain: &str) -> Route {
        let Some(origin) = normalize_origin(domain) else {
            debug!("Cannot route empty or invalid domain: {:?}", domain);
            return Route::default();
        };

        let mut route = Route {
            team_url: self.first_hit(&origin, &Category::Team.static_candidates()).await,
            portfolio_url: self
                .first_hit(&origin, &Category::Portfolio.static_candidates())
                .await,
        };

        if !route.is_complete() {
            match self.discover(&origin).await {
                Discovery::Found(paths) => {
                    if route.team_url.is_none() {
                        route.team_url = self.first_hit(&origin, &paths.team).await;
                    }
                    if route.portfolio_url.is_none() {
                        route.portfolio_url = self.first_hit(&origin, &paths.portfolio).await;
                    }
                }
                Discovery::Unavailable(reason) => {
                    debug!("Homepage discovery unavailable for {}: {}", origin, reason);
                }
            }
        }

        info!(
            "Routed {}: team={} portfolio={}",
            domain,
            route.team_url.as_ref().map(Url::as_str).unwrap_or("-"),
            route.portfolio_url.as_ref().map(Url::as_str).unwrap_or("-"),
        );

        route
    }

    /// Probe candidates in order; first status below 400 wins
    async fn first_hit(&self, origin: &Url, candidates: &[CandidatePath]) -> Option<Url> {
        for candidate in candidates {
            let Some(url) = candidate_url(origin, &candidate.path) else {
                continue;
            };

            match self.fetcher.head(&url, self.config.probe_timeout).await {
                ProbeOutcome::Hit(final_url) => {
                    debug!(
                        "{} hit ({:?} {}): {}",
                        candidate.category.name(),
                        candidate.source,
                        candidate.path,
                        final_url
                    );
                    return Some(final_url);
                }
                ProbeOutcome::Miss(status) => {
                    debug!("Probe {} missed with status {}", url, status);
                }
                ProbeOutcome::Failed(reason) => {
                    debug!("Probe {} failed: {}", url, reason);
                }
            }
        }

        None
    }

    /// Fetch the homepage and collect candidate paths from its links
    pub async fn discover(&self, origin: &Url) -> Discovery {
        match self.fetcher.get(origin, self.config.homepage_timeout).await {
            Ok(page) => Discovery::Found(discover_candidates(
                &page.body,
                origin,
                self.config.max_discovered,
            )),
            Err(e) => Discovery::Unavailable(e.to_string()),
        }
    }
}

/// Turn a bare domain into an absolute origin URL
pub fn normalize_origin(domain: &str) -> Option<Url> {
    let domain = domain.trim();
    if domain.is_empty() {
        return None;
    }

    let lower = domain.to_ascii_lowercase();
    let base = if lower.starts_with("http://") || lower.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    };

    Url::parse(&base).ok().filter(|url| url.host_str().is_some())
}

/// Join a candidate path onto the origin, keeping any base path
pub fn candidate_url(origin: &Url, path: &str) -> Option<Url> {
    let base = format!("{}/", origin.as_str().trim_end_matches('/'));
    Url::parse(&base).ok()?.join(path.trim_start_matches('/')).ok()
}

/// Collect same-site link paths from homepage markup.
///
/// A link qualifies for a category when its path or visible text contains one
/// of the category's discovery keywords. Paths are deduplicated, sorted by
/// (length, path) and capped at `max_per_category`.
pub fn discover_candidates(html: &str, origin: &Url, max_per_category: usize) -> DiscoveredPaths {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return DiscoveredPaths::default();
    };

    let mut team = BTreeSet::new();
    let mut portfolio = BTreeSet::new();

    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let Ok(full) = origin.join(href) else {
            continue;
        };
        if !matches!(full.scheme(), "http" | "https") || full.host_str() != origin.host_str() {
            continue;
        }

        let path = match full.query() {
            Some(query) => format!("{}?{}", full.path(), query),
            None => full.path().to_string(),
        };
        let path_lower = path.to_lowercase();
        let text = anchor.text().collect::<String>().trim().to_lowercase();

        let mentions = |category: Category| {
            category
                .discovery_keywords()
                .iter()
                .any(|k| path_lower.contains(k) || text.contains(k))
        };

        if mentions(Category::Team) {
            team.insert(path.clone());
        }
        if mentions(Category::Portfolio) {
            portfolio.insert(path);
        }
    }

    DiscoveredPaths {
        team: rank_paths(team, Category::Team, max_per_category),
        portfolio: rank_paths(portfolio, Category::Portfolio, max_per_category),
    }
}

/// Shortest paths first, ties broken lexically
fn rank_paths(paths: BTreeSet<String>, category: Category, cap: usize) -> Vec<CandidatePath> {
    let mut paths: Vec<String> = paths.into_iter().collect();
    paths.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    paths
        .into_iter()
        .take(cap)
        .map(|path| CandidatePath {
            path,
            category,
            source: PathSource::Discovered,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::StaticFetcher;

    fn origin() -> Url {
        Url::parse("https://example.org").unwrap()
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(
            normalize_origin("a16z.com").unwrap().as_str(),
            "https://a16z.com/"
        );
        assert_eq!(
            normalize_origin("http://example.org").unwrap().as_str(),
            "http://example.org/"
        );
        assert_eq!(
            normalize_origin("httpie.io").unwrap().as_str(),
            "https://httpie.io/"
        );
        assert_eq!(
            normalize_origin("HTTPS://Example.org").unwrap().as_str(),
            "https://example.org/"
        );
        assert!(normalize_origin("").is_none());
        assert!(normalize_origin("   ").is_none());
    }

    #[test]
    fn test_candidate_url_keeps_base_path() {
        let base = Url::parse("https://example.org/en").unwrap();
        assert_eq!(
            candidate_url(&base, "/team").unwrap().as_str(),
            "https://example.org/en/team"
        );
        assert_eq!(
            candidate_url(&origin(), "/about/team").unwrap().as_str(),
            "https://example.org/about/team"
        );
    }

    #[test]
    fn test_discover_candidates_filters_and_sorts() {
        let html = r##"
            <html><body>
                <a href="#top">Top</a>
                <a href="/firm/people-and-culture">Our people</a>
                <a href="/about">About</a>
                <a href="https://example.org/portfolio?page=1">All companies</a>
                <a href="https://twitter.com/team">Team on Twitter</a>
                <a href="/news">Meet the team</a>
                <a href="mailto:team@example.org">Email the team</a>
                <a href="/about">About us</a>
                <a href="/blog">Blog</a>
            </body></html>
        "##;

        let paths = discover_candidates(html, &origin(), 15);

        let team: Vec<_> = paths.team.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(team, vec!["/news", "/about", "/firm/people-and-culture"]);
        assert!(paths.team.iter().all(|c| c.source == PathSource::Discovered));

        let portfolio: Vec<_> = paths.portfolio.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(portfolio, vec!["/portfolio?page=1"]);
    }

    #[test]
    fn test_discover_candidates_capped() {
        let links: String = (0..30)
            .map(|i| format!(r#"<a href="/team/member-{:02}">Member</a>"#, i))
            .collect();
        let html = format!("<html><body>{}</body></html>", links);

        let paths = discover_candidates(&html, &origin(), 15);
        assert_eq!(paths.team.len(), 15);
        assert_eq!(paths.team[0].path, "/team/member-00");
    }

    #[tokio::test]
    async fn test_static_pattern_wins_over_discovered() {
        let fetcher = StaticFetcher::new()
            .with_live("https://example.org/team")
            .with_live("https://example.org/firm/crew")
            .with_page(
                "https://example.org/",
                r#"<a href="/firm/crew">Our Team</a>"#,
            );
        let router = PageRouter::new(Arc::new(fetcher));

        let route = router.route("example.org").await;

        assert_eq!(route.team_url.unwrap().as_str(), "https://example.org/team");
        assert!(route.portfolio_url.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_domain_routes_to_nothing() {
        let fetcher = StaticFetcher::new()
            .with_head(
                "https://example.org/team",
                ProbeOutcome::Failed("timeout after 2s".to_string()),
            )
            .with_head("https://example.org/portfolio", ProbeOutcome::Miss(404));
        let router = PageRouter::new(Arc::new(fetcher));

        let route = router.route("example.org").await;
        assert_eq!(route, Route::default());
    }

    #[tokio::test]
    async fn test_discovered_team_page() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_live("https://example.org/our-team")
                .with_page(
                    "https://example.org/",
                    r#"<html><body><a href="/our-team">Our Team</a></body></html>"#,
                ),
        );
        let router = PageRouter::new(fetcher.clone());

        let route = router.route("example.org").await;

        assert_eq!(
            route.team_url.as_ref().map(Url::as_str),
            Some("https://example.org/our-team")
        );
        assert!(route.portfolio_url.is_none());
        assert_eq!(fetcher.get_calls(), vec!["https://example.org/".to_string()]);
    }

    #[tokio::test]
    async fn test_discovery_only_path() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_live("https://example.org/firm/people-and-culture")
                .with_live("https://example.org/what-we-back/startups")
                .with_page(
                    "https://example.org/",
                    r#"<a href="/firm/people-and-culture">Crew</a>
                       <a href="/what-we-back/startups">Backed</a>"#,
                ),
        );
        let router = PageRouter::new(fetcher.clone());

        let route = router.route("https://example.org").await;

        assert_eq!(
            route.team_url.unwrap().as_str(),
            "https://example.org/firm/people-and-culture"
        );
        assert_eq!(
            route.portfolio_url.unwrap().as_str(),
            "https://example.org/what-we-back/startups"
        );

        let static_probes = Category::Team.static_paths().len() + Category::Portfolio.static_paths().len();
        assert_eq!(fetcher.head_calls().len(), static_probes + 2);
    }

    #[tokio::test]
    async fn test_empty_domain() {
        let fetcher = Arc::new(StaticFetcher::new());
        let router = PageRouter::new(fetcher.clone());

        assert_eq!(router.route("").await, Route::default());
        assert!(fetcher.head_calls().is_empty());
    }
}
