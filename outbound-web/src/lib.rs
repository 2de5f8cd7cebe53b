//! Outbound Web Layer
//!
//! Provides the network-facing half of the pipeline:
//! - HTTP client with short-timeout HEAD probes and page fetches
//! - Page routing: domain to team and portfolio URLs
//! - Pagination discovery on listing pages
//! - Firecrawl scrape/crawl client and paginated scraping

pub mod client;
pub mod firecrawl;
pub mod pagination;
pub mod router;
pub mod scrape;
pub mod testing;

pub use client::*;
pub use firecrawl::*;
pub use pagination::*;
pub use router::*;
pub use scrape::*;
