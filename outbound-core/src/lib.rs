//! Outbound Core - record types and page heuristics for lead discovery
//!
//! This crate provides the network-free building blocks:
//! - Keyword signals and their per-vertical row shapes
//! - Static keyword tables for the BigTech, UT-Alumni and VC-Partnerships verticals
//! - HTML text extraction shared by the matcher and the scrapers
//! - A trailing-window rate limiter for LLM calls

pub mod html;
pub mod keywords;
pub mod limiter;
pub mod records;
pub mod signals;

pub use html::*;
pub use keywords::*;
pub use limiter::*;
pub use records::*;
pub use signals::*;

/// Maximum characters kept in a signal snippet
pub const MAX_SNIPPET_CHARS: usize = 240;

/// Default LLM requests per minute
pub const DEFAULT_RPM: u32 = 15;
