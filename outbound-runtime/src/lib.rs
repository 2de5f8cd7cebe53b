//! Outbound Runtime
//!
//! The pipelines, each run step by step over its seeds:
//! - **BigTech**: company pages to program signals
//! - **UT-Alumni**: giving pages to donor signals and alumni contacts
//! - **VC-Partnerships**: portfolios to Series A+ companies and partnership signals
//! - **Funds**: fund domains to partners and portfolio companies
//! - **People**: one site to named people and roles

pub mod bigtech;
pub mod funds;
pub mod people;
pub mod pipeline;
pub mod ut_alumni;
pub mod vc;

pub use bigtech::*;
pub use funds::*;
pub use people::*;
pub use pipeline::*;
pub use ut_alumni::*;
pub use vc::*;
