//! Outbound Agents
//!
//! Everything that talks to a third-party service on behalf of a pipeline:
//! - **Backends**: Gemini, OpenAI-compatible and Anthropic LLM calls
//! - **Extractor**: rate-limited prompts that turn page content into records
//! - **Storage**: Supabase upserts (and an in-memory store)
//! - **Webhook**: Clay ingestion (and an in-memory sink)
//! - **Settings**: environment configuration for all of the above

pub mod backend;
pub mod extractor;
pub mod prompts;
pub mod settings;
pub mod storage;
pub mod testing;
pub mod webhook;

pub use backend::*;
pub use extractor::*;
pub use settings::*;
pub use storage::*;
pub use webhook::*;
