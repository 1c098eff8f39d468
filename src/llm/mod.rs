//! LLM client for article enrichment and watchlist analysis.
//!
//! Talks to a local Ollama-protocol inference server: streaming generation
//! plus embeddings. All outputs pass through the sanitizer before anything
//! is persisted.

pub mod client;
pub mod prompts;
pub mod sanitize;

pub use client::{LlmClient, LlmConfig, LlmError, LlmService};
pub use sanitize::{is_garbage, parse_entities, sanitize_summary, validate_tags, TAXONOMY};
