// LLM integration: HTTP client, output repair, and fallback generation

pub mod client;
pub mod fallback;
pub mod prompts;
pub mod sanitizer;

pub use client::{CompletionOptions, LlmClient};
pub use fallback::{generate_fallback, static_fallback_content, PartialResults};
pub use sanitizer::{parse_content, try_repair_json, SanitizeFailure};
