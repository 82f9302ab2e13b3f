//! Prompt system for the filings chat.
//!
//! This crate provides structured prompt management with:
//! - A built-in answering prompt for filing questions
//! - YAML overrides under `.filings/prompts/`
//! - Handlebars template rendering for the system and user messages

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use builtin::{answer_prompt, ANSWER_PROMPT_ID};
pub use loader::load_prompt;
pub use types::{BuiltPrompt, PromptDefinition};
