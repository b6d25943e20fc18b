//! Prompt templates for LLM interactions.
//!
//! Prompts are stored as Rust string literals and paired with the
//! `schemars`-described response types they ask the model to fill.

pub mod extract;

pub use extract::{ExtractedEntity, ExtractedFact, ExtractedGraph};
