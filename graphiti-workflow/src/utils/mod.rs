//! Shared utilities.
//!
//! - Text helpers for console labels, LLM replies and full-text queries
//! - Date/time conversion to and from Cypher `datetime` strings

pub mod datetime;
pub mod text;

pub use datetime::{from_cypher_datetime, to_cypher_datetime};
pub use text::{display_label, extract_json_object, lucene_escape, normalize_whitespace};
