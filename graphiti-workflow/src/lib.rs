//! # graphiti-workflow
//!
//! Feed named text episodes into a Neo4j-backed temporal knowledge graph and
//! query it back, with a local LLM and embedding endpoint doing extraction.
//!
//! ## Architecture
//!
//! - **Workflow runner** ([`workflow::Session`]): configure, ingest episodes
//!   and run questions strictly in caller order, one outcome per item
//! - **Graph client** ([`graph::GraphitiClient`]): LLM extraction of entities
//!   and facts, MERGE-based persistence, BM25 + cosine search fused by RRF
//! - **Providers**: OpenAI-compatible or native Ollama completion and
//!   embedding backends, chosen by [`config::ProviderKind`]
//! - **Diagnostics**: provider probes and a database summary

pub mod config;
pub mod edges;
pub mod errors;
pub mod nodes;

pub mod driver;
pub mod embedder;
pub mod llm_client;

pub mod prompts;
pub mod search;

pub mod diagnostics;
pub mod fixtures;
pub mod graph;
pub mod utils;
pub mod workflow;

pub use config::{ProviderKind, WorkflowConfig};
pub use errors::{Result, WorkflowError};
pub use graph::{GraphStore, GraphitiClient};
pub use search::SearchHit;
pub use workflow::{Episode, IngestOutcome, Question, QueryOutcome, Session};
