//! The episode-ingestion-and-search workflow.
//!
//! A [`Session`] submits [`Episode`]s and [`Question`]s to a
//! [`GraphStore`](crate::graph::GraphStore) strictly in caller order and turns
//! every per-item fault into an outcome instead of an early return.
//! [`report`] renders those outcomes for the console.

pub mod report;
mod session;

pub use session::Session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;
use crate::nodes::EpisodeType;
use crate::search::SearchHit;

/// A named unit of text submitted for ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Identity of the stored episode node. Fixed at construction so that a
    /// resubmitted episode updates the same node and edges.
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    /// Run-scoped label; unique within one ingest batch.
    pub name: String,
    pub body: String,
    pub source_description: String,
    /// When the content was true. Defaults to submission time.
    pub reference_time: DateTime<Utc>,
    #[serde(default)]
    pub source: EpisodeType,
}

impl Episode {
    pub fn new(
        name: impl Into<String>,
        body: impl Into<String>,
        source_description: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            body: body.into(),
            source_description: source_description.into(),
            reference_time: Utc::now(),
            source: EpisodeType::Text,
        }
    }

    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = reference_time;
        self
    }

    pub fn with_source(mut self, source: EpisodeType) -> Self {
        self.source = source;
        self
    }
}

/// A natural-language search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    /// Maximum number of results requested from the store.
    pub limit: usize,
}

impl Question {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
        }
    }
}

/// Result of submitting one episode.
#[derive(Debug)]
pub struct IngestOutcome {
    pub name: String,
    pub result: Result<()>,
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of running one question.
#[derive(Debug)]
pub struct QueryOutcome {
    pub query: String,
    pub limit: usize,
    /// Ranked hits, best first; possibly empty.
    pub result: Result<Vec<SearchHit>>,
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Number of hits, zero on failure.
    pub fn hit_count(&self) -> usize {
        self.result.as_ref().map_or(0, Vec::len)
    }
}
