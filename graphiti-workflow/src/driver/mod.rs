//! Graph database driver abstraction.
//!
//! Defines the [`GraphDriver`] trait every backend satisfies, plus the Neo4j
//! implementation used by [`crate::graph::GraphitiClient`].

pub mod neo4j;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::Result;

/// Connection-level operations shared by graph database backends.
#[allow(async_fn_in_trait)]
pub trait GraphDriver: Send + Sync {
    /// Health check: verify the database answers a trivial query.
    async fn ping(&self) -> Result<()>;

    /// Release the connection pool.
    async fn close(&self) -> Result<()>;
}

/// Snapshot of what a graph database holds, for the `check-db` diagnostic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseSummary {
    /// `(labels, count)` per distinct label set.
    pub node_counts: Vec<(Vec<String>, i64)>,
    /// `(relationship type, count)`.
    pub relationship_counts: Vec<(String, i64)>,
    pub sample_entities: Vec<String>,
    /// `(episode name, created_at)`; `None` when the stored value does not parse.
    pub sample_episodes: Vec<(String, Option<DateTime<Utc>>)>,
}
