//! The graph service as the workflow sees it.
//!
//! [`GraphStore`] is the seam between the workflow runner and a knowledge
//! graph: tests drive the runner through hand-written stores, production runs
//! use [`GraphitiClient`].

mod client;

pub use client::GraphitiClient;

use crate::errors::Result;
use crate::search::SearchHit;
use crate::workflow::Episode;

/// Operations the workflow runner needs from a knowledge-graph service.
#[allow(async_fn_in_trait)]
pub trait GraphStore: Send + Sync {
    /// First contact with the backing services: verify reachability and
    /// create indexes. Failure here is fatal to a run.
    async fn prepare(&self) -> Result<()>;

    /// Ingest one episode.
    async fn add_episode(&self, episode: &Episode) -> Result<()>;

    /// Return at most `limit` results for `query`, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Release connections. The store is not used afterwards.
    async fn close(&self) -> Result<()>;
}
