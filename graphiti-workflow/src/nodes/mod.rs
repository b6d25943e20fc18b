//! Node types persisted in the knowledge graph.
//!
//! - [`EntityNode`] — real-world entities (`:Entity`)
//! - [`EpisodicNode`] — ingested episodes (`:Episodic`)

pub mod entity;
pub mod episodic;

pub use entity::EntityNode;
pub use episodic::{EpisodeType, EpisodicNode};
