//! Edge types persisted in the knowledge graph.
//!
//! - [`EntityEdge`] — factual relationships between entities (`RELATES_TO`, bi-temporal)
//! - [`EpisodicEdge`] — `MENTIONS` relationships (episode → entity)

pub mod entity;
pub mod episodic;

pub use entity::EntityEdge;
pub use episodic::EpisodicEdge;
