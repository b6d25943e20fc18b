//! EpisodicEdge — MENTIONS relationship (EpisodicNode → EntityNode).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An episode mentioning an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicEdge {
    pub uuid: Uuid,
    /// UUID of the source EpisodicNode.
    pub source_node_uuid: Uuid,
    /// UUID of the target EntityNode.
    pub target_node_uuid: Uuid,
    pub group_id: String,
    pub created_at: DateTime<Utc>,
}

impl EpisodicEdge {
    /// One MENTIONS edge per episode/entity pair; the uuid is derived from both.
    pub fn mentions(episode: Uuid, entity: Uuid, group_id: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v5(&episode, entity.as_bytes()),
            source_node_uuid: episode,
            target_node_uuid: entity,
            group_id: group_id.into(),
            created_at: Utc::now(),
        }
    }
}
