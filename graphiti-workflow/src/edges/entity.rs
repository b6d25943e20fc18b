//! EntityEdge — bi-temporal fact between two EntityNodes (`RELATES_TO`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A factual relationship between two entity nodes, with bi-temporal metadata.
///
/// - **Valid time** (`valid_at` / `invalid_at`): when the fact was true in the real world.
/// - **Transaction time** (`created_at` / `expired_at`): when the edge exists in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEdge {
    pub uuid: Uuid,
    pub source_node_uuid: Uuid,
    pub target_node_uuid: Uuid,
    /// Relationship label in SCREAMING_SNAKE_CASE (e.g. `SUPPORTS`).
    pub name: String,
    /// Human-readable fact string.
    pub fact: String,
    pub fact_embedding: Option<Vec<f32>>,
    /// Episodes this fact was extracted from.
    pub episodes: Vec<Uuid>,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
    pub group_id: String,
}

impl EntityEdge {
    /// A fact first seen in `episode`, valid from the episode's reference time.
    ///
    /// The uuid is derived from the episode, both endpoints, the relation and
    /// the fact text, so re-ingesting an episode MERGEs onto the same edge.
    pub fn new(
        source_node_uuid: Uuid,
        target_node_uuid: Uuid,
        name: &str,
        fact: impl Into<String>,
        episode: Uuid,
        valid_at: DateTime<Utc>,
        group_id: impl Into<String>,
    ) -> Self {
        let name = relation_name(name);
        let fact = fact.into();
        let key = format!("{source_node_uuid}|{name}|{target_node_uuid}|{fact}");
        Self {
            uuid: Uuid::new_v5(&episode, key.as_bytes()),
            source_node_uuid,
            target_node_uuid,
            name,
            fact,
            fact_embedding: None,
            episodes: vec![episode],
            valid_at: Some(valid_at),
            invalid_at: None,
            created_at: Utc::now(),
            expired_at: None,
            group_id: group_id.into(),
        }
    }
}

/// Normalise a free-form relation ("works at", "Works-At") to `WORKS_AT`.
pub fn relation_name(raw: &str) -> String {
    let name = raw
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_");
    if name.is_empty() {
        "RELATES_TO".to_string()
    } else {
        name
    }
}
