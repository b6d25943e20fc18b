//! EntityNode — a real-world entity extracted from episodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A real-world entity (person, product, concept) extracted from episodes.
///
/// Entities are merged on `(name, group_id)`; the stored UUID of an existing
/// entity wins over the one generated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub uuid: Uuid,
    pub name: String,
    pub group_id: String,
    /// Extra labels besides `Entity` (e.g. the extracted entity type).
    pub labels: Vec<String>,
    pub summary: String,
    pub name_embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl EntityNode {
    pub fn new(name: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group_id: group_id.into(),
            labels: Vec::new(),
            summary: String::new(),
            name_embedding: None,
            created_at: Utc::now(),
        }
    }
}
