//! EpisodicNode — an ingested episode as stored in the graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The source type of an episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeType {
    Message,
    Json,
    #[default]
    Text,
}

impl EpisodeType {
    /// Value stored in the `source` property of an `:Episodic` node.
    pub fn as_str(self) -> &'static str {
        match self {
            EpisodeType::Message => "message",
            EpisodeType::Json => "json",
            EpisodeType::Text => "text",
        }
    }
}

/// An ingested data episode (message, document, JSON record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicNode {
    pub uuid: Uuid,
    pub name: String,
    pub group_id: String,
    pub created_at: DateTime<Utc>,
    pub source: EpisodeType,
    pub source_description: String,
    pub content: String,
    /// Reference time of the episode: when its content was true.
    pub valid_at: DateTime<Utc>,
    /// UUIDs of the `RELATES_TO` edges extracted from this episode.
    pub entity_edges: Vec<Uuid>,
}

impl EpisodicNode {
    /// A fresh node with a new UUID, created now and not yet linked to any edge.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        source: EpisodeType,
        source_description: impl Into<String>,
        valid_at: DateTime<Utc>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group_id: group_id.into(),
            created_at: Utc::now(),
            source,
            source_description: source_description.into(),
            content: content.into(),
            valid_at,
            entity_edges: Vec::new(),
        }
    }
}
