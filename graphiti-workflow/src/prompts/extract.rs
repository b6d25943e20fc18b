//! Episode content → entities and facts.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::llm_client::Message;

const SYSTEM_PROMPT: &str = "You are an AI assistant that extracts entities and the facts \
relating them from text. Entities are people, organisations, products, technologies, \
places or concepts that the text explicitly mentions. Facts are relationships between \
two extracted entities, stated in the text.";

const INSTRUCTIONS: &str = "\
Guidelines:
1. Extract every significant entity mentioned in the episode, using its most complete name.
2. Do not extract dates, times or the speaker as entities.
3. For each relationship between two extracted entities, produce one fact:
   - `source` and `target` must equal the `name` of an extracted entity.
   - `relation` is a short verb phrase in SCREAMING_SNAKE_CASE (e.g. SUPPORTS, WRITTEN_IN).
   - `fact` is a self-contained sentence describing the relationship.
4. Keep summaries to one sentence. Leave a summary empty if the text says nothing about the entity.";

/// One entity the model found in an episode.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ExtractedEntity {
    pub name: String,
    /// Coarse type such as `Technology` or `Organization`.
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub summary: String,
}

/// One relationship between two extracted entities.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ExtractedFact {
    pub source: String,
    pub target: String,
    pub relation: String,
    pub fact: String,
}

/// Structured reply for [`messages`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, JsonSchema)]
pub struct ExtractedGraph {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub facts: Vec<ExtractedFact>,
}

/// Key under which entity names are compared: trimmed and Unicode lower-cased.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ExtractedGraph {
    /// Drop blank names and facts, and merge entities whose [`name_key`]s match.
    pub fn cleaned(self) -> Self {
        let mut entities: Vec<ExtractedEntity> = Vec::with_capacity(self.entities.len());
        for mut entity in self.entities {
            entity.name = entity.name.trim().to_string();
            if entity.name.is_empty() {
                continue;
            }
            let key = name_key(&entity.name);
            match entities.iter_mut().find(|e| name_key(&e.name) == key) {
                Some(existing) if existing.summary.is_empty() => existing.summary = entity.summary,
                Some(_) => {}
                None => entities.push(entity),
            }
        }

        let facts = self
            .facts
            .into_iter()
            .filter(|f| !f.fact.trim().is_empty())
            .collect();

        Self { entities, facts }
    }

    /// Look up an extracted entity by [`name_key`].
    pub fn entity(&self, name: &str) -> Option<&ExtractedEntity> {
        let key = name_key(name);
        self.entities.iter().find(|e| name_key(&e.name) == key)
    }
}

/// Build the extraction request for one episode.
pub fn messages(
    episode_name: &str,
    source_description: &str,
    content: &str,
    reference_time: &DateTime<Utc>,
) -> Vec<Message> {
    let user = format!(
        "<EPISODE NAME>\n{episode_name}\n</EPISODE NAME>\n\
         <SOURCE>\n{source_description}\n</SOURCE>\n\
         <REFERENCE TIME>\n{}\n</REFERENCE TIME>\n\
         <EPISODE CONTENT>\n{content}\n</EPISODE CONTENT>\n\n\
         {INSTRUCTIONS}",
        reference_time.to_rfc3339()
    );
    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}
