//! Thin knowledge-graph client over Neo4j, an LLM and an embedder.

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::driver::neo4j::Neo4jDriver;
use crate::driver::GraphDriver;
use crate::edges::{EntityEdge, EpisodicEdge};
use crate::embedder::{EmbedderBackend, EmbedderClient, Embedding};
use crate::errors::{Result, WorkflowError};
use crate::llm_client::{LlmBackend, LlmClient};
use crate::nodes::{EntityNode, EpisodicNode};
use crate::prompts::extract::{self, name_key};
use crate::prompts::{ExtractedEntity, ExtractedFact, ExtractedGraph};
use crate::search::{rrf, SearchHit, DEFAULT_MIN_SCORE};
use crate::utils::lucene_escape;
use crate::workflow::Episode;

use super::GraphStore;

/// Knowledge-graph client: one extraction call per episode, MERGE-based
/// persistence, hybrid BM25 + cosine search over facts.
pub struct GraphitiClient {
    driver: Neo4jDriver,
    llm: LlmBackend,
    embedder: EmbedderBackend,
    group_id: String,
}

impl GraphitiClient {
    /// Build every handle from `config`. No query is sent until [`GraphStore::prepare`].
    pub async fn connect(config: &WorkflowConfig) -> Result<Self> {
        let llm = LlmBackend::from_config(&config.completion)?;
        let embedder = EmbedderBackend::from_config(&config.embedding)?;
        let driver = Neo4jDriver::connect(&config.graph).await?;
        info!(
            llm = %llm.provider(),
            embedder = %embedder.provider(),
            group_id = %config.group_id,
            "graph client configured"
        );
        Ok(Self::new(driver, llm, embedder, config.group_id.clone()))
    }

    pub fn new(
        driver: Neo4jDriver,
        llm: LlmBackend,
        embedder: EmbedderBackend,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            llm,
            embedder,
            group_id: group_id.into(),
        }
    }

    pub fn driver(&self) -> &Neo4jDriver {
        &self.driver
    }

    pub fn llm(&self) -> &LlmBackend {
        &self.llm
    }

    pub fn embedder(&self) -> &EmbedderBackend {
        &self.embedder
    }

    async fn extract(&self, episode: &Episode) -> Result<ExtractedGraph> {
        let messages = extract::messages(
            &episode.name,
            &episode.source_description,
            &episode.body,
            &episode.reference_time,
        );
        let graph: ExtractedGraph = self
            .llm
            .generate_structured(&messages)
            .await
            .map_err(|e| match e {
                WorkflowError::Serialization(e) => {
                    WorkflowError::Extraction(format!("malformed extraction reply: {e}"))
                }
                other => other,
            })?;
        Ok(graph.cleaned())
    }

    /// Upsert extracted entities and link them to the episode.
    ///
    /// Returns the stored uuid per [`name_key`].
    async fn save_entities(
        &self,
        episode: &EpisodicNode,
        entities: Vec<(&ExtractedEntity, Option<Embedding>)>,
    ) -> Result<HashMap<String, Uuid>> {
        let mut stored = HashMap::with_capacity(entities.len());
        for (extracted, embedding) in entities {
            let mut node = EntityNode::new(extracted.name.as_str(), self.group_id.as_str());
            node.summary = extracted.summary.clone();
            node.labels.push("Entity".to_string());
            if !extracted.entity_type.trim().is_empty() {
                node.labels.push(extracted.entity_type.trim().to_string());
            }
            node.name_embedding = embedding;

            let uuid = self.driver.save_entity(&node).await?;
            self.driver
                .save_mentions(&EpisodicEdge::mentions(episode.uuid, uuid, self.group_id.as_str()))
                .await?;
            stored.insert(name_key(&extracted.name), uuid);
        }
        Ok(stored)
    }
}

/// Extracted records paired with the embedding each one is stored with.
#[derive(Debug)]
struct IngestPlan<'g> {
    entities: Vec<(&'g ExtractedEntity, Option<Embedding>)>,
    facts: Vec<(&'g ExtractedFact, Option<Embedding>)>,
}

impl<'g> IngestPlan<'g> {
    /// Facts whose two endpoints were both extracted, in reply order.
    fn linked_facts(graph: &'g ExtractedGraph) -> Vec<&'g ExtractedFact> {
        graph
            .facts
            .iter()
            .filter(|f| {
                let linked = graph.entity(&f.source).is_some() && graph.entity(&f.target).is_some();
                if !linked {
                    warn!(source = %f.source, target = %f.target, "skipping fact with unknown endpoint");
                }
                linked
            })
            .collect()
    }

    /// Texts for the single embedding call: entity names, then fact strings.
    fn texts(graph: &'g ExtractedGraph, facts: &[&'g ExtractedFact]) -> Vec<&'g str> {
        graph
            .entities
            .iter()
            .map(|e| e.name.as_str())
            .chain(facts.iter().map(|f| f.fact.as_str()))
            .collect()
    }

    /// Hand out `embeddings` in [`texts`](Self::texts) order.
    fn new(
        graph: &'g ExtractedGraph,
        facts: Vec<&'g ExtractedFact>,
        embeddings: Vec<Embedding>,
    ) -> Self {
        let mut embeddings = embeddings.into_iter();
        let entities = graph.entities.iter().map(|e| (e, embeddings.next())).collect();
        let facts = facts.into_iter().map(|f| (f, embeddings.next())).collect();
        Self { entities, facts }
    }
}

/// Candidates to request from each ranking, or `None` when nothing can match.
fn candidate_count(query: &str, limit: usize) -> Option<usize> {
    if limit == 0 || query.trim().is_empty() {
        None
    } else {
        Some(limit.saturating_mul(2))
    }
}

/// Fuse the full-text and similarity rankings and keep the best `limit` edges.
fn fuse_edges(fulltext: Vec<EntityEdge>, similar: Vec<EntityEdge>, limit: usize) -> Vec<SearchHit> {
    let mut fused = rrf(vec![fulltext, similar], |edge: &EntityEdge| edge.uuid);
    fused.truncate(limit);
    fused.into_iter().map(SearchHit::Edge).collect()
}

impl GraphStore for GraphitiClient {
    async fn prepare(&self) -> Result<()> {
        self.driver.ping().await?;
        self.driver.build_indices().await
    }

    #[instrument(skip(self, episode), fields(episode = %episode.name, group_id = %self.group_id))]
    async fn add_episode(&self, episode: &Episode) -> Result<()> {
        let mut node = EpisodicNode::new(
            episode.name.as_str(),
            episode.body.as_str(),
            episode.source,
            episode.source_description.as_str(),
            episode.reference_time,
            self.group_id.as_str(),
        );
        node.uuid = episode.uuid;
        self.driver.save_episode(&node).await?;

        let graph = self.extract(episode).await?;
        debug!(entities = graph.entities.len(), facts = graph.facts.len(), "extraction complete");
        if graph.entities.is_empty() {
            info!("no entities extracted");
            return Ok(());
        }

        let facts = IngestPlan::linked_facts(&graph);
        let embeddings = self
            .embedder
            .embed_batch(&IngestPlan::texts(&graph, &facts))
            .await?;
        if let Some(first) = embeddings.first() {
            if first.len() != self.embedder.dim() {
                warn!(
                    expected = self.embedder.dim(),
                    actual = first.len(),
                    "embedding dimension differs from configuration"
                );
            }
        }
        let plan = IngestPlan::new(&graph, facts, embeddings);

        let stored = self.save_entities(&node, plan.entities).await?;

        for (fact, embedding) in plan.facts {
            let (Some(&source), Some(&target)) = (
                stored.get(&name_key(&fact.source)),
                stored.get(&name_key(&fact.target)),
            ) else {
                continue;
            };
            let mut edge = EntityEdge::new(
                source,
                target,
                &fact.relation,
                fact.fact.as_str(),
                node.uuid,
                episode.reference_time,
                self.group_id.as_str(),
            );
            edge.fact_embedding = embedding;
            self.driver.save_entity_edge(&edge).await?;
            node.entity_edges.push(edge.uuid);
        }

        self.driver.set_episode_edges(node.uuid, &node.entity_edges).await?;
        info!(
            entities = stored.len(),
            facts = node.entity_edges.len(),
            "episode stored"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(group_id = %self.group_id))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let Some(candidates) = candidate_count(query, limit) else {
            return Ok(Vec::new());
        };

        let vector = self.embedder.embed(query).await?;
        let fulltext = self
            .driver
            .fulltext_edge_search(&lucene_escape(query), &self.group_id, candidates)
            .await?;
        let similar = self
            .driver
            .similarity_edge_search(&vector, &self.group_id, candidates, DEFAULT_MIN_SCORE)
            .await?;
        debug!(fulltext = fulltext.len(), similar = similar.len(), "search candidates");

        Ok(fuse_edges(fulltext, similar, limit))
    }

    async fn close(&self) -> Result<()> {
        self.driver.close().await
    }
}
