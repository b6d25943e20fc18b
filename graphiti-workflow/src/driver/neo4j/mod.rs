//! Neo4j graph driver implementation.
//!
//! Uses `neo4rs` 0.8 for async, pooled Bolt connections. Timestamps travel as
//! RFC 3339 strings: written through `datetime($param)` and read back with
//! `toString(..)`, see [`crate::utils::datetime`].

use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::GraphConfig;
use crate::edges::{EntityEdge, EpisodicEdge};
use crate::errors::{Result, WorkflowError};
use crate::nodes::{EntityNode, EpisodicNode};
use crate::utils::{from_cypher_datetime, to_cypher_datetime};

use super::{DatabaseSummary, GraphDriver};

/// Full-text index over relationship facts.
pub const EDGE_FULLTEXT_INDEX: &str = "edge_name_and_fact";

const INDEX_QUERIES: &[&str] = &[
    "CREATE INDEX entity_uuid IF NOT EXISTS FOR (n:Entity) ON (n.uuid)",
    "CREATE INDEX entity_name_group IF NOT EXISTS FOR (n:Entity) ON (n.name, n.group_id)",
    "CREATE INDEX episode_uuid IF NOT EXISTS FOR (n:Episodic) ON (n.uuid)",
    "CREATE INDEX episode_group IF NOT EXISTS FOR (n:Episodic) ON (n.group_id)",
    "CREATE INDEX relation_uuid IF NOT EXISTS FOR ()-[r:RELATES_TO]-() ON (r.uuid)",
    "CREATE INDEX relation_group IF NOT EXISTS FOR ()-[r:RELATES_TO]-() ON (r.group_id)",
    "CREATE FULLTEXT INDEX edge_name_and_fact IF NOT EXISTS \
     FOR ()-[r:RELATES_TO]-() ON EACH [r.name, r.fact, r.group_id]",
];

/// Columns every edge-returning query projects, consumed by [`edge_from_row`].
const EDGE_RETURN: &str = "\
    RETURN r.uuid AS uuid, s.uuid AS source_uuid, t.uuid AS target_uuid, \
           r.name AS name, r.fact AS fact, r.group_id AS group_id, \
           coalesce(r.episodes, []) AS episodes, \
           coalesce(toString(r.valid_at), '') AS valid_at, \
           coalesce(toString(r.invalid_at), '') AS invalid_at, \
           coalesce(toString(r.created_at), '') AS created_at, \
           coalesce(toString(r.expired_at), '') AS expired_at";

/// Neo4j-backed driver.
pub struct Neo4jDriver {
    graph: Graph,
    uri: String,
}

impl Neo4jDriver {
    /// Build a connection pool for `config`.
    ///
    /// The pool connects lazily; call [`GraphDriver::ping`] to verify the
    /// server is reachable.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo4j_config = builder
            .build()
            .map_err(|e| WorkflowError::Configuration(format!("Neo4j config: {e}")))?;

        let graph = Graph::connect(neo4j_config).await.map_err(map_neo4j_error)?;
        info!(uri = %config.uri, "Neo4j connection pool ready");
        Ok(Self {
            graph,
            uri: config.uri.clone(),
        })
    }

    /// Create the indexes search relies on. Idempotent.
    #[instrument(skip(self), fields(uri = %self.uri))]
    pub async fn build_indices(&self) -> Result<()> {
        for statement in INDEX_QUERIES {
            self.run(query(statement)).await?;
        }
        debug!(count = INDEX_QUERIES.len(), "indexes ensured");
        Ok(())
    }

    pub async fn save_episode(&self, episode: &EpisodicNode) -> Result<()> {
        let q = query(
            "MERGE (e:Episodic {uuid: $uuid}) \
             SET e.name = $name, e.group_id = $group_id, e.source = $source, \
                 e.source_description = $source_description, e.content = $content, \
                 e.created_at = datetime($created_at), e.valid_at = datetime($valid_at), \
                 e.entity_edges = $entity_edges",
        )
        .param("uuid", episode.uuid.to_string())
        .param("name", episode.name.as_str())
        .param("group_id", episode.group_id.as_str())
        .param("source", episode.source.as_str())
        .param("source_description", episode.source_description.as_str())
        .param("content", episode.content.as_str())
        .param("created_at", to_cypher_datetime(&episode.created_at))
        .param("valid_at", to_cypher_datetime(&episode.valid_at))
        .param("entity_edges", uuid_strings(&episode.entity_edges));
        self.run(q).await
    }

    /// Record which facts an episode produced.
    pub async fn set_episode_edges(&self, episode_uuid: Uuid, edges: &[Uuid]) -> Result<()> {
        let q = query("MATCH (e:Episodic {uuid: $uuid}) SET e.entity_edges = $entity_edges")
            .param("uuid", episode_uuid.to_string())
            .param("entity_edges", uuid_strings(edges));
        self.run(q).await
    }

    /// Upsert an entity keyed by `(name, group_id)` and return the stored uuid.
    ///
    /// An existing node keeps its uuid; a non-empty summary and embedding
    /// replace the stored ones.
    pub async fn save_entity(&self, entity: &EntityNode) -> Result<Uuid> {
        let q = query(
            "MERGE (n:Entity {name: $name, group_id: $group_id}) \
             ON CREATE SET n.uuid = $uuid, n.created_at = datetime($created_at), n.summary = '' \
             SET n.labels = $labels, \
                 n.summary = CASE WHEN $summary = '' THEN n.summary ELSE $summary END, \
                 n.name_embedding = CASE WHEN size($name_embedding) = 0 \
                                         THEN n.name_embedding ELSE $name_embedding END \
             RETURN n.uuid AS uuid",
        )
        .param("name", entity.name.as_str())
        .param("group_id", entity.group_id.as_str())
        .param("uuid", entity.uuid.to_string())
        .param("created_at", to_cypher_datetime(&entity.created_at))
        .param("labels", entity.labels.clone())
        .param("summary", entity.summary.as_str())
        .param("name_embedding", to_f64(entity.name_embedding.as_deref()));

        let row = self
            .fetch_one(q)
            .await?
            .ok_or_else(|| WorkflowError::Driver(format!("entity '{}' was not stored", entity.name)))?;
        parse_uuid(&get::<String>(&row, "uuid")?)
    }

    pub async fn save_mentions(&self, edge: &EpisodicEdge) -> Result<()> {
        let q = query(
            "MATCH (e:Episodic {uuid: $episode_uuid}) \
             MATCH (n:Entity {uuid: $entity_uuid}) \
             MERGE (e)-[r:MENTIONS {uuid: $uuid}]->(n) \
             SET r.group_id = $group_id, r.created_at = datetime($created_at)",
        )
        .param("episode_uuid", edge.source_node_uuid.to_string())
        .param("entity_uuid", edge.target_node_uuid.to_string())
        .param("uuid", edge.uuid.to_string())
        .param("group_id", edge.group_id.as_str())
        .param("created_at", to_cypher_datetime(&edge.created_at));
        self.run(q).await
    }

    pub async fn save_entity_edge(&self, edge: &EntityEdge) -> Result<()> {
        let q = query(
            "MATCH (s:Entity {uuid: $source_uuid}) \
             MATCH (t:Entity {uuid: $target_uuid}) \
             MERGE (s)-[r:RELATES_TO {uuid: $uuid}]->(t) \
             SET r.name = $name, r.fact = $fact, r.group_id = $group_id, \
                 r.fact_embedding = $fact_embedding, r.episodes = $episodes, \
                 r.created_at = datetime($created_at), \
                 r.valid_at = CASE WHEN $valid_at = '' THEN null ELSE datetime($valid_at) END",
        )
        .param("source_uuid", edge.source_node_uuid.to_string())
        .param("target_uuid", edge.target_node_uuid.to_string())
        .param("uuid", edge.uuid.to_string())
        .param("name", edge.name.as_str())
        .param("fact", edge.fact.as_str())
        .param("group_id", edge.group_id.as_str())
        .param("fact_embedding", to_f64(edge.fact_embedding.as_deref()))
        .param("episodes", uuid_strings(&edge.episodes))
        .param("created_at", to_cypher_datetime(&edge.created_at))
        .param(
            "valid_at",
            edge.valid_at.as_ref().map(to_cypher_datetime).unwrap_or_default(),
        );
        self.run(q).await
    }

    /// BM25 search over edge names and facts. `lucene_query` must already be escaped.
    #[instrument(skip(self))]
    pub async fn fulltext_edge_search(
        &self,
        lucene_query: &str,
        group_id: &str,
        limit: usize,
    ) -> Result<Vec<EntityEdge>> {
        if lucene_query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let cypher = format!(
            "CALL db.index.fulltext.queryRelationships('{EDGE_FULLTEXT_INDEX}', $query, {{limit: $limit}}) \
             YIELD relationship AS r, score \
             WHERE r.group_id = $group_id \
             MATCH (s:Entity)-[r]->(t:Entity) \
             WITH r, s, t, score ORDER BY score DESC LIMIT $limit \
             {EDGE_RETURN}"
        );
        let q = query(&cypher)
            .param("query", lucene_query)
            .param("group_id", group_id)
            .param("limit", limit as i64);
        self.fetch_edges(q).await
    }

    /// Cosine-similarity search over stored fact embeddings.
    #[instrument(skip(self, vector), fields(dim = vector.len()))]
    pub async fn similarity_edge_search(
        &self,
        vector: &[f32],
        group_id: &str,
        limit: usize,
        min_score: f64,
    ) -> Result<Vec<EntityEdge>> {
        let cypher = format!(
            "MATCH (s:Entity)-[r:RELATES_TO]->(t:Entity) \
             WHERE r.group_id = $group_id AND size(coalesce(r.fact_embedding, [])) = size($vector) \
             WITH s, r, t, vector.similarity.cosine(r.fact_embedding, $vector) AS score \
             WHERE score >= $min_score \
             WITH s, r, t, score ORDER BY score DESC LIMIT $limit \
             {EDGE_RETURN}"
        );
        let q = query(&cypher)
            .param("group_id", group_id)
            .param("vector", to_f64(Some(vector)))
            .param("min_score", min_score)
            .param("limit", limit as i64);
        self.fetch_edges(q).await
    }

    /// Counts and samples for the `check-db` diagnostic.
    pub async fn summary(&self) -> Result<DatabaseSummary> {
        let mut summary = DatabaseSummary::default();

        for row in self
            .fetch_all(query("MATCH (n) RETURN labels(n) AS labels, count(n) AS count"))
            .await?
        {
            summary
                .node_counts
                .push((get::<Vec<String>>(&row, "labels")?, get::<i64>(&row, "count")?));
        }

        for row in self
            .fetch_all(query("MATCH ()-[r]->() RETURN type(r) AS type, count(r) AS count"))
            .await?
        {
            summary
                .relationship_counts
                .push((get::<String>(&row, "type")?, get::<i64>(&row, "count")?));
        }

        for row in self
            .fetch_all(query("MATCH (n:Entity) RETURN coalesce(n.name, '') AS name LIMIT 5"))
            .await?
        {
            summary.sample_entities.push(get::<String>(&row, "name")?);
        }

        for row in self
            .fetch_all(query(
                "MATCH (e:Episodic) \
                 RETURN coalesce(e.name, '') AS name, coalesce(toString(e.created_at), '') AS created \
                 LIMIT 5",
            ))
            .await?
        {
            let created = get::<String>(&row, "created")?;
            summary
                .sample_episodes
                .push((get::<String>(&row, "name")?, from_cypher_datetime(&created)));
        }

        Ok(summary)
    }

    // ── query helpers ──────────────────────────────────────────────────────

    async fn run(&self, q: Query) -> Result<()> {
        self.graph.run(q).await.map_err(map_neo4j_error)
    }

    async fn fetch_all(&self, q: Query) -> Result<Vec<Row>> {
        let mut stream = self.graph.execute(q).await.map_err(map_neo4j_error)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(map_neo4j_error)? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn fetch_one(&self, q: Query) -> Result<Option<Row>> {
        Ok(self.fetch_all(q).await?.into_iter().next())
    }

    async fn fetch_edges(&self, q: Query) -> Result<Vec<EntityEdge>> {
        self.fetch_all(q).await?.iter().map(edge_from_row).collect()
    }
}

impl GraphDriver for Neo4jDriver {
    async fn ping(&self) -> Result<()> {
        let row = self.fetch_one(query("RETURN 1 AS ok")).await?;
        match row {
            Some(row) if get::<i64>(&row, "ok")? == 1 => Ok(()),
            _ => Err(WorkflowError::Driver("ping returned no row".to_string())),
        }
    }

    async fn close(&self) -> Result<()> {
        // neo4rs releases pooled connections when the last `Graph` clone drops.
        debug!(uri = %self.uri, "closing Neo4j driver");
        Ok(())
    }
}

// ── row mapping ────────────────────────────────────────────────────────────

fn edge_from_row(row: &Row) -> Result<EntityEdge> {
    let episodes = get::<Vec<String>>(row, "episodes")?
        .iter()
        .map(|s| parse_uuid(s))
        .collect::<Result<Vec<_>>>()?;
    let created_at = from_cypher_datetime(&get::<String>(row, "created_at")?)
        .ok_or_else(|| WorkflowError::Driver("edge without created_at".to_string()))?;

    Ok(EntityEdge {
        uuid: parse_uuid(&get::<String>(row, "uuid")?)?,
        source_node_uuid: parse_uuid(&get::<String>(row, "source_uuid")?)?,
        target_node_uuid: parse_uuid(&get::<String>(row, "target_uuid")?)?,
        name: get(row, "name")?,
        fact: get(row, "fact")?,
        fact_embedding: None,
        episodes,
        valid_at: from_cypher_datetime(&get::<String>(row, "valid_at")?),
        invalid_at: from_cypher_datetime(&get::<String>(row, "invalid_at")?),
        created_at,
        expired_at: from_cypher_datetime(&get::<String>(row, "expired_at")?),
        group_id: get(row, "group_id")?,
    })
}

fn get<T>(row: &Row, key: &str) -> Result<T>
where
    T: for<'de> serde::Deserialize<'de>,
{
    row.get::<T>(key)
        .map_err(|e| WorkflowError::Driver(format!("column '{key}': {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| WorkflowError::Driver(format!("invalid uuid '{s}': {e}")))
}

fn uuid_strings(uuids: &[Uuid]) -> Vec<String> {
    uuids.iter().map(Uuid::to_string).collect()
}

fn to_f64(vector: Option<&[f32]>) -> Vec<f64> {
    vector
        .unwrap_or_default()
        .iter()
        .map(|&x| f64::from(x))
        .collect()
}

/// I/O and connection failures are connectivity faults; everything else is a driver error.
fn map_neo4j_error(err: neo4rs::Error) -> WorkflowError {
    match err {
        neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
            WorkflowError::Connectivity(err.to_string())
        }
        other => WorkflowError::Driver(other.to_string()),
    }
}
