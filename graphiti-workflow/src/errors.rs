//! Error types for graphiti-workflow.

use std::time::Duration;

/// Alias for Results returning [`WorkflowError`].
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Top-level error type for graphiti-workflow.
///
/// `Configuration` and a `Connectivity` fault raised while preparing the
/// session are fatal to a run. `Ingest` and `Query` wrap a per-item fault and
/// are recorded in the item's outcome instead of being propagated.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connectivity fault: {0}")]
    Connectivity(String),

    #[error("Call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Embedder error: {0}")]
    Embedder(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Episode name '{0}' already submitted in this batch")]
    DuplicateEpisode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to ingest episode '{episode}': {source}")]
    Ingest {
        episode: String,
        #[source]
        source: Box<WorkflowError>,
    },

    #[error("Query '{query}' failed: {source}")]
    Query {
        query: String,
        #[source]
        source: Box<WorkflowError>,
    },
}

impl WorkflowError {
    /// Wrap a fault raised while ingesting `episode`.
    pub fn ingest(episode: impl Into<String>, source: WorkflowError) -> Self {
        WorkflowError::Ingest {
            episode: episode.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a fault raised while running `query`.
    pub fn query(query: impl Into<String>, source: WorkflowError) -> Self {
        WorkflowError::Query {
            query: query.into(),
            source: Box::new(source),
        }
    }

    /// Whether the underlying cause is an unreachable service.
    ///
    /// Looks through `Ingest`/`Query` wrappers.
    pub fn is_connectivity(&self) -> bool {
        match self {
            WorkflowError::Connectivity(_) => true,
            WorkflowError::Ingest { source, .. } | WorkflowError::Query { source, .. } => {
                source.is_connectivity()
            }
            _ => false,
        }
    }

    /// Short reason for console output, without the item wrapper.
    pub fn reason(&self) -> String {
        match self {
            WorkflowError::Ingest { source, .. } | WorkflowError::Query { source, .. } => {
                source.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// LLM-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited")]
    RateLimit,

    #[error("Model refused to respond")]
    Refusal,

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("Authentication failed")]
    Authentication,

    #[error("No JSON object in LLM response: {0}")]
    InvalidJson(String),

    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },
}
