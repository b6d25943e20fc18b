//! Connection configuration for the graph store, completion and embedding services.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{Result, WorkflowError};

/// Default Ollama endpoint, native API.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
/// Default Ollama endpoint, OpenAI-compatible API.
pub const OLLAMA_OPENAI_BASE_URL: &str = "http://localhost:11434/v1";
/// Placeholder key accepted by Ollama's OpenAI-compatible API.
pub const DUMMY_API_KEY: &str = "dummy-key-for-ollama";

/// Which client implementation talks to a model endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible endpoint, including Ollama's `/v1`.
    #[default]
    OpenAi,
    /// Ollama's native `/api` endpoints.
    Ollama,
}

impl ProviderKind {
    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => OLLAMA_OPENAI_BASE_URL,
            ProviderKind::Ollama => OLLAMA_BASE_URL,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(WorkflowError::Configuration(format!(
                "unknown provider '{other}' (expected 'openai' or 'ollama')"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => f.write_str("openai"),
            ProviderKind::Ollama => f.write_str("ollama"),
        }
    }
}

/// Graph database endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GraphConfig {
    /// Bolt URI (e.g. `bolt://localhost:7687`).
    #[validate(length(min = 1))]
    pub uri: String,

    #[validate(length(min = 1))]
    pub user: String,

    #[validate(length(min = 1))]
    pub password: String,

    /// Database name; the server default when `None`.
    pub database: Option<String>,

    #[validate(range(min = 1))]
    pub max_connections: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: None,
            max_connections: 8,
        }
    }
}

/// Language-completion service parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompletionConfig {
    pub provider: ProviderKind,

    #[validate(length(min = 1))]
    pub base_url: String,

    pub api_key: String,

    #[validate(length(min = 1))]
    pub model: String,

    /// Cheaper model for short calls; falls back to `model` when empty.
    pub small_model: String,

    pub temperature: f32,

    #[validate(range(min = 1))]
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            base_url: OLLAMA_OPENAI_BASE_URL.to_string(),
            api_key: DUMMY_API_KEY.to_string(),
            model: "llama3.2".to_string(),
            small_model: "llama3.2".to_string(),
            temperature: 0.0,
            max_tokens: 4_096,
        }
    }
}

/// Embedding service parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,

    #[validate(length(min = 1))]
    pub base_url: String,

    pub api_key: String,

    #[validate(length(min = 1))]
    pub model: String,

    /// Embedding vector dimension (must be > 0).
    #[validate(range(min = 1))]
    pub dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            base_url: OLLAMA_OPENAI_BASE_URL.to_string(),
            api_key: DUMMY_API_KEY.to_string(),
            model: "nomic-embed-text".to_string(),
            dim: 768,
        }
    }
}

/// Everything a run needs, built once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkflowConfig {
    #[validate(nested)]
    pub graph: GraphConfig,

    #[validate(nested)]
    pub completion: CompletionConfig,

    #[validate(nested)]
    pub embedding: EmbeddingConfig,

    /// Partition for everything this run writes and searches.
    #[validate(length(min = 1))]
    pub group_id: String,

    /// Upper bound for a single graph-store call.
    #[validate(range(min = 1))]
    pub call_timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            completion: CompletionConfig::default(),
            embedding: EmbeddingConfig::default(),
            group_id: "default".to_string(),
            call_timeout_secs: 300,
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` first (non-fatal if `.env` is absent).
    /// `NEO4J_PASSWORD` is required; everything else has a local-Ollama default.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup, then [`check`](Self::check) it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let password = var("NEO4J_PASSWORD").ok_or_else(|| {
            WorkflowError::Configuration("NEO4J_PASSWORD is required".to_string())
        })?;

        let graph = GraphConfig {
            uri: var("NEO4J_URI").unwrap_or_else(|| "bolt://localhost:7687".to_string()),
            user: var("NEO4J_USER").unwrap_or_else(|| "neo4j".to_string()),
            password,
            database: var("NEO4J_DATABASE"),
            max_connections: parse_var(&var, "NEO4J_MAX_CONNECTIONS", 8)?,
        };

        let llm_provider = match var("LLM_PROVIDER") {
            Some(v) => v.parse()?,
            None => ProviderKind::default(),
        };
        let llm_base_url = var("LLM_BASE_URL")
            .unwrap_or_else(|| llm_provider.default_base_url().to_string());
        let llm_api_key = var("LLM_API_KEY").unwrap_or_else(|| DUMMY_API_KEY.to_string());
        let model = var("LLM_MODEL").unwrap_or_else(|| "llama3.2".to_string());

        let completion = CompletionConfig {
            provider: llm_provider,
            base_url: llm_base_url.clone(),
            api_key: llm_api_key.clone(),
            small_model: var("LLM_SMALL_MODEL").unwrap_or_else(|| model.clone()),
            model,
            temperature: parse_var(&var, "LLM_TEMPERATURE", 0.0)?,
            max_tokens: parse_var(&var, "LLM_MAX_TOKENS", 4_096)?,
        };

        // The embedder follows the LLM endpoint unless told otherwise.
        let embed_provider = match var("EMBEDDER_PROVIDER") {
            Some(v) => v.parse()?,
            None => llm_provider,
        };
        let embed_base_url = var("EMBEDDER_BASE_URL").unwrap_or_else(|| {
            if embed_provider == llm_provider {
                llm_base_url.clone()
            } else {
                embed_provider.default_base_url().to_string()
            }
        });

        let embedding = EmbeddingConfig {
            provider: embed_provider,
            base_url: embed_base_url,
            api_key: var("EMBEDDER_API_KEY").unwrap_or(llm_api_key),
            model: var("EMBEDDING_MODEL").unwrap_or_else(|| "nomic-embed-text".to_string()),
            dim: parse_var(&var, "EMBEDDING_DIM", 768)?,
        };

        let config = Self {
            graph,
            completion,
            embedding,
            group_id: var("GROUP_ID").unwrap_or_else(|| "default".to_string()),
            call_timeout_secs: parse_var(&var, "WORKFLOW_CALL_TIMEOUT_SECS", 300)?,
        };

        config.check()?;
        Ok(config)
    }

    /// Validate every field a run depends on.
    ///
    /// Fails with [`WorkflowError::Configuration`] on an empty or whitespace-only
    /// endpoint or credential, a zero dimension/timeout, or an OpenAI provider
    /// without a key.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| WorkflowError::Configuration(e.to_string()))?;

        let required = [
            ("graph.uri", &self.graph.uri),
            ("graph.user", &self.graph.user),
            ("graph.password", &self.graph.password),
            ("completion.base_url", &self.completion.base_url),
            ("completion.model", &self.completion.model),
            ("embedding.base_url", &self.embedding.base_url),
            ("embedding.model", &self.embedding.model),
            ("group_id", &self.group_id),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(WorkflowError::Configuration(format!("{field} must not be blank")));
        }

        if self.completion.provider == ProviderKind::OpenAi
            && self.completion.api_key.trim().is_empty()
        {
            return Err(WorkflowError::Configuration(
                "completion.api_key is required for the openai provider".to_string(),
            ));
        }
        if self.embedding.provider == ProviderKind::OpenAi
            && self.embedding.api_key.trim().is_empty()
        {
            return Err(WorkflowError::Configuration(
                "embedding.api_key is required for the openai provider".to_string(),
            ));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn parse_var<T, F>(var: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(val) => val.trim().parse::<T>().map_err(|_| {
            WorkflowError::Configuration(format!("{name} has an invalid value '{val}'"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid() -> WorkflowConfig {
        WorkflowConfig {
            graph: GraphConfig {
                password: "demodemo".to_string(),
                ..GraphConfig::default()
            },
            ..WorkflowConfig::default()
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = WorkflowConfig::from_lookup(lookup(&[("NEO4J_PASSWORD", "demodemo")]))
            .expect("config should load");

        assert_eq!(config.graph.uri, "bolt://localhost:7687");
        assert_eq!(config.graph.user, "neo4j");
        assert!(config.graph.database.is_none());
        assert_eq!(config.completion.provider, ProviderKind::OpenAi);
        assert_eq!(config.completion.base_url, OLLAMA_OPENAI_BASE_URL);
        assert_eq!(config.completion.api_key, DUMMY_API_KEY);
        assert_eq!(config.completion.model, "llama3.2");
        assert_eq!(config.completion.small_model, "llama3.2");
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.base_url, OLLAMA_OPENAI_BASE_URL);
        assert_eq!(config.embedding.dim, 768);
        assert_eq!(config.group_id, "default");
        assert_eq!(config.call_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_custom_values() {
        let config = WorkflowConfig::from_lookup(lookup(&[
            ("NEO4J_URI", "bolt://db.example.com:7687"),
            ("NEO4J_USER", "admin"),
            ("NEO4J_PASSWORD", "mysecret"),
            ("NEO4J_DATABASE", "graphs"),
            ("LLM_PROVIDER", "ollama"),
            ("LLM_MODEL", "qwen2.5"),
            ("EMBEDDING_MODEL", "mxbai-embed-large"),
            ("EMBEDDING_DIM", "1024"),
            ("GROUP_ID", "team-alpha"),
            ("WORKFLOW_CALL_TIMEOUT_SECS", "45"),
        ]))
        .expect("config should load");

        assert_eq!(config.graph.uri, "bolt://db.example.com:7687");
        assert_eq!(config.graph.user, "admin");
        assert_eq!(config.graph.database.as_deref(), Some("graphs"));
        assert_eq!(config.completion.provider, ProviderKind::Ollama);
        assert_eq!(config.completion.base_url, OLLAMA_BASE_URL);
        assert_eq!(config.completion.small_model, "qwen2.5");
        assert_eq!(config.embedding.provider, ProviderKind::Ollama);
        assert_eq!(config.embedding.base_url, OLLAMA_BASE_URL);
        assert_eq!(config.embedding.dim, 1024);
        assert_eq!(config.group_id, "team-alpha");
        assert_eq!(config.call_timeout_secs, 45);
    }

    #[test]
    fn test_config_missing_password() {
        let err = WorkflowConfig::from_lookup(lookup(&[])).unwrap_err();
        match err {
            WorkflowError::Configuration(msg) => assert!(msg.contains("NEO4J_PASSWORD")),
            e => panic!("expected Configuration error, got {e:?}"),
        }
    }

    #[test]
    fn test_config_blank_password_counts_as_missing() {
        let err = WorkflowConfig::from_lookup(lookup(&[("NEO4J_PASSWORD", "   ")])).unwrap_err();
        assert!(matches!(err, WorkflowError::Configuration(_)));
    }

    #[test]
    fn test_config_invalid_embedding_dim() {
        let err = WorkflowConfig::from_lookup(lookup(&[
            ("NEO4J_PASSWORD", "secret"),
            ("EMBEDDING_DIM", "not-a-number"),
        ]))
        .unwrap_err();
        match err {
            WorkflowError::Configuration(msg) => assert!(msg.contains("EMBEDDING_DIM")),
            e => panic!("expected Configuration error, got {e:?}"),
        }
    }

    #[test]
    fn test_config_zero_embedding_dim() {
        let result = WorkflowConfig::from_lookup(lookup(&[
            ("NEO4J_PASSWORD", "secret"),
            ("EMBEDDING_DIM", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_unknown_provider() {
        let err = WorkflowConfig::from_lookup(lookup(&[
            ("NEO4J_PASSWORD", "secret"),
            ("LLM_PROVIDER", "anthropic"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn check_rejects_empty_uri() {
        let mut config = valid();
        config.graph.uri.clear();
        let err = config.check().unwrap_err();
        assert!(matches!(err, WorkflowError::Configuration(_)));
    }

    #[test]
    fn check_rejects_whitespace_only_credentials() {
        let mut config = valid();
        config.graph.password = "   ".to_string();
        match config.check().unwrap_err() {
            WorkflowError::Configuration(msg) => assert!(msg.contains("graph.password")),
            e => panic!("expected Configuration error, got {e:?}"),
        }

        let mut config = valid();
        config.graph.uri = "\t".to_string();
        assert!(matches!(config.check(), Err(WorkflowError::Configuration(_))));

        let mut config = valid();
        config.completion.api_key = " ".to_string();
        assert!(config.check().is_err());
    }

    #[test]
    fn check_rejects_missing_openai_key() {
        let mut config = valid();
        config.completion.api_key.clear();
        assert!(config.check().is_err());

        config.completion.provider = ProviderKind::Ollama;
        assert!(config.check().is_ok());
    }

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" ollama ".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert_eq!(ProviderKind::Ollama.to_string(), "ollama");
    }
}
