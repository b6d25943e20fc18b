//! Static episode and question sets for the bundled runs.

use crate::utils::normalize_whitespace;
use crate::workflow::{Episode, Question};

/// Results requested per fixture question.
pub const QUESTION_LIMIT: usize = 3;

const REPOSITORY_EPISODES: &[(&str, &str, &str)] = &[
    (
        "Graphiti Architecture Overview",
        "Core architecture and design patterns",
        "Graphiti is a Python framework for building temporally-aware knowledge graphs for AI agents.
        The main entry point is the Graphiti class in graphiti_core/graphiti.py.
        It uses a bi-temporal data model tracking both event occurrence and ingestion times.
        The architecture follows modular design with driver pattern for databases (Neo4j, FalkorDB),
        client pattern for LLM providers (OpenAI, Anthropic, Gemini, Groq, Ollama),
        and episode-based ingestion where data is added as episodes containing facts.",
    ),
    (
        "Graphiti Search Capabilities",
        "Search features and capabilities",
        "Graphiti provides hybrid search combining semantic embeddings, BM25 keyword search,
        and graph traversal. Search methods include cosine similarity, BM25, and breadth-first search.
        Multiple rerankers are available: RRF (reciprocal rank fusion), node distance,
        episode mentions, MMR (maximal marginal relevance), and cross-encoder.
        Pre-configured search recipes are provided for common patterns.",
    ),
    (
        "Graphiti Configuration and Setup",
        "Configuration and environment setup",
        "Graphiti requires OPENAI_API_KEY environment variable. For Ollama integration,
        set OPENAI_BASE_URL to http://localhost:11434/v1 with dummy API key.
        Performance tuning includes SEMAPHORE_LIMIT (default 10) for LLM concurrency.
        Database configuration supports custom Neo4j database names via driver parameter.
        Multiple LLM providers supported: OpenAI, Anthropic, Gemini, Groq, Azure OpenAI, Ollama.",
    ),
    (
        "Graphiti Development Workflow",
        "Development practices and workflow",
        "Development uses uv for dependency management with commands: make install, make format,
        make lint, make test, make check. Code standards include Ruff formatting with 100 char lines,
        single quotes, and Pyright type checking. Testing separates unit tests from integration tests
        marked with _int suffix. Use pytest -n auto for parallel test execution.",
    ),
    (
        "Graphiti MCP Server Integration",
        "MCP server for AI assistants",
        "The MCP (Model Context Protocol) server in mcp_server/ provides AI assistant integration.
        It supports SSE transport for real-time communication, Docker deployment with Neo4j,
        and memory patterns based on preferences, procedures, and facts.
        Configuration via docker-compose.yml with environment variables for Ollama integration.",
    ),
    (
        "Graphiti Performance Optimization",
        "Performance tuning and optimization",
        "Performance optimization strategies include: increasing SEMAPHORE_LIMIT for higher throughput,
        using Neo4j Enterprise parallel runtime for large datasets, selecting LLM providers with
        structured output support (OpenAI, Gemini), choosing appropriate search rerankers
        (cross-encoder for accuracy, RRF for speed), and leveraging bi-temporal indexing for queries.",
    ),
];

const REPOSITORY_QUESTIONS: &[&str] = &[
    "How does Graphiti handle search?",
    "What LLM providers are supported?",
    "How to configure Ollama?",
    "What are the development commands?",
];

const OVERVIEW_BODY: &str = "Graphiti is a Python framework for temporally-aware knowledge graphs.
    Main features: bi-temporal data model, episode-based ingestion, hybrid search.
    Supports Neo4j and FalkorDB. LLM providers: OpenAI, Anthropic, Gemini, Groq, Ollama.
    For Ollama: set OPENAI_BASE_URL=http://localhost:11434/v1 with dummy API key.
    Key files: graphiti_core/graphiti.py (main class), mcp_server/ (AI assistant integration).
    Search methods: cosine similarity, BM25, graph traversal. Rerankers: RRF, cross-encoder.
    Development: make install, make format, make lint, make test. Uses uv, ruff, pyright.
    Performance: increase SEMAPHORE_LIMIT for concurrency, use structured output LLMs.";

/// The six repository-insight episodes, in submission order.
pub fn repository_episodes() -> Vec<Episode> {
    REPOSITORY_EPISODES
        .iter()
        .map(|(name, description, body)| {
            Episode::new(*name, normalize_whitespace(body), *description)
        })
        .collect()
}

pub fn repository_questions() -> Vec<Question> {
    REPOSITORY_QUESTIONS
        .iter()
        .map(|text| Question::new(*text, QUESTION_LIMIT))
        .collect()
}

/// The single overview episode of the quick run.
pub fn overview_episodes() -> Vec<Episode> {
    vec![Episode::new(
        "Graphiti Framework Overview",
        normalize_whitespace(OVERVIEW_BODY),
        "Repository documentation summary",
    )]
}

pub fn overview_questions() -> Vec<Question> {
    vec![Question::new("How to use Ollama with Graphiti?", QUESTION_LIMIT)]
}

/// Extraction smoke test used by the provider probe.
pub fn probe_episode() -> Episode {
    Episode::new(
        "OpenAI-Ollama Test",
        "Tesla is an electric vehicle company founded by Elon Musk. \
         They manufacture cars like Model 3 and Model Y.",
        "OpenAI-compatible API test",
    )
}
