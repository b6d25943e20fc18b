//! Provider probes and database inspection for the diagnostic commands.

use std::io::{self, Write};

use tracing::info;

use crate::config::CompletionConfig;
use crate::driver::DatabaseSummary;
use crate::embedder::{EmbedderBackend, EmbedderClient};
use crate::errors::Result;
use crate::llm_client::{LlmBackend, LlmClient, Message};

pub const PROBE_PROMPT: &str = "Hello! Respond with just 'Hello from Ollama!'";
pub const PROBE_EMBEDDING_TEXT: &str = "Test embedding text";
const PROBE_MAX_TOKENS: u32 = 50;

/// Completion settings for the probe: the small model, deterministic, short.
pub fn probe_completion_config(config: &CompletionConfig) -> CompletionConfig {
    let model = if config.small_model.is_empty() {
        config.model.clone()
    } else {
        config.small_model.clone()
    };
    CompletionConfig {
        model,
        temperature: 0.0,
        max_tokens: PROBE_MAX_TOKENS,
        ..config.clone()
    }
}

/// Send one chat message and return the raw reply.
pub async fn probe_completion(llm: &LlmBackend) -> Result<String> {
    let reply = llm.generate(&[Message::user(PROBE_PROMPT)]).await?;
    info!(provider = %llm.provider(), chars = reply.len(), "completion probe answered");
    Ok(reply)
}

/// Embed a fixed text and return the vector length.
pub async fn probe_embedding(embedder: &EmbedderBackend) -> Result<usize> {
    let vector = embedder.embed(PROBE_EMBEDDING_TEXT).await?;
    info!(provider = %embedder.provider(), dim = vector.len(), "embedding probe answered");
    Ok(vector.len())
}

pub fn render_summary(summary: &DatabaseSummary, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "🗂️  Node counts by label:")?;
    for (labels, count) in &summary.node_counts {
        writeln!(out, "   {labels:?}: {count}")?;
    }

    writeln!(out, "\n🔗 Relationship counts by type:")?;
    for (rel_type, count) in &summary.relationship_counts {
        writeln!(out, "   {rel_type}: {count}")?;
    }

    writeln!(out, "\n📝 Sample entities:")?;
    for name in &summary.sample_entities {
        writeln!(out, "   - {name}")?;
    }

    writeln!(out, "\n📖 Sample episodes:")?;
    for (name, created) in &summary.sample_episodes {
        match created {
            Some(at) => writeln!(out, "   - {name} (created: {})", at.to_rfc3339())?,
            None => writeln!(out, "   - {name} (created: unknown)")?,
        }
    }
    Ok(())
}
