//! The four runs the binary offers.

use std::io::{self, Write};

use anyhow::{bail, Context};
use graphiti_workflow::diagnostics::{
    probe_completion, probe_completion_config, probe_embedding, render_summary,
};
use graphiti_workflow::driver::neo4j::Neo4jDriver;
use graphiti_workflow::driver::GraphDriver;
use graphiti_workflow::embedder::EmbedderBackend;
use graphiti_workflow::llm_client::LlmBackend;
use graphiti_workflow::workflow::report::{render_ingest_item, render_query_item};
use graphiti_workflow::{
    fixtures, Episode, GraphStore, GraphitiClient, Question, Session, WorkflowConfig,
};
use tracing::{info, warn};

/// What one indexing run submits and prints.
struct Batch<'a> {
    /// Printed once the store is ready.
    intro: Option<String>,
    episodes: Vec<Episode>,
    questions: Vec<Question>,
    search_banner: &'a str,
}

/// Index the repository-insight episodes, then run the test queries.
pub async fn index(config: WorkflowConfig) -> anyhow::Result<()> {
    let mut out = io::stdout();
    writeln!(out, "🚀 Indexing Graphiti Repository Insights")?;
    writeln!(out, "{}", "=".repeat(50))?;

    let session = open_session(config).await?;
    let batch = Batch {
        intro: Some(format!("✅ Graphiti initialized with {}", session.store().llm().provider())),
        episodes: fixtures::repository_episodes(),
        questions: fixtures::repository_questions(),
        search_banner: "\n🔍 Testing search functionality...",
    };
    run_and_close(session, batch, &mut out).await?;

    writeln!(out, "\n✅ Repository indexing complete!")?;
    writeln!(out, "📊 Knowledge graph now contains Graphiti insights")?;
    Ok(())
}

/// Index one overview episode and run one query.
pub async fn quick(config: WorkflowConfig) -> anyhow::Result<()> {
    let mut out = io::stdout();
    writeln!(out, "🚀 Quick Indexing Graphiti Facts")?;
    writeln!(out, "{}", "=".repeat(40))?;

    let session = open_session(config).await?;
    let batch = Batch {
        intro: None,
        episodes: fixtures::overview_episodes(),
        questions: fixtures::overview_questions(),
        search_banner: "\n🔍 Testing search...",
    };
    run_and_close(session, batch, &mut out).await?;

    writeln!(out, "\n✅ Indexing complete!")?;
    Ok(())
}

/// Exercise the completion and embedding endpoints directly, then one extraction.
pub async fn probe(config: WorkflowConfig) -> anyhow::Result<()> {
    let mut out = io::stdout();
    writeln!(out, "🧪 Testing Ollama via OpenAI-Compatible API")?;
    writeln!(out, "{}", "=".repeat(50))?;

    let llm = LlmBackend::from_config(&probe_completion_config(&config.completion))?;
    writeln!(out, "✅ {} client configured at {}", llm.provider(), config.completion.base_url)?;
    let embedder = EmbedderBackend::from_config(&config.embedding)?;
    writeln!(out, "✅ {} embedder configured at {}", embedder.provider(), config.embedding.base_url)?;

    writeln!(out, "\n🔍 Testing LLM functionality...")?;
    let reply = probe_completion(&llm).await.context("completion probe failed")?;
    writeln!(out, "📝 LLM Response: {reply}")?;

    writeln!(out, "\n🔍 Testing embedding functionality...")?;
    let dim = probe_embedding(&embedder).await.context("embedding probe failed")?;
    writeln!(out, "📊 Embedding dimension: {dim}")?;

    writeln!(out, "\n🔍 Testing Graphiti with the configured clients...")?;
    let session = open_session(config).await?;
    let outcomes = session.ingest(vec![fixtures::probe_episode()]).await;
    session.close().await?;
    writeln!(out, "✅ Graphiti initialized")?;

    writeln!(out, "\n🔍 Testing entity extraction...")?;
    match outcomes.into_iter().next().map(|o| o.result) {
        Some(Ok(())) => {
            writeln!(out, "✅ Entity extraction completed successfully!")?;
            writeln!(out, "🎯 OpenAI-compatible Ollama integration is working!")?;
            Ok(())
        }
        Some(Err(e)) => {
            writeln!(out, "❌ Test failed: {}", e.reason())?;
            Err(e.into())
        }
        None => bail!("extraction produced no outcome"),
    }
}

/// Print what the database holds.
pub async fn check_db(config: WorkflowConfig) -> anyhow::Result<()> {
    let driver = Neo4jDriver::connect(&config.graph).await?;
    let summary = driver.summary().await;
    driver.close().await?;
    let summary = summary.context("database inspection failed")?;

    let mut out = io::stdout();
    render_summary(&summary, &mut out)?;
    writeln!(out, "\n✅ Database check complete")?;
    Ok(())
}

/// Configure and prepare a session; a session that fails to prepare is closed.
async fn open_session(config: WorkflowConfig) -> anyhow::Result<Session<GraphitiClient>> {
    let session = Session::configure(config).await?;
    if let Err(e) = session.prepare().await {
        if let Err(close) = session.close().await {
            warn!(error = %close, "closing after failed prepare");
        }
        return Err(anyhow::Error::new(e).context("graph store is unreachable"));
    }
    Ok(session)
}

/// Run `batch`, then close `session` whether or not the run succeeded.
async fn run_and_close<S: GraphStore>(
    session: Session<S>,
    batch: Batch<'_>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let ran = run(&session, batch, out).await;
    session.close().await?;
    ran
}

/// Ingest, then query, printing each outcome as it settles.
async fn run<S: GraphStore>(
    session: &Session<S>,
    batch: Batch<'_>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if let Some(intro) = &batch.intro {
        writeln!(out, "{intro}")?;
    }

    let mut printed = Ok(());
    let ingested = session
        .ingest_with(batch.episodes, |position, total, outcome| {
            if printed.is_ok() {
                printed = render_ingest_item(position, total, outcome, &mut *out);
            }
        })
        .await;
    printed?;

    writeln!(out, "{}", batch.search_banner)?;
    let mut printed = Ok(());
    let answered = session
        .query_with(&batch.questions, |outcome| {
            if printed.is_ok() {
                printed = render_query_item(outcome, &mut *out);
            }
        })
        .await;
    printed?;

    info!(
        indexed = ingested.iter().filter(|o| o.is_success()).count(),
        episodes = ingested.len(),
        answered = answered.iter().filter(|o| o.is_success()).count(),
        questions = answered.len(),
        "run finished"
    );
    Ok(())
}
