mod cli;
mod commands;

use clap::Parser;
use graphiti_workflow::WorkflowConfig;
use tracing::{error, info};

use crate::cli::{Cli, Command, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ───────────────────────────────────────────────────────────────
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("graphiti_workflow=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
    }

    // ── Config ────────────────────────────────────────────────────────────────
    let mut config = WorkflowConfig::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;
    if let Some(group_id) = cli.group_id {
        config.group_id = group_id;
        config.check()?;
    }

    info!(
        uri = %config.graph.uri,
        llm = %config.completion.provider,
        model = %config.completion.model,
        embedder = %config.embedding.provider,
        group_id = %config.group_id,
        "configuration loaded"
    );

    // ── Run ───────────────────────────────────────────────────────────────────
    let outcome = match cli.cmd {
        Command::Index => commands::index(config).await,
        Command::Quick => commands::quick(config).await,
        Command::Probe => commands::probe(config).await,
        Command::CheckDb => commands::check_db(config).await,
    };

    if let Err(e) = &outcome {
        error!(error = %format!("{e:#}"), "run failed");
    }
    outcome
}
