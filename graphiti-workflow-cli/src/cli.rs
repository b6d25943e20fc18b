use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "graphiti-workflow",
    version,
    about = "Index episodes into a Neo4j knowledge graph with a local LLM and query them back"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Log output format (logs go to stderr; RUST_LOG filters them)
    #[arg(long, value_enum, default_value_t, global = true)]
    pub log_format: LogFormat,

    /// Partition to write and search; overrides GROUP_ID
    #[arg(long, global = true)]
    pub group_id: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Index the six repository-insight episodes and run the test queries
    Index,
    /// Index a single overview episode and run one query
    Quick,
    /// Check the completion and embedding endpoints, then extract one episode
    Probe,
    /// Print node and relationship counts with sample entities and episodes
    CheckDb,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}
