//! Session lifecycle: configure → prepare → (ingest | query)* → close.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use tracing::{error, info, instrument, warn};

use crate::config::WorkflowConfig;
use crate::errors::{Result, WorkflowError};
use crate::graph::{GraphStore, GraphitiClient};

use super::{Episode, IngestOutcome, Question, QueryOutcome};

/// Retries granted to a store call that failed with a connectivity fault.
const CONNECTIVITY_RETRIES: u32 = 1;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A configured, read-only handle on one graph store.
pub struct Session<S> {
    store: S,
    config: WorkflowConfig,
    retry_delay: Duration,
}

impl Session<GraphitiClient> {
    /// Validate `config` and build the production graph client.
    ///
    /// Builds handles only; nothing is sent to any service until
    /// [`prepare`](Session::prepare).
    pub async fn configure(config: WorkflowConfig) -> Result<Self> {
        Self::configure_with(config, |config| async move {
            GraphitiClient::connect(&config).await
        })
        .await
    }
}

impl<S: GraphStore> Session<S> {
    /// Validate `config`, then build the store with `factory`.
    ///
    /// An invalid configuration fails with [`WorkflowError::Configuration`]
    /// before `factory` is invoked.
    pub async fn configure_with<F, Fut>(config: WorkflowConfig, factory: F) -> Result<Self>
    where
        F: FnOnce(WorkflowConfig) -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        config.check()?;
        let store = factory(config.clone()).await?;
        info!(uri = %config.graph.uri, group_id = %config.group_id, "session configured");
        Ok(Self {
            store,
            config,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Wait this long before retrying a call that hit a connectivity fault.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// First contact with the store. Any failure is fatal to the run.
    ///
    /// Not retried here: the driver already retries refused connections.
    pub async fn prepare(&self) -> Result<()> {
        self.guarded("prepare", 0, || self.store.prepare())
            .await
            .map_err(|e| {
                error!(error = %e, "graph store is not usable");
                e
            })
    }

    /// Submit `episodes` one at a time, in order.
    ///
    /// Returns one outcome per episode in input order. A failing episode never
    /// stops the batch. A name already seen in this batch fails without
    /// reaching the store.
    pub async fn ingest(&self, episodes: Vec<Episode>) -> Vec<IngestOutcome> {
        self.ingest_with(episodes, |_, _, _| {}).await
    }

    /// [`ingest`](Self::ingest), calling `on_outcome(position, total, outcome)`
    /// as soon as each episode settles. `position` starts at 1.
    #[instrument(skip_all, fields(count = episodes.len()))]
    pub async fn ingest_with<F>(
        &self,
        episodes: Vec<Episode>,
        mut on_outcome: F,
    ) -> Vec<IngestOutcome>
    where
        F: FnMut(usize, usize, &IngestOutcome),
    {
        let total = episodes.len();
        let mut seen: HashSet<String> = HashSet::with_capacity(total);
        let mut outcomes = Vec::with_capacity(total);

        for (index, episode) in episodes.into_iter().enumerate() {
            let name = episode.name.clone();
            let result = if seen.insert(name.clone()) {
                self.guarded("add_episode", CONNECTIVITY_RETRIES, || {
                    self.store.add_episode(&episode)
                })
                .await
            } else {
                Err(WorkflowError::DuplicateEpisode(name.clone()))
            };

            match &result {
                Ok(()) => info!(episode = %name, position = index + 1, total, "episode indexed"),
                Err(e) => {
                    warn!(episode = %name, position = index + 1, total, error = %e, "episode failed")
                }
            }
            let outcome = IngestOutcome {
                result: result.map_err(|e| WorkflowError::ingest(name.as_str(), e)),
                name,
            };
            on_outcome(index + 1, total, &outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Run `questions` one at a time, in order.
    ///
    /// Each limit is forwarded to the store unchanged; the returned list is
    /// whatever the store produced.
    pub async fn query(&self, questions: &[Question]) -> Vec<QueryOutcome> {
        self.query_with(questions, |_| {}).await
    }

    /// [`query`](Self::query), calling `on_outcome` as soon as each question settles.
    #[instrument(skip_all, fields(count = questions.len()))]
    pub async fn query_with<F>(
        &self,
        questions: &[Question],
        mut on_outcome: F,
    ) -> Vec<QueryOutcome>
    where
        F: FnMut(&QueryOutcome),
    {
        let mut outcomes = Vec::with_capacity(questions.len());
        for question in questions {
            let result = self
                .guarded("search", CONNECTIVITY_RETRIES, || {
                    self.store.search(&question.text, question.limit)
                })
                .await;

            match &result {
                Ok(hits) => info!(
                    query = %question.text,
                    limit = question.limit,
                    hits = hits.len(),
                    "search complete"
                ),
                Err(e) => warn!(query = %question.text, error = %e, "search failed"),
            }
            let outcome = QueryOutcome {
                query: question.text.clone(),
                limit: question.limit,
                result: result.map_err(|e| WorkflowError::query(question.text.as_str(), e)),
            };
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Release the store's connections.
    pub async fn close(self) -> Result<()> {
        self.store.close().await?;
        info!("session closed");
        Ok(())
    }

    /// Run one store call under the per-call timeout, retrying a
    /// connectivity fault up to `retries` times.
    async fn guarded<T, F, Fut>(&self, op: &'static str, retries: u32, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let limit = self.config.call_timeout();
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_delay)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0u32;
        backoff::future::retry(policy, || {
            attempt += 1;
            let this_attempt = attempt;
            let pending = call();
            async move {
                let result = match tokio::time::timeout(limit, pending).await {
                    Ok(result) => result,
                    Err(_) => Err(WorkflowError::Timeout(limit)),
                };
                result.map_err(|e| {
                    if e.is_connectivity() && this_attempt <= retries {
                        warn!(op, attempt = this_attempt, error = %e, "connectivity fault, retrying");
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }
}
