//! Integration tests for the workflow runner, driven through a scripted
//! in-memory `GraphStore`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use graphiti_workflow::config::GraphConfig;
use graphiti_workflow::nodes::EntityNode;
use graphiti_workflow::workflow::report::{render_ingest, render_query};
use graphiti_workflow::{
    Episode, GraphStore, Question, Result, SearchHit, Session, WorkflowConfig, WorkflowError,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Scripted store
// ---------------------------------------------------------------------------

/// What the store does when asked for an episode or query.
#[derive(Clone)]
enum Script {
    Ok,
    Fail,
    Unreachable,
    UnreachableOnce,
    Hang,
}

#[derive(Default)]
struct ScriptedStore {
    episodes: HashMap<String, Script>,
    hits: HashMap<String, Vec<SearchHit>>,
    failing_queries: Vec<String>,
    prepare_fails: bool,
    prepare_calls: AtomicUsize,
    add_calls: AtomicUsize,
    /// Episode node ids written so far; a node is written before extraction can fail.
    persisted: Mutex<HashSet<Uuid>>,
    search_calls: AtomicUsize,
    close_calls: AtomicUsize,
    submitted: Mutex<Vec<String>>,
    limits: Mutex<Vec<usize>>,
}

impl ScriptedStore {
    fn with_episode(mut self, name: &str, script: Script) -> Self {
        self.episodes.insert(name.to_string(), script);
        self
    }

    fn with_hits(mut self, query: &str, labels: &[&str]) -> Self {
        let hits = labels
            .iter()
            .map(|l| SearchHit::Node(EntityNode::new(*l, "default")))
            .collect();
        self.hits.insert(query.to_string(), hits);
        self
    }

    fn with_failing_query(mut self, query: &str) -> Self {
        self.failing_queries.push(query.to_string());
        self
    }
}

impl GraphStore for ScriptedStore {
    async fn prepare(&self) -> Result<()> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if self.prepare_fails {
            return Err(WorkflowError::Connectivity("connection refused".into()));
        }
        Ok(())
    }

    async fn add_episode(&self, episode: &Episode) -> Result<()> {
        let call = self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(episode.name.clone());
        self.persisted.lock().unwrap().insert(episode.uuid);
        match self.episodes.get(&episode.name).cloned().unwrap_or(Script::Ok) {
            Script::Ok => Ok(()),
            Script::Fail => Err(WorkflowError::Extraction("no JSON in reply".into())),
            Script::Unreachable => Err(WorkflowError::Connectivity("connection refused".into())),
            Script::UnreachableOnce if call == 0 => {
                Err(WorkflowError::Connectivity("connection reset".into()))
            }
            Script::UnreachableOnce => Ok(()),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(())
            }
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.limits.lock().unwrap().push(limit);
        if self.failing_queries.iter().any(|q| q == query) {
            return Err(WorkflowError::Driver("fulltext index missing".into()));
        }
        Ok(self.hits.get(query).cloned().unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Forwards to a shared store so tests can inspect counters after the session is gone.
struct Shared(Arc<ScriptedStore>);

impl GraphStore for Shared {
    async fn prepare(&self) -> Result<()> {
        self.0.prepare().await
    }
    async fn add_episode(&self, episode: &Episode) -> Result<()> {
        self.0.add_episode(episode).await
    }
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.0.search(query, limit).await
    }
    async fn close(&self) -> Result<()> {
        self.0.close().await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config() -> WorkflowConfig {
    WorkflowConfig {
        graph: GraphConfig {
            password: "demodemo".to_string(),
            ..GraphConfig::default()
        },
        call_timeout_secs: 5,
        ..WorkflowConfig::default()
    }
}

async fn session(store: ScriptedStore) -> (Session<Shared>, Arc<ScriptedStore>) {
    let store = Arc::new(store);
    let handle = Arc::clone(&store);
    let session = Session::configure_with(config(), |_| async move { Ok(Shared(handle)) })
        .await
        .expect("valid config")
        .with_retry_delay(Duration::from_millis(1));
    (session, store)
}

fn episodes(names: &[&str]) -> Vec<Episode> {
    names.iter().map(|n| Episode::new(*n, "x", "test")).collect()
}

fn text<F>(f: F) -> String
where
    F: FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
{
    let mut buf = Vec::new();
    f(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

// ---------------------------------------------------------------------------
// configure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_configure_missing_credential_makes_no_calls() {
    let factory_calls = AtomicUsize::new(0);
    let mut config = config();
    config.graph.password.clear();

    let result = Session::configure_with(config, |_| async {
        factory_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedStore::default())
    })
    .await;

    assert!(matches!(result, Err(WorkflowError::Configuration(_))));
    assert_eq!(factory_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_configure_missing_endpoint_is_configuration_error() {
    let mut config = config();
    config.graph.uri.clear();
    let result =
        Session::configure_with(config, |_| async { Ok(ScriptedStore::default()) }).await;
    assert!(matches!(result, Err(WorkflowError::Configuration(_))));
}

#[tokio::test]
async fn test_prepare_failure_is_fatal() {
    let (session, _) = session(ScriptedStore {
        prepare_fails: true,
        ..ScriptedStore::default()
    })
    .await;
    let err = session.prepare().await.unwrap_err();
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_prepare_connectivity_fault_is_not_retried() {
    let (session, store) = session(ScriptedStore {
        prepare_fails: true,
        ..ScriptedStore::default()
    })
    .await;
    assert!(session.prepare().await.is_err());
    assert_eq!(store.prepare_calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_ingest_preserves_order_and_length() {
    let (session, store) = session(ScriptedStore::default()).await;
    let outcomes = session.ingest(episodes(&["A", "B", "C"])).await;

    let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["A", "B", "C"]);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(*store.submitted.lock().unwrap(), ["A", "B", "C"]);
}

#[tokio::test]
async fn test_first_episode_fault_does_not_stop_second() {
    let (session, store) = session(ScriptedStore::default().with_episode("A", Script::Fail)).await;
    let outcomes = session.ingest(episodes(&["A", "B"])).await;

    assert!(!outcomes[0].is_success());
    assert!(outcomes[1].is_success());
    assert_eq!(store.add_calls.load(Ordering::SeqCst), 2);
    match &outcomes[0].result {
        Err(WorkflowError::Ingest { episode, source }) => {
            assert_eq!(episode, "A");
            assert!(matches!(**source, WorkflowError::Extraction(_)));
        }
        other => panic!("expected ingest error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_middle_fault_in_larger_batch_is_isolated() {
    let (session, store) =
        session(ScriptedStore::default().with_episode("B", Script::Unreachable)).await;
    let outcomes = session.ingest(episodes(&["A", "B", "C", "D"])).await;

    let ok: Vec<bool> = outcomes.iter().map(|o| o.is_success()).collect();
    assert_eq!(ok, [true, false, true, true]);
    // B is retried once on its connectivity fault.
    assert_eq!(store.add_calls.load(Ordering::SeqCst), 5);
    assert!(outcomes[1].result.as_ref().unwrap_err().is_connectivity());
}

#[tokio::test]
async fn test_transient_connectivity_fault_is_retried_once() {
    let (session, store) =
        session(ScriptedStore::default().with_episode("A", Script::UnreachableOnce)).await;
    let outcomes = session.ingest(episodes(&["A"])).await;

    assert!(outcomes[0].is_success());
    assert_eq!(store.add_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retried_episode_writes_one_node() {
    let (session, store) =
        session(ScriptedStore::default().with_episode("A", Script::UnreachableOnce)).await;
    let batch = episodes(&["A", "B"]);
    let expected: HashSet<Uuid> = batch.iter().map(|e| e.uuid).collect();

    let outcomes = session.ingest(batch).await;

    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(store.add_calls.load(Ordering::SeqCst), 3);
    assert_eq!(*store.persisted.lock().unwrap(), expected);
}

#[tokio::test]
async fn test_outcomes_are_reported_as_each_episode_settles() {
    let (session, store) = session(ScriptedStore::default().with_episode("B", Script::Fail)).await;
    let mut seen = Vec::new();

    let outcomes = session
        .ingest_with(episodes(&["A", "B", "C"]), |position, total, outcome| {
            // Nothing after this episode has reached the store yet.
            let submitted = store.add_calls.load(Ordering::SeqCst);
            seen.push((position, total, outcome.name.clone(), outcome.is_success(), submitted));
        })
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        seen,
        [
            (1, 3, "A".to_string(), true, 1),
            (2, 3, "B".to_string(), false, 2),
            (3, 3, "C".to_string(), true, 3),
        ]
    );
}

#[tokio::test]
async fn test_non_connectivity_fault_is_not_retried() {
    let (session, store) = session(ScriptedStore::default().with_episode("A", Script::Fail)).await;
    session.ingest(episodes(&["A"])).await;
    assert_eq!(store.add_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_call_times_out() {
    let (session, store) = session(ScriptedStore::default().with_episode("A", Script::Hang)).await;
    let outcomes = session.ingest(episodes(&["A", "B"])).await;

    match &outcomes[0].result {
        Err(WorkflowError::Ingest { source, .. }) => {
            assert!(matches!(**source, WorkflowError::Timeout(d) if d == Duration::from_secs(5)));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(outcomes[1].is_success());
    assert_eq!(store.add_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_duplicate_name_fails_without_store_call() {
    let (session, store) = session(ScriptedStore::default()).await;
    let outcomes = session.ingest(episodes(&["A", "A", "B"])).await;

    let ok: Vec<bool> = outcomes.iter().map(|o| o.is_success()).collect();
    assert_eq!(ok, [true, false, true]);
    assert_eq!(store.add_calls.load(Ordering::SeqCst), 2);
    assert!(outcomes[1].result.as_ref().unwrap_err().reason().contains("already submitted"));
}

#[tokio::test]
async fn test_empty_inputs_yield_empty_outcomes() {
    let (session, store) = session(ScriptedStore::default()).await;
    assert!(session.ingest(Vec::new()).await.is_empty());
    assert!(session.query(&[]).await.is_empty());
    assert_eq!(store.add_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// query
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_limit_is_forwarded_unchanged() {
    let (session, store) = session(ScriptedStore::default()).await;
    session
        .query(&[Question::new("q1", 3), Question::new("q2", 7), Question::new("q3", 0)])
        .await;
    assert_eq!(*store.limits.lock().unwrap(), [3, 7, 0]);
}

#[tokio::test]
async fn test_query_fault_is_isolated() {
    let (session, _) = session(
        ScriptedStore::default()
            .with_failing_query("q1")
            .with_hits("q2", &["Neo4j"]),
    )
    .await;
    let outcomes = session
        .query(&[Question::new("q1", 3), Question::new("q2", 3)])
        .await;

    assert!(!outcomes[0].is_success());
    assert_eq!(outcomes[1].hit_count(), 1);
    assert_eq!(outcomes[0].query, "q1");
    assert_eq!(outcomes[1].limit, 3);
}

#[tokio::test]
async fn test_close_releases_store() {
    let (session, store) = session(ScriptedStore::default()).await;
    session.close().await.unwrap();
    assert_eq!(store.close_calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// report scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_report_lists_episodes_in_submission_order() {
    let (session, _) = session(ScriptedStore::default()).await;
    let outcomes = session
        .ingest(vec![Episode::new("A", "x", "test"), Episode::new("B", "y", "test")])
        .await;
    let report = text(|out| render_ingest(&outcomes, out));

    let a = report.find("1/2: A").expect("A reported");
    let b = report.find("2/2: B").expect("B reported");
    assert!(a < b);
    assert_eq!(report.matches("✅ Successfully indexed").count(), 2);
}

#[tokio::test]
async fn test_report_shows_failure_then_success() {
    let (session, _) = session(ScriptedStore::default().with_episode("A", Script::Fail)).await;
    let outcomes = session.ingest(episodes(&["A", "B"])).await;
    let report = text(|out| render_ingest(&outcomes, out));

    let failure = report.find("❌ Error: Extraction error").expect("failure reported");
    let success = report.find("✅ Successfully indexed").expect("success reported");
    assert!(failure < success);
}

#[tokio::test]
async fn test_report_zero_and_two_results() {
    let (session, _) =
        session(ScriptedStore::default().with_hits("q2", &["Graphiti", "Ollama"])).await;
    let outcomes = session
        .query(&[Question::new("q1", 3), Question::new("q2", 3)])
        .await;
    let report = text(|out| render_query(&outcomes, out));

    assert_eq!(
        report,
        "\n💭 Query: q1\n   Found 0 results\n\
         \n💭 Query: q2\n   Found 2 results\n   1. EntityNode: Graphiti\n   2. EntityNode: Ollama\n"
    );
}
