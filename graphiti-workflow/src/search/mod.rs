//! Search results and rank fusion.
//!
//! The graph client runs two searches per query, BM25 over edge facts and
//! cosine similarity over fact embeddings, and merges them with
//! [`rrf`] (reciprocal rank fusion).

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use crate::edges::EntityEdge;
use crate::nodes::EntityNode;

/// Rank constant for reciprocal rank fusion.
pub const RRF_K: f64 = 60.0;

/// Minimum cosine similarity for a vector hit to count.
pub const DEFAULT_MIN_SCORE: f64 = 0.6;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record")]
pub enum SearchHit {
    Edge(EntityEdge),
    Node(EntityNode),
}

impl SearchHit {
    /// Record kind as shown in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchHit::Edge(_) => "EntityEdge",
            SearchHit::Node(_) => "EntityNode",
        }
    }

    /// Human-readable text: the fact for edges, the name for nodes.
    pub fn label(&self) -> &str {
        match self {
            SearchHit::Edge(edge) => &edge.fact,
            SearchHit::Node(node) => &node.name,
        }
    }
}

/// Fuse ranked lists with reciprocal rank fusion.
///
/// Each item scores `Σ 1 / (RRF_K + rank)` over the lists it appears in
/// (rank starting at 1). Ties keep first-seen order.
pub fn rrf<T, K, F>(lists: Vec<Vec<T>>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut scores: HashMap<K, (f64, usize)> = HashMap::new();
    let mut items: Vec<T> = Vec::new();

    for list in lists {
        for (rank, item) in list.into_iter().enumerate() {
            let contribution = 1.0 / (RRF_K + rank as f64 + 1.0);
            let k = key(&item);
            match scores.get_mut(&k) {
                Some((score, _)) => *score += contribution,
                None => {
                    scores.insert(k, (contribution, items.len()));
                    items.push(item);
                }
            }
        }
    }

    let mut ranked: Vec<(f64, usize, T)> = items
        .into_iter()
        .map(|item| {
            let (score, seen) = scores.get(&key(&item)).copied().unwrap_or((0.0, usize::MAX));
            (score, seen, item)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked.into_iter().map(|(_, _, item)| item).collect()
}
