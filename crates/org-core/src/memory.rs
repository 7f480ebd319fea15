//! Memory Store
//!
//! Append-only, per-agent log of past experiences with similarity search.
//!
//! Contexts are embedded with a hashed bag of words (FNV-1a into a fixed
//! number of buckets) followed by a few numeric features, which keeps the
//! embedding deterministic across runs and platforms.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::learning::Approach;
use org_events::EconomicRegime;

/// Hashed token buckets in a context embedding
const TOKEN_BUCKETS: usize = 32;
/// Trailing numeric features: difficulty, importance
const NUMERIC_FEATURES: usize = 2;
pub const EMBEDDING_DIM: usize = TOKEN_BUCKETS + NUMERIC_FEATURES;

/// A decision context: a readable signature plus its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    pub signature: String,
    pub embedding: Vec<f32>,
}

impl DecisionContext {
    /// Builds the context for a task offered in the given regime.
    pub fn for_task(
        task_type: &str,
        domain: &str,
        regime: EconomicRegime,
        difficulty: f32,
        importance: f32,
    ) -> Self {
        let signature = format!("{}:{}:{}", domain, task_type, regime);
        let mut embedding = vec![0.0; EMBEDDING_DIM];

        let regime_name = regime.to_string();
        let tokens = task_type
            .split('_')
            .chain(std::iter::once(domain))
            .chain(std::iter::once(regime_name.as_str()));
        for token in tokens.filter(|t| !t.is_empty()) {
            embedding[bucket(token)] += 1.0;
        }
        embedding[TOKEN_BUCKETS] = difficulty;
        embedding[TOKEN_BUCKETS + 1] = importance;

        Self { signature, embedding }
    }
}

fn bucket(token: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.to_lowercase().bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % TOKEN_BUCKETS as u64) as usize
}

/// Cosine similarity of two vectors, 0 when either has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// How an experience turned out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceOutcome {
    Completed,
    Failed,
    /// The text service failed; no decision was taken
    ServiceFailure,
}

/// Immutable record of one decision and its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub agent_id: String,
    pub day: u64,
    pub task_id: String,
    pub context: DecisionContext,
    pub decision: Option<Approach>,
    pub outcome: ExperienceOutcome,
    /// Reward signal in [-1, 1]
    pub reward: f32,
}

#[derive(Debug, Clone)]
struct StoredExperience {
    /// Store-wide insertion order, used for recency
    seq: u64,
    experience: Experience,
}

/// Per-agent append-only experience log
#[derive(Resource, Debug, Default)]
pub struct MemoryStore {
    logs: BTreeMap<String, Vec<StoredExperience>>,
    next_seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an experience to the agent's log.
    pub fn store(&mut self, agent_id: &str, experience: Experience) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.logs
            .entry(agent_id.to_string())
            .or_default()
            .push(StoredExperience { seq, experience });
    }

    /// The `k` experiences most similar to `query`, most similar first.
    /// Equal similarity goes to the more recent experience.
    pub fn search(&self, agent_id: &str, query: &DecisionContext, k: usize) -> Vec<&Experience> {
        let Some(log) = self.logs.get(agent_id) else {
            return Vec::new();
        };

        let mut scored: Vec<(f32, u64, &Experience)> = log
            .iter()
            .map(|stored| {
                let similarity = cosine_similarity(&query.embedding, &stored.experience.context.embedding);
                (similarity, stored.seq, &stored.experience)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
        scored.into_iter().take(k).map(|(_, _, e)| e).collect()
    }

    pub fn count(&self, agent_id: &str) -> usize {
        self.logs.get(agent_id).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.logs.values().map(Vec::len).sum()
    }

    /// All of an agent's experiences in insertion order.
    pub fn experiences<'a>(&'a self, agent_id: &str) -> impl Iterator<Item = &'a Experience> + 'a {
        self.logs
            .get(agent_id)
            .into_iter()
            .flat_map(|log| log.iter().map(|stored| &stored.experience))
    }
}
