//! Learning System
//!
//! Aggregates past decision outcomes into strategy recommendations.
//!
//! A recommendation is derived on demand from recorded samples and never
//! stored. Samples count as evidence when their context is similar enough to
//! the query; each is weighted by `0.5^(age / half_life)`. Approaches are
//! ranked by the Wilson lower bound of their weighted success rate, and the
//! confidence is `n / (n + prior_strength)` over the total weight `n`, so it
//! grows with matching samples and shrinks as they age.
//!
//! Only approaches whose weighted success rate beats 0.5 are candidates. When
//! none does, the recommendation is neutral and callers use their own policy,
//! so an agent is never steered back into an approach that keeps failing.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::LearningConfig;
use crate::memory::{cosine_similarity, DecisionContext};

/// z-score for the Wilson interval (95%)
const WILSON_Z: f32 = 1.96;
/// Weighted success rate an approach must exceed to be recommended
const MIN_RECOMMENDED_RATE: f32 = 0.5;

/// How an agent chose to tackle a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    Aggressive,
    Conservative,
    Innovative,
    Collaborative,
    #[default]
    Balanced,
}

impl Approach {
    pub const ALL: [Approach; 5] = [
        Approach::Aggressive,
        Approach::Conservative,
        Approach::Innovative,
        Approach::Collaborative,
        Approach::Balanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Approach::Aggressive => "aggressive",
            Approach::Conservative => "conservative",
            Approach::Innovative => "innovative",
            Approach::Collaborative => "collaborative",
            Approach::Balanced => "balanced",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Approach::Aggressive => &["aggressive", "aggressively", "fast", "immediate", "urgent"],
            Approach::Conservative => &["conservative", "careful", "gradual", "safe"],
            Approach::Innovative => &["innovative", "creative", "new", "experimental"],
            Approach::Collaborative => &[
                "collaborate",
                "collaborative",
                "collaboration",
                "team",
                "consensus",
                "together",
            ],
            Approach::Balanced => &[],
        }
    }

    /// Classifies free text by the first approach whose keywords it contains.
    pub fn from_keywords(text: &str) -> Approach {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        Approach::ALL
            .into_iter()
            .find(|approach| approach.keywords().iter().any(|k| words.contains(k)))
            .unwrap_or(Approach::Balanced)
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded decision and whether it worked
#[derive(Debug, Clone, PartialEq)]
pub struct LearningSample {
    pub day: u64,
    pub context: DecisionContext,
    pub approach: Approach,
    pub success: bool,
}

/// Derived advice for a decision context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecommendation {
    pub context_signature: String,
    pub approach: Approach,
    /// 0 means no evidence; callers fall back to their default policy
    pub confidence: f32,
    pub success_rate: f32,
    pub sample_count: usize,
}

impl StrategyRecommendation {
    pub fn neutral(context_signature: impl Into<String>) -> Self {
        Self {
            context_signature: context_signature.into(),
            approach: Approach::Balanced,
            confidence: 0.0,
            success_rate: 0.0,
            sample_count: 0,
        }
    }

    pub fn has_evidence(&self) -> bool {
        self.confidence > 0.0
    }
}

/// Lower bound of the Wilson score interval for `successes` out of `n` trials.
/// Both may be fractional when samples are weighted.
pub fn wilson_lower_bound(successes: f32, n: f32) -> f32 {
    if n <= 0.0 {
        return 0.0;
    }
    let p = successes / n;
    let z2 = WILSON_Z * WILSON_Z;
    let center = p + z2 / (2.0 * n);
    let margin = WILSON_Z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
    ((center - margin) / (1.0 + z2 / n)).max(0.0)
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    successes: f32,
    weight: f32,
}

/// Per-agent decision history and its tuning
#[derive(Resource, Debug)]
pub struct LearningSystem {
    samples: BTreeMap<String, Vec<LearningSample>>,
    similarity_threshold: f32,
    half_life_days: f32,
    prior_strength: f32,
}

impl LearningSystem {
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            samples: BTreeMap::new(),
            similarity_threshold: config.similarity_threshold,
            half_life_days: config.staleness_half_life_days,
            prior_strength: config.prior_strength,
        }
    }

    /// Records the outcome of a decision.
    pub fn record(&mut self, agent_id: &str, sample: LearningSample) {
        self.samples.entry(agent_id.to_string()).or_default().push(sample);
    }

    pub fn sample_count(&self, agent_id: &str) -> usize {
        self.samples.get(agent_id).map_or(0, Vec::len)
    }

    /// Recommends an approach for `context` as of `day`.
    pub fn recommend(&self, agent_id: &str, context: &DecisionContext, day: u64) -> StrategyRecommendation {
        let Some(history) = self.samples.get(agent_id) else {
            return StrategyRecommendation::neutral(&context.signature);
        };

        let mut tallies: BTreeMap<Approach, Tally> = BTreeMap::new();
        let mut matching = 0usize;
        let mut total_weight = 0.0f32;

        for sample in history {
            if cosine_similarity(&context.embedding, &sample.context.embedding) < self.similarity_threshold {
                continue;
            }
            let age = day.saturating_sub(sample.day) as f32;
            let weight = 0.5f32.powf(age / self.half_life_days);

            let tally = tallies.entry(sample.approach).or_default();
            tally.weight += weight;
            if sample.success {
                tally.successes += weight;
            }
            matching += 1;
            total_weight += weight;
        }

        if matching == 0 || total_weight <= 0.0 {
            return StrategyRecommendation::neutral(&context.signature);
        }

        // BTreeMap iteration follows Approach order, so ties keep the earlier approach.
        // Approaches that have not beaten a coin flip are never recommended.
        let mut best: Option<(Approach, Tally, f32)> = None;
        for (approach, tally) in &tallies {
            if tally.successes / tally.weight <= MIN_RECOMMENDED_RATE {
                continue;
            }
            let score = wilson_lower_bound(tally.successes, tally.weight);
            if best.map_or(true, |(_, _, best_score)| score > best_score) {
                best = Some((*approach, *tally, score));
            }
        }

        let Some((approach, tally, _)) = best else {
            return StrategyRecommendation::neutral(&context.signature);
        };

        StrategyRecommendation {
            context_signature: context.signature.clone(),
            approach,
            confidence: total_weight / (total_weight + self.prior_strength),
            success_rate: tally.successes / tally.weight,
            sample_count: matching,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use org_events::EconomicRegime;

    fn context(task_type: &str, domain: &str) -> DecisionContext {
        DecisionContext::for_task(task_type, domain, EconomicRegime::Growth, 0.5, 0.5)
    }

    fn sample(day: u64, approach: Approach, success: bool) -> LearningSample {
        LearningSample {
            day,
            context: context("pipeline_review", "sales"),
            approach,
            success,
        }
    }

    #[test]
    fn test_no_history_is_neutral() {
        let learning = LearningSystem::new(&LearningConfig::default());
        let rec = learning.recommend("sales", &context("pipeline_review", "sales"), 5);

        assert_eq!(rec.approach, Approach::Balanced);
        assert_eq!(rec.confidence, 0.0);
        assert_eq!(rec.sample_count, 0);
        assert!(!rec.has_evidence());
    }

    #[test]
    fn test_dissimilar_history_is_neutral() {
        let mut learning = LearningSystem::new(&LearningConfig::default());
        learning.record("sales", sample(1, Approach::Aggressive, true));

        let rec = learning.recommend("sales", &context("legal_review", "legal"), 2);
        assert_eq!(rec.confidence, 0.0);
    }

    #[test]
    fn test_recommends_more_successful_approach() {
        let mut learning = LearningSystem::new(&LearningConfig::default());
        for _ in 0..6 {
            learning.record("sales", sample(3, Approach::Aggressive, true));
            learning.record("sales", sample(3, Approach::Conservative, false));
        }

        let rec = learning.recommend("sales", &context("pipeline_review", "sales"), 3);
        assert_eq!(rec.approach, Approach::Aggressive);
        assert_eq!(rec.sample_count, 12);
        assert!((rec.success_rate - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_failing_approach_not_recommended() {
        let mut learning = LearningSystem::new(&LearningConfig::default());
        for day in 1..=6 {
            learning.record("sales", sample(day, Approach::Aggressive, false));
        }

        let rec = learning.recommend("sales", &context("pipeline_review", "sales"), 7);
        assert_ne!(rec.approach, Approach::Aggressive);
        assert!(!rec.has_evidence());
    }

    #[test]
    fn test_success_beats_repeated_failure() {
        let mut learning = LearningSystem::new(&LearningConfig::default());
        for _ in 0..6 {
            learning.record("sales", sample(4, Approach::Aggressive, false));
        }
        learning.record("sales", sample(4, Approach::Collaborative, true));

        let rec = learning.recommend("sales", &context("pipeline_review", "sales"), 4);
        assert_eq!(rec.approach, Approach::Collaborative);
        assert!(rec.has_evidence());
        assert_eq!(rec.sample_count, 7);
    }

    #[test]
    fn test_confidence_grows_with_samples() {
        let mut learning = LearningSystem::new(&LearningConfig::default());
        let query = context("pipeline_review", "sales");
        let mut previous = 0.0;

        for count in 1..=20 {
            learning.record("sales", sample(10, Approach::Balanced, count % 3 != 0));
            let rec = learning.recommend("sales", &query, 10);
            assert!(rec.confidence >= previous);
            assert!(rec.confidence < 1.0);
            previous = rec.confidence;
        }
    }

    #[test]
    fn test_confidence_decays_with_staleness() {
        let mut learning = LearningSystem::new(&LearningConfig::default());
        for _ in 0..5 {
            learning.record("sales", sample(1, Approach::Innovative, true));
        }
        let query = context("pipeline_review", "sales");

        let fresh = learning.recommend("sales", &query, 1);
        let stale = learning.recommend("sales", &query, 60);
        assert!(fresh.confidence > stale.confidence);
        assert_eq!(fresh.approach, stale.approach);
    }

    #[test]
    fn test_wilson_bound_prefers_more_evidence() {
        assert!(wilson_lower_bound(20.0, 20.0) > wilson_lower_bound(2.0, 2.0));
        assert_eq!(wilson_lower_bound(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_keyword_extraction() {
        assert_eq!(Approach::from_keywords("Move fast and ship"), Approach::Aggressive);
        assert_eq!(Approach::from_keywords("A careful, gradual rollout"), Approach::Conservative);
        assert_eq!(Approach::from_keywords("Try an experimental pilot"), Approach::Innovative);
        assert_eq!(Approach::from_keywords("Build consensus with the team"), Approach::Collaborative);
        assert_eq!(Approach::from_keywords("Review the renewal numbers"), Approach::Balanced);
    }
}
