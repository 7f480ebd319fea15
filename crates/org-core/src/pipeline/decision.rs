//! Decision Rules
//!
//! Pure functions behind the pipeline: task acceptance, approach selection,
//! success probability, and turning a draw into a task outcome.

use crate::components::agent::{DynamicState, Personality, TaskDomain};
use crate::error::CapacityError;
use crate::learning::{Approach, StrategyRecommendation};
use crate::personality::{decision_bias, OutcomeSignal};
use crate::tasks::{RejectReason, TaskOutcome};
use crate::pipeline::textgen::GenerationResponse;
use org_events::EconomicRegime;

/// Workload at or above which a low propensity counts as overload rather than caution
const OVERLOAD_WORKLOAD: f32 = 0.8;
const MIN_SUCCESS: f32 = 0.05;
const MAX_SUCCESS: f32 = 0.95;

/// Result of offering a task to an agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Acceptance {
    Accept { propensity: f32 },
    Reject { reason: RejectReason, propensity: f32 },
}

/// Fails when taking on `load` would push the agent past full capacity.
pub fn check_capacity(agent_id: &str, state: &DynamicState, load: f32) -> Result<(), CapacityError> {
    if state.workload + load > 1.0 {
        Err(CapacityError {
            agent_id: agent_id.to_string(),
            workload: state.workload,
            load,
        })
    } else {
        Ok(())
    }
}

/// Decides whether the agent takes the task.
pub fn evaluate_acceptance(
    agent_id: &str,
    personality: &Personality,
    state: &DynamicState,
    difficulty: f32,
    load: f32,
    threshold: f32,
) -> Acceptance {
    let propensity = decision_bias(personality, state, difficulty);

    if let Err(err) = check_capacity(agent_id, state, load) {
        tracing::debug!(%err, "capacity exceeded");
        return Acceptance::Reject {
            reason: RejectReason::Overloaded,
            propensity,
        };
    }

    if propensity < threshold {
        let reason = if state.workload >= OVERLOAD_WORKLOAD {
            RejectReason::Overloaded
        } else {
            RejectReason::RiskAverse
        };
        return Acceptance::Reject { reason, propensity };
    }

    Acceptance::Accept { propensity }
}

/// Approach carried by a response: its structured field, else its keywords.
pub fn response_approach(response: &GenerationResponse) -> Approach {
    response
        .approach
        .unwrap_or_else(|| Approach::from_keywords(&response.text))
}

fn regime_modifier(regime: EconomicRegime) -> f32 {
    match regime {
        EconomicRegime::Boom => 0.05,
        EconomicRegime::Recession => -0.05,
        EconomicRegime::Stagnation => -0.02,
        EconomicRegime::Growth | EconomicRegime::Recovery => 0.0,
    }
}

/// Inputs to the success probability of an accepted task
#[derive(Debug, Clone, Copy)]
pub struct SuccessFactors<'a> {
    pub personality: &'a Personality,
    pub state: &'a DynamicState,
    pub domain: TaskDomain,
    pub difficulty: f32,
    pub regime: EconomicRegime,
    pub recommendation: &'a StrategyRecommendation,
    pub followed_recommendation: bool,
    pub quality_hint: Option<f32>,
}

/// Probability in [0.05, 0.95] that an accepted task succeeds.
pub fn success_probability(factors: &SuccessFactors<'_>) -> f32 {
    let skill = factors.domain.key_trait(factors.personality);
    let mut p = 0.35 + 0.25 * factors.state.confidence + 0.2 * skill
        - 0.3 * factors.difficulty
        - 0.15 * factors.state.stress
        + regime_modifier(factors.regime);

    // Following advice helps in proportion to how good and how certain it is.
    if factors.followed_recommendation {
        let rec = factors.recommendation;
        p += 0.2 * rec.confidence * (rec.success_rate - 0.5);
    }
    if let Some(hint) = factors.quality_hint {
        p += 0.1 * (hint - 0.5);
    }

    p.clamp(MIN_SUCCESS, MAX_SUCCESS)
}

/// Outcome of an accepted task given its success probability and a uniform draw.
///
/// Draws below `probability` succeed; quality lands in (0.6, 1] for successes
/// and [0, 0.6) for failures, higher the closer the draw was to the other side.
pub fn resolve_outcome(probability: f32, draw: f32, importance: f32) -> (bool, TaskOutcome, OutcomeSignal) {
    let success = draw < probability;

    if success {
        let quality = 0.6 + 0.4 * ((probability - draw) / probability);
        let impact = (importance * quality).clamp(0.0, 1.0);
        let outcome = TaskOutcome {
            quality_score: quality.clamp(0.0, 1.0),
            realized_impact: impact,
            reward: impact,
        };
        (true, outcome, OutcomeSignal::Success { impact })
    } else {
        let quality = 0.6 * (1.0 - (draw - probability) / (1.0 - probability));
        let impact = (importance * (1.0 - quality)).clamp(0.0, 1.0);
        let outcome = TaskOutcome {
            quality_score: quality.clamp(0.0, 1.0),
            realized_impact: -impact,
            reward: -impact,
        };
        (false, outcome, OutcomeSignal::Failure { impact })
    }
}

/// First sentence of a response, trimmed for the snapshot.
pub fn summarize(text: &str) -> String {
    const MAX_CHARS: usize = 160;
    let trimmed = text.trim();
    let sentence = trimmed
        .split_inclusive(['.', '!', '?'])
        .next()
        .unwrap_or(trimmed)
        .trim();
    sentence.chars().take(MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> Personality {
        Personality {
            risk_tolerance: 0.9,
            ..Personality::default()
        }
    }

    #[test]
    fn test_bold_agent_accepts_hard_task_when_free() {
        let state = DynamicState {
            workload: 0.1,
            ..DynamicState::default()
        };
        let result = evaluate_acceptance("ceo", &bold(), &state, 0.95, 0.2, 0.35);
        assert!(matches!(result, Acceptance::Accept { .. }));
    }

    #[test]
    fn test_same_agent_rejects_when_loaded() {
        let state = DynamicState {
            workload: 0.95,
            ..DynamicState::default()
        };
        let result = evaluate_acceptance("ceo", &bold(), &state, 0.95, 0.2, 0.35);
        assert!(matches!(
            result,
            Acceptance::Reject {
                reason: RejectReason::Overloaded,
                ..
            }
        ));

        // Even a load that fits is refused for overload at that workload.
        let result = evaluate_acceptance("ceo", &bold(), &state, 0.95, 0.04, 0.35);
        assert!(matches!(
            result,
            Acceptance::Reject {
                reason: RejectReason::Overloaded,
                ..
            }
        ));
    }

    #[test]
    fn test_cautious_agent_rejects_as_risk_averse() {
        let cautious = Personality {
            risk_tolerance: 0.0,
            ..Personality::default()
        };
        let state = DynamicState {
            stress: 0.9,
            confidence: 0.1,
            workload: 0.2,
            mood: 0.0,
        };
        let result = evaluate_acceptance("cfo", &cautious, &state, 0.95, 0.1, 0.35);
        assert!(matches!(
            result,
            Acceptance::Reject {
                reason: RejectReason::RiskAverse,
                ..
            }
        ));
    }

    #[test]
    fn test_capacity_error() {
        let state = DynamicState {
            workload: 0.9,
            ..DynamicState::default()
        };
        let err = check_capacity("coo", &state, 0.2).unwrap_err();
        assert_eq!(err.agent_id, "coo");
        assert!(check_capacity("coo", &state, 0.1).is_ok());
    }

    #[test]
    fn test_success_probability_bounded() {
        let rec = StrategyRecommendation::neutral("x");
        let personality = Personality::default();
        let strong = DynamicState {
            confidence: 1.0,
            stress: 0.0,
            ..DynamicState::default()
        };
        let weak = DynamicState {
            confidence: 0.0,
            stress: 1.0,
            ..DynamicState::default()
        };

        let easy = success_probability(&SuccessFactors {
            personality: &personality,
            state: &strong,
            domain: TaskDomain::Finance,
            difficulty: 0.0,
            regime: EconomicRegime::Boom,
            recommendation: &rec,
            followed_recommendation: false,
            quality_hint: Some(1.0),
        });
        let hard = success_probability(&SuccessFactors {
            personality: &personality,
            state: &weak,
            domain: TaskDomain::Finance,
            difficulty: 1.0,
            regime: EconomicRegime::Recession,
            recommendation: &rec,
            followed_recommendation: false,
            quality_hint: Some(0.0),
        });

        assert!(easy <= MAX_SUCCESS && easy > 0.8);
        assert!(hard >= MIN_SUCCESS && hard < 0.2);
    }

    #[test]
    fn test_following_good_advice_helps() {
        let personality = Personality::default();
        let state = DynamicState::default();
        let rec = StrategyRecommendation {
            context_signature: "finance:financial_analysis:growth".to_string(),
            approach: Approach::Conservative,
            confidence: 0.8,
            success_rate: 0.9,
            sample_count: 10,
        };
        let base = SuccessFactors {
            personality: &personality,
            state: &state,
            domain: TaskDomain::Finance,
            difficulty: 0.5,
            regime: EconomicRegime::Growth,
            recommendation: &rec,
            followed_recommendation: false,
            quality_hint: None,
        };
        let followed = SuccessFactors {
            followed_recommendation: true,
            ..base
        };

        assert!(success_probability(&followed) > success_probability(&base));
    }

    #[test]
    fn test_resolve_outcome() {
        let (success, outcome, signal) = resolve_outcome(0.7, 0.1, 0.5);
        assert!(success);
        assert!(outcome.quality_score > 0.6);
        assert!(outcome.reward > 0.0);
        assert!(matches!(signal, OutcomeSignal::Success { .. }));

        let (success, outcome, signal) = resolve_outcome(0.7, 0.9, 0.5);
        assert!(!success);
        assert!(outcome.quality_score < 0.6);
        assert!(outcome.realized_impact < 0.0);
        assert!(matches!(signal, OutcomeSignal::Failure { .. }));
    }

    #[test]
    fn test_response_approach_fallback() {
        let mut response = GenerationResponse::text("Let's build consensus together.");
        assert_eq!(response_approach(&response), Approach::Collaborative);

        response.approach = Some(Approach::Aggressive);
        assert_eq!(response_approach(&response), Approach::Aggressive);
    }

    #[test]
    fn test_summarize_first_sentence() {
        assert_eq!(summarize("  Ship it. Then review.  "), "Ship it.");
        assert_eq!(summarize("no punctuation"), "no punctuation");
    }
}
