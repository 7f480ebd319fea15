//! Personality Model
//!
//! Pure update rules over an agent's trait vector and dynamic state. Systems
//! read the current components, call [`update`], validate the result, and
//! write it back; nothing here touches the ECS world.
//!
//! Every change is scaled by the remaining headroom of the value it moves
//! (`x + d * (1 - x)` upward, `x - d * x` downward), so repeated outcomes
//! saturate instead of stepping past the bounds.

use crate::components::agent::{DynamicState, ExperienceCounters, Personality};
use crate::error::StateInvariantError;

/// Confidence gained on success, per unit of learning rate and impact
const SUCCESS_CONFIDENCE_GAIN: f32 = 1.0;
/// Stress relieved on success
const SUCCESS_STRESS_RELIEF: f32 = 0.6;
/// Confidence lost on failure
const FAILURE_CONFIDENCE_LOSS: f32 = 0.8;
/// Stress added on failure
const FAILURE_STRESS_GAIN: f32 = 1.0;
/// Smoothing factor of the mood moving average
const MOOD_ALPHA: f32 = 0.3;
/// Gain applied to confidence/stress deltas before squashing into [-1, 1]
const MOOD_GAIN: f32 = 5.0;
/// Risk-tolerance drift per unit of learning rate and impact
const TRAIT_DRIFT: f32 = 0.1;
/// Success impact above which risk tolerance drifts upward
const HIGH_IMPACT: f32 = 0.6;

/// Outcome of a task as seen by the personality model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutcomeSignal {
    /// Impact magnitude in [0, 1]
    Success { impact: f32 },
    Failure { impact: f32 },
    /// No evidence either way, e.g. the text service failed
    Neutral,
}

impl OutcomeSignal {
    fn impact(self) -> f32 {
        match self {
            OutcomeSignal::Success { impact } | OutcomeSignal::Failure { impact } => {
                impact.clamp(0.0, 1.0)
            }
            OutcomeSignal::Neutral => 0.0,
        }
    }
}

/// Everything the personality model reads and writes for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub personality: Personality,
    pub state: DynamicState,
    pub counters: ExperienceCounters,
}

// The min/max only absorb float rounding; amounts are already in [0, 1].
fn raise(value: f32, amount: f32) -> f32 {
    (value + amount * (1.0 - value)).min(1.0)
}

fn lower(value: f32, amount: f32) -> f32 {
    (value - amount * value).max(0.0)
}

/// Returns the profile after applying one task outcome.
pub fn update(profile: &AgentProfile, signal: OutcomeSignal) -> AgentProfile {
    let mut next = profile.clone();
    let lr = profile.counters.learning_rate.clamp(0.0, 1.0);
    let step = lr * signal.impact();

    match signal {
        OutcomeSignal::Success { impact } => {
            next.counters.record(true);
            next.state.confidence = raise(profile.state.confidence, step * SUCCESS_CONFIDENCE_GAIN);
            next.state.stress = lower(profile.state.stress, step * SUCCESS_STRESS_RELIEF);
            if impact > HIGH_IMPACT {
                next.personality.risk_tolerance =
                    raise(profile.personality.risk_tolerance, step * TRAIT_DRIFT);
            }
        }
        OutcomeSignal::Failure { .. } => {
            next.counters.record(false);
            next.state.confidence = lower(profile.state.confidence, step * FAILURE_CONFIDENCE_LOSS);
            next.state.stress = raise(profile.state.stress, step * FAILURE_STRESS_GAIN);
            next.personality.risk_tolerance =
                lower(profile.personality.risk_tolerance, step * TRAIT_DRIFT);
        }
        OutcomeSignal::Neutral => {}
    }

    next.state.mood = smoothed_mood(&profile.state, &next.state);
    next
}

/// Mood follows the trend of confidence minus stress, never set directly.
fn smoothed_mood(before: &DynamicState, after: &DynamicState) -> f32 {
    let delta = (after.confidence - before.confidence) - (after.stress - before.stress);
    let target = (MOOD_GAIN * delta).tanh();
    (1.0 - MOOD_ALPHA) * before.mood + MOOD_ALPHA * target
}

/// Acceptance propensity in [0, 1] for a task of the given difficulty.
///
/// Risk tolerance sets how much difficulty discourages the agent, workload
/// penalizes cubically so it bites near capacity, and stress and confidence
/// scale the whole result.
pub fn decision_bias(personality: &Personality, state: &DynamicState, difficulty: f32) -> f32 {
    let difficulty = difficulty.clamp(0.0, 1.0);
    let risk_fit = 1.0 - difficulty * (1.0 - personality.risk_tolerance);
    let workload = state.workload.clamp(0.0, 1.0);
    let capacity_headroom = 1.0 - workload.powi(3);
    let stress_drag = 1.0 - 0.5 * state.stress;
    let confidence_lift = 0.75 + 0.25 * state.confidence;

    (risk_fit * capacity_headroom * stress_drag * confidence_lift).clamp(0.0, 1.0)
}

/// Adjusts stress and working style for the agent's current workload.
pub fn apply_workload_pressure(profile: &AgentProfile) -> AgentProfile {
    let mut next = profile.clone();
    let workload = profile.state.workload;

    if workload > 0.8 {
        next.state.stress = raise(profile.state.stress, 0.1);
        next.personality.decision_speed = lower(profile.personality.decision_speed, 0.05);
    } else if workload < 0.3 {
        next.state.stress = lower(profile.state.stress, 0.05);
        next.personality.innovation_appetite = raise(profile.personality.innovation_appetite, 0.02);
    }

    next.state.mood = smoothed_mood(&profile.state, &next.state);
    next
}

/// Applies an external setback (denied resources, a crisis) of magnitude in [0, 1].
pub fn absorb_setback(profile: &AgentProfile, magnitude: f32) -> AgentProfile {
    let magnitude = magnitude.clamp(0.0, 1.0);
    let mut next = profile.clone();
    next.state.stress = raise(profile.state.stress, magnitude);
    next.state.confidence = lower(profile.state.confidence, 0.5 * magnitude);
    next.state.mood = smoothed_mood(&profile.state, &next.state);
    next
}

/// Sheds a fraction of the agent's workload, as happens overnight.
pub fn recover_workload(state: &DynamicState, recovery_rate: f32) -> DynamicState {
    DynamicState {
        workload: lower(state.workload, recovery_rate.clamp(0.0, 1.0)),
        ..*state
    }
}

/// Display label for the agent's mood, derived from its state.
pub fn mood_label(state: &DynamicState, counters: &ExperienceCounters) -> &'static str {
    let success_ratio = counters.success_ratio();
    if state.confidence > 0.8 && success_ratio > 0.7 {
        "confident"
    } else if state.stress > 0.7 {
        "stressed"
    } else if success_ratio > 0.6 {
        "motivated"
    } else if state.confidence < 0.3 {
        "frustrated"
    } else {
        "neutral"
    }
}

/// Checks every trait and state value against its declared bound.
pub fn validate(owner: &str, profile: &AgentProfile) -> Result<(), StateInvariantError> {
    let out_of_bounds = |field: &'static str, value: f32, min: f32, max: f32| {
        StateInvariantError::OutOfBounds {
            owner: owner.to_string(),
            field,
            value,
            min,
            max,
        }
    };
    let in_range = |value: f32, min: f32, max: f32| value.is_finite() && value >= min && value <= max;

    for (field, value) in profile.personality.traits() {
        if !in_range(value, 0.0, 1.0) {
            return Err(out_of_bounds(field, value, 0.0, 1.0));
        }
    }

    let state = &profile.state;
    let unit_fields = [
        ("stress", state.stress),
        ("confidence", state.confidence),
        ("workload", state.workload),
        ("learning_rate", profile.counters.learning_rate),
    ];
    for (field, value) in unit_fields {
        if !in_range(value, 0.0, 1.0) {
            return Err(out_of_bounds(field, value, 0.0, 1.0));
        }
    }
    if !in_range(state.mood, -1.0, 1.0) {
        return Err(out_of_bounds("mood", state.mood, -1.0, 1.0));
    }
    Ok(())
}
