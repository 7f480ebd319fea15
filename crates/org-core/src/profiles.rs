//! Agent profile access for systems.
//!
//! Systems never write personality or state components directly; they go
//! through [`evolve`], which validates the new profile before committing it.

use bevy_ecs::prelude::*;

use crate::components::agent::{Agent, DynamicState, ExperienceCounters, Personality};
use crate::components::world::InvariantViolations;
use crate::error::StateInvariantError;
use crate::personality::{validate, AgentProfile};

/// Query items making up an agent's profile
pub type ProfileItems = (
    &'static mut Personality,
    &'static mut DynamicState,
    &'static mut ExperienceCounters,
);

/// Reads the current profile of an agent entity.
pub fn read_profile(
    profiles: &Query<ProfileItems, With<Agent>>,
    entity: Entity,
    owner: &str,
) -> Result<AgentProfile, StateInvariantError> {
    let (personality, state, counters) = profiles
        .get(entity)
        .map_err(|_| StateInvariantError::UnknownAgent(owner.to_string()))?;
    Ok(AgentProfile {
        personality: *personality,
        state: *state,
        counters: counters.clone(),
    })
}

/// Applies `change` to an agent's profile and commits it if every value is in bounds.
///
/// Out-of-bound results are recorded as violations and the old profile is kept.
/// Returns whether the change was committed.
pub fn evolve(
    profiles: &mut Query<ProfileItems, With<Agent>>,
    entity: Entity,
    owner: &str,
    violations: &mut InvariantViolations,
    change: impl FnOnce(&AgentProfile) -> AgentProfile,
) -> bool {
    let current = match read_profile(profiles, entity, owner) {
        Ok(profile) => profile,
        Err(err) => {
            violations.push(err);
            return false;
        }
    };

    let next = change(&current);
    if let Err(err) = validate(owner, &next) {
        violations.push(err);
        return false;
    }

    match profiles.get_mut(entity) {
        Ok((mut personality, mut state, mut counters)) => {
            *personality = next.personality;
            *state = next.state;
            *counters = next.counters;
            true
        }
        Err(_) => {
            violations.push(StateInvariantError::UnknownAgent(owner.to_string()));
            false
        }
    }
}
