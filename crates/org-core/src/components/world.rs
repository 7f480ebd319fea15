//! World Resources
//!
//! Day counter, agent roster, and run-scoped settings shared by the systems.

use bevy_ecs::prelude::*;

use super::agent::Role;
use crate::config::SimConfig;
use crate::error::StateInvariantError;

/// Current simulated day. Day 0 is the state before the first tick.
#[derive(Resource, Debug, Clone, Default)]
pub struct DayClock {
    pub day: u64,
}

impl DayClock {
    pub fn advance(&mut self) -> u64 {
        self.day += 1;
        self.day
    }
}

/// Agents in roster order.
///
/// Systems iterate agents through this list rather than through a query so
/// every pass sees them in the same order.
#[derive(Resource, Debug, Clone, Default)]
pub struct AgentRoster {
    entries: Vec<(String, Role, Entity)>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, agent_id: impl Into<String>, role: Role, entity: Entity) {
        self.entries.push((agent_id.into(), role, entity));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Role, Entity)> {
        self.entries.iter().map(|(id, role, entity)| (id.as_str(), *role, *entity))
    }

    pub fn entity(&self, agent_id: &str) -> Result<Entity, StateInvariantError> {
        self.entries
            .iter()
            .find(|(id, _, _)| id == agent_id)
            .map(|(_, _, entity)| *entity)
            .ok_or_else(|| StateInvariantError::UnknownAgent(agent_id.to_string()))
    }

    pub fn role(&self, agent_id: &str) -> Option<Role> {
        self.entries
            .iter()
            .find(|(id, _, _)| id == agent_id)
            .map(|(_, role, _)| *role)
    }

    /// Agent id holding the given role.
    pub fn agent_for(&self, role: Role) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, r, _)| *r == role)
            .map(|(id, _, _)| id.as_str())
    }
}

/// Run-scoped copy of the configuration, readable by every system.
#[derive(Resource, Debug, Clone)]
pub struct Settings(pub SimConfig);

/// Invariant violations detected during the current tick. Any entry halts the run.
#[derive(Resource, Debug, Default)]
pub struct InvariantViolations {
    pub errors: Vec<StateInvariantError>,
}

impl InvariantViolations {
    pub fn push(&mut self, error: StateInvariantError) {
        tracing::error!(%error, "state invariant violated");
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn take_first(&mut self) -> Option<StateInvariantError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.remove(0))
        }
    }
}
