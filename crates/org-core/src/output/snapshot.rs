//! Daily Snapshot Assembly
//!
//! Reads the end-of-day world into a [`DailySnapshot`]. Agents appear in
//! roster order and every other collection in the order it was produced, so
//! identical runs serialize identically.

use bevy_ecs::prelude::*;

use crate::analytics::AnalyticsReport;
use crate::components::agent::{AgentId, AgentName, DynamicState, ExperienceCounters, Personality, Role};
use crate::components::world::{AgentRoster, DayClock, Settings};
use crate::error::StateInvariantError;
use crate::internal_events::InternalEventLog;
use crate::market::MarketEngine;
use crate::memory::MemoryStore;
use crate::metrics::OrgMetrics;
use crate::negotiation::{CollaborationHistory, CollaborationLog, CommunicationLog, ResourcePool};
use crate::personality::mood_label;
use crate::tasks::TaskBoard;
use org_events::{
    generate_snapshot_id, AgentSnapshot, DailySnapshot, DynamicStateSnapshot, ExperienceSnapshot,
    PersonalitySnapshot,
};

fn personality_snapshot(p: &Personality) -> PersonalitySnapshot {
    PersonalitySnapshot {
        risk_tolerance: p.risk_tolerance,
        collaboration_style: p.collaboration_style,
        decision_speed: p.decision_speed,
        innovation_appetite: p.innovation_appetite,
        communication_directness: p.communication_directness,
        analytical_approach: p.analytical_approach,
        adaptability: p.adaptability,
        leadership_assertiveness: p.leadership_assertiveness,
    }
}

fn agent_snapshot(world: &World, agent_id: &str, role: Role, entity: Entity) -> Result<AgentSnapshot, StateInvariantError> {
    let missing = || StateInvariantError::UnknownAgent(agent_id.to_string());
    // The roster and the entity must agree on who this is.
    match world.get::<AgentId>(entity) {
        Some(id) if id.0 == agent_id => {}
        _ => return Err(missing()),
    }
    let name = world.get::<AgentName>(entity).ok_or_else(missing)?;
    let personality = world.get::<Personality>(entity).ok_or_else(missing)?;
    let state = world.get::<DynamicState>(entity).ok_or_else(missing)?;
    let counters = world.get::<ExperienceCounters>(entity).ok_or_else(missing)?;
    let memory = world.resource::<MemoryStore>();

    Ok(AgentSnapshot {
        agent_id: agent_id.to_string(),
        name: name.0.clone(),
        role: role.title().to_string(),
        department: role.department().to_string(),
        capacity_units: role.capacity_units(),
        personality: personality_snapshot(personality),
        state: DynamicStateSnapshot {
            stress: state.stress,
            confidence: state.confidence,
            workload: state.workload,
            mood: state.mood,
            mood_label: mood_label(state, counters).to_string(),
        },
        experience: ExperienceSnapshot {
            recent_successes: counters.recent_successes(),
            recent_failures: counters.recent_failures(),
            learning_rate: counters.learning_rate,
            stored_experiences: memory.count(agent_id),
            collaboration_partners: world.resource::<CollaborationHistory>().partner_count(agent_id),
        },
    })
}

/// Build the snapshot for the day that just finished
pub fn build_snapshot(world: &World) -> Result<DailySnapshot, StateInvariantError> {
    let day = world.resource::<DayClock>().day;
    let roster = world.resource::<AgentRoster>();

    let agents = roster
        .iter()
        .map(|(agent_id, role, entity)| agent_snapshot(world, agent_id, role, entity))
        .collect::<Result<Vec<_>, _>>()?;

    let pool = world.resource::<ResourcePool>();

    Ok(DailySnapshot {
        snapshot_id: generate_snapshot_id(day),
        day,
        organization: world.resource::<Settings>().0.organization.name.clone(),
        market: world.resource::<MarketEngine>().snapshot(),
        agents,
        tasks: world.resource::<TaskBoard>().records(),
        negotiations: pool.outcomes().iter().map(|o| o.record()).collect(),
        resource_pool: pool.entries(),
        collaborations: world.resource::<CollaborationLog>().records.clone(),
        messages: world.resource::<CommunicationLog>().records(),
        internal_events: world.resource::<InternalEventLog>().records.clone(),
        metrics: world.resource::<OrgMetrics>().snapshot(),
        analytics: world.resource::<AnalyticsReport>().0.clone(),
    })
}
