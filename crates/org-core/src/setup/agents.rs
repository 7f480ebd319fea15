//! Agent Spawning
//!
//! Spawns one agent per role, in roster order, with the role's personality
//! and a fresh dynamic state.

use bevy_ecs::prelude::*;

use crate::components::agent::{
    Agent, AgentId, AgentName, DynamicState, ExperienceCounters, Role,
};
use crate::components::world::AgentRoster;
use crate::config::AgentConfig;

/// Spawn every role's agent and return the roster in spawn order
pub fn spawn_agents(world: &mut World, config: &AgentConfig) -> AgentRoster {
    let mut roster = AgentRoster::new();

    for role in Role::ALL {
        let entity = world
            .spawn((
                Agent,
                AgentId(role.agent_id().to_string()),
                AgentName(role.default_name().to_string()),
                role,
                role.personality(),
                DynamicState::default(),
                ExperienceCounters::new(config.learning_rate),
            ))
            .id();
        roster.push(role.agent_id(), role, entity);
    }

    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::agent::Personality;

    #[test]
    fn test_spawns_one_agent_per_role() {
        let mut world = World::new();
        let roster = spawn_agents(&mut world, &AgentConfig::default());

        assert_eq!(roster.len(), Role::ALL.len());
        let ids: Vec<&str> = roster.iter().map(|(id, _, _)| id).collect();
        assert_eq!(ids[0], "ceo");
        assert_eq!(ids[10], "customer_success");

        let mut query = world.query_filtered::<&Personality, With<Agent>>();
        assert_eq!(query.iter(&world).count(), 11);
    }

    #[test]
    fn test_agents_start_with_role_personality() {
        let mut world = World::new();
        let roster = spawn_agents(&mut world, &AgentConfig::default());
        let cfo = roster.entity("cfo").unwrap();

        assert_eq!(*world.get::<Personality>(cfo).unwrap(), Role::Cfo.personality());
        assert_eq!(world.get::<DynamicState>(cfo).unwrap().workload, 0.0);
        assert_eq!(world.get::<ExperienceCounters>(cfo).unwrap().learning_rate, 0.1);
    }
}
