//! World Initialization
//!
//! Builds the ECS world for a run: agents first, then every resource the
//! daily schedules read or write.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::agents::spawn_agents;
use crate::analytics::{AnalyticsReport, MetricHistory};
use crate::components::world::{DayClock, InvariantViolations, Settings};
use crate::config::SimConfig;
use crate::crisis::CrisisQueue;
use crate::internal_events::InternalEventLog;
use crate::learning::LearningSystem;
use crate::market::MarketEngine;
use crate::memory::MemoryStore;
use crate::metrics::OrgMetrics;
use crate::negotiation::{CollaborationHistory, CollaborationLog, CommunicationLog, ResourcePool};
use crate::pipeline::{GenerationResults, PendingGeneration, PendingLearning};
use crate::tasks::TaskBoard;
use crate::SimRng;

/// Create a world ready for day 1
pub fn build_world(config: &SimConfig) -> World {
    let mut world = World::new();

    let roster = spawn_agents(&mut world, &config.agents);
    world.insert_resource(roster);

    world.insert_resource(Settings(config.clone()));
    world.insert_resource(SimRng(SmallRng::seed_from_u64(config.simulation.seed)));
    world.insert_resource(DayClock::default());
    world.insert_resource(InvariantViolations::default());

    world.insert_resource(MarketEngine::new(&config.market));
    world.insert_resource(TaskBoard::new());
    world.insert_resource(MemoryStore::new());
    world.insert_resource(LearningSystem::new(&config.learning));
    world.insert_resource(ResourcePool::new(&config.resources));
    world.insert_resource(CommunicationLog::new());
    world.insert_resource(CollaborationLog::default());
    world.insert_resource(CollaborationHistory::default());
    world.insert_resource(CrisisQueue::default());
    world.insert_resource(InternalEventLog::default());
    world.insert_resource(OrgMetrics::new(&config.organization));
    world.insert_resource(MetricHistory::default());
    world.insert_resource(AnalyticsReport::default());

    world.insert_resource(PendingGeneration::default());
    world.insert_resource(GenerationResults::default());
    world.insert_resource(PendingLearning::default());

    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::world::AgentRoster;

    #[test]
    fn test_world_has_roster_and_resources() {
        let world = build_world(&SimConfig::default());

        assert_eq!(world.resource::<AgentRoster>().len(), 11);
        assert_eq!(world.resource::<DayClock>().day, 0);
        assert!(world.get_resource::<MarketEngine>().is_some());
        assert!(world.get_resource::<OrgMetrics>().is_some());
        assert!(world.get_resource::<PendingLearning>().is_some());
        assert!(world.get_resource::<CollaborationHistory>().is_some());
        assert!(world.get_resource::<MetricHistory>().is_some());
    }
}
