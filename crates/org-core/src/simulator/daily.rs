//! Daily Schedules
//!
//! The systems that bracket a day and the two schedules the simulator runs
//! around the text-generation phase.

use bevy_ecs::prelude::*;

use crate::components::agent::{Agent, DynamicState, ExperienceCounters, Personality};
use crate::components::world::{AgentRoster, DayClock, InvariantViolations, Settings};
use crate::analytics::update_analytics;
use crate::crisis::apply_crises;
use crate::internal_events::roll_internal_events;
use crate::market::advance_market;
use crate::metrics::aggregate_metrics;
use crate::negotiation::{
    resolve_negotiations, run_collaborations, send_status_reports, CollaborationLog,
    CommunicationLog, ResourcePool,
};
use crate::personality::{apply_workload_pressure, recover_workload, validate, AgentProfile};
use crate::pipeline::{evaluate_tasks, prepare_generation_requests, resolve_tasks, update_learning};
use crate::profiles::{evolve, ProfileItems};
use crate::tasks::{generate_tasks, TaskBoard};

/// System: open a new day
///
/// Advances the clock, clears yesterday's board and logs, refills the
/// resource pools, and lets every agent shed workload overnight before
/// workload pressure is applied.
#[allow(clippy::too_many_arguments)]
pub fn begin_day(
    mut clock: ResMut<DayClock>,
    settings: Res<Settings>,
    roster: Res<AgentRoster>,
    mut board: ResMut<TaskBoard>,
    mut comms: ResMut<CommunicationLog>,
    mut collaborations: ResMut<CollaborationLog>,
    mut pool: ResMut<ResourcePool>,
    mut violations: ResMut<InvariantViolations>,
    mut profiles: Query<ProfileItems, With<Agent>>,
) {
    clock.advance();
    board.clear_day();
    comms.clear_day();
    collaborations.clear_day();
    pool.replenish(&settings.0.resources);

    let recovery = settings.0.agents.workload_recovery_rate;
    for (agent_id, _, entity) in roster.iter() {
        evolve(&mut profiles, entity, agent_id, &mut violations, |profile| {
            let rested = AgentProfile {
                state: recover_workload(&profile.state, recovery),
                ..profile.clone()
            };
            apply_workload_pressure(&rested)
        });
    }
}

/// System: every task is terminal and every agent is in bounds
pub fn check_invariants(
    clock: Res<DayClock>,
    roster: Res<AgentRoster>,
    board: Res<TaskBoard>,
    mut violations: ResMut<InvariantViolations>,
    agents: Query<(&Personality, &DynamicState, &ExperienceCounters), With<Agent>>,
) {
    if let Err(err) = board.check_terminal(clock.day) {
        violations.push(err);
    }

    for (agent_id, _, entity) in roster.iter() {
        let Ok((personality, state, counters)) = agents.get(entity) else {
            violations.push(crate::error::StateInvariantError::UnknownAgent(agent_id.to_string()));
            continue;
        };
        let profile = AgentProfile {
            personality: *personality,
            state: *state,
            counters: counters.clone(),
        };
        if let Err(err) = validate(agent_id, &profile) {
            violations.push(err);
        }
    }
}

/// Systems before text generation, in order
pub fn morning_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            begin_day,
            apply_crises,
            roll_internal_events,
            advance_market,
            generate_tasks,
            evaluate_tasks,
            prepare_generation_requests,
        )
            .chain(),
    );
    schedule
}

/// Systems after text generation, in order
pub fn evening_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            resolve_tasks,
            resolve_negotiations,
            send_status_reports,
            run_collaborations,
            update_learning,
            aggregate_metrics,
            update_analytics,
            check_invariants,
        )
            .chain(),
    );
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::setup::build_world;

    #[test]
    fn test_begin_day_recovers_workload() {
        let mut world = build_world(&SimConfig::default());
        let entity = world.resource::<AgentRoster>().entity("coo").unwrap();
        world.get_mut::<DynamicState>(entity).unwrap().workload = 0.9;

        let mut schedule = Schedule::default();
        schedule.add_systems(begin_day);
        schedule.run(&mut world);

        assert_eq!(world.resource::<DayClock>().day, 1);
        let state = world.get::<DynamicState>(entity).unwrap();
        assert!((state.workload - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_pending_task_flagged_at_end_of_day() {
        let mut world = build_world(&SimConfig::default());
        world.resource_mut::<DayClock>().day = 2;
        world.resource_mut::<TaskBoard>().create(
            2,
            "compliance_review",
            crate::components::agent::TaskDomain::Legal,
            1,
            0.3,
            0.5,
            "clo",
            12.0,
        );

        let mut schedule = Schedule::default();
        schedule.add_systems(check_invariants);
        schedule.run(&mut world);

        assert!(!world.resource::<InvariantViolations>().is_empty());
    }

    #[test]
    fn test_full_day_leaves_every_task_terminal() {
        let mut world = build_world(&SimConfig::default());
        morning_schedule().run(&mut world);
        let jobs = world.resource::<crate::pipeline::PendingGeneration>().jobs.len();
        world.resource_mut::<crate::pipeline::GenerationResults>().results =
            vec![Err(crate::error::TextGenError::RateLimited); jobs];
        evening_schedule().run(&mut world);

        let board = world.resource::<TaskBoard>();
        assert!(!board.tasks().is_empty());
        assert!(board.tasks().iter().all(|t| t.status().is_terminal()));
        assert!(world.resource::<InvariantViolations>().is_empty());
    }
}
