//! Agent Decision Pipeline
//!
//! Moves each day's tasks through their lifecycle in three phases:
//!
//! 1. Morning: every pending task is offered to its agent and either
//!    rejected or accepted. Accepted tasks add workload and file a resource
//!    claim, then get a generation request assembled from memory and
//!    learned advice.
//! 2. Generation: the simulator awaits the text generator for every
//!    request concurrently, outside the ECS schedule.
//! 3. Evening: responses are turned into outcomes, experiences, personality
//!    updates and learning samples.

pub mod decision;
pub mod textgen;

use bevy_ecs::prelude::*;
use rand::Rng;
use tracing::debug;

use crate::components::agent::{Agent, Personality};
use crate::components::world::{AgentRoster, DayClock, InvariantViolations, Settings};
use crate::error::{StateInvariantError, TextGenError};
use crate::learning::{LearningSample, LearningSystem, StrategyRecommendation};
use crate::market::MarketEngine;
use crate::memory::{DecisionContext, Experience, ExperienceOutcome, MemoryStore};
use crate::negotiation::{CommunicationLog, MessageKind, Priority, ResourcePool};
use crate::personality::{update, OutcomeSignal};
use crate::profiles::{evolve, read_profile, ProfileItems};
use crate::tasks::{DecisionArtifact, FailureReason, TaskBoard, TaskEvent, TaskStatus};
use crate::SimRng;

use decision::{
    evaluate_acceptance, resolve_outcome, response_approach, success_probability, summarize,
    Acceptance, SuccessFactors,
};
use textgen::{GenerationRequest, GenerationResponse};

/// One accepted task waiting on the text generator
#[derive(Debug, Clone)]
pub struct GenerationJob {
    /// Index of the task on today's board
    pub task_index: usize,
    pub agent_id: String,
    pub context: DecisionContext,
    pub recommendation: StrategyRecommendation,
    pub request: GenerationRequest,
}

/// Generation jobs assembled in the morning, in board order
#[derive(Resource, Debug, Default)]
pub struct PendingGeneration {
    pub jobs: Vec<GenerationJob>,
}

impl PendingGeneration {
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.jobs.iter().map(|job| job.request.clone()).collect()
    }
}

/// Generator results, one per pending job and in the same order
#[derive(Resource, Debug, Default)]
pub struct GenerationResults {
    pub results: Vec<Result<GenerationResponse, TextGenError>>,
}

/// Learning samples produced today, folded into the learning system after negotiation
#[derive(Resource, Debug, Default)]
pub struct PendingLearning {
    pub samples: Vec<(String, LearningSample)>,
}

/// System: offer every pending task to its agent
#[allow(clippy::too_many_arguments)]
pub fn evaluate_tasks(
    clock: Res<DayClock>,
    settings: Res<Settings>,
    roster: Res<AgentRoster>,
    mut board: ResMut<TaskBoard>,
    mut pool: ResMut<ResourcePool>,
    mut comms: ResMut<CommunicationLog>,
    mut violations: ResMut<InvariantViolations>,
    mut rng: ResMut<SimRng>,
    mut profiles: Query<ProfileItems, With<Agent>>,
) {
    let threshold = settings.0.agents.acceptance_threshold;

    for index in 0..board.tasks().len() {
        let Some(task) = board.get_mut(index) else {
            continue;
        };
        if task.status() != TaskStatus::Pending {
            continue;
        }
        let Some(agent_id) = task.assigned_agent.clone() else {
            continue;
        };

        let entity = match roster.entity(&agent_id) {
            Ok(entity) => entity,
            Err(err) => {
                violations.push(err);
                continue;
            }
        };
        let Some(role) = roster.role(&agent_id) else {
            continue;
        };
        let profile = match read_profile(&profiles, entity, &agent_id) {
            Ok(profile) => profile,
            Err(err) => {
                violations.push(err);
                continue;
            }
        };

        let acceptance = evaluate_acceptance(
            &agent_id,
            &profile.personality,
            &profile.state,
            task.difficulty,
            task.load,
            threshold,
        );

        match acceptance {
            Acceptance::Reject { reason, propensity } => {
                task.propensity = Some(propensity);
                if let Err(err) = task.transition(TaskEvent::Reject(reason)) {
                    violations.push(err);
                    continue;
                }
                debug!(day = clock.day, agent = %agent_id, task = %task.id, ?reason, propensity, "task rejected");
            }
            Acceptance::Accept { propensity } => {
                task.propensity = Some(propensity);
                if let Err(err) = task.transition(TaskEvent::Accept) {
                    violations.push(err);
                    continue;
                }
                debug!(day = clock.day, agent = %agent_id, task = %task.id, propensity, "task accepted");

                let load = task.load;
                evolve(&mut profiles, entity, &agent_id, &mut violations, |p| {
                    let mut next = p.clone();
                    next.state.workload = p.state.workload + load;
                    next
                });

                let resource = task.domain.resource();
                let amount = task.complexity as f64 * resource.unit_request();
                pool.submit(
                    &agent_id,
                    &task.id,
                    resource,
                    amount,
                    role.seniority(),
                    profile.personality.leadership_assertiveness,
                );

                if let Some(owner) = roster.agent_for(resource.owner()).filter(|owner| *owner != agent_id) {
                    comms.send(
                        &mut rng.0,
                        clock.day,
                        &agent_id,
                        owner,
                        MessageKind::ResourceRequest,
                        Priority::Medium,
                        format!("{:.0} {} for {}", amount, resource, task.id),
                    );
                }
            }
        }
    }
}

fn describe_memory(experience: &Experience) -> String {
    let outcome = match experience.outcome {
        ExperienceOutcome::Completed => "completed",
        ExperienceOutcome::Failed => "failed",
        ExperienceOutcome::ServiceFailure => "no decision",
    };
    let approach = experience
        .decision
        .map_or("none", |approach| approach.as_str());
    format!(
        "day {} {}: {} -> {} (reward {:.2})",
        experience.day, experience.context.signature, approach, outcome, experience.reward
    )
}

/// System: assemble a generation request for every accepted task
#[allow(clippy::too_many_arguments)]
pub fn prepare_generation_requests(
    clock: Res<DayClock>,
    settings: Res<Settings>,
    roster: Res<AgentRoster>,
    market: Res<MarketEngine>,
    board: Res<TaskBoard>,
    memory: Res<MemoryStore>,
    learning: Res<LearningSystem>,
    mut pending: ResMut<PendingGeneration>,
    mut violations: ResMut<InvariantViolations>,
    personalities: Query<&Personality, With<Agent>>,
) {
    pending.jobs.clear();
    let k = settings.0.agents.memory_search_k;
    let regime = market.regime();

    for (task_index, task) in board.tasks().iter().enumerate() {
        if task.status() != TaskStatus::Accepted {
            continue;
        }
        let Some(agent_id) = task.assigned_agent.as_deref() else {
            continue;
        };
        let (Some(role), Ok(entity)) = (roster.role(agent_id), roster.entity(agent_id)) else {
            violations.push(StateInvariantError::UnknownAgent(agent_id.to_string()));
            continue;
        };
        let Ok(personality) = personalities.get(entity) else {
            violations.push(StateInvariantError::UnknownAgent(agent_id.to_string()));
            continue;
        };

        let context = DecisionContext::for_task(
            &task.task_type,
            task.domain.as_str(),
            regime,
            task.difficulty,
            task.importance,
        );
        let memories = memory
            .search(agent_id, &context, k)
            .into_iter()
            .map(describe_memory)
            .collect();
        let recommendation = learning.recommend(agent_id, &context, clock.day);

        let request = GenerationRequest {
            agent_id: agent_id.to_string(),
            role: role.title().to_string(),
            personality_summary: personality.summary(),
            task_context: format!(
                "{} ({}), difficulty {:.2}, importance {:.2}, {} economy",
                task.task_type, task.domain, task.difficulty, task.importance, regime
            ),
            memories,
            recommendation: recommendation.clone(),
        };

        pending.jobs.push(GenerationJob {
            task_index,
            agent_id: agent_id.to_string(),
            context,
            recommendation,
            request,
        });
    }
}

/// System: resolve every accepted task from its generator result
#[allow(clippy::too_many_arguments)]
pub fn resolve_tasks(
    clock: Res<DayClock>,
    roster: Res<AgentRoster>,
    market: Res<MarketEngine>,
    mut board: ResMut<TaskBoard>,
    mut pending: ResMut<PendingGeneration>,
    mut generated: ResMut<GenerationResults>,
    mut memory: ResMut<MemoryStore>,
    mut learning: ResMut<PendingLearning>,
    mut violations: ResMut<InvariantViolations>,
    mut rng: ResMut<SimRng>,
    mut profiles: Query<ProfileItems, With<Agent>>,
) {
    let jobs = std::mem::take(&mut pending.jobs);
    let mut results = std::mem::take(&mut generated.results).into_iter();
    let regime = market.regime();

    for job in jobs {
        let result = results
            .next()
            .unwrap_or_else(|| Err(TextGenError::MalformedOutput("missing response".to_string())));

        let entity = match roster.entity(&job.agent_id) {
            Ok(entity) => entity,
            Err(err) => {
                violations.push(err);
                continue;
            }
        };
        let Some(task) = board.get_mut(job.task_index) else {
            continue;
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                debug!(day = clock.day, agent = %job.agent_id, task = %task.id, %err, "decision unavailable");
                if let Err(err) = task.transition(TaskEvent::Fail(FailureReason::ExternalServiceError)) {
                    violations.push(err);
                    continue;
                }
                memory.store(
                    &job.agent_id,
                    Experience {
                        agent_id: job.agent_id.clone(),
                        day: clock.day,
                        task_id: task.id.clone(),
                        context: job.context,
                        decision: None,
                        outcome: ExperienceOutcome::ServiceFailure,
                        reward: 0.0,
                    },
                );
                evolve(&mut profiles, entity, &job.agent_id, &mut violations, |p| {
                    update(p, OutcomeSignal::Neutral)
                });
                continue;
            }
        };

        let profile = match read_profile(&profiles, entity, &job.agent_id) {
            Ok(profile) => profile,
            Err(err) => {
                violations.push(err);
                continue;
            }
        };

        let approach = response_approach(&response);
        let followed = job.recommendation.has_evidence() && job.recommendation.approach == approach;
        let probability = success_probability(&SuccessFactors {
            personality: &profile.personality,
            state: &profile.state,
            domain: task.domain,
            difficulty: task.difficulty,
            regime,
            recommendation: &job.recommendation,
            followed_recommendation: followed,
            quality_hint: response.quality_hint,
        });
        let draw: f32 = rng.0.gen();
        let (success, outcome, signal) = resolve_outcome(probability, draw, task.importance);

        let event = if success {
            TaskEvent::Complete
        } else {
            TaskEvent::Fail(FailureReason::PoorExecution)
        };
        if let Err(err) = task.transition(event) {
            violations.push(err);
            continue;
        }
        task.outcome = Some(outcome);
        task.decision = Some(DecisionArtifact {
            approach,
            summary: summarize(&response.text),
            followed_recommendation: followed,
        });
        debug!(
            day = clock.day,
            agent = %job.agent_id,
            task = %task.id,
            %approach,
            probability,
            success,
            "task resolved"
        );

        memory.store(
            &job.agent_id,
            Experience {
                agent_id: job.agent_id.clone(),
                day: clock.day,
                task_id: task.id.clone(),
                context: job.context.clone(),
                decision: Some(approach),
                outcome: if success {
                    ExperienceOutcome::Completed
                } else {
                    ExperienceOutcome::Failed
                },
                reward: outcome.reward,
            },
        );
        learning.samples.push((
            job.agent_id.clone(),
            LearningSample {
                day: clock.day,
                context: job.context,
                approach,
                success,
            },
        ));
        evolve(&mut profiles, entity, &job.agent_id, &mut violations, |p| update(p, signal));
    }
}

/// System: fold today's decisions into the learning system
pub fn update_learning(mut pending: ResMut<PendingLearning>, mut learning: ResMut<LearningSystem>) {
    for (agent_id, sample) in pending.samples.drain(..) {
        learning.record(&agent_id, sample);
    }
}
