//! Tasks
//!
//! Task lifecycle as an explicit state machine, the daily task board, and the
//! system that generates each day's tasks from role templates.

use bevy_ecs::prelude::*;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::components::agent::TaskDomain;
use crate::components::world::{AgentRoster, DayClock, Settings};
use crate::error::StateInvariantError;
use crate::learning::Approach;
use crate::market::MarketEngine;
use crate::SimRng;
use org_events::{DecisionRecord, EconomicRegime, TaskOutcomeRecord, TaskRecord};

/// Why an agent turned a task down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Overloaded,
    RiskAverse,
}

/// Why an accepted task failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    PoorExecution,
    ExternalServiceError,
}

/// Task status. `Rejected`, `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Accepted,
    Rejected(RejectReason),
    Completed,
    Failed(FailureReason),
}

/// Input to the task state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Accept,
    Reject(RejectReason),
    Complete,
    Fail(FailureReason),
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskEvent::Accept => write!(f, "accept"),
            TaskEvent::Reject(_) => write!(f, "reject"),
            TaskEvent::Complete => write!(f, "complete"),
            TaskEvent::Fail(_) => write!(f, "fail"),
        }
    }
}

impl TaskStatus {
    /// Transition table: the next status, or `None` if the event is illegal here.
    pub fn next(self, event: TaskEvent) -> Option<TaskStatus> {
        match (self, event) {
            (TaskStatus::Pending, TaskEvent::Accept) => Some(TaskStatus::Accepted),
            (TaskStatus::Pending, TaskEvent::Reject(reason)) => Some(TaskStatus::Rejected(reason)),
            (TaskStatus::Accepted, TaskEvent::Complete) => Some(TaskStatus::Completed),
            (TaskStatus::Accepted, TaskEvent::Fail(reason)) => Some(TaskStatus::Failed(reason)),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Rejected(_) | TaskStatus::Completed | TaskStatus::Failed(_)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Accepted => "accepted",
            TaskStatus::Rejected(_) => "rejected",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed(_) => "failed",
        }
    }

    pub fn reason(self) -> Option<&'static str> {
        match self {
            TaskStatus::Rejected(RejectReason::Overloaded) => Some("overloaded"),
            TaskStatus::Rejected(RejectReason::RiskAverse) => Some("risk_averse"),
            TaskStatus::Failed(FailureReason::PoorExecution) => Some("poor_execution"),
            TaskStatus::Failed(FailureReason::ExternalServiceError) => Some("external_service_error"),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}({})", self.label(), reason),
            None => f.write_str(self.label()),
        }
    }
}

/// Realized result of a resolved task
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub quality_score: f32,
    pub realized_impact: f32,
    pub reward: f32,
}

/// Decision produced for an accepted task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionArtifact {
    pub approach: Approach,
    pub summary: String,
    pub followed_recommendation: bool,
}

/// A unit of work offered to one agent
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub day: u64,
    pub task_type: String,
    pub domain: TaskDomain,
    /// 1 to 3
    pub complexity: u8,
    pub difficulty: f32,
    pub importance: f32,
    pub assigned_agent: Option<String>,
    /// Fraction of the assignee's capacity the task consumes
    pub load: f32,
    pub propensity: Option<f32>,
    pub outcome: Option<TaskOutcome>,
    pub decision: Option<DecisionArtifact>,
    status: TaskStatus,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Applies a state-machine event, rejecting illegal transitions.
    pub fn transition(&mut self, event: TaskEvent) -> Result<TaskStatus, StateInvariantError> {
        let next = self
            .status
            .next(event)
            .ok_or_else(|| StateInvariantError::IllegalTransition {
                task_id: self.id.clone(),
                from: self.status.to_string(),
                event: event.to_string(),
            })?;
        self.status = next;
        Ok(next)
    }

    pub fn record(&self) -> TaskRecord {
        TaskRecord {
            task_id: self.id.clone(),
            day: self.day,
            task_type: self.task_type.clone(),
            domain: self.domain.to_string(),
            complexity: self.complexity,
            difficulty: self.difficulty,
            importance: self.importance,
            assigned_agent: self.assigned_agent.clone(),
            status: self.status.label().to_string(),
            reason: self.status.reason().map(str::to_string),
            propensity: self.propensity,
            outcome: self.outcome.map(|o| TaskOutcomeRecord {
                quality_score: o.quality_score,
                realized_impact: o.realized_impact,
                reward: o.reward,
            }),
            decision: self.decision.as_ref().map(|d| DecisionRecord {
                approach: d.approach.to_string(),
                summary: d.summary.clone(),
                followed_recommendation: d.followed_recommendation,
            }),
        }
    }
}

/// Difficulty added on top of complexity in harder economies.
fn regime_difficulty(regime: EconomicRegime) -> f32 {
    match regime {
        EconomicRegime::Recession => 0.15,
        EconomicRegime::Stagnation => 0.1,
        EconomicRegime::Boom => -0.05,
        EconomicRegime::Growth | EconomicRegime::Recovery => 0.0,
    }
}

/// Difficulty in [0, 1] for a task of the given complexity.
pub fn task_difficulty(complexity: u8, regime: EconomicRegime) -> f32 {
    (complexity as f32 / 3.0 * 0.8 + regime_difficulty(regime)).clamp(0.0, 1.0)
}

/// Tasks for the current day
#[derive(Resource, Debug, Default)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the previous day's tasks; they live on in that day's snapshot.
    pub fn clear_day(&mut self) {
        self.tasks.clear();
    }

    /// Creates a pending task and returns its index on the board.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        day: u64,
        task_type: &str,
        domain: TaskDomain,
        complexity: u8,
        difficulty: f32,
        importance: f32,
        assignee: &str,
        capacity_units: f32,
    ) -> usize {
        self.next_id += 1;
        self.tasks.push(Task {
            id: format!("task_{:06}", self.next_id),
            day,
            task_type: task_type.to_string(),
            domain,
            complexity,
            difficulty,
            importance,
            assigned_agent: Some(assignee.to_string()),
            load: complexity as f32 / capacity_units,
            propensity: None,
            outcome: None,
            decision: None,
            status: TaskStatus::Pending,
        });
        self.tasks.len() - 1
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Task> {
        self.tasks.get_mut(index)
    }

    pub fn count_status(&self, pred: impl Fn(TaskStatus) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(t.status)).count()
    }

    /// Every task on the board must be terminal once the day is done.
    pub fn check_terminal(&self, day: u64) -> Result<(), StateInvariantError> {
        match self.tasks.iter().find(|t| !t.status.is_terminal()) {
            Some(task) => Err(StateInvariantError::NonTerminalTask {
                task_id: task.id.clone(),
                status: task.status.to_string(),
                day,
            }),
            None => Ok(()),
        }
    }

    pub fn records(&self) -> Vec<TaskRecord> {
        self.tasks.iter().map(Task::record).collect()
    }
}

/// System: generate the day's tasks for every agent in roster order
pub fn generate_tasks(
    clock: Res<DayClock>,
    settings: Res<Settings>,
    market: Res<MarketEngine>,
    roster: Res<AgentRoster>,
    mut board: ResMut<TaskBoard>,
    mut rng: ResMut<SimRng>,
) {
    let agents = &settings.0.agents;
    let regime = market.regime();

    for (agent_id, role, _) in roster.iter() {
        let templates = role.task_templates();
        let max = agents.max_tasks_per_day.min(templates.len());
        let min = agents.min_tasks_per_day.min(max);
        let count = rng.0.gen_range(min..=max);

        for template_index in index::sample(&mut rng.0, templates.len(), count).into_iter() {
            let template = templates[template_index];
            let complexity: u8 = rng.0.gen_range(1..=3);
            let importance: f32 = rng.0.gen_range(0.3..=0.9);
            board.create(
                clock.day,
                template.task_type,
                template.domain,
                complexity,
                task_difficulty(complexity, regime),
                importance,
                agent_id,
                role.capacity_units(),
            );
        }
    }

    debug!(day = clock.day, tasks = board.tasks().len(), "tasks generated");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [TaskStatus; 7] = [
        TaskStatus::Pending,
        TaskStatus::Accepted,
        TaskStatus::Rejected(RejectReason::Overloaded),
        TaskStatus::Rejected(RejectReason::RiskAverse),
        TaskStatus::Completed,
        TaskStatus::Failed(FailureReason::PoorExecution),
        TaskStatus::Failed(FailureReason::ExternalServiceError),
    ];

    const ALL_EVENTS: [TaskEvent; 6] = [
        TaskEvent::Accept,
        TaskEvent::Reject(RejectReason::Overloaded),
        TaskEvent::Reject(RejectReason::RiskAverse),
        TaskEvent::Complete,
        TaskEvent::Fail(FailureReason::PoorExecution),
        TaskEvent::Fail(FailureReason::ExternalServiceError),
    ];

    #[test]
    fn test_transition_table_exhaustive() {
        for status in ALL_STATUSES {
            for event in ALL_EVENTS {
                let expected = match (status, event) {
                    (TaskStatus::Pending, TaskEvent::Accept) => Some(TaskStatus::Accepted),
                    (TaskStatus::Pending, TaskEvent::Reject(r)) => Some(TaskStatus::Rejected(r)),
                    (TaskStatus::Accepted, TaskEvent::Complete) => Some(TaskStatus::Completed),
                    (TaskStatus::Accepted, TaskEvent::Fail(r)) => Some(TaskStatus::Failed(r)),
                    _ => None,
                };
                assert_eq!(status.next(event), expected, "{} on {}", status, event);
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in ALL_STATUSES.into_iter().filter(|s| s.is_terminal()) {
            assert!(ALL_EVENTS.iter().all(|e| status.next(*e).is_none()));
        }
    }

    #[test]
    fn test_illegal_transition_errors() {
        let mut board = TaskBoard::new();
        let index = board.create(1, "legal_review", TaskDomain::Legal, 2, 0.5, 0.5, "clo", 12.0);
        let task = board.get_mut(index).unwrap();

        assert!(matches!(
            task.transition(TaskEvent::Complete),
            Err(StateInvariantError::IllegalTransition { .. })
        ));
        assert_eq!(task.status(), TaskStatus::Pending);

        task.transition(TaskEvent::Reject(RejectReason::RiskAverse)).unwrap();
        assert!(task.transition(TaskEvent::Accept).is_err());
    }

    #[test]
    fn test_check_terminal() {
        let mut board = TaskBoard::new();
        let index = board.create(3, "data_strategy", TaskDomain::Data, 1, 0.3, 0.5, "cdo", 14.0);

        assert!(matches!(
            board.check_terminal(3),
            Err(StateInvariantError::NonTerminalTask { day: 3, .. })
        ));

        let task = board.get_mut(index).unwrap();
        task.transition(TaskEvent::Accept).unwrap();
        task.transition(TaskEvent::Fail(FailureReason::ExternalServiceError)).unwrap();
        assert!(board.check_terminal(3).is_ok());

        let record = &board.records()[0];
        assert_eq!(record.status, "failed");
        assert_eq!(record.reason.as_deref(), Some("external_service_error"));
    }

    #[test]
    fn test_task_ids_sequential() {
        let mut board = TaskBoard::new();
        board.create(1, "a", TaskDomain::Sales, 1, 0.2, 0.5, "sales", 13.0);
        board.clear_day();
        board.create(2, "b", TaskDomain::Sales, 1, 0.2, 0.5, "sales", 13.0);

        assert_eq!(board.tasks()[0].id, "task_000002");
    }

    #[test]
    fn test_difficulty_harder_in_recession() {
        assert!(task_difficulty(2, EconomicRegime::Recession) > task_difficulty(2, EconomicRegime::Growth));
        assert!(task_difficulty(3, EconomicRegime::Recession) <= 1.0);
        assert!(task_difficulty(1, EconomicRegime::Boom) >= 0.0);
    }
}
