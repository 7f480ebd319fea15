//! Organizational Metrics
//!
//! Health indicators smoothed from agent state, running financial totals,
//! and the day's performance counts.

use bevy_ecs::prelude::*;
use rand::Rng;

use crate::components::agent::{Agent, DynamicState, Personality};
use crate::components::world::{AgentRoster, Settings};
use crate::config::OrganizationConfig;
use crate::market::{cycle::revenue_multiplier, MarketEngine};
use crate::negotiation::{CollaborationLog, ResourcePool};
use crate::tasks::{FailureReason, TaskBoard, TaskStatus};
use crate::SimRng;
use org_events::{
    FinancialMetrics, OrganizationHealth, OrganizationalMetrics, PerformanceMetrics,
};

/// Weight of today's observation in the morale and other fast-moving averages
const FAST_ALPHA: f32 = 0.3;
/// Weight of today's observation in productivity
const SLOW_ALPHA: f32 = 0.2;
/// Base daily revenue range before the regime multiplier
const DAILY_REVENUE: std::ops::Range<f64> = 5_000.0..25_000.0;

fn blend(previous: f32, observed: f32, alpha: f32) -> f32 {
    ((1.0 - alpha) * previous + alpha * observed).clamp(0.0, 1.0)
}

/// Running organizational metrics
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct OrgMetrics {
    pub health: OrganizationHealth,
    pub financials: FinancialMetrics,
    pub performance: PerformanceMetrics,
    initial_budget: f64,
    /// One-off budget changes outside revenue and expenses, e.g. a funding crisis
    budget_adjustment: f64,
}

impl OrgMetrics {
    pub fn new(organization: &OrganizationConfig) -> Self {
        Self {
            health: OrganizationHealth {
                morale: 0.75,
                productivity: 0.70,
                innovation_index: 0.65,
                communication_quality: 0.80,
                decision_velocity: 0.60,
                market_responsiveness: 0.55,
            },
            financials: FinancialMetrics {
                revenue: 0.0,
                expenses: 0.0,
                profit: 0.0,
                budget: organization.initial_budget,
                monthly_burn_rate: organization.monthly_burn_rate,
                runway_months: runway(organization.initial_budget, organization.monthly_burn_rate),
            },
            performance: PerformanceMetrics {
                customer_satisfaction: 0.5,
                ..PerformanceMetrics::default()
            },
            initial_budget: organization.initial_budget,
            budget_adjustment: 0.0,
        }
    }

    /// Books revenue and expenses for one day and refreshes the derived totals.
    pub fn book_day(&mut self, revenue: f64) {
        let financials = &mut self.financials;
        financials.revenue += revenue;
        financials.expenses += financials.monthly_burn_rate / 30.0;
        self.refresh_budget();
    }

    /// Applies a one-off change to the budget.
    pub fn adjust_budget(&mut self, amount: f64) {
        self.budget_adjustment += amount;
        self.refresh_budget();
    }

    fn refresh_budget(&mut self) {
        let financials = &mut self.financials;
        financials.profit = financials.revenue - financials.expenses;
        financials.budget = self.initial_budget + financials.profit + self.budget_adjustment;
        financials.runway_months = runway(financials.budget, financials.monthly_burn_rate);
    }

    pub fn snapshot(&self) -> OrganizationalMetrics {
        OrganizationalMetrics {
            health: self.health.clone(),
            financials: self.financials.clone(),
            performance: self.performance.clone(),
        }
    }
}

/// Months of runway; zero when there is no burn to measure against.
fn runway(budget: f64, monthly_burn_rate: f64) -> f64 {
    if monthly_burn_rate > 0.0 {
        (budget / monthly_burn_rate).max(0.0)
    } else {
        0.0
    }
}

/// Means of the agent values that feed the health indicators
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct AgentAverages {
    confidence: f32,
    stress: f32,
    innovation_appetite: f32,
    decision_speed: f32,
    adaptability: f32,
}

fn averages<'a>(agents: impl Iterator<Item = (&'a Personality, &'a DynamicState)>) -> Option<AgentAverages> {
    let mut sum = AgentAverages::default();
    let mut n = 0usize;
    for (personality, state) in agents {
        sum.confidence += state.confidence;
        sum.stress += state.stress;
        sum.innovation_appetite += personality.innovation_appetite;
        sum.decision_speed += personality.decision_speed;
        sum.adaptability += personality.adaptability;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    let n = n as f32;
    Some(AgentAverages {
        confidence: sum.confidence / n,
        stress: sum.stress / n,
        innovation_appetite: sum.innovation_appetite / n,
        decision_speed: sum.decision_speed / n,
        adaptability: sum.adaptability / n,
    })
}

/// System: fold the day's activity into the organizational metrics
#[allow(clippy::too_many_arguments)]
pub fn aggregate_metrics(
    settings: Res<Settings>,
    roster: Res<AgentRoster>,
    market: Res<MarketEngine>,
    board: Res<TaskBoard>,
    pool: Res<ResourcePool>,
    collaborations: Res<CollaborationLog>,
    mut metrics: ResMut<OrgMetrics>,
    mut rng: ResMut<SimRng>,
    agents: Query<(&Personality, &DynamicState), With<Agent>>,
) {
    let in_order = roster.iter().filter_map(|(_, _, entity)| agents.get(entity).ok());
    if let Some(avg) = averages(in_order) {
        let health = &mut metrics.health;
        health.morale = blend(health.morale, avg.confidence, FAST_ALPHA);
        health.productivity = blend(health.productivity, 1.0 - avg.stress, SLOW_ALPHA);
        health.innovation_index = avg.innovation_appetite.clamp(0.0, 1.0);
        health.decision_velocity = blend(health.decision_velocity, avg.decision_speed, FAST_ALPHA);
        health.market_responsiveness = blend(
            health.market_responsiveness,
            avg.adaptability * market.mean_satisfaction(),
            FAST_ALPHA,
        );
    }
    if let Some(rate) = collaborations.success_rate() {
        let health = &mut metrics.health;
        health.communication_quality = blend(health.communication_quality, rate, FAST_ALPHA);
    }

    let revenue = rng.0.gen_range(DAILY_REVENUE) * revenue_multiplier(market.regime());
    metrics.financials.monthly_burn_rate = settings.0.organization.monthly_burn_rate;
    metrics.book_day(revenue);

    let completed = board.count_status(|s| s == TaskStatus::Completed) as u32;
    let failed = board.count_status(|s| matches!(s, TaskStatus::Failed(_))) as u32;
    let rejected = board.count_status(|s| matches!(s, TaskStatus::Rejected(_))) as u32;
    let external = board.count_status(|s| s == TaskStatus::Failed(FailureReason::ExternalServiceError)) as u32;

    let performance = &mut metrics.performance;
    performance.customer_satisfaction = market.mean_satisfaction();
    if completed + failed > 0 {
        performance.task_success_rate = completed as f32 / (completed + failed) as f32;
    }
    performance.tasks_completed = completed;
    performance.tasks_failed = failed;
    performance.tasks_rejected = rejected;
    performance.external_service_failures = external;
    performance.resource_denials = pool.denials() as u32;
}
