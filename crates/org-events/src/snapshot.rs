//! Snapshot Types
//!
//! Serialization structs for daily snapshots.
//!
//! A snapshot captures the complete state of the organization at the end of a
//! simulated day. It is the only durable artifact of a tick, so every collection
//! here is ordered: two runs with the same seed serialize byte-identically.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CampaignKind, EconomicRegime, MarketEvent};

/// Generates a snapshot ID for the given day.
pub fn generate_snapshot_id(day: u64) -> String {
    format!("snap_{:06}", day)
}

/// Regime change observed during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeTransitionRecord {
    pub from: EconomicRegime,
    pub to: EconomicRegime,
    pub trigger: String,
}

/// Economic indicators sampled for the day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketIndicators {
    pub gdp_growth: f32,
    pub unemployment_rate: f32,
    pub sector_health: f32,
    pub interest_rate: f32,
}

/// Customer segment state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub segment: String,
    pub budget_min: f64,
    pub budget_max: f64,
    pub satisfaction: f32,
    pub loyalty: f32,
    pub churn_probability: f32,
    pub lifetime_value: f64,
    pub expansion_potential: f32,
}

/// One player's slice of the market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorShare {
    pub name: String,
    pub share: f32,
    pub strength: f32,
}

/// A campaign applied to the customer segments during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub campaign: CampaignKind,
    /// Segment the campaign was aimed at; absent means every segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_segment: Option<String>,
    pub segments_affected: u32,
    pub satisfaction_improvement: f32,
    pub loyalty_improvement: f32,
    pub acquisition_potential: f32,
}

/// Market state at end of day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub regime: EconomicRegime,
    pub phase_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<RegimeTransitionRecord>,
    pub indicators: MarketIndicators,
    pub segments: Vec<SegmentSnapshot>,
    /// Events applied during this tick
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events_applied: Vec<MarketEvent>,
    /// Events raised during this tick, applied next tick
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events_pending: Vec<MarketEvent>,
    /// Market shares after this tick's drift, summing to one
    #[serde(default)]
    pub competitors: Vec<CompetitorShare>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub campaigns: Vec<CampaignRecord>,
}

/// Agent personality traits snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalitySnapshot {
    pub risk_tolerance: f32,
    pub collaboration_style: f32,
    pub decision_speed: f32,
    pub innovation_appetite: f32,
    pub communication_directness: f32,
    pub analytical_approach: f32,
    pub adaptability: f32,
    pub leadership_assertiveness: f32,
}

/// Agent dynamic state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicStateSnapshot {
    pub stress: f32,
    pub confidence: f32,
    pub workload: f32,
    pub mood: f32,
    pub mood_label: String,
}

/// Agent experience counters snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceSnapshot {
    pub recent_successes: u32,
    pub recent_failures: u32,
    pub learning_rate: f32,
    pub stored_experiences: usize,
    /// Partners this agent has a collaboration history with
    #[serde(default)]
    pub collaboration_partners: usize,
}

/// Full agent snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub name: String,
    pub role: String,
    pub department: String,
    pub capacity_units: f32,
    pub personality: PersonalitySnapshot,
    pub state: DynamicStateSnapshot,
    pub experience: ExperienceSnapshot,
}

/// Decision artifact produced for an accepted task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub approach: String,
    pub summary: String,
    pub followed_recommendation: bool,
}

/// Realized outcome of a resolved task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcomeRecord {
    pub quality_score: f32,
    pub realized_impact: f32,
    pub reward: f32,
}

/// Task record with its terminal status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub day: u64,
    pub task_type: String,
    pub domain: String,
    pub complexity: u8,
    pub difficulty: f32,
    pub importance: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TaskOutcomeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionRecord>,
}

/// Outcome of a single contested resource claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationRecord {
    pub claim_id: usize,
    pub requester: String,
    pub task_id: String,
    pub resource: String,
    pub requested: f64,
    pub granted: f64,
    pub resolution: String,
    /// Position of the claim in the priority order for its resource
    pub rank: usize,
}

/// Remaining capacity of one resource pool after negotiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePoolEntry {
    pub resource: String,
    pub capacity: f64,
    pub remaining: f64,
}

/// Collaboration between two agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationRecord {
    pub participants: Vec<String>,
    pub collaboration_type: String,
    pub quality: f32,
    pub success: bool,
    /// Mean quality of the pair's recent collaborations before this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_quality: Option<f32>,
}

/// Message routed between agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: Uuid,
    pub from: String,
    pub to: String,
    pub kind: String,
    pub priority: String,
    pub subject: String,
}

/// Organizational health indicators, all in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationHealth {
    pub morale: f32,
    pub productivity: f32,
    pub innovation_index: f32,
    pub communication_quality: f32,
    pub decision_velocity: f32,
    pub market_responsiveness: f32,
}

/// Running financial totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub revenue: f64,
    pub expenses: f64,
    pub profit: f64,
    pub budget: f64,
    pub monthly_burn_rate: f64,
    pub runway_months: f64,
}

/// Performance indicators for the day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub customer_satisfaction: f32,
    pub task_success_rate: f32,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub tasks_rejected: u32,
    pub external_service_failures: u32,
    pub resource_denials: u32,
}

/// Computed organizational metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationalMetrics {
    pub health: OrganizationHealth,
    pub financials: FinancialMetrics,
    pub performance: PerformanceMetrics,
}

/// Internal organizational event rolled for the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalEventRecord {
    pub kind: String,
    pub description: String,
    /// Signed impact; negative events hurt
    pub impact: f32,
}

/// Linear-trend forecast of one tracked metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricForecast {
    pub metric: String,
    /// `increasing`, `decreasing`, `stable` or `insufficient_data`
    pub trend: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    pub confidence: f32,
}

/// A metric value far from the metric's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAnomaly {
    pub metric: String,
    pub day: u64,
    pub value: f64,
    pub z_score: f64,
    /// `high` beyond three standard deviations, otherwise `medium`
    pub severity: String,
}

/// Forecasts and today's anomalies over the tracked metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub forecasts: Vec<MetricForecast>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<MetricAnomaly>,
}

/// Complete daily snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub snapshot_id: String,
    pub day: u64,
    pub organization: String,
    pub market: MarketSnapshot,
    pub agents: Vec<AgentSnapshot>,
    pub tasks: Vec<TaskRecord>,
    pub negotiations: Vec<NegotiationRecord>,
    pub resource_pool: Vec<ResourcePoolEntry>,
    pub collaborations: Vec<CollaborationRecord>,
    pub messages: Vec<MessageRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_events: Vec<InternalEventRecord>,
    pub metrics: OrganizationalMetrics,
    #[serde(default)]
    pub analytics: AnalyticsSnapshot,
}

impl DailySnapshot {
    /// Finds an agent snapshot by ID.
    pub fn agent(&self, agent_id: &str) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    /// Tasks with the given terminal status label.
    pub fn tasks_with_status<'a>(&'a self, status: &'a str) -> impl Iterator<Item = &'a TaskRecord> {
        self.tasks.iter().filter(move |t| t.status == status)
    }
}
