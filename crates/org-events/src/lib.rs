//! Shared record types for the organizational simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace: the engine
//! produces these records, and persistence or analysis tools consume them.

pub mod market;
pub mod regime;
pub mod snapshot;

// Re-export regime types
pub use regime::EconomicRegime;

// Re-export market event types
pub use market::{CampaignKind, MarketEvent, MarketEventKind, Polarity, ScheduledMarketEvent};

// Re-export snapshot types
pub use snapshot::{
    generate_snapshot_id, AgentSnapshot, AnalyticsSnapshot, CampaignRecord, CollaborationRecord,
    CompetitorShare, DailySnapshot, DecisionRecord, DynamicStateSnapshot, ExperienceSnapshot,
    FinancialMetrics, InternalEventRecord, MarketIndicators, MarketSnapshot, MessageRecord,
    MetricAnomaly, MetricForecast, NegotiationRecord, OrganizationHealth, OrganizationalMetrics,
    PerformanceMetrics, PersonalitySnapshot, RegimeTransitionRecord, ResourcePoolEntry,
    SegmentSnapshot, TaskOutcomeRecord, TaskRecord,
};
