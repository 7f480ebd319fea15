//! Internal Events
//!
//! Day-to-day happenings inside the organization that no caller injects:
//! milestones, partnerships, technical issues, conflicts. At most one is
//! rolled per day and it shifts one organizational health indicator.

use bevy_ecs::prelude::*;
use rand::Rng;
use tracing::info;

use crate::components::world::{DayClock, Settings};
use crate::metrics::OrgMetrics;
use crate::SimRng;
use org_events::{InternalEventRecord, OrganizationHealth};

/// Health shift per unit of event impact
const HEALTH_SHIFT: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEventKind {
    TeamMilestone,
    ProcessImprovement,
    NewPartnership,
    TechnicalIssue,
    TeamConflict,
}

impl InternalEventKind {
    pub const ALL: [InternalEventKind; 5] = [
        InternalEventKind::TeamMilestone,
        InternalEventKind::ProcessImprovement,
        InternalEventKind::NewPartnership,
        InternalEventKind::TechnicalIssue,
        InternalEventKind::TeamConflict,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InternalEventKind::TeamMilestone => "team_milestone",
            InternalEventKind::ProcessImprovement => "process_improvement",
            InternalEventKind::NewPartnership => "new_partnership",
            InternalEventKind::TechnicalIssue => "technical_issue",
            InternalEventKind::TeamConflict => "team_conflict",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            InternalEventKind::TeamMilestone => "Team achieved important milestone",
            InternalEventKind::ProcessImprovement => "Process improvement implemented",
            InternalEventKind::NewPartnership => "New strategic partnership formed",
            InternalEventKind::TechnicalIssue => "Technical issue requiring attention",
            InternalEventKind::TeamConflict => "Team conflict needs resolution",
        }
    }

    pub fn impact(self) -> f32 {
        match self {
            InternalEventKind::TeamMilestone => 0.3,
            InternalEventKind::ProcessImprovement => 0.2,
            InternalEventKind::NewPartnership => 0.4,
            InternalEventKind::TechnicalIssue => -0.2,
            InternalEventKind::TeamConflict => -0.3,
        }
    }

    /// The health indicator the event moves.
    fn indicator(self, health: &mut OrganizationHealth) -> &mut f32 {
        match self {
            InternalEventKind::TeamMilestone => &mut health.morale,
            InternalEventKind::ProcessImprovement | InternalEventKind::TechnicalIssue => &mut health.productivity,
            InternalEventKind::NewPartnership => &mut health.market_responsiveness,
            InternalEventKind::TeamConflict => &mut health.communication_quality,
        }
    }

    pub fn apply_to_health(self, health: &mut OrganizationHealth) {
        let value = self.indicator(health);
        *value = (*value + self.impact() * HEALTH_SHIFT).clamp(0.0, 1.0);
    }

    pub fn record(self) -> InternalEventRecord {
        InternalEventRecord {
            kind: self.as_str().to_string(),
            description: self.description().to_string(),
            impact: self.impact(),
        }
    }
}

/// Picks today's internal event, if any. Always takes two draws.
pub fn roll<R: Rng>(rng: &mut R, probability: f32) -> Option<InternalEventKind> {
    let chance: f32 = rng.gen();
    let pick = rng.gen_range(0..InternalEventKind::ALL.len());
    (chance < probability).then(|| InternalEventKind::ALL[pick])
}

/// Internal events of the current day
#[derive(Resource, Debug, Default)]
pub struct InternalEventLog {
    pub records: Vec<InternalEventRecord>,
}

/// System: roll today's internal event and apply it to organizational health
pub fn roll_internal_events(
    clock: Res<DayClock>,
    settings: Res<Settings>,
    mut log: ResMut<InternalEventLog>,
    mut metrics: ResMut<OrgMetrics>,
    mut rng: ResMut<SimRng>,
) {
    log.records.clear();
    if let Some(kind) = roll(&mut rng.0, settings.0.organization.internal_event_probability) {
        info!(day = clock.day, kind = kind.as_str(), impact = kind.impact(), "internal event");
        kind.apply_to_health(&mut metrics.health);
        log.records.push(kind.record());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn health() -> OrganizationHealth {
        OrganizationHealth {
            morale: 0.75,
            productivity: 0.7,
            innovation_index: 0.65,
            communication_quality: 0.8,
            decision_velocity: 0.6,
            market_responsiveness: 0.55,
        }
    }

    #[test]
    fn test_roll_rate_and_spread() {
        let mut rng = SmallRng::seed_from_u64(31);
        let days = 10_000;
        let mut seen = std::collections::HashSet::new();
        let mut fired = 0;
        for _ in 0..days {
            if let Some(kind) = roll(&mut rng, 0.1) {
                fired += 1;
                seen.insert(kind.as_str());
            }
        }

        let rate = fired as f32 / days as f32;
        assert!((rate - 0.1).abs() < 0.015, "rate {}", rate);
        assert_eq!(seen.len(), InternalEventKind::ALL.len());
    }

    #[test]
    fn test_zero_probability_never_fires() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!((0..1_000).all(|_| roll(&mut rng, 0.0).is_none()));
    }

    #[test]
    fn test_conflict_hurts_communication() {
        let mut h = health();
        InternalEventKind::TeamConflict.apply_to_health(&mut h);

        assert!((h.communication_quality - 0.77).abs() < 1e-6);
        assert_eq!(h.morale, 0.75);
    }

    #[test]
    fn test_milestone_lifts_morale() {
        let mut h = health();
        InternalEventKind::TeamMilestone.apply_to_health(&mut h);
        assert!((h.morale - 0.78).abs() < 1e-6);

        let record = InternalEventKind::TeamMilestone.record();
        assert_eq!(record.kind, "team_milestone");
        assert_eq!(record.impact, 0.3);
    }
}
