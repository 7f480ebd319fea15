//! Crisis Injection
//!
//! Organizational shocks queued by the caller between ticks and applied at
//! the start of the next one. Market-facing crises also enter the market as
//! a negative event.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::components::agent::{Agent, Role};
use crate::components::world::{AgentRoster, DayClock, InvariantViolations, Settings};
use crate::error::ValidationError;
use crate::market::MarketEngine;
use crate::metrics::OrgMetrics;
use crate::negotiation::{CommunicationLog, MessageKind, Priority};
use crate::personality::absorb_setback;
use crate::profiles::{evolve, ProfileItems};
use crate::SimRng;
use org_events::{MarketEvent, MarketEventKind, OrganizationHealth, Polarity};

/// Setback per unit of severity for agents in the crisis' line of fire
const AFFECTED_SETBACK: f32 = 0.3;
/// Setback per unit of severity for everyone else
const BYSTANDER_SETBACK: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisKind {
    MarketDownturn,
    CompetitorThreat,
    KeyTalentLoss,
    FundingChallenge,
    RegulatoryChange,
}

impl CrisisKind {
    pub const ALL: [CrisisKind; 5] = [
        CrisisKind::MarketDownturn,
        CrisisKind::CompetitorThreat,
        CrisisKind::KeyTalentLoss,
        CrisisKind::FundingChallenge,
        CrisisKind::RegulatoryChange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CrisisKind::MarketDownturn => "market_downturn",
            CrisisKind::CompetitorThreat => "competitor_threat",
            CrisisKind::KeyTalentLoss => "key_talent_loss",
            CrisisKind::FundingChallenge => "funding_challenge",
            CrisisKind::RegulatoryChange => "regulatory_change",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CrisisKind::MarketDownturn => "Major market downturn affecting customer demand",
            CrisisKind::CompetitorThreat => "Major competitor launches disruptive product",
            CrisisKind::KeyTalentLoss => "Key team members leaving the company",
            CrisisKind::FundingChallenge => "Difficulty raising next funding round",
            CrisisKind::RegulatoryChange => "New regulations affecting business operations",
        }
    }

    /// Roles that take the brunt of the crisis.
    pub fn affected_roles(self) -> &'static [Role] {
        match self {
            CrisisKind::MarketDownturn => &[Role::Ceo, Role::Cfo, Role::Cmo, Role::HeadOfSales],
            CrisisKind::CompetitorThreat => &[Role::Ceo, Role::Cmo, Role::Cpo, Role::Cto],
            CrisisKind::KeyTalentLoss => &[Role::HrDirector, Role::Coo, Role::Cto],
            CrisisKind::FundingChallenge => &[Role::Ceo, Role::Cfo],
            CrisisKind::RegulatoryChange => &[Role::Clo, Role::Coo, Role::Cfo],
        }
    }

    /// The market event a market-facing crisis produces.
    pub fn market_event(self, severity: f32) -> Option<MarketEvent> {
        let kind = match self {
            CrisisKind::MarketDownturn => MarketEventKind::Economic,
            CrisisKind::CompetitorThreat => MarketEventKind::Competitive,
            CrisisKind::RegulatoryChange => MarketEventKind::Regulatory,
            CrisisKind::KeyTalentLoss | CrisisKind::FundingChallenge => return None,
        };
        Some(MarketEvent::new(kind, Polarity::Negative, severity).with_description(self.description()))
    }

    /// Shifts organizational health by the crisis' impact at full severity scaled by `severity`.
    pub fn apply_to_health(self, health: &mut OrganizationHealth, severity: f32) {
        let shift = |value: &mut f32, impact: f32| *value = (*value + impact * severity).clamp(0.0, 1.0);
        match self {
            CrisisKind::MarketDownturn => shift(&mut health.morale, -0.2),
            CrisisKind::CompetitorThreat => shift(&mut health.market_responsiveness, -0.2),
            CrisisKind::KeyTalentLoss => {
                shift(&mut health.productivity, -0.3);
                shift(&mut health.morale, -0.4);
            }
            CrisisKind::FundingChallenge => shift(&mut health.morale, -0.1),
            CrisisKind::RegulatoryChange => shift(&mut health.decision_velocity, -0.3),
        }
    }
}

impl fmt::Display for CrisisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crisis {
    pub kind: CrisisKind,
    pub severity: f32,
}

/// Crises waiting for the next tick
#[derive(Resource, Debug, Default)]
pub struct CrisisQueue {
    pending: Vec<Crisis>,
}

impl CrisisQueue {
    /// Validates and queues a crisis.
    pub fn push(&mut self, kind: CrisisKind, severity: f32) -> Result<(), ValidationError> {
        if !severity.is_finite() || !(0.0..=1.0).contains(&severity) {
            return Err(ValidationError::new(
                "severity",
                format!("{} is outside [0, 1]", severity),
            ));
        }
        self.pending.push(Crisis { kind, severity });
        Ok(())
    }

    pub fn pending(&self) -> &[Crisis] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<Crisis> {
        std::mem::take(&mut self.pending)
    }
}

/// System: apply queued crises before the market advances
#[allow(clippy::too_many_arguments)]
pub fn apply_crises(
    clock: Res<DayClock>,
    settings: Res<Settings>,
    roster: Res<AgentRoster>,
    mut queue: ResMut<CrisisQueue>,
    mut market: ResMut<MarketEngine>,
    mut metrics: ResMut<OrgMetrics>,
    mut comms: ResMut<CommunicationLog>,
    mut violations: ResMut<InvariantViolations>,
    mut rng: ResMut<SimRng>,
    mut profiles: Query<ProfileItems, With<Agent>>,
) {
    for crisis in queue.drain() {
        info!(day = clock.day, kind = %crisis.kind, severity = crisis.severity, "crisis applied");

        if let Some(event) = crisis.kind.market_event(crisis.severity) {
            if let Err(err) = market.inject(event) {
                warn!(%err, "crisis market event rejected");
            }
        }
        crisis.kind.apply_to_health(&mut metrics.health, crisis.severity);
        if crisis.kind == CrisisKind::FundingChallenge {
            let shortfall = 0.5 * crisis.severity as f64 * settings.0.organization.monthly_burn_rate;
            metrics.adjust_budget(-shortfall);
        }

        let affected = crisis.kind.affected_roles();
        let ceo = roster.agent_for(Role::Ceo).map(str::to_string);
        for (agent_id, role, entity) in roster.iter() {
            let factor = if affected.contains(&role) {
                AFFECTED_SETBACK
            } else {
                BYSTANDER_SETBACK
            };
            evolve(&mut profiles, entity, agent_id, &mut violations, |profile| {
                absorb_setback(profile, crisis.severity * factor)
            });

            if let Some(ceo) = ceo.as_deref().filter(|ceo| *ceo != agent_id && affected.contains(&role)) {
                comms.send(
                    &mut rng.0,
                    clock.day,
                    ceo,
                    agent_id,
                    MessageKind::Escalation,
                    Priority::Critical,
                    crisis.kind.description(),
                );
            }
        }
    }
}
