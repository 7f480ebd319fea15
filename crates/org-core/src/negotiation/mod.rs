//! Negotiation Layer
//!
//! Shared resource pools with indexed claims. Claims are collected during the
//! morning and resolved together in the evening against a single view of the
//! pool, so simultaneous requests never race each other.
//!
//! Claims on a resource are ranked by role seniority, then by the requester's
//! leadership assertiveness, then by submission order. Each claim in rank
//! order takes what it asked for, or whatever is left.

pub mod collaboration;
pub mod messages;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::components::agent::{Agent, Role};
use crate::components::world::{AgentRoster, DayClock, InvariantViolations};
use crate::config::ResourcePoolConfig;
use crate::personality::absorb_setback;
use crate::profiles::{evolve, ProfileItems};
use crate::SimRng;
use org_events::{NegotiationRecord, ResourcePoolEntry};

pub use collaboration::{run_collaborations, CollaborationHistory, CollaborationLog, COLLABORATION_PAIRS};
pub use messages::{send_status_reports, CommunicationLog, Message, MessageKind, Priority};

/// Stress setback for a requester whose claim was denied outright
const DENIAL_SETBACK: f32 = 0.05;

/// A shared organizational resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Budget,
    EngineeringTime,
    MarketingBudget,
    DataResources,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Budget,
        ResourceKind::EngineeringTime,
        ResourceKind::MarketingBudget,
        ResourceKind::DataResources,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Budget => "budget",
            ResourceKind::EngineeringTime => "engineering_time",
            ResourceKind::MarketingBudget => "marketing_budget",
            ResourceKind::DataResources => "data_resources",
        }
    }

    /// Role that administers the resource and receives requests for it.
    pub fn owner(self) -> Role {
        match self {
            ResourceKind::Budget => Role::Cfo,
            ResourceKind::EngineeringTime => Role::Cto,
            ResourceKind::MarketingBudget => Role::Cmo,
            ResourceKind::DataResources => Role::Cdo,
        }
    }

    /// Amount requested per unit of task complexity.
    pub fn unit_request(self) -> f64 {
        match self {
            ResourceKind::Budget => 5_000.0,
            ResourceKind::EngineeringTime => 8.0,
            ResourceKind::MarketingBudget => 4_000.0,
            ResourceKind::DataResources => 5.0,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a claim in the pool's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimId(pub usize);

/// A request for part of a resource pool
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub id: ClaimId,
    pub requester: String,
    pub task_id: String,
    pub resource: ResourceKind,
    pub amount: f64,
    pub seniority: u8,
    pub assertiveness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Granted,
    Partial,
    Denied,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Granted => "granted",
            Resolution::Partial => "partial",
            Resolution::Denied => "denied",
        }
    }
}

/// Result of one claim
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationOutcome {
    pub claim_id: ClaimId,
    pub requester: String,
    pub task_id: String,
    pub resource: ResourceKind,
    pub requested: f64,
    pub granted: f64,
    pub resolution: Resolution,
    /// Position in the resource's priority order, starting at 0
    pub rank: usize,
}

impl NegotiationOutcome {
    pub fn record(&self) -> NegotiationRecord {
        NegotiationRecord {
            claim_id: self.claim_id.0,
            requester: self.requester.clone(),
            task_id: self.task_id.clone(),
            resource: self.resource.to_string(),
            requested: self.requested,
            granted: self.granted,
            resolution: self.resolution.as_str().to_string(),
            rank: self.rank,
        }
    }
}

/// Total order on claims: higher seniority, then higher assertiveness, then earlier submission.
pub fn claim_priority(a: &Claim, b: &Claim) -> Ordering {
    b.seniority
        .cmp(&a.seniority)
        .then_with(|| b.assertiveness.total_cmp(&a.assertiveness))
        .then_with(|| a.id.cmp(&b.id))
}

/// Daily resource pools and the claims filed against them
#[derive(Resource, Debug, Default)]
pub struct ResourcePool {
    capacity: BTreeMap<ResourceKind, f64>,
    remaining: BTreeMap<ResourceKind, f64>,
    claims: Vec<Claim>,
    outcomes: Vec<NegotiationOutcome>,
}

impl ResourcePool {
    pub fn new(config: &ResourcePoolConfig) -> Self {
        let mut pool = Self::default();
        pool.replenish(config);
        pool
    }

    /// Resets every pool to its daily allowance and clears the claim arena.
    pub fn replenish(&mut self, config: &ResourcePoolConfig) {
        self.capacity = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, config.amount(kind)))
            .collect();
        self.remaining = self.capacity.clone();
        self.claims.clear();
        self.outcomes.clear();
    }

    pub fn submit(
        &mut self,
        requester: &str,
        task_id: &str,
        resource: ResourceKind,
        amount: f64,
        seniority: u8,
        assertiveness: f32,
    ) -> ClaimId {
        let id = ClaimId(self.claims.len());
        self.claims.push(Claim {
            id,
            requester: requester.to_string(),
            task_id: task_id.to_string(),
            resource,
            amount: amount.max(0.0),
            seniority,
            assertiveness,
        });
        id
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn remaining(&self, resource: ResourceKind) -> f64 {
        self.remaining.get(&resource).copied().unwrap_or(0.0)
    }

    /// Resolves every open claim. Outcomes are grouped by resource, then rank.
    pub fn resolve(&mut self) -> &[NegotiationOutcome] {
        self.outcomes.clear();

        for resource in ResourceKind::ALL {
            let mut contested: Vec<&Claim> = self.claims.iter().filter(|c| c.resource == resource).collect();
            contested.sort_by(|a, b| claim_priority(a, b));

            let mut left = self.remaining.get(&resource).copied().unwrap_or(0.0);
            for (rank, claim) in contested.into_iter().enumerate() {
                let granted = claim.amount.min(left);
                left -= granted;
                let resolution = if granted >= claim.amount {
                    Resolution::Granted
                } else if granted > 0.0 {
                    Resolution::Partial
                } else {
                    Resolution::Denied
                };
                self.outcomes.push(NegotiationOutcome {
                    claim_id: claim.id,
                    requester: claim.requester.clone(),
                    task_id: claim.task_id.clone(),
                    resource,
                    requested: claim.amount,
                    granted,
                    resolution,
                    rank,
                });
            }
            self.remaining.insert(resource, left);
        }

        &self.outcomes
    }

    pub fn outcomes(&self) -> &[NegotiationOutcome] {
        &self.outcomes
    }

    pub fn denials(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.resolution == Resolution::Denied)
            .count()
    }

    pub fn entries(&self) -> Vec<ResourcePoolEntry> {
        ResourceKind::ALL
            .into_iter()
            .map(|kind| ResourcePoolEntry {
                resource: kind.to_string(),
                capacity: self.capacity.get(&kind).copied().unwrap_or(0.0),
                remaining: self.remaining(kind),
            })
            .collect()
    }
}

/// System: resolve the day's claims, escalating denials to the CEO
#[allow(clippy::too_many_arguments)]
pub fn resolve_negotiations(
    clock: Res<DayClock>,
    roster: Res<AgentRoster>,
    mut pool: ResMut<ResourcePool>,
    mut comms: ResMut<CommunicationLog>,
    mut violations: ResMut<InvariantViolations>,
    mut rng: ResMut<SimRng>,
    mut profiles: Query<ProfileItems, With<Agent>>,
) {
    let ceo = roster.agent_for(Role::Ceo).map(str::to_string);
    let denied: Vec<NegotiationOutcome> = pool
        .resolve()
        .iter()
        .filter(|o| o.resolution == Resolution::Denied)
        .cloned()
        .collect();

    for outcome in denied {
        warn!(
            day = clock.day,
            requester = %outcome.requester,
            resource = %outcome.resource,
            task = %outcome.task_id,
            "resource claim denied"
        );

        if let Some(ceo) = ceo.as_deref().filter(|ceo| *ceo != outcome.requester) {
            comms.send(
                &mut rng.0,
                clock.day,
                &outcome.requester,
                ceo,
                MessageKind::Escalation,
                Priority::High,
                format!("{} denied for {}", outcome.resource, outcome.task_id),
            );
        }

        match roster.entity(&outcome.requester) {
            Ok(entity) => {
                evolve(&mut profiles, entity, &outcome.requester, &mut violations, |profile| {
                    absorb_setback(profile, DENIAL_SETBACK)
                });
            }
            Err(err) => violations.push(err),
        }
    }
}
