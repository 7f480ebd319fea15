//! Collaborations
//!
//! Recurring cross-functional pairings that meet on some days. Each agent
//! remembers how its recent collaborations with every partner went, and a
//! pair's track record carries into the quality of their next meeting.

use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::{BTreeMap, VecDeque};

use super::messages::{CommunicationLog, MessageKind, Priority};
use crate::components::agent::{Agent, DynamicState, Personality, Role};
use crate::components::world::{AgentRoster, DayClock, Settings};
use crate::SimRng;
use org_events::CollaborationRecord;

/// Quality above which a collaboration counts as a success
pub const SUCCESS_QUALITY: f32 = 0.6;
/// Collaborations remembered per agent and partner
const HISTORY_LIMIT: usize = 20;
/// Latest collaborations averaged into a partner's recent quality
const RECENT_WINDOW: usize = 5;
/// Weight of the pair's track record in a new collaboration's quality
const TRACK_RECORD_WEIGHT: f32 = 0.3;

/// Standing pairings and what they work on
pub const COLLABORATION_PAIRS: [(Role, Role, &str); 9] = [
    (Role::Ceo, Role::Cfo, "strategic_budget_review"),
    (Role::Ceo, Role::Cto, "technology_strategy"),
    (Role::Cmo, Role::HeadOfSales, "go_to_market_alignment"),
    (Role::Cpo, Role::Cto, "product_development"),
    (Role::HrDirector, Role::Ceo, "organizational_development"),
    (Role::Clo, Role::Cfo, "compliance_and_risk"),
    (Role::Cdo, Role::Cpo, "data_driven_product_decisions"),
    (Role::CustomerSuccess, Role::HeadOfSales, "customer_lifecycle_management"),
    (Role::Coo, Role::Cto, "operational_efficiency"),
];

/// Quality of a collaboration from both participants' style and stress,
/// pulled toward the pair's past quality when they have worked together.
pub fn collaboration_quality(
    a: (&Personality, &DynamicState),
    b: (&Personality, &DynamicState),
    track_record: Option<f32>,
    noise: f32,
) -> f32 {
    let style = (a.0.collaboration_style + b.0.collaboration_style) / 2.0;
    let strain = (a.1.stress + b.1.stress) / 4.0;
    let fresh = style * (1.0 - strain);
    let blended = match track_record {
        Some(past) => (1.0 - TRACK_RECORD_WEIGHT) * fresh + TRACK_RECORD_WEIGHT * past,
        None => fresh,
    };
    (blended + noise).clamp(0.0, 1.0)
}

/// Per-agent memory of collaboration quality with each partner
#[derive(Resource, Debug, Default)]
pub struct CollaborationHistory {
    by_agent: BTreeMap<String, BTreeMap<String, VecDeque<f32>>>,
}

impl CollaborationHistory {
    pub fn record(&mut self, agent_id: &str, partner_id: &str, quality: f32) {
        let history = self
            .by_agent
            .entry(agent_id.to_string())
            .or_default()
            .entry(partner_id.to_string())
            .or_default();
        history.push_back(quality);
        while history.len() > HISTORY_LIMIT {
            history.pop_front();
        }
    }

    /// Qualities remembered for a partner, oldest first.
    pub fn with_partner(&self, agent_id: &str, partner_id: &str) -> impl Iterator<Item = f32> + '_ {
        self.by_agent
            .get(agent_id)
            .and_then(|partners| partners.get(partner_id))
            .into_iter()
            .flat_map(|history| history.iter().copied())
    }

    /// Mean quality of the latest collaborations with a partner.
    pub fn recent_quality(&self, agent_id: &str, partner_id: &str) -> Option<f32> {
        let history = self.by_agent.get(agent_id)?.get(partner_id)?;
        let recent: Vec<f32> = history.iter().rev().take(RECENT_WINDOW).copied().collect();
        if recent.is_empty() {
            return None;
        }
        Some(recent.iter().sum::<f32>() / recent.len() as f32)
    }

    /// Both sides' recent quality, averaged.
    pub fn track_record(&self, a: &str, b: &str) -> Option<f32> {
        match (self.recent_quality(a, b), self.recent_quality(b, a)) {
            (Some(x), Some(y)) => Some((x + y) / 2.0),
            (Some(x), None) | (None, Some(x)) => Some(x),
            (None, None) => None,
        }
    }

    pub fn partner_count(&self, agent_id: &str) -> usize {
        self.by_agent.get(agent_id).map_or(0, BTreeMap::len)
    }
}

/// Collaborations that happened today
#[derive(Resource, Debug, Default)]
pub struct CollaborationLog {
    pub records: Vec<CollaborationRecord>,
}

impl CollaborationLog {
    pub fn clear_day(&mut self) {
        self.records.clear();
    }

    pub fn success_rate(&self) -> Option<f32> {
        if self.records.is_empty() {
            None
        } else {
            let successes = self.records.iter().filter(|r| r.success).count();
            Some(successes as f32 / self.records.len() as f32)
        }
    }
}

/// System: roll each standing pairing and record the ones that meet
#[allow(clippy::too_many_arguments)]
pub fn run_collaborations(
    clock: Res<DayClock>,
    settings: Res<Settings>,
    roster: Res<AgentRoster>,
    mut log: ResMut<CollaborationLog>,
    mut history: ResMut<CollaborationHistory>,
    mut comms: ResMut<CommunicationLog>,
    mut rng: ResMut<SimRng>,
    agents: Query<(&Personality, &DynamicState), With<Agent>>,
) {
    let probability = settings.0.collaboration.daily_probability;

    for (first, second, collaboration_type) in COLLABORATION_PAIRS {
        let draw: f32 = rng.0.gen();
        if draw >= probability {
            continue;
        }

        let (Some(first_id), Some(second_id)) = (roster.agent_for(first), roster.agent_for(second)) else {
            continue;
        };
        let (Ok(first_entity), Ok(second_entity)) = (roster.entity(first_id), roster.entity(second_id)) else {
            continue;
        };
        let (Ok(a), Ok(b)) = (agents.get(first_entity), agents.get(second_entity)) else {
            continue;
        };

        let noise = rng.0.gen_range(-0.1..=0.1);
        let prior_quality = history.track_record(first_id, second_id);
        let quality = collaboration_quality(a, b, prior_quality, noise);
        history.record(first_id, second_id, quality);
        history.record(second_id, first_id, quality);

        comms.send(
            &mut rng.0,
            clock.day,
            first_id,
            second_id,
            MessageKind::CollaborationRequest,
            Priority::Medium,
            collaboration_type,
        );
        log.records.push(CollaborationRecord {
            participants: vec![first_id.to_string(), second_id.to_string()],
            collaboration_type: collaboration_type.to_string(),
            quality,
            success: quality > SUCCESS_QUALITY,
            prior_quality,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_drops_with_stress() {
        let personality = Personality::default();
        let calm = DynamicState {
            stress: 0.1,
            ..DynamicState::default()
        };
        let stressed = DynamicState {
            stress: 0.9,
            ..DynamicState::default()
        };

        let good = collaboration_quality((&personality, &calm), (&personality, &calm), None, 0.0);
        let bad = collaboration_quality((&personality, &stressed), (&personality, &stressed), None, 0.0);
        assert!(good > bad);
        assert!(good > SUCCESS_QUALITY);
    }

    #[test]
    fn test_quality_bounded() {
        let personality = Personality {
            collaboration_style: 1.0,
            ..Personality::default()
        };
        let state = DynamicState {
            stress: 0.0,
            ..DynamicState::default()
        };
        assert_eq!(collaboration_quality((&personality, &state), (&personality, &state), Some(1.0), 0.5), 1.0);
    }

    #[test]
    fn test_pairs_reference_distinct_roles() {
        for (a, b, _) in COLLABORATION_PAIRS {
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_success_rate() {
        let mut log = CollaborationLog::default();
        assert_eq!(log.success_rate(), None);
        log.records.push(CollaborationRecord {
            participants: vec!["ceo".into(), "cfo".into()],
            collaboration_type: "strategic_budget_review".into(),
            quality: 0.7,
            success: true,
            prior_quality: None,
        });
        log.records.push(CollaborationRecord {
            participants: vec!["cmo".into(), "sales".into()],
            collaboration_type: "go_to_market_alignment".into(),
            quality: 0.4,
            success: false,
            prior_quality: Some(0.5),
        });
        assert_eq!(log.success_rate(), Some(0.5));
    }

    #[test]
    fn test_track_record_pulls_quality() {
        let personality = Personality::default();
        let state = DynamicState::default();
        let fresh = collaboration_quality((&personality, &state), (&personality, &state), None, 0.0);
        let soured = collaboration_quality((&personality, &state), (&personality, &state), Some(0.0), 0.0);
        let warm = collaboration_quality((&personality, &state), (&personality, &state), Some(1.0), 0.0);

        assert!(soured < fresh);
        assert!(warm > fresh);
        assert!((fresh - soured - TRACK_RECORD_WEIGHT * fresh).abs() < 1e-6);
    }

    #[test]
    fn test_history_keeps_latest_twenty() {
        let mut history = CollaborationHistory::default();
        for i in 0..25 {
            history.record("cmo", "sales", i as f32 / 100.0);
        }

        let kept: Vec<f32> = history.with_partner("cmo", "sales").collect();
        assert_eq!(kept.len(), HISTORY_LIMIT);
        assert_eq!(kept[0], 0.05);
        let recent = history.recent_quality("cmo", "sales").unwrap();
        assert!((recent - 0.22).abs() < 1e-6);
        assert_eq!(history.with_partner("sales", "cmo").count(), 0);
    }

    #[test]
    fn test_track_record_combines_both_sides() {
        let mut history = CollaborationHistory::default();
        assert_eq!(history.track_record("ceo", "cfo"), None);

        history.record("ceo", "cfo", 0.8);
        assert_eq!(history.track_record("ceo", "cfo"), Some(0.8));
        assert_eq!(history.track_record("cfo", "ceo"), Some(0.8));

        history.record("cfo", "ceo", 0.4);
        assert!((history.track_record("ceo", "cfo").unwrap() - 0.6).abs() < 1e-6);
        assert_eq!(history.partner_count("ceo"), 1);
        assert_eq!(history.partner_count("cto"), 0);
    }

    #[test]
    fn test_meetings_feed_history() {
        use crate::config::SimConfig;
        use crate::setup::build_world;

        let mut config = SimConfig::default();
        config.collaboration.daily_probability = 1.0;
        let mut world = build_world(&config);
        let mut schedule = Schedule::default();
        schedule.add_systems(run_collaborations);

        schedule.run(&mut world);
        assert!(world.resource::<CollaborationLog>().records.iter().all(|r| r.prior_quality.is_none()));

        world.resource_mut::<CollaborationLog>().clear_day();
        schedule.run(&mut world);
        let log = world.resource::<CollaborationLog>();
        assert_eq!(log.records.len(), COLLABORATION_PAIRS.len());
        assert!(log.records.iter().all(|r| r.prior_quality.is_some()));

        let history = world.resource::<CollaborationHistory>();
        assert_eq!(history.with_partner("ceo", "cfo").count(), 2);
        assert_eq!(history.partner_count("cto"), 3);
    }
}
