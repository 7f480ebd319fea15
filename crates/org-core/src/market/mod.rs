//! Market Engine
//!
//! Economic-cycle state machine plus customer segment dynamics. Advancing one
//! tick consumes random draws in a fixed order: the regime transition draw,
//! the four indicator samples, three draws for each spontaneous event kind,
//! then one share drift per competitor.

pub mod campaign;
pub mod competition;
pub mod cycle;
pub mod segments;

use bevy_ecs::prelude::*;
use rand::Rng;
use tracing::{debug, info};

use crate::config::MarketConfig;
use crate::error::ValidationError;
use crate::SimRng;
use org_events::{
    CampaignRecord, EconomicRegime, MarketEvent, MarketEventKind, MarketIndicators, MarketSnapshot,
    Polarity, RegimeTransitionRecord,
};

pub use campaign::Campaign;
pub use competition::{CompetitiveLandscape, OUR_COMPANY};
pub use cycle::{Transition, TRANSITIONS};
pub use segments::{CustomerSegment, SegmentState};

/// Market state owned by the simulator
#[derive(Resource, Debug, Clone)]
pub struct MarketEngine {
    regime: EconomicRegime,
    /// Ticks spent in the current regime
    phase_duration: u32,
    indicators: MarketIndicators,
    segments: Vec<SegmentState>,
    /// Events waiting for the next tick
    pending: Vec<MarketEvent>,
    last_transition: Option<RegimeTransitionRecord>,
    last_applied: Vec<MarketEvent>,
    /// Campaigns waiting for the next tick
    campaigns: Vec<Campaign>,
    last_campaigns: Vec<CampaignRecord>,
    landscape: CompetitiveLandscape,
    pressure_decay: f32,
}

impl MarketEngine {
    pub fn new(config: &MarketConfig) -> Self {
        let regime = EconomicRegime::default();
        let indicators = cycle::baseline_indicators(regime);
        let mut segments: Vec<SegmentState> =
            CustomerSegment::ALL.into_iter().map(SegmentState::new).collect();
        for segment in &mut segments {
            segment.recompute_churn(&indicators);
        }

        Self {
            regime,
            phase_duration: 0,
            indicators,
            segments,
            pending: Vec::new(),
            last_transition: None,
            last_applied: Vec::new(),
            campaigns: Vec::new(),
            last_campaigns: Vec::new(),
            landscape: CompetitiveLandscape::default(),
            pressure_decay: config.event_pressure_decay,
        }
    }

    pub fn regime(&self) -> EconomicRegime {
        self.regime
    }

    pub fn indicators(&self) -> &MarketIndicators {
        &self.indicators
    }

    pub fn segments(&self) -> &[SegmentState] {
        &self.segments
    }

    pub fn pending_events(&self) -> &[MarketEvent] {
        &self.pending
    }

    pub fn landscape(&self) -> &CompetitiveLandscape {
        &self.landscape
    }

    pub fn pending_campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    pub fn last_transition(&self) -> Option<&RegimeTransitionRecord> {
        self.last_transition.as_ref()
    }

    pub fn mean_satisfaction(&self) -> f32 {
        if self.segments.is_empty() {
            return 0.0;
        }
        self.segments.iter().map(|s| s.satisfaction).sum::<f32>() / self.segments.len() as f32
    }

    /// Checks an externally supplied event before it can touch state.
    pub fn validate_event(event: &MarketEvent) -> Result<(), ValidationError> {
        if !event.severity.is_finite() || !(0.0..=1.0).contains(&event.severity) {
            return Err(ValidationError::new(
                "severity",
                format!("{} is outside [0, 1]", event.severity),
            ));
        }
        Ok(())
    }

    /// Queues an event for the next tick.
    pub fn inject(&mut self, event: MarketEvent) -> Result<(), ValidationError> {
        Self::validate_event(&event)?;
        debug!(kind = %event.kind, severity = event.severity, "market event queued");
        self.pending.push(event);
        Ok(())
    }

    /// Queues a campaign for the next tick.
    pub fn launch_campaign(&mut self, campaign: Campaign) {
        debug!(kind = %campaign.kind, target = ?campaign.target, "campaign queued");
        self.campaigns.push(campaign);
    }

    /// Advances the market by one tick.
    pub fn advance<R: Rng>(&mut self, rng: &mut R) {
        let draw: f32 = rng.gen();
        self.last_transition = cycle::select_transition(self.regime, draw).map(|t| {
            RegimeTransitionRecord {
                from: t.from,
                to: t.to,
                trigger: t.trigger.to_string(),
            }
        });
        match &self.last_transition {
            Some(record) => {
                info!(from = %record.from, to = %record.to, trigger = %record.trigger, "regime transition");
                self.regime = record.to;
                self.phase_duration = 1;
            }
            None => self.phase_duration += 1,
        }

        self.indicators = cycle::sample_indicators(self.regime, rng);

        for segment in &mut self.segments {
            segment.decay_pressure(self.pressure_decay);
        }
        self.last_applied = std::mem::take(&mut self.pending);
        for event in &self.last_applied {
            for segment in &mut self.segments {
                segment.apply_event(event);
            }
        }
        self.last_campaigns = std::mem::take(&mut self.campaigns)
            .iter()
            .map(|campaign| campaign.apply(&mut self.segments))
            .collect();

        for segment in &mut self.segments {
            segment.apply_indicators(&self.indicators);
            segment.recompute_churn(&self.indicators);
        }

        self.pending = derived_events(&self.indicators);
        let spontaneous = random_events(rng);
        for event in &spontaneous {
            info!(kind = %event.kind, polarity = ?event.polarity, severity = event.severity, "market event raised");
        }
        self.pending.extend(spontaneous);

        self.landscape.update(self.indicators.gdp_growth, rng);
        debug!(share = ?self.landscape.share_of(OUR_COMPANY), "market share");
    }

    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            regime: self.regime,
            phase_duration: self.phase_duration,
            transition: self.last_transition.clone(),
            indicators: self.indicators.clone(),
            segments: self.segments.iter().map(SegmentState::snapshot).collect(),
            events_applied: self.last_applied.clone(),
            events_pending: self.pending.clone(),
            competitors: self.landscape.snapshot(),
            campaigns: self.last_campaigns.clone(),
        }
    }
}

/// Events implied by the day's indicators, applied on the next tick.
fn derived_events(indicators: &MarketIndicators) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    if indicators.gdp_growth < 0.0 {
        let severity = (indicators.gdp_growth.abs() * 10.0).min(1.0);
        events.push(
            MarketEvent::new(MarketEventKind::Economic, Polarity::Negative, severity)
                .with_description("economic downturn"),
        );
    }
    if indicators.sector_health > 0.9 {
        let severity = ((indicators.sector_health - 0.5) * 2.0).min(1.0);
        events.push(
            MarketEvent::new(MarketEventKind::Sector, Polarity::Positive, severity)
                .with_description("sector boom"),
        );
    }
    events
}

/// A market event that can occur on any tick regardless of the indicators
struct SpontaneousEvent {
    kind: MarketEventKind,
    chance: f32,
    severity: (f32, f32),
    /// `None` when the event can cut either way
    polarity: Option<Polarity>,
    description: &'static str,
}

const SPONTANEOUS_EVENTS: [SpontaneousEvent; 3] = [
    SpontaneousEvent {
        kind: MarketEventKind::Competitive,
        chance: 0.1,
        severity: (0.2, 0.7),
        polarity: Some(Polarity::Negative),
        description: "major competitor launches new product",
    },
    SpontaneousEvent {
        kind: MarketEventKind::Technology,
        chance: 0.05,
        severity: (0.3, 0.8),
        polarity: None,
        description: "new technology disruption in market",
    },
    SpontaneousEvent {
        kind: MarketEventKind::Regulatory,
        chance: 0.03,
        severity: (0.1, 0.5),
        polarity: Some(Polarity::Negative),
        description: "new data privacy regulations announced",
    },
];

/// Rolls the spontaneous events. Every kind takes its chance, severity and
/// direction draws whether or not it fires.
fn random_events<R: Rng>(rng: &mut R) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    for spec in &SPONTANEOUS_EVENTS {
        let roll: f32 = rng.gen();
        let severity = rng.gen_range(spec.severity.0..=spec.severity.1);
        let upside: bool = rng.gen();
        if roll >= spec.chance {
            continue;
        }
        let polarity = spec.polarity.unwrap_or(if upside { Polarity::Positive } else { Polarity::Negative });
        events.push(MarketEvent::new(spec.kind, polarity, severity).with_description(spec.description));
    }
    events
}

/// System: advance the market one tick
pub fn advance_market(mut market: ResMut<MarketEngine>, mut rng: ResMut<SimRng>) {
    market.advance(&mut rng.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn engine() -> MarketEngine {
        MarketEngine::new(&MarketConfig::default())
    }

    #[test]
    fn test_starts_in_growth() {
        let market = engine();
        assert_eq!(market.regime(), EconomicRegime::Growth);
        assert_eq!(market.segments().len(), 4);
    }

    #[test]
    fn test_transitions_follow_table() {
        let mut market = engine();
        let mut rng = SmallRng::seed_from_u64(99);

        for _ in 0..500 {
            let before = market.regime();
            market.advance(&mut rng);
            assert!(cycle::is_allowed(before, market.regime()));
            if let Some(record) = market.last_transition() {
                assert_eq!(record.from, before);
                assert_ne!(record.from, record.to);
            }
        }
    }

    #[test]
    fn test_transition_sequence_reproducible() {
        let run = |seed: u64| {
            let mut market = engine();
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..50)
                .map(|_| {
                    market.advance(&mut rng);
                    market.regime()
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(1234), run(1234));
    }

    #[test]
    fn test_invalid_severity_rejected() {
        let mut market = engine();
        let event = MarketEvent::new(MarketEventKind::Competitive, Polarity::Negative, 1.5);

        assert!(market.inject(event).is_err());
        assert!(market.inject(MarketEvent::new(MarketEventKind::Sector, Polarity::Positive, f32::NAN)).is_err());
        assert!(market.pending_events().is_empty());
    }

    #[test]
    fn test_competitive_shock_raises_churn_next_tick() {
        let mut baseline = engine();
        let mut shocked = engine();
        shocked
            .inject(MarketEvent::new(MarketEventKind::Competitive, Polarity::Negative, 0.7))
            .unwrap();

        let mut rng_a = SmallRng::seed_from_u64(5);
        let mut rng_b = SmallRng::seed_from_u64(5);
        baseline.advance(&mut rng_a);
        shocked.advance(&mut rng_b);

        assert_eq!(baseline.regime(), shocked.regime());
        for (base, hit) in baseline.segments().iter().zip(shocked.segments()) {
            assert!(
                hit.churn_probability > base.churn_probability,
                "{} churn {} <= {}",
                hit.segment,
                hit.churn_probability,
                base.churn_probability
            );
        }
        assert_eq!(shocked.snapshot().events_applied.len(), 1);
    }

    #[test]
    fn test_phase_duration_counts_ticks() {
        let mut market = engine();
        let mut rng = SmallRng::seed_from_u64(3);
        market.advance(&mut rng);

        let snapshot = market.snapshot();
        assert!(snapshot.phase_duration >= 1);
    }

    #[test]
    fn test_spontaneous_event_rates() {
        let mut rng = SmallRng::seed_from_u64(2024);
        let ticks = 20_000;
        let mut counts = [0usize; 3];
        let mut technology_upside = 0;

        for _ in 0..ticks {
            for event in random_events(&mut rng) {
                let spec = SPONTANEOUS_EVENTS.iter().position(|s| s.kind == event.kind).unwrap();
                counts[spec] += 1;
                let (low, high) = SPONTANEOUS_EVENTS[spec].severity;
                assert!(event.severity >= low && event.severity <= high);
                match event.kind {
                    MarketEventKind::Technology => technology_upside += (event.polarity == Polarity::Positive) as usize,
                    _ => assert_eq!(event.polarity, Polarity::Negative),
                }
            }
        }

        for (spec, count) in SPONTANEOUS_EVENTS.iter().zip(counts) {
            let rate = count as f32 / ticks as f32;
            assert!((rate - spec.chance).abs() < 0.01, "{} fired at {}", spec.kind, rate);
        }
        assert!(technology_upside > 0 && technology_upside < counts[1]);
    }

    #[test]
    fn test_spontaneous_events_surface_in_snapshot() {
        let mut market = engine();
        let mut rng = SmallRng::seed_from_u64(8);
        let mut raised = 0;

        for _ in 0..100 {
            market.advance(&mut rng);
            raised += market
                .pending_events()
                .iter()
                .filter(|e| matches!(e.kind, MarketEventKind::Competitive | MarketEventKind::Regulatory))
                .count();
        }
        assert!(raised > 0);
    }

    #[test]
    fn test_landscape_reported_every_tick() {
        let mut market = engine();
        let mut rng = SmallRng::seed_from_u64(12);
        let initial = market.snapshot().competitors;
        market.advance(&mut rng);

        let after = market.snapshot().competitors;
        assert_eq!(after.len(), 5);
        assert_ne!(initial, after);
        let total: f32 = after.iter().map(|c| c.share).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_campaign_applied_next_tick_only() {
        let mut baseline = engine();
        let mut promoted = engine();
        promoted.launch_campaign(Campaign::new(
            org_events::CampaignKind::CustomerSuccess,
            Some(CustomerSegment::Enterprise),
        ));
        assert_eq!(promoted.pending_campaigns().len(), 1);

        let mut rng_a = SmallRng::seed_from_u64(6);
        let mut rng_b = SmallRng::seed_from_u64(6);
        baseline.advance(&mut rng_a);
        promoted.advance(&mut rng_b);

        let record = &promoted.snapshot().campaigns;
        assert_eq!(record.len(), 1);
        assert_eq!(record[0].segments_affected, 1);
        assert!(promoted.pending_campaigns().is_empty());
        for (base, lifted) in baseline.segments().iter().zip(promoted.segments()) {
            if lifted.segment == CustomerSegment::Enterprise {
                assert!(lifted.satisfaction > base.satisfaction);
                assert!(lifted.churn_probability < base.churn_probability);
            } else {
                assert_eq!(lifted.satisfaction, base.satisfaction);
            }
        }

        promoted.advance(&mut rng_b);
        assert!(promoted.snapshot().campaigns.is_empty());
    }

    #[test]
    fn test_derived_events() {
        let downturn = MarketIndicators {
            gdp_growth: -0.02,
            unemployment_rate: 0.1,
            sector_health: 0.4,
            interest_rate: 0.01,
        };
        let events = derived_events(&downturn);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MarketEventKind::Economic);
        assert!((events[0].severity - 0.2).abs() < 1e-6);

        let boom = MarketIndicators {
            gdp_growth: 0.05,
            unemployment_rate: 0.03,
            sector_health: 0.95,
            interest_rate: 0.02,
        };
        let events = derived_events(&boom);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].polarity, Polarity::Positive);
    }
}
