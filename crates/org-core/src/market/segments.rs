//! Customer Segments
//!
//! Virtual customer segments whose satisfaction, loyalty and churn drift with
//! the economy and react to market events.

use serde::{Deserialize, Serialize};
use std::fmt;

use org_events::{MarketEvent, MarketEventKind, MarketIndicators, SegmentSnapshot};

/// Churn floor before any adjustments
const BASE_CHURN: f32 = 0.1;
const MIN_CHURN: f32 = 0.01;
const MAX_CHURN: f32 = 0.8;
/// Nudge to satisfaction/loyalty/expansion per unit of signed severity
const EVENT_NUDGE: f32 = 0.1;
/// Churn added per unit of negative event pressure
const PRESSURE_CHURN: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSegment {
    Enterprise,
    MidMarket,
    SmallBusiness,
    Startup,
}

impl CustomerSegment {
    pub const ALL: [CustomerSegment; 4] = [
        CustomerSegment::Enterprise,
        CustomerSegment::MidMarket,
        CustomerSegment::SmallBusiness,
        CustomerSegment::Startup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CustomerSegment::Enterprise => "enterprise",
            CustomerSegment::MidMarket => "mid_market",
            CustomerSegment::SmallBusiness => "small_business",
            CustomerSegment::Startup => "startup",
        }
    }

    /// Annual budget range of a typical customer.
    pub fn budget_range(self) -> (f64, f64) {
        match self {
            CustomerSegment::Enterprise => (100_000.0, 1_000_000.0),
            CustomerSegment::MidMarket => (25_000.0, 200_000.0),
            CustomerSegment::SmallBusiness => (5_000.0, 50_000.0),
            CustomerSegment::Startup => (1_000.0, 25_000.0),
        }
    }

    /// How strongly the segment reacts to the economy and to events.
    pub fn sensitivity(self) -> f32 {
        match self {
            CustomerSegment::Enterprise => 0.7,
            CustomerSegment::MidMarket => 1.0,
            CustomerSegment::SmallBusiness => 1.2,
            CustomerSegment::Startup => 1.5,
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moves a unit-interval value by `delta`, scaled by the headroom in that direction.
pub fn nudge(value: f32, delta: f32) -> f32 {
    let next = if delta >= 0.0 {
        value + delta.min(1.0) * (1.0 - value)
    } else {
        value + delta.max(-1.0) * value
    };
    next.clamp(0.0, 1.0)
}

/// Relative weight of an event kind on (satisfaction, loyalty, expansion, lifetime value)
fn event_weights(kind: MarketEventKind) -> (f32, f32, f32, f32) {
    match kind {
        MarketEventKind::Economic => (0.3, 0.3, 0.8, 0.5),
        MarketEventKind::Sector => (0.5, 0.2, 0.6, 0.3),
        MarketEventKind::Competitive => (0.6, 1.0, 0.3, 0.2),
        MarketEventKind::Technology => (0.7, 0.2, 0.5, 0.1),
        MarketEventKind::Regulatory => (0.4, 0.3, 0.2, 0.3),
    }
}

/// Evolving state of one customer segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentState {
    pub segment: CustomerSegment,
    pub satisfaction: f32,
    pub loyalty: f32,
    pub churn_probability: f32,
    pub lifetime_value: f64,
    pub expansion_potential: f32,
    /// Signed, decaying accumulation of recent event severity
    pub event_pressure: f32,
}

impl SegmentState {
    pub fn new(segment: CustomerSegment) -> Self {
        let (low, high) = segment.budget_range();
        let mut state = Self {
            segment,
            satisfaction: 0.6,
            loyalty: 0.45,
            churn_probability: 0.0,
            lifetime_value: (low + high) / 2.0 * 2.25,
            expansion_potential: 0.35,
            event_pressure: 0.0,
        };
        state.churn_probability = state.compute_churn(&MarketIndicators::default());
        state
    }

    /// Applies one market event, scaled by severity and signed by polarity.
    pub fn apply_event(&mut self, event: &MarketEvent) {
        let signed = event.signed_severity() * self.segment.sensitivity();
        let (w_satisfaction, w_loyalty, w_expansion, w_value) = event_weights(event.kind);

        self.satisfaction = nudge(self.satisfaction, signed * EVENT_NUDGE * w_satisfaction);
        self.loyalty = nudge(self.loyalty, signed * EVENT_NUDGE * w_loyalty);
        self.expansion_potential = nudge(self.expansion_potential, signed * EVENT_NUDGE * w_expansion);
        self.lifetime_value *= 1.0 + (signed * 0.05 * w_value) as f64;
        self.event_pressure += signed;
    }

    /// Drifts the segment with the day's indicators.
    pub fn apply_indicators(&mut self, indicators: &MarketIndicators) {
        let sensitivity = self.segment.sensitivity();
        self.satisfaction = nudge(self.satisfaction, (indicators.sector_health - 0.7) * 0.05 * sensitivity);
        self.loyalty = nudge(self.loyalty, indicators.gdp_growth * 0.5 * sensitivity);
        self.expansion_potential =
            nudge(self.expansion_potential, (indicators.sector_health - 0.6) * 0.05 * sensitivity);
        self.lifetime_value *= 1.0 + (indicators.gdp_growth * 0.1 * sensitivity) as f64;
    }

    pub fn decay_pressure(&mut self, decay: f32) {
        self.event_pressure *= decay;
    }

    fn compute_churn(&self, indicators: &MarketIndicators) -> f32 {
        let sensitivity = self.segment.sensitivity();
        let satisfaction_impact = (1.0 - self.satisfaction) * 0.3;
        let loyalty_impact = (1.0 - self.loyalty) * 0.2;
        let economy_impact = sensitivity
            * ((indicators.unemployment_rate - 0.05).max(0.0) + (-indicators.gdp_growth).max(0.0) * 2.0);
        let pressure_impact = -self.event_pressure * PRESSURE_CHURN;

        (BASE_CHURN + satisfaction_impact + loyalty_impact + economy_impact + pressure_impact)
            .clamp(MIN_CHURN, MAX_CHURN)
    }

    pub fn recompute_churn(&mut self, indicators: &MarketIndicators) {
        self.churn_probability = self.compute_churn(indicators);
    }

    pub fn snapshot(&self) -> SegmentSnapshot {
        let (budget_min, budget_max) = self.segment.budget_range();
        SegmentSnapshot {
            segment: self.segment.to_string(),
            budget_min,
            budget_max,
            satisfaction: self.satisfaction,
            loyalty: self.loyalty,
            churn_probability: self.churn_probability,
            lifetime_value: self.lifetime_value,
            expansion_potential: self.expansion_potential,
        }
    }
}
