//! Economic Cycle
//!
//! Regime transition table and the indicator ranges each regime samples from.

use rand::Rng;

use org_events::{EconomicRegime, MarketIndicators};

/// One edge of the economic-cycle state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: EconomicRegime,
    pub to: EconomicRegime,
    pub probability: f32,
    pub trigger: &'static str,
}

const fn edge(from: EconomicRegime, to: EconomicRegime, probability: f32, trigger: &'static str) -> Transition {
    Transition {
        from,
        to,
        probability,
        trigger,
    }
}

/// Every allowed regime change. Outgoing probabilities of a regime sum to at
/// most 1; the remainder is the chance of staying put.
pub const TRANSITIONS: [Transition; 7] = [
    edge(EconomicRegime::Growth, EconomicRegime::Boom, 0.30, "strong performance"),
    edge(EconomicRegime::Growth, EconomicRegime::Stagnation, 0.20, "external shock"),
    edge(EconomicRegime::Boom, EconomicRegime::Recession, 0.40, "market correction"),
    edge(EconomicRegime::Recession, EconomicRegime::Recovery, 0.50, "stimulus"),
    edge(EconomicRegime::Recovery, EconomicRegime::Growth, 0.60, "sustained recovery"),
    edge(EconomicRegime::Stagnation, EconomicRegime::Growth, 0.40, "policy change"),
    edge(EconomicRegime::Stagnation, EconomicRegime::Recession, 0.30, "continued decline"),
];

/// Outgoing edges of `regime` in table order.
pub fn transitions_from(regime: EconomicRegime) -> impl Iterator<Item = &'static Transition> {
    TRANSITIONS.iter().filter(move |t| t.from == regime)
}

/// Whether the table allows moving from `from` to `to` in one tick.
pub fn is_allowed(from: EconomicRegime, to: EconomicRegime) -> bool {
    from == to || transitions_from(from).any(|t| t.to == to)
}

/// Resolves a uniform draw in [0, 1) against the outgoing edges of `current`.
///
/// The edges partition the unit interval in table order, so a regime with
/// several exits takes exactly one of them or stays.
pub fn select_transition(current: EconomicRegime, draw: f32) -> Option<&'static Transition> {
    let mut cumulative = 0.0;
    for transition in transitions_from(current) {
        cumulative += transition.probability;
        if draw < cumulative {
            return Some(transition);
        }
    }
    None
}

/// Closed ranges the indicators are sampled from while a regime is active
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRanges {
    pub gdp_growth: (f32, f32),
    pub unemployment: (f32, f32),
    pub sector_health: (f32, f32),
    pub interest_rate: (f32, f32),
}

pub fn indicator_ranges(regime: EconomicRegime) -> IndicatorRanges {
    match regime {
        EconomicRegime::Growth => IndicatorRanges {
            gdp_growth: (0.02, 0.04),
            unemployment: (0.03, 0.06),
            sector_health: (0.7, 0.9),
            interest_rate: (0.02, 0.06),
        },
        EconomicRegime::Boom => IndicatorRanges {
            gdp_growth: (0.04, 0.07),
            unemployment: (0.02, 0.04),
            sector_health: (0.8, 1.0),
            interest_rate: (0.01, 0.04),
        },
        EconomicRegime::Recession => IndicatorRanges {
            gdp_growth: (-0.03, 0.01),
            unemployment: (0.06, 0.12),
            sector_health: (0.3, 0.6),
            interest_rate: (0.0, 0.02),
        },
        EconomicRegime::Recovery => IndicatorRanges {
            gdp_growth: (0.01, 0.03),
            unemployment: (0.05, 0.08),
            sector_health: (0.6, 0.8),
            interest_rate: (0.01, 0.03),
        },
        EconomicRegime::Stagnation => IndicatorRanges {
            gdp_growth: (-0.01, 0.01),
            unemployment: (0.05, 0.07),
            sector_health: (0.5, 0.7),
            interest_rate: (0.02, 0.04),
        },
    }
}

/// Samples each indicator uniformly within the regime's ranges.
pub fn sample_indicators<R: Rng>(regime: EconomicRegime, rng: &mut R) -> MarketIndicators {
    let ranges = indicator_ranges(regime);
    let mut sample = |(low, high): (f32, f32)| rng.gen_range(low..=high);
    MarketIndicators {
        gdp_growth: sample(ranges.gdp_growth),
        unemployment_rate: sample(ranges.unemployment),
        sector_health: sample(ranges.sector_health),
        interest_rate: sample(ranges.interest_rate),
    }
}

/// Midpoint of each range, used before the first tick.
pub fn baseline_indicators(regime: EconomicRegime) -> MarketIndicators {
    let ranges = indicator_ranges(regime);
    let mid = |(low, high): (f32, f32)| (low + high) / 2.0;
    MarketIndicators {
        gdp_growth: mid(ranges.gdp_growth),
        unemployment_rate: mid(ranges.unemployment),
        sector_health: mid(ranges.sector_health),
        interest_rate: mid(ranges.interest_rate),
    }
}

/// Scale applied to daily revenue in each regime.
pub fn revenue_multiplier(regime: EconomicRegime) -> f64 {
    match regime {
        EconomicRegime::Recession => 0.7,
        EconomicRegime::Boom => 1.3,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_outgoing_probabilities_sum_to_at_most_one() {
        for regime in EconomicRegime::ALL {
            let total: f32 = transitions_from(regime).map(|t| t.probability).sum();
            assert!(total > 0.0, "{} has no exit", regime);
            assert!(total <= 1.0, "{} exits sum to {}", regime, total);
        }
    }

    #[test]
    fn test_transition_table_is_exhaustive() {
        use EconomicRegime::*;
        let expected = [
            (Growth, Boom),
            (Growth, Stagnation),
            (Boom, Recession),
            (Recession, Recovery),
            (Recovery, Growth),
            (Stagnation, Growth),
            (Stagnation, Recession),
        ];

        for from in EconomicRegime::ALL {
            for to in EconomicRegime::ALL {
                let listed = from == to || expected.contains(&(from, to));
                assert_eq!(is_allowed(from, to), listed, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_draw_partitions_edges_in_order() {
        let stagnation = EconomicRegime::Stagnation;

        assert_eq!(select_transition(stagnation, 0.1).map(|t| t.to), Some(EconomicRegime::Growth));
        assert_eq!(select_transition(stagnation, 0.5).map(|t| t.to), Some(EconomicRegime::Recession));
        assert!(select_transition(stagnation, 0.75).is_none());

        assert_eq!(
            select_transition(EconomicRegime::Boom, 0.39).map(|t| t.trigger),
            Some("market correction")
        );
        assert!(select_transition(EconomicRegime::Boom, 0.41).is_none());
    }

    #[test]
    fn test_samples_stay_in_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        for regime in EconomicRegime::ALL {
            let ranges = indicator_ranges(regime);
            for _ in 0..100 {
                let sample = sample_indicators(regime, &mut rng);
                assert!(sample.gdp_growth >= ranges.gdp_growth.0 && sample.gdp_growth <= ranges.gdp_growth.1);
                assert!(
                    sample.sector_health >= ranges.sector_health.0
                        && sample.sector_health <= ranges.sector_health.1
                );
            }
        }
    }
}
