//! Economic Regime
//!
//! The tagged state of the market's economic cycle. The transition table that
//! moves between regimes lives in the engine; this crate only names the states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Economic regime of the simulated market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EconomicRegime {
    #[default]
    Growth,
    Boom,
    Recession,
    Recovery,
    Stagnation,
}

impl EconomicRegime {
    /// All regimes in declaration order.
    pub const ALL: [EconomicRegime; 5] = [
        EconomicRegime::Growth,
        EconomicRegime::Boom,
        EconomicRegime::Recession,
        EconomicRegime::Recovery,
        EconomicRegime::Stagnation,
    ];

    /// Returns true for regimes where the economy is contracting or flat.
    pub fn is_downturn(self) -> bool {
        matches!(self, EconomicRegime::Recession | EconomicRegime::Stagnation)
    }
}

impl fmt::Display for EconomicRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EconomicRegime::Growth => write!(f, "growth"),
            EconomicRegime::Boom => write!(f, "boom"),
            EconomicRegime::Recession => write!(f, "recession"),
            EconomicRegime::Recovery => write!(f, "recovery"),
            EconomicRegime::Stagnation => write!(f, "stagnation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_growth() {
        assert_eq!(EconomicRegime::default(), EconomicRegime::Growth);
    }

    #[test]
    fn test_serialization_matches_display() {
        for regime in EconomicRegime::ALL {
            let json = serde_json::to_string(&regime).unwrap();
            assert_eq!(json, format!("\"{}\"", regime));
        }
    }

    #[test]
    fn test_downturn_regimes() {
        assert!(EconomicRegime::Recession.is_downturn());
        assert!(EconomicRegime::Stagnation.is_downturn());
        assert!(!EconomicRegime::Boom.is_downturn());
    }
}
