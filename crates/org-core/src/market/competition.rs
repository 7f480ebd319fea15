//! Competitive Landscape
//!
//! Market shares of the organization and its rivals. Shares drift a little
//! every tick; in a contraction the strong players take share from the weak.

use rand::Rng;

use org_events::CompetitorShare;

/// Name under which the simulated organization appears in the landscape
pub const OUR_COMPANY: &str = "our_company";

/// Largest random share change per tick
const SHARE_DRIFT: f32 = 0.02;
/// Share moved toward strong players per tick while GDP shrinks
const RECESSION_SHIFT: f32 = 0.01;
/// Strength above which a player gains share in a contraction
const STRONG_PLAYER: f32 = 0.7;
const MIN_SHARE: f32 = 0.01;
const MAX_SHARE: f32 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct Competitor {
    pub name: &'static str,
    pub share: f32,
    pub strength: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompetitiveLandscape {
    competitors: Vec<Competitor>,
}

impl Default for CompetitiveLandscape {
    fn default() -> Self {
        let competitor = |name, share, strength| Competitor { name, share, strength };
        Self {
            competitors: vec![
                competitor("market_leader", 0.35, 0.9),
                competitor("challenger_1", 0.25, 0.8),
                competitor("challenger_2", 0.20, 0.7),
                competitor(OUR_COMPANY, 0.05, 0.6),
                competitor("others", 0.15, 0.5),
            ],
        }
    }
}

impl CompetitiveLandscape {
    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn share_of(&self, name: &str) -> Option<f32> {
        self.competitors.iter().find(|c| c.name == name).map(|c| c.share)
    }

    /// Drifts every share and renormalizes. Takes one draw per competitor.
    pub fn update<R: Rng>(&mut self, gdp_growth: f32, rng: &mut R) {
        for competitor in &mut self.competitors {
            let mut change = rng.gen_range(-SHARE_DRIFT..=SHARE_DRIFT);
            if gdp_growth < 0.0 {
                if competitor.strength > STRONG_PLAYER {
                    change += RECESSION_SHIFT;
                } else {
                    change -= RECESSION_SHIFT;
                }
            }
            competitor.share = (competitor.share + change).clamp(MIN_SHARE, MAX_SHARE);
        }

        let total: f32 = self.competitors.iter().map(|c| c.share).sum();
        if total > 0.0 {
            for competitor in &mut self.competitors {
                competitor.share /= total;
            }
        }
    }

    pub fn snapshot(&self) -> Vec<CompetitorShare> {
        self.competitors
            .iter()
            .map(|c| CompetitorShare {
                name: c.name.to_string(),
                share: c.share,
                strength: c.strength,
            })
            .collect()
    }
}
