//! Marketing Campaigns
//!
//! Campaigns lift satisfaction and loyalty in the segments they target and
//! report the acquisition potential they open up.

use org_events::{CampaignKind, CampaignRecord};

use super::segments::{CustomerSegment, SegmentState};

/// What a campaign adds to each targeted segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CampaignEffects {
    pub satisfaction: f32,
    pub loyalty: f32,
    pub acquisition: f32,
}

pub fn effects(kind: CampaignKind) -> CampaignEffects {
    let (satisfaction, loyalty, acquisition) = match kind {
        CampaignKind::BrandAwareness => (0.05, 0.03, 0.1),
        CampaignKind::ProductDemo => (0.1, 0.05, 0.15),
        CampaignKind::CustomerSuccess => (0.15, 0.1, 0.05),
        CampaignKind::PricingPromotion => (0.08, 0.02, 0.2),
    };
    CampaignEffects {
        satisfaction,
        loyalty,
        acquisition,
    }
}

/// A campaign waiting for the next tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Campaign {
    pub kind: CampaignKind,
    /// `None` runs the campaign across every segment
    pub target: Option<CustomerSegment>,
}

impl Campaign {
    pub fn new(kind: CampaignKind, target: Option<CustomerSegment>) -> Self {
        Self { kind, target }
    }

    /// Applies the campaign to the matching segments.
    pub fn apply(&self, segments: &mut [SegmentState]) -> CampaignRecord {
        let effects = effects(self.kind);
        let mut affected = 0;
        for segment in segments
            .iter_mut()
            .filter(|s| self.target.map_or(true, |target| s.segment == target))
        {
            segment.satisfaction = (segment.satisfaction + effects.satisfaction).min(1.0);
            segment.loyalty = (segment.loyalty + effects.loyalty).min(1.0);
            affected += 1;
        }

        CampaignRecord {
            campaign: self.kind,
            target_segment: self.target.map(|t| t.to_string()),
            segments_affected: affected,
            satisfaction_improvement: effects.satisfaction,
            loyalty_improvement: effects.loyalty,
            acquisition_potential: effects.acquisition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Vec<SegmentState> {
        CustomerSegment::ALL.into_iter().map(SegmentState::new).collect()
    }

    #[test]
    fn test_targeted_campaign_touches_one_segment() {
        let mut states = segments();
        let before = states.clone();

        let record = Campaign::new(CampaignKind::CustomerSuccess, Some(CustomerSegment::Startup)).apply(&mut states);

        assert_eq!(record.segments_affected, 1);
        assert_eq!(record.target_segment.as_deref(), Some("startup"));
        for (old, new) in before.iter().zip(&states) {
            if new.segment == CustomerSegment::Startup {
                assert!((new.satisfaction - old.satisfaction - 0.15).abs() < 1e-6);
                assert!((new.loyalty - old.loyalty - 0.1).abs() < 1e-6);
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn test_untargeted_campaign_reaches_all() {
        let mut states = segments();
        let record = Campaign::new(CampaignKind::PricingPromotion, None).apply(&mut states);

        assert_eq!(record.segments_affected, 4);
        assert_eq!(record.acquisition_potential, 0.2);
        assert!(record.target_segment.is_none());
    }

    #[test]
    fn test_satisfaction_capped() {
        let mut states = segments();
        for state in &mut states {
            state.satisfaction = 0.98;
        }
        Campaign::new(CampaignKind::ProductDemo, None).apply(&mut states);

        assert!(states.iter().all(|s| s.satisfaction == 1.0));
    }
}
