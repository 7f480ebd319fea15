//! Market Event Types
//!
//! Externally supplied market events. Callers submit these at a tick
//! boundary and the engine applies them on the next tick.
//!
//! # Example
//!
//! ```
//! use org_events::{MarketEvent, MarketEventKind, Polarity};
//!
//! let event: MarketEvent = serde_json::from_str(
//!     r#"{"type": "competitive", "polarity": "negative", "severity": 0.7}"#,
//! ).unwrap();
//! assert_eq!(event.kind, MarketEventKind::Competitive);
//! assert_eq!(event.polarity, Polarity::Negative);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a market event. Each category moves a different mix of
/// customer segment values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketEventKind {
    Economic,
    Sector,
    Competitive,
    Technology,
    Regulatory,
}

impl fmt::Display for MarketEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketEventKind::Economic => write!(f, "economic"),
            MarketEventKind::Sector => write!(f, "sector"),
            MarketEventKind::Competitive => write!(f, "competitive"),
            MarketEventKind::Technology => write!(f, "technology"),
            MarketEventKind::Regulatory => write!(f, "regulatory"),
        }
    }
}

/// Direction of a market event's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// Sign applied to the nudge magnitude.
    pub fn sign(self) -> f32 {
        match self {
            Polarity::Positive => 1.0,
            Polarity::Negative => -1.0,
        }
    }
}

/// A market event. Severity is expected in [0, 1]; the engine validates it
/// before accepting the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    #[serde(rename = "type")]
    pub kind: MarketEventKind,
    pub polarity: Polarity,
    pub severity: f32,
    /// Free-text description, empty for injected events
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl MarketEvent {
    pub fn new(kind: MarketEventKind, polarity: Polarity, severity: f32) -> Self {
        Self {
            kind,
            polarity,
            severity,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Signed magnitude: severity with the polarity's sign.
    pub fn signed_severity(&self) -> f32 {
        self.polarity.sign() * self.severity
    }
}

/// A market event scheduled for injection before a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMarketEvent {
    /// Day whose tick should apply the event
    pub day: u64,
    pub event: MarketEvent,
}

/// Marketing campaign a caller can launch against the customer base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    BrandAwareness,
    ProductDemo,
    CustomerSuccess,
    PricingPromotion,
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignKind::BrandAwareness => write!(f, "brand_awareness"),
            CampaignKind::ProductDemo => write!(f, "product_demo"),
            CampaignKind::CustomerSuccess => write!(f, "customer_success"),
            CampaignKind::PricingPromotion => write!(f, "pricing_promotion"),
        }
    }
}
