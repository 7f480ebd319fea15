//! Configuration loading for the simulator.
//!
//! All run settings are loaded from a TOML configuration file. Every section
//! has defaults, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::error::ValidationError;
use crate::negotiation::ResourceKind;

/// Complete simulator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub organization: OrganizationConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub resources: ResourcePoolConfig,
    #[serde(default)]
    pub agents: AgentConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub text_generation: TextGenerationConfig,
    #[serde(default)]
    pub collaboration: CollaborationConfig,
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Returns this configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every value the engine relies on. Runs before any state exists.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.organization.name.trim().is_empty() {
            return Err(ValidationError::new("organization.name", "must not be empty"));
        }
        check_non_negative("organization.initial_budget", self.organization.initial_budget)?;
        check_non_negative("organization.monthly_burn_rate", self.organization.monthly_burn_rate)?;
        check_unit(
            "organization.internal_event_probability",
            self.organization.internal_event_probability,
        )?;

        for kind in ResourceKind::ALL {
            let field = format!("resources.{}", kind);
            check_non_negative(&field, self.resources.amount(kind))?;
        }

        check_unit("agents.acceptance_threshold", self.agents.acceptance_threshold)?;
        check_unit("agents.workload_recovery_rate", self.agents.workload_recovery_rate)?;
        check_unit("agents.learning_rate", self.agents.learning_rate)?;
        if self.agents.min_tasks_per_day > self.agents.max_tasks_per_day {
            return Err(ValidationError::new(
                "agents.min_tasks_per_day",
                "must not exceed agents.max_tasks_per_day",
            ));
        }
        if self.agents.max_tasks_per_day == 0 {
            return Err(ValidationError::new("agents.max_tasks_per_day", "must be at least 1"));
        }

        check_unit("learning.similarity_threshold", self.learning.similarity_threshold)?;
        if !(self.learning.staleness_half_life_days.is_finite()
            && self.learning.staleness_half_life_days > 0.0)
        {
            return Err(ValidationError::new(
                "learning.staleness_half_life_days",
                "must be a positive number",
            ));
        }
        if !(self.learning.prior_strength.is_finite() && self.learning.prior_strength > 0.0) {
            return Err(ValidationError::new("learning.prior_strength", "must be a positive number"));
        }

        check_unit("market.event_pressure_decay", self.market.event_pressure_decay)?;

        if self.text_generation.timeout_ms == 0 {
            return Err(ValidationError::new("text_generation.timeout_ms", "must be at least 1"));
        }

        check_unit("collaboration.daily_probability", self.collaboration.daily_probability)?;
        Ok(())
    }
}

fn check_unit(field: &str, value: f32) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(field, format!("{} is outside [0, 1]", value)))
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(field, format!("{} must be a finite, non-negative amount", value)))
    }
}

/// Organization identity and starting finances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationConfig {
    pub name: String,
    pub initial_budget: f64,
    pub monthly_burn_rate: f64,
    /// Chance of an internal event (milestone, conflict, ...) on any day
    pub internal_event_probability: f32,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            name: "TechCorp AI Startup".to_string(),
            initial_budget: 1_000_000.0,
            monthly_burn_rate: 150_000.0,
            internal_event_probability: 0.1,
        }
    }
}

/// Advisory pacing for drivers of the simulator. The engine itself ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimulationSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl SimulationSpeed {
    /// Wall-clock pause a driver should insert between days.
    pub fn pause(self) -> Duration {
        match self {
            SimulationSpeed::Slow => Duration::from_millis(1000),
            SimulationSpeed::Normal => Duration::from_millis(250),
            SimulationSpeed::Fast => Duration::ZERO,
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub speed: SimulationSpeed,
    /// Number of snapshots retained in memory; the sink receives all of them
    pub history_limit: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            speed: SimulationSpeed::Normal,
            history_limit: 365,
        }
    }
}

/// Daily allowance of each shared resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePoolConfig {
    pub budget: f64,
    pub engineering_time: f64,
    pub marketing_budget: f64,
    pub data_resources: f64,
}

impl ResourcePoolConfig {
    pub fn amount(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Budget => self.budget,
            ResourceKind::EngineeringTime => self.engineering_time,
            ResourceKind::MarketingBudget => self.marketing_budget,
            ResourceKind::DataResources => self.data_resources,
        }
    }
}

impl Default for ResourcePoolConfig {
    fn default() -> Self {
        Self {
            budget: 60_000.0,
            engineering_time: 80.0,
            marketing_budget: 40_000.0,
            data_resources: 50.0,
        }
    }
}

/// Agent behavior tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Minimum acceptance propensity for a task to be taken on
    pub acceptance_threshold: f32,
    /// Fraction of workload shed at the start of each day
    pub workload_recovery_rate: f32,
    pub learning_rate: f32,
    /// Number of past experiences retrieved per decision
    pub memory_search_k: usize,
    pub min_tasks_per_day: usize,
    pub max_tasks_per_day: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.35,
            workload_recovery_rate: 0.5,
            learning_rate: 0.1,
            memory_search_k: 3,
            min_tasks_per_day: 1,
            max_tasks_per_day: 3,
        }
    }
}

/// Learning system tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Minimum cosine similarity for a past decision to count as evidence
    pub similarity_threshold: f32,
    /// Days after which a sample's weight halves
    pub staleness_half_life_days: f32,
    /// Effective sample count at which confidence reaches one half
    pub prior_strength: f32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            staleness_half_life_days: 21.0,
            prior_strength: 4.0,
        }
    }
}

/// Market engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Fraction of accumulated event pressure kept from one tick to the next
    pub event_pressure_decay: f32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            event_pressure_decay: 0.5,
        }
    }
}

/// External text-generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextGenerationConfig {
    pub timeout_ms: u64,
}

impl TextGenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TextGenerationConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Cross-agent collaboration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaborationConfig {
    pub daily_probability: f32,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            daily_probability: 0.3,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
