//! Agent Components
//!
//! Components for individual agents: role, personality, dynamic state, experience.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::negotiation::ResourceKind;

/// Marker component identifying an entity as an agent
#[derive(Component, Debug, Clone, Default)]
pub struct Agent;

/// Unique identifier for an agent
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable name for an agent
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct AgentName(pub String);

/// Capability area a task draws on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskDomain {
    Strategy,
    Finance,
    Technology,
    Marketing,
    Operations,
    Product,
    Legal,
    Data,
    People,
    Sales,
    Customer,
}

impl TaskDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskDomain::Strategy => "strategy",
            TaskDomain::Finance => "finance",
            TaskDomain::Technology => "technology",
            TaskDomain::Marketing => "marketing",
            TaskDomain::Operations => "operations",
            TaskDomain::Product => "product",
            TaskDomain::Legal => "legal",
            TaskDomain::Data => "data",
            TaskDomain::People => "people",
            TaskDomain::Sales => "sales",
            TaskDomain::Customer => "customer",
        }
    }

    /// The personality trait that most helps execution in this domain.
    pub fn key_trait(self, personality: &Personality) -> f32 {
        match self {
            TaskDomain::Strategy => personality.leadership_assertiveness,
            TaskDomain::Finance | TaskDomain::Legal | TaskDomain::Data => {
                personality.analytical_approach
            }
            TaskDomain::Technology | TaskDomain::Product => personality.innovation_appetite,
            TaskDomain::Marketing | TaskDomain::Sales => personality.communication_directness,
            TaskDomain::Operations => personality.decision_speed,
            TaskDomain::People | TaskDomain::Customer => personality.collaboration_style,
        }
    }

    /// Shared resource a task in this domain draws from.
    pub fn resource(self) -> ResourceKind {
        match self {
            TaskDomain::Technology | TaskDomain::Product | TaskDomain::Operations => {
                ResourceKind::EngineeringTime
            }
            TaskDomain::Marketing | TaskDomain::Sales | TaskDomain::Customer => {
                ResourceKind::MarketingBudget
            }
            TaskDomain::Data => ResourceKind::DataResources,
            TaskDomain::Strategy | TaskDomain::Finance | TaskDomain::Legal | TaskDomain::People => {
                ResourceKind::Budget
            }
        }
    }
}

impl fmt::Display for TaskDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A kind of task a role regularly receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTemplate {
    pub task_type: &'static str,
    pub domain: TaskDomain,
}

const fn template(task_type: &'static str, domain: TaskDomain) -> TaskTemplate {
    TaskTemplate { task_type, domain }
}

/// Organizational role of an agent
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Ceo,
    Cfo,
    Cto,
    Cmo,
    Coo,
    Cpo,
    Clo,
    Cdo,
    HrDirector,
    HeadOfSales,
    CustomerSuccess,
}

impl Role {
    /// Every role in roster order.
    pub const ALL: [Role; 11] = [
        Role::Ceo,
        Role::Cfo,
        Role::Cto,
        Role::Cmo,
        Role::Coo,
        Role::Cpo,
        Role::Clo,
        Role::Cdo,
        Role::HrDirector,
        Role::HeadOfSales,
        Role::CustomerSuccess,
    ];

    /// Stable agent identifier for the role.
    pub fn agent_id(self) -> &'static str {
        match self {
            Role::Ceo => "ceo",
            Role::Cfo => "cfo",
            Role::Cto => "cto",
            Role::Cmo => "cmo",
            Role::Coo => "coo",
            Role::Cpo => "cpo",
            Role::Clo => "clo",
            Role::Cdo => "cdo",
            Role::HrDirector => "hr",
            Role::HeadOfSales => "sales",
            Role::CustomerSuccess => "customer_success",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Role::Ceo => "CEO",
            Role::Cfo => "CFO",
            Role::Cto => "CTO",
            Role::Cmo => "CMO",
            Role::Coo => "COO",
            Role::Cpo => "CPO",
            Role::Clo => "CLO",
            Role::Cdo => "CDO",
            Role::HrDirector => "HR Director",
            Role::HeadOfSales => "Head of Sales",
            Role::CustomerSuccess => "Customer Success Manager",
        }
    }

    pub fn department(self) -> &'static str {
        match self {
            Role::Ceo => "Executive",
            Role::Cfo => "Finance",
            Role::Cto => "Technology",
            Role::Cmo => "Marketing",
            Role::Coo => "Operations",
            Role::Cpo => "Product",
            Role::Clo => "Legal",
            Role::Cdo => "Data & Analytics",
            Role::HrDirector => "Human Resources",
            Role::HeadOfSales => "Sales",
            Role::CustomerSuccess => "Customer Success",
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Role::Ceo => "Alex Thompson",
            Role::Cfo => "Sarah Chen",
            Role::Cto => "Marcus Rodriguez",
            Role::Cmo => "Diana Park",
            Role::Coo => "Michael Chang",
            Role::Cpo => "Elena Rodriguez",
            Role::Clo => "David Mitchell",
            Role::Cdo => "Dr. Priya Sharma",
            Role::HrDirector => "Rebecca Johnson",
            Role::HeadOfSales => "James Carter",
            Role::CustomerSuccess => "Rachel Kim",
        }
    }

    /// Seniority used to rank contested resource claims (higher wins).
    pub fn seniority(self) -> u8 {
        match self {
            Role::Ceo => 4,
            Role::Coo => 3,
            Role::Cfo | Role::Cto | Role::Cmo | Role::Cpo | Role::Clo | Role::Cdo => 2,
            Role::HrDirector | Role::HeadOfSales | Role::CustomerSuccess => 1,
        }
    }

    /// Units of task complexity the agent can carry at full workload.
    pub fn capacity_units(self) -> f32 {
        match self {
            Role::Ceo | Role::Cpo => 15.0,
            Role::Cto | Role::Coo | Role::Cdo => 14.0,
            Role::HeadOfSales => 13.0,
            Role::Cfo | Role::Cmo | Role::Clo | Role::HrDirector | Role::CustomerSuccess => 12.0,
        }
    }

    /// Starting personality, the shared baseline with role overrides.
    pub fn personality(self) -> Personality {
        let base = Personality::default();
        match self {
            Role::Ceo => Personality {
                risk_tolerance: 0.7,
                leadership_assertiveness: 0.9,
                decision_speed: 0.8,
                innovation_appetite: 0.8,
                ..base
            },
            Role::Cfo => Personality {
                risk_tolerance: 0.3,
                analytical_approach: 0.9,
                decision_speed: 0.6,
                innovation_appetite: 0.4,
                ..base
            },
            Role::Cto => Personality {
                innovation_appetite: 0.9,
                analytical_approach: 0.8,
                risk_tolerance: 0.6,
                adaptability: 0.8,
                ..base
            },
            Role::Cmo => Personality {
                innovation_appetite: 0.8,
                collaboration_style: 0.8,
                communication_directness: 0.7,
                adaptability: 0.7,
                ..base
            },
            Role::HrDirector => Personality {
                collaboration_style: 0.9,
                communication_directness: 0.6,
                leadership_assertiveness: 0.6,
                adaptability: 0.8,
                ..base
            },
            _ => base,
        }
    }

    /// The three kinds of task the role receives.
    pub fn task_templates(self) -> [TaskTemplate; 3] {
        use TaskDomain::*;
        match self {
            Role::Ceo => [
                template("strategic_review", Strategy),
                template("stakeholder_meeting", Strategy),
                template("team_alignment", People),
            ],
            Role::Cfo => [
                template("financial_analysis", Finance),
                template("cash_flow_management", Finance),
                template("investor_relations", Strategy),
            ],
            Role::Cto => [
                template("technical_planning", Technology),
                template("team_management", People),
                template("architecture_review", Technology),
            ],
            Role::Cmo => [
                template("campaign_optimization", Marketing),
                template("market_research", Data),
                template("brand_management", Marketing),
            ],
            Role::Coo => [
                template("operations_review", Operations),
                template("vendor_management", Operations),
                template("quality_assurance", Operations),
            ],
            Role::Cpo => [
                template("product_strategy", Product),
                template("user_research", Customer),
                template("competitive_analysis", Product),
            ],
            Role::Clo => [
                template("legal_review", Legal),
                template("risk_assessment", Legal),
                template("policy_development", Legal),
            ],
            Role::Cdo => [
                template("data_strategy", Data),
                template("analytics_project", Data),
                template("data_governance", Data),
            ],
            Role::HrDirector => [
                template("talent_management", People),
                template("culture_assessment", People),
                template("performance_review", People),
            ],
            Role::HeadOfSales => [
                template("pipeline_review", Sales),
                template("team_performance", Sales),
                template("customer_meetings", Sales),
            ],
            Role::CustomerSuccess => [
                template("customer_health", Customer),
                template("churn_prevention", Customer),
                template("expansion_opportunities", Sales),
            ],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Agent personality traits
/// All values are 0.0 to 1.0
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Willingness to take on difficult, uncertain work
    pub risk_tolerance: f32,
    pub collaboration_style: f32,
    pub decision_speed: f32,
    pub innovation_appetite: f32,
    pub communication_directness: f32,
    pub analytical_approach: f32,
    pub adaptability: f32,
    /// Weight behind the agent's claims in negotiation
    pub leadership_assertiveness: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            risk_tolerance: 0.5,
            collaboration_style: 0.7,
            decision_speed: 0.6,
            innovation_appetite: 0.8,
            communication_directness: 0.6,
            analytical_approach: 0.7,
            adaptability: 0.5,
            leadership_assertiveness: 0.6,
        }
    }
}

impl Personality {
    /// Named trait values in declaration order.
    pub fn traits(&self) -> [(&'static str, f32); 8] {
        [
            ("risk_tolerance", self.risk_tolerance),
            ("collaboration_style", self.collaboration_style),
            ("decision_speed", self.decision_speed),
            ("innovation_appetite", self.innovation_appetite),
            ("communication_directness", self.communication_directness),
            ("analytical_approach", self.analytical_approach),
            ("adaptability", self.adaptability),
            ("leadership_assertiveness", self.leadership_assertiveness),
        ]
    }

    /// Short natural-language summary passed to the text generator.
    pub fn summary(&self) -> String {
        let describe = |value: f32, high: &str, low: &str| {
            if value >= 0.7 {
                Some(high.to_string())
            } else if value <= 0.35 {
                Some(low.to_string())
            } else {
                None
            }
        };

        let parts: Vec<String> = [
            describe(self.risk_tolerance, "risk-seeking", "risk-averse"),
            describe(self.collaboration_style, "collaborative", "independent"),
            describe(self.decision_speed, "decisive", "deliberate"),
            describe(self.innovation_appetite, "innovative", "traditional"),
            describe(self.analytical_approach, "analytical", "intuitive"),
            describe(self.leadership_assertiveness, "assertive", "deferential"),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            "balanced".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Mutable per-agent state that evolves with outcomes
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicState {
    /// 0.0 to 1.0
    pub stress: f32,
    /// 0.0 to 1.0
    pub confidence: f32,
    /// Fraction of capacity in use, 0.0 to 1.0
    pub workload: f32,
    /// Smoothed confidence/stress trend, -1.0 to 1.0
    pub mood: f32,
}

impl Default for DynamicState {
    fn default() -> Self {
        Self {
            stress: 0.3,
            confidence: 0.7,
            workload: 0.0,
            mood: 0.0,
        }
    }
}

/// Rolling window of recent outcomes plus the agent's learning rate
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceCounters {
    window: VecDeque<bool>,
    pub learning_rate: f32,
}

impl ExperienceCounters {
    /// Number of outcomes remembered by the rolling counters.
    pub const WINDOW: usize = 20;

    pub fn new(learning_rate: f32) -> Self {
        Self {
            window: VecDeque::with_capacity(Self::WINDOW),
            learning_rate,
        }
    }

    pub fn record(&mut self, success: bool) {
        if self.window.len() == Self::WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(success);
    }

    pub fn recent_successes(&self) -> u32 {
        self.window.iter().filter(|s| **s).count() as u32
    }

    pub fn recent_failures(&self) -> u32 {
        self.window.iter().filter(|s| !**s).count() as u32
    }

    /// Fraction of recent outcomes that were successes, 0 with no history.
    pub fn success_ratio(&self) -> f32 {
        let total = self.window.len();
        if total == 0 {
            0.0
        } else {
            self.recent_successes() as f32 / total as f32
        }
    }
}

impl Default for ExperienceCounters {
    fn default() -> Self {
        Self::new(0.1)
    }
}
