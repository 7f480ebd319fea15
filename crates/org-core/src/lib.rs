//! Organizational Simulation Engine
//!
//! Models an organization as a population of executive agents operating in a
//! simulated market, advanced one day at a time. The [`simulator::OrgSimulator`]
//! owns the ECS world and drives each day end-to-end.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod analytics;
pub mod components;
pub mod config;
pub mod crisis;
pub mod error;
pub mod internal_events;
pub mod learning;
pub mod market;
pub mod memory;
pub mod metrics;
pub mod negotiation;
pub mod output;
pub mod personality;
pub mod pipeline;
pub mod profiles;
pub mod setup;
pub mod simulator;
pub mod tasks;

pub use components::*;
pub use config::SimConfig;
pub use error::{SimError, SinkError, StateInvariantError, TextGenError, ValidationError};
pub use pipeline::textgen::{GenerationRequest, GenerationResponse, TemplateTextGenerator, TextGenerator};
pub use crisis::CrisisKind;
pub use output::{JsonlSnapshotSink, MemorySnapshotSink, SnapshotSink};
pub use simulator::{OrgSimulator, StopHandle};

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);
