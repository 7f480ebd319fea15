//! ECS Components
//!
//! Entity components for agents and the world-level resources shared by every system.

pub mod agent;
pub mod world;

pub use agent::*;
pub use world::*;
