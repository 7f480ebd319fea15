//! World Setup
//!
//! Agent spawning and the resources a fresh simulation starts with.

pub mod agents;
pub mod world;

pub use agents::*;
pub use world::*;
