//! Simulation engine for GRAVWELL.
//!
//! Owns the hecs ECS world, runs systems at a fixed tick rate,
//! and produces WorldSnapshots for whatever renders them.

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod spatial;
pub mod systems;
pub mod world_setup;

pub use config::{ConfigError, SimConfig};
pub use engine::SimulationEngine;
pub use error::SimError;
pub use gravwell_core as core;

#[cfg(test)]
mod tests;
