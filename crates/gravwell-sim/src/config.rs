//! Session configuration.
//!
//! Everything a host may tune per run. Physics tuning stays in
//! `gravwell_core::constants`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use gravwell_core::constants::*;

/// Configuration errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for starting a new simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    /// Soft containment radius of the world.
    pub world_bounds: f64,
    /// Asteroids scattered in the initial belt.
    pub asteroid_count: usize,
    pub belt_inner: f64,
    pub belt_outer: f64,
    /// Starting planet capacity. Catastrophes shrink it during play.
    pub planet_limit: usize,
    /// Friendly ship cap. Hostile factions may field three times as many.
    pub ship_limit: usize,
    /// Upper bound of stations seeded on each starting planet.
    pub stations_per_planet: usize,
    pub spawn_player: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            world_bounds: WORLD_BOUNDS,
            asteroid_count: 1000,
            belt_inner: 5000.0,
            belt_outer: WORLD_BOUNDS * 0.9,
            planet_limit: PLANET_LIMIT,
            ship_limit: SHIP_LIMIT,
            stations_per_planet: 3,
            spawn_player: true,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.world_bounds.is_finite() && self.world_bounds > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "world_bounds must be positive, got {}",
                self.world_bounds
            )));
        }
        if !(self.belt_inner >= 0.0 && self.belt_inner < self.belt_outer) {
            return Err(ConfigError::Invalid(format!(
                "belt_inner ({}) must be below belt_outer ({})",
                self.belt_inner, self.belt_outer
            )));
        }
        if self.stations_per_planet == 0 {
            return Err(ConfigError::Invalid(
                "stations_per_planet must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Hostile ship cap.
    pub fn hostile_limit(&self) -> usize {
        self.ship_limit * HOSTILE_LIMIT_FACTOR
    }
}
