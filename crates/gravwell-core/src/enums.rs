//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Overall session phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    Active,
    Paused,
    /// Lives exhausted or home planet lost. The world keeps simulating.
    GameOver,
}

/// Behavior state of an AI combat unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiState {
    #[default]
    Formation,
    Combat,
}

/// Position of a unit in the squad hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SquadRole {
    Leader,
    Wingman,
    /// Stray without a leader or slots.
    #[default]
    Independent,
}

/// Coarse size/severity tag for explosion effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Small,
    Medium,
    Large,
    Catastrophic,
}

/// Variant of a shockwave ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShockwaveKind {
    /// Pushes bodies and units outward.
    #[default]
    Impulse,
    /// Destroys everything in its band except the originator.
    GodRing,
}

/// Discriminant of a celestial body, used in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyClass {
    Asteroid,
    Planet,
}

/// Discriminant of a combat unit, used in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitClass {
    Ship,
    Station,
    Player,
}

/// Why the player lost a life or the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Gunfire,
    Collision,
    /// Planet catastrophe took the home planet.
    HomeLost,
}
