//! Intents pushed into the simulation by input translation.
//!
//! Intents are queued and applied to the player ship at the next tick boundary.

use serde::{Deserialize, Serialize};

/// All possible player actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    // --- Flight ---
    ThrustOn,
    ThrustOff,
    BrakeOn,
    BrakeOff,
    /// Turn once by `delta` radians.
    Rotate { delta: f64 },
    /// Face an absolute heading.
    SetHeading { angle: f64 },
    /// Hold a turn: -1 left, 0 none, +1 right.
    Turn { direction: f64 },

    // --- Weapons ---
    Fire,

    // --- Radar ---
    /// Step the radar zoom level by `delta`.
    Zoom { delta: i32 },

    // --- Simulation control ---
    Pause,
    Resume,
}
