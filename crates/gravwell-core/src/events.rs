//! Fire-and-forget notifications for audio and VFX collaborators.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::EntityId;

/// Events emitted during a tick and drained into the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// Something blew up at `pos`.
    Explosion { pos: DVec2, severity: Severity },
    /// A gun discharged.
    LaserFired { pos: DVec2, tier: u32 },
    /// A small rock was swallowed by a giant.
    SoftThud { pos: DVec2 },
    /// The home planet was destroyed. Terminal for the session.
    HomePlanetLost,
    StationDestroyed { id: EntityId, pos: DVec2 },
    ShipDestroyed { id: EntityId, pos: DVec2 },
    PlayerHit { hp_left: u32 },
    PlayerKilled { lives_left: u32, cause: DeathCause },
    PlayerRespawned,
    TierChanged { id: EntityId, tier: u32 },
    GodRing { pos: DVec2 },
    /// Friendly fire by the player turned the allied fleet hostile.
    Betrayal,
}
