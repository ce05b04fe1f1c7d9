//! ECS systems that operate on the simulation world each tick.
//!
//! Systems are plain functions over `&mut World` (or `&World` for read-only).
//! They do not own state; everything lives in components or is handed in by
//! the engine. Effects that would need a second borrow of the world are
//! collected into buffers and applied once the query has ended.

pub mod casualties;
pub mod cleanup;
pub mod collision;
pub mod kinematics;
pub mod movement;
pub mod player;
pub mod projectiles;
pub mod sanitize;
pub mod shockwave;
pub mod snapshot;
pub mod squad_ai;
pub mod stations;
pub mod weapons;

use glam::DVec2;

use gravwell_core::components::{Projectile, Shockwave};
use gravwell_core::types::EntityId;

use crate::world_setup::AsteroidSeed;

/// Entity creation requested mid-tick. Flushed after compaction so nothing
/// spawned this tick is iterated by the pass that requested it.
#[derive(Debug, Clone, PartialEq)]
pub enum Spawn {
    Asteroid(AsteroidSeed),
    Debris { center: DVec2, count: usize, hot: bool },
    Projectile { pos: DVec2, vel: DVec2, projectile: Projectile },
    Shockwave(Shockwave),
    Station { host: EntityId, friendly: bool },
}
