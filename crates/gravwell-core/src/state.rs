//! World snapshot: the read-only view handed to renderers and HUDs after each tick.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::SimEvent;
use crate::types::{EntityId, SimTime};

/// Complete visible state after a tick. Lists are sorted by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub time: SimTime,
    pub phase: GamePhase,
    pub bodies: Vec<BodyView>,
    pub units: Vec<UnitView>,
    pub projectiles: Vec<ProjectileView>,
    pub shockwaves: Vec<ShockwaveView>,
    pub player: Option<PlayerView>,
    pub radar_range: f64,
    pub planet_limit: usize,
    pub events: Vec<SimEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyView {
    pub id: EntityId,
    pub class: BodyClass,
    pub pos: DVec2,
    pub vel: DVec2,
    pub r: f64,
    pub z: f64,
    pub hot: bool,
    pub blinking: bool,
    pub is_home: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitView {
    pub id: EntityId,
    pub class: UnitClass,
    pub pos: DVec2,
    pub vel: DVec2,
    pub facing: f64,
    pub radius: f64,
    pub hp: u32,
    pub hue: u16,
    pub friendly: bool,
    pub state: AiState,
    pub role: SquadRole,
    pub leader: Option<EntityId>,
    pub tier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: EntityId,
    pub pos: DVec2,
    pub vel: DVec2,
    pub size: f64,
    pub tier: u32,
    pub hue: u16,
    pub friendly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShockwaveView {
    pub center: DVec2,
    pub r: f64,
    pub alpha: f64,
    pub kind: ShockwaveKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: EntityId,
    pub lives: u32,
    pub hp: u32,
    pub score: i64,
    pub tier: u32,
    pub dead: bool,
    pub squad_size: usize,
}
