//! ECS components for hecs entities.
//!
//! Components are plain data. Game logic lives in systems; the few helpers
//! below only read fields.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::*;
use crate::types::EntityId;

/// Stable integer identity, the only handle other entities may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StableId(pub EntityId);

/// Position and velocity in world units (per tick).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub pos: DVec2,
    pub vel: DVec2,
}

impl Motion {
    pub fn new(pos: DVec2, vel: DVec2) -> Self {
        Self { pos, vel }
    }
}

// --- Celestial bodies ---

/// An asteroid or planet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub r: f64,
    /// Radius the body is growing toward.
    pub target_r: f64,
    pub mass: f64,
    /// Invulnerability ticks remaining.
    pub blink: u32,
    /// Explosion debris: passes through other rocks, burns up near planets.
    pub hot: bool,
    pub destroyed: bool,
    pub kind: BodyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyKind {
    Asteroid {
        /// Stable orbit radius around a capturing planet, in planet radii.
        ring_multiple: f64,
    },
    Planet(PlanetOrbit),
}

/// Elliptical rail and depth cycle of a planet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanetOrbit {
    pub center: DVec2,
    pub semi_major: f64,
    pub semi_minor: f64,
    pub eccentricity: f64,
    /// Orientation of the ellipse.
    pub rotation: f64,
    /// Current anomaly angle.
    pub angle: f64,
    /// Anomaly advance per tick at z = 0.
    pub angular_speed: f64,
    pub z: f64,
    /// Signed depth change per tick.
    pub z_speed: f64,
    /// Dwell ticks remaining at the near plane.
    pub z_wait: u32,
    /// Set once the station check ran during the current near-plane pass.
    pub station_checked: bool,
    pub is_home: bool,
    /// Hit points against squad-leader fire.
    pub hp: u32,
}

impl Body {
    pub fn mass_for(r: f64) -> f64 {
        r * r * MASS_PER_AREA
    }

    pub fn is_planet(&self) -> bool {
        matches!(self.kind, BodyKind::Planet(_))
    }

    pub fn is_giant(&self) -> bool {
        !self.is_planet() && self.r >= ASTEROID_MAX_SIZE
    }

    /// Depth layer. Asteroids always live on the near plane.
    pub fn z(&self) -> f64 {
        match self.kind {
            BodyKind::Planet(orbit) => orbit.z,
            BodyKind::Asteroid { .. } => 0.0,
        }
    }

    pub fn planet(&self) -> Option<&PlanetOrbit> {
        match &self.kind {
            BodyKind::Planet(orbit) => Some(orbit),
            BodyKind::Asteroid { .. } => None,
        }
    }

    pub fn planet_mut(&mut self) -> Option<&mut PlanetOrbit> {
        match &mut self.kind {
            BodyKind::Planet(orbit) => Some(orbit),
            BodyKind::Asteroid { .. } => None,
        }
    }
}

// --- Combat units ---

/// Projectile parameters of a unit's gun.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub bullet_speed: f64,
    pub bullet_size: f64,
    pub bullet_life: u32,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            bullet_speed: 18.0,
            bullet_size: 5.0,
            bullet_life: BULLET_PRIMARY_LIFETIME,
        }
    }
}

/// A ship or station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub hp: u32,
    /// Faction color; units of one hostile faction share it.
    pub hue: u16,
    pub friendly: bool,
    pub facing: f64,
    pub radius: f64,
    /// Ticks until the gun is ready.
    pub reload: f64,
    pub blink: u32,
    pub score: i64,
    pub tier: u32,
    pub weapon: WeaponStats,
    pub destroyed: bool,
    pub kind: UnitKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitKind {
    Ship(ShipBrain),
    Station(StationState),
}

/// One leader-relative formation position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquadSlot {
    /// (lateral, forward) in the leader's frame.
    pub offset: DVec2,
    pub occupant: Option<EntityId>,
}

/// AI memory of a ship. The player's ship carries one too, for its slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipBrain {
    pub state: AiState,
    pub role: SquadRole,
    pub leader: Option<EntityId>,
    /// Leaders only.
    pub slots: Vec<SquadSlot>,
    /// Offset of the slot this wingman is seated in.
    pub formation_offset: DVec2,
    pub home_station: Option<EntityId>,
    /// +1 or -1: direction of orbits and strafes.
    pub orbit_dir: f64,
    /// Asteroid currently on a collision course.
    pub danger: Option<EntityId>,
    /// Ticks the same danger has persisted.
    pub danger_ticks: u32,
    pub patrol_target: Option<DVec2>,
}

impl ShipBrain {
    pub fn with_slots() -> Vec<SquadSlot> {
        SQUAD_SLOT_OFFSETS
            .iter()
            .map(|&(x, y)| SquadSlot {
                offset: DVec2::new(x, y),
                occupant: None,
            })
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.slots.iter().filter(|s| s.occupant.is_some()).count()
    }
}

/// Orbit and production state of a station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationState {
    pub host: Option<EntityId>,
    pub orbit_distance: f64,
    pub orbit_angle: f64,
    pub orbit_speed: f64,
    /// Ticks until the next squad launch.
    pub spawn_timer: u32,
}

impl Unit {
    pub fn brain(&self) -> Option<&ShipBrain> {
        match &self.kind {
            UnitKind::Ship(brain) => Some(brain),
            UnitKind::Station(_) => None,
        }
    }

    pub fn brain_mut(&mut self) -> Option<&mut ShipBrain> {
        match &mut self.kind {
            UnitKind::Ship(brain) => Some(brain),
            UnitKind::Station(_) => None,
        }
    }

    pub fn is_station(&self) -> bool {
        matches!(self.kind, UnitKind::Station(_))
    }
}

/// Marks the player-controlled ship and holds its input latch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerControl {
    pub thrusting: bool,
    pub braking: bool,
    /// Turn applied each tick while held.
    pub turn_rate: f64,
    /// One-shot turn applied at the next tick.
    pub pending_turn: f64,
    pub fire_requested: bool,
    pub lives: u32,
    pub dead: bool,
    pub respawn_timer: u32,
    /// Set after shooting a friendly; allies turn hostile.
    pub lone_wolf: bool,
}

// --- Projectiles and effects ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub life: u32,
    pub size: f64,
    pub tier: u32,
    /// Used only for score attribution.
    pub owner: Option<EntityId>,
    pub hue: u16,
    pub friendly: bool,
    pub spent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shockwave {
    pub center: DVec2,
    pub r: f64,
    pub max_r: f64,
    pub alpha: f64,
    pub strength: f64,
    pub kind: ShockwaveKind,
    /// Spared by a god ring.
    pub owner: Option<EntityId>,
}
