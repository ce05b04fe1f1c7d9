//! Entity spawn factories for setting up and feeding the simulation world.
//!
//! Every factory goes through the `Registry` so the new entity gets a stable
//! id. Population caps are the caller's business except where noted.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec2;
use hecs::{EntityBuilder, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use gravwell_core::components::*;
use gravwell_core::constants::*;
use gravwell_core::enums::*;
use gravwell_core::types::{unit, EntityId};

use crate::config::SimConfig;
use crate::registry::Registry;

/// Ids of the entities created by `setup_world`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldSetup {
    pub home: Option<EntityId>,
    pub player: Option<EntityId>,
}

/// Everything needed to create one asteroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsteroidSeed {
    pub pos: DVec2,
    pub vel: DVec2,
    pub r: f64,
    pub blink: u32,
    pub hot: bool,
}

impl AsteroidSeed {
    pub fn new(pos: DVec2, vel: DVec2, r: f64) -> Self {
        Self {
            pos,
            vel,
            r,
            blink: 0,
            hot: false,
        }
    }
}

/// Build the starting world: home planet, asteroid belt, stations on every
/// planet, and the player ship.
pub fn setup_world(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    config: &SimConfig,
) -> WorldSetup {
    let home = spawn_home_planet(world, registry, rng, config.world_bounds);

    spawn_belt(
        world,
        registry,
        rng,
        DVec2::ZERO,
        config.belt_inner,
        config.belt_outer,
        config.asteroid_count,
        config,
    );

    let planets: Vec<(EntityId, bool)> = world
        .query::<(&StableId, &Body)>()
        .iter()
        .filter_map(|(_, (id, body))| body.planet().map(|orbit| (id.0, orbit.is_home)))
        .collect();
    for (planet, is_home) in planets {
        let count = rng.gen_range(1..=config.stations_per_planet);
        for _ in 0..count {
            spawn_station(world, registry, rng, planet, is_home);
        }
    }

    let player = config.spawn_player.then(|| {
        let home_pos = registry
            .get(home)
            .and_then(|e| world.get::<&Motion>(e).ok().map(|m| m.pos))
            .unwrap_or_default();
        spawn_player(world, registry, player_spawn_point(home_pos, ASTEROID_MAX_SIZE))
    });

    log::info!(
        "world ready: {} entities, home planet {}",
        registry.len(),
        home
    );

    WorldSetup {
        home: Some(home),
        player,
    }
}

/// Respawn point clear of a planet's surface.
pub fn player_spawn_point(planet_pos: DVec2, planet_r: f64) -> DVec2 {
    planet_pos + DVec2::new(0.0, planet_r * PLAYER_ORBIT_RING_FACTOR + SHIP_RADIUS)
}

/// Live, non-destroyed planets.
pub fn planet_count(world: &World) -> usize {
    world
        .query::<&Body>()
        .iter()
        .filter(|(_, b)| b.is_planet() && !b.destroyed)
        .count()
}

/// Live AI ships per side: (friendly, hostile).
pub fn ship_counts(world: &World) -> (usize, usize) {
    world
        .query::<(&Unit, Option<&PlayerControl>)>()
        .iter()
        .filter(|(_, (u, player))| player.is_none() && !u.is_station() && !u.destroyed)
        .fold((0, 0), |(f, h), (_, (u, _))| {
            if u.friendly {
                (f + 1, h)
            } else {
                (f, h + 1)
            }
        })
}

// --- Celestial bodies ---

fn asteroid_body(rng: &mut ChaCha8Rng, r: f64, blink: u32, hot: bool) -> Body {
    Body {
        r,
        target_r: r,
        mass: Body::mass_for(r),
        blink,
        hot,
        destroyed: false,
        kind: BodyKind::Asteroid {
            ring_multiple: STABLE_RING_MIN + rng.gen::<f64>() * STABLE_RING_SPREAD,
        },
    }
}

/// Drift velocity of a freshly created rock.
pub fn drift_velocity(rng: &mut ChaCha8Rng) -> DVec2 {
    let mut axis = || {
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        (0.1 + rng.gen::<f64>() * 5.0 / TICK_RATE as f64) * sign
    };
    DVec2::new(axis(), axis())
}

/// Create an asteroid. Oversized seeds become planets (orbiting inside
/// `promote_within` bounds) when given, otherwise they are clamped to the
/// asteroid size cap.
pub fn spawn_asteroid(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    seed: AsteroidSeed,
    promote_within: Option<f64>,
) -> EntityId {
    if seed.r > ASTEROID_MAX_SIZE {
        if let Some(bounds) = promote_within {
            return spawn_planet(world, registry, rng, seed.pos, seed.r, bounds);
        }
        log::debug!("planet limit reached, clamping r={:.0} rock", seed.r);
    }
    let r = seed.r.min(ASTEROID_MAX_SIZE);
    let mut builder = EntityBuilder::new();
    builder
        .add(Motion::new(seed.pos, seed.vel))
        .add(asteroid_body(rng, r, seed.blink, seed.hot));
    registry.spawn(world, &mut builder)
}

/// Elliptical rail for a planet currently at `pos`. The ellipse is sized so
/// the rail passes through `pos`, which keeps the first tick continuous.
pub fn planet_orbit(rng: &mut ChaCha8Rng, pos: DVec2, bounds: f64) -> PlanetOrbit {
    let mut center =
        unit(rng.gen::<f64>() * TAU) * rng.gen::<f64>() * bounds * PLANET_CENTER_SPREAD;
    let eccentricity: f64 = rng.gen_range(0.1..0.7);
    let rotation = rng.gen::<f64>() * TAU;
    let squash = (1.0 - eccentricity * eccentricity).sqrt();

    let mut local = DVec2::from_angle(-rotation).rotate(pos - center);
    let mut semi_major = (local.x * local.x + (local.y / squash).powi(2)).sqrt();
    if semi_major < PLANET_MIN_SEMI_MAJOR {
        // Too tight: move the centre so `pos` sits on the major-axis vertex.
        semi_major = PLANET_MIN_SEMI_MAJOR;
        local = DVec2::new(semi_major, 0.0);
        center = pos - DVec2::from_angle(rotation).rotate(local);
    }
    let semi_minor = semi_major * squash;
    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    PlanetOrbit {
        center,
        semi_major,
        semi_minor,
        eccentricity,
        rotation,
        angle: (local.y / semi_minor).atan2(local.x / semi_major),
        angular_speed: PLANET_BASE_ORBIT_SPEED / semi_major * sign,
        z: 0.0,
        z_speed: rng.gen_range(0.0005..0.0015),
        z_wait: 0,
        station_checked: true,
        is_home: false,
        hp: PLANET_HP,
    }
}

/// Turn an existing body into a planet on a fresh rail. The station check is
/// left armed so the new world gets a garrison on its first near-plane tick.
pub fn promote_to_planet(body: &mut Body, rng: &mut ChaCha8Rng, pos: DVec2, bounds: f64) {
    let mut orbit = planet_orbit(rng, pos, bounds);
    orbit.station_checked = false;
    body.kind = BodyKind::Planet(orbit);
    body.hot = false;
}

pub fn spawn_planet(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    pos: DVec2,
    r: f64,
    bounds: f64,
) -> EntityId {
    let r = r.min(PLANET_MAX_SIZE);
    let body = Body {
        r,
        target_r: r,
        mass: Body::mass_for(r),
        blink: 0,
        hot: false,
        destroyed: false,
        kind: BodyKind::Planet(planet_orbit(rng, pos, bounds)),
    };
    let mut builder = EntityBuilder::new();
    builder.add(Motion::new(pos, DVec2::ZERO)).add(body);
    let id = registry.spawn(world, &mut builder);
    log::debug!("planet {id} created (r={r:.0})");
    id
}

/// The player's home world: near the origin, never leaving the near plane.
pub fn spawn_home_planet(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    bounds: f64,
) -> EntityId {
    let pos = DVec2::new(rng.gen_range(-2500.0..2500.0), rng.gen_range(-2500.0..2500.0));
    let mut orbit = planet_orbit(rng, pos, bounds);
    orbit.z_speed = 0.0;
    orbit.is_home = true;
    let r = ASTEROID_MAX_SIZE + 1.0;
    let body = Body {
        r,
        target_r: r,
        mass: Body::mass_for(r),
        blink: 0,
        hot: false,
        destroyed: false,
        kind: BodyKind::Planet(orbit),
    };
    let mut builder = EntityBuilder::new();
    builder.add(Motion::new(pos, DVec2::ZERO)).add(body);
    registry.spawn(world, &mut builder)
}

/// Scatter a ring of rocks with a slight tangential drift.
#[allow(clippy::too_many_arguments)]
pub fn spawn_belt(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    center: DVec2,
    inner: f64,
    outer: f64,
    count: usize,
    config: &SimConfig,
) {
    for _ in 0..count {
        let angle = rng.gen::<f64>() * TAU;
        let dist = rng.gen_range(inner..outer);
        let r = if rng.gen_bool(0.5) { 0.5 } else { 0.25 } * ASTEROID_MAX_SIZE;
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let vel = drift_velocity(rng) + unit(angle + FRAC_PI_2) * rng.gen_range(0.2..0.5) * sign;
        let room = planet_count(world) < config.planet_limit;
        spawn_asteroid(
            world,
            registry,
            rng,
            AsteroidSeed::new(center + unit(angle) * dist, vel, r),
            room.then_some(config.world_bounds),
        );
    }
}

/// Drop `count` rocks of random size around `center`.
pub fn spawn_cluster(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    center: DVec2,
    spread: f64,
    count: usize,
) -> Vec<EntityId> {
    (0..count)
        .map(|_| {
            let pos = center + unit(rng.gen::<f64>() * TAU) * rng.gen::<f64>() * spread;
            let r = rng.gen_range(ASTEROID_MIN_SIZE..ASTEROID_MAX_SIZE);
            let vel = drift_velocity(rng);
            spawn_asteroid(world, registry, rng, AsteroidSeed::new(pos, vel, r), None)
        })
        .collect()
}

/// Explosion debris flung outward from `center`. Hot debris flies twice as
/// fast and passes through other rocks.
pub fn spawn_debris(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    center: DVec2,
    count: usize,
    hot: bool,
) {
    let speed_base = ASTEROID_MAX_SPEED * if hot { 4.0 } else { 2.0 };
    for _ in 0..count {
        let dir = unit(rng.gen::<f64>() * TAU);
        let pos = center + dir * rng.gen::<f64>() * DEBRIS_SCATTER;
        let r = rng.gen_range(ASTEROID_MIN_SIZE..ASTEROID_MAX_SIZE * 0.5);
        let vel = dir * rng.gen_range(0.5..1.0) * speed_base;
        let seed = AsteroidSeed {
            pos,
            vel,
            r,
            blink: DEBRIS_BLINK_TICKS,
            hot,
        };
        spawn_asteroid(world, registry, rng, seed, None);
    }
}

// --- Combat units ---

fn faction_hue(rng: &mut ChaCha8Rng, friendly: bool) -> u16 {
    if friendly {
        FRIENDLY_HUE
    } else {
        // 260..=519 wrapped keeps hostiles out of the blue band.
        ((rng.gen_range(0..260) + 260) % 360) as u16
    }
}

/// Place a station in orbit around `host`. Returns `None` if the host is
/// not a live planet.
pub fn spawn_station(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    host: EntityId,
    friendly: bool,
) -> Option<EntityId> {
    let entity = registry.get(host)?;
    let (host_pos, host_vel, host_r) = {
        let motion = world.get::<&Motion>(entity).ok()?;
        let body = world.get::<&Body>(entity).ok()?;
        if !body.is_planet() || body.destroyed {
            return None;
        }
        (motion.pos, motion.vel, body.r)
    };

    let orbit_distance = host_r * (1.0 + STATION_ORBIT_FACTOR) + STATION_RADIUS;
    let orbit_angle = rng.gen::<f64>() * TAU;
    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let unit_state = Unit {
        hp: STATION_HP,
        hue: faction_hue(rng, friendly),
        friendly,
        facing: rng.gen::<f64>() * TAU,
        radius: STATION_RADIUS,
        reload: STATION_RELOAD,
        blink: STATION_BLINK_TICKS,
        score: 0,
        tier: 0,
        weapon: WeaponStats {
            bullet_speed: STATION_BULLET_SPEED,
            bullet_size: STATION_BULLET_SIZE,
            bullet_life: STATION_BULLET_LIFE,
        },
        destroyed: false,
        kind: UnitKind::Station(StationState {
            host: Some(host),
            orbit_distance,
            orbit_angle,
            orbit_speed: STATION_ORBIT_SPEED * sign,
            spawn_timer: STATION_FIRST_SPAWN,
        }),
    };

    let mut builder = EntityBuilder::new();
    builder
        .add(Motion::new(host_pos + unit(orbit_angle) * orbit_distance, host_vel))
        .add(unit_state);
    let id = registry.spawn(world, &mut builder);
    log::debug!("station {id} deployed on planet {host} (friendly={friendly})");
    Some(id)
}

/// Launch a squad of independent ships around a station.
pub fn spawn_squad(
    world: &mut World,
    registry: &mut Registry,
    rng: &mut ChaCha8Rng,
    station: EntityId,
    station_pos: DVec2,
    station_vel: DVec2,
    hue: u16,
    friendly: bool,
) -> Vec<EntityId> {
    (0..SQUAD_SIZE)
        .map(|_| {
            let angle = rng.gen::<f64>() * TAU;
            let dist = STATION_RADIUS * SQUAD_SPAWN_FACTOR + rng.gen::<f64>() * 50.0;
            let jitter = DVec2::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5);
            let brain = ShipBrain {
                home_station: Some(station),
                orbit_dir: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
                ..Default::default()
            };
            let ship = Unit {
                hp: SHIP_HP,
                hue,
                friendly,
                facing: angle + PI,
                radius: SHIP_RADIUS,
                reload: rng.gen_range(100.0..200.0),
                blink: SHIP_SPAWN_BLINK,
                score: 0,
                tier: 0,
                weapon: WeaponStats {
                    bullet_speed: rng.gen_range(15.0..25.0),
                    bullet_size: rng.gen_range(4.0..7.0),
                    bullet_life: rng.gen_range(45..60),
                },
                destroyed: false,
                kind: UnitKind::Ship(brain),
            };
            let mut builder = EntityBuilder::new();
            builder
                .add(Motion::new(station_pos + unit(angle) * dist, station_vel + jitter))
                .add(ship);
            registry.spawn(world, &mut builder)
        })
        .collect()
}

/// The player ship: a squad leader with its own slots.
pub fn spawn_player(world: &mut World, registry: &mut Registry, pos: DVec2) -> EntityId {
    let brain = ShipBrain {
        role: SquadRole::Leader,
        slots: ShipBrain::with_slots(),
        orbit_dir: 1.0,
        ..Default::default()
    };
    let ship = Unit {
        hp: SHIP_HP,
        hue: FRIENDLY_HUE,
        friendly: true,
        facing: FRAC_PI_2,
        radius: SHIP_RADIUS,
        reload: 0.0,
        blink: PLAYER_SPAWN_BLINK,
        score: 0,
        tier: 0,
        weapon: WeaponStats {
            bullet_speed: PLAYER_BULLET_SPEED,
            bullet_size: PLAYER_BULLET_SIZE,
            bullet_life: PLAYER_BULLET_LIFE,
        },
        destroyed: false,
        kind: UnitKind::Ship(brain),
    };
    let control = PlayerControl {
        lives: PLAYER_LIVES,
        ..Default::default()
    };
    let mut builder = EntityBuilder::new();
    builder
        .add(Motion::new(pos, DVec2::ZERO))
        .add(ship)
        .add(control);
    registry.spawn(world, &mut builder)
}

// --- Projectiles and effects ---

pub fn spawn_projectile(
    world: &mut World,
    registry: &mut Registry,
    pos: DVec2,
    vel: DVec2,
    projectile: Projectile,
) -> EntityId {
    let mut builder = EntityBuilder::new();
    builder.add(Motion::new(pos, vel)).add(projectile);
    registry.spawn(world, &mut builder)
}

/// Ordinary expanding impulse ring.
pub fn impulse_ring(center: DVec2) -> Shockwave {
    Shockwave {
        center,
        r: SHOCKWAVE_START_RADIUS,
        max_r: SHOCKWAVE_MAX_RADIUS,
        alpha: 1.0,
        strength: SHOCKWAVE_STRENGTH,
        kind: ShockwaveKind::Impulse,
        owner: None,
    }
}

/// Lethal ring fired by a god-tier player.
pub fn god_ring(center: DVec2, owner: EntityId) -> Shockwave {
    Shockwave {
        center,
        r: GOD_RING_START_RADIUS,
        max_r: GOD_RING_MAX_RADIUS,
        alpha: 1.0,
        strength: SHOCKWAVE_STRENGTH,
        kind: ShockwaveKind::GodRing,
        owner: Some(owner),
    }
}

pub fn spawn_shockwave(world: &mut World, registry: &mut Registry, wave: Shockwave) -> EntityId {
    let mut builder = EntityBuilder::new();
    builder.add(wave);
    registry.spawn(world, &mut builder)
}
