//! Stations: orbit their host planet, shove asteroids aside, launch squads
//! on a timer, and shoot rocks that come too close.

use glam::DVec2;
use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use gravwell_core::components::{Body, Motion, StableId, StationState, Unit, UnitKind};
use gravwell_core::constants::*;
use gravwell_core::types::{heading_of, unit, EntityId};
use gravwell_squad_ai::fsm::FireOrder;

use crate::config::SimConfig;
use crate::registry::Registry;
use crate::spatial::SpatialGrid;
use crate::systems::casualties::Kill;
use crate::systems::weapons::Trigger;
use crate::world_setup::{ship_counts, spawn_squad};

/// What the station pass hands back to the engine.
#[derive(Debug, Default)]
pub struct StationReport {
    pub kills: Vec<Kill>,
    pub triggers: Vec<Trigger>,
    pub launched: usize,
}

struct Launch {
    station: EntityId,
    pos: DVec2,
    vel: DVec2,
    hue: u16,
    friendly: bool,
}

#[derive(Debug, Clone, Copy)]
struct Host {
    pos: DVec2,
    vel: DVec2,
    r: f64,
}

fn host_of(world: &World, registry: &Registry, host: Option<EntityId>) -> Option<Host> {
    let entity = registry.get(host?)?;
    let body = world.get::<&Body>(entity).ok()?;
    if body.destroyed || !body.is_planet() {
        return None;
    }
    let motion = world.get::<&Motion>(entity).ok()?;
    Some(Host {
        pos: motion.pos,
        vel: motion.vel,
        r: body.r,
    })
}

pub fn run(
    world: &mut World,
    registry: &mut Registry,
    grid: &SpatialGrid,
    rng: &mut ChaCha8Rng,
    config: &SimConfig,
) -> StationReport {
    let mut stations: Vec<(Entity, EntityId, StationState)> = world
        .query::<(&StableId, &Unit)>()
        .iter()
        .filter(|(_, (_, u))| !u.destroyed)
        .filter_map(|(entity, (id, u))| match u.kind {
            UnitKind::Station(state) => Some((entity, id.0, state)),
            UnitKind::Ship(_) => None,
        })
        .collect();
    stations.sort_by_key(|(_, id, _)| *id);

    let mut report = StationReport::default();
    let mut launches = Vec::new();

    for (entity, id, mut state) in stations {
        let Some(host) = host_of(world, registry, state.host) else {
            if let Ok(mut station) = world.get::<&mut Unit>(entity) {
                station.destroyed = true;
            }
            report.kills.push(Kill {
                victim: id,
                killer: None,
            });
            continue;
        };

        let pos = {
            let Ok(mut motion) = world.get::<&mut Motion>(entity) else {
                continue;
            };
            follow_host(&mut motion, &mut state, &host);
            motion.pos
        };
        repel_rocks(world, grid, pos, state.host);

        let Ok(mut station) = world.get::<&mut Unit>(entity) else {
            continue;
        };
        if state.spawn_timer > 0 {
            state.spawn_timer -= 1;
        } else {
            launches.push(Launch {
                station: id,
                pos,
                vel: host.vel,
                hue: station.hue,
                friendly: station.friendly,
            });
            state.spawn_timer = rng.gen_range(SHIP_SPAWN_TIME..SHIP_SPAWN_TIME * 2);
        }

        if station.reload <= 0.0 {
            if let Some(target) = nearest_rock(world, grid, pos) {
                station.facing = heading_of(target - pos);
                report.triggers.push(Trigger {
                    shooter: id,
                    order: FireOrder {
                        at: target,
                        reload: (STATION_RELOAD, 0.0),
                    },
                });
            }
        }
        station.kind = UnitKind::Station(state);
    }

    for launch in launches {
        let (friendly_ships, hostile_ships) = ship_counts(world);
        let room = if launch.friendly {
            friendly_ships + SQUAD_SIZE <= config.ship_limit
        } else {
            hostile_ships + SQUAD_SIZE <= config.hostile_limit()
        };
        if !room {
            log::trace!("station {} held its squad: ship limit", launch.station);
            continue;
        }
        let squad = spawn_squad(
            world,
            registry,
            rng,
            launch.station,
            launch.pos,
            launch.vel,
            launch.hue,
            launch.friendly,
        );
        report.launched += squad.len();
        log::debug!("station {} launched {} ships", launch.station, squad.len());
    }

    report
}

/// Spring the station toward its slot on the host's orbit.
fn follow_host(motion: &mut Motion, state: &mut StationState, host: &Host) {
    state.orbit_angle += state.orbit_speed;
    state.orbit_distance = host.r * (1.0 + STATION_ORBIT_FACTOR) + STATION_RADIUS;
    let target = host.pos + unit(state.orbit_angle) * state.orbit_distance;
    let pull = (target - motion.pos) * STATION_ORBIT_SPRING;
    motion.vel = (motion.vel - host.vel) * STATION_ORBIT_DAMPING + pull + host.vel;
    motion.pos += motion.vel;
}

/// Push nearby asteroids out of the station's space.
fn repel_rocks(world: &mut World, grid: &SpatialGrid, pos: DVec2, host: Option<EntityId>) {
    for entry in grid.query(pos) {
        if Some(entry.id) == host {
            continue;
        }
        let r = match world.get::<&Body>(entry.entity) {
            Ok(body) if !body.is_planet() && !body.destroyed => body.r,
            _ => continue,
        };
        let Ok(mut motion) = world.get::<&mut Motion>(entry.entity) else {
            continue;
        };
        let away = motion.pos - pos;
        let dist = away.length();
        let min = STATION_RADIUS + r + STATION_REPEL_MARGIN;
        if dist < min && dist > f64::EPSILON {
            motion.vel += away / dist * (min - dist) * STATION_REPEL_GAIN;
        }
    }
}

/// Closest live asteroid inside the defence range.
fn nearest_rock(world: &World, grid: &SpatialGrid, pos: DVec2) -> Option<DVec2> {
    grid.query_radius(pos, STATION_DEFENSE_RANGE)
        .into_iter()
        .find(|entry| {
            world
                .get::<&Body>(entry.entity)
                .is_ok_and(|b| !b.is_planet() && !b.destroyed)
        })
        .map(|entry| entry.pos)
}
