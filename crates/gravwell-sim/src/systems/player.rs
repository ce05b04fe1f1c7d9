//! Player ship flight: rotation, thrust, planet gravity, idle orbit capture,
//! drag, the magnetic world boundary, and respawn after death.

use glam::DVec2;
use hecs::World;

use gravwell_core::components::{Body, Motion, PlayerControl, Unit};
use gravwell_core::constants::*;
use gravwell_core::events::SimEvent;
use gravwell_core::types::{unit, wrap_angle};

use crate::world_setup::player_spawn_point;

#[derive(Debug, Clone, Copy)]
struct Gravitator {
    pos: DVec2,
    vel: DVec2,
    r: f64,
    mass: f64,
    is_home: bool,
}

fn near_planets(world: &World) -> Vec<Gravitator> {
    world
        .query::<(&Motion, &Body)>()
        .iter()
        .filter_map(|(_, (motion, body))| {
            let orbit = body.planet()?;
            (!body.destroyed && orbit.z < NEAR_PLANE_Z).then_some(Gravitator {
                pos: motion.pos,
                vel: motion.vel,
                r: body.r,
                mass: body.mass,
                is_home: orbit.is_home,
            })
        })
        .collect()
}

pub fn run(world: &mut World, bounds: f64, events: &mut Vec<SimEvent>) {
    let planets = near_planets(world);
    let home = planets.iter().find(|p| p.is_home).copied();

    for (_entity, (motion, ship, control)) in
        world.query_mut::<(&mut Motion, &mut Unit, &mut PlayerControl)>()
    {
        if control.dead {
            respawn_countdown(motion, ship, control, home, events);
            continue;
        }

        ship.facing = wrap_angle(ship.facing + control.pending_turn + control.turn_rate * PLAYER_TURN_RATE);
        control.pending_turn = 0.0;
        if control.thrusting {
            motion.vel += unit(ship.facing) * PLAYER_THRUST;
        }

        apply_gravity(motion, &planets);
        if !control.thrusting && !control.braking {
            capture(motion, ship.radius, &planets);
        }

        motion.vel *= if control.braking { PLAYER_BRAKE } else { FRICTION };

        let cap = if ship.tier >= GOD_TIER {
            SHIP_MAX_SPEED * GOD_SPEED_FACTOR
        } else {
            SHIP_MAX_SPEED
        };
        let speed = motion.vel.length();
        if speed > cap {
            motion.vel *= cap / speed;
        }

        magnetic_boundary(motion, bounds);
        motion.pos += motion.vel;
    }
}

fn respawn_countdown(
    motion: &mut Motion,
    ship: &mut Unit,
    control: &mut PlayerControl,
    home: Option<Gravitator>,
    events: &mut Vec<SimEvent>,
) {
    control.pending_turn = 0.0;
    if control.respawn_timer > 0 {
        control.respawn_timer -= 1;
        return;
    }
    if control.lives == 0 {
        return;
    }
    let Some(home) = home else {
        return;
    };
    control.dead = false;
    ship.hp = SHIP_HP;
    ship.blink = PLAYER_SPAWN_BLINK;
    ship.reload = 0.0;
    motion.pos = player_spawn_point(home.pos, home.r);
    motion.vel = home.vel;
    events.push(SimEvent::PlayerRespawned);
    log::info!("player respawned, {} lives left", control.lives);
}

fn apply_gravity(motion: &mut Motion, planets: &[Gravitator]) {
    for planet in planets {
        let offset = planet.pos - motion.pos;
        let dist = offset.length();
        if dist >= planet.r * PLAYER_GRAVITY_RANGE || dist <= f64::EPSILON {
            continue;
        }
        let force = G_CONST * planet.mass / (dist * dist).max(100.0);
        motion.vel += offset / dist * force * PLAYER_GRAVITY_SCALE;
    }
}

/// With the controls idle, ease into a circular orbit of the nearest planet.
fn capture(motion: &mut Motion, radius: f64, planets: &[Gravitator]) {
    let Some(planet) = planets.iter().min_by(|a, b| {
        a.pos
            .distance_squared(motion.pos)
            .total_cmp(&b.pos.distance_squared(motion.pos))
    }) else {
        return;
    };
    let outward = motion.pos - planet.pos;
    let dist = outward.length();
    if dist >= planet.r * PLAYER_CAPTURE_FACTOR || dist <= f64::EPSILON {
        return;
    }
    let normal = outward / dist;
    let rel_vel = motion.vel - planet.vel;
    let tangent = if normal.perp_dot(rel_vel) < 0.0 {
        -normal.perp()
    } else {
        normal.perp()
    };
    let orbital = (G_CONST * planet.mass * ORBIT_GRAVITY_GAIN / dist.max(10.0)).sqrt();
    let target = planet.vel + tangent * orbital;
    motion.vel += (target - motion.vel) * PLAYER_ORBIT_BLEND;

    let ring = planet.r * PLAYER_ORBIT_RING_FACTOR + radius;
    let err = ring - dist;
    let correction = (err * 0.001).abs().min(PLAYER_ORBIT_MAX_CORRECTION);
    motion.vel += normal * correction * err.signum();
}

/// Soft wall: damping and an inward push grow past 95% of the bounds, and
/// nothing gets beyond 105%.
fn magnetic_boundary(motion: &mut Motion, bounds: f64) {
    let dist = motion.pos.length();
    let start = bounds * PLAYER_BOUNDARY_ZONE;
    if dist <= start {
        return;
    }
    let inward = -motion.pos / dist;
    let severity = ((dist - start) / (bounds * 0.1)).min(1.0);
    motion.vel *= 1.0 - severity * PLAYER_BOUNDARY_DAMPING;
    motion.vel += inward * severity * PLAYER_BOUNDARY_PUSH;

    let hard = bounds * PLAYER_BOUNDARY_HARD;
    if dist > hard {
        motion.pos = -inward * hard;
        let outward_speed = motion.vel.dot(-inward);
        if outward_speed > 0.0 {
            motion.vel -= -inward * outward_speed;
        }
    }
}
