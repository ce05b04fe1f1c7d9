//! Body kinematics: radius growth, planet depth cycles and orbital rails,
//! planet attraction on asteroids, speed limits, and the soft boundary.
//!
//! Rebuilds the body grid at the end, so collision and AI see this tick's
//! positions.

use glam::DVec2;
use hecs::World;

use gravwell_core::components::{Body, BodyKind, Motion, PlanetOrbit, StableId};
use gravwell_core::constants::*;
use gravwell_core::types::EntityId;

use crate::spatial::SpatialGrid;

/// Planet state the asteroid pass attracts toward.
#[derive(Debug, Clone, Copy)]
struct Attractor {
    pos: DVec2,
    vel: DVec2,
    r: f64,
    mass: f64,
}

/// Run kinematics for every body. Returns planets that just re-entered the
/// near plane and need a station check.
pub fn run(world: &mut World, grid: &mut SpatialGrid, bounds: f64) -> Vec<EntityId> {
    let mut returning = Vec::new();
    let mut attractors = Vec::new();

    for (_entity, (id, motion, body)) in world.query_mut::<(&StableId, &mut Motion, &mut Body)>() {
        if body.destroyed {
            continue;
        }
        smooth_radius(body);
        if body.blink > 0 {
            body.blink -= 1;
        }
        let (r, mass) = (body.r, body.mass);
        let Some(orbit) = body.planet_mut() else {
            continue;
        };
        if cycle_depth(orbit) {
            returning.push(id.0);
        }
        advance_rail(orbit, motion);
        contain_planet(orbit, motion, bounds);
        if orbit.z < ACTIVE_PLANET_Z {
            attractors.push(Attractor {
                pos: motion.pos,
                vel: motion.vel,
                r,
                mass,
            });
        }
    }

    for (_entity, (motion, body)) in world.query_mut::<(&mut Motion, &Body)>() {
        if body.destroyed {
            continue;
        }
        let BodyKind::Asteroid { ring_multiple } = body.kind else {
            continue;
        };
        attract(motion, body, ring_multiple, &attractors);
        let speed = motion.vel.length();
        if speed > ASTEROID_MAX_SPEED {
            motion.vel *= ASTEROID_MAX_SPEED / speed;
        }
        let dist = motion.pos.length();
        if dist > bounds - BOUNDARY_TOLERANCE_ROIDS {
            motion.vel -= motion.pos / dist * BOUNDARY_CORRECTION;
        }
        motion.pos += motion.vel;
    }

    rebuild_grid(world, grid);
    returning
}

/// Ease `r` toward `target_r`. Mass never drops below what the radius implies
/// while growing, so absorbed mass is kept until the growth settles.
pub fn smooth_radius(body: &mut Body) {
    if (body.target_r - body.r).abs() > f64::EPSILON {
        body.r += (body.target_r - body.r) * RADIUS_SMOOTHING;
        if (body.target_r - body.r).abs() < RADIUS_SNAP_EPSILON {
            body.r = body.target_r;
            body.mass = Body::mass_for(body.r);
        } else {
            body.mass = body.mass.max(Body::mass_for(body.r));
        }
    } else {
        body.mass = Body::mass_for(body.r);
    }
}

/// Advance the depth cycle. Returns true on the tick a planet comes back to
/// the near plane with its station check still armed.
fn cycle_depth(orbit: &mut PlanetOrbit) -> bool {
    if orbit.z_speed == 0.0 {
        return false;
    }
    if orbit.z_wait > 0 {
        orbit.z_wait -= 1;
        return false;
    }

    orbit.z += orbit.z_speed;
    if orbit.z < 0.0 {
        orbit.z = 0.0;
        orbit.z_speed = orbit.z_speed.abs();
        orbit.z_wait = (2.0 * MAX_Z_DEPTH / orbit.z_speed).floor() as u32;
    } else if orbit.z > MAX_Z_DEPTH {
        orbit.z = MAX_Z_DEPTH;
        orbit.z_speed = -orbit.z_speed.abs();
    }

    let mut due = false;
    if orbit.z < STATION_RESPAWN_Z && !orbit.station_checked {
        orbit.station_checked = true;
        due = true;
    }
    if orbit.z > ACTIVE_PLANET_Z {
        orbit.station_checked = false;
    }
    due
}

/// Kinematic rail: position comes from the anomaly, velocity is the delta.
fn advance_rail(orbit: &mut PlanetOrbit, motion: &mut Motion) {
    orbit.angle += orbit.angular_speed / (1.0 + orbit.z);
    let local = DVec2::new(
        orbit.semi_major * orbit.angle.cos(),
        orbit.semi_minor * orbit.angle.sin(),
    );
    let next = orbit.center + DVec2::from_angle(orbit.rotation).rotate(local);
    motion.vel = next - motion.pos;
    motion.pos = next;
}

fn contain_planet(orbit: &mut PlanetOrbit, motion: &Motion, bounds: f64) {
    let dist = motion.pos.length();
    if dist > bounds + BOUNDARY_TOLERANCE_PLANETS {
        orbit.center -= motion.pos / dist * PLANET_CENTER_PULL;
    }
}

/// Pull toward the nearest active planet, or settle small bodies into orbit.
fn attract(motion: &mut Motion, body: &Body, ring_multiple: f64, attractors: &[Attractor]) {
    let Some(planet) = attractors.iter().min_by(|a, b| {
        a.pos
            .distance_squared(motion.pos)
            .total_cmp(&b.pos.distance_squared(motion.pos))
    }) else {
        return;
    };

    let offset = planet.pos - motion.pos;
    let dist_sq = offset.length_squared();
    let dist = dist_sq.sqrt();
    if dist >= planet.r * CAPTURE_RANGE_FACTOR || dist <= f64::EPSILON {
        return;
    }
    let dir = offset / dist;
    let ring = planet.r * ORBIT_RING_FACTOR + body.r;
    let small = body.r <= ASTEROID_MIN_SIZE * SMALL_BODY_FACTOR;
    let pull = G_CONST * planet.mass * ORBIT_GRAVITY_GAIN;

    if dist > ring || !small {
        motion.vel += dir * pull / dist_sq.max(100.0);
        return;
    }

    // Keep the current sense of rotation around the planet.
    let rel_vel = motion.vel - planet.vel;
    let outward = -dir;
    let tangent = if outward.perp_dot(rel_vel) < 0.0 {
        -outward.perp()
    } else {
        outward.perp()
    };
    let target = planet.vel + tangent * (pull / dist).sqrt();
    motion.vel += (target - motion.vel) * ORBIT_VELOCITY_BLEND;

    let stable = planet.r * ring_multiple + body.r;
    motion.vel += dir * (dist - stable) * ORBIT_RADIAL_SPRING;
}

/// Index every near-plane body.
pub fn rebuild_grid(world: &World, grid: &mut SpatialGrid) {
    grid.clear();
    for (entity, (id, motion, body)) in world.query::<(&StableId, &Motion, &Body)>().iter() {
        if !body.destroyed && body.z() < NEAR_PLANE_Z {
            grid.insert(id.0, entity, motion.pos);
        }
    }
}
