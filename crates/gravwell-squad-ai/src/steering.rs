//! Steering controllers for combat units.
//!
//! Each controller takes a unit's pose and returns its velocity and facing
//! for this tick. Speed caps beyond the controllers' own are applied by the sim.

use std::f64::consts::FRAC_PI_2;

use glam::DVec2;
use rand::Rng;

use gravwell_core::constants::*;
use gravwell_core::types::{angle_between, heading_of, unit, EntityId};

use crate::squad::slot_position;

/// Kinematic state of the unit being steered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub pos: DVec2,
    pub vel: DVec2,
    pub facing: f64,
    pub radius: f64,
}

/// Controller output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    pub vel: DVec2,
    pub facing: f64,
}

/// An asteroid the unit could run into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub id: EntityId,
    pub pos: DVec2,
    pub vel: DVec2,
    pub r: f64,
}

/// An asteroid on a predicted collision course.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Danger {
    pub id: EntityId,
    pub pos: DVec2,
    pub distance: f64,
    /// Asteroid offset from the unit at closest approach.
    pub miss: DVec2,
}

/// Pose of the unit a wingman follows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderPose {
    pub id: EntityId,
    pub pos: DVec2,
    pub vel: DVec2,
    pub facing: f64,
    pub radius: f64,
}

pub fn turn_toward(facing: f64, desired: f64, gain: f64) -> f64 {
    facing + angle_between(facing, desired) * gain
}

fn cap_speed(vel: DVec2, max: f64) -> DVec2 {
    let speed = vel.length();
    if speed > max {
        vel * (max / speed)
    } else {
        vel
    }
}

/// Time and distance of closest approach for a relative position/velocity.
/// `None` when the bodies are effectively at rest relative to each other.
pub fn closest_approach(rel_pos: DVec2, rel_vel: DVec2) -> Option<(f64, f64)> {
    let speed_sq = rel_vel.length_squared();
    if speed_sq <= 0.01 {
        return None;
    }
    let t = -rel_pos.dot(rel_vel) / speed_sq;
    Some((t, (rel_pos + rel_vel * t).length()))
}

/// Nearest obstacle inside scan range whose predicted miss distance is under
/// the combined radii plus clearance within the prediction horizon.
pub fn scan_danger(me: &Pose, obstacles: &[Obstacle]) -> Option<Danger> {
    let mut best: Option<Danger> = None;
    for obstacle in obstacles {
        let distance = me.pos.distance(obstacle.pos);
        if distance >= DANGER_SCAN_RANGE || best.is_some_and(|b| distance >= b.distance) {
            continue;
        }
        let rel_pos = obstacle.pos - me.pos;
        let rel_vel = obstacle.vel - me.vel;
        let Some((t, miss)) = closest_approach(rel_pos, rel_vel) else {
            continue;
        };
        if t > 0.0 && t < DANGER_HORIZON_TICKS && miss < me.radius + obstacle.r + DANGER_CLEARANCE {
            best = Some(Danger {
                id: obstacle.id,
                pos: obstacle.pos,
                distance,
                miss: rel_pos + rel_vel * t,
            });
        }
    }
    best
}

/// Slot seeking: inherit the leader's velocity, spring toward the slot with
/// a critically damped arrival, keep clear of the leader and squadmates.
/// Returns the steering and whether the unit is seated.
pub fn seek_slot(me: &Pose, leader: &LeaderPose, offset: DVec2, mates: &[DVec2]) -> (Steering, bool) {
    let target = slot_position(leader.pos, leader.facing, offset);
    let mut vel = me.vel + (leader.vel - me.vel) * FORMATION_VELOCITY_BLEND;

    let to_slot = target - me.pos;
    let dist = to_slot.length();
    let mut force = FORMATION_SPRING;
    let mut damping = FORMATION_DAMPING;
    if dist < FORMATION_ARRIVE_RADIUS {
        let factor = dist / FORMATION_ARRIVE_RADIUS;
        force *= factor;
        damping = FORMATION_DAMPING + (1.0 - factor) * (FORMATION_SEATED_DAMPING - FORMATION_DAMPING);
    } else if dist > FORMATION_FAR_RADIUS {
        force *= FORMATION_FAR_BOOST;
    }
    vel += to_slot * force;

    let from_leader = me.pos - leader.pos;
    if from_leader.length() < me.radius + leader.radius + LEADER_CLEARANCE {
        vel += from_leader.normalize_or_zero() * LEADER_PUSH;
    }
    vel += separation(me, mates, SEPARATION_DISTANCE + me.radius, FORMATION_SEPARATION_GAIN);

    let seated = dist < IN_SLOT_RADIUS;
    let facing = if seated {
        let err = angle_between(me.facing, leader.facing);
        if err.abs() < FORMATION_IMITATE_SNAP {
            leader.facing
        } else {
            me.facing + err * FORMATION_IMITATE_GAIN
        }
    } else {
        turn_toward(me.facing, heading_of(vel), FORMATION_TURN_GAIN)
    };

    (
        Steering {
            vel: cap_speed(vel * damping, SHIP_MAX_SPEED),
            facing,
        },
        seated,
    )
}

/// Avoidance: keep the leader's pace but sidestep off the predicted path
/// instead of seeking the slot, facing the threat.
pub fn avoid(me: &Pose, leader_vel: DVec2, danger: &Danger) -> Steering {
    let mut vel = me.vel + (leader_vel - me.vel) * FORMATION_VELOCITY_BLEND;
    let rel_pos = danger.pos - me.pos;
    // Head-on threats have no preferred side; break to the left of the bearing.
    let away = if danger.miss.length_squared() > 1.0 {
        -danger.miss.normalize()
    } else {
        rel_pos.normalize_or_zero().perp()
    };
    vel += away * DANGER_SIDESTEP;
    let facing = turn_toward(me.facing, heading_of(rel_pos), DANGER_TURN_GAIN);
    Steering {
        vel: cap_speed(vel * FORMATION_DAMPING, SHIP_MAX_SPEED),
        facing,
    }
}

/// Evasive kick used when a wingman gives up on its squad.
pub fn evade(me: &Pose, danger: &Danger) -> Steering {
    let bearing = heading_of(danger.pos - me.pos);
    Steering {
        vel: me.vel + unit(bearing + FRAC_PI_2) * EVADE_IMPULSE,
        facing: me.facing,
    }
}

/// Orbit a patrol centre at `ring`, correcting radially outside the band.
pub fn patrol_orbit(me: &Pose, center: DVec2, ring: f64, orbit_dir: f64) -> Steering {
    let offset = me.pos - center;
    let dist = offset.length();
    let mut vel = me.vel;
    if dist > ring + PATROL_BAND {
        vel -= offset.normalize_or_zero() * PATROL_RADIAL_GAIN;
    } else if dist < ring - PATROL_BAND {
        vel += offset.normalize_or_zero() * PATROL_RADIAL_GAIN;
    } else {
        vel += unit(heading_of(offset) + FRAC_PI_2 * orbit_dir) * PATROL_TANGENT_GAIN;
    }
    let facing = turn_toward(me.facing, heading_of(vel), FORMATION_TURN_GAIN);
    Steering {
        vel: vel * PATROL_DAMPING,
        facing,
    }
}

/// Leader cruise: turn toward the goal and thrust along the facing.
pub fn cruise(me: &Pose, goal: DVec2) -> Steering {
    let facing = turn_toward(me.facing, heading_of(goal - me.pos), LEADER_TURN_GAIN);
    let vel = me.vel + unit(facing) * LEADER_THRUST;
    Steering {
        vel: cap_speed(vel, LEADER_CRUISE_SPEED),
        facing,
    }
}

/// Orbit-and-strafe around a combat target. Also returns the facing error
/// measured before turning, which gates the gun.
pub fn strafe(me: &Pose, target: DVec2, orbit_dir: f64, crowd: &[DVec2]) -> (Steering, f64) {
    let bearing = heading_of(target - me.pos);
    let distance = me.pos.distance(target);
    let err = angle_between(me.facing, bearing);
    let facing = me.facing + err * COMBAT_TURN_GAIN;

    let mut vel = me.vel;
    vel += unit(bearing) * (distance - COMBAT_ORBIT_DISTANCE) * COMBAT_RADIAL_GAIN;
    vel += unit(bearing + FRAC_PI_2 * orbit_dir) * COMBAT_TANGENT_GAIN;
    vel += separation(me, crowd, SEPARATION_DISTANCE, COMBAT_SEPARATION_GAIN);
    vel *= COMBAT_DRAG;

    (
        Steering {
            vel: cap_speed(vel, SHIP_MAX_SPEED),
            facing,
        },
        err,
    )
}

/// Linear push away from every neighbour closer than `spacing`.
fn separation(me: &Pose, others: &[DVec2], spacing: f64, gain: f64) -> DVec2 {
    others
        .iter()
        .filter_map(|&other| {
            let away = me.pos - other;
            let d = away.length();
            (d > 0.0 && d < spacing).then(|| away / d * (spacing - d) * gain)
        })
        .sum()
}

/// New patrol waypoint: a random point in the world, or a rival station.
pub fn pick_waypoint(rng: &mut impl Rng, bounds: f64, rival_station: Option<DVec2>) -> DVec2 {
    if rng.gen_bool(0.5) {
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let r = rng.gen_range(0.0..bounds * 0.9);
        return unit(angle) * r;
    }
    rival_station.unwrap_or_else(|| {
        DVec2::new(
            rng.gen_range(-0.9..0.9) * bounds,
            rng.gen_range(-0.9..0.9) * bounds,
        )
    })
}
