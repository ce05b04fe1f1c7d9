//! Projectile flight and hits.
//!
//! Bullets bend toward nearby planets until their tier makes them immune,
//! expire by age or range, and resolve the first thing they touch: planets
//! absorb or take siege damage, asteroids split, rival units lose hull.

use glam::DVec2;
use hecs::{Entity, World};

use gravwell_core::components::{Body, Motion, PlayerControl, Projectile, StableId, Unit};
use gravwell_core::constants::*;
use gravwell_core::enums::{DeathCause, Severity, SquadRole};
use gravwell_core::events::SimEvent;
use gravwell_core::types::EntityId;

use crate::registry::Registry;
use crate::spatial::SpatialGrid;
use crate::systems::casualties::{self, Kill};
use crate::systems::collision::fragments;
use crate::systems::Spawn;
use crate::world_setup::impulse_ring;

#[derive(Debug, Clone, Copy)]
struct Well {
    pos: DVec2,
    r: f64,
    mass: f64,
}

#[derive(Debug, Clone, Copy)]
struct Target {
    entity: Entity,
    id: EntityId,
    pos: DVec2,
    radius: f64,
    friendly: bool,
    hue: u16,
    is_player: bool,
}

/// What the shooter's identity allows its bullets to do.
#[derive(Debug, Clone, Copy, Default)]
struct Shooter {
    is_player: bool,
    lone_wolf: bool,
    /// May chip away at planets.
    siege: bool,
}

fn shooter_of(world: &World, registry: &Registry, owner: Option<EntityId>) -> Shooter {
    let Some(entity) = owner.and_then(|id| registry.get(id)) else {
        return Shooter::default();
    };
    let player = world.get::<&PlayerControl>(entity).ok().map(|p| p.lone_wolf);
    let Ok(unit) = world.get::<&Unit>(entity) else {
        return Shooter::default();
    };
    let leads_squad = unit.brain().is_some_and(|b| {
        b.role == SquadRole::Leader && b.member_count() >= PLANET_SIEGE_SQUAD
    });
    Shooter {
        is_player: player.is_some(),
        lone_wolf: player.unwrap_or(false),
        siege: leads_squad || (player.is_some() && unit.tier >= GOD_TIER),
    }
}

/// Bullets of `shot` may damage `target`.
fn hostile_to(shot: &Projectile, target: &Target) -> bool {
    if shot.friendly != target.friendly {
        return true;
    }
    !shot.friendly && shot.hue != target.hue
}

pub fn run(
    world: &mut World,
    registry: &Registry,
    grid: &SpatialGrid,
    bounds: f64,
    events: &mut Vec<SimEvent>,
    spawns: &mut Vec<Spawn>,
) -> Vec<Kill> {
    let wells: Vec<Well> = world
        .query::<(&Motion, &Body)>()
        .iter()
        .filter(|(_, (_, body))| {
            !body.destroyed && body.planet().is_some_and(|o| o.z < NEAR_PLANE_Z)
        })
        .map(|(_, (motion, body))| Well {
            pos: motion.pos,
            r: body.r,
            mass: body.mass,
        })
        .collect();

    let mut shots: Vec<(Entity, EntityId, Motion, Projectile)> = world
        .query::<(&StableId, &Motion, &Projectile)>()
        .iter()
        .filter(|(_, (_, _, p))| !p.spent)
        .map(|(entity, (id, motion, p))| (entity, id.0, *motion, *p))
        .collect();
    shots.sort_by_key(|(_, id, _, _)| *id);

    let mut targets: Vec<Target> = world
        .query::<(&StableId, &Motion, &Unit, Option<&PlayerControl>)>()
        .iter()
        .filter(|(_, (_, _, u, player))| !u.destroyed && !player.is_some_and(|p| p.dead))
        .map(|(entity, (id, motion, u, player))| Target {
            entity,
            id: id.0,
            pos: motion.pos,
            radius: u.radius,
            friendly: u.friendly,
            hue: u.hue,
            is_player: player.is_some(),
        })
        .collect();
    targets.sort_by_key(|t| t.id);

    let mut kills = Vec::new();
    for (entity, _id, mut motion, mut shot) in shots {
        if shot.tier < TIER_GRAVITY_IMMUNE {
            bend(&mut motion, &wells);
        }
        motion.pos += motion.vel;
        shot.life = shot.life.saturating_sub(1);
        if shot.life == 0 || motion.pos.length() > bounds * BULLET_RANGE_FACTOR {
            shot.spent = true;
        }

        if !shot.spent {
            let shooter = shooter_of(world, registry, shot.owner);
            shot.spent = hit_body(world, registry, grid, &motion, &shot, &shooter, events, spawns)
                || hit_unit(world, &targets, &motion, &shot, &shooter, events, &mut kills);
        }

        if let Ok(mut m) = world.get::<&mut Motion>(entity) {
            *m = motion;
        }
        if let Ok(mut p) = world.get::<&mut Projectile>(entity) {
            *p = shot;
        }
    }
    kills
}

fn bend(motion: &mut Motion, wells: &[Well]) {
    for well in wells {
        let offset = well.pos - motion.pos;
        let dist = offset.length();
        if dist >= well.r * BULLET_GRAVITY_RANGE || dist <= f64::EPSILON {
            continue;
        }
        let force = G_CONST * well.mass / (dist * dist).max(1000.0) * BULLET_GRAVITY_FACTOR;
        motion.vel += offset / dist * force;
    }
}

/// Rocks split across the bullet's path.
fn split_axis(bullet_vel: DVec2) -> DVec2 {
    let dir = bullet_vel.normalize_or_zero();
    if dir == DVec2::ZERO {
        DVec2::X
    } else {
        dir.perp()
    }
}

/// Resolve a hit on the first body touched. Returns true if the bullet is
/// used up.
#[allow(clippy::too_many_arguments)]
fn hit_body(
    world: &mut World,
    registry: &Registry,
    grid: &SpatialGrid,
    motion: &Motion,
    shot: &Projectile,
    shooter: &Shooter,
    events: &mut Vec<SimEvent>,
    spawns: &mut Vec<Spawn>,
) -> bool {
    let hit = grid.query(motion.pos).into_iter().find_map(|entry| {
        let body = world.get::<&Body>(entry.entity).ok()?;
        let pos = world.get::<&Motion>(entry.entity).ok()?.pos;
        (!body.destroyed && pos.distance(motion.pos) < body.r + shot.size).then_some((entry.entity, pos))
    });
    let Some((entity, pos)) = hit else {
        return false;
    };
    let Ok(mut body) = world.get::<&mut Body>(entity) else {
        return false;
    };

    let reward = match body.planet().map(|o| o.is_home) {
        Some(true) => None,
        Some(false) if shooter.siege => {
            if body.blink > 0 {
                return true;
            }
            body.blink = PLANET_HIT_BLINK;
            let Some(orbit) = body.planet_mut() else {
                return true;
            };
            orbit.hp = orbit.hp.saturating_sub(1);
            if orbit.hp > 0 {
                return true;
            }
            body.destroyed = true;
            events.push(SimEvent::Explosion {
                pos,
                severity: Severity::Catastrophic,
            });
            spawns.push(Spawn::Debris {
                center: pos,
                count: PLANET_DEBRIS_COUNT,
                hot: true,
            });
            spawns.push(Spawn::Shockwave(impulse_ring(pos)));
            log::info!("planet at {pos:?} destroyed by gunfire");
            Some(SCORE_PLANET)
        }
        Some(false) => {
            let base = body.target_r.max(body.r);
            body.target_r = (base + shot.size * BULLET_ABSORB_FACTOR).min(PLANET_MAX_SIZE);
            None
        }
        None if body.blink > 0 => None,
        None => {
            body.destroyed = true;
            let vel = world.get::<&Motion>(entity).map(|m| m.vel).unwrap_or_default();
            let axis = split_axis(motion.vel);
            spawns.extend(
                fragments(pos, vel, body.r, axis)
                    .into_iter()
                    .map(Spawn::Asteroid),
            );
            events.push(SimEvent::Explosion {
                pos,
                severity: Severity::Small,
            });
            Some(SCORE_ASTEROID)
        }
    };
    drop(body);

    if let Some(reward) = reward {
        casualties::award_to(world, registry, shot.owner, reward, events);
    }
    true
}

/// Damage the first unit touched that the shot may harm. Allies in the way
/// are passed through. Returns true if the bullet is used up.
fn hit_unit(
    world: &mut World,
    targets: &[Target],
    motion: &Motion,
    shot: &Projectile,
    shooter: &Shooter,
    events: &mut Vec<SimEvent>,
    kills: &mut Vec<Kill>,
) -> bool {
    // The player's own side feels every shot until the betrayal lands.
    let traitor = |t: &Target| shooter.is_player && !shooter.lone_wolf && t.friendly;
    let hit = targets.iter().find(|t| {
        Some(t.id) != shot.owner
            && t.pos.distance(motion.pos) < t.radius + shot.size
            && (traitor(t) || hostile_to(shot, t))
    });
    let Some(target) = hit else {
        return false;
    };
    let traitor_shot = traitor(target);
    if target.is_player {
        casualties::hit_player(world, target.entity, DeathCause::Gunfire, events);
        return true;
    }

    let Ok(mut unit) = world.get::<&mut Unit>(target.entity) else {
        return true;
    };
    if unit.destroyed || (unit.blink > 0 && !traitor_shot) {
        return true;
    }
    unit.hp = unit.hp.saturating_sub(1);
    if unit.hp == 0 {
        unit.destroyed = true;
        kills.push(Kill {
            victim: target.id,
            killer: shot.owner,
        });
    }
    true
}
