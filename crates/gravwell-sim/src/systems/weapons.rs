//! Gun discharge: tier bullet patterns, the friendly-fire guard for AI
//! shooters, reload draws, and the god-tier ring.

use glam::DVec2;
use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use gravwell_core::components::{Motion, PlayerControl, Projectile, StableId, Unit};
use gravwell_core::constants::*;
use gravwell_core::events::SimEvent;
use gravwell_core::types::{unit, EntityId};
use gravwell_squad_ai::fsm::FireOrder;
use gravwell_squad_ai::targeting::{trajectory_clear, Contact};

use crate::registry::Registry;
use crate::systems::Spawn;
use crate::world_setup::god_ring;

/// An AI unit asking to shoot. The volley leaves along the shooter's
/// facing; the aim point only feeds the friendly-fire guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub shooter: EntityId,
    pub order: FireOrder,
}

/// One barrel of a volley.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    /// Angle off the firing line.
    pub offset: f64,
    /// Short-lived side shot.
    pub secondary: bool,
}

fn main_shot(offset: f64) -> Shot {
    Shot {
        offset,
        secondary: false,
    }
}

fn pair(offset: f64, secondary: bool) -> [Shot; 2] {
    let shot = |o| Shot {
        offset: o,
        secondary,
    };
    [shot(offset), shot(-offset)]
}

/// Barrels fired at `tier`. Tiers past the last pattern reuse it.
pub fn pattern(tier: u32) -> Vec<Shot> {
    let mut shots = Vec::new();
    match tier.min(MAX_PATTERN_TIER) {
        0 | 1 => shots.push(main_shot(0.0)),
        2 => shots.extend([main_shot(0.0), main_shot(0.0)]),
        3 => {
            shots.push(main_shot(0.0));
            shots.extend(pair(0.1, false));
        }
        4 => {
            shots.push(main_shot(0.0));
            shots.extend(pair(0.2, true));
        }
        5 => {
            shots.push(main_shot(0.0));
            shots.extend(pair(0.15, false));
            shots.extend(pair(0.3, true));
        }
        6 => {
            shots.push(main_shot(0.0));
            shots.extend(pair(0.12, false));
            shots.extend(pair(0.24, true));
        }
        7 => {
            shots.push(main_shot(0.0));
            shots.extend(pair(0.1, false));
            shots.extend(pair(0.2, true));
            shots.extend(pair(0.3, true));
        }
        8 => {
            shots.push(main_shot(0.0));
            shots.extend(pair(0.12, false));
            shots.extend(pair(0.24, false));
        }
        9 => {
            shots.push(main_shot(0.0));
            for i in 1..=3 {
                shots.extend(pair(i as f64 * 0.08, false));
            }
        }
        10 => {
            shots.push(main_shot(0.0));
            for i in 1..=6 {
                shots.extend(pair(i as f64 * 0.04, false));
            }
        }
        _ => {
            shots.push(main_shot(0.0));
            for i in 1..=10 {
                shots.extend(pair(i as f64 * 0.02, false));
            }
        }
    }
    shots
}

/// The muzzle state of one shooter.
#[derive(Debug, Clone)]
pub struct Gun {
    pub owner: EntityId,
    pub pos: DVec2,
    pub vel: DVec2,
    pub radius: f64,
    pub unit: Unit,
}

/// Projectiles for one volley along `heading`.
pub fn volley(gun: &Gun, heading: f64) -> Vec<Spawn> {
    let shooter = &gun.unit;
    let tier = shooter.tier.min(MAX_PATTERN_TIER) as f64;
    let muzzle = gun.radius * (1.0 + tier * TIER_HULL_SCALE) + MUZZLE_CLEARANCE;
    let speed = shooter.weapon.bullet_speed * (1.0 + TIER_SPEED_SCALE * tier);
    let size = shooter.weapon.bullet_size * (1.0 + TIER_SIZE_SCALE * tier);

    pattern(shooter.tier)
        .into_iter()
        .map(|shot| {
            let dir = unit(heading + shot.offset);
            Spawn::Projectile {
                pos: gun.pos + dir * muzzle,
                vel: gun.vel + dir * speed,
                projectile: Projectile {
                    life: if shot.secondary {
                        BULLET_SECONDARY_LIFETIME
                    } else {
                        shooter.weapon.bullet_life
                    },
                    size,
                    tier: shooter.tier,
                    owner: Some(gun.owner),
                    hue: shooter.hue,
                    friendly: shooter.friendly,
                    spent: false,
                },
            }
        })
        .collect()
}

fn draw_reload(rng: &mut ChaCha8Rng, (min, spread): (f64, f64)) -> f64 {
    min + rng.gen::<f64>() * spread
}

/// Discharge AI triggers and player guns.
pub fn run(
    world: &mut World,
    registry: &Registry,
    rng: &mut ChaCha8Rng,
    triggers: &[Trigger],
    events: &mut Vec<SimEvent>,
    spawns: &mut Vec<Spawn>,
) {
    let mut contacts: Vec<Contact> = world
        .query::<(&StableId, &Motion, &Unit, Option<&PlayerControl>)>()
        .iter()
        .filter(|(_, (_, _, u, player))| !u.destroyed && !player.is_some_and(|p| p.dead))
        .map(|(_, (id, motion, u, player))| Contact {
            id: id.0,
            pos: motion.pos,
            vel: motion.vel,
            radius: u.radius,
            hue: u.hue,
            friendly: u.friendly,
            is_station: u.is_station(),
            is_player: player.is_some(),
        })
        .collect();
    contacts.sort_by_key(|c| c.id);

    let mut blocked = 0usize;
    for trigger in triggers {
        let Ok(idx) = contacts.binary_search_by_key(&trigger.shooter, |c| c.id) else {
            continue;
        };
        let shooter = contacts[idx];
        if !trajectory_clear(&shooter, trigger.order.at, &contacts) {
            blocked += 1;
            continue;
        }
        let Some(entity) = registry.get(shooter.id) else {
            continue;
        };
        let Some(gun) = ai_gun(world, entity, &shooter) else {
            continue;
        };
        if gun.unit.reload > 0.0 {
            continue;
        }
        spawns.extend(volley(&gun, gun.unit.facing));
        events.push(SimEvent::LaserFired {
            pos: shooter.pos,
            tier: gun.unit.tier,
        });
        let reload = draw_reload(rng, trigger.order.reload);
        if let Ok(mut unit) = world.get::<&mut Unit>(entity) {
            unit.reload = reload;
        }
    }
    if blocked > 0 {
        log::trace!("{blocked} shots held by the friendly-fire guard");
    }

    fire_player(world, events, spawns);
}

fn ai_gun(world: &World, entity: Entity, shooter: &Contact) -> Option<Gun> {
    let unit = world.get::<&Unit>(entity).ok()?;
    Some(Gun {
        owner: shooter.id,
        pos: shooter.pos,
        vel: shooter.vel,
        radius: shooter.radius,
        unit: (*unit).clone(),
    })
}

fn fire_player(world: &mut World, events: &mut Vec<SimEvent>, spawns: &mut Vec<Spawn>) {
    for (_entity, (id, motion, unit, control)) in
        world.query_mut::<(&StableId, &Motion, &mut Unit, &mut PlayerControl)>()
    {
        if !control.fire_requested || control.dead || unit.reload > 0.0 {
            continue;
        }
        control.fire_requested = false;

        if unit.tier >= GOD_TIER {
            spawns.push(Spawn::Shockwave(god_ring(motion.pos, id.0)));
            unit.reload = (PLAYER_RELOAD * GOD_RING_RELOAD_FACTOR) as f64;
            events.push(SimEvent::GodRing { pos: motion.pos });
            log::debug!("god ring fired at {:?}", motion.pos);
            continue;
        }

        let gun = Gun {
            owner: id.0,
            pos: motion.pos,
            vel: motion.vel,
            radius: unit.radius,
            unit: unit.clone(),
        };
        spawns.extend(volley(&gun, unit.facing));
        unit.reload = PLAYER_RELOAD as f64;
        events.push(SimEvent::LaserFired {
            pos: motion.pos,
            tier: unit.tier,
        });
    }
}
