//! Deaths and their consequences: score and tier, player hits and lives,
//! station wreckage, and the player's betrayal of the allied fleet.

use glam::DVec2;
use hecs::{Entity, World};

use gravwell_core::components::{Motion, PlayerControl, StableId, Unit};
use gravwell_core::constants::*;
use gravwell_core::enums::{AiState, DeathCause, Severity, SquadRole};
use gravwell_core::events::SimEvent;
use gravwell_core::types::EntityId;

use crate::registry::Registry;
use crate::systems::Spawn;
use crate::world_setup::AsteroidSeed;

/// A unit flagged destroyed this tick, with whoever fired the last shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub victim: EntityId,
    pub killer: Option<EntityId>,
}

/// Tier reached at `score`. One tier per 1000 points, with the step growing
/// by 1000 per tier from tier 7 on.
pub fn tier_for_score(score: i64) -> u32 {
    let score = score.max(0);
    let mut tier = 0u32;
    let mut threshold = 0i64;
    let mut step = EVOLUTION_SCORE_STEP;
    while score >= threshold + step {
        threshold += step;
        tier += 1;
        step = if tier >= TIER_STEP_GROWTH_FROM {
            (tier - (TIER_STEP_GROWTH_FROM - 2)) as i64 * EVOLUTION_SCORE_STEP
        } else {
            EVOLUTION_SCORE_STEP
        };
    }
    tier
}

/// Add `reward` (possibly negative) and re-derive the tier.
pub fn award(unit: &mut Unit, id: EntityId, reward: i64, events: &mut Vec<SimEvent>) {
    unit.score += reward;
    let tier = tier_for_score(unit.score);
    if tier != unit.tier {
        unit.tier = tier;
        events.push(SimEvent::TierChanged { id, tier });
    }
}

/// Award by id. Unknown or departed ids are ignored.
pub fn award_to(
    world: &mut World,
    registry: &Registry,
    id: Option<EntityId>,
    reward: i64,
    events: &mut Vec<SimEvent>,
) {
    let Some((id, entity)) = id.and_then(|id| registry.get(id).map(|e| (id, e))) else {
        return;
    };
    if let Ok(mut unit) = world.get::<&mut Unit>(entity) {
        award(&mut unit, id, reward, events);
    }
}

/// Settle this tick's kills: events, wreckage, and rewards.
pub fn settle(
    world: &mut World,
    registry: &Registry,
    kills: &[Kill],
    events: &mut Vec<SimEvent>,
    spawns: &mut Vec<Spawn>,
) {
    for kill in kills {
        let Some(entity) = registry.get(kill.victim) else {
            continue;
        };
        let Some((pos, vel, is_station, friendly)) = victim_info(world, entity) else {
            continue;
        };

        let reward = if is_station {
            events.push(SimEvent::StationDestroyed {
                id: kill.victim,
                pos,
            });
            events.push(SimEvent::Explosion {
                pos,
                severity: Severity::Large,
            });
            spawns.push(Spawn::Asteroid(AsteroidSeed {
                pos: pos + DVec2::new(JUNK_OFFSET, 0.0),
                vel: vel + DVec2::new(ASTEROID_MAX_SPEED, 0.0),
                r: ASTEROID_MIN_SIZE,
                blink: FRAGMENT_BLINK_TICKS,
                hot: false,
            }));
            log::debug!("station {} destroyed", kill.victim);
            SCORE_STATION
        } else {
            events.push(SimEvent::ShipDestroyed {
                id: kill.victim,
                pos,
            });
            events.push(SimEvent::Explosion {
                pos,
                severity: Severity::Medium,
            });
            SCORE_SHIP
        };

        let Some(killer) = kill.killer else {
            continue;
        };
        let Some(killer_entity) = registry.get(killer) else {
            continue;
        };
        let player_lone_wolf = world
            .get::<&PlayerControl>(killer_entity)
            .ok()
            .map(|p| p.lone_wolf);
        match player_lone_wolf {
            Some(false) if friendly => {
                award_to(world, registry, Some(killer), -reward, events);
                betray(world, events);
            }
            Some(_) => {
                award_to(world, registry, Some(killer), reward, events);
                if is_station {
                    reward_station_kill(world, killer_entity);
                }
            }
            None => award_to(world, registry, Some(killer), reward, events),
        }
    }
}

fn victim_info(world: &World, entity: Entity) -> Option<(DVec2, DVec2, bool, bool)> {
    let motion = *world.get::<&Motion>(entity).ok()?;
    let unit = world.get::<&Unit>(entity).ok()?;
    Some((motion.pos, motion.vel, unit.is_station(), unit.friendly))
}

/// Taking out a hostile station earns a life and a fresh hull.
fn reward_station_kill(world: &mut World, player: Entity) {
    if let Ok((unit, control)) = world.query_one_mut::<(&mut Unit, &mut PlayerControl)>(player) {
        control.lives += 1;
        unit.hp = SHIP_HP;
    }
}

/// One point of damage to the player. Returns true if it cost a life.
pub fn hit_player(
    world: &mut World,
    entity: Entity,
    cause: DeathCause,
    events: &mut Vec<SimEvent>,
) -> bool {
    let Ok((id, unit, control, motion)) =
        world.query_one_mut::<(&StableId, &mut Unit, &mut PlayerControl, &mut Motion)>(entity)
    else {
        return false;
    };
    if control.dead || unit.blink > 0 {
        return false;
    }
    unit.hp = unit.hp.saturating_sub(1);
    if unit.hp > 0 {
        unit.blink = PLAYER_HIT_BLINK;
        motion.vel *= PLAYER_HIT_RECOIL;
        events.push(SimEvent::PlayerHit { hp_left: unit.hp });
        return false;
    }
    kill_player(id.0, unit, control, motion, cause, events);
    true
}

fn kill_player(
    id: EntityId,
    unit: &mut Unit,
    control: &mut PlayerControl,
    motion: &mut Motion,
    cause: DeathCause,
    events: &mut Vec<SimEvent>,
) {
    control.dead = true;
    control.lives = control.lives.saturating_sub(1);
    control.respawn_timer = PLAYER_RESPAWN_TICKS;
    control.thrusting = false;
    control.braking = false;
    control.fire_requested = false;
    motion.vel = DVec2::ZERO;
    unit.hp = 0;
    if let Some(brain) = unit.brain_mut() {
        brain.leader = None;
    }
    award(unit, id, -PLAYER_DEATH_PENALTY, events);
    events.push(SimEvent::Explosion {
        pos: motion.pos,
        severity: Severity::Large,
    });
    events.push(SimEvent::PlayerKilled {
        lives_left: control.lives,
        cause,
    });
    log::info!("player killed ({cause:?}), {} lives left", control.lives);
}

/// The home planet is gone: the player's run ends whether alive or not.
pub fn end_run(world: &mut World, events: &mut Vec<SimEvent>) {
    for (_entity, (id, unit, control, motion)) in
        world.query_mut::<(&StableId, &mut Unit, &mut PlayerControl, &mut Motion)>()
    {
        if control.dead {
            control.lives = 0;
            control.respawn_timer = 0;
        } else {
            control.lives = 1;
            kill_player(id.0, unit, control, motion, DeathCause::HomeLost, events);
        }
    }
}

/// Friendly fire by the player: every allied unit turns on them.
pub fn betray(world: &mut World, events: &mut Vec<SimEvent>) {
    let mut already = true;
    for (_entity, control) in world.query_mut::<&mut PlayerControl>() {
        already = control.lone_wolf;
        control.lone_wolf = true;
    }
    if already {
        return;
    }

    let mut turned = 0usize;
    for (_entity, (unit, player)) in world.query_mut::<(&mut Unit, Option<&PlayerControl>)>() {
        if player.is_some() {
            if let Some(brain) = unit.brain_mut() {
                brain.leader = None;
            }
            continue;
        }
        if !unit.friendly {
            continue;
        }
        unit.friendly = false;
        unit.hue = TURNCOAT_HUE;
        if let Some(brain) = unit.brain_mut() {
            brain.state = AiState::Combat;
            if brain.role == SquadRole::Wingman {
                brain.role = SquadRole::Independent;
                brain.leader = None;
            }
        }
        turned += 1;
    }
    events.push(SimEvent::Betrayal);
    log::info!("player betrayed the fleet, {turned} units turned hostile");
}
