//! Expanding rings. Impulse rings shove whatever sits on their front; a god
//! ring destroys it.

use glam::DVec2;
use hecs::{Entity, World};

use gravwell_core::components::{Body, Motion, PlayerControl, Shockwave, StableId, Unit};
use gravwell_core::constants::*;
use gravwell_core::enums::{Severity, ShockwaveKind};
use gravwell_core::events::SimEvent;
use gravwell_core::types::EntityId;

use crate::registry::Registry;
use crate::systems::casualties::{self, Kill};
use crate::systems::Spawn;
use crate::world_setup::impulse_ring;

/// A ring is over once faded or fully grown.
pub fn is_finished(wave: &Shockwave) -> bool {
    wave.alpha <= 0.0 || wave.r >= wave.max_r
}

fn grow(wave: &mut Shockwave) {
    match wave.kind {
        ShockwaveKind::Impulse => {
            wave.r += SHOCKWAVE_GROWTH;
            wave.alpha -= SHOCKWAVE_DECAY;
        }
        ShockwaveKind::GodRing => {
            wave.r += GOD_RING_GROWTH;
            wave.alpha -= GOD_RING_DECAY;
        }
    }
}

fn band(wave: &Shockwave) -> f64 {
    match wave.kind {
        ShockwaveKind::Impulse => SHOCKWAVE_BAND,
        ShockwaveKind::GodRing => GOD_RING_BAND,
    }
}

pub fn run(
    world: &mut World,
    registry: &Registry,
    events: &mut Vec<SimEvent>,
    spawns: &mut Vec<Spawn>,
) -> Vec<Kill> {
    let mut waves: Vec<(Entity, EntityId, Shockwave)> = world
        .query::<(&StableId, &Shockwave)>()
        .iter()
        .filter(|(_, (_, w))| !is_finished(w))
        .map(|(entity, (id, w))| (entity, id.0, *w))
        .collect();
    waves.sort_by_key(|(_, id, _)| *id);

    let mut kills = Vec::new();
    for (entity, _id, mut wave) in waves {
        grow(&mut wave);
        match wave.kind {
            ShockwaveKind::Impulse => push_front(world, &wave),
            ShockwaveKind::GodRing => {
                sweep(world, registry, &wave, events, spawns, &mut kills);
            }
        }
        if let Ok(mut w) = world.get::<&mut Shockwave>(entity) {
            *w = wave;
        }
    }
    kills
}

/// Offset from the centre and distance, if `pos` lies on the ring front.
fn on_front(wave: &Shockwave, pos: DVec2) -> Option<(DVec2, f64)> {
    let offset = pos - wave.center;
    let dist = offset.length();
    ((dist - wave.r).abs() < band(wave) && dist > f64::EPSILON).then_some((offset / dist, dist))
}

fn push_front(world: &mut World, wave: &Shockwave) {
    let force = |dist: f64| wave.strength * (1.0 - dist / wave.max_r).max(0.0);

    for (_entity, (motion, body)) in world.query_mut::<(&mut Motion, &Body)>() {
        if body.destroyed || body.is_planet() {
            continue;
        }
        if let Some((dir, dist)) = on_front(wave, motion.pos) {
            motion.vel += dir * force(dist) * SHOCKWAVE_IMPULSE;
        }
    }
    for (_entity, (motion, unit, player)) in
        world.query_mut::<(&mut Motion, &Unit, Option<&PlayerControl>)>()
    {
        if unit.destroyed || unit.is_station() || player.is_some_and(|p| p.dead) {
            continue;
        }
        let gain = if player.is_some() {
            SHOCKWAVE_PLAYER_IMPULSE
        } else {
            SHOCKWAVE_IMPULSE
        };
        if let Some((dir, dist)) = on_front(wave, motion.pos) {
            motion.vel += dir * force(dist) * gain;
        }
    }
}

/// God ring: everything on the front except its owner and blinking
/// survivors is destroyed.
fn sweep(
    world: &mut World,
    registry: &Registry,
    wave: &Shockwave,
    events: &mut Vec<SimEvent>,
    spawns: &mut Vec<Spawn>,
    kills: &mut Vec<Kill>,
) {
    let mut score = 0;
    for (_entity, (id, motion, body)) in world.query_mut::<(&StableId, &Motion, &mut Body)>() {
        if body.destroyed || body.blink > 0 || body.z() >= NEAR_PLANE_Z {
            continue;
        }
        if on_front(wave, motion.pos).is_none() {
            continue;
        }
        body.destroyed = true;
        match body.planet() {
            Some(orbit) => {
                events.push(SimEvent::Explosion {
                    pos: motion.pos,
                    severity: Severity::Catastrophic,
                });
                spawns.push(Spawn::Debris {
                    center: motion.pos,
                    count: PLANET_DEBRIS_COUNT,
                    hot: true,
                });
                spawns.push(Spawn::Shockwave(impulse_ring(motion.pos)));
                if orbit.is_home {
                    log::info!("home planet {} caught in a god ring", id.0);
                    events.push(SimEvent::HomePlanetLost);
                }
                score += SCORE_PLANET;
            }
            None => {
                events.push(SimEvent::Explosion {
                    pos: motion.pos,
                    severity: Severity::Small,
                });
                score += SCORE_ASTEROID;
            }
        }
    }

    for (_entity, (id, motion, unit, player)) in
        world.query_mut::<(&StableId, &Motion, &mut Unit, Option<&PlayerControl>)>()
    {
        if Some(id.0) == wave.owner || player.is_some() || unit.destroyed || unit.blink > 0 {
            continue;
        }
        if on_front(wave, motion.pos).is_some() {
            unit.destroyed = true;
            kills.push(Kill {
                victim: id.0,
                killer: None,
            });
        }
    }

    if score > 0 {
        casualties::award_to(world, registry, wave.owner, score, events);
    }
}
