//! Pairwise body interactions: attraction, burn-up, merging, fragmentation,
//! absorption, and planet catastrophes. Also ship-versus-asteroid contacts.
//!
//! Bodies are copied out of the world sorted by id, resolved in place, and
//! written back, so pair order is deterministic and no query borrow is held
//! while two bodies are mutated together. Destruction only sets flags; the
//! cleanup pass despawns.

use std::collections::HashMap;

use glam::DVec2;
use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use gravwell_core::components::{Body, Motion, PlayerControl, StableId, Unit};
use gravwell_core::constants::*;
use gravwell_core::enums::{DeathCause, Severity};
use gravwell_core::events::SimEvent;
use gravwell_core::types::{unit, EntityId};

use crate::spatial::SpatialGrid;
use crate::systems::casualties::{self, Kill};
use crate::systems::Spawn;
use crate::world_setup::{impulse_ring, promote_to_planet, AsteroidSeed};

/// A body copied out of the world for resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    pub id: EntityId,
    pub motion: Motion,
    pub body: Body,
}

impl BodyState {
    fn destroy(&mut self) {
        self.body.destroyed = true;
        self.body.r = 0.0;
        self.body.target_r = 0.0;
    }
}

/// Shared state and side channels for one resolution pass.
pub struct Resolution<'a> {
    pub rng: &'a mut ChaCha8Rng,
    /// Planet capacity; catastrophes shrink it.
    pub planet_limit: &'a mut usize,
    /// Live planets, kept current as planets form and die.
    pub planets_live: usize,
    pub bounds: f64,
    pub events: &'a mut Vec<SimEvent>,
    pub spawns: &'a mut Vec<Spawn>,
}

impl Resolution<'_> {
    fn has_room(&self) -> bool {
        self.planets_live < *self.planet_limit
    }
}

/// Resolve every candidate pair for this tick.
#[allow(clippy::too_many_arguments)]
pub fn run(
    world: &mut World,
    grid: &SpatialGrid,
    rng: &mut ChaCha8Rng,
    planet_limit: &mut usize,
    bounds: f64,
    events: &mut Vec<SimEvent>,
    spawns: &mut Vec<Spawn>,
) {
    let mut states: Vec<(Entity, BodyState)> = world
        .query::<(&StableId, &Motion, &Body)>()
        .iter()
        .filter(|(_, (_, _, body))| !body.destroyed)
        .map(|(entity, (id, motion, body))| {
            (
                entity,
                BodyState {
                    id: id.0,
                    motion: *motion,
                    body: *body,
                },
            )
        })
        .collect();
    states.sort_by_key(|(_, s)| s.id);

    let index: HashMap<EntityId, usize> = states
        .iter()
        .enumerate()
        .map(|(i, (_, s))| (s.id, i))
        .collect();
    let planets_live = states.iter().filter(|(_, s)| s.body.is_planet()).count();

    let mut res = Resolution {
        rng,
        planet_limit,
        planets_live,
        bounds,
        events,
        spawns,
    };

    let active: Vec<usize> = states
        .iter()
        .enumerate()
        .filter(|(_, (_, s))| s.body.planet().is_some_and(|o| o.z < ACTIVE_PLANET_Z))
        .map(|(i, _)| i)
        .collect();

    // Planets against each other and against whatever the grid holds nearby.
    for (n, &i) in active.iter().enumerate() {
        for &j in &active[n + 1..] {
            if states[i].1.body.destroyed {
                break;
            }
            if !states[j].1.body.destroyed {
                resolve_at(&mut states, i, j, &mut res);
            }
        }
        let pos = states[i].1.motion.pos;
        for entry in grid.query(pos) {
            if states[i].1.body.destroyed {
                break;
            }
            let Some(&j) = index.get(&entry.id) else {
                continue;
            };
            let other = &states[j].1.body;
            if !other.is_planet() && !other.destroyed {
                resolve_at(&mut states, i, j, &mut res);
            }
        }
    }

    // Asteroid pairs, each visited once from its lower id.
    for i in 0..states.len() {
        let me = &states[i].1;
        if me.body.is_planet() || me.body.destroyed || me.body.blink > 0 {
            continue;
        }
        let (id, pos) = (me.id, me.motion.pos);
        for entry in grid.query(pos) {
            if states[i].1.body.destroyed {
                break;
            }
            if entry.id <= id {
                continue;
            }
            let Some(&j) = index.get(&entry.id) else {
                continue;
            };
            let other = &states[j].1.body;
            if !other.is_planet() && !other.destroyed {
                resolve_at(&mut states, i, j, &mut res);
            }
        }
    }

    for (entity, state) in &states {
        if let Ok(mut motion) = world.get::<&mut Motion>(*entity) {
            *motion = state.motion;
        }
        if let Ok(mut body) = world.get::<&mut Body>(*entity) {
            *body = state.body;
        }
    }
}

fn resolve_at(states: &mut [(Entity, BodyState)], i: usize, j: usize, res: &mut Resolution) {
    let (a, b) = pair_mut(states, i, j);
    resolve_pair(&mut a.1, &mut b.1, res);
}

fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

/// Apply the interaction rules to one pair.
pub fn resolve_pair(a: &mut BodyState, b: &mut BodyState, res: &mut Resolution) {
    if a.body.blink > 0 || b.body.blink > 0 {
        return;
    }
    let (a_planet, b_planet) = (a.body.is_planet(), b.body.is_planet());
    // Hot debris passes through other rocks.
    if !a_planet && !b_planet && (a.body.hot || b.body.hot) {
        return;
    }

    let offset = b.motion.pos - a.motion.pos;
    let dist = offset.length();
    let contact = a.body.r + b.body.r;
    if dist >= contact {
        if dist < contact * ATTRACTION_BAND_FACTOR {
            attract_pair(a, b, offset, dist, res);
        }
        return;
    }

    let mid = (a.motion.pos + b.motion.pos) * 0.5;
    match (a_planet, b_planet) {
        (true, true) => planet_catastrophe(a, b, mid, res),
        (true, false) => absorb(a, b, mid, res),
        (false, true) => absorb(b, a, mid, res),
        (false, false) => match (a.body.is_giant(), b.body.is_giant()) {
            (true, true) => merge_giants(a, b, mid, res),
            (true, false) => giant_strike(a, b, mid, res),
            (false, true) => giant_strike(b, a, mid, res),
            (false, false) => {
                merge(a, b);
                res.events.push(SimEvent::SoftThud { pos: mid });
                if a.body.target_r > ASTEROID_MAX_SIZE && res.has_room() {
                    promote(a, mid, res);
                }
            }
        },
    }
}

fn is_satellite(body: &Body) -> bool {
    body.r <= ASTEROID_MIN_SIZE * SATELLITE_FACTOR || body.hot
}

fn attract_pair(a: &mut BodyState, b: &mut BodyState, offset: DVec2, dist: f64, res: &mut Resolution) {
    let dist_sq = dist * dist;
    let (ma, mb) = (a.body.mass, b.body.mass);
    let force = match (a.body.is_planet(), b.body.is_planet()) {
        (true, true) => G_CONST * ma * mb * PLANET_PAIR_GAIN / dist_sq.max(2000.0),
        (true, false) | (false, true) => G_CONST * ma * mb / dist_sq.max(500.0),
        (false, false) => {
            let g = if a.body.is_giant() || b.body.is_giant() {
                GIANT_PAIR_G
            } else {
                ROCK_PAIR_G
            };
            g * ma * mb / dist_sq.max(400.0)
        }
    };
    let pull = offset / dist * force;
    if !pull.is_finite() {
        return;
    }
    a.motion.vel += pull / ma;
    b.motion.vel -= pull / mb;

    let (planet, rock) = match (a.body.is_planet(), b.body.is_planet()) {
        (true, false) => (&*a, b),
        (false, true) => (&*b, a),
        _ => return,
    };
    if is_satellite(&rock.body) && dist < planet.body.r + rock.body.r + ATMOSPHERE_SHELL {
        res.events.push(SimEvent::Explosion {
            pos: rock.motion.pos,
            severity: Severity::Small,
        });
        rock.destroy();
    }
}

/// Two planets touching: both die, debris and shockwaves follow.
fn planet_catastrophe(a: &mut BodyState, b: &mut BodyState, mid: DVec2, res: &mut Resolution) {
    let home_hit = [&*a, &*b]
        .iter()
        .any(|s| s.body.planet().is_some_and(|o| o.is_home));
    a.destroy();
    b.destroy();
    res.planets_live = res.planets_live.saturating_sub(2);
    *res.planet_limit = res.planet_limit.saturating_sub(PLANET_LIMIT_LOSS);

    res.events.push(SimEvent::Explosion {
        pos: mid,
        severity: Severity::Catastrophic,
    });
    res.spawns.push(Spawn::Debris {
        center: mid,
        count: PLANET_DEBRIS_COUNT,
        hot: true,
    });
    res.spawns.push(Spawn::Shockwave(impulse_ring(mid)));
    res.spawns.push(Spawn::Shockwave(impulse_ring(mid)));
    log::info!(
        "planets {} and {} collided, planet limit now {}",
        a.id,
        b.id,
        res.planet_limit
    );
    if home_hit {
        log::info!("home planet lost in collision");
        res.events.push(SimEvent::HomePlanetLost);
    }
}

/// A rock meets a planet: small or hot rocks burn up, larger ones feed it.
fn absorb(planet: &mut BodyState, rock: &mut BodyState, mid: DVec2, res: &mut Resolution) {
    if !is_satellite(&rock.body) {
        let base = planet.body.target_r.max(planet.body.r);
        planet.body.target_r = (base * base + rock.body.r * rock.body.r * PLANET_ABSORB_WEIGHT)
            .sqrt()
            .min(PLANET_MAX_SIZE);
        planet.body.mass += rock.body.mass;
    }
    res.events.push(SimEvent::Explosion {
        pos: mid,
        severity: Severity::Small,
    });
    rock.destroy();
}

/// Momentum-conserving merge of `other` into `keep`. The radius combines by
/// area and then grows toward a small bonus.
pub fn merge(keep: &mut BodyState, other: &mut BodyState) {
    let (m1, m2) = (keep.body.mass, other.body.mass);
    let total = m1 + m2;
    keep.motion.pos = (keep.motion.pos * m1 + other.motion.pos * m2) / total;
    keep.motion.vel = (keep.motion.vel * m1 + other.motion.vel * m2) / total;
    let r = (keep.body.r * keep.body.r + other.body.r * other.body.r).sqrt();
    keep.body.r = r;
    keep.body.target_r = r * MERGE_GROWTH_BONUS;
    keep.body.mass = total;
    other.destroy();
}

fn merge_giants(a: &mut BodyState, b: &mut BodyState, mid: DVec2, res: &mut Resolution) {
    merge(a, b);
    a.motion.vel *= 0.5;
    if res.has_room() {
        promote(a, mid, res);
    } else {
        res.events.push(SimEvent::SoftThud { pos: mid });
    }
}

fn promote(state: &mut BodyState, mid: DVec2, res: &mut Resolution) {
    promote_to_planet(&mut state.body, res.rng, state.motion.pos, res.bounds);
    state.body.target_r = state
        .body
        .target_r
        .max(ASTEROID_MAX_SIZE + 10.0)
        .min(PLANET_MAX_SIZE);
    res.planets_live += 1;
    res.events.push(SimEvent::Explosion {
        pos: mid,
        severity: Severity::Large,
    });
    log::debug!("body {} promoted to planet (r={:.0})", state.id, state.body.r);
}

/// A giant meets a smaller rock: pebbles are swallowed, anything bigger
/// shatters both.
fn giant_strike(giant: &mut BodyState, small: &mut BodyState, mid: DVec2, res: &mut Resolution) {
    if small.body.r <= ASTEROID_MIN_SIZE * SMALL_BODY_FACTOR {
        small.destroy();
        res.events.push(SimEvent::SoftThud { pos: mid });
        return;
    }
    for state in [giant, small] {
        let axis = unit(res.rng.gen::<f64>() * std::f64::consts::TAU);
        res.spawns.extend(
            fragments(state.motion.pos, state.motion.vel, state.body.r, axis)
                .into_iter()
                .map(Spawn::Asteroid),
        );
        state.destroy();
    }
    res.events.push(SimEvent::Explosion {
        pos: mid,
        severity: Severity::Medium,
    });
}

/// Children of a body breaking up along `axis`: two halves pushed apart at
/// the asteroid speed cap, or nothing if the halves would be too small.
pub fn fragments(pos: DVec2, vel: DVec2, r: f64, axis: DVec2) -> Vec<AsteroidSeed> {
    let child_r = r * 0.5;
    if child_r < ASTEROID_MIN_SIZE {
        return Vec::new();
    }
    let offset = axis * r * FRAGMENT_OFFSET_FACTOR;
    [1.0, -1.0]
        .into_iter()
        .map(|side| AsteroidSeed {
            pos: pos + offset * side,
            vel: vel + axis * ASTEROID_MAX_SPEED * side,
            r: child_r,
            blink: FRAGMENT_BLINK_TICKS,
            hot: false,
        })
        .collect()
}

/// Ships scraping asteroids: pushed clear, kicked away, and damaged unless
/// blinking. Stations hold their own space and are skipped.
pub fn ship_contacts(world: &mut World, grid: &SpatialGrid, events: &mut Vec<SimEvent>) -> Vec<Kill> {
    let ships: Vec<(Entity, EntityId, Motion, f64, bool)> = world
        .query::<(&StableId, &Motion, &Unit, Option<&PlayerControl>)>()
        .iter()
        .filter(|(_, (_, _, u, player))| {
            !u.is_station() && !u.destroyed && !player.is_some_and(|p| p.dead)
        })
        .map(|(entity, (id, motion, u, player))| (entity, id.0, *motion, u.radius, player.is_some()))
        .collect();

    let mut kills = Vec::new();
    for (entity, id, mut motion, radius, is_player) in ships {
        let mut touched = false;
        for entry in grid.query(motion.pos) {
            let Ok(body) = world.get::<&Body>(entry.entity) else {
                continue;
            };
            if body.is_planet() || body.destroyed {
                continue;
            }
            let away = motion.pos - entry.pos;
            let dist = away.length();
            let reach = radius + body.r;
            if dist >= reach || dist <= f64::EPSILON {
                continue;
            }
            let dir = away / dist;
            motion.pos += dir * (reach - dist);
            motion.vel += dir * SHIP_ROCK_KICK;
            touched = true;
        }
        if !touched {
            continue;
        }
        if let Ok(mut m) = world.get::<&mut Motion>(entity) {
            *m = motion;
        }

        if is_player {
            casualties::hit_player(world, entity, DeathCause::Collision, events);
            continue;
        }
        if let Ok(mut ship) = world.get::<&mut Unit>(entity) {
            if ship.blink > 0 {
                continue;
            }
            ship.hp = ship.hp.saturating_sub(1);
            ship.blink = SHIP_HIT_BLINK;
            if ship.hp == 0 && !ship.destroyed {
                ship.destroyed = true;
                kills.push(Kill {
                    victim: id,
                    killer: None,
                });
            }
        }
    }
    kills
}
