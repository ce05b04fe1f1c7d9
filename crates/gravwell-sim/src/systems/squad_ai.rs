//! Squad AI driver. Gathers what every ship can see, keeps squad slots
//! consistent, handles joining and recruiting, then runs the state machine
//! from `gravwell_squad_ai` and writes steering back.
//!
//! Decisions are taken against the state at the start of the pass and
//! applied together at the end, in id order.

use std::collections::HashMap;

use glam::DVec2;
use hecs::{Entity, World};
use rand_chacha::ChaCha8Rng;

use gravwell_core::components::{Body, Motion, PlayerControl, ShipBrain, StableId, Unit, UnitKind};
use gravwell_core::constants::*;
use gravwell_core::enums::{AiState, SquadRole};
use gravwell_core::types::EntityId;
use gravwell_squad_ai::fsm::{self, Anchor, UnitContext, UnitUpdate};
use gravwell_squad_ai::squad;
use gravwell_squad_ai::steering::{pick_waypoint, LeaderPose, Obstacle};
use gravwell_squad_ai::targeting::{are_allies, is_rival, Contact};

use crate::spatial::SpatialGrid;
use crate::systems::weapons::Trigger;

#[derive(Debug, Clone)]
struct UnitInfo {
    entity: Entity,
    contact: Contact,
    facing: f64,
    reload: f64,
    tier: u32,
    /// Ships only; written back at the end of the pass.
    brain: Option<ShipBrain>,
    player: Option<PlayerControl>,
}

impl UnitInfo {
    fn alive(&self) -> bool {
        !self.player.is_some_and(|p| p.dead)
    }

    fn is_ai_ship(&self) -> bool {
        self.player.is_none() && self.brain.is_some()
    }

    fn role(&self) -> Option<SquadRole> {
        self.brain.as_ref().map(|b| b.role)
    }

    fn has_free_slot(&self) -> bool {
        self.brain
            .as_ref()
            .is_some_and(|b| squad::free_slot(&b.slots).is_some())
    }
}

#[derive(Debug, Clone, Copy)]
struct HomePlanet {
    pos: DVec2,
    r: f64,
}

/// Everything the pass reads besides the units themselves.
struct Surroundings<'a> {
    world: &'a World,
    bodies: &'a SpatialGrid,
    units: SpatialGrid,
    index: HashMap<EntityId, usize>,
    home: Option<HomePlanet>,
    /// Near-plane planets other than the home world.
    enemy_planets: Vec<DVec2>,
    player: Option<usize>,
    god_mode: bool,
}

impl Surroundings<'_> {
    fn lookup(&self, id: EntityId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Near-plane asteroids within `range` of `pos`, closest first.
    fn obstacles(&self, pos: DVec2, range: f64) -> Vec<Obstacle> {
        self.bodies
            .query_radius(pos, range)
            .into_iter()
            .filter_map(|entry| {
                let body = self.world.get::<&Body>(entry.entity).ok()?;
                if body.is_planet() || body.destroyed {
                    return None;
                }
                let motion = self.world.get::<&Motion>(entry.entity).ok()?;
                Some(Obstacle {
                    id: entry.id,
                    pos: motion.pos,
                    vel: motion.vel,
                    r: body.r,
                })
            })
            .collect()
    }
}

/// Run squad bookkeeping and the state machine for every AI ship. Returns
/// the shots they want to take.
pub fn run(
    world: &mut World,
    bodies: &SpatialGrid,
    rng: &mut ChaCha8Rng,
    bounds: f64,
) -> Vec<Trigger> {
    let mut infos = gather(world);
    let updates = {
        let env = survey(world, bodies, &infos);
        compact_squads(&mut infos, &env);
        join_squads(&mut infos, &env);
        infos
            .iter()
            .enumerate()
            .filter(|(_, info)| info.is_ai_ship())
            .map(|(i, info)| (i, decide(info, &infos, &env)))
            .collect::<Vec<_>>()
    };
    let index: HashMap<EntityId, usize> = infos
        .iter()
        .enumerate()
        .map(|(i, info)| (info.contact.id, i))
        .collect();

    let mut triggers = Vec::new();
    let mut velocities = Vec::with_capacity(updates.len());
    for (i, update) in updates {
        let id = infos[i].contact.id;
        if update.state_changed {
            log::trace!("ship {id} -> {:?}", update.state);
        }
        if let Some(order) = update.fire {
            triggers.push(Trigger { shooter: id, order });
        }
        if update.abandon {
            abandon(&mut infos, &index, i);
        }
        let Some(brain) = infos[i].brain.as_mut() else {
            continue;
        };
        brain.state = update.state;
        brain.danger = update.danger;
        brain.danger_ticks = update.danger_ticks;
        if update.needs_waypoint {
            let me = infos[i].contact;
            let station = nearest_rival_station(&infos, &me);
            if let Some(brain) = infos[i].brain.as_mut() {
                brain.patrol_target = Some(pick_waypoint(rng, bounds, station));
            }
        }
        infos[i].facing = update.facing;
        velocities.push((i, update.vel));
    }

    for (i, vel) in velocities {
        if let Ok(mut motion) = world.get::<&mut Motion>(infos[i].entity) {
            motion.vel = vel;
        }
    }
    for info in infos {
        let Some(brain) = info.brain else {
            continue;
        };
        if let Ok(mut unit) = world.get::<&mut Unit>(info.entity) {
            unit.facing = info.facing;
            unit.kind = UnitKind::Ship(brain);
        }
    }
    triggers
}

fn gather(world: &World) -> Vec<UnitInfo> {
    let mut infos: Vec<UnitInfo> = world
        .query::<(&StableId, &Motion, &Unit, Option<&PlayerControl>)>()
        .iter()
        .filter(|(_, (_, _, unit, _))| !unit.destroyed)
        .map(|(entity, (id, motion, unit, player))| UnitInfo {
            entity,
            contact: Contact {
                id: id.0,
                pos: motion.pos,
                vel: motion.vel,
                radius: unit.radius,
                hue: unit.hue,
                friendly: unit.friendly,
                is_station: unit.is_station(),
                is_player: player.is_some(),
            },
            facing: unit.facing,
            reload: unit.reload,
            tier: unit.tier,
            brain: unit.brain().cloned(),
            player: player.copied(),
        })
        .collect();
    infos.sort_by_key(|info| info.contact.id);
    infos
}

fn survey<'a>(world: &'a World, bodies: &'a SpatialGrid, infos: &[UnitInfo]) -> Surroundings<'a> {
    let home = world
        .query::<(&Motion, &Body)>()
        .iter()
        .find(|(_, (_, body))| !body.destroyed && body.planet().is_some_and(|o| o.is_home))
        .map(|(_, (motion, body))| HomePlanet {
            pos: motion.pos,
            r: body.r,
        });
    let mut enemy_planets: Vec<(EntityId, DVec2)> = world
        .query::<(&StableId, &Motion, &Body)>()
        .iter()
        .filter(|(_, (_, _, body))| {
            !body.destroyed && body.planet().is_some_and(|o| !o.is_home && o.z < NEAR_PLANE_Z)
        })
        .map(|(_, (id, motion, _))| (id.0, motion.pos))
        .collect();
    enemy_planets.sort_by_key(|(id, _)| *id);
    let player = infos.iter().position(|info| info.player.is_some());
    let god_mode = player.is_some_and(|p| infos[p].alive() && infos[p].tier >= GOD_TIER);
    Surroundings {
        world,
        bodies,
        units: unit_grid(infos),
        index: infos
            .iter()
            .enumerate()
            .map(|(i, info)| (info.contact.id, i))
            .collect(),
        home,
        enemy_planets: enemy_planets.into_iter().map(|(_, pos)| pos).collect(),
        player,
        god_mode,
    }
}

fn unit_grid(infos: &[UnitInfo]) -> SpatialGrid {
    let mut grid = SpatialGrid::default();
    for info in infos.iter().filter(|info| info.alive()) {
        grid.insert(info.contact.id, info.entity, info.contact.pos);
    }
    grid
}

/// Drop members that died, turned, or follow someone else, and pack the
/// rest. Followers that no leader lists are released, as are wingmen left
/// without a leader.
fn compact_squads(infos: &mut [UnitInfo], env: &Surroundings) {
    for i in 0..infos.len() {
        if infos[i].role() != Some(SquadRole::Leader) {
            continue;
        }
        let owner = infos[i].contact;
        let dissolve = !infos[i].alive() || (owner.is_player && env.god_mode);
        let Some(mut slots) = infos[i].brain.as_mut().map(|b| std::mem::take(&mut b.slots)) else {
            continue;
        };
        let reassigned = squad::compact(&mut slots, |member| {
            !dissolve
                && env.lookup(member).is_some_and(|k| {
                    let other = &infos[k];
                    other.alive()
                        && are_allies(&owner, &other.contact)
                        && other.brain.as_ref().is_some_and(|b| b.leader == Some(owner.id))
                })
        });
        if let Some(brain) = infos[i].brain.as_mut() {
            brain.slots = slots;
        }
        for r in reassigned {
            if let Some(brain) = env.lookup(r.member).and_then(|k| infos[k].brain.as_mut()) {
                brain.formation_offset = r.offset;
            }
        }
    }

    let orphans: Vec<usize> = infos
        .iter()
        .enumerate()
        .filter(|(_, info)| {
            let Some(brain) = info.brain.as_ref() else {
                return false;
            };
            let Some(leader) = brain.leader else {
                return brain.role == SquadRole::Wingman;
            };
            let listed = env.lookup(leader).is_some_and(|k| {
                infos[k].brain.as_ref().is_some_and(|b| {
                    b.slots.iter().any(|s| s.occupant == Some(info.contact.id))
                })
            });
            !listed
        })
        .map(|(i, _)| i)
        .collect();
    for i in orphans {
        if let Some(brain) = infos[i].brain.as_mut() {
            brain.leader = None;
            if brain.role == SquadRole::Wingman {
                brain.role = SquadRole::Independent;
            }
        }
    }
}

/// Leaderless ships in formation look for a squad: friendlies fall in with
/// the player, hostiles join or recruit a nearby ship of their own colors.
fn join_squads(infos: &mut [UnitInfo], env: &Surroundings) {
    for i in 0..infos.len() {
        let eligible = infos[i].is_ai_ship()
            && infos[i].brain.as_ref().is_some_and(|b| {
                b.leader.is_none() && b.role == SquadRole::Independent && b.state == AiState::Formation
            });
        if !eligible {
            continue;
        }
        let me = infos[i].contact;
        let leader = if me.friendly {
            player_squad(infos, env, &me)
        } else {
            hostile_squad(infos, i).or_else(|| recruit(infos, i))
        };
        let Some(l) = leader else {
            continue;
        };
        let leader_id = infos[l].contact.id;
        let Some(offset) = infos[l]
            .brain
            .as_mut()
            .and_then(|b| squad::seat(&mut b.slots, me.id))
        else {
            continue;
        };
        if let Some(brain) = infos[i].brain.as_mut() {
            brain.leader = Some(leader_id);
            brain.role = SquadRole::Wingman;
            brain.formation_offset = offset;
        }
        log::trace!("ship {} joined squad of {leader_id}", me.id);
    }
}

fn player_squad(infos: &[UnitInfo], env: &Surroundings, me: &Contact) -> Option<usize> {
    let p = env.player?;
    let player = &infos[p];
    let open = player.alive()
        && !env.god_mode
        && !player.player.is_some_and(|c| c.lone_wolf)
        && are_allies(me, &player.contact)
        && me.pos.distance(player.contact.pos) < JOIN_PLAYER_RANGE
        && player.has_free_slot();
    open.then_some(p)
}

fn same_colors(me: &Contact, other: &UnitInfo) -> bool {
    other.is_ai_ship()
        && !other.contact.is_station
        && other.contact.id != me.id
        && !other.contact.friendly
        && other.contact.hue == me.hue
        && me.pos.distance(other.contact.pos) < JOIN_LEADER_RANGE
}

fn nearest(me: &Contact, infos: &[UnitInfo], pick: impl Fn(&UnitInfo) -> bool) -> Option<usize> {
    infos
        .iter()
        .enumerate()
        .filter(|(_, other)| pick(other))
        .min_by(|(_, a), (_, b)| {
            me.pos
                .distance(a.contact.pos)
                .total_cmp(&me.pos.distance(b.contact.pos))
                .then(a.contact.id.cmp(&b.contact.id))
        })
        .map(|(k, _)| k)
}

fn hostile_squad(infos: &[UnitInfo], i: usize) -> Option<usize> {
    let me = infos[i].contact;
    nearest(&me, infos, |other| {
        same_colors(&me, other) && other.role() == Some(SquadRole::Leader) && other.has_free_slot()
    })
}

/// Promote a nearby stray of the same colors to lead a new squad.
fn recruit(infos: &mut [UnitInfo], i: usize) -> Option<usize> {
    let me = infos[i].contact;
    let k = nearest(&me, infos, |other| {
        same_colors(&me, other)
            && other.brain.as_ref().is_some_and(|b| {
                b.role == SquadRole::Independent && b.leader.is_none() && b.state == AiState::Formation
            })
    })?;
    let brain = infos[k].brain.as_mut()?;
    brain.role = SquadRole::Leader;
    brain.slots = ShipBrain::with_slots();
    log::trace!("ship {} promoted to squad leader", infos[k].contact.id);
    Some(k)
}

fn abandon(infos: &mut [UnitInfo], index: &HashMap<EntityId, usize>, i: usize) {
    let id = infos[i].contact.id;
    let Some(leader) = infos[i].brain.as_mut().and_then(|b| {
        b.role = SquadRole::Independent;
        b.leader.take()
    }) else {
        return;
    };
    if let Some(brain) = index.get(&leader).and_then(|&k| infos[k].brain.as_mut()) {
        squad::vacate(&mut brain.slots, id);
    }
    log::trace!("ship {id} broke formation");
}

fn nearest_rival_station(infos: &[UnitInfo], me: &Contact) -> Option<DVec2> {
    nearest(me, infos, |other| other.contact.is_station && is_rival(me, &other.contact))
        .map(|k| infos[k].contact.pos)
}

/// Build the context for one ship and run the state machine.
fn decide(info: &UnitInfo, infos: &[UnitInfo], env: &Surroundings) -> UnitUpdate {
    let me = info.contact;
    let brain = info.brain.clone().unwrap_or_default();
    let forced_home = me.friendly && env.god_mode;
    let role = if forced_home {
        SquadRole::Independent
    } else {
        brain.role
    };

    let contacts: Vec<Contact> = env
        .units
        .query_radius(me.pos, SCAN_UNIT_RANGE)
        .into_iter()
        .filter(|entry| entry.id != me.id)
        .filter_map(|entry| env.lookup(entry.id).map(|k| infos[k].contact))
        .collect();
    let obstacles = env.obstacles(me.pos, SCAN_ASTEROID_RANGE);
    let enemy_planets: Vec<DVec2> = if me.friendly {
        env.enemy_planets
            .iter()
            .copied()
            .filter(|p| me.pos.distance(*p) < SCAN_UNIT_RANGE)
            .collect()
    } else {
        Vec::new()
    };

    let leader_info = brain
        .leader
        .filter(|_| role == SquadRole::Wingman)
        .and_then(|l| env.lookup(l))
        .map(|k| &infos[k]);
    let leader = leader_info.map(|l| LeaderPose {
        id: l.contact.id,
        pos: l.contact.pos,
        vel: l.contact.vel,
        facing: l.facing,
        radius: l.contact.radius,
    });
    let mates: Vec<DVec2> = leader_info
        .and_then(|l| l.brain.as_ref())
        .map(|b| {
            b.slots
                .iter()
                .filter_map(|s| s.occupant)
                .filter(|&m| m != me.id)
                .filter_map(|m| env.lookup(m).map(|k| infos[k].contact.pos))
                .collect()
        })
        .unwrap_or_default();

    let home_station = brain
        .home_station
        .and_then(|s| env.lookup(s))
        .map(|k| infos[k].contact.pos);
    let home_planet = env.home.filter(|_| me.friendly).map(|h| Anchor {
        center: h.pos,
        ring: h.r * HOME_ORBIT_FACTOR,
    });
    let anchor = if forced_home {
        home_planet
    } else {
        home_station
            .map(|center| Anchor {
                center,
                ring: STATION_RADIUS * STATION_PATROL_FACTOR,
            })
            .or(home_planet)
    };
    let station_threat = home_station.filter(|_| role == SquadRole::Leader).and_then(|home| {
        env.obstacles(home, LEADER_DEFENSE_RANGE)
            .first()
            .map(|o| o.pos)
    });
    let player = env
        .player
        .map(|p| &infos[p])
        .filter(|p| p.alive())
        .map(|p| p.contact);

    let ctx = UnitContext {
        me,
        facing: info.facing,
        state: brain.state,
        role,
        reload_ready: info.reload <= 0.0,
        orbit_dir: if brain.orbit_dir == 0.0 { 1.0 } else { brain.orbit_dir },
        leader,
        formation_offset: brain.formation_offset,
        danger: brain.danger,
        danger_ticks: brain.danger_ticks,
        player,
        contacts: &contacts,
        obstacles: &obstacles,
        enemy_planets: &enemy_planets,
        mates: &mates,
        anchor,
        home_station,
        station_threat,
        patrol_target: brain.patrol_target,
    };
    fsm::evaluate(&ctx)
}
