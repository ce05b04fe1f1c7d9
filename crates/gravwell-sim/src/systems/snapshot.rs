//! Snapshot system: queries the ECS world and builds a `WorldSnapshot`.
//!
//! Read-only. Every list is sorted by id so identical worlds serialize
//! identically.

use hecs::World;

use gravwell_core::components::*;
use gravwell_core::enums::*;
use gravwell_core::events::SimEvent;
use gravwell_core::state::*;
use gravwell_core::types::SimTime;

use crate::systems::shockwave::is_finished;

/// Scalar session state that lives on the engine rather than in the world.
#[derive(Debug, Clone, Copy)]
pub struct SessionView {
    pub time: SimTime,
    pub phase: GamePhase,
    pub radar_range: f64,
    pub planet_limit: usize,
}

pub fn build_snapshot(world: &World, session: SessionView, events: Vec<SimEvent>) -> WorldSnapshot {
    WorldSnapshot {
        time: session.time,
        phase: session.phase,
        bodies: build_bodies(world),
        units: build_units(world),
        projectiles: build_projectiles(world),
        shockwaves: build_shockwaves(world),
        player: build_player(world),
        radar_range: session.radar_range,
        planet_limit: session.planet_limit,
        events,
    }
}

fn build_bodies(world: &World) -> Vec<BodyView> {
    let mut bodies: Vec<BodyView> = world
        .query::<(&StableId, &Motion, &Body)>()
        .iter()
        .filter(|(_, (_, _, body))| !body.destroyed)
        .map(|(_, (id, motion, body))| BodyView {
            id: id.0,
            class: if body.is_planet() {
                BodyClass::Planet
            } else {
                BodyClass::Asteroid
            },
            pos: motion.pos,
            vel: motion.vel,
            r: body.r,
            z: body.z(),
            hot: body.hot,
            blinking: body.blink > 0,
            is_home: body.planet().is_some_and(|o| o.is_home),
        })
        .collect();
    bodies.sort_by_key(|b| b.id);
    bodies
}

/// Units on the field. A dead player is omitted until it respawns.
fn build_units(world: &World) -> Vec<UnitView> {
    let mut units: Vec<UnitView> = world
        .query::<(&StableId, &Motion, &Unit, Option<&PlayerControl>)>()
        .iter()
        .filter(|(_, (_, _, unit, player))| !unit.destroyed && !player.is_some_and(|p| p.dead))
        .map(|(_, (id, motion, unit, player))| {
            let brain = unit.brain().cloned().unwrap_or_default();
            let class = match (&unit.kind, player) {
                (_, Some(_)) => UnitClass::Player,
                (UnitKind::Station(_), None) => UnitClass::Station,
                (UnitKind::Ship(_), None) => UnitClass::Ship,
            };
            UnitView {
                id: id.0,
                class,
                pos: motion.pos,
                vel: motion.vel,
                facing: unit.facing,
                radius: unit.radius,
                hp: unit.hp,
                hue: unit.hue,
                friendly: unit.friendly,
                state: brain.state,
                role: brain.role,
                leader: brain.leader,
                tier: unit.tier,
            }
        })
        .collect();
    units.sort_by_key(|u| u.id);
    units
}

fn build_projectiles(world: &World) -> Vec<ProjectileView> {
    let mut projectiles: Vec<ProjectileView> = world
        .query::<(&StableId, &Motion, &Projectile)>()
        .iter()
        .filter(|(_, (_, _, shot))| !shot.spent)
        .map(|(_, (id, motion, shot))| ProjectileView {
            id: id.0,
            pos: motion.pos,
            vel: motion.vel,
            size: shot.size,
            tier: shot.tier,
            hue: shot.hue,
            friendly: shot.friendly,
        })
        .collect();
    projectiles.sort_by_key(|p| p.id);
    projectiles
}

fn build_shockwaves(world: &World) -> Vec<ShockwaveView> {
    let mut waves: Vec<(u32, ShockwaveView)> = world
        .query::<(&StableId, &Shockwave)>()
        .iter()
        .filter(|(_, (_, wave))| !is_finished(wave))
        .map(|(_, (id, wave))| {
            (
                id.0,
                ShockwaveView {
                    center: wave.center,
                    r: wave.r,
                    alpha: wave.alpha,
                    kind: wave.kind,
                },
            )
        })
        .collect();
    waves.sort_by_key(|(id, _)| *id);
    waves.into_iter().map(|(_, view)| view).collect()
}

fn build_player(world: &World) -> Option<PlayerView> {
    world
        .query::<(&StableId, &Unit, &PlayerControl)>()
        .iter()
        .next()
        .map(|(_, (id, unit, control))| PlayerView {
            id: id.0,
            lives: control.lives,
            hp: unit.hp,
            score: unit.score,
            tier: unit.tier,
            dead: control.dead,
            squad_size: unit.brain().map_or(0, |b| b.member_count()),
        })
}
