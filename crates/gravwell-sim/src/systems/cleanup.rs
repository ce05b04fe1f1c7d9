//! Cleanup system: despawns destroyed bodies and units, spent projectiles
//! and finished rings, then clears every reference to an id that no longer
//! exists. Running it twice in a row changes nothing the second time.

use hecs::{Entity, World};

use gravwell_core::components::{Body, Projectile, Shockwave, StableId, Unit, UnitKind};
use gravwell_core::enums::SquadRole;
use gravwell_core::types::EntityId;

use crate::registry::Registry;
use crate::systems::shockwave::is_finished;

/// Despawn retired entities. Returns how many were removed.
pub fn run(world: &mut World, registry: &mut Registry, despawn_buffer: &mut Vec<Entity>) -> usize {
    despawn_buffer.clear();
    let mut ids: Vec<EntityId> = Vec::new();

    for (entity, (id, body)) in world.query_mut::<(&StableId, &Body)>() {
        if body.destroyed {
            despawn_buffer.push(entity);
            ids.push(id.0);
        }
    }
    for (entity, (id, unit)) in world.query_mut::<(&StableId, &Unit)>() {
        if unit.destroyed {
            despawn_buffer.push(entity);
            ids.push(id.0);
        }
    }
    for (entity, (id, shot)) in world.query_mut::<(&StableId, &Projectile)>() {
        if shot.spent {
            despawn_buffer.push(entity);
            ids.push(id.0);
        }
    }
    for (entity, (id, wave)) in world.query_mut::<(&StableId, &Shockwave)>() {
        if is_finished(wave) {
            despawn_buffer.push(entity);
            ids.push(id.0);
        }
    }

    let removed = despawn_buffer.len();
    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
    for id in ids {
        registry.remove(id);
    }

    purge_references(world, registry);
    removed
}

/// Clear links to ids the registry no longer knows.
fn purge_references(world: &mut World, registry: &Registry) {
    let gone = |id: &Option<EntityId>| id.is_some_and(|id| !registry.contains(id));

    for (_entity, unit) in world.query_mut::<&mut Unit>() {
        match &mut unit.kind {
            UnitKind::Ship(brain) => {
                if gone(&brain.leader) {
                    brain.leader = None;
                    if brain.role == SquadRole::Wingman {
                        brain.role = SquadRole::Independent;
                    }
                }
                if gone(&brain.home_station) {
                    brain.home_station = None;
                }
                if gone(&brain.danger) {
                    brain.danger = None;
                    brain.danger_ticks = 0;
                }
                for slot in &mut brain.slots {
                    if gone(&slot.occupant) {
                        slot.occupant = None;
                    }
                }
            }
            UnitKind::Station(state) => {
                if gone(&state.host) {
                    state.host = None;
                }
            }
        }
    }

    for (_entity, shot) in world.query_mut::<&mut Projectile>() {
        if gone(&shot.owner) {
            shot.owner = None;
        }
    }
    for (_entity, wave) in world.query_mut::<&mut Shockwave>() {
        if gone(&wave.owner) {
            wave.owner = None;
        }
    }
}
