//! Stable id registry.
//!
//! Entities refer to each other only by `EntityId`. The registry maps those
//! ids to live hecs handles; a removed id simply stops resolving.

use std::collections::HashMap;

use hecs::{Entity, EntityBuilder, World};

use gravwell_core::components::StableId;
use gravwell_core::types::EntityId;

#[derive(Debug)]
pub struct Registry {
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Spawn the builder's components plus a fresh `StableId`.
    pub fn spawn(&mut self, world: &mut World, builder: &mut EntityBuilder) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        builder.add(StableId(id));
        let entity = world.spawn(builder.build());
        self.entities.insert(id, entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
