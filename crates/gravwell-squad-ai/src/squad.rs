//! Squad slot bookkeeping.
//!
//! Slots live on the leader's `ShipBrain`. Every occupant must point back at
//! the slot owner through its own `leader` field; the helpers here keep a
//! member in at most one slot.

use glam::DVec2;

use gravwell_core::components::SquadSlot;
use gravwell_core::types::EntityId;

/// New formation offset for a member after compaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reassignment {
    pub member: EntityId,
    pub offset: DVec2,
}

/// Index of the first empty slot.
pub fn free_slot(slots: &[SquadSlot]) -> Option<usize> {
    slots.iter().position(|s| s.occupant.is_none())
}

/// Seat `member` in the first free slot and return that slot's offset.
/// Returns `None` when the squad is full or the member is already seated.
pub fn seat(slots: &mut [SquadSlot], member: EntityId) -> Option<DVec2> {
    if slots.iter().any(|s| s.occupant == Some(member)) {
        return None;
    }
    let idx = free_slot(slots)?;
    slots[idx].occupant = Some(member);
    Some(slots[idx].offset)
}

/// Remove `member` from whichever slot holds it.
pub fn vacate(slots: &mut [SquadSlot], member: EntityId) -> bool {
    let mut found = false;
    for slot in slots.iter_mut().filter(|s| s.occupant == Some(member)) {
        slot.occupant = None;
        found = true;
    }
    found
}

/// Drop occupants rejected by `is_loyal`, then pack the survivors into slot
/// order so the innermost slots fill first.
pub fn compact(slots: &mut [SquadSlot], is_loyal: impl Fn(EntityId) -> bool) -> Vec<Reassignment> {
    let mut survivors: Vec<EntityId> = Vec::with_capacity(slots.len());
    for id in slots.iter().filter_map(|s| s.occupant) {
        if is_loyal(id) && !survivors.contains(&id) {
            survivors.push(id);
        }
    }

    for slot in slots.iter_mut() {
        slot.occupant = None;
    }

    survivors
        .into_iter()
        .zip(slots.iter_mut())
        .map(|(member, slot)| {
            slot.occupant = Some(member);
            Reassignment {
                member,
                offset: slot.offset,
            }
        })
        .collect()
}

/// True when no member appears in two slots.
pub fn is_exclusive(slots: &[SquadSlot]) -> bool {
    let occupants: Vec<EntityId> = slots.iter().filter_map(|s| s.occupant).collect();
    occupants
        .iter()
        .enumerate()
        .all(|(i, id)| !occupants[i + 1..].contains(id))
}

/// World position of a slot, given the leader's pose.
/// The offset is (lateral, forward) in the leader's frame.
pub fn slot_position(leader_pos: DVec2, leader_facing: f64, offset: DVec2) -> DVec2 {
    let forward = DVec2::new(leader_facing.cos(), leader_facing.sin());
    let right = DVec2::new(-forward.y, forward.x);
    leader_pos + right * offset.x + forward * offset.y
}
