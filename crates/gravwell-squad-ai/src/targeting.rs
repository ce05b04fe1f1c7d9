//! Allegiance rules, target selection, and the friendly-fire guard.

use glam::DVec2;

use gravwell_core::constants::*;
use gravwell_core::types::{angle_between, heading_of, EntityId};

/// What the AI knows about a combat unit (including the player).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub id: EntityId,
    pub pos: DVec2,
    pub vel: DVec2,
    pub radius: f64,
    pub hue: u16,
    pub friendly: bool,
    pub is_station: bool,
    pub is_player: bool,
}

/// Units that must not shoot through each other: both friendly, or both
/// hostile and flying the same colors.
pub fn are_allies(a: &Contact, b: &Contact) -> bool {
    (a.friendly && b.friendly) || (!a.friendly && !b.friendly && a.hue == b.hue)
}

/// Whether `me` treats `other` as a legitimate target. Hostile factions fight
/// each other as well as the player's side.
pub fn is_rival(me: &Contact, other: &Contact) -> bool {
    if me.id == other.id {
        return false;
    }
    if me.friendly {
        !other.friendly
    } else {
        other.friendly || other.hue != me.hue
    }
}

/// Absolute angle between the firing line and the bearing to `point`.
fn off_line(from: DVec2, line: f64, point: DVec2) -> f64 {
    angle_between(line, heading_of(point - from)).abs()
}

/// Friendly-fire guard: false when an ally sits closer than the target and
/// within the blocking cone of the firing line. The player counts as a
/// friendly contact with a narrower cone.
pub fn trajectory_clear(shooter: &Contact, target: DVec2, others: &[Contact]) -> bool {
    let line = heading_of(target - shooter.pos);
    let range = shooter.pos.distance(target);

    others.iter().all(|other| {
        if other.id == shooter.id || !are_allies(shooter, other) {
            return true;
        }
        if shooter.pos.distance(other.pos) >= range {
            return true;
        }
        let cone = if other.is_player {
            PLAYER_BLOCK_CONE
        } else {
            ALLY_BLOCK_CONE
        };
        off_line(shooter.pos, line, other.pos) >= cone
    })
}

/// Signed facing error toward `target`.
pub fn aim_error(pos: DVec2, facing: f64, target: DVec2) -> f64 {
    angle_between(facing, heading_of(target - pos))
}

/// A target picked for the combat controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatTarget {
    pub contact: Contact,
    pub distance: f64,
}

/// Closest valid target: the player (hostiles only, inside the disengage
/// range) versus rival units inside rival range.
pub fn select_combat_target(
    me: &Contact,
    player: Option<&Contact>,
    contacts: &[Contact],
) -> Option<CombatTarget> {
    let mut best: Option<CombatTarget> = None;

    if let Some(player) = player {
        let d = me.pos.distance(player.pos);
        if !me.friendly && d < COMBAT_DISENGAGE_RANGE {
            best = Some(CombatTarget {
                contact: *player,
                distance: d,
            });
        }
    }

    for other in contacts.iter().filter(|c| !c.is_player && is_rival(me, c)) {
        let d = me.pos.distance(other.pos);
        let closer = best.map_or(true, |b| d < b.distance);
        if d < RIVAL_RANGE && closer {
            best = Some(CombatTarget {
                contact: *other,
                distance: d,
            });
        }
    }

    best
}

/// Nearest rival ship inside rival range; used for opportunistic fire.
pub fn nearest_rival_ship(me: &Contact, contacts: &[Contact]) -> Option<Contact> {
    contacts
        .iter()
        .filter(|c| !c.is_station && is_rival(me, c))
        .map(|c| (c, me.pos.distance(c.pos)))
        .filter(|(_, d)| *d < RIVAL_RANGE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| *c)
}
