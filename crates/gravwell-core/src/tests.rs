use glam::DVec2;

use crate::commands::Intent;
use crate::components::*;
use crate::constants::*;
use crate::enums::*;
use crate::events::SimEvent;
use crate::state::WorldSnapshot;
use crate::types::*;

fn asteroid(r: f64) -> Body {
    Body {
        r,
        target_r: r,
        mass: Body::mass_for(r),
        blink: 0,
        hot: false,
        destroyed: false,
        kind: BodyKind::Asteroid { ring_multiple: 3.0 },
    }
}

// ---- Geometry helpers ----

#[test]
fn test_wrap_angle_range() {
    for raw in [-10.0, -std::f64::consts::PI, 0.0, 3.5, 7.0, 100.0] {
        let w = wrap_angle(raw);
        assert!(w > -std::f64::consts::PI - 1e-12 && w <= std::f64::consts::PI + 1e-12);
        let turns = (raw - w) / std::f64::consts::TAU;
        assert!((turns - turns.round()).abs() < 1e-9, "{raw} wrapped to {w}");
    }
    assert_eq!(wrap_angle(-std::f64::consts::PI), std::f64::consts::PI);
}

#[test]
fn test_angle_between_takes_short_way() {
    let d = angle_between(3.0, -3.0);
    assert!(d > 0.0 && d < 0.3, "expected short positive turn, got {d}");
}

#[test]
fn test_heading_and_unit_agree() {
    let a = 1.1;
    assert!((heading_of(unit(a)) - a).abs() < 1e-12);
}

#[test]
fn test_is_finite() {
    assert!(is_finite(DVec2::new(1.0, -2.0)));
    assert!(!is_finite(DVec2::new(f64::NAN, 0.0)));
    assert!(!is_finite(DVec2::new(0.0, f64::INFINITY)));
}

#[test]
fn test_sim_time_advance() {
    let mut t = SimTime::default();
    for _ in 0..TICK_RATE {
        t.advance();
    }
    assert_eq!(t.tick, TICK_RATE as u64);
    assert!((t.elapsed_secs - 1.0).abs() < 1e-9);
}

// ---- Bodies ----

#[test]
fn test_mass_is_derived_from_radius() {
    assert!((Body::mass_for(100.0) - 500.0).abs() < 1e-9);
}

#[test]
fn test_giant_classification() {
    assert!(asteroid(ASTEROID_MAX_SIZE).is_giant());
    assert!(!asteroid(ASTEROID_MAX_SIZE - 1.0).is_giant());
    assert_eq!(asteroid(200.0).z(), 0.0);
    assert!(asteroid(200.0).planet().is_none());
}

// ---- Units ----

#[test]
fn test_default_slots_match_offsets() {
    let slots = ShipBrain::with_slots();
    assert_eq!(slots.len(), SQUAD_SLOT_COUNT);
    assert!(slots.iter().all(|s| s.occupant.is_none()));
    assert_eq!(slots[1].offset, DVec2::new(150.0, -150.0));
    // Every slot sits behind the leader.
    assert!(slots.iter().all(|s| s.offset.y < 0.0));
}

#[test]
fn test_member_count() {
    let mut brain = ShipBrain {
        slots: ShipBrain::with_slots(),
        ..Default::default()
    };
    brain.slots[0].occupant = Some(7);
    brain.slots[3].occupant = Some(9);
    assert_eq!(brain.member_count(), 2);
}

// ---- Serialization ----

#[test]
fn test_intent_is_tagged() {
    let json = serde_json::to_string(&Intent::Rotate { delta: 0.5 }).unwrap();
    assert!(json.contains("\"type\":\"Rotate\""), "got {json}");
    let back: Intent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Intent::Rotate { delta: 0.5 });
}

#[test]
fn test_event_is_tagged() {
    let json = serde_json::to_string(&SimEvent::HomePlanetLost).unwrap();
    assert_eq!(json, "{\"type\":\"HomePlanetLost\"}");
}

#[test]
fn test_default_snapshot_serializes() {
    let snap = WorldSnapshot::default();
    assert_eq!(snap.phase, GamePhase::Active);
    let json = serde_json::to_string(&snap).unwrap();
    let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
    assert!(back.bodies.is_empty());
    assert!(back.player.is_none());
}
