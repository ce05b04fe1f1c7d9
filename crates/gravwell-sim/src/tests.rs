//! Tests for the simulation engine, body physics, squads, weapons, and housekeeping passes.

use glam::DVec2;
use hecs::{EntityBuilder, World};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use gravwell_core::commands::Intent;
use gravwell_core::components::*;
use gravwell_core::constants::*;
use gravwell_core::enums::*;
use gravwell_core::events::SimEvent;
use gravwell_core::types::{EntityId, SimTime};

use crate::config::{ConfigError, SimConfig};
use crate::engine::SimulationEngine;
use crate::error::SimError;
use crate::registry::Registry;
use crate::spatial::SpatialGrid;
use crate::systems::casualties::{self, tier_for_score};
use crate::systems::collision::{fragments, merge, resolve_pair, BodyState, Resolution};
use crate::systems::snapshot::{build_snapshot, SessionView};
use crate::systems::weapons::pattern;
use crate::systems::{self, Spawn};
use crate::world_setup::{self, AsteroidSeed};

fn small_config(seed: u64) -> SimConfig {
    SimConfig {
        seed,
        asteroid_count: 200,
        ..Default::default()
    }
}

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(7)
}

fn asteroid_body(r: f64) -> Body {
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

fn state(id: EntityId, pos: DVec2, vel: DVec2, r: f64) -> BodyState {
    BodyState {
        id,
        motion: Motion::new(pos, vel),
        body: asteroid_body(r),
    }
}

fn planet_state(id: EntityId, pos: DVec2, r: f64, is_home: bool) -> BodyState {
    let mut orbit = world_setup::planet_orbit(&mut rng(), pos, WORLD_BOUNDS);
    orbit.is_home = is_home;
    BodyState {
        id,
        motion: Motion::new(pos, DVec2::ZERO),
        body: Body {
            kind: BodyKind::Planet(orbit),
            ..asteroid_body(r)
        },
    }
}

fn rock(world: &mut World, registry: &mut Registry, pos: DVec2, r: f64) -> EntityId {
    world_setup::spawn_asteroid(
        world,
        registry,
        &mut rng(),
        AsteroidSeed::new(pos, DVec2::ZERO, r),
        None,
    )
}

fn ship(world: &mut World, registry: &mut Registry, pos: DVec2, friendly: bool, hue: u16) -> EntityId {
    let mut builder = EntityBuilder::new();
    builder.add(Motion::new(pos, DVec2::ZERO)).add(Unit {
        hp: SHIP_HP,
        hue,
        friendly,
        facing: 0.0,
        radius: SHIP_RADIUS,
        reload: 0.0,
        blink: 0,
        score: 0,
        tier: 0,
        weapon: WeaponStats::default(),
        destroyed: false,
        kind: UnitKind::Ship(ShipBrain {
            orbit_dir: 1.0,
            ..Default::default()
        }),
    });
    registry.spawn(world, &mut builder)
}

fn unit_of(world: &World, registry: &Registry, id: EntityId) -> Unit {
    let entity = registry.get(id).unwrap();
    (*world.get::<&Unit>(entity).unwrap()).clone()
}

fn body_of(world: &World, registry: &Registry, id: EntityId) -> Body {
    let entity = registry.get(id).unwrap();
    *world.get::<&Body>(entity).unwrap()
}

fn session() -> SessionView {
    SessionView {
        time: SimTime::default(),
        phase: GamePhase::Active,
        radar_range: 1000.0,
        planet_limit: PLANET_LIMIT,
    }
}

// ---- Determinism ----

#[test]
fn test_determinism_same_seed() {
    let mut engine_a = SimulationEngine::new(small_config(12345));
    let mut engine_b = SimulationEngine::new(small_config(12345));

    for tick in 0..200 {
        if tick == 20 {
            engine_a.queue_intents([Intent::ThrustOn, Intent::Fire]);
            engine_b.queue_intents([Intent::ThrustOn, Intent::Fire]);
        }
        let json_a = serde_json::to_string(&engine_a.tick()).unwrap();
        let json_b = serde_json::to_string(&engine_b.tick()).unwrap();
        assert_eq!(json_a, json_b, "Snapshots diverged with same seed at tick {tick}");
    }
}

#[test]
fn test_determinism_different_seeds() {
    let engine_a = SimulationEngine::new(small_config(111));
    let engine_b = SimulationEngine::new(small_config(222));
    let json_a = serde_json::to_string(&engine_a.snapshot()).unwrap();
    let json_b = serde_json::to_string(&engine_b.snapshot()).unwrap();
    assert_ne!(json_a, json_b, "Different seeds should produce different worlds");
}

// ---- Engine lifecycle ----

#[test]
fn test_initial_world_has_home_and_player() {
    let engine = SimulationEngine::new(small_config(1));
    let snap = engine.snapshot();

    let home = engine.home_planet_id().expect("home planet");
    let home_view = snap.bodies.iter().find(|b| b.id == home).unwrap();
    assert!(home_view.is_home);
    assert_eq!(home_view.class, BodyClass::Planet);

    let stations: Vec<_> = snap
        .units
        .iter()
        .filter(|u| u.class == UnitClass::Station && u.friendly)
        .collect();
    assert!(!stations.is_empty() && stations.len() <= 3);
    assert!(stations.iter().all(|s| s.hue == FRIENDLY_HUE));

    let player = snap.player.expect("player view");
    assert_eq!(Some(player.id), engine.player_id());
    assert_eq!(player.lives, PLAYER_LIVES);
    assert_eq!(snap.units.len(), 1 + snap.units.iter().filter(|u| u.class != UnitClass::Player).count());
}

#[test]
fn test_tick_advances_time() {
    let mut engine = SimulationEngine::new(small_config(1));
    for _ in 0..10 {
        engine.tick();
    }
    assert_eq!(engine.time().tick, 10);
    assert!((engine.time().elapsed_secs - 10.0 * DT).abs() < 1e-9);
}

#[test]
fn test_pause_freezes_world() {
    let mut engine = SimulationEngine::new(small_config(1));
    engine.tick();
    engine.queue_intent(Intent::Pause);
    let before = engine.tick();
    assert_eq!(before.phase, GamePhase::Paused);
    let frozen = serde_json::to_string(&before).unwrap();
    let after = serde_json::to_string(&engine.tick()).unwrap();
    assert_eq!(frozen, after);
    assert_eq!(engine.time().tick, 1);

    engine.queue_intent(Intent::Resume);
    let snap = engine.tick();
    assert_eq!(snap.phase, GamePhase::Active);
    assert_eq!(engine.time().tick, 2);
}

#[test]
fn test_step_runs_whole_ticks() {
    let mut engine = SimulationEngine::new(small_config(1));
    assert!(engine.step(DT * 0.5).is_none());
    let snap = engine.step(DT * 2.0).expect("two ticks due");
    assert_eq!(snap.time.tick, 2);
    assert!(engine.step(f64::NAN).is_none());
    assert_eq!(engine.time().tick, 2);
}

#[test]
fn test_zoom_clamps_and_sets_radar_range() {
    let mut engine = SimulationEngine::new(small_config(1));
    assert_eq!(engine.zoom_index(), ZOOM_DEFAULT_INDEX);
    assert!((engine.radar_range() - 1800.0).abs() < 1e-9);

    engine.queue_intent(Intent::Zoom { delta: 100 });
    let snap = engine.tick();
    assert_eq!(engine.zoom_index(), ZOOM_LEVEL_COUNT - 1);
    assert!((snap.radar_range - 15_300.0).abs() < 1e-9);

    engine.queue_intent(Intent::Zoom { delta: -100 });
    engine.tick();
    assert_eq!(engine.zoom_index(), 0);
    assert!((engine.radar_range() - 1000.0).abs() < 1e-9);
}

#[test]
fn test_set_heading_and_non_finite_rotate() {
    let mut engine = SimulationEngine::new(small_config(1));
    let player = engine.player_id().unwrap();

    engine.queue_intent(Intent::SetHeading { angle: 1.0 });
    let snap = engine.tick();
    let facing = snap.units.iter().find(|u| u.id == player).unwrap().facing;
    assert!((facing - 1.0).abs() < 1e-9);

    engine.queue_intent(Intent::Rotate { delta: f64::NAN });
    let snap = engine.tick();
    let facing = snap.units.iter().find(|u| u.id == player).unwrap().facing;
    assert!((facing - 1.0).abs() < 1e-9);
}

#[test]
fn test_try_new_rejects_invalid_config() {
    let bad = SimConfig {
        world_bounds: -1.0,
        ..Default::default()
    };
    assert!(matches!(SimulationEngine::try_new(bad), Err(ConfigError::Invalid(_))));
    assert!(SimulationEngine::try_new(small_config(3)).is_ok());
}

// ---- Factories ----

#[test]
fn test_spawn_station_errors() {
    let mut engine = SimulationEngine::new(small_config(1));
    assert_eq!(engine.spawn_station(999_999), Err(SimError::UnknownEntity(999_999)));

    let rock = engine.spawn_asteroid(DVec2::new(12_000.0, 0.0), DVec2::ZERO, 100.0);
    assert_eq!(engine.spawn_station(rock), Err(SimError::NotAPlanet(rock)));

    let home = engine.home_planet_id().unwrap();
    let station = engine.spawn_station(home).unwrap();
    let view = engine
        .snapshot()
        .units
        .into_iter()
        .find(|u| u.id == station)
        .unwrap();
    assert_eq!(view.class, UnitClass::Station);
    assert!(view.friendly);
}

#[test]
fn test_spawn_squad_respects_ship_limit() {
    let mut engine = SimulationEngine::new(SimConfig {
        ship_limit: 0,
        ..small_config(1)
    });
    let station = engine
        .snapshot()
        .units
        .iter()
        .find(|u| u.class == UnitClass::Station && u.friendly)
        .map(|u| u.id)
        .unwrap();
    assert_eq!(
        engine.spawn_squad(station),
        Err(SimError::LimitReached {
            kind: "friendly ship",
            limit: 0
        })
    );

    let mut roomy = SimulationEngine::new(small_config(1));
    let station = roomy
        .snapshot()
        .units
        .iter()
        .find(|u| u.class == UnitClass::Station && u.friendly)
        .map(|u| u.id)
        .unwrap();
    let squad = roomy.spawn_squad(station).unwrap();
    assert_eq!(squad.len(), SQUAD_SIZE);
}

#[test]
fn test_create_cluster_places_rocks_around_center() {
    let mut engine = SimulationEngine::new(small_config(1));
    let center = DVec2::new(10_000.0, -8_000.0);
    let ids = engine.create_cluster(center, 500.0, 5);
    assert_eq!(ids.len(), 5);
    for id in ids {
        let pos = engine.position_of(id).unwrap();
        assert!(pos.distance(center) <= 500.0 + 1e-9);
    }
}

#[test]
fn test_oversized_asteroid_becomes_planet() {
    let mut engine = SimulationEngine::new(small_config(1));
    let id = engine.spawn_asteroid(DVec2::new(9_000.0, 9_000.0), DVec2::ZERO, 1200.0);
    let view = engine.snapshot().bodies.into_iter().find(|b| b.id == id).unwrap();
    assert_eq!(view.class, BodyClass::Planet);
    assert!(!view.is_home);
}

#[test]
fn test_oversized_asteroid_without_planet_room_stays_a_rock() {
    let mut engine = SimulationEngine::new(SimConfig {
        planet_limit: 1,
        ..small_config(1)
    });
    let planets_before = engine
        .snapshot()
        .bodies
        .iter()
        .filter(|b| b.class == BodyClass::Planet)
        .count();
    assert!(planets_before >= 1);

    let id = engine.spawn_asteroid(DVec2::new(9_000.0, 9_000.0), DVec2::ZERO, 1200.0);
    let view = engine.snapshot().bodies.into_iter().find(|b| b.id == id).unwrap();
    assert_eq!(view.class, BodyClass::Asteroid);
    assert_eq!(view.r, ASTEROID_MAX_SIZE);
}

// ---- Game over ----

#[test]
fn test_god_ring_over_home_ends_the_run() {
    let mut engine = SimulationEngine::new(small_config(5));
    let player = engine.entity(engine.player_id().unwrap()).unwrap();
    {
        let world = engine.world_mut();
        let mut unit = world.get::<&mut Unit>(player).unwrap();
        unit.score = 27_000;
        unit.tier = GOD_TIER;
    }
    engine.queue_intent(Intent::Fire);

    let mut events = Vec::new();
    for _ in 0..30 {
        let snap = engine.tick();
        events.extend(snap.events);
        if snap.phase == GamePhase::GameOver {
            break;
        }
    }
    assert!(events.iter().any(|e| matches!(e, SimEvent::GodRing { .. })));
    assert!(events.contains(&SimEvent::HomePlanetLost));
    assert!(events.contains(&SimEvent::PlayerKilled {
        lives_left: 0,
        cause: DeathCause::HomeLost
    }));
    assert_eq!(engine.phase(), GamePhase::GameOver);
    assert_eq!(engine.home_planet_id(), None);

    // The world keeps running after the end.
    let tick = engine.time().tick;
    let snap = engine.tick();
    assert_eq!(snap.time.tick, tick + 1);
    let view = snap.player.unwrap();
    assert!(view.dead);
    assert_eq!(view.lives, 0);
    assert!(snap.units.iter().all(|u| u.class != UnitClass::Player));
}

#[test]
fn test_end_run_kills_living_player() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let id = world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    let mut events = Vec::new();

    casualties::end_run(&mut world, &mut events);

    let control = *world.get::<&PlayerControl>(registry.get(id).unwrap()).unwrap();
    assert!(control.dead);
    assert_eq!(control.lives, 0);
    assert!(events.contains(&SimEvent::PlayerKilled {
        lives_left: 0,
        cause: DeathCause::HomeLost
    }));
}

// ---- Merging ----

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_merge_conserves_mass_and_momentum(
        r1 in 90.0f64..440.0,
        r2 in 90.0f64..440.0,
        v1 in (-10.0f64..10.0, -10.0f64..10.0),
        v2 in (-10.0f64..10.0, -10.0f64..10.0),
        gap in 0.0f64..50.0,
    ) {
        let mut a = state(1, DVec2::ZERO, DVec2::new(v1.0, v1.1), r1);
        let mut b = state(2, DVec2::new(gap, 0.0), DVec2::new(v2.0, v2.1), r2);
        let (m1, m2) = (a.body.mass, b.body.mass);
        let momentum = a.motion.vel * m1 + b.motion.vel * m2;

        merge(&mut a, &mut b);

        prop_assert!((a.body.mass - (m1 + m2)).abs() < 1e-6 * (m1 + m2));
        prop_assert!((a.body.r * a.body.r - (r1 * r1 + r2 * r2)).abs() < 1e-6 * (r1 * r1 + r2 * r2));
        prop_assert!((a.body.target_r - a.body.r * MERGE_GROWTH_BONUS).abs() < 1e-9);
        prop_assert!((a.motion.vel * (m1 + m2) - momentum).length() < 1e-6 * (m1 + m2));
        prop_assert!(b.body.destroyed);
    }
}

#[test]
fn test_ordinary_merge_emits_soft_thud() {
    let mut a = state(1, DVec2::ZERO, DVec2::new(1.0, 0.0), 150.0);
    let mut b = state(2, DVec2::new(200.0, 0.0), DVec2::new(-1.0, 0.0), 150.0);
    let mut rng = rng();
    let mut limit = PLANET_LIMIT;
    let mut events = Vec::new();
    let mut spawns = Vec::new();
    let mut res = Resolution {
        rng: &mut rng,
        planet_limit: &mut limit,
        planets_live: 0,
        bounds: WORLD_BOUNDS,
        events: &mut events,
        spawns: &mut spawns,
    };
    resolve_pair(&mut a, &mut b, &mut res);

    assert!(b.body.destroyed);
    assert!(!a.body.is_planet());
    assert!(a.motion.vel.length() < 1e-9);
    assert!(matches!(events.as_slice(), [SimEvent::SoftThud { .. }]));
}

#[test]
fn test_large_merge_promotes_to_planet() {
    let mut a = state(1, DVec2::ZERO, DVec2::ZERO, 400.0);
    let mut b = state(2, DVec2::new(500.0, 0.0), DVec2::ZERO, 400.0);
    let mut rng = rng();
    let mut limit = PLANET_LIMIT;
    let mut events = Vec::new();
    let mut spawns = Vec::new();
    let mut res = Resolution {
        rng: &mut rng,
        planet_limit: &mut limit,
        planets_live: 0,
        bounds: WORLD_BOUNDS,
        events: &mut events,
        spawns: &mut spawns,
    };
    resolve_pair(&mut a, &mut b, &mut res);
    assert_eq!(res.planets_live, 1);

    assert!(a.body.is_planet());
    assert!(b.body.destroyed);
    assert!(events.contains(&SimEvent::Explosion {
        pos: DVec2::new(250.0, 0.0),
        severity: Severity::Large
    }));
}

#[test]
fn test_blinking_bodies_do_not_interact() {
    let mut a = state(1, DVec2::ZERO, DVec2::ZERO, 200.0);
    let mut b = state(2, DVec2::new(100.0, 0.0), DVec2::ZERO, 200.0);
    a.body.blink = 5;
    let (a0, b0) = (a.clone(), b.clone());
    let mut rng = rng();
    let mut limit = PLANET_LIMIT;
    let mut events = Vec::new();
    let mut spawns = Vec::new();
    let mut res = Resolution {
        rng: &mut rng,
        planet_limit: &mut limit,
        planets_live: 0,
        bounds: WORLD_BOUNDS,
        events: &mut events,
        spawns: &mut spawns,
    };
    resolve_pair(&mut a, &mut b, &mut res);
    assert_eq!(a, a0);
    assert_eq!(b, b0);
    assert!(events.is_empty());
}

// ---- Fragmentation ----

fn strike(small_r: f64, dist: f64) -> (BodyState, BodyState, Vec<SimEvent>, Vec<Spawn>) {
    let mut giant = state(1, DVec2::ZERO, DVec2::new(0.5, 0.0), ASTEROID_MAX_SIZE);
    let mut small = state(2, DVec2::new(dist, 0.0), DVec2::ZERO, small_r);
    let mut rng = rng();
    let mut limit = PLANET_LIMIT;
    let mut events = Vec::new();
    let mut spawns = Vec::new();
    let mut res = Resolution {
        rng: &mut rng,
        planet_limit: &mut limit,
        planets_live: 0,
        bounds: WORLD_BOUNDS,
        events: &mut events,
        spawns: &mut spawns,
    };
    resolve_pair(&mut giant, &mut small, &mut res);
    (giant, small, events, spawns)
}

fn child_radii(spawns: &[Spawn]) -> Vec<f64> {
    let mut radii: Vec<f64> = spawns
        .iter()
        .map(|s| match s {
            Spawn::Asteroid(seed) => seed.r,
            other => panic!("unexpected spawn {other:?}"),
        })
        .collect();
    radii.sort_by(f64::total_cmp);
    radii
}

#[test]
fn test_giant_swallows_pebble() {
    let before = state(1, DVec2::ZERO, DVec2::new(0.5, 0.0), ASTEROID_MAX_SIZE);
    let (giant, small, events, spawns) = strike(100.0, 500.0);

    assert!(small.body.destroyed);
    assert_eq!(giant, before);
    assert!(spawns.is_empty());
    assert!(matches!(events.as_slice(), [SimEvent::SoftThud { .. }]));
}

#[test]
fn test_giant_and_large_partner_both_split() {
    let (giant, small, events, spawns) = strike(200.0, 600.0);

    assert!(giant.body.destroyed && small.body.destroyed);
    assert_eq!(child_radii(&spawns), vec![100.0, 100.0, 225.0, 225.0]);
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::Explosion {
            severity: Severity::Medium,
            ..
        }
    )));
}

#[test]
fn test_children_below_min_size_are_dropped() {
    let (giant, small, _events, spawns) = strike(150.0, 550.0);

    assert!(giant.body.destroyed && small.body.destroyed);
    assert_eq!(child_radii(&spawns), vec![225.0, 225.0]);
}

#[test]
fn test_fragments_fly_apart_along_axis() {
    let kids = fragments(DVec2::new(10.0, 10.0), DVec2::new(1.0, 0.0), 300.0, DVec2::Y);
    assert_eq!(kids.len(), 2);
    assert!((kids[0].pos - DVec2::new(10.0, 210.0)).length() < 1e-9);
    assert!((kids[1].pos - DVec2::new(10.0, -190.0)).length() < 1e-9);
    assert_eq!(kids[0].vel, DVec2::new(1.0, ASTEROID_MAX_SPEED));
    assert_eq!(kids[1].vel, DVec2::new(1.0, -ASTEROID_MAX_SPEED));
    assert!(kids.iter().all(|k| k.blink == FRAGMENT_BLINK_TICKS));

    assert!(fragments(DVec2::ZERO, DVec2::ZERO, 170.0, DVec2::X).is_empty());
}

// ---- Planets ----

#[test]
fn test_planet_collision_is_catastrophic() {
    let mut a = planet_state(1, DVec2::ZERO, 1000.0, true);
    let mut b = planet_state(2, DVec2::new(1500.0, 0.0), 1000.0, false);
    let mut rng = rng();
    let mut limit = PLANET_LIMIT;
    let mut events = Vec::new();
    let mut spawns = Vec::new();
    let mut res = Resolution {
        rng: &mut rng,
        planet_limit: &mut limit,
        planets_live: 2,
        bounds: WORLD_BOUNDS,
        events: &mut events,
        spawns: &mut spawns,
    };
    resolve_pair(&mut a, &mut b, &mut res);
    assert_eq!(res.planets_live, 0);

    assert!(a.body.destroyed && b.body.destroyed);
    assert_eq!(limit, PLANET_LIMIT - PLANET_LIMIT_LOSS);
    assert!(events.contains(&SimEvent::HomePlanetLost));
    assert_eq!(spawns.len(), 3);
    assert!(spawns.contains(&Spawn::Debris {
        center: DVec2::new(750.0, 0.0),
        count: PLANET_DEBRIS_COUNT,
        hot: true
    }));
}

#[test]
fn test_planet_absorbs_rock_and_burns_satellite() {
    let mut planet = planet_state(1, DVec2::ZERO, 1000.0, false);
    let mut big = state(2, DVec2::new(1100.0, 0.0), DVec2::ZERO, 200.0);
    let mut sat = state(3, DVec2::new(-1050.0, 0.0), DVec2::ZERO, 120.0);
    let mass0 = planet.body.mass;
    let mut rng = rng();
    let mut limit = PLANET_LIMIT;
    let mut events = Vec::new();
    let mut spawns = Vec::new();
    let mut res = Resolution {
        rng: &mut rng,
        planet_limit: &mut limit,
        planets_live: 1,
        bounds: WORLD_BOUNDS,
        events: &mut events,
        spawns: &mut spawns,
    };
    resolve_pair(&mut planet, &mut big, &mut res);
    let grown = planet.body.target_r;
    resolve_pair(&mut planet, &mut sat, &mut res);

    assert!(big.body.destroyed && sat.body.destroyed);
    let expected = (1000.0f64 * 1000.0 + 200.0 * 200.0 * PLANET_ABSORB_WEIGHT).sqrt();
    assert!((grown - expected).abs() < 1e-9);
    assert!((planet.body.target_r - expected).abs() < 1e-9);
    assert!((planet.body.mass - (mass0 + Body::mass_for(200.0))).abs() < 1e-6);
}

#[test]
fn test_planet_orbit_passes_through_position() {
    let mut rng = rng();
    for pos in [DVec2::new(3000.0, -2000.0), DVec2::new(10.0, 5.0), DVec2::new(-15_000.0, 900.0)] {
        let orbit = world_setup::planet_orbit(&mut rng, pos, WORLD_BOUNDS);
        let local = DVec2::new(
            orbit.semi_major * orbit.angle.cos(),
            orbit.semi_minor * orbit.angle.sin(),
        );
        let on_rail = orbit.center + DVec2::from_angle(orbit.rotation).rotate(local);
        assert!(on_rail.distance(pos) < 1e-6, "rail misses {pos:?}");
        assert!(orbit.semi_major >= PLANET_MIN_SEMI_MAJOR);
        assert!((0.1..0.7).contains(&orbit.eccentricity));
    }
}

#[test]
fn test_orbit_capture_settles_tangentially() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut grid = SpatialGrid::default();

    let planet_r = 600.0;
    let mut builder = EntityBuilder::new();
    builder.add(Motion::new(DVec2::ZERO, DVec2::ZERO)).add(Body {
        kind: BodyKind::Planet(PlanetOrbit {
            center: DVec2::new(-2000.0, 0.0),
            semi_major: 2000.0,
            semi_minor: 2000.0,
            eccentricity: 0.0,
            rotation: 0.0,
            angle: 0.0,
            angular_speed: 0.0,
            z: 0.0,
            z_speed: 0.0,
            z_wait: 0,
            station_checked: true,
            is_home: false,
            hp: PLANET_HP,
        }),
        ..asteroid_body(planet_r)
    });
    let planet = registry.spawn(&mut world, &mut builder);

    let rock_r = 90.0;
    let mut builder = EntityBuilder::new();
    builder
        .add(Motion::new(DVec2::new(1880.0, 0.0), DVec2::ZERO))
        .add(Body {
            kind: BodyKind::Asteroid { ring_multiple: 2.5 },
            ..asteroid_body(rock_r)
        });
    let rock = registry.spawn(&mut world, &mut builder);

    for _ in 0..600 {
        systems::kinematics::run(&mut world, &mut grid, WORLD_BOUNDS);
    }

    let planet_pos = world.get::<&Motion>(registry.get(planet).unwrap()).unwrap().pos;
    let motion = *world.get::<&Motion>(registry.get(rock).unwrap()).unwrap();
    let offset = motion.pos - planet_pos;
    let dist = offset.length();
    let outward = offset / dist;
    let tangential = outward.perp_dot(motion.vel).abs();
    let radial = outward.dot(motion.vel).abs();
    let expected = (G_CONST * Body::mass_for(planet_r) * ORBIT_GRAVITY_GAIN / dist).sqrt();

    assert!(dist < planet_r * ORBIT_RING_FACTOR + rock_r, "rock escaped to {dist}");
    assert!((tangential - expected).abs() < expected * 0.1, "tangential {tangential} vs {expected}");
    assert!(radial < tangential * 0.2);
}

// ---- Kinematics ----

/// A planet parked on a zero-speed rail through `pos`.
fn parked_planet(world: &mut World, registry: &mut Registry, pos: DVec2, z_speed: f64) -> EntityId {
    let mut builder = EntityBuilder::new();
    builder.add(Motion::new(pos, DVec2::ZERO)).add(Body {
        kind: BodyKind::Planet(PlanetOrbit {
            center: pos - DVec2::new(2000.0, 0.0),
            semi_major: 2000.0,
            semi_minor: 2000.0,
            eccentricity: 0.0,
            rotation: 0.0,
            angle: 0.0,
            angular_speed: 0.0,
            z: 0.0,
            z_speed,
            z_wait: 0,
            station_checked: true,
            is_home: z_speed == 0.0,
            hp: PLANET_HP,
        }),
        ..asteroid_body(600.0)
    });
    registry.spawn(world, &mut builder)
}

fn orbit_of(world: &World, registry: &Registry, id: EntityId) -> PlanetOrbit {
    *body_of(world, registry, id).planet().unwrap()
}

#[test]
fn test_depth_cycle_dwells_three_times_longer_near() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut grid = SpatialGrid::default();
    let planet = parked_planet(&mut world, &mut registry, DVec2::new(5000.0, 0.0), 0.0625);

    let (mut near, mut far, mut deepest) = (0u32, 0u32, 0.0f64);
    for _ in 0..130 {
        systems::kinematics::run(&mut world, &mut grid, WORLD_BOUNDS);
        let z = orbit_of(&world, &registry, planet).z;
        assert!((0.0..=MAX_Z_DEPTH).contains(&z), "z left its range: {z}");
        deepest = deepest.max(z);
        if z < ACTIVE_PLANET_Z {
            near += 1;
        } else if z > ACTIVE_PLANET_Z {
            far += 1;
        }
    }

    assert_eq!(deepest, MAX_Z_DEPTH);
    let ratio = near as f64 / far as f64;
    assert!((ratio - 3.0).abs() < 0.2, "near {near} far {far}");
    let orbit = orbit_of(&world, &registry, planet);
    assert_eq!(orbit.z, 0.0);
    assert!(orbit.z_speed > 0.0);
}

#[test]
fn test_station_check_fires_once_per_return_and_rearms() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut grid = SpatialGrid::default();
    let planet = parked_planet(&mut world, &mut registry, DVec2::new(5000.0, 0.0), 0.0625);
    let home = parked_planet(&mut world, &mut registry, DVec2::new(-5000.0, 0.0), 0.0);

    let mut returns = Vec::new();
    let mut depth = Vec::new();
    for tick in 0..200 {
        let returning = systems::kinematics::run(&mut world, &mut grid, WORLD_BOUNDS);
        assert!(!returning.contains(&home));
        depth.push(orbit_of(&world, &registry, planet).z);
        if returning.contains(&planet) {
            returns.push(tick);
        }
    }

    assert_eq!(returns.len(), 2, "returns at {returns:?}");
    for &tick in &returns {
        assert!(depth[tick] < STATION_RESPAWN_Z);
    }
    let between = &depth[returns[0]..returns[1]];
    assert!(between.iter().any(|&z| z > ACTIVE_PLANET_Z));
    assert_eq!(orbit_of(&world, &registry, home).z, 0.0);
}

#[test]
fn test_asteroid_speed_is_clamped() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut grid = SpatialGrid::default();
    let mut builder = EntityBuilder::new();
    builder
        .add(Motion::new(DVec2::ZERO, DVec2::new(30.0, 40.0)))
        .add(asteroid_body(100.0));
    let id = registry.spawn(&mut world, &mut builder);

    systems::kinematics::run(&mut world, &mut grid, WORLD_BOUNDS);

    let motion = *world.get::<&Motion>(registry.get(id).unwrap()).unwrap();
    assert!((motion.vel.length() - ASTEROID_MAX_SPEED).abs() < 1e-9);
    assert!((motion.pos - DVec2::new(6.0, 8.0)).length() < 1e-9);
    assert_eq!(grid.len(), 1);
}

#[test]
fn test_soft_boundary_turns_bodies_inward() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut grid = SpatialGrid::default();

    let edge = DVec2::new(WORLD_BOUNDS - 500.0, 0.0);
    let mut builder = EntityBuilder::new();
    builder.add(Motion::new(edge, DVec2::ZERO)).add(asteroid_body(100.0));
    let rock = registry.spawn(&mut world, &mut builder);
    let mut builder = EntityBuilder::new();
    builder
        .add(Motion::new(DVec2::new(0.0, 1000.0), DVec2::ZERO))
        .add(asteroid_body(100.0));
    let inner = registry.spawn(&mut world, &mut builder);

    let outside = DVec2::new(-(WORLD_BOUNDS + 3000.0), 0.0);
    let planet = parked_planet(&mut world, &mut registry, outside, 0.0);
    let center_before = orbit_of(&world, &registry, planet).center;

    systems::kinematics::run(&mut world, &mut grid, WORLD_BOUNDS);

    let rock_vel = world.get::<&Motion>(registry.get(rock).unwrap()).unwrap().vel;
    assert!((rock_vel - DVec2::new(-BOUNDARY_CORRECTION, 0.0)).length() < 1e-9);
    let inner_vel = world.get::<&Motion>(registry.get(inner).unwrap()).unwrap().vel;
    assert_eq!(inner_vel, DVec2::ZERO);
    let center_after = orbit_of(&world, &registry, planet).center;
    assert!((center_after.x - center_before.x - PLANET_CENTER_PULL).abs() < 1e-9);
}

#[test]
fn test_radius_eases_and_snaps_to_target() {
    let mut body = asteroid_body(100.0);
    body.target_r = 110.0;
    body.mass = Body::mass_for(150.0);

    systems::kinematics::smooth_radius(&mut body);
    assert!((body.r - (100.0 + 10.0 * RADIUS_SMOOTHING)).abs() < 1e-9);
    assert_eq!(body.mass, Body::mass_for(150.0));

    let mut steps = 1;
    while body.r != body.target_r && steps < 10_000 {
        let before = body.r;
        systems::kinematics::smooth_radius(&mut body);
        assert!(body.r > before);
        steps += 1;
    }
    assert_eq!(body.r, 110.0);
    assert_eq!(body.mass, Body::mass_for(110.0));

    systems::kinematics::smooth_radius(&mut body);
    assert_eq!(body.r, 110.0);
    assert_eq!(body.mass, Body::mass_for(110.0));
}

// ---- Squads ----

#[test]
fn test_friendly_stray_joins_player_in_one_tick() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    let stray = ship(&mut world, &mut registry, DVec2::new(400.0, 0.0), true, FRIENDLY_HUE);

    systems::squad_ai::run(&mut world, &SpatialGrid::default(), &mut rng(), WORLD_BOUNDS);

    let brain = unit_of(&world, &registry, stray).brain().cloned().unwrap();
    assert_eq!(brain.leader, Some(player));
    assert_eq!(brain.role, SquadRole::Wingman);
    let leader = unit_of(&world, &registry, player).brain().cloned().unwrap();
    let seats: Vec<_> = leader.slots.iter().filter(|s| s.occupant == Some(stray)).collect();
    assert_eq!(seats.len(), 1);
    assert_eq!(seats[0].offset, brain.formation_offset);
}

#[test]
fn test_friendly_beyond_join_range_stays_independent() {
    let mut world = World::new();
    let mut registry = Registry::new();
    world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    let stray = ship(&mut world, &mut registry, DVec2::new(JOIN_PLAYER_RANGE + 100.0, 0.0), true, FRIENDLY_HUE);

    systems::squad_ai::run(&mut world, &SpatialGrid::default(), &mut rng(), WORLD_BOUNDS);

    let brain = unit_of(&world, &registry, stray).brain().cloned().unwrap();
    assert_eq!(brain.leader, None);
    assert_eq!(brain.role, SquadRole::Independent);
}

#[test]
fn test_hostile_strays_recruit_a_leader() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let first = ship(&mut world, &mut registry, DVec2::ZERO, false, 300);
    let second = ship(&mut world, &mut registry, DVec2::new(100.0, 0.0), false, 300);

    systems::squad_ai::run(&mut world, &SpatialGrid::default(), &mut rng(), WORLD_BOUNDS);

    let a = unit_of(&world, &registry, first).brain().cloned().unwrap();
    let b = unit_of(&world, &registry, second).brain().cloned().unwrap();
    assert_eq!(b.role, SquadRole::Leader);
    assert_eq!(a.role, SquadRole::Wingman);
    assert_eq!(a.leader, Some(second));
    assert_eq!(b.member_count(), 1);
}

#[test]
fn test_wingman_of_fallen_leader_regroups() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let wingman = ship(&mut world, &mut registry, DVec2::ZERO, false, 300);
    let leader = ship(&mut world, &mut registry, DVec2::new(100.0, 0.0), false, 300);
    systems::squad_ai::run(&mut world, &SpatialGrid::default(), &mut rng(), WORLD_BOUNDS);
    assert_eq!(unit_of(&world, &registry, wingman).brain().unwrap().leader, Some(leader));

    world
        .get::<&mut Unit>(registry.get(leader).unwrap())
        .unwrap()
        .destroyed = true;
    systems::cleanup::run(&mut world, &mut registry, &mut Vec::new());
    let orphan = unit_of(&world, &registry, wingman).brain().cloned().unwrap();
    assert_eq!(orphan.leader, None);
    assert_eq!(orphan.role, SquadRole::Independent);

    let stray = ship(&mut world, &mut registry, DVec2::new(0.0, 100.0), false, 300);
    for _ in 0..5 {
        systems::squad_ai::run(&mut world, &SpatialGrid::default(), &mut rng(), WORLD_BOUNDS);
    }
    let a = unit_of(&world, &registry, wingman).brain().cloned().unwrap();
    let c = unit_of(&world, &registry, stray).brain().cloned().unwrap();
    assert_eq!(a.role, SquadRole::Wingman);
    assert_eq!(a.leader, Some(stray));
    assert_eq!(c.role, SquadRole::Leader);
    assert_eq!(c.member_count(), 1);
}

#[test]
fn test_leaderless_wingman_is_released() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let lost = ship(&mut world, &mut registry, DVec2::ZERO, false, 300);
    if let UnitKind::Ship(brain) = &mut world.get::<&mut Unit>(registry.get(lost).unwrap()).unwrap().kind {
        brain.role = SquadRole::Wingman;
    }
    let stray = ship(&mut world, &mut registry, DVec2::new(100.0, 0.0), false, 300);

    systems::squad_ai::run(&mut world, &SpatialGrid::default(), &mut rng(), WORLD_BOUNDS);

    let a = unit_of(&world, &registry, lost).brain().cloned().unwrap();
    assert_eq!(a.role, SquadRole::Wingman);
    assert_eq!(a.leader, Some(stray));
}

#[test]
fn test_dead_player_squad_dissolves() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    let stray = ship(&mut world, &mut registry, DVec2::new(400.0, 0.0), true, FRIENDLY_HUE);
    systems::squad_ai::run(&mut world, &SpatialGrid::default(), &mut rng(), WORLD_BOUNDS);

    world
        .get::<&mut PlayerControl>(registry.get(player).unwrap())
        .unwrap()
        .dead = true;
    systems::squad_ai::run(&mut world, &SpatialGrid::default(), &mut rng(), WORLD_BOUNDS);

    let leader = unit_of(&world, &registry, player).brain().cloned().unwrap();
    assert_eq!(leader.member_count(), 0);
    let brain = unit_of(&world, &registry, stray).brain().cloned().unwrap();
    assert_eq!(brain.leader, None);
    assert_eq!(brain.role, SquadRole::Independent);
}

// ---- Weapons ----

#[test]
fn test_tier_thresholds() {
    let cases = [
        (-500, 0),
        (0, 0),
        (999, 0),
        (1000, 1),
        (6999, 6),
        (7000, 7),
        (8999, 7),
        (9000, 8),
        (12_000, 9),
        (16_000, 10),
        (21_000, 11),
        (27_000, 12),
    ];
    for (score, tier) in cases {
        assert_eq!(tier_for_score(score), tier, "score {score}");
    }
}

#[test]
fn test_pattern_barrel_counts() {
    let counts: Vec<usize> = (0..=12).map(|t| pattern(t).len()).collect();
    assert_eq!(counts, vec![1, 1, 2, 3, 3, 5, 5, 7, 5, 7, 13, 21, 21]);
    assert!(pattern(4).iter().filter(|s| s.secondary).count() == 2);
}

#[test]
fn test_every_pattern_keeps_a_centre_barrel() {
    for tier in 0..=MAX_PATTERN_TIER {
        let shots = pattern(tier);
        assert!(
            shots.iter().any(|s| s.offset == 0.0 && !s.secondary),
            "tier {tier} has no centre barrel"
        );
        let widest = shots.iter().map(|s| s.offset.abs()).fold(0.0, f64::max);
        assert!(widest <= 0.3 + 1e-9, "tier {tier} spreads to {widest}");
    }
}

#[test]
fn test_ally_in_line_holds_fire() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let shooter = ship(&mut world, &mut registry, DVec2::ZERO, false, 300);
    ship(&mut world, &mut registry, DVec2::new(300.0, 0.0), false, 300);
    let mut events = Vec::new();
    let mut spawns = Vec::new();
    let trigger = systems::weapons::Trigger {
        shooter,
        order: gravwell_squad_ai::fsm::FireOrder {
            at: DVec2::new(800.0, 0.0),
            reload: COMBAT_RELOAD,
        },
    };

    systems::weapons::run(&mut world, &registry, &mut rng(), &[trigger], &mut events, &mut spawns);
    assert!(spawns.is_empty());
    assert!(events.is_empty());

    let clear = systems::weapons::Trigger {
        order: gravwell_squad_ai::fsm::FireOrder {
            at: DVec2::new(0.0, 800.0),
            reload: COMBAT_RELOAD,
        },
        ..trigger
    };
    systems::weapons::run(&mut world, &registry, &mut rng(), &[clear], &mut events, &mut spawns);
    assert_eq!(spawns.len(), 1);
    assert!(unit_of(&world, &registry, shooter).reload >= COMBAT_RELOAD.0);
}

#[test]
fn test_ai_volley_leaves_along_facing() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let shooter = ship(&mut world, &mut registry, DVec2::ZERO, false, 300);
    world
        .get::<&mut Unit>(registry.get(shooter).unwrap())
        .unwrap()
        .facing = 0.2;
    let mut events = Vec::new();
    let mut spawns = Vec::new();
    let trigger = systems::weapons::Trigger {
        shooter,
        order: gravwell_squad_ai::fsm::FireOrder {
            at: DVec2::new(800.0, 0.0),
            reload: COMBAT_RELOAD,
        },
    };

    systems::weapons::run(&mut world, &registry, &mut rng(), &[trigger], &mut events, &mut spawns);
    assert_eq!(spawns.len(), 1);
    let Spawn::Projectile { vel, .. } = &spawns[0] else {
        panic!("expected a projectile");
    };
    assert!((vel.y.atan2(vel.x) - 0.2).abs() < 1e-9);
}

#[test]
fn test_player_fire_is_latched_until_reloaded() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    let entity = registry.get(player).unwrap();
    {
        let mut unit = world.get::<&mut Unit>(entity).unwrap();
        unit.reload = 2.0;
    }
    world.get::<&mut PlayerControl>(entity).unwrap().fire_requested = true;
    let mut events = Vec::new();
    let mut spawns = Vec::new();

    systems::weapons::run(&mut world, &registry, &mut rng(), &[], &mut events, &mut spawns);
    assert!(spawns.is_empty());
    assert!(world.get::<&PlayerControl>(entity).unwrap().fire_requested);

    world.get::<&mut Unit>(entity).unwrap().reload = 0.0;
    systems::weapons::run(&mut world, &registry, &mut rng(), &[], &mut events, &mut spawns);
    assert_eq!(spawns.len(), 1);
    assert!(!world.get::<&PlayerControl>(entity).unwrap().fire_requested);
    assert_eq!(unit_of(&world, &registry, player).reload, PLAYER_RELOAD as f64);
}

// ---- Projectiles ----

fn bullet(owner: EntityId, friendly: bool) -> Projectile {
    Projectile {
        life: 50,
        size: 6.0,
        tier: 0,
        owner: Some(owner),
        hue: FRIENDLY_HUE,
        friendly,
        spent: false,
    }
}

#[test]
fn test_bullet_splits_asteroid_across_its_path() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut grid = SpatialGrid::default();
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::new(-2000.0, 0.0));
    let target = rock(&mut world, &mut registry, DVec2::new(500.0, 0.0), 300.0);
    world_setup::spawn_projectile(
        &mut world,
        &mut registry,
        DVec2::new(180.0, 0.0),
        DVec2::new(20.0, 0.0),
        bullet(player, true),
    );
    systems::kinematics::rebuild_grid(&world, &mut grid);
    let mut events = Vec::new();
    let mut spawns = Vec::new();

    let kills = systems::projectiles::run(&mut world, &registry, &grid, WORLD_BOUNDS, &mut events, &mut spawns);

    assert!(kills.is_empty());
    assert!(body_of(&world, &registry, target).destroyed);
    assert_eq!(spawns.len(), 2);
    for spawn in &spawns {
        let Spawn::Asteroid(seed) = spawn else {
            panic!("unexpected spawn {spawn:?}");
        };
        assert!((seed.pos.x - 500.0).abs() < 1e-9);
        assert!((seed.r - 150.0).abs() < 1e-9);
    }
    assert_eq!(unit_of(&world, &registry, player).score, SCORE_ASTEROID);
}

#[test]
fn test_friendly_fire_turns_the_fleet() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let grid = SpatialGrid::default();
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    let victim = ship(&mut world, &mut registry, DVec2::new(300.0, 0.0), true, FRIENDLY_HUE);
    let wingman = ship(&mut world, &mut registry, DVec2::new(0.0, -150.0), true, FRIENDLY_HUE);
    {
        let mut unit = world.get::<&mut Unit>(registry.get(victim).unwrap()).unwrap();
        unit.hp = 1;
    }
    {
        let mut unit = world.get::<&mut Unit>(registry.get(wingman).unwrap()).unwrap();
        let brain = unit.brain_mut().unwrap();
        brain.role = SquadRole::Wingman;
        brain.leader = Some(player);
    }
    world_setup::spawn_projectile(
        &mut world,
        &mut registry,
        DVec2::new(280.0, 0.0),
        DVec2::new(10.0, 0.0),
        bullet(player, true),
    );
    let mut events = Vec::new();
    let mut spawns = Vec::new();

    let kills = systems::projectiles::run(&mut world, &registry, &grid, WORLD_BOUNDS, &mut events, &mut spawns);
    assert_eq!(kills.len(), 1);
    assert_eq!(kills[0].killer, Some(player));
    casualties::settle(&mut world, &registry, &kills, &mut events, &mut spawns);

    let control = *world.get::<&PlayerControl>(registry.get(player).unwrap()).unwrap();
    assert!(control.lone_wolf);
    assert_eq!(unit_of(&world, &registry, player).score, -SCORE_SHIP);
    assert!(events.contains(&SimEvent::Betrayal));
    assert!(events.iter().any(|e| matches!(e, SimEvent::ShipDestroyed { id, .. } if *id == victim)));

    let turned = unit_of(&world, &registry, wingman);
    assert!(!turned.friendly);
    assert_eq!(turned.hue, TURNCOAT_HUE);
    let brain = turned.brain().unwrap();
    assert_eq!(brain.state, AiState::Combat);
    assert_eq!(brain.role, SquadRole::Independent);
    assert_eq!(brain.leader, None);
}

#[test]
fn test_hostile_bullet_wounds_player() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    let gunner = ship(&mut world, &mut registry, DVec2::new(1000.0, 0.0), false, 300);
    let entity = registry.get(player).unwrap();
    world.get::<&mut Unit>(entity).unwrap().blink = 0;
    world_setup::spawn_projectile(
        &mut world,
        &mut registry,
        DVec2::new(30.0, 0.0),
        DVec2::new(-10.0, 0.0),
        Projectile {
            hue: 300,
            ..bullet(gunner, false)
        },
    );
    let mut events = Vec::new();
    let mut spawns = Vec::new();

    systems::projectiles::run(&mut world, &registry, &SpatialGrid::default(), WORLD_BOUNDS, &mut events, &mut spawns);

    let unit = unit_of(&world, &registry, player);
    assert_eq!(unit.hp, SHIP_HP - 1);
    assert_eq!(unit.blink, PLAYER_HIT_BLINK);
    assert!(events.contains(&SimEvent::PlayerHit { hp_left: SHIP_HP - 1 }));
}

#[test]
fn test_bullet_passes_an_ally_to_reach_the_enemy_behind() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let escort = ship(&mut world, &mut registry, DVec2::new(30.0, 0.0), false, 300);
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::new(40.0, 0.0));
    let gunner = ship(&mut world, &mut registry, DVec2::new(1000.0, 0.0), false, 300);
    world.get::<&mut Unit>(registry.get(player).unwrap()).unwrap().blink = 0;
    world_setup::spawn_projectile(
        &mut world,
        &mut registry,
        DVec2::new(40.0, 0.0),
        DVec2::new(-10.0, 0.0),
        Projectile {
            hue: 300,
            ..bullet(gunner, false)
        },
    );
    let mut events = Vec::new();
    let mut spawns = Vec::new();

    systems::projectiles::run(&mut world, &registry, &SpatialGrid::default(), WORLD_BOUNDS, &mut events, &mut spawns);

    assert_eq!(unit_of(&world, &registry, escort).hp, SHIP_HP);
    assert_eq!(unit_of(&world, &registry, player).hp, SHIP_HP - 1);
    assert!(world.query::<&Projectile>().iter().all(|(_, p)| p.spent));
}

// ---- Shockwaves ----

#[test]
fn test_god_ring_sweeps_the_front() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    {
        let mut unit = world.get::<&mut Unit>(registry.get(player).unwrap()).unwrap();
        unit.score = 27_000;
        unit.tier = GOD_TIER;
    }
    let near = rock(&mut world, &mut registry, DVec2::new(500.0, 0.0), 100.0);
    let far = rock(&mut world, &mut registry, DVec2::new(5000.0, 0.0), 100.0);
    let enemy = ship(&mut world, &mut registry, DVec2::new(0.0, 400.0), false, 300);
    world_setup::spawn_shockwave(&mut world, &mut registry, world_setup::god_ring(DVec2::ZERO, player));
    let mut events = Vec::new();
    let mut spawns = Vec::new();

    let kills = systems::shockwave::run(&mut world, &registry, &mut events, &mut spawns);

    assert!(body_of(&world, &registry, near).destroyed);
    assert!(!body_of(&world, &registry, far).destroyed);
    assert!(unit_of(&world, &registry, enemy).destroyed);
    assert!(!unit_of(&world, &registry, player).destroyed);
    assert_eq!(kills.len(), 1);
    assert_eq!(kills[0].victim, enemy);
    assert_eq!(kills[0].killer, None);
    assert_eq!(unit_of(&world, &registry, player).score, 27_000 + SCORE_ASTEROID);
}

#[test]
fn test_impulse_ring_pushes_outward() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let target = rock(&mut world, &mut registry, DVec2::new(25.0, 0.0), 100.0);
    world_setup::spawn_shockwave(&mut world, &mut registry, world_setup::impulse_ring(DVec2::ZERO));
    let mut events = Vec::new();
    let mut spawns = Vec::new();

    systems::shockwave::run(&mut world, &registry, &mut events, &mut spawns);

    let vel = world.get::<&Motion>(registry.get(target).unwrap()).unwrap().vel;
    assert!(vel.x > 0.0);
    assert!(vel.y.abs() < 1e-12);
    assert!(!body_of(&world, &registry, target).destroyed);
}

// ---- Players ----

#[test]
fn test_dead_player_respawns_at_home() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut rng = rng();
    let home = world_setup::spawn_home_planet(&mut world, &mut registry, &mut rng, WORLD_BOUNDS);
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::new(9000.0, 0.0));
    let entity = registry.get(player).unwrap();
    {
        let mut control = world.get::<&mut PlayerControl>(entity).unwrap();
        control.dead = true;
        control.lives = 2;
        control.respawn_timer = 0;
    }
    let mut events = Vec::new();

    systems::player::run(&mut world, WORLD_BOUNDS, &mut events);

    let control = *world.get::<&PlayerControl>(entity).unwrap();
    assert!(!control.dead);
    assert!(events.contains(&SimEvent::PlayerRespawned));
    let home_pos = world.get::<&Motion>(registry.get(home).unwrap()).unwrap().pos;
    let pos = world.get::<&Motion>(entity).unwrap().pos;
    assert!(pos.distance(home_pos) < 2000.0);
    assert_eq!(unit_of(&world, &registry, player).hp, SHIP_HP);
}

#[test]
fn test_second_hit_costs_a_life() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::ZERO);
    let entity = registry.get(player).unwrap();
    world.get::<&mut Unit>(entity).unwrap().blink = 0;
    let mut events = Vec::new();

    assert!(!casualties::hit_player(&mut world, entity, DeathCause::Collision, &mut events));
    // Blinking after the first hit.
    assert!(!casualties::hit_player(&mut world, entity, DeathCause::Collision, &mut events));
    world.get::<&mut Unit>(entity).unwrap().blink = 0;
    assert!(casualties::hit_player(&mut world, entity, DeathCause::Collision, &mut events));

    let control = *world.get::<&PlayerControl>(entity).unwrap();
    assert!(control.dead);
    assert_eq!(control.lives, PLAYER_LIVES - 1);
    assert_eq!(control.respawn_timer, PLAYER_RESPAWN_TICKS);
    assert!(events.contains(&SimEvent::PlayerKilled {
        lives_left: PLAYER_LIVES - 1,
        cause: DeathCause::Collision
    }));
}

// ---- Stations ----

#[test]
fn test_station_without_host_is_destroyed() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut rng = rng();
    let host = world_setup::spawn_planet(&mut world, &mut registry, &mut rng, DVec2::new(5000.0, 0.0), 800.0, WORLD_BOUNDS);
    let station = world_setup::spawn_station(&mut world, &mut registry, &mut rng, host, false).unwrap();
    let host_entity = registry.remove(host).unwrap();
    world.despawn(host_entity).unwrap();

    let report = systems::stations::run(
        &mut world,
        &mut registry,
        &SpatialGrid::default(),
        &mut rng,
        &SimConfig::default(),
    );

    assert!(unit_of(&world, &registry, station).destroyed);
    assert!(report.kills.iter().any(|k| k.victim == station));
}

#[test]
fn test_destroyed_station_leaves_junk() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut rng = rng();
    let host = world_setup::spawn_planet(&mut world, &mut registry, &mut rng, DVec2::new(5000.0, 0.0), 800.0, WORLD_BOUNDS);
    let station = world_setup::spawn_station(&mut world, &mut registry, &mut rng, host, false).unwrap();
    let kills = [casualties::Kill {
        victim: station,
        killer: None,
    }];
    let mut events = Vec::new();
    let mut spawns = Vec::new();

    casualties::settle(&mut world, &registry, &kills, &mut events, &mut spawns);

    assert!(events.iter().any(|e| matches!(e, SimEvent::StationDestroyed { id, .. } if *id == station)));
    assert!(matches!(
        spawns.as_slice(),
        [Spawn::Asteroid(seed)] if seed.r == ASTEROID_MIN_SIZE
    ));
}

// ---- Housekeeping ----

#[test]
fn test_cleanup_is_idempotent() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let mut buffer = Vec::new();

    let gone_rock = rock(&mut world, &mut registry, DVec2::ZERO, 100.0);
    rock(&mut world, &mut registry, DVec2::new(1000.0, 0.0), 100.0);
    let leader = ship(&mut world, &mut registry, DVec2::new(0.0, 500.0), false, 300);
    let follower = ship(&mut world, &mut registry, DVec2::new(0.0, 600.0), false, 300);
    let shot = world_setup::spawn_projectile(&mut world, &mut registry, DVec2::ZERO, DVec2::X, bullet(leader, false));

    world.get::<&mut Body>(registry.get(gone_rock).unwrap()).unwrap().destroyed = true;
    world.get::<&mut Unit>(registry.get(leader).unwrap()).unwrap().destroyed = true;
    world
        .get::<&mut Unit>(registry.get(follower).unwrap())
        .unwrap()
        .brain_mut()
        .unwrap()
        .leader = Some(leader);

    let removed = systems::cleanup::run(&mut world, &mut registry, &mut buffer);
    assert_eq!(removed, 2);
    assert!(!registry.contains(gone_rock) && !registry.contains(leader));
    assert_eq!(unit_of(&world, &registry, follower).brain().unwrap().leader, None);
    let owner = world.get::<&Projectile>(registry.get(shot).unwrap()).unwrap().owner;
    assert_eq!(owner, None);

    let first = serde_json::to_string(&build_snapshot(&world, session(), Vec::new())).unwrap();
    assert_eq!(systems::cleanup::run(&mut world, &mut registry, &mut buffer), 0);
    let second = serde_json::to_string(&build_snapshot(&world, session(), Vec::new())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_sanitize_repairs_non_finite_state() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let drifting = rock(&mut world, &mut registry, DVec2::ZERO, 100.0);
    let lost = rock(&mut world, &mut registry, DVec2::new(500.0, 0.0), 100.0);
    let player = world_setup::spawn_player(&mut world, &mut registry, DVec2::new(100.0, 0.0));

    world.get::<&mut Motion>(registry.get(drifting).unwrap()).unwrap().vel = DVec2::new(f64::NAN, 1.0);
    world.get::<&mut Motion>(registry.get(lost).unwrap()).unwrap().pos = DVec2::new(f64::INFINITY, 0.0);
    world.get::<&mut Motion>(registry.get(player).unwrap()).unwrap().pos = DVec2::new(f64::NAN, 0.0);

    let report = systems::sanitize::run(&mut world);
    assert_eq!(report.velocities_zeroed, 1);
    assert_eq!(report.retired, 1);
    assert!(report.player_reset);

    assert_eq!(world.get::<&Motion>(registry.get(drifting).unwrap()).unwrap().vel, DVec2::ZERO);
    assert!(!body_of(&world, &registry, drifting).destroyed);
    assert!(body_of(&world, &registry, lost).destroyed);
    assert_eq!(world.get::<&Motion>(registry.get(player).unwrap()).unwrap().pos, DVec2::ZERO);

    assert_eq!(systems::sanitize::run(&mut world), Default::default());
}

#[test]
fn test_snapshot_lists_sorted_by_id() {
    let mut engine = SimulationEngine::new(small_config(9));
    for _ in 0..30 {
        engine.tick();
    }
    let snap = engine.snapshot();
    assert!(snap.bodies.windows(2).all(|w| w[0].id < w[1].id));
    assert!(snap.units.windows(2).all(|w| w[0].id < w[1].id));
    assert!(snap.projectiles.windows(2).all(|w| w[0].id < w[1].id));
}

// ---- Configuration ----

#[test]
fn test_config_partial_json_uses_defaults() {
    let config = SimConfig::from_json_str(r#"{ "seed": 7, "asteroid_count": 10 }"#).unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.asteroid_count, 10);
    assert_eq!(config.world_bounds, WORLD_BOUNDS);
    assert_eq!(config.hostile_limit(), SHIP_LIMIT * HOSTILE_LIMIT_FACTOR);
}

#[test]
fn test_config_validation_errors() {
    assert!(matches!(
        SimConfig::from_json_str(r#"{ "world_bounds": 0.0 }"#),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        SimConfig::from_json_str(r#"{ "belt_inner": 9000.0, "belt_outer": 8000.0 }"#),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        SimConfig::from_json_str(r#"{ "stations_per_planet": 0 }"#),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(SimConfig::from_json_str("{ seed: "), Err(ConfigError::Json(_))));
    assert!(matches!(
        SimConfig::from_path("/nonexistent/gravwell.json"),
        Err(ConfigError::Io(_))
    ));
}

// ---- Spatial grid ----

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_grid_radius_query_is_complete(
        points in prop::collection::vec((-6000.0f64..6000.0, -6000.0f64..6000.0), 1..60),
        center in (-6000.0f64..6000.0, -6000.0f64..6000.0),
        radius in 0.0f64..4500.0,
    ) {
        let mut world = World::new();
        let mut grid = SpatialGrid::default();
        for (i, &(x, y)) in points.iter().enumerate() {
            let entity = world.spawn(());
            grid.insert(i as EntityId, entity, DVec2::new(x, y));
        }
        let center = DVec2::new(center.0, center.1);

        let mut found: Vec<EntityId> = grid.query_radius(center, radius).iter().map(|e| e.id).collect();
        found.sort_unstable();
        let expected: Vec<EntityId> = points
            .iter()
            .enumerate()
            .filter(|&(_, &(x, y))| DVec2::new(x, y).distance_squared(center) <= radius * radius)
            .map(|(i, _)| i as EntityId)
            .collect();
        prop_assert_eq!(found, expected);
        prop_assert_eq!(grid.len(), points.len());
    }
}

#[test]
fn test_registry_ids_start_at_one_and_stop_resolving() {
    let mut world = World::new();
    let mut registry = Registry::new();
    let a = rock(&mut world, &mut registry, DVec2::ZERO, 100.0);
    let b = rock(&mut world, &mut registry, DVec2::X, 100.0);
    assert_eq!((a, b), (1, 2));
    assert!(registry.remove(a).is_some());
    assert!(registry.get(a).is_none());
    assert_eq!(registry.len(), 1);
}
