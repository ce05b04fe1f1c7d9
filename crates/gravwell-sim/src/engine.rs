//! Simulation engine: the core of the game.
//!
//! `SimulationEngine` owns the hecs ECS world and every piece of side state,
//! applies player intents, runs all systems in a fixed order, and produces
//! `WorldSnapshot`s. Completely headless, enabling deterministic testing.

use std::collections::VecDeque;

use glam::DVec2;
use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use gravwell_core::commands::Intent;
use gravwell_core::components::{Body, Motion, PlayerControl, Unit, UnitKind};
use gravwell_core::constants::*;
use gravwell_core::enums::GamePhase;
use gravwell_core::events::SimEvent;
use gravwell_core::state::WorldSnapshot;
use gravwell_core::types::{wrap_angle, EntityId, SimTime};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::registry::Registry;
use crate::spatial::SpatialGrid;
use crate::systems::{self, snapshot::SessionView, Spawn};
use crate::world_setup::{self, AsteroidSeed};

/// Longest stretch of wall time `step` will catch up on in one call.
const MAX_STEP_SECS: f64 = 0.25;

/// The simulation engine. Owns the ECS world and all sim state.
pub struct SimulationEngine {
    world: World,
    registry: Registry,
    grid: SpatialGrid,
    config: SimConfig,
    time: SimTime,
    phase: GamePhase,
    rng: ChaCha8Rng,
    intents: VecDeque<Intent>,
    events: Vec<SimEvent>,
    spawns: Vec<Spawn>,
    despawn_buffer: Vec<Entity>,
    planet_limit: usize,
    zoom_index: usize,
    player: Option<EntityId>,
    home: Option<EntityId>,
    accumulator: f64,
}

impl SimulationEngine {
    /// Create an engine and populate the starting world. The config is
    /// trusted as given; use `try_new` for untrusted input.
    pub fn new(config: SimConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut world = World::new();
        let mut registry = Registry::new();
        let setup = world_setup::setup_world(&mut world, &mut registry, &mut rng, &config);

        let mut engine = Self {
            world,
            registry,
            grid: SpatialGrid::default(),
            planet_limit: config.planet_limit,
            config,
            time: SimTime::default(),
            phase: GamePhase::default(),
            rng,
            intents: VecDeque::new(),
            events: Vec::new(),
            spawns: Vec::new(),
            despawn_buffer: Vec::new(),
            zoom_index: ZOOM_DEFAULT_INDEX,
            player: setup.player,
            home: setup.home,
            accumulator: 0.0,
        };
        systems::kinematics::rebuild_grid(&engine.world, &mut engine.grid);
        engine
    }

    /// Validate the config, then build the engine.
    pub fn try_new(config: SimConfig) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Queue an intent for the next tick boundary.
    pub fn queue_intent(&mut self, intent: Intent) {
        self.intents.push_back(intent);
    }

    pub fn queue_intents(&mut self, intents: impl IntoIterator<Item = Intent>) {
        self.intents.extend(intents);
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> WorldSnapshot {
        self.process_intents();

        if self.phase != GamePhase::Paused {
            self.run_systems();
            self.time.advance();
        }

        let events = std::mem::take(&mut self.events);
        systems::snapshot::build_snapshot(&self.world, self.session(), events)
    }

    /// Feed `dt` seconds of wall time and run as many whole ticks as fit.
    /// Returns the last snapshot, carrying the events of every tick run, or
    /// `None` if no tick was due.
    pub fn step(&mut self, dt: f64) -> Option<WorldSnapshot> {
        if !dt.is_finite() || dt <= 0.0 {
            return None;
        }
        self.accumulator = (self.accumulator + dt).min(MAX_STEP_SECS);

        let mut events = Vec::new();
        let mut last = None;
        while self.accumulator >= DT {
            self.accumulator -= DT;
            let mut snapshot = self.tick();
            events.append(&mut snapshot.events);
            last = Some(snapshot);
        }
        last.map(|mut snapshot| {
            snapshot.events = events;
            snapshot
        })
    }

    /// Snapshot of the current state without advancing. Pending events are
    /// included but not drained.
    pub fn snapshot(&self) -> WorldSnapshot {
        systems::snapshot::build_snapshot(&self.world, self.session(), self.events.clone())
    }

    fn session(&self) -> SessionView {
        SessionView {
            time: self.time,
            phase: self.phase,
            radar_range: self.radar_range(),
            planet_limit: self.planet_limit,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Current planet capacity. Catastrophes shrink it.
    pub fn planet_limit(&self) -> usize {
        self.planet_limit
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    pub fn home_planet_id(&self) -> Option<EntityId> {
        self.home.filter(|id| self.registry.contains(*id))
    }

    pub fn zoom_index(&self) -> usize {
        self.zoom_index
    }

    /// Radar radius at the current zoom level.
    pub fn radar_range(&self) -> f64 {
        let i = self.zoom_index as f64;
        1000.0 + 200.0 * i + 100.0 * i * i
    }

    /// Entity handle for a stable id.
    pub fn entity(&self, id: EntityId) -> Result<Entity, SimError> {
        self.registry.get(id).ok_or(SimError::UnknownEntity(id))
    }

    pub fn position_of(&self, id: EntityId) -> Result<DVec2, SimError> {
        let entity = self.entity(id)?;
        self.world
            .get::<&Motion>(entity)
            .map(|m| m.pos)
            .map_err(|_| SimError::UnknownEntity(id))
    }

    // --- Factories ---

    /// Add an asteroid. Oversized rocks become planets while there is room
    /// and stay asteroids otherwise.
    pub fn spawn_asteroid(&mut self, pos: DVec2, vel: DVec2, r: f64) -> EntityId {
        let promote = self.planet_room().then_some(self.config.world_bounds);
        world_setup::spawn_asteroid(
            &mut self.world,
            &mut self.registry,
            &mut self.rng,
            AsteroidSeed::new(pos, vel, r.max(1.0)),
            promote,
        )
    }

    /// Drop `count` random rocks around `center`.
    pub fn create_cluster(&mut self, center: DVec2, spread: f64, count: usize) -> Vec<EntityId> {
        world_setup::spawn_cluster(
            &mut self.world,
            &mut self.registry,
            &mut self.rng,
            center,
            spread.abs(),
            count,
        )
    }

    /// Place a station on `host`, friendly if the host is the home planet.
    pub fn spawn_station(&mut self, host: EntityId) -> Result<EntityId, SimError> {
        let entity = self.entity(host)?;
        let is_home = {
            let body = self
                .world
                .get::<&Body>(entity)
                .map_err(|_| SimError::NotAPlanet(host))?;
            body.planet().ok_or(SimError::NotAPlanet(host))?.is_home
        };
        world_setup::spawn_station(&mut self.world, &mut self.registry, &mut self.rng, host, is_home)
            .ok_or(SimError::NotAPlanet(host))
    }

    /// Launch a squad from `station` if its side is under the ship cap.
    pub fn spawn_squad(&mut self, station: EntityId) -> Result<Vec<EntityId>, SimError> {
        let entity = self.entity(station)?;
        let (pos, vel, hue, friendly) = {
            let motion = self
                .world
                .get::<&Motion>(entity)
                .map_err(|_| SimError::UnknownEntity(station))?;
            let unit = self
                .world
                .get::<&Unit>(entity)
                .map_err(|_| SimError::UnknownEntity(station))?;
            if !unit.is_station() {
                return Err(SimError::UnknownEntity(station));
            }
            (motion.pos, motion.vel, unit.hue, unit.friendly)
        };

        let (friendly_ships, hostile_ships) = world_setup::ship_counts(&self.world);
        let (count, limit, kind) = if friendly {
            (friendly_ships, self.config.ship_limit, "friendly ship")
        } else {
            (hostile_ships, self.config.hostile_limit(), "hostile ship")
        };
        if count + SQUAD_SIZE > limit {
            return Err(SimError::LimitReached { kind, limit });
        }
        Ok(world_setup::spawn_squad(
            &mut self.world,
            &mut self.registry,
            &mut self.rng,
            station,
            pos,
            vel,
            hue,
            friendly,
        ))
    }

    fn planet_room(&self) -> bool {
        world_setup::planet_count(&self.world) < self.planet_limit
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    // --- Intents ---

    fn process_intents(&mut self) {
        while let Some(intent) = self.intents.pop_front() {
            self.handle_intent(intent);
        }
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Pause => {
                if self.phase == GamePhase::Active {
                    self.phase = GamePhase::Paused;
                    log::info!("simulation paused at tick {}", self.time.tick);
                }
            }
            Intent::Resume => {
                if self.phase == GamePhase::Paused {
                    self.phase = GamePhase::Active;
                    log::info!("simulation resumed");
                }
            }
            Intent::Zoom { delta } => {
                let next = self.zoom_index as i64 + delta as i64;
                self.zoom_index = next.clamp(0, ZOOM_LEVEL_COUNT as i64 - 1) as usize;
            }
            _ => self.steer_player(intent),
        }
    }

    fn steer_player(&mut self, intent: Intent) {
        let Some(entity) = self.player.and_then(|id| self.registry.get(id)) else {
            return;
        };
        let Ok((unit, control)) = self
            .world
            .query_one_mut::<(&mut Unit, &mut PlayerControl)>(entity)
        else {
            return;
        };
        match intent {
            Intent::ThrustOn => control.thrusting = true,
            Intent::ThrustOff => control.thrusting = false,
            Intent::BrakeOn => control.braking = true,
            Intent::BrakeOff => control.braking = false,
            Intent::Rotate { delta } if delta.is_finite() => control.pending_turn += delta,
            Intent::SetHeading { angle } if angle.is_finite() => unit.facing = wrap_angle(angle),
            Intent::Turn { direction } if direction.is_finite() => {
                control.turn_rate = direction.clamp(-1.0, 1.0);
            }
            Intent::Fire => control.fire_requested = true,
            other => log::debug!("ignored intent {other:?}"),
        }
    }

    // --- Tick ---

    /// Run all systems in order.
    fn run_systems(&mut self) {
        let bounds = self.config.world_bounds;

        // 1. Player flight and respawn
        systems::player::run(&mut self.world, bounds, &mut self.events);
        // 2. Body kinematics; planets back in the near plane get a station check
        let returning = systems::kinematics::run(&mut self.world, &mut self.grid, bounds);
        for host in returning {
            let friendly = Some(host) == self.home;
            self.spawns.push(Spawn::Station { host, friendly });
        }
        // 3. Body collisions
        systems::collision::run(
            &mut self.world,
            &self.grid,
            &mut self.rng,
            &mut self.planet_limit,
            bounds,
            &mut self.events,
            &mut self.spawns,
        );
        // 4. Ships scraping rocks
        let mut kills = systems::collision::ship_contacts(&mut self.world, &self.grid, &mut self.events);
        // 5. Stations
        let report = systems::stations::run(
            &mut self.world,
            &mut self.registry,
            &self.grid,
            &mut self.rng,
            &self.config,
        );
        kills.extend(report.kills);
        let mut triggers = report.triggers;
        // 6. Squad AI
        triggers.extend(systems::squad_ai::run(
            &mut self.world,
            &self.grid,
            &mut self.rng,
            bounds,
        ));
        // 7. Weapons
        systems::weapons::run(
            &mut self.world,
            &self.registry,
            &mut self.rng,
            &triggers,
            &mut self.events,
            &mut self.spawns,
        );
        // 8. Unit integration and timers
        systems::movement::run(&mut self.world, bounds);
        // 9. Projectiles
        kills.extend(systems::projectiles::run(
            &mut self.world,
            &self.registry,
            &self.grid,
            bounds,
            &mut self.events,
            &mut self.spawns,
        ));
        // 10. Shockwaves
        kills.extend(systems::shockwave::run(
            &mut self.world,
            &self.registry,
            &mut self.events,
            &mut self.spawns,
        ));
        // 11. Deaths, rewards, betrayal
        systems::casualties::settle(
            &mut self.world,
            &self.registry,
            &kills,
            &mut self.events,
            &mut self.spawns,
        );
        // 12. Numeric hygiene
        systems::sanitize::run(&mut self.world);
        // 13. Compaction
        systems::cleanup::run(&mut self.world, &mut self.registry, &mut self.despawn_buffer);
        // 14. Deferred spawns
        self.flush_spawns();
        // 15. End of the run
        self.check_end();
    }

    fn flush_spawns(&mut self) {
        let bounds = self.config.world_bounds;
        for spawn in std::mem::take(&mut self.spawns) {
            match spawn {
                Spawn::Asteroid(seed) => {
                    let promote = self.planet_room().then_some(bounds);
                    world_setup::spawn_asteroid(
                        &mut self.world,
                        &mut self.registry,
                        &mut self.rng,
                        seed,
                        promote,
                    );
                }
                Spawn::Debris { center, count, hot } => {
                    world_setup::spawn_debris(
                        &mut self.world,
                        &mut self.registry,
                        &mut self.rng,
                        center,
                        count,
                        hot,
                    );
                }
                Spawn::Projectile {
                    pos,
                    vel,
                    projectile,
                } => {
                    world_setup::spawn_projectile(&mut self.world, &mut self.registry, pos, vel, projectile);
                }
                Spawn::Shockwave(wave) => {
                    world_setup::spawn_shockwave(&mut self.world, &mut self.registry, wave);
                }
                Spawn::Station { host, friendly } => {
                    if self.has_station(host) {
                        continue;
                    }
                    if world_setup::spawn_station(
                        &mut self.world,
                        &mut self.registry,
                        &mut self.rng,
                        host,
                        friendly,
                    )
                    .is_none()
                    {
                        log::debug!("station request for {host} dropped: host gone");
                    }
                }
            }
        }
    }

    fn has_station(&self, host: EntityId) -> bool {
        self.world
            .query::<&Unit>()
            .iter()
            .any(|(_, unit)| match &unit.kind {
                UnitKind::Station(state) => !unit.destroyed && state.host == Some(host),
                UnitKind::Ship(_) => false,
            })
    }

    fn check_end(&mut self) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        let home_lost = self
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::HomePlanetLost));
        if home_lost {
            systems::casualties::end_run(&mut self.world, &mut self.events);
            self.phase = GamePhase::GameOver;
            log::info!("home planet lost at tick {}: game over", self.time.tick);
            return;
        }
        let out_of_lives = self
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::PlayerKilled { lives_left: 0, .. }));
        if out_of_lives {
            self.phase = GamePhase::GameOver;
            log::info!("player out of lives at tick {}: game over", self.time.tick);
        }
    }
}

