//! Simulation constants and tuning parameters.
//!
//! All rates are per tick unless stated otherwise. Distances are world units.

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 60;

/// Seconds per tick.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

// --- World ---

/// Default soft containment radius. Overridable through `SimConfig`.
pub const WORLD_BOUNDS: f64 = 20_000.0;

/// Gravitational constant used by every attraction rule.
pub const G_CONST: f64 = 0.9;

/// Per-tick velocity retention for the player ship.
pub const FRICTION: f64 = 0.99;

/// Far limit of the planet depth cycle.
pub const MAX_Z_DEPTH: f64 = 2.0;

/// Bodies below this depth are indexed and collide.
pub const NEAR_PLANE_Z: f64 = 0.5;

/// Planets below this depth attract asteroids.
pub const ACTIVE_PLANET_Z: f64 = 1.0;

/// Mass per unit of squared radius.
pub const MASS_PER_AREA: f64 = 0.05;

// --- Spatial index ---

/// Grid cell edge. Roughly the interaction range of the largest common body.
pub const GRID_CELL_SIZE: f64 = 2000.0;

// --- Asteroids ---

/// Largest ordinary asteroid. At or above this an asteroid is a giant.
pub const ASTEROID_MAX_SIZE: f64 = 450.0;

/// Smallest asteroid that survives fragmentation.
pub const ASTEROID_MIN_SIZE: f64 = 90.0;

/// Asteroid speed cap.
pub const ASTEROID_MAX_SPEED: f64 = 10.0;

/// Hot debris created by a planet catastrophe.
pub const PLANET_DEBRIS_COUNT: usize = 25;

/// Child offset from a fragmenting giant, as a share of its radius.
pub const FRAGMENT_OFFSET_FACTOR: f64 = 300.0 / 450.0;

/// Invulnerability ticks granted to fresh fragments.
pub const FRAGMENT_BLINK_TICKS: u32 = 30;

/// Invulnerability ticks granted to explosion debris.
pub const DEBRIS_BLINK_TICKS: u32 = 120;

/// Maximum scatter of explosion debris from the blast center.
pub const DEBRIS_SCATTER: f64 = 600.0;

/// Radius growth interpolation factor.
pub const RADIUS_SMOOTHING: f64 = 0.002;

/// Radius snaps to its target inside this window.
pub const RADIUS_SNAP_EPSILON: f64 = 0.5;

/// Bonus growth applied to every merge result.
pub const MERGE_GROWTH_BONUS: f64 = 1.05;

// --- Attraction tuning ---

/// Capture range of a planet, in planet radii.
pub const CAPTURE_RANGE_FACTOR: f64 = 10.0;

/// Orbit ring of a planet, in planet radii (plus the body radius).
pub const ORBIT_RING_FACTOR: f64 = 3.0;

/// Gravity amplification used for planet capture and orbital speed.
pub const ORBIT_GRAVITY_GAIN: f64 = 8.0;

/// Small bodies fall into stable orbit; larger ones only feel the pull.
pub const SMALL_BODY_FACTOR: f64 = 1.2;

/// Lower bound of the per-body stable ring multiple.
pub const STABLE_RING_MIN: f64 = 2.2;

/// Spread of the per-body stable ring multiple.
pub const STABLE_RING_SPREAD: f64 = 2.0;

/// Velocity blend toward the circular-orbit velocity.
pub const ORBIT_VELOCITY_BLEND: f64 = 0.1;

/// Radial spring toward the stable ring.
pub const ORBIT_RADIAL_SPRING: f64 = 0.005;

/// Pairwise attraction applies within this many combined radii.
pub const ATTRACTION_BAND_FACTOR: f64 = 3.0;

/// Planet-to-planet gravity amplification.
pub const PLANET_PAIR_GAIN: f64 = 15.0;

/// Asteroid-to-asteroid gravitational constant when a giant is involved.
pub const GIANT_PAIR_G: f64 = 5.0;

/// Asteroid-to-asteroid gravitational constant otherwise.
pub const ROCK_PAIR_G: f64 = 0.08;

/// Satellites at or below this share of `ASTEROID_MIN_SIZE` burn up near planets.
pub const SATELLITE_FACTOR: f64 = 1.5;

/// Atmosphere shell thickness where satellites burn up.
pub const ATMOSPHERE_SHELL: f64 = 30.0;

/// Planet growth weight for a swallowed asteroid's area.
pub const PLANET_ABSORB_WEIGHT: f64 = 1.5;

// --- Boundary ---

/// Asteroids beyond `bounds - tolerance` are nudged inward.
pub const BOUNDARY_TOLERANCE_ROIDS: f64 = 1000.0;

/// Planets beyond `bounds + tolerance` have their orbit centre pulled in.
pub const BOUNDARY_TOLERANCE_PLANETS: f64 = 2000.0;

/// Inward velocity correction applied to asteroids.
pub const BOUNDARY_CORRECTION: f64 = 0.05;

/// Orbit centre shift per tick for escaping planets.
pub const PLANET_CENTER_PULL: f64 = 1.5;

/// Inward velocity correction applied to ships.
pub const SHIP_BOUNDARY_CORRECTION: f64 = 0.1;

// --- Planets ---

/// Default planet capacity.
pub const PLANET_LIMIT: usize = 20;

/// Planet radius cap.
pub const PLANET_MAX_SIZE: f64 = 3000.0;

/// Capacity lost per planet catastrophe.
pub const PLANET_LIMIT_LOSS: usize = 2;

/// Planet hit points against squad-leader fire.
pub const PLANET_HP: u32 = 70;

/// Minimum semi-major axis of a planet orbit.
pub const PLANET_MIN_SEMI_MAJOR: f64 = 1000.0;

/// Orbit centres fall within this share of the world bounds.
pub const PLANET_CENTER_SPREAD: f64 = 0.3;

/// Angular speed numerator (`speed = base / a`).
pub const PLANET_BASE_ORBIT_SPEED: f64 = 0.5;

/// Depth at which a returning planet checks for its station.
pub const STATION_RESPAWN_Z: f64 = 0.2;

// --- Shockwaves ---

/// Ring growth per tick.
pub const SHOCKWAVE_GROWTH: f64 = 15.0;

/// Alpha decay per tick.
pub const SHOCKWAVE_DECAY: f64 = 0.01;

/// Band thickness that receives the impulse.
pub const SHOCKWAVE_BAND: f64 = 30.0;

/// Initial ring radius.
pub const SHOCKWAVE_START_RADIUS: f64 = 10.0;

/// Ring radius at which the impulse fades out.
pub const SHOCKWAVE_MAX_RADIUS: f64 = 1200.0;

/// Default impulse strength.
pub const SHOCKWAVE_STRENGTH: f64 = 30.0;

/// Impulse scale for bodies and units.
pub const SHOCKWAVE_IMPULSE: f64 = 0.1;

/// Impulse scale for the player ship.
pub const SHOCKWAVE_PLAYER_IMPULSE: f64 = 0.05;

/// God ring growth per tick.
pub const GOD_RING_GROWTH: f64 = 120.0;

/// God ring alpha decay per tick.
pub const GOD_RING_DECAY: f64 = 0.003;

/// God ring lethal band.
pub const GOD_RING_BAND: f64 = 600.0;

/// God ring hard radius limit.
pub const GOD_RING_MAX_RADIUS: f64 = 4000.0;

/// God ring initial radius.
pub const GOD_RING_START_RADIUS: f64 = 100.0;

// --- Ships ---

/// Ship hull radius.
pub const SHIP_RADIUS: f64 = 25.0;

/// Ship speed cap.
pub const SHIP_MAX_SPEED: f64 = 90.0;

/// Ship hull points.
pub const SHIP_HP: u32 = 2;

/// Friendly ship cap. Hostiles may reach three times this.
pub const SHIP_LIMIT: usize = 70;

/// Hostile cap multiplier.
pub const HOSTILE_LIMIT_FACTOR: usize = 3;

/// Ships spawned per squad.
pub const SQUAD_SIZE: usize = 7;

/// Slots per leader.
pub const SQUAD_SLOT_COUNT: usize = 6;

/// Leader-relative slot offsets (lateral, forward). Negative forward is behind.
pub const SQUAD_SLOT_OFFSETS: [(f64, f64); SQUAD_SLOT_COUNT] = [
    (-150.0, -150.0),
    (150.0, -150.0),
    (-300.0, -300.0),
    (300.0, -300.0),
    (-450.0, -450.0),
    (450.0, -450.0),
];

/// Hue shared by the player faction.
pub const FRIENDLY_HUE: u16 = 210;

/// Hue taken by former allies after the player's betrayal.
pub const TURNCOAT_HUE: u16 = 0;

/// Distance at which a hostile notices the player.
pub const SIGHT_RANGE: f64 = 2000.0;

/// Hostiles drop combat when the player is farther than this.
pub const COMBAT_DISENGAGE_RANGE: f64 = 3000.0;

/// Preferred stand-off distance while strafing.
pub const COMBAT_ORBIT_DISTANCE: f64 = 340.0;

/// Minimum spacing between squadmates.
pub const SEPARATION_DISTANCE: f64 = 30.0;

/// Score per tier step.
pub const EVOLUTION_SCORE_STEP: i64 = 1000;

/// Tier at which the tier step starts growing.
pub const TIER_STEP_GROWTH_FROM: u32 = 7;

/// Tier at which projectiles ignore planet gravity.
pub const TIER_GRAVITY_IMMUNE: u32 = 8;

/// Tier at which the player fires the god ring.
pub const GOD_TIER: u32 = 12;

/// Primary bullet lifetime.
pub const BULLET_PRIMARY_LIFETIME: u32 = 60;

/// Secondary bullet lifetime.
pub const BULLET_SECONDARY_LIFETIME: u32 = 20;

/// Planet gravity amplification on projectiles.
pub const BULLET_GRAVITY_FACTOR: f64 = 10.0;

/// Respawn delay after a station squad spawn, before jitter.
pub const SHIP_SPAWN_TIME: u32 = 1000;

/// Invulnerability ticks of freshly launched ships.
pub const SHIP_SPAWN_BLINK: u32 = 30;

// --- Stations ---

/// Station radius.
pub const STATION_RADIUS: f64 = 70.0;

/// Station structure points.
pub const STATION_HP: u32 = 6;

/// Extra orbit clearance above the host surface, in host radii.
pub const STATION_ORBIT_FACTOR: f64 = 0.3;

/// Ticks before a new station launches its first squad.
pub const STATION_FIRST_SPAWN: u32 = 180;

/// Invulnerability ticks of a new station.
pub const STATION_BLINK_TICKS: u32 = 60;

/// Angular speed of a station around its host.
pub const STATION_ORBIT_SPEED: f64 = 0.002;

/// Station asteroid-defence range.
pub const STATION_DEFENSE_RANGE: f64 = 1500.0;

/// Reload between station shots.
pub const STATION_RELOAD: f64 = 120.0;

/// Station gun.
pub const STATION_BULLET_SPEED: f64 = 20.0;
pub const STATION_BULLET_SIZE: f64 = 6.0;
pub const STATION_BULLET_LIFE: u32 = 50;

/// Spring toward the orbit point around the host.
pub const STATION_ORBIT_SPRING: f64 = 0.1;

/// Velocity retention while holding orbit.
pub const STATION_ORBIT_DAMPING: f64 = 0.8;

/// Asteroids closer than both radii plus this are pushed off a station.
pub const STATION_REPEL_MARGIN: f64 = 100.0;

/// Push per unit of overlap on a rock inside a station's space.
pub const STATION_REPEL_GAIN: f64 = 0.05;

/// Spawn distance of a new squad, in station radii.
pub const SQUAD_SPAWN_FACTOR: f64 = 2.0;

// --- Player ---

/// Forward thrust per tick.
pub const PLAYER_THRUST: f64 = 0.9;

/// Turn rate per tick of held rotation.
pub const PLAYER_TURN_RATE: f64 = 0.1;

/// Velocity retention while braking.
pub const PLAYER_BRAKE: f64 = 0.92;

/// Starting lives.
pub const PLAYER_LIVES: u32 = 3;

/// Reload ticks between player shots.
pub const PLAYER_RELOAD: u32 = 8;

/// Invulnerability ticks after a hit.
pub const PLAYER_HIT_BLINK: u32 = 15;

/// Ticks before a dead player respawns.
pub const PLAYER_RESPAWN_TICKS: u32 = 180;

/// Player orbit ring, in planet radii.
pub const PLAYER_ORBIT_RING_FACTOR: f64 = 1.8;

/// Player capture range, in planet radii.
pub const PLAYER_CAPTURE_FACTOR: f64 = 8.0;

/// Velocity blend toward the orbital target for an idle player.
pub const PLAYER_ORBIT_BLEND: f64 = 0.05;

/// Cap on the player's radial orbit correction.
pub const PLAYER_ORBIT_MAX_CORRECTION: f64 = 0.15;

/// Invulnerability ticks after spawning or respawning.
pub const PLAYER_SPAWN_BLINK: u32 = 30;

/// Planets pull the player inside this many planet radii.
pub const PLAYER_GRAVITY_RANGE: f64 = 4.0;

/// Share of planet gravity felt by the player.
pub const PLAYER_GRAVITY_SCALE: f64 = 0.8;

/// Share of the world bounds where the magnetic boundary starts.
pub const PLAYER_BOUNDARY_ZONE: f64 = 0.95;

/// Strongest inward push of the magnetic boundary.
pub const PLAYER_BOUNDARY_PUSH: f64 = 2.0;

/// Velocity bled per tick at full boundary severity.
pub const PLAYER_BOUNDARY_DAMPING: f64 = 0.1;

/// Hard limit, as a share of the world bounds.
pub const PLAYER_BOUNDARY_HARD: f64 = 1.05;

/// Velocity multiplier applied when the player is hit.
pub const PLAYER_HIT_RECOIL: f64 = -0.5;

/// Score lost with each life.
pub const PLAYER_DEATH_PENALTY: i64 = 1000;

/// Player gun.
pub const PLAYER_BULLET_SPEED: f64 = 25.0;
pub const PLAYER_BULLET_SIZE: f64 = 6.0;
pub const PLAYER_BULLET_LIFE: u32 = 50;

// --- Scoring ---

pub const SCORE_ASTEROID: i64 = 100;
pub const SCORE_PLANET: i64 = 1000;
pub const SCORE_SHIP: i64 = 200;
pub const SCORE_STATION: i64 = 500;

// --- Radar zoom ---

/// Number of radar zoom levels.
pub const ZOOM_LEVEL_COUNT: usize = 12;

/// Zoom level selected at start.
pub const ZOOM_DEFAULT_INDEX: usize = 2;

// --- Squad AI: formation ---

/// Blend toward the leader's velocity.
pub const FORMATION_VELOCITY_BLEND: f64 = 0.25;

/// Spring toward the assigned slot.
pub const FORMATION_SPRING: f64 = 0.25;

/// Inside this distance the spring is scaled down linearly.
pub const FORMATION_ARRIVE_RADIUS: f64 = 200.0;

/// Beyond this distance the spring is boosted.
pub const FORMATION_FAR_RADIUS: f64 = 500.0;

/// Spring boost for stragglers.
pub const FORMATION_FAR_BOOST: f64 = 1.5;

/// Velocity retention while seeking a slot.
pub const FORMATION_DAMPING: f64 = 0.90;

/// Velocity retention once seated.
pub const FORMATION_SEATED_DAMPING: f64 = 0.95;

/// A wingman closer than this to its slot counts as seated.
pub const IN_SLOT_RADIUS: f64 = 50.0;

/// Separation push between squadmates.
pub const FORMATION_SEPARATION_GAIN: f64 = 0.08;

/// Facing gain while seeking.
pub const FORMATION_TURN_GAIN: f64 = 0.1;

/// Facing gain while seated, copying the leader.
pub const FORMATION_IMITATE_GAIN: f64 = 0.4;

/// Seated facing snaps to the leader's inside this error.
pub const FORMATION_IMITATE_SNAP: f64 = 0.05;

/// Extra clearance kept from the leader's hull.
pub const LEADER_CLEARANCE: f64 = 10.0;

/// Push away from a leader that is too close.
pub const LEADER_PUSH: f64 = 1.5;

// --- Squad AI: threat scan ---

/// Asteroids inside this range are checked for a collision course.
pub const DANGER_SCAN_RANGE: f64 = 400.0;

/// Prediction horizon for time of closest approach.
pub const DANGER_HORIZON_TICKS: f64 = 60.0;

/// Extra clearance added to the combined radii.
pub const DANGER_CLEARANCE: f64 = 50.0;

/// A persistent threat closer than this may break the formation.
pub const DANGER_ABANDON_RANGE: f64 = 200.0;

/// Ticks a wingman tolerates the same threat before abandoning.
pub const DANGER_PATIENCE_TICKS: u32 = 30;

/// Threats inside this range are faced and shot at.
pub const DANGER_ENGAGE_RANGE: f64 = 600.0;

/// Facing gain toward a threat.
pub const DANGER_TURN_GAIN: f64 = 0.3;

/// Sideways impulse when abandoning.
pub const EVADE_IMPULSE: f64 = 3.0;

/// Per-tick sidestep off a predicted collision path.
pub const DANGER_SIDESTEP: f64 = 0.5;

/// Facing error under which a threatened wingman shoots the threat.
pub const DANGER_FIRE_CONE: f64 = 0.3;

// --- Squad AI: leadership ---

/// A friendly stray joins the player inside this range.
pub const JOIN_PLAYER_RANGE: f64 = 1500.0;

/// A hostile stray joins or recruits inside this range.
pub const JOIN_LEADER_RANGE: f64 = 300.0;

/// Orbit radius when no anchor exists.
pub const PATROL_DEFAULT_RADIUS: f64 = 300.0;

/// Tolerated radial error around the patrol ring.
pub const PATROL_BAND: f64 = 100.0;

/// Radial correction outside the patrol band.
pub const PATROL_RADIAL_GAIN: f64 = 0.5;

/// Tangential push along the patrol ring.
pub const PATROL_TANGENT_GAIN: f64 = 0.3;

/// Velocity retention while patrolling.
pub const PATROL_DAMPING: f64 = 0.95;

/// Patrol ring around a home planet, in planet radii.
pub const HOME_ORBIT_FACTOR: f64 = 1.8;

/// Leaders engage asteroids this close to their station.
pub const LEADER_DEFENSE_RANGE: f64 = 2500.0;

/// A patrol waypoint counts as reached inside this distance.
pub const LEADER_WAYPOINT_RADIUS: f64 = 500.0;

/// Leader facing gain.
pub const LEADER_TURN_GAIN: f64 = 0.05;

/// Leader thrust.
pub const LEADER_THRUST: f64 = 0.5;

/// Leader cruise speed.
pub const LEADER_CRUISE_SPEED: f64 = 12.0;

// --- Squad AI: combat ---

/// Rival ships are considered inside this range.
pub const RIVAL_RANGE: f64 = 2000.0;

/// Facing gain toward the combat target.
pub const COMBAT_TURN_GAIN: f64 = 0.04;

/// Radial spring toward the stand-off distance.
pub const COMBAT_RADIAL_GAIN: f64 = 0.002;

/// Tangential strafe.
pub const COMBAT_TANGENT_GAIN: f64 = 0.08;

/// Push away from crowded squadmates.
pub const COMBAT_SEPARATION_GAIN: f64 = 0.01;

/// Velocity retention while strafing.
pub const COMBAT_DRAG: f64 = 0.96;

/// Facing error under which a strafing unit fires.
pub const COMBAT_FIRE_CONE: f64 = 0.4;

/// Opportunistic asteroid fire range.
pub const OPPORTUNISTIC_RANGE: f64 = 1000.0;

/// Opportunistic asteroid fire cone.
pub const OPPORTUNISTIC_CONE: f64 = 0.5;

// --- Weapons ---

/// Facing error above which a shot is never taken.
pub const FIRE_CONE: f64 = std::f64::consts::PI / 6.0;

/// Allies within this angle of the firing line block the shot.
pub const ALLY_BLOCK_CONE: f64 = 0.25;

/// Narrower blocking cone a friendly shooter keeps around the player.
pub const PLAYER_BLOCK_CONE: f64 = 0.2;

/// Reload after a scanner shot: minimum and random spread.
pub const SCAN_RELOAD: (f64, f64) = (30.0, 20.0);

/// Reload after a strafing shot.
pub const COMBAT_RELOAD: (f64, f64) = (30.0, 50.0);

/// Reload after shooting at a threat.
pub const DANGER_RELOAD: (f64, f64) = (20.0, 30.0);

/// Scanner range for rival units and the player.
pub const SCAN_UNIT_RANGE: f64 = 2000.0;

/// Scanner range for loose asteroids.
pub const SCAN_ASTEROID_RANGE: f64 = 1500.0;

/// Asteroids this many station radii from home are shot first.
pub const STATION_DANGER_FACTOR: f64 = 8.0;

/// Bullet speed gain per tier.
pub const TIER_SPEED_SCALE: f64 = 0.1;

/// Bullet size gain per tier.
pub const TIER_SIZE_SCALE: f64 = 0.18;

/// Muzzle clearance beyond the hull.
pub const MUZZLE_CLEARANCE: f64 = 20.0;

/// Hull growth per tier, which pushes the muzzle out.
pub const TIER_HULL_SCALE: f64 = 0.1;

/// Highest tier with a bullet pattern.
pub const MAX_PATTERN_TIER: u32 = 11;

/// Reload multiplier after a god ring.
pub const GOD_RING_RELOAD_FACTOR: u32 = 5;

/// Player speed cap multiplier at god tier.
pub const GOD_SPEED_FACTOR: f64 = 2.0;

// --- Projectiles ---

/// Planets bend shots inside this many planet radii.
pub const BULLET_GRAVITY_RANGE: f64 = 8.0;

/// Shots die beyond this share of the world bounds.
pub const BULLET_RANGE_FACTOR: f64 = 1.5;

/// Invulnerability ticks of a planet after a damaging hit.
pub const PLANET_HIT_BLINK: u32 = 10;

/// Live wingmen a leader needs before its shots damage planets.
pub const PLANET_SIEGE_SQUAD: usize = 2;

/// Planet growth from a swallowed shot, in bullet sizes.
pub const BULLET_ABSORB_FACTOR: f64 = 2.0;

/// Distance at which a destroyed station leaves its junk rock.
pub const JUNK_OFFSET: f64 = 300.0;

// --- Ship contacts ---

/// Kick away from an asteroid after a ship touches it.
pub const SHIP_ROCK_KICK: f64 = 2.0;

/// Invulnerability ticks after an AI ship is hit.
pub const SHIP_HIT_BLINK: u32 = 15;

/// Patrol ring around a home station, in station radii.
pub const STATION_PATROL_FACTOR: f64 = 4.0;
