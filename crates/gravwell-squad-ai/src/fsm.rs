//! Formation/Combat state machine for AI ships.
//!
//! Pure functions: the sim gathers a `UnitContext` per ship, `evaluate`
//! returns the new state, steering, and an optional fire order. Squad
//! joining and slot bookkeeping mutate other units, so they stay in the sim.

use glam::DVec2;

use gravwell_core::constants::*;
use gravwell_core::enums::{AiState, SquadRole};
use gravwell_core::types::EntityId;

use crate::steering::{self, Danger, LeaderPose, Obstacle, Pose, Steering};
use crate::targeting::{self, Contact};

/// Patrol centre and ring radius for units without a leader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub center: DVec2,
    pub ring: f64,
}

/// Everything one ship knows this tick.
pub struct UnitContext<'a> {
    pub me: Contact,
    pub facing: f64,
    pub state: AiState,
    pub role: SquadRole,
    pub reload_ready: bool,
    pub orbit_dir: f64,
    /// Live leader, if this ship is seated in a squad.
    pub leader: Option<LeaderPose>,
    pub formation_offset: DVec2,
    /// Threat remembered from the previous tick.
    pub danger: Option<EntityId>,
    pub danger_ticks: u32,
    /// The player ship, only while alive.
    pub player: Option<Contact>,
    /// Nearby combat units, the player included.
    pub contacts: &'a [Contact],
    /// Nearby near-plane asteroids.
    pub obstacles: &'a [Obstacle],
    /// Near-plane planets other than the home world.
    pub enemy_planets: &'a [DVec2],
    /// Positions of squadmates (leader excluded).
    pub mates: &'a [DVec2],
    pub anchor: Option<Anchor>,
    /// Home station position, if it still exists.
    pub home_station: Option<DVec2>,
    /// Asteroid closest to the home station inside the defence range.
    pub station_threat: Option<DVec2>,
    pub patrol_target: Option<DVec2>,
}

/// A shot the sim should take, subject to the friendly-fire guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireOrder {
    pub at: DVec2,
    /// Reload drawn as `min + rand * spread` after discharge.
    pub reload: (f64, f64),
}

/// Output of the FSM for one ship.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitUpdate {
    pub state: AiState,
    pub vel: DVec2,
    pub facing: f64,
    pub fire: Option<FireOrder>,
    /// The ship broke formation and must leave its slot.
    pub abandon: bool,
    pub danger: Option<EntityId>,
    pub danger_ticks: u32,
    /// Leader needs a fresh patrol waypoint.
    pub needs_waypoint: bool,
    pub state_changed: bool,
}

impl UnitContext<'_> {
    fn pose(&self) -> Pose {
        Pose {
            pos: self.me.pos,
            vel: self.me.vel,
            facing: self.facing,
            radius: self.me.radius,
        }
    }

    fn player_distance(&self) -> Option<f64> {
        self.player.map(|p| self.me.pos.distance(p.pos))
    }
}

/// State transition for this tick.
pub fn next_state(ctx: &UnitContext) -> AiState {
    if !ctx.me.friendly && ctx.player_distance().is_some_and(|d| d < SIGHT_RANGE) {
        return AiState::Combat;
    }
    match ctx.state {
        AiState::Combat => {
            if targeting::select_combat_target(&ctx.me, ctx.player.as_ref(), ctx.contacts).is_some() {
                AiState::Combat
            } else {
                AiState::Formation
            }
        }
        AiState::Formation => {
            // Seated wingmen hold formation and only shoot opportunistically.
            let free_agent = ctx.role != SquadRole::Wingman || ctx.leader.is_none();
            if free_agent && targeting::nearest_rival_ship(&ctx.me, ctx.contacts).is_some() {
                AiState::Combat
            } else {
                AiState::Formation
            }
        }
    }
}

/// Run the state machine for one ship.
pub fn evaluate(ctx: &UnitContext) -> UnitUpdate {
    let state = next_state(ctx);
    let mut update = match state {
        AiState::Combat => evaluate_combat(ctx),
        AiState::Formation => match (ctx.role, ctx.leader) {
            (SquadRole::Wingman, Some(leader)) => evaluate_wingman(ctx, &leader),
            (SquadRole::Leader, _) => evaluate_leader(ctx),
            _ => evaluate_independent(ctx),
        },
    };
    update.state = state;
    update.state_changed = state != ctx.state;

    if update.fire.is_none() && ctx.reload_ready && !update.abandon {
        update.fire = proactive_fire(ctx, update.facing);
    }
    update
}

fn hold(ctx: &UnitContext, steer: Steering) -> UnitUpdate {
    UnitUpdate {
        state: ctx.state,
        vel: steer.vel,
        facing: steer.facing,
        fire: None,
        abandon: false,
        danger: None,
        danger_ticks: 0,
        needs_waypoint: false,
        state_changed: false,
    }
}

fn evaluate_combat(ctx: &UnitContext) -> UnitUpdate {
    let pose = ctx.pose();
    let Some(target) = targeting::select_combat_target(&ctx.me, ctx.player.as_ref(), ctx.contacts)
    else {
        return evaluate_independent(ctx);
    };

    let crowd: Vec<DVec2> = ctx
        .contacts
        .iter()
        .filter(|c| c.id != ctx.me.id && !c.is_player && targeting::are_allies(&ctx.me, c))
        .map(|c| c.pos)
        .collect();
    let (steer, err) = steering::strafe(&pose, target.contact.pos, ctx.orbit_dir, &crowd);

    let mut update = hold(ctx, steer);
    if ctx.reload_ready {
        if err.abs() < COMBAT_FIRE_CONE {
            update.fire = Some(FireOrder {
                at: target.contact.pos,
                reload: COMBAT_RELOAD,
            });
        } else if let Some(rock) = opportunistic_rock(ctx, &pose) {
            update.fire = Some(FireOrder {
                at: rock,
                reload: SCAN_RELOAD,
            });
        }
    }
    update
}

/// Nearest asteroid inside the opportunistic cone.
fn opportunistic_rock(ctx: &UnitContext, pose: &Pose) -> Option<DVec2> {
    ctx.obstacles
        .iter()
        .map(|o| (o.pos, pose.pos.distance(o.pos)))
        .filter(|&(pos, d)| {
            d < OPPORTUNISTIC_RANGE
                && targeting::aim_error(pose.pos, pose.facing, pos).abs() < OPPORTUNISTIC_CONE
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(pos, _)| pos)
}

fn evaluate_wingman(ctx: &UnitContext, leader: &LeaderPose) -> UnitUpdate {
    let pose = ctx.pose();
    let Some(danger) = steering::scan_danger(&pose, ctx.obstacles) else {
        let (steer, _) = steering::seek_slot(&pose, leader, ctx.formation_offset, ctx.mates);
        return hold(ctx, steer);
    };
    threatened(ctx, &pose, leader.vel, &danger)
}

/// Shared avoidance path for anything flying in formation or leading one.
fn threatened(ctx: &UnitContext, pose: &Pose, pace: DVec2, danger: &Danger) -> UnitUpdate {
    let ticks = if ctx.danger == Some(danger.id) {
        ctx.danger_ticks + 1
    } else {
        1
    };

    if ctx.leader.is_some() && ticks > DANGER_PATIENCE_TICKS && danger.distance < DANGER_ABANDON_RANGE
    {
        let mut update = hold(ctx, steering::evade(pose, danger));
        update.abandon = true;
        return update;
    }

    let mut update = hold(ctx, steering::avoid(pose, pace, danger));
    update.danger = Some(danger.id);
    update.danger_ticks = ticks;
    if ctx.reload_ready
        && danger.distance < DANGER_ENGAGE_RANGE
        && targeting::aim_error(pose.pos, update.facing, danger.pos).abs() < DANGER_FIRE_CONE
    {
        update.fire = Some(FireOrder {
            at: danger.pos,
            reload: DANGER_RELOAD,
        });
    }
    update
}

fn evaluate_leader(ctx: &UnitContext) -> UnitUpdate {
    let pose = ctx.pose();
    if let Some(danger) = steering::scan_danger(&pose, ctx.obstacles) {
        return threatened(ctx, &pose, pose.vel, &danger);
    }

    if let Some(threat) = ctx.station_threat {
        return hold(ctx, steering::cruise(&pose, threat));
    }

    let goal = ctx.patrol_target.unwrap_or(pose.pos);
    let mut update = hold(ctx, steering::cruise(&pose, goal));
    update.needs_waypoint = pose.pos.distance(goal) < LEADER_WAYPOINT_RADIUS;
    update
}

fn evaluate_independent(ctx: &UnitContext) -> UnitUpdate {
    let pose = ctx.pose();
    let anchor = ctx.anchor.unwrap_or(Anchor {
        center: pose.pos,
        ring: PATROL_DEFAULT_RADIUS,
    });
    hold(
        ctx,
        steering::patrol_orbit(&pose, anchor.center, anchor.ring, ctx.orbit_dir),
    )
}

/// Scanner run by every ship with a loaded gun, in priority order: rival
/// units, enemy planets (friendlies only), asteroids menacing the home
/// station, loose asteroids, then the player for hostiles. Only targets
/// already inside the fire cone qualify.
pub fn proactive_fire(ctx: &UnitContext, facing: f64) -> Option<FireOrder> {
    let pos = ctx.me.pos;
    let in_cone = |target: DVec2| targeting::aim_error(pos, facing, target).abs() < FIRE_CONE;
    let order = |at: DVec2| FireOrder {
        at,
        reload: SCAN_RELOAD,
    };

    let rival = ctx
        .contacts
        .iter()
        .filter(|c| !c.is_player && targeting::is_rival(&ctx.me, c))
        .filter(|c| pos.distance(c.pos) < SCAN_UNIT_RANGE && in_cone(c.pos))
        .min_by(|a, b| pos.distance(a.pos).total_cmp(&pos.distance(b.pos)));
    if let Some(rival) = rival {
        return Some(order(rival.pos));
    }

    if ctx.me.friendly {
        let planet = ctx
            .enemy_planets
            .iter()
            .filter(|&&p| pos.distance(p) < SCAN_UNIT_RANGE && in_cone(p))
            .min_by(|a, b| pos.distance(**a).total_cmp(&pos.distance(**b)));
        if let Some(&planet) = planet {
            return Some(order(planet));
        }
    }

    if let Some(home) = ctx.home_station {
        let menace = ctx
            .obstacles
            .iter()
            .filter(|o| {
                home.distance(o.pos) < STATION_RADIUS * STATION_DANGER_FACTOR
                    && pos.distance(o.pos) < SCAN_UNIT_RANGE
                    && in_cone(o.pos)
            })
            .min_by(|a, b| home.distance(a.pos).total_cmp(&home.distance(b.pos)));
        if let Some(rock) = menace {
            return Some(order(rock.pos));
        }
    }

    let rock = ctx
        .obstacles
        .iter()
        .filter(|o| pos.distance(o.pos) < SCAN_ASTEROID_RANGE && in_cone(o.pos))
        .min_by(|a, b| pos.distance(a.pos).total_cmp(&pos.distance(b.pos)));
    if let Some(rock) = rock {
        return Some(order(rock.pos));
    }

    match ctx.player {
        Some(player)
            if !ctx.me.friendly
                && pos.distance(player.pos) < SCAN_UNIT_RANGE
                && in_cone(player.pos) =>
        {
            Some(order(player.pos))
        }
        _ => None,
    }
}
