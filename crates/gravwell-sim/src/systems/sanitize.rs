//! Numeric hygiene. Runs after all physics so a NaN produced anywhere this
//! tick never reaches the next one: bad velocities are zeroed, entities with
//! a bad position or radius are retired. The player is recentred instead.

use glam::DVec2;
use hecs::World;

use gravwell_core::components::{Body, Motion, PlayerControl, Projectile, Shockwave, Unit};
use gravwell_core::types::is_finite;

/// Counts of repairs made in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub velocities_zeroed: usize,
    pub retired: usize,
    pub player_reset: bool,
}

pub fn run(world: &mut World) -> SanitizeReport {
    let mut report = SanitizeReport::default();

    for (_entity, motion) in world.query_mut::<&mut Motion>() {
        if !is_finite(motion.vel) {
            motion.vel = DVec2::ZERO;
            report.velocities_zeroed += 1;
        }
    }

    for (_entity, (motion, body)) in world.query_mut::<(&Motion, &mut Body)>() {
        if body.destroyed {
            continue;
        }
        let bad_radius = !(body.r.is_finite() && body.r > 0.0 && body.target_r.is_finite());
        if bad_radius || !is_finite(motion.pos) || !body.mass.is_finite() {
            body.destroyed = true;
            report.retired += 1;
        }
    }

    for (_entity, (motion, unit, player)) in
        world.query_mut::<(&mut Motion, &mut Unit, Option<&PlayerControl>)>()
    {
        if is_finite(motion.pos) && unit.facing.is_finite() && unit.reload.is_finite() {
            continue;
        }
        if player.is_some() {
            motion.pos = DVec2::ZERO;
            motion.vel = DVec2::ZERO;
            unit.facing = if unit.facing.is_finite() { unit.facing } else { 0.0 };
            unit.reload = if unit.reload.is_finite() { unit.reload } else { 0.0 };
            report.player_reset = true;
        } else if !unit.destroyed {
            unit.destroyed = true;
            report.retired += 1;
        }
    }

    for (_entity, (motion, shot)) in world.query_mut::<(&Motion, &mut Projectile)>() {
        if !shot.spent && !(is_finite(motion.pos) && shot.size.is_finite()) {
            shot.spent = true;
            report.retired += 1;
        }
    }

    for (_entity, wave) in world.query_mut::<&mut Shockwave>() {
        if !(is_finite(wave.center) && wave.r.is_finite() && wave.alpha.is_finite()) {
            wave.alpha = 0.0;
            wave.r = wave.max_r;
            report.retired += 1;
        }
    }

    if report != SanitizeReport::default() {
        log::warn!(
            "non-finite state repaired: {} velocities zeroed, {} entities retired, player reset: {}",
            report.velocities_zeroed,
            report.retired,
            report.player_reset
        );
    }
    report
}
