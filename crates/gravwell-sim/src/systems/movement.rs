//! Unit integration and timers.
//!
//! AI ships move by their velocity. Stations and the player integrate in
//! their own passes. Reload and blink count down for everyone.

use hecs::World;

use gravwell_core::components::{Motion, PlayerControl, Unit};
use gravwell_core::constants::SHIP_BOUNDARY_CORRECTION;

pub fn run(world: &mut World, bounds: f64) {
    for (_entity, (motion, unit, player)) in
        world.query_mut::<(&mut Motion, &mut Unit, Option<&PlayerControl>)>()
    {
        if unit.reload > 0.0 {
            unit.reload -= 1.0;
        }
        if unit.blink > 0 {
            unit.blink -= 1;
        }
        if player.is_some() || unit.is_station() || unit.destroyed {
            continue;
        }
        motion.pos += motion.vel;
        let dist = motion.pos.length();
        if dist > bounds {
            motion.vel -= motion.pos / dist * SHIP_BOUNDARY_CORRECTION;
        }
    }
}
