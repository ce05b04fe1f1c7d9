//! Fundamental geometric and simulation types.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Stable identifier handed out by the engine registry. Never reused within a run.
pub type EntityId = u32;

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl SimTime {
    /// Advance by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
        self.elapsed_secs = self.tick as f64 * crate::constants::DT;
    }
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + std::f64::consts::PI).rem_euclid(std::f64::consts::TAU)
        - std::f64::consts::PI;
    if wrapped == -std::f64::consts::PI {
        std::f64::consts::PI
    } else {
        wrapped
    }
}

/// Heading of a vector in radians (0 = +x, counter-clockwise).
pub fn heading_of(v: DVec2) -> f64 {
    v.y.atan2(v.x)
}

/// Unit vector for a heading.
pub fn unit(angle: f64) -> DVec2 {
    DVec2::new(angle.cos(), angle.sin())
}

/// Signed shortest turn from `from` to `to`.
pub fn angle_between(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

/// True when both components are finite.
pub fn is_finite(v: DVec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}
