//! Squad AI for GRAVWELL.
//!
//! Implements the per-unit Formation/Combat state machine, squad slot
//! bookkeeping, steering behaviors, and the friendly-fire guard.
//! No ECS dependency: the sim gathers context, these functions decide.

pub mod fsm;
pub mod squad;
pub mod steering;
pub mod targeting;

pub use gravwell_core as core;
