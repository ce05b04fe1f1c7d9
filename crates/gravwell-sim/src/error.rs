//! Error types for the public engine API.
//!
//! Systems never fail; only factory and lookup calls made from outside the
//! tick report errors.

use gravwell_core::types::EntityId;

/// Errors returned by `SimulationEngine` spawn and lookup APIs.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// The id was never issued or the entity has been removed.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// A population cap blocked the spawn.
    #[error("{kind} limit reached ({limit})")]
    LimitReached { kind: &'static str, limit: usize },

    /// The entity exists but is not a planet.
    #[error("entity {0} is not a planet")]
    NotAPlanet(EntityId),
}
