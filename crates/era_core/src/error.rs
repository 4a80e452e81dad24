//! Error types for the simulation.

use thiserror::Error;

use crate::map::GridPos;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for rejected actions and invalid references.
///
/// Every failing action leaves the simulation state unchanged; errors
/// are reports, never partial mutations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Coordinate outside the map.
    #[error("Position {0} is outside the map")]
    OutOfBounds(GridPos),

    /// Building footprint overlaps an occupied or impassable tile.
    #[error("Footprint at {0} is blocked")]
    FootprintBlocked(GridPos),

    /// Unknown unit reference.
    #[error("Unit not found: {0}")]
    UnitNotFound(u64),

    /// Unknown player reference.
    #[error("Player not found: {0}")]
    PlayerNotFound(u8),

    /// No building at the given origin tile.
    #[error("No building at {0}")]
    BuildingNotFound(GridPos),

    /// Not enough of a resource to pay a cost.
    #[error("Insufficient {resource}: need {required}, have {available}")]
    InsufficientResources {
        /// Resource name.
        resource: &'static str,
        /// Amount required.
        required: i64,
        /// Amount available.
        available: i64,
    },

    /// Age requirement not met for a building or unit.
    #[error("Requires {required} age (currently {current})")]
    AgeRequirementNotMet {
        /// Age required by the blueprint.
        required: &'static str,
        /// Player's current age.
        current: &'static str,
    },

    /// Already at the final age.
    #[error("Already at the final age")]
    FinalAgeReached,

    /// Population cap would be exceeded.
    #[error("Population cap reached ({cap})")]
    PopulationCapReached {
        /// Current population cap.
        cap: u32,
    },

    /// Building cannot train the requested unit kind.
    #[error("Building cannot train {0}")]
    CannotTrain(&'static str),

    /// Order that the unit or target cannot satisfy.
    #[error("Invalid order: {0}")]
    InvalidOrder(&'static str),

    /// Serialization failure for snapshots.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
