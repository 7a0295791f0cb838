//! Error types for the garden simulation.

use thiserror::Error;

use crate::ids::{PlantId, PlantTypeId};

/// Errors raised by the grid store, the growth engine and the action handlers.
#[derive(Debug, Error)]
pub enum GardenError {
    /// Row or column outside the 5x5 grid. Indicates a caller bug.
    #[error("Cell ({row}, {col}) is outside the garden grid")]
    OutOfBounds {
        /// Requested row
        row: usize,
        /// Requested column
        col: usize,
    },

    /// The target cell is in the wrong state for the requested action.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Not enough points to pay for a seed.
    #[error("Insufficient funds: need {needed}, have {have}")]
    InsufficientFunds {
        /// Price of the seed
        needed: u64,
        /// Current balance
        have: u64,
    },

    /// Remove was requested on a cell without a plant.
    #[error("Nothing to remove at ({row}, {col})")]
    NothingToRemove {
        /// Row of the cell
        row: usize,
        /// Column of the cell
        col: usize,
    },

    /// Harvest was requested on a cell without fruit.
    #[error("No fruit available at ({row}, {col})")]
    NoFruitAvailable {
        /// Row of the cell
        row: usize,
        /// Column of the cell
        col: usize,
    },

    /// The plant type is not present in the loaded catalog.
    #[error("Unknown plant type: {0}")]
    UnknownPlantType(PlantTypeId),

    /// A cell patch would leave the cell in an inconsistent state.
    #[error("Inconsistent cell update: {0}")]
    InconsistentCell(String),

    /// A plant id is already used by another cell.
    #[error("Plant {0} already occupies another cell")]
    DuplicatePlantId(PlantId),

    /// A garden snapshot from the backend failed validation.
    #[error("Invalid garden snapshot: {0}")]
    InvalidSnapshot(String),

    /// The remote adapter call failed.
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(#[from] RemoteError),

    /// A remote response arrived for a plant that no longer occupies the cell.
    #[error("Stale response for plant {0}")]
    StaleResponse(PlantId),
}

impl GardenError {
    /// Whether this error is a rejected user intent (surfaced with a reason,
    /// never mutates state) rather than a remote or programming failure.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget(_)
                | Self::InsufficientFunds { .. }
                | Self::NothingToRemove { .. }
                | Self::NoFruitAvailable { .. }
                | Self::UnknownPlantType(_)
        )
    }
}

/// Errors reported by a remote sync adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport or server failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected the request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The response could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for garden operations.
pub type GardenResult<T> = Result<T, GardenError>;

/// Result type alias for remote adapter calls.
pub type RemoteResult<T> = Result<T, RemoteError>;
