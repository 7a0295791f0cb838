//! Grid coordinates for the garden.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GardenError;

/// Number of rows and columns in a garden grid.
pub const GRID_SIZE: usize = 5;

/// Position of a cell within the garden grid.
///
/// Rows map to the backend's `positionY`, columns to `positionX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    /// Row index (0..GRID_SIZE)
    pub row: usize,
    /// Column index (0..GRID_SIZE)
    pub col: usize,
}

impl CellPos {
    /// Creates a position, rejecting anything outside the grid.
    pub fn try_new(row: usize, col: usize) -> Result<Self, GardenError> {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return Err(GardenError::OutOfBounds { row, col });
        }
        Ok(Self { row, col })
    }

    /// Iterates over every position in row-major order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..GRID_SIZE).flat_map(|row| (0..GRID_SIZE).map(move |col| Self { row, col }))
    }

    /// Backend x coordinate (column).
    #[must_use]
    pub const fn x(self) -> usize {
        self.col
    }

    /// Backend y coordinate (row).
    #[must_use]
    pub const fn y(self) -> usize {
        self.row
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Validates a row index.
pub fn check_row(row: usize) -> Result<usize, GardenError> {
    if row >= GRID_SIZE {
        return Err(GardenError::OutOfBounds { row, col: 0 });
    }
    Ok(row)
}
