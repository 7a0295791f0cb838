//! # Huerto Common
//!
//! Common types and shared abstractions for the Huerto garden simulation.
//!
//! This crate provides foundational types used across the workspace:
//! - Grid coordinates (`CellPos`) and the fixed grid size
//! - ID types (plant types, plant instances, users)
//! - The error taxonomy shared by the store, engine and action handlers
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_pos_bounds() {
        assert!(CellPos::try_new(0, 0).is_ok());
        assert!(CellPos::try_new(4, 4).is_ok());
        assert!(matches!(
            CellPos::try_new(5, 0),
            Err(GardenError::OutOfBounds { row: 5, col: 0 })
        ));
    }

    #[test]
    fn test_plant_id_wire_format() {
        let id = PlantId::new(42);
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "42");
    }

    #[test]
    fn test_remote_error_converts_to_unavailable() {
        let err: GardenError = RemoteError::Network("connection reset".into()).into();
        assert!(matches!(err, GardenError::RemoteUnavailable(_)));
        assert!(!err.is_user_error());
    }
}
