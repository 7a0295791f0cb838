//! # Huerto Garden
//!
//! Simulation core of the Huerto garden game.
//!
//! This crate owns everything that happens to one user's 5x5 garden:
//! - Plant catalog (requirements, growth timing, prices)
//! - Grid of cells and per-row environment controls
//! - Growth/health engine advancing plants every tick
//! - Player actions (pots, planting, removal, harvest, controls)
//! - Remote sync adapter trait and an in-memory backend
//! - Session loading and the background tick loop
//! - Event bus for UI notifications

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod actions;
pub mod catalog;
pub mod clock;
pub mod engine;
pub mod events;
pub mod garden;
pub mod grid;
pub mod growth;
pub mod handle;
pub mod memory;
pub mod points;
pub mod remote;
pub mod session;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::*;
    pub use crate::clock::*;
    pub use crate::engine::*;
    pub use crate::events::*;
    pub use crate::garden::*;
    pub use crate::grid::*;
    pub use crate::growth::*;
    pub use crate::handle::*;
    pub use crate::memory::*;
    pub use crate::points::*;
    pub use crate::remote::*;
    pub use crate::session::*;
}

pub use prelude::*;
