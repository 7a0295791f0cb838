//! Shared handle to a garden session's state and collaborators.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use huerto_common::{CellPos, GardenResult, PlantId, UserId};
use parking_lot::Mutex;

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::events::{EventBus, GardenEvent};
use crate::garden::{GardenState, GardenView};
use crate::grid::{Cell, Plant, RowControls};
use crate::remote::{RemoteOp, RemoteSync};

/// Cloneable handle used by the action handlers, the growth engine and the
/// ticker. The state lock is never held across a remote call.
pub struct GardenHandle<R> {
    state: Arc<Mutex<GardenState>>,
    remote: Arc<R>,
    user: UserId,
    clock: Arc<dyn Clock>,
    events: EventBus,
    next_ticket: Arc<AtomicU64>,
}

impl<R> Clone for GardenHandle<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            remote: Arc::clone(&self.remote),
            user: self.user,
            clock: Arc::clone(&self.clock),
            events: self.events.clone(),
            next_ticket: Arc::clone(&self.next_ticket),
        }
    }
}

impl<R: RemoteSync> GardenHandle<R> {
    /// Wraps a loaded garden.
    #[must_use]
    pub fn new(state: GardenState, remote: Arc<R>, user: UserId, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            remote,
            user,
            clock,
            events: EventBus::default(),
            next_ticket: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Read-only copy of grid, controls and points.
    #[must_use]
    pub fn view(&self) -> GardenView {
        self.state.lock().snapshot()
    }

    /// Cell at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> GardenResult<Cell> {
        self.state.lock().get_cell(row, col).cloned()
    }

    /// Controls for a row.
    pub fn row_controls(&self, row: usize) -> GardenResult<RowControls> {
        self.state.lock().get_row_controls(row)
    }

    /// Point balance.
    #[must_use]
    pub fn points(&self) -> u64 {
        self.state.lock().points().balance()
    }

    /// Loaded plant catalog.
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        self.state.lock().catalog().clone()
    }

    /// Runs `f` with shared access to the state.
    pub fn with_state<T>(&self, f: impl FnOnce(&GardenState) -> T) -> T {
        f(&self.state.lock())
    }

    /// Runs `f` with exclusive access to the state.
    pub fn with_state_mut<T>(&self, f: impl FnOnce(&mut GardenState) -> T) -> T {
        f(&mut self.state.lock())
    }

    /// The remote adapter.
    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Owner of the garden.
    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Current time from the session clock.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Event bus for UI notifications.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn next_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn publish(&self, event: GardenEvent) {
        self.events.publish(event);
    }

    pub(crate) fn report_failure(&self, op: RemoteOp, err: &impl std::fmt::Display) {
        self.publish(GardenEvent::RemoteFailure {
            op,
            message: err.to_string(),
        });
    }
}

/// The living plant at `pos` if it is still the persisted plant `id`.
pub(crate) fn living_plant_mut(
    state: &mut GardenState,
    pos: CellPos,
    id: PlantId,
) -> Option<&mut Plant> {
    match state.grid_mut().cell_mut(pos) {
        Cell::Planted(plant) if plant.plant_id() == Some(id) => Some(plant),
        _ => None,
    }
}
