//! Event bus reporting garden changes to the UI layer.

use crossbeam_channel::{bounded, Receiver, Sender};
use huerto_common::{CellPos, PlantId, PlantTypeId};

use crate::grid::RowControls;
use crate::remote::RemoteOp;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum GardenEvent {
    /// A pot was placed on bare soil
    PotPlaced {
        /// Cell position
        pos: CellPos,
    },
    /// A seed was planted and confirmed by the backend
    Planted {
        /// Cell position
        pos: CellPos,
        /// Plant type
        plant_type: PlantTypeId,
        /// Backend id
        plant_id: PlantId,
    },
    /// A plant was removed
    Removed {
        /// Cell position
        pos: CellPos,
        /// Backend id
        plant_id: PlantId,
    },
    /// Fruit was harvested
    Harvested {
        /// Cell position
        pos: CellPos,
        /// Backend id
        plant_id: PlantId,
        /// Points credited
        points: u64,
    },
    /// A plant's health reached zero
    PlantDied {
        /// Cell position
        pos: CellPos,
        /// Backend id
        plant_id: PlantId,
    },
    /// A row's controls changed
    ControlsChanged {
        /// Row index
        row: usize,
        /// New controls
        controls: RowControls,
    },
    /// A remote call failed; local state was kept or compensated
    RemoteFailure {
        /// Operation that failed
        op: RemoteOp,
        /// Error message
        message: String,
    },
    /// A remote response was dropped because its plant left the cell
    StaleResponseDiscarded {
        /// Cell position
        pos: CellPos,
        /// Plant the response was for
        plant_id: PlantId,
    },
}

/// Event bus for broadcasting garden events to subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GardenEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GardenEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: GardenEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GardenEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
