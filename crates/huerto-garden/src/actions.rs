//! Player actions on the grid.
//!
//! Each action validates and applies its change locally, then confirms it
//! with the backend. If the backend call fails the local change is undone,
//! unless the cell has moved on since.

use huerto_common::{GardenError, GardenResult, PlantId, PlantTypeId, RemoteError};
use tracing::{info, warn};

use crate::events::GardenEvent;
use crate::garden::GardenState;
use crate::grid::{Cell, CellKind, ControlKind, Plant, PlantHandle, RowControls};
use crate::handle::{living_plant_mut, GardenHandle};
use crate::remote::{RemoteOp, RemoteSync};

impl<R: RemoteSync> GardenHandle<R> {
    /// Puts a pot on bare soil. Pots are local only.
    pub fn place_pot(&self, row: usize, col: usize) -> GardenResult<()> {
        let pos = GardenState::pos(row, col)?;
        self.with_state_mut(|state| {
            let kind = state.grid().cell(pos).kind();
            if kind != CellKind::Empty {
                return Err(GardenError::InvalidTarget(format!(
                    "cannot place a pot on a {kind:?} cell at {pos}"
                )));
            }
            state.grid_mut().put(pos, Cell::Pot)
        })?;
        self.publish(GardenEvent::PotPlaced { pos });
        Ok(())
    }

    /// Plants a seed in a pot and pays its price.
    ///
    /// The plant shows up immediately with a pending handle. On failure the
    /// pot is restored and the price refunded.
    ///
    /// If the cell changed while the backend was creating the plant, the
    /// backend record is left orphaned and the price stays paid. The call
    /// then fails with [`GardenError::StaleResponse`] and a
    /// [`GardenEvent::StaleResponseDiscarded`] is published.
    pub async fn plant_seed(
        &self,
        row: usize,
        col: usize,
        plant_type: PlantTypeId,
    ) -> GardenResult<PlantId> {
        let pos = GardenState::pos(row, col)?;
        let ticket = self.next_ticket();
        let now = self.now();

        let price = self.with_state_mut(|state| {
            let kind = state.grid().cell(pos).kind();
            if kind != CellKind::Pot {
                return Err(GardenError::InvalidTarget(format!(
                    "seeds need a pot, {pos} is {kind:?}"
                )));
            }
            let price = state
                .catalog()
                .get(plant_type)
                .map(|def| def.price)
                .ok_or(GardenError::UnknownPlantType(plant_type))?;
            state.points_mut().spend(price)?;
            let seedling = Plant::seedling(plant_type, PlantHandle::Pending(ticket), now);
            state.grid_mut().put(pos, Cell::Planted(seedling))?;
            Ok(price)
        })?;

        let result = self
            .remote()
            .plant_seed(self.user(), plant_type, pos.x(), pos.y())
            .await;

        match result {
            Ok(record) => {
                let confirmed = self.with_state_mut(|state| {
                    let pending = state
                        .grid()
                        .cell(pos)
                        .plant()
                        .filter(|p| p.handle() == PlantHandle::Pending(ticket))
                        .cloned();
                    let Some(mut plant) = pending else {
                        return Ok(false);
                    };
                    plant.handle = PlantHandle::Persisted(record.id);
                    plant.planted_at = record.planted_at;
                    state.grid_mut().put(pos, Cell::Planted(plant))?;
                    Ok::<_, GardenError>(true)
                })?;
                if !confirmed {
                    warn!(
                        "Plant {} confirmed after {} changed, backend record is orphaned",
                        record.id, pos
                    );
                    self.publish(GardenEvent::StaleResponseDiscarded {
                        pos,
                        plant_id: record.id,
                    });
                    return Err(GardenError::StaleResponse(record.id));
                }
                info!("Planted {} at {} as {}", plant_type, pos, record.id);
                self.publish(GardenEvent::Planted {
                    pos,
                    plant_type,
                    plant_id: record.id,
                });
                Ok(record.id)
            },
            Err(e) => {
                self.with_state_mut(|state| {
                    let pending = state
                        .grid()
                        .cell(pos)
                        .plant()
                        .is_some_and(|p| p.handle() == PlantHandle::Pending(ticket));
                    if pending {
                        *state.grid_mut().cell_mut(pos) = Cell::Pot;
                    }
                    state.points_mut().earn(price);
                });
                warn!("Planting {} at {} failed: {}", plant_type, pos, e);
                self.report_failure(RemoteOp::PlantSeed, &e);
                Err(e.into())
            },
        }
    }

    /// Clears a planted or dead cell back to bare soil.
    pub async fn remove_plant(&self, row: usize, col: usize) -> GardenResult<()> {
        let pos = GardenState::pos(row, col)?;

        let (previous, plant_id) = self.with_state_mut(|state| {
            let cell = state.grid().cell(pos).clone();
            let Some(plant) = cell.plant() else {
                return Err(GardenError::NothingToRemove { row, col });
            };
            let plant_id = plant.plant_id().ok_or_else(|| {
                GardenError::InvalidTarget(format!("planting at {pos} is still in progress"))
            })?;
            *state.grid_mut().cell_mut(pos) = Cell::Empty;
            Ok((cell, plant_id))
        })?;

        match self.remote().remove_plant(plant_id).await {
            Ok(()) => {
                info!("Removed {} from {}", plant_id, pos);
                self.publish(GardenEvent::Removed { pos, plant_id });
                Ok(())
            },
            Err(e) => {
                self.with_state_mut(|state| {
                    if *state.grid().cell(pos) == Cell::Empty {
                        *state.grid_mut().cell_mut(pos) = previous;
                    }
                });
                warn!("Removing {} failed: {}", plant_id, e);
                self.report_failure(RemoteOp::RemovePlant, &e);
                Err(e.into())
            },
        }
    }

    /// Picks the fruit of a plant and credits the reward.
    ///
    /// Returns the points awarded. If the backend says there is no fruit,
    /// the fruit stays cleared and [`GardenError::NoFruitAvailable`] is
    /// returned.
    pub async fn harvest_fruit(&self, row: usize, col: usize) -> GardenResult<u64> {
        let pos = GardenState::pos(row, col)?;

        let plant_id = self.with_state_mut(|state| {
            let fruit_id = match state.grid().cell(pos) {
                Cell::Planted(plant) if plant.has_fruit() => plant.plant_id(),
                _ => None,
            };
            let plant_id = fruit_id.ok_or(GardenError::NoFruitAvailable { row, col })?;
            if let Some(plant) = living_plant_mut(state, pos, plant_id) {
                plant.has_fruit = false;
                plant.revision += 1;
            }
            Ok::<_, GardenError>(plant_id)
        })?;

        match self.remote().harvest_fruit(plant_id).await {
            Ok(outcome) => {
                let now = self.now();
                self.with_state_mut(|state| {
                    state.points_mut().earn(outcome.points_awarded);
                    if let Some(plant) = living_plant_mut(state, pos, plant_id) {
                        plant.last_harvested = Some(now);
                    }
                });
                info!("Harvested {} for {} points", plant_id, outcome.points_awarded);
                self.publish(GardenEvent::Harvested {
                    pos,
                    plant_id,
                    points: outcome.points_awarded,
                });
                Ok(outcome.points_awarded)
            },
            Err(RemoteError::Validation(reason)) => {
                info!("Backend rejected harvest of {}: {}", plant_id, reason);
                Err(GardenError::NoFruitAvailable { row, col })
            },
            Err(e) => {
                self.with_state_mut(|state| {
                    if let Some(plant) = living_plant_mut(state, pos, plant_id) {
                        plant.has_fruit = true;
                    }
                });
                warn!("Harvesting {} failed: {}", plant_id, e);
                self.report_failure(RemoteOp::HarvestFruit, &e);
                Err(e.into())
            },
        }
    }

    /// Sets one control of a row, clamped to `[0, 100]`.
    ///
    /// The new value shows immediately and is reverted if the backend
    /// rejects it.
    pub async fn set_row_control(
        &self,
        row: usize,
        kind: ControlKind,
        value: i64,
    ) -> GardenResult<RowControls> {
        let (previous, updated) = self.with_state_mut(|state| {
            let previous = state.get_row_controls(row)?;
            let updated = previous.with(kind, value);
            state.set_row_controls(row, updated)?;
            Ok::<_, GardenError>((previous, updated))
        })?;
        self.publish(GardenEvent::ControlsChanged {
            row,
            controls: updated,
        });

        match self.remote().update_row_controls(self.user(), row, updated).await {
            Ok(()) => Ok(updated),
            Err(e) => {
                let reverted = self.with_state_mut(|state| {
                    let unchanged = state.grid().controls(row) == updated;
                    if unchanged {
                        state.grid_mut().set_controls(row, previous);
                    }
                    unchanged
                });
                if reverted {
                    self.publish(GardenEvent::ControlsChanged {
                        row,
                        controls: previous,
                    });
                }
                warn!("Saving controls of row {} failed: {}", row, e);
                self.report_failure(RemoteOp::UpdateRowControls, &e);
                Err(e.into())
            },
        }
    }
}
