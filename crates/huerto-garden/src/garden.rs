//! Garden state: the aggregate of grid, controls, points and catalog.

use ahash::AHashSet;
use huerto_common::{check_row, CellPos, GardenError, GardenResult};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::catalog::Catalog;
use crate::grid::{Cell, CellPatch, Grid, Plant, PlantHandle, RowControls};
use crate::points::Points;
use crate::remote::{GardenSnapshot, PlantStatus};

/// One user's garden for the length of a session.
#[derive(Debug, Clone, Default)]
pub struct GardenState {
    grid: Grid,
    points: Points,
    catalog: Catalog,
}

/// Read-only copy of the garden handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GardenView {
    /// Cells and row controls.
    pub grid: Grid,
    /// Point balance.
    pub points: u64,
}

/// Out-of-range access is a caller bug; make it loud.
fn log_out_of_bounds(err: GardenError) -> GardenError {
    error!("{err}");
    err
}

impl GardenState {
    /// Empty garden with the given catalog and balance.
    #[must_use]
    pub fn new(catalog: Catalog, points: Points) -> Self {
        Self {
            grid: Grid::new(),
            points,
            catalog,
        }
    }

    /// Validates and converts a row/column pair, logging out-of-range access.
    pub fn pos(row: usize, col: usize) -> GardenResult<CellPos> {
        CellPos::try_new(row, col).map_err(log_out_of_bounds)
    }

    /// Cell at `(row, col)`.
    pub fn get_cell(&self, row: usize, col: usize) -> GardenResult<&Cell> {
        Ok(self.grid.cell(Self::pos(row, col)?))
    }

    /// Merges a partial update into a cell.
    pub fn set_cell(&mut self, row: usize, col: usize, patch: &CellPatch) -> GardenResult<&Cell> {
        let pos = Self::pos(row, col)?;
        self.grid.patch(pos, patch)
    }

    /// Controls for a row.
    pub fn get_row_controls(&self, row: usize) -> GardenResult<RowControls> {
        let row = check_row(row).map_err(log_out_of_bounds)?;
        Ok(self.grid.controls(row))
    }

    /// Replaces a row's controls; values are clamped to `[0, 100]`.
    pub fn set_row_controls(&mut self, row: usize, controls: RowControls) -> GardenResult<()> {
        let row = check_row(row).map_err(log_out_of_bounds)?;
        self.grid.set_controls(row, controls);
        Ok(())
    }

    /// Replaces grid and controls with a backend snapshot.
    ///
    /// Either the whole snapshot is applied or nothing is.
    pub fn load_from_remote(&mut self, snapshot: &GardenSnapshot) -> GardenResult<()> {
        let grid = self.build_grid(snapshot)?;
        info!(
            "Loaded garden: {} plants, {} control rows",
            snapshot.plants.len(),
            snapshot.controls.len()
        );
        self.grid = grid;
        Ok(())
    }

    fn build_grid(&self, snapshot: &GardenSnapshot) -> GardenResult<Grid> {
        let mut grid = Grid::new();

        for record in &snapshot.controls {
            let row = check_row(record.fila_index).map_err(|_| {
                GardenError::InvalidSnapshot(format!("control row {} out of range", record.fila_index))
            })?;
            grid.set_controls(row, record.controls());
        }

        let mut seen_ids = AHashSet::new();
        for record in &snapshot.plants {
            let pos = CellPos::try_new(record.position_y, record.position_x).map_err(|_| {
                GardenError::InvalidSnapshot(format!(
                    "plant {} at ({}, {}) is outside the grid",
                    record.id, record.position_y, record.position_x
                ))
            })?;
            if !self.catalog.contains(record.plant_type_id) {
                return Err(GardenError::InvalidSnapshot(format!(
                    "plant {} has unknown type {}",
                    record.id, record.plant_type_id
                )));
            }
            if !seen_ids.insert(record.id) {
                return Err(GardenError::InvalidSnapshot(format!(
                    "plant {} appears twice",
                    record.id
                )));
            }
            if grid.cell(pos).plant().is_some() {
                return Err(GardenError::InvalidSnapshot(format!(
                    "two plants at {pos}"
                )));
            }

            let mut plant = Plant::seedling(
                record.plant_type_id,
                PlantHandle::Persisted(record.id),
                record.planted_at,
            );
            plant.set_health(record.plant_health);
            plant.growth_stage = record.growth_stage;
            plant.has_fruit = record.has_fruits;
            plant.last_harvested = record.last_harvested;

            let cell = match record.status {
                PlantStatus::Dead => Cell::dead(plant),
                PlantStatus::Alive => Cell::living(plant),
            };
            debug!("Restored {:?} at {}", cell.kind(), pos);
            grid.put(pos, cell)?;
        }

        Ok(grid)
    }

    /// Read-only copy for the UI.
    #[must_use]
    pub fn snapshot(&self) -> GardenView {
        GardenView {
            grid: self.grid.clone(),
            points: self.points.balance(),
        }
    }

    /// The grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// Point balance.
    #[must_use]
    pub fn points(&self) -> Points {
        self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut Points {
        &mut self.points
    }

    /// Loaded plant catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Replaces the catalog.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::plant_types;
    use crate::grid::CellKind;
    use crate::remote::{ControlRecord, PlantRecord};
    use huerto_common::PlantId;

    fn record(id: u64, row: usize, col: usize) -> PlantRecord {
        PlantRecord {
            id: PlantId::new(id),
            plant_type_id: plant_types::TOMATO,
            growth_stage: 2,
            plant_health: 64.0,
            position_x: col,
            position_y: row,
            has_fruits: false,
            status: PlantStatus::Alive,
            planted_at: 0,
            last_harvested: None,
        }
    }

    fn state() -> GardenState {
        GardenState::new(Catalog::with_defaults(), Points::new(50))
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut garden = state();
        assert!(matches!(
            garden.get_cell(5, 0),
            Err(GardenError::OutOfBounds { row: 5, col: 0 })
        ));
        assert!(garden.get_row_controls(7).is_err());
        assert!(garden
            .set_row_controls(9, RowControls::default())
            .is_err());
        assert!(garden.set_cell(0, 5, &CellPatch::kind(CellKind::Pot)).is_err());
    }

    #[test]
    fn test_load_snapshot() {
        let mut garden = state();
        let mut dead = record(2, 4, 0);
        dead.status = PlantStatus::Dead;
        dead.has_fruits = true;

        let snapshot = GardenSnapshot {
            controls: vec![ControlRecord {
                fila_index: 3,
                light: 90,
                water: 10,
                nutrients: 150,
            }],
            plants: vec![record(1, 1, 3), dead],
        };

        garden.load_from_remote(&snapshot).expect("load");

        let planted = garden.get_cell(1, 3).expect("cell");
        assert_eq!(planted.kind(), CellKind::Planted);
        assert_eq!(planted.health(), Some(64.0));
        assert_eq!(planted.plant().expect("plant").growth_stage(), 2);

        let dead = garden.get_cell(4, 0).expect("cell");
        assert_eq!(dead.kind(), CellKind::Dead);
        assert!(!dead.has_fruit());

        assert_eq!(garden.get_row_controls(3).expect("row"), RowControls::new(90, 10, 100));
        assert_eq!(garden.get_row_controls(0).expect("row"), RowControls::default());
    }

    #[test]
    fn test_load_is_atomic() {
        let mut garden = state();
        garden
            .load_from_remote(&GardenSnapshot {
                controls: Vec::new(),
                plants: vec![record(1, 0, 0)],
            })
            .expect("initial load");
        let before = garden.snapshot();

        let bad_snapshots = [
            GardenSnapshot {
                controls: Vec::new(),
                plants: vec![record(5, 2, 2), record(6, 9, 0)],
            },
            GardenSnapshot {
                controls: Vec::new(),
                plants: vec![record(5, 2, 2), record(5, 3, 3)],
            },
            GardenSnapshot {
                controls: Vec::new(),
                plants: vec![record(5, 2, 2), record(6, 2, 2)],
            },
            GardenSnapshot {
                controls: vec![ControlRecord {
                    fila_index: 5,
                    light: 0,
                    water: 0,
                    nutrients: 0,
                }],
                plants: Vec::new(),
            },
        ];

        for bad in &bad_snapshots {
            let err = garden.load_from_remote(bad).expect_err("invalid snapshot");
            assert!(matches!(err, GardenError::InvalidSnapshot(_)));
            assert_eq!(garden.snapshot(), before);
        }
    }

    #[test]
    fn test_load_rejects_unknown_type() {
        let mut garden = state();
        let mut unknown = record(1, 0, 0);
        unknown.plant_type_id = huerto_common::PlantTypeId::new(404);

        let err = garden
            .load_from_remote(&GardenSnapshot {
                controls: Vec::new(),
                plants: vec![unknown],
            })
            .expect_err("unknown type");
        assert!(matches!(err, GardenError::InvalidSnapshot(_)));
        assert_eq!(garden.grid().count(CellKind::Empty), 25);
    }

    #[test]
    fn test_alive_record_with_zero_health_loads_dead() {
        let mut garden = state();
        let mut wilted = record(8, 2, 1);
        wilted.plant_health = 0.0;

        garden
            .load_from_remote(&GardenSnapshot {
                controls: Vec::new(),
                plants: vec![wilted],
            })
            .expect("load");
        assert_eq!(garden.get_cell(2, 1).expect("cell").kind(), CellKind::Dead);
    }
}
