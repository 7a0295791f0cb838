//! Cell states, row controls and the fixed 5x5 grid that holds them.

use huerto_common::{CellPos, GardenError, GardenResult, PlantId, PlantTypeId, GRID_SIZE};
use serde::{Deserialize, Serialize};

use crate::catalog::{clamp_level, MAX_LEVEL};

/// Full health of a freshly planted seed.
pub const MAX_HEALTH: f32 = 100.0;

/// Identity of the plant occupying a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlantHandle {
    /// Planted locally; the backend has not assigned an id yet.
    Pending(u64),
    /// Known to the backend under this id.
    Persisted(PlantId),
}

impl PlantHandle {
    /// Backend id, if the plant has been persisted.
    #[must_use]
    pub const fn persisted(self) -> Option<PlantId> {
        match self {
            Self::Persisted(id) => Some(id),
            Self::Pending(_) => None,
        }
    }
}

/// A plant growing (or dead) in a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub(crate) plant_type: PlantTypeId,
    pub(crate) handle: PlantHandle,
    pub(crate) health: f32,
    pub(crate) growth_stage: u32,
    pub(crate) has_fruit: bool,
    pub(crate) planted_at: u64,
    pub(crate) last_harvested: Option<u64>,
    /// Bumped by player actions that change growth fields.
    #[serde(skip)]
    pub(crate) revision: u64,
}

impl Plant {
    /// Create a freshly planted seed: full health, stage 1, no fruit.
    #[must_use]
    pub fn seedling(plant_type: PlantTypeId, handle: PlantHandle, planted_at: u64) -> Self {
        Self {
            plant_type,
            handle,
            health: MAX_HEALTH,
            growth_stage: 1,
            has_fruit: false,
            planted_at,
            last_harvested: None,
            revision: 0,
        }
    }

    /// Plant type in the catalog.
    #[must_use]
    pub fn plant_type(&self) -> PlantTypeId {
        self.plant_type
    }

    /// Local or backend identity.
    #[must_use]
    pub fn handle(&self) -> PlantHandle {
        self.handle
    }

    /// Backend id, if persisted.
    #[must_use]
    pub fn plant_id(&self) -> Option<PlantId> {
        self.handle.persisted()
    }

    /// Health in `[0, 100]`.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Current growth stage.
    #[must_use]
    pub fn growth_stage(&self) -> u32 {
        self.growth_stage
    }

    /// Whether fruit is ready to harvest.
    #[must_use]
    pub fn has_fruit(&self) -> bool {
        self.has_fruit
    }

    /// Unix seconds when the seed was planted.
    #[must_use]
    pub fn planted_at(&self) -> u64 {
        self.planted_at
    }

    /// Unix seconds of the last harvest.
    #[must_use]
    pub fn last_harvested(&self) -> Option<u64> {
        self.last_harvested
    }

    /// Local revision of the growth fields.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_health(&mut self, health: f32) {
        self.health = if health.is_nan() {
            0.0
        } else {
            health.clamp(0.0, MAX_HEALTH)
        };
    }

    fn kill(&mut self) {
        self.health = 0.0;
        self.growth_stage = 0;
        self.has_fruit = false;
    }
}

/// Discriminant of a [`Cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Bare soil.
    Empty,
    /// A pot ready for a seed.
    Pot,
    /// A living plant.
    Planted,
    /// A dead plant waiting to be removed.
    Dead,
}

/// State of one grid slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Cell {
    /// Bare soil.
    #[default]
    Empty,
    /// A pot ready for a seed.
    Pot,
    /// A living plant.
    Planted(Plant),
    /// A dead plant. Health is 0 and there is never fruit.
    Dead(Plant),
}

impl Cell {
    /// Discriminant of this cell.
    #[must_use]
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Empty => CellKind::Empty,
            Self::Pot => CellKind::Pot,
            Self::Planted(_) => CellKind::Planted,
            Self::Dead(_) => CellKind::Dead,
        }
    }

    /// The plant in this cell, living or dead.
    #[must_use]
    pub fn plant(&self) -> Option<&Plant> {
        match self {
            Self::Planted(plant) | Self::Dead(plant) => Some(plant),
            Self::Empty | Self::Pot => None,
        }
    }

    /// Health of the plant, if any.
    #[must_use]
    pub fn health(&self) -> Option<f32> {
        self.plant().map(Plant::health)
    }

    /// Whether a living plant here has fruit ready.
    #[must_use]
    pub fn has_fruit(&self) -> bool {
        matches!(self, Self::Planted(plant) if plant.has_fruit)
    }

    /// Builds a dead cell from a plant, clearing health, stage and fruit.
    #[must_use]
    pub fn dead(mut plant: Plant) -> Self {
        plant.kill();
        Self::Dead(plant)
    }

    /// Builds a living cell, turning it dead if health has run out.
    #[must_use]
    pub fn living(plant: Plant) -> Self {
        if plant.health <= 0.0 {
            Self::dead(plant)
        } else {
            Self::Planted(plant)
        }
    }

    /// Applies a partial update and re-establishes the cell invariants.
    pub fn merged(&self, patch: &CellPatch) -> GardenResult<Self> {
        let kind = patch.kind.unwrap_or_else(|| self.kind());
        match kind {
            CellKind::Empty => Ok(Self::Empty),
            CellKind::Pot => Ok(Self::Pot),
            CellKind::Planted | CellKind::Dead => {
                let mut plant = match (self.plant(), patch.plant_type, patch.handle) {
                    (Some(existing), _, _) => existing.clone(),
                    (None, Some(plant_type), Some(handle)) => {
                        Plant::seedling(plant_type, handle, patch.planted_at.unwrap_or(0))
                    },
                    (None, _, _) => {
                        return Err(GardenError::InconsistentCell(
                            "a plant needs a type and an id".into(),
                        ))
                    },
                };

                if let Some(plant_type) = patch.plant_type {
                    plant.plant_type = plant_type;
                }
                if let Some(handle) = patch.handle {
                    plant.handle = handle;
                }
                if let Some(health) = patch.health {
                    plant.set_health(health);
                }
                if let Some(stage) = patch.growth_stage {
                    plant.growth_stage = stage;
                }
                if let Some(has_fruit) = patch.has_fruit {
                    plant.has_fruit = has_fruit;
                }
                if let Some(planted_at) = patch.planted_at {
                    plant.planted_at = planted_at;
                }
                if let Some(last_harvested) = patch.last_harvested {
                    plant.last_harvested = last_harvested;
                }

                Ok(if kind == CellKind::Dead {
                    Self::dead(plant)
                } else {
                    Self::living(plant)
                })
            },
        }
    }
}

/// Partial update for a cell. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellPatch {
    /// New cell kind.
    pub kind: Option<CellKind>,
    /// New plant type.
    pub plant_type: Option<PlantTypeId>,
    /// New plant identity.
    pub handle: Option<PlantHandle>,
    /// New health.
    pub health: Option<f32>,
    /// New growth stage.
    pub growth_stage: Option<u32>,
    /// New fruit flag.
    pub has_fruit: Option<bool>,
    /// New planting time.
    pub planted_at: Option<u64>,
    /// New last-harvest time (`Some(None)` clears it).
    pub last_harvested: Option<Option<u64>>,
}

impl CellPatch {
    /// Patch that only changes the cell kind.
    #[must_use]
    pub fn kind(kind: CellKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Set health.
    #[must_use]
    pub fn with_health(mut self, health: f32) -> Self {
        self.health = Some(health);
        self
    }

    /// Set growth stage.
    #[must_use]
    pub fn with_growth_stage(mut self, stage: u32) -> Self {
        self.growth_stage = Some(stage);
        self
    }

    /// Set the fruit flag.
    #[must_use]
    pub fn with_fruit(mut self, has_fruit: bool) -> Self {
        self.has_fruit = Some(has_fruit);
        self
    }

    /// Set plant type and identity.
    #[must_use]
    pub fn with_plant(mut self, plant_type: PlantTypeId, handle: PlantHandle) -> Self {
        self.plant_type = Some(plant_type);
        self.handle = Some(handle);
        self
    }
}

/// Which environmental control a slider adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    /// Light.
    Light,
    /// Water.
    Water,
    /// Nutrients.
    Nutrients,
}

/// Light, water and nutrient settings shared by every cell in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowControls {
    /// Light level (0-100).
    pub light: u8,
    /// Water level (0-100).
    pub water: u8,
    /// Nutrient level (0-100).
    pub nutrients: u8,
}

impl RowControls {
    /// Creates controls, clamping each value to `[0, 100]`.
    #[must_use]
    pub fn new(light: i64, water: i64, nutrients: i64) -> Self {
        Self {
            light: clamp_level(light),
            water: clamp_level(water),
            nutrients: clamp_level(nutrients),
        }
    }

    /// Value of one control.
    #[must_use]
    pub fn get(&self, kind: ControlKind) -> u8 {
        match kind {
            ControlKind::Light => self.light,
            ControlKind::Water => self.water,
            ControlKind::Nutrients => self.nutrients,
        }
    }

    /// Copy with one control replaced (clamped).
    #[must_use]
    pub fn with(mut self, kind: ControlKind, value: i64) -> Self {
        let value = clamp_level(value);
        match kind {
            ControlKind::Light => self.light = value,
            ControlKind::Water => self.water = value,
            ControlKind::Nutrients => self.nutrients = value,
        }
        self
    }

    fn clamped(self) -> Self {
        Self {
            light: self.light.min(MAX_LEVEL),
            water: self.water.min(MAX_LEVEL),
            nutrients: self.nutrients.min(MAX_LEVEL),
        }
    }
}

impl Default for RowControls {
    fn default() -> Self {
        Self {
            light: 50,
            water: 50,
            nutrients: 50,
        }
    }
}

/// The 5x5 matrix of cells plus one set of controls per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
    controls: [RowControls; GRID_SIZE],
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    /// An all-empty grid with default controls.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: std::array::from_fn(|_| std::array::from_fn(|_| Cell::Empty)),
            controls: [RowControls::default(); GRID_SIZE],
        }
    }

    /// Cell at a position.
    #[must_use]
    pub fn cell(&self, pos: CellPos) -> &Cell {
        &self.cells[pos.row][pos.col]
    }

    pub(crate) fn cell_mut(&mut self, pos: CellPos) -> &mut Cell {
        &mut self.cells[pos.row][pos.col]
    }

    /// Replaces a cell wholesale. Plant id uniqueness is checked.
    pub fn put(&mut self, pos: CellPos, cell: Cell) -> GardenResult<()> {
        if let Some(id) = cell.plant().and_then(Plant::plant_id) {
            if let Some(other) = self.find_plant(id) {
                if other != pos {
                    return Err(GardenError::DuplicatePlantId(id));
                }
            }
        }
        self.cells[pos.row][pos.col] = cell;
        Ok(())
    }

    /// Merges a patch into a cell. The cell is unchanged on error.
    pub fn patch(&mut self, pos: CellPos, patch: &CellPatch) -> GardenResult<&Cell> {
        let merged = self.cell(pos).merged(patch)?;
        self.put(pos, merged)?;
        Ok(self.cell(pos))
    }

    /// Controls for a row. `row` must already be validated.
    #[must_use]
    pub fn controls(&self, row: usize) -> RowControls {
        self.controls[row]
    }

    /// Replaces the controls for a row, clamping every value.
    pub fn set_controls(&mut self, row: usize, controls: RowControls) {
        self.controls[row] = controls.clamped();
    }

    /// All row controls.
    #[must_use]
    pub fn all_controls(&self) -> &[RowControls; GRID_SIZE] {
        &self.controls
    }

    /// Position of the cell holding a persisted plant.
    #[must_use]
    pub fn find_plant(&self, id: PlantId) -> Option<CellPos> {
        CellPos::all().find(|&pos| self.cell(pos).plant().and_then(Plant::plant_id) == Some(id))
    }

    /// Iterate over every cell with its position.
    pub fn iter(&self) -> impl Iterator<Item = (CellPos, &Cell)> {
        CellPos::all().map(move |pos| (pos, self.cell(pos)))
    }

    /// Number of cells of a kind.
    #[must_use]
    pub fn count(&self, kind: CellKind) -> usize {
        self.iter().filter(|(_, cell)| cell.kind() == kind).count()
    }
}
