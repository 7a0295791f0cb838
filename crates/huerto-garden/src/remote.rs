//! Remote sync adapter: the backend seen from the simulation.
//!
//! The backend owns persistence, the catalog and scoring. This module
//! defines the operations the simulation needs from it and the records they
//! exchange. Field names follow the backend's JSON (camelCase).

use std::future::Future;

use huerto_common::{PlantId, PlantTypeId, RemoteResult, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::PlantType;
use crate::grid::RowControls;

/// Lifecycle status of a persisted plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantStatus {
    /// Growing.
    #[default]
    Alive,
    /// Killed by neglect.
    Dead,
}

/// A persisted plant instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantRecord {
    /// Backend id.
    pub id: PlantId,
    /// Catalog entry.
    pub plant_type_id: PlantTypeId,
    /// Growth stage.
    pub growth_stage: u32,
    /// Health in `[0, 100]`.
    pub plant_health: f32,
    /// Column.
    pub position_x: usize,
    /// Row.
    pub position_y: usize,
    /// Whether fruit is ready.
    pub has_fruits: bool,
    /// Alive or dead.
    #[serde(default)]
    pub status: PlantStatus,
    /// Unix seconds when planted.
    #[serde(default)]
    pub planted_at: u64,
    /// Unix seconds of the last harvest.
    #[serde(default)]
    pub last_harvested: Option<u64>,
}

/// Persisted controls for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRecord {
    /// Row index.
    pub fila_index: usize,
    /// Light level.
    pub light: i64,
    /// Water level.
    pub water: i64,
    /// Nutrient level.
    pub nutrients: i64,
}

impl ControlRecord {
    /// Record for a row's controls.
    #[must_use]
    pub fn new(row: usize, controls: RowControls) -> Self {
        Self {
            fila_index: row,
            light: i64::from(controls.light),
            water: i64::from(controls.water),
            nutrients: i64::from(controls.nutrients),
        }
    }

    /// Controls carried by this record, clamped to `[0, 100]`.
    #[must_use]
    pub fn controls(&self) -> RowControls {
        RowControls::new(self.light, self.water, self.nutrients)
    }
}

/// A user's garden as persisted by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GardenSnapshot {
    /// Controls per row. Missing rows use the defaults.
    #[serde(default)]
    pub controls: Vec<ControlRecord>,
    /// Plants in the garden.
    #[serde(default)]
    pub plants: Vec<PlantRecord>,
}

/// Growth fields recomputed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthUpdate {
    /// New growth stage.
    pub growth_stage: u32,
    /// Whether fruit is ready.
    pub has_fruits: bool,
}

/// Result of a successful harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestOutcome {
    /// Points credited to the player.
    pub points_awarded: u64,
}

/// Name of a remote operation, for logging and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// `fetchCatalog`
    FetchCatalog,
    /// `fetchGarden`
    FetchGarden,
    /// `createGarden`
    CreateGarden,
    /// `fetchPoints`
    FetchPoints,
    /// `updateRowControls`
    UpdateRowControls,
    /// `plantSeed`
    PlantSeed,
    /// `updateGrowth`
    UpdateGrowth,
    /// `updateHealth`
    UpdateHealth,
    /// `killPlant`
    KillPlant,
    /// `removePlant`
    RemovePlant,
    /// `harvestFruit`
    HarvestFruit,
}

impl RemoteOp {
    /// Returns the operation name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FetchCatalog => "fetchCatalog",
            Self::FetchGarden => "fetchGarden",
            Self::CreateGarden => "createGarden",
            Self::FetchPoints => "fetchPoints",
            Self::UpdateRowControls => "updateRowControls",
            Self::PlantSeed => "plantSeed",
            Self::UpdateGrowth => "updateGrowth",
            Self::UpdateHealth => "updateHealth",
            Self::KillPlant => "killPlant",
            Self::RemovePlant => "removePlant",
            Self::HarvestFruit => "harvestFruit",
        }
    }
}

/// Operations the simulation performs against the backend.
///
/// Every call is a suspension point. Implementations must be shareable
/// across tasks; the returned futures are `Send` so the ticker can run on a
/// multi-threaded runtime.
pub trait RemoteSync: Send + Sync + 'static {
    /// Lists every plant type.
    fn fetch_catalog(&self) -> impl Future<Output = RemoteResult<Vec<PlantType>>> + Send;

    /// Loads a user's garden, `None` if the user has none yet.
    fn fetch_garden(
        &self,
        user: UserId,
    ) -> impl Future<Output = RemoteResult<Option<GardenSnapshot>>> + Send;

    /// Creates an empty garden for a user.
    fn create_garden(&self, user: UserId)
        -> impl Future<Output = RemoteResult<GardenSnapshot>> + Send;

    /// Reads a user's point balance.
    fn fetch_points(&self, user: UserId) -> impl Future<Output = RemoteResult<u64>> + Send;

    /// Stores the controls of one row.
    fn update_row_controls(
        &self,
        user: UserId,
        row: usize,
        controls: RowControls,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Creates a plant at `(x, y)` = `(col, row)`, charging its price.
    fn plant_seed(
        &self,
        user: UserId,
        plant_type: PlantTypeId,
        x: usize,
        y: usize,
    ) -> impl Future<Output = RemoteResult<PlantRecord>> + Send;

    /// Recomputes a plant's growth stage and fruit.
    fn update_growth(&self, plant: PlantId)
        -> impl Future<Output = RemoteResult<GrowthUpdate>> + Send;

    /// Stores a plant's health.
    fn update_health(
        &self,
        plant: PlantId,
        health: f32,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Marks a plant dead.
    fn kill_plant(&self, plant: PlantId) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Deletes a plant.
    fn remove_plant(&self, plant: PlantId) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Collects fruit from a plant.
    fn harvest_fruit(
        &self,
        plant: PlantId,
    ) -> impl Future<Output = RemoteResult<HarvestOutcome>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_wire_format() {
        let json = r#"{
            "id": 12,
            "controls": [{"id": 1, "filaIndex": 2, "light": 70, "water": 30, "nutrients": 55, "huertoId": 12}],
            "plants": [{
                "id": 44,
                "huertoId": 12,
                "plantTypeId": 2,
                "growthStage": 2,
                "plantHealth": 87.5,
                "positionX": 3,
                "positionY": 1,
                "hasFruits": true,
                "status": "alive"
            }]
        }"#;

        let snapshot: GardenSnapshot = serde_json::from_str(json).expect("parse snapshot");
        assert_eq!(snapshot.controls[0].controls(), RowControls::new(70, 30, 55));
        let plant = &snapshot.plants[0];
        assert_eq!(plant.id, PlantId::new(44));
        assert_eq!((plant.position_y, plant.position_x), (1, 3));
        assert_eq!(plant.status, PlantStatus::Alive);
        assert_eq!(plant.last_harvested, None);
    }

    #[test]
    fn test_dead_status_parses() {
        let json = r#"{"id":1,"plantTypeId":1,"growthStage":0,"plantHealth":0,
            "positionX":0,"positionY":0,"hasFruits":false,"status":"dead"}"#;
        let plant: PlantRecord = serde_json::from_str(json).expect("parse plant");
        assert_eq!(plant.status, PlantStatus::Dead);
    }

    #[test]
    fn test_control_record_roundtrips_controls() {
        let controls = RowControls::new(10, 20, 30);
        let record = ControlRecord::new(4, controls);
        assert_eq!(record.fila_index, 4);
        assert_eq!(record.controls(), controls);
    }
}
