//! In-process backend implementing [`RemoteSync`].
//!
//! Mirrors what the real backend does for the operations the simulation
//! calls: gardens per user, point balances, plant records with elapsed-time
//! growth. Failures can be injected per operation or per plant, and
//! `update_growth` and `plant_seed` responses can be held in flight with a
//! [`ResponseGate`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use dashmap::DashMap;
use huerto_common::{
    CellPos, PlantId, PlantTypeId, RemoteError, RemoteResult, UserId, GRID_SIZE,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::catalog::{default_plant_types, PlantType};
use crate::clock::Clock;
use crate::grid::{RowControls, MAX_HEALTH};
use crate::growth::GrowthClock;
use crate::remote::{
    ControlRecord, GardenSnapshot, GrowthUpdate, HarvestOutcome, PlantRecord, PlantStatus,
    RemoteOp, RemoteSync,
};

/// Default points awarded per harvest.
pub const DEFAULT_HARVEST_REWARD: u64 = 10;

/// Default balance of a newly created garden.
pub const DEFAULT_STARTING_POINTS: u64 = 50;

/// Holds remote responses until the test releases them.
#[derive(Debug)]
pub struct ResponseGate {
    arrived: Semaphore,
    release: Semaphore,
}

impl Default for ResponseGate {
    fn default() -> Self {
        Self {
            arrived: Semaphore::new(0),
            release: Semaphore::new(0),
        }
    }
}

impl ResponseGate {
    /// Waits until one call has reached the gate.
    pub async fn wait_arrival(&self) {
        if let Ok(permit) = self.arrived.acquire().await {
            permit.forget();
        }
    }

    /// Lets `n` held calls continue.
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    async fn pass(&self) {
        self.arrived.add_permits(1);
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
    }
}

#[derive(Debug)]
struct UserGarden {
    controls: [RowControls; GRID_SIZE],
}

#[derive(Debug, Clone)]
struct StoredPlant {
    owner: UserId,
    record: PlantRecord,
}

#[derive(Debug, Default)]
struct Failures {
    ops: AHashSet<RemoteOp>,
    plants: AHashSet<PlantId>,
}

/// In-memory backend.
pub struct MemoryBackend {
    catalog: RwLock<Vec<PlantType>>,
    gardens: DashMap<UserId, UserGarden>,
    points: DashMap<UserId, u64>,
    plants: DashMap<PlantId, StoredPlant>,
    next_plant_id: AtomicU64,
    clock: Arc<dyn Clock>,
    starting_points: u64,
    harvest_reward: u64,
    failures: Mutex<Failures>,
    calls: Mutex<AHashMap<RemoteOp, usize>>,
    gates: Mutex<AHashMap<RemoteOp, Arc<ResponseGate>>>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("gardens", &self.gardens.len())
            .field("plants", &self.plants.len())
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Backend with the sample catalog.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_catalog(clock, default_plant_types())
    }

    /// Backend with a custom catalog.
    #[must_use]
    pub fn with_catalog(clock: Arc<dyn Clock>, catalog: Vec<PlantType>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            gardens: DashMap::new(),
            points: DashMap::new(),
            plants: DashMap::new(),
            next_plant_id: AtomicU64::new(1),
            clock,
            starting_points: DEFAULT_STARTING_POINTS,
            harvest_reward: DEFAULT_HARVEST_REWARD,
            failures: Mutex::new(Failures::default()),
            calls: Mutex::new(AHashMap::new()),
            gates: Mutex::new(AHashMap::new()),
        }
    }

    /// Set the balance given to new gardens.
    #[must_use]
    pub fn starting_points(mut self, points: u64) -> Self {
        self.starting_points = points;
        self
    }

    /// Set the points awarded per harvest.
    #[must_use]
    pub fn harvest_reward(mut self, points: u64) -> Self {
        self.harvest_reward = points;
        self
    }

    /// Overwrites a user's balance.
    pub fn set_points(&self, user: UserId, points: u64) {
        self.points.insert(user, points);
    }

    /// Makes every call of `op` fail with a network error.
    pub fn fail_op(&self, op: RemoteOp) {
        self.failures.lock().ops.insert(op);
    }

    /// Makes every call about `plant` fail with a network error.
    pub fn fail_plant(&self, plant: PlantId) {
        self.failures.lock().plants.insert(plant);
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        let mut failures = self.failures.lock();
        failures.ops.clear();
        failures.plants.clear();
    }

    /// Holds responses of `op` until released through the gate.
    ///
    /// Only `update_growth` and `plant_seed` are gated.
    pub fn gate(&self, op: RemoteOp) -> Arc<ResponseGate> {
        let gate = Arc::new(ResponseGate::default());
        self.gates.lock().insert(op, Arc::clone(&gate));
        gate
    }

    async fn hold(&self, op: RemoteOp) {
        let gate = self.gates.lock().get(&op).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }
    }

    /// Number of times `op` has been called.
    #[must_use]
    pub fn call_count(&self, op: RemoteOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Stored record of a plant.
    #[must_use]
    pub fn plant(&self, id: PlantId) -> Option<PlantRecord> {
        self.plants.get(&id).map(|p| p.record.clone())
    }

    fn check(&self, op: RemoteOp, plant: Option<PlantId>) -> RemoteResult<()> {
        *self.calls.lock().entry(op).or_insert(0) += 1;

        let failures = self.failures.lock();
        let plant_down = plant.is_some_and(|id| failures.plants.contains(&id));
        if failures.ops.contains(&op) || plant_down {
            debug!("Injected failure for {}", op.name());
            return Err(RemoteError::Network(format!("{} unavailable", op.name())));
        }
        Ok(())
    }

    fn plant_type(&self, id: PlantTypeId) -> Option<PlantType> {
        self.catalog.read().iter().find(|t| t.id == id).cloned()
    }

    fn snapshot_for(&self, user: UserId) -> Option<GardenSnapshot> {
        let garden = self.gardens.get(&user)?;
        let controls = garden
            .controls
            .iter()
            .enumerate()
            .map(|(row, c)| ControlRecord::new(row, *c))
            .collect();
        drop(garden);

        let mut plants: Vec<PlantRecord> = self
            .plants
            .iter()
            .filter(|p| p.owner == user)
            .map(|p| p.record.clone())
            .collect();
        plants.sort_by_key(|p| p.id);
        Some(GardenSnapshot { controls, plants })
    }

    fn missing(plant: PlantId) -> RemoteError {
        RemoteError::NotFound(format!("plant {plant}"))
    }

    fn do_create_garden(&self, user: UserId) -> GardenSnapshot {
        self.gardens.entry(user).or_insert_with(|| UserGarden {
            controls: [RowControls::default(); GRID_SIZE],
        });
        self.points.entry(user).or_insert(self.starting_points);
        self.snapshot_for(user).unwrap_or_default()
    }

    fn do_plant_seed(
        &self,
        user: UserId,
        plant_type: PlantTypeId,
        x: usize,
        y: usize,
    ) -> RemoteResult<PlantRecord> {
        if !self.gardens.contains_key(&user) {
            return Err(RemoteError::NotFound(format!("garden of {user}")));
        }
        let def = self
            .plant_type(plant_type)
            .ok_or_else(|| RemoteError::Validation(format!("unknown plant type {plant_type}")))?;
        let pos = CellPos::try_new(y, x).map_err(|e| RemoteError::Validation(e.to_string()))?;
        let occupied = self.plants.iter().any(|p| {
            p.owner == user && p.record.position_x == pos.x() && p.record.position_y == pos.y()
        });
        if occupied {
            return Err(RemoteError::Validation(format!("cell {pos} is occupied")));
        }

        let mut balance = self.points.entry(user).or_insert(0);
        if *balance < def.price {
            return Err(RemoteError::Validation("not enough points".into()));
        }
        *balance -= def.price;
        drop(balance);

        let id = PlantId::new(self.next_plant_id.fetch_add(1, Ordering::Relaxed));
        let record = PlantRecord {
            id,
            plant_type_id: plant_type,
            growth_stage: 1,
            plant_health: MAX_HEALTH,
            position_x: pos.x(),
            position_y: pos.y(),
            has_fruits: false,
            status: PlantStatus::Alive,
            planted_at: self.clock.now(),
            last_harvested: None,
        };
        self.plants.insert(
            id,
            StoredPlant {
                owner: user,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    fn do_update_growth(&self, id: PlantId) -> RemoteResult<GrowthUpdate> {
        let type_id = self
            .plants
            .get(&id)
            .map(|p| p.record.plant_type_id)
            .ok_or_else(|| Self::missing(id))?;
        let def = self
            .plant_type(type_id)
            .ok_or_else(|| RemoteError::Validation(format!("unknown plant type {type_id}")))?;

        let mut stored = self.plants.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        let record = &mut stored.record;
        if record.status == PlantStatus::Alive {
            let update =
                GrowthClock::evaluate(record.planted_at, record.last_harvested, &def, self.clock.now());
            record.growth_stage = update.growth_stage;
            record.has_fruits = update.has_fruits;
        }
        Ok(GrowthUpdate {
            growth_stage: record.growth_stage,
            has_fruits: record.has_fruits,
        })
    }

    fn do_harvest(&self, id: PlantId) -> RemoteResult<HarvestOutcome> {
        let mut stored = self.plants.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        if stored.record.status == PlantStatus::Dead || !stored.record.has_fruits {
            return Err(RemoteError::Validation("nothing to harvest".into()));
        }
        stored.record.has_fruits = false;
        stored.record.last_harvested = Some(self.clock.now());
        let owner = stored.owner;
        drop(stored);

        let mut balance = self.points.entry(owner).or_insert(0);
        *balance = balance.saturating_add(self.harvest_reward);
        Ok(HarvestOutcome {
            points_awarded: self.harvest_reward,
        })
    }

    fn with_plant(&self, id: PlantId, f: impl FnOnce(&mut PlantRecord)) -> RemoteResult<()> {
        let mut stored = self.plants.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        f(&mut stored.record);
        Ok(())
    }
}

impl RemoteSync for MemoryBackend {
    async fn fetch_catalog(&self) -> RemoteResult<Vec<PlantType>> {
        self.check(RemoteOp::FetchCatalog, None)?;
        Ok(self.catalog.read().clone())
    }

    async fn fetch_garden(&self, user: UserId) -> RemoteResult<Option<GardenSnapshot>> {
        self.check(RemoteOp::FetchGarden, None)?;
        Ok(self.snapshot_for(user))
    }

    async fn create_garden(&self, user: UserId) -> RemoteResult<GardenSnapshot> {
        self.check(RemoteOp::CreateGarden, None)?;
        Ok(self.do_create_garden(user))
    }

    async fn fetch_points(&self, user: UserId) -> RemoteResult<u64> {
        self.check(RemoteOp::FetchPoints, None)?;
        self.points
            .get(&user)
            .map(|p| *p)
            .ok_or_else(|| RemoteError::NotFound(format!("points of {user}")))
    }

    async fn update_row_controls(
        &self,
        user: UserId,
        row: usize,
        controls: RowControls,
    ) -> RemoteResult<()> {
        self.check(RemoteOp::UpdateRowControls, None)?;
        if row >= GRID_SIZE {
            return Err(RemoteError::Validation(format!("row {row} out of range")));
        }
        let mut garden = self
            .gardens
            .get_mut(&user)
            .ok_or_else(|| RemoteError::NotFound(format!("garden of {user}")))?;
        garden.controls[row] = controls;
        Ok(())
    }

    async fn plant_seed(
        &self,
        user: UserId,
        plant_type: PlantTypeId,
        x: usize,
        y: usize,
    ) -> RemoteResult<PlantRecord> {
        self.check(RemoteOp::PlantSeed, None)?;
        let record = self.do_plant_seed(user, plant_type, x, y);
        self.hold(RemoteOp::PlantSeed).await;
        record
    }

    async fn update_growth(&self, plant: PlantId) -> RemoteResult<GrowthUpdate> {
        self.check(RemoteOp::UpdateGrowth, Some(plant))?;
        let update = self.do_update_growth(plant);
        self.hold(RemoteOp::UpdateGrowth).await;
        update
    }

    async fn update_health(&self, plant: PlantId, health: f32) -> RemoteResult<()> {
        self.check(RemoteOp::UpdateHealth, Some(plant))?;
        self.with_plant(plant, |record| {
            record.plant_health = health.clamp(0.0, MAX_HEALTH);
        })
    }

    async fn kill_plant(&self, plant: PlantId) -> RemoteResult<()> {
        self.check(RemoteOp::KillPlant, Some(plant))?;
        self.with_plant(plant, |record| {
            record.status = PlantStatus::Dead;
            record.plant_health = 0.0;
            record.growth_stage = 0;
            record.has_fruits = false;
        })
    }

    async fn remove_plant(&self, plant: PlantId) -> RemoteResult<()> {
        self.check(RemoteOp::RemovePlant, Some(plant))?;
        self.plants
            .remove(&plant)
            .map(|_| ())
            .ok_or_else(|| Self::missing(plant))
    }

    async fn harvest_fruit(&self, plant: PlantId) -> RemoteResult<HarvestOutcome> {
        self.check(RemoteOp::HarvestFruit, Some(plant))?;
        self.do_harvest(plant)
    }
}
