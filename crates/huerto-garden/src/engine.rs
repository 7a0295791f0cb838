//! Growth/health engine: advances every planted cell by one tick.
//!
//! A tick collects work under the state lock, releases it, performs the
//! remote calls for every cell concurrently, then re-takes the lock to apply
//! each cell's result. A result is only applied if the cell still holds the
//! plant it was computed for.

use futures::future::join_all;
use huerto_common::{CellPos, GardenError, PlantId, RemoteError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::events::GardenEvent;
use crate::garden::GardenState;
use crate::grid::Cell;
use crate::growth::{health_step, GrowthClock, HealthStep};
use crate::handle::{living_plant_mut, GardenHandle};
use crate::remote::{GrowthUpdate, RemoteOp, RemoteSync};

/// Where growth stages and fruit come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthAuthority {
    /// Ask the backend (`updateGrowth`) every tick.
    #[default]
    Remote,
    /// Compute locally from elapsed time since planting.
    Local,
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The previous tick was still running; nothing was done.
    pub skipped: bool,
    /// Cells whose update was applied (including deaths).
    pub updated: usize,
    /// Cells that died this tick.
    pub died: usize,
    /// Cells left unchanged because a remote call failed.
    pub failed: usize,
    /// Results dropped because the cell changed meanwhile.
    pub stale: usize,
}

impl TickReport {
    /// Report for a tick that did not run.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CellJob {
    pos: CellPos,
    plant_id: PlantId,
    revision: u64,
    step: HealthStep,
    local_growth: Option<GrowthUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellOutcome {
    Updated,
    Died,
    Failed,
    Stale,
}

/// Runs ticks; at most one at a time.
#[derive(Debug, Default)]
pub struct GrowthEngine {
    authority: GrowthAuthority,
    in_flight: Mutex<()>,
}

impl GrowthEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(authority: GrowthAuthority) -> Self {
        Self {
            authority,
            in_flight: Mutex::new(()),
        }
    }

    /// Growth source in use.
    #[must_use]
    pub fn authority(&self) -> GrowthAuthority {
        self.authority
    }

    /// Advances every planted cell by one tick.
    ///
    /// Returns immediately with [`TickReport::skipped`] if another tick is
    /// still waiting on the backend.
    pub async fn tick<R: RemoteSync>(&self, garden: &GardenHandle<R>) -> TickReport {
        let Ok(_running) = self.in_flight.try_lock() else {
            debug!("Previous tick still in flight, skipping");
            return TickReport::skipped();
        };

        let now = garden.now();
        let jobs = garden.with_state(|state| self.collect_jobs(state, now));
        let cells: Vec<_> = jobs.into_iter().map(|job| Self::run_job(garden, job)).collect();
        let outcomes = join_all(cells).await;

        let mut report = TickReport::default();
        for outcome in outcomes {
            match outcome {
                CellOutcome::Updated => report.updated += 1,
                CellOutcome::Died => {
                    report.updated += 1;
                    report.died += 1;
                },
                CellOutcome::Failed => report.failed += 1,
                CellOutcome::Stale => report.stale += 1,
            }
        }
        debug!(?report, "Tick complete");
        report
    }

    fn collect_jobs(&self, state: &GardenState, now: u64) -> Vec<CellJob> {
        let mut jobs = Vec::new();
        for (pos, cell) in state.grid().iter() {
            let Cell::Planted(plant) = cell else {
                continue;
            };
            // Plants still waiting for a backend id are skipped until confirmed
            let Some(plant_id) = plant.plant_id() else {
                continue;
            };
            let Some(plant_type) = state.catalog().get(plant.plant_type()) else {
                warn!("Plant {} at {} has unknown type {}", plant_id, pos, plant.plant_type());
                continue;
            };

            let controls = state.grid().controls(pos.row);
            let step = health_step(plant, controls, plant_type);
            let local_growth = match self.authority {
                GrowthAuthority::Local => Some(GrowthClock::evaluate_plant(plant, plant_type, now)),
                GrowthAuthority::Remote => None,
            };
            jobs.push(CellJob {
                pos,
                plant_id,
                revision: plant.revision(),
                step,
                local_growth,
            });
        }
        jobs
    }

    async fn run_job<R: RemoteSync>(garden: &GardenHandle<R>, job: CellJob) -> CellOutcome {
        let CellJob { pos, plant_id, .. } = job;

        let new_health = match job.step {
            HealthStep::Dies => return Self::kill(garden, pos, plant_id).await,
            HealthStep::Survives(health) => health,
        };

        let growth = match job.local_growth {
            Some(growth) => growth,
            None => match garden.remote().update_growth(plant_id).await {
                Ok(growth) => growth,
                Err(e) => return Self::failed(garden, RemoteOp::UpdateGrowth, plant_id, &e),
            },
        };

        if !Self::still_holds(garden, pos, plant_id) {
            return Self::stale(garden, pos, plant_id);
        }
        if let Err(e) = garden.remote().update_health(plant_id, new_health).await {
            return Self::failed(garden, RemoteOp::UpdateHealth, plant_id, &e);
        }

        // A harvest since the jobs were collected makes the growth fields stale
        let applied = garden.with_state_mut(|state| {
            let plant = living_plant_mut(state, pos, plant_id)?;
            plant.set_health(new_health);
            let current = plant.revision == job.revision;
            if current {
                plant.growth_stage = growth.growth_stage;
                plant.has_fruit = growth.has_fruits;
            }
            Some(current)
        });
        match applied {
            Some(true) => {
                debug!(
                    "Plant {} at {}: health {:.1}, stage {}, fruit {}",
                    plant_id, pos, new_health, growth.growth_stage, growth.has_fruits
                );
                CellOutcome::Updated
            },
            Some(false) => {
                debug!(
                    "Plant {} at {}: health {:.1}, growth changed meanwhile",
                    plant_id, pos, new_health
                );
                CellOutcome::Updated
            },
            None => Self::stale(garden, pos, plant_id),
        }
    }

    async fn kill<R: RemoteSync>(
        garden: &GardenHandle<R>,
        pos: CellPos,
        plant_id: PlantId,
    ) -> CellOutcome {
        if let Err(e) = garden.remote().kill_plant(plant_id).await {
            return Self::failed(garden, RemoteOp::KillPlant, plant_id, &e);
        }

        let killed = garden.with_state_mut(|state| {
            let plant = living_plant_mut(state, pos, plant_id)?.clone();
            *state.grid_mut().cell_mut(pos) = Cell::dead(plant);
            Some(())
        });
        match killed {
            Some(()) => {
                info!("Plant {} at {} died", plant_id, pos);
                garden.publish(GardenEvent::PlantDied { pos, plant_id });
                CellOutcome::Died
            },
            None => Self::stale(garden, pos, plant_id),
        }
    }

    fn still_holds<R: RemoteSync>(garden: &GardenHandle<R>, pos: CellPos, plant_id: PlantId) -> bool {
        garden.with_state_mut(|state| living_plant_mut(state, pos, plant_id).is_some())
    }

    fn failed<R: RemoteSync>(
        garden: &GardenHandle<R>,
        op: RemoteOp,
        plant_id: PlantId,
        err: &RemoteError,
    ) -> CellOutcome {
        let err = GardenError::RemoteUnavailable(err.clone());
        warn!("{} failed for plant {}: {}", op.name(), plant_id, err);
        garden.report_failure(op, &err);
        CellOutcome::Failed
    }

    fn stale<R: RemoteSync>(garden: &GardenHandle<R>, pos: CellPos, plant_id: PlantId) -> CellOutcome {
        debug!("{}", GardenError::StaleResponse(plant_id));
        garden.publish(GardenEvent::StaleResponseDiscarded { pos, plant_id });
        CellOutcome::Stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PlantType;
    use crate::clock::ManualClock;
    use crate::grid::{CellKind, RowControls};
    use crate::memory::MemoryBackend;
    use crate::session::GardenSession;
    use huerto_common::{PlantTypeId, UserId};
    use std::sync::Arc;

    const HARDY: PlantTypeId = PlantTypeId::new(10);
    const PICKY: PlantTypeId = PlantTypeId::new(11);

    fn test_catalog() -> Vec<PlantType> {
        vec![
            PlantType::builder(HARDY, "Hardy")
                .requirements(50, 50, 50)
                .growth_duration(100)
                .fruit_production_time(20)
                .price(5)
                .build(),
            PlantType::builder(PICKY, "Picky")
                .requirements(0, 0, 0)
                .growth_duration(100)
                .price(5)
                .build(),
        ]
    }

    async fn session_with(
        authority: GrowthAuthority,
    ) -> (Arc<ManualClock>, Arc<MemoryBackend>, GardenSession<MemoryBackend>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let backend = Arc::new(
            MemoryBackend::with_catalog(clock.clone(), test_catalog()).starting_points(100),
        );
        let session = GardenSession::open(backend.clone(), UserId::new(1), clock.clone(), authority)
            .await
            .expect("open session");
        (clock, backend, session)
    }

    async fn plant(session: &GardenSession<MemoryBackend>, row: usize, col: usize, kind: PlantTypeId) -> PlantId {
        let garden = session.garden();
        garden.place_pot(row, col).expect("pot");
        garden.plant_seed(row, col, kind).await.expect("plant")
    }

    #[tokio::test]
    async fn test_matching_controls_keep_full_health() {
        let (_, _, session) = session_with(GrowthAuthority::Remote).await;
        plant(&session, 0, 0, HARDY).await;

        let report = session.tick().await;
        assert_eq!(report.updated, 1);
        assert_eq!(session.garden().cell(0, 0).expect("cell").health(), Some(100.0));
    }

    #[tokio::test]
    async fn test_extreme_mismatch_kills_plant() {
        let (_, backend, session) = session_with(GrowthAuthority::Remote).await;
        let garden = session.garden();
        garden.with_state_mut(|state| {
            state
                .set_row_controls(2, RowControls::new(100, 100, 100))
                .expect("row");
        });
        let id = plant(&session, 2, 1, PICKY).await;

        let report = session.tick().await;
        assert_eq!(report.died, 1);

        let cell = garden.cell(2, 1).expect("cell");
        assert_eq!(cell.kind(), CellKind::Dead);
        assert_eq!(cell.health(), Some(0.0));
        assert!(!cell.has_fruit());
        assert_eq!(backend.call_count(RemoteOp::KillPlant), 1);
        // A dying plant skips the growth step
        assert_eq!(backend.call_count(RemoteOp::UpdateGrowth), 0);
        assert!(garden
            .events()
            .drain()
            .contains(&GardenEvent::PlantDied {
                pos: CellPos::try_new(2, 1).expect("pos"),
                plant_id: id
            }));

        // Dead plants are not ticked again
        let report = session.tick().await;
        assert_eq!(report, TickReport::default());
    }

    #[tokio::test]
    async fn test_partial_decay_and_growth_merge() {
        let (clock, backend, session) = session_with(GrowthAuthority::Remote).await;
        let garden = session.garden();
        garden.with_state_mut(|state| {
            state
                .set_row_controls(1, RowControls::new(60, 50, 40))
                .expect("row");
        });
        let id = plant(&session, 1, 4, HARDY).await;

        clock.advance(120);
        session.tick().await;

        let cell = garden.cell(1, 4).expect("cell");
        let plant = cell.plant().expect("plant");
        // mismatch 20 -> 10 health lost
        assert_eq!(plant.health(), 90.0);
        assert_eq!(plant.growth_stage(), 3);
        assert!(plant.has_fruit());
        assert_eq!(backend.plant(id).expect("record").plant_health, 90.0);
    }

    #[tokio::test]
    async fn test_local_growth_authority() {
        let (clock, backend, session) = session_with(GrowthAuthority::Local).await;
        plant(&session, 0, 0, HARDY).await;

        clock.advance(50);
        session.tick().await;

        assert_eq!(
            session.garden().cell(0, 0).expect("cell").plant().expect("plant").growth_stage(),
            2
        );
        assert_eq!(backend.call_count(RemoteOp::UpdateGrowth), 0);
        assert_eq!(backend.call_count(RemoteOp::UpdateHealth), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_cell_and_others_continue() {
        let (_, backend, session) = session_with(GrowthAuthority::Remote).await;
        let garden = session.garden();
        garden.with_state_mut(|state| {
            state.set_row_controls(0, RowControls::new(40, 50, 50)).expect("row");
        });
        let broken = plant(&session, 0, 0, HARDY).await;
        plant(&session, 0, 1, HARDY).await;
        backend.fail_plant(broken);

        let report = session.tick().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(garden.cell(0, 0).expect("cell").health(), Some(100.0));
        assert_eq!(garden.cell(0, 1).expect("cell").health(), Some(95.0));

        // Recovered backend: the cell resumes from its last good state
        backend.heal();
        session.tick().await;
        assert_eq!(garden.cell(0, 0).expect("cell").health(), Some(95.0));
    }

    #[tokio::test]
    async fn test_failed_kill_keeps_plant_alive() {
        let (_, backend, session) = session_with(GrowthAuthority::Remote).await;
        let garden = session.garden();
        garden.with_state_mut(|state| {
            state
                .set_row_controls(3, RowControls::new(100, 100, 100))
                .expect("row");
        });
        plant(&session, 3, 3, PICKY).await;
        backend.fail_op(RemoteOp::KillPlant);

        let report = session.tick().await;
        assert_eq!(report.failed, 1);
        let cell = garden.cell(3, 3).expect("cell");
        assert_eq!(cell.kind(), CellKind::Planted);
        assert_eq!(cell.health(), Some(100.0));
    }

    #[tokio::test]
    async fn test_removal_wins_over_in_flight_tick() {
        let (_, backend, session) = session_with(GrowthAuthority::Remote).await;
        let id = plant(&session, 4, 4, HARDY).await;
        let gate = backend.gate(RemoteOp::UpdateGrowth);

        let engine = session.engine();
        let garden = session.garden().clone();
        let tick = tokio::spawn(async move { engine.tick(&garden).await });

        gate.wait_arrival().await;
        // A second tick while the first is in flight is skipped
        assert!(session.tick().await.skipped);

        session.garden().remove_plant(4, 4).await.expect("remove");
        gate.release(1);

        let report = tick.await.expect("tick task");
        assert_eq!(report.stale, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(session.garden().cell(4, 4).expect("cell"), Cell::Empty);
        assert_eq!(backend.call_count(RemoteOp::UpdateHealth), 0);
        assert!(backend.plant(id).is_none());
    }
}
