//! Garden session: loading a user's garden and driving the tick loop.

use std::sync::Arc;
use std::time::Duration;

use huerto_common::{GardenResult, UserId};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::engine::{GrowthAuthority, GrowthEngine, TickReport};
use crate::garden::{GardenState, GardenView};
use crate::handle::GardenHandle;
use crate::points::Points;
use crate::remote::RemoteSync;

/// Default period between growth ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(3);

/// One user's loaded garden.
pub struct GardenSession<R> {
    garden: GardenHandle<R>,
    engine: Arc<GrowthEngine>,
}

impl<R: RemoteSync> GardenSession<R> {
    /// Loads the user's garden, creating it if the backend has none.
    ///
    /// A failed points fetch is logged and leaves the balance at zero.
    pub async fn open(
        remote: Arc<R>,
        user: UserId,
        clock: Arc<dyn Clock>,
        authority: GrowthAuthority,
    ) -> GardenResult<Self> {
        let snapshot = match remote.fetch_garden(user).await? {
            Some(snapshot) => snapshot,
            None => {
                info!("No garden for {}, creating one", user);
                remote.create_garden(user).await?
            },
        };

        let catalog = Catalog::from_types(remote.fetch_catalog().await?);
        let balance = match remote.fetch_points(user).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Could not fetch points for {}: {}", user, e);
                0
            },
        };

        let mut state = GardenState::new(catalog, Points::new(balance));
        state.load_from_remote(&snapshot)?;
        info!(
            "Opened garden of {} ({} plant types, {} points)",
            user,
            state.catalog().len(),
            balance
        );

        Ok(Self {
            garden: GardenHandle::new(state, remote, user, clock),
            engine: Arc::new(GrowthEngine::new(authority)),
        })
    }

    /// Handle for actions and reads.
    #[must_use]
    pub fn garden(&self) -> &GardenHandle<R> {
        &self.garden
    }

    /// The growth engine.
    #[must_use]
    pub fn engine(&self) -> Arc<GrowthEngine> {
        Arc::clone(&self.engine)
    }

    /// Read-only copy of the garden.
    #[must_use]
    pub fn view(&self) -> GardenView {
        self.garden.view()
    }

    /// Runs one growth tick now.
    pub async fn tick(&self) -> TickReport {
        self.engine.tick(&self.garden).await
    }

    /// Starts ticking every `period` on the current tokio runtime.
    ///
    /// The first tick fires one period from now. Ticking stops when the
    /// returned [`Ticker`] is stopped or dropped.
    pub fn start_ticker(&self, period: Duration) -> Ticker {
        let garden = self.garden.clone();
        let engine = Arc::clone(&self.engine);
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        let report = engine.tick(&garden).await;
                        if report.failed > 0 {
                            debug!("{} cells failed to sync this tick", report.failed);
                        }
                    }
                }
            }
            debug!("Ticker stopped");
        });

        info!("Growth ticker started every {:?}", period);
        Ticker {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// Running tick loop. Dropping it cancels the loop.
#[derive(Debug)]
pub struct Ticker {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Stops ticking and waits for an in-progress tick to finish.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }

    /// Whether the loop is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
