//! Demo run: one garden session against the in-memory backend.

use std::sync::Arc;

use anyhow::{Context, Result};
use huerto_common::{CellPos, GardenError, PlantTypeId, UserId, GRID_SIZE};
use huerto_garden::{
    Cell, Clock, ControlKind, GardenEvent, GardenSession, GardenView, ManualClock, MemoryBackend,
    SystemClock,
};
use tracing::{debug, info, warn};

use crate::config::HuertoConfig;

/// Runs the demo described by `config`.
pub async fn run(config: &HuertoConfig) -> Result<()> {
    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let backend = Arc::new(
        MemoryBackend::new(clock.clone())
            .starting_points(config.starting_points)
            .harvest_reward(config.harvest_reward),
    );
    let session = GardenSession::open(
        backend,
        UserId::new(config.user_id),
        clock.clone(),
        config.growth_authority,
    )
    .await
    .context("failed to open garden")?;

    let mut rng = match config.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    plant_rows(&session, &mut rng).await?;

    // Give the first row a little more water than anything needs
    session
        .garden()
        .set_row_control(0, ControlKind::Water, 70)
        .await?;

    let ticker = session.start_ticker(config.tick_interval());
    for tick in 1..=config.demo_ticks {
        tokio::time::sleep(config.tick_interval()).await;
        clock.advance(config.sim_seconds_per_tick);
        harvest_all(&session).await;
        log_events(&session);
        info!("Tick {tick}, {} points\n{}", session.garden().points(), render(&session.view()));
    }
    ticker.stop().await;

    let view = session.view();
    debug!("Final garden: {}", serde_json::to_string(&view)?);
    info!("Demo finished with {} points", view.points);
    Ok(())
}

/// Pots and plants one random cell per row while points last.
async fn plant_rows(session: &GardenSession<MemoryBackend>, rng: &mut fastrand::Rng) -> Result<()> {
    let garden = session.garden();
    let types: Vec<PlantTypeId> = garden.catalog().iter().map(|t| t.id).collect();
    if types.is_empty() {
        warn!("Catalog is empty, nothing to plant");
        return Ok(());
    }

    for row in 0..GRID_SIZE {
        let col = rng.usize(..GRID_SIZE);
        let plant_type = types[rng.usize(..types.len())];
        garden.place_pot(row, col)?;
        match garden.plant_seed(row, col, plant_type).await {
            Ok(id) => info!("Planted {} at ({}, {}) as {}", plant_type, row, col, id),
            Err(e @ GardenError::InsufficientFunds { .. }) => {
                info!("{e}, leaving the rest of the garden as pots");
                break;
            },
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn harvest_all(session: &GardenSession<MemoryBackend>) {
    let ripe: Vec<CellPos> = session
        .view()
        .grid
        .iter()
        .filter(|(_, cell)| cell.has_fruit())
        .map(|(pos, _)| pos)
        .collect();

    for pos in ripe {
        if let Err(e) = session.garden().harvest_fruit(pos.row, pos.col).await {
            warn!("Harvest at {} failed: {}", pos, e);
        }
    }
}

fn log_events(session: &GardenSession<MemoryBackend>) {
    for event in session.garden().events().drain() {
        match event {
            GardenEvent::PlantDied { pos, plant_id } => info!("Plant {} at {} died", plant_id, pos),
            GardenEvent::RemoteFailure { op, message } => warn!("{}: {}", op.name(), message),
            other => debug!(?other, "Garden event"),
        }
    }
}

/// Text rendering of the grid, one line per row.
///
/// `.` soil, `o` pot, `1`-`3` growth stage, `*` fruit, `x` dead.
fn render(view: &GardenView) -> String {
    let mut out = String::with_capacity(GRID_SIZE * (GRID_SIZE + 1));
    for (pos, cell) in view.grid.iter() {
        let symbol = match cell {
            Cell::Empty => '.',
            Cell::Pot => 'o',
            Cell::Planted(plant) if plant.has_fruit() => '*',
            Cell::Planted(plant) => char::from_digit(plant.growth_stage(), 10).unwrap_or('?'),
            Cell::Dead(_) => 'x',
        };
        out.push(symbol);
        if pos.col == GRID_SIZE - 1 && pos.row != GRID_SIZE - 1 {
            out.push('\n');
        }
    }
    out
}
