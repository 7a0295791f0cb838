//! Health decay and growth-stage rules.
//!
//! Health is a pure function of a row's controls and a plant type's
//! requirements, so it is computed locally every tick. Growth depends on
//! elapsed wall-clock time since planting and is computed by [`GrowthClock`],
//! either on the backend or locally.

use crate::catalog::{PlantType, Requirements, MAX_GROWTH_STAGE};
use crate::grid::{Plant, RowControls, MAX_HEALTH};
use crate::remote::GrowthUpdate;

/// Health lost per point of mismatch each tick.
pub const HEALTH_DECAY_PER_POINT: f32 = 0.5;

/// Sum of absolute differences between controls and requirements.
#[must_use]
pub fn mismatch(controls: RowControls, requirements: Requirements) -> u32 {
    u32::from(controls.light.abs_diff(requirements.light))
        + u32::from(controls.water.abs_diff(requirements.water))
        + u32::from(controls.nutrients.abs_diff(requirements.nutrients))
}

/// Health after one tick under a given mismatch, clamped to `[0, 100]`.
#[must_use]
pub fn decay_health(health: f32, mismatch: u32) -> f32 {
    (health - mismatch as f32 * HEALTH_DECAY_PER_POINT).clamp(0.0, MAX_HEALTH)
}

/// Outcome of the health step for one plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthStep {
    /// The plant lives on with this health.
    Survives(f32),
    /// Health reached zero.
    Dies,
}

/// Runs the health step for a plant.
#[must_use]
pub fn health_step(plant: &Plant, controls: RowControls, plant_type: &PlantType) -> HealthStep {
    let new_health = decay_health(plant.health(), mismatch(controls, plant_type.requirements));
    if new_health <= 0.0 {
        HealthStep::Dies
    } else {
        HealthStep::Survives(new_health)
    }
}

/// Elapsed-time growth model.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrowthClock;

impl GrowthClock {
    /// Stage reached after `elapsed` seconds of a `growth_duration` second cycle.
    ///
    /// Starts at 1, reaches 2 halfway, and 3 (mature) at `growth_duration`.
    #[must_use]
    pub fn stage_at(elapsed: u64, growth_duration: u64) -> u32 {
        if growth_duration == 0 {
            return MAX_GROWTH_STAGE;
        }
        let steps = elapsed.saturating_mul(u64::from(MAX_GROWTH_STAGE - 1)) / growth_duration;
        (1 + steps).min(u64::from(MAX_GROWTH_STAGE)) as u32
    }

    /// Growth stage and fruit flag of a plant at `now`.
    ///
    /// Fruit appears once the plant is mature and a full fruit cycle has
    /// passed since maturity or the last harvest.
    #[must_use]
    pub fn evaluate(
        planted_at: u64,
        last_harvested: Option<u64>,
        plant_type: &PlantType,
        now: u64,
    ) -> GrowthUpdate {
        let elapsed = now.saturating_sub(planted_at);
        let growth_stage = Self::stage_at(elapsed, plant_type.growth_duration);
        if growth_stage < MAX_GROWTH_STAGE {
            return GrowthUpdate {
                growth_stage,
                has_fruits: false,
            };
        }

        let matured_at = planted_at.saturating_add(plant_type.growth_duration);
        let cycle_start = last_harvested.map_or(matured_at, |h| h.max(matured_at));
        GrowthUpdate {
            growth_stage,
            has_fruits: now >= cycle_start.saturating_add(plant_type.fruit_cycle()),
        }
    }

    /// Growth of an in-grid plant at `now`.
    #[must_use]
    pub fn evaluate_plant(plant: &Plant, plant_type: &PlantType, now: u64) -> GrowthUpdate {
        Self::evaluate(plant.planted_at(), plant.last_harvested(), plant_type, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::PlantHandle;
    use huerto_common::{PlantId, PlantTypeId};
    use proptest::prelude::*;

    fn plant_type(light: i64, water: i64, nutrients: i64) -> PlantType {
        PlantType::builder(PlantTypeId::new(1), "Test")
            .requirements(light, water, nutrients)
            .growth_duration(100)
            .fruit_production_time(40)
            .build()
    }

    fn plant_with_health(health: f32) -> Plant {
        let mut plant =
            Plant::seedling(PlantTypeId::new(1), PlantHandle::Persisted(PlantId::new(1)), 0);
        plant.set_health(health);
        plant
    }

    #[test]
    fn test_matching_controls_keep_health() {
        let step = health_step(
            &plant_with_health(100.0),
            RowControls::new(50, 50, 50),
            &plant_type(50, 50, 50),
        );
        assert_eq!(step, HealthStep::Survives(100.0));
    }

    #[test]
    fn test_extreme_mismatch_kills() {
        let controls = RowControls::new(100, 100, 100);
        let def = plant_type(0, 0, 0);
        assert_eq!(mismatch(controls, def.requirements), 300);
        assert_eq!(decay_health(100.0, 300), 0.0);
        assert_eq!(health_step(&plant_with_health(100.0), controls, &def), HealthStep::Dies);
    }

    #[test]
    fn test_fractional_decay() {
        // mismatch 3 -> 1.5 health lost
        let step = health_step(
            &plant_with_health(90.0),
            RowControls::new(51, 49, 51),
            &plant_type(50, 50, 50),
        );
        assert_eq!(step, HealthStep::Survives(88.5));
    }

    #[test]
    fn test_stage_progression() {
        assert_eq!(GrowthClock::stage_at(0, 100), 1);
        assert_eq!(GrowthClock::stage_at(49, 100), 1);
        assert_eq!(GrowthClock::stage_at(50, 100), 2);
        assert_eq!(GrowthClock::stage_at(100, 100), 3);
        assert_eq!(GrowthClock::stage_at(10_000, 100), 3);
        assert_eq!(GrowthClock::stage_at(0, 0), 3);
    }

    #[test]
    fn test_fruit_cycle() {
        let def = plant_type(50, 50, 50);

        // Mature at 100, fruit at 140
        assert!(!GrowthClock::evaluate(0, None, &def, 120).has_fruits);
        assert_eq!(
            GrowthClock::evaluate(0, None, &def, 140),
            GrowthUpdate {
                growth_stage: 3,
                has_fruits: true
            }
        );

        // Harvested at 150: next fruit at 190
        assert!(!GrowthClock::evaluate(0, Some(150), &def, 170).has_fruits);
        assert!(GrowthClock::evaluate(0, Some(150), &def, 190).has_fruits);
    }

    proptest! {
        #[test]
        fn prop_health_decay_matches_formula(
            health in 0.0f32..=100.0,
            light in 0i64..=100, water in 0i64..=100, nutrients in 0i64..=100,
            req_light in 0i64..=100, req_water in 0i64..=100, req_nutrients in 0i64..=100,
        ) {
            let controls = RowControls::new(light, water, nutrients);
            let def = plant_type(req_light, req_water, req_nutrients);
            let m = (light - req_light).abs() + (water - req_water).abs()
                + (nutrients - req_nutrients).abs();
            let expected = (health - 0.5 * m as f32).clamp(0.0, 100.0);

            prop_assert_eq!(mismatch(controls, def.requirements), m as u32);
            match health_step(&plant_with_health(health), controls, &def) {
                HealthStep::Survives(h) => {
                    prop_assert!(h > 0.0);
                    prop_assert!((h - expected).abs() < 1e-3);
                },
                HealthStep::Dies => prop_assert_eq!(expected, 0.0),
            }
        }

        #[test]
        fn prop_stage_is_monotonic(a in 0u64..10_000, b in 0u64..10_000, duration in 1u64..5_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(GrowthClock::stage_at(lo, duration) <= GrowthClock::stage_at(hi, duration));
            prop_assert!((1..=MAX_GROWTH_STAGE).contains(&GrowthClock::stage_at(hi, duration)));
        }
    }
}
