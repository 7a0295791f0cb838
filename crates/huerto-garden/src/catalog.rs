//! Plant-type catalog.
//!
//! This module provides the static reference data the simulation reads:
//! - Environmental requirements on the canonical 0-100 scale
//! - Growth duration and fruit cycle timing
//! - One image per growth stage
//! - Seed price

use huerto_common::PlantTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest growth stage a plant can reach. Stage 3 is mature.
pub const MAX_GROWTH_STAGE: u32 = 3;

/// Upper bound of every control and requirement value.
pub const MAX_LEVEL: u8 = 100;

/// Clamps a raw level into `[0, MAX_LEVEL]`.
#[must_use]
pub fn clamp_level(value: i64) -> u8 {
    value.clamp(0, i64::from(MAX_LEVEL)) as u8
}

/// Light, water and nutrient levels a plant type thrives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// Light level (0-100).
    pub light: u8,
    /// Water level (0-100).
    pub water: u8,
    /// Nutrient level (0-100).
    pub nutrients: u8,
}

impl Requirements {
    /// Creates requirements on the canonical 0-100 scale, clamping each value.
    #[must_use]
    pub fn new(light: i64, water: i64, nutrients: i64) -> Self {
        Self {
            light: clamp_level(light),
            water: clamp_level(water),
            nutrients: clamp_level(nutrients),
        }
    }

    /// Converts values entered on the admin form's 1-5 scale.
    ///
    /// 1 maps to 0 and 5 maps to 100, in steps of 25.
    #[must_use]
    pub fn from_form_scale(light: i64, water: i64, nutrients: i64) -> Self {
        let convert = |v: i64| (v.clamp(1, 5) - 1) * 25;
        Self::new(convert(light), convert(water), convert(nutrients))
    }
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            light: 50,
            water: 50,
            nutrients: 50,
        }
    }
}

/// Definition of a plant species offered in the seed catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantType {
    /// Unique identifier.
    pub id: PlantTypeId,
    /// Display name.
    pub name: String,
    /// Environmental requirements.
    #[serde(flatten)]
    pub requirements: Requirements,
    /// Seconds from planting until the plant is mature.
    pub growth_duration: u64,
    /// Seconds between fruit cycles once mature. Falls back to the growth duration.
    #[serde(default)]
    pub fruit_production_time: Option<u64>,
    /// Image references, one per growth stage.
    #[serde(default)]
    pub images: Vec<String>,
    /// Points needed to plant a seed.
    #[serde(alias = "precio")]
    pub price: u64,
}

impl PlantType {
    /// Create a new plant type builder.
    #[must_use]
    pub fn builder(id: PlantTypeId, name: &str) -> PlantTypeBuilder {
        PlantTypeBuilder::new(id, name)
    }

    /// Seconds between fruit cycles once the plant is mature.
    #[must_use]
    pub fn fruit_cycle(&self) -> u64 {
        self.fruit_production_time.unwrap_or(self.growth_duration)
    }

    /// Image to show for a growth stage.
    ///
    /// Stage 1 selects the first image; out-of-range stages are clamped to
    /// the available images.
    #[must_use]
    pub fn image_for_stage(&self, stage: u32) -> Option<&str> {
        let last = self.images.len().checked_sub(1)?;
        let index = (stage.saturating_sub(1) as usize).min(last);
        self.images.get(index).map(String::as_str)
    }
}

/// Growth progress shown on the stage bar, in percent.
#[must_use]
pub fn growth_progress_percent(stage: u32) -> f32 {
    (stage.min(MAX_GROWTH_STAGE) as f32 / MAX_GROWTH_STAGE as f32) * 100.0
}

/// Builder for plant types.
#[derive(Debug)]
pub struct PlantTypeBuilder {
    def: PlantType,
}

impl PlantTypeBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(id: PlantTypeId, name: &str) -> Self {
        Self {
            def: PlantType {
                id,
                name: name.to_string(),
                requirements: Requirements::default(),
                growth_duration: 180, // 3 minutes
                fruit_production_time: None,
                images: Vec::new(),
                price: 10,
            },
        }
    }

    /// Set requirements on the canonical 0-100 scale.
    #[must_use]
    pub fn requirements(mut self, light: i64, water: i64, nutrients: i64) -> Self {
        self.def.requirements = Requirements::new(light, water, nutrients);
        self
    }

    /// Set growth duration in seconds.
    #[must_use]
    pub fn growth_duration(mut self, secs: u64) -> Self {
        self.def.growth_duration = secs;
        self
    }

    /// Set the fruit cycle in seconds.
    #[must_use]
    pub fn fruit_production_time(mut self, secs: u64) -> Self {
        self.def.fruit_production_time = Some(secs);
        self
    }

    /// Append a stage image.
    #[must_use]
    pub fn image(mut self, path: &str) -> Self {
        self.def.images.push(path.to_string());
        self
    }

    /// Set seed price.
    #[must_use]
    pub fn price(mut self, price: u64) -> Self {
        self.def.price = price;
        self
    }

    /// Build the plant type.
    #[must_use]
    pub fn build(self) -> PlantType {
        self.def
    }
}

/// Well-known plant type IDs used by the bundled catalog.
pub mod plant_types {
    use super::PlantTypeId;

    /// Lettuce.
    pub const LETTUCE: PlantTypeId = PlantTypeId::new(1);
    /// Tomato.
    pub const TOMATO: PlantTypeId = PlantTypeId::new(2);
    /// Carrot.
    pub const CARROT: PlantTypeId = PlantTypeId::new(3);
    /// Strawberry.
    pub const STRAWBERRY: PlantTypeId = PlantTypeId::new(4);
}

/// Loaded set of plant types, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: BTreeMap<PlantTypeId, PlantType>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of plant types. Later duplicates win.
    #[must_use]
    pub fn from_types(types: Vec<PlantType>) -> Self {
        let mut catalog = Self::new();
        for plant_type in types {
            catalog.register(plant_type);
        }
        catalog
    }

    /// Catalog with a handful of sample species.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::from_types(default_plant_types())
    }

    /// Register a plant type.
    pub fn register(&mut self, plant_type: PlantType) {
        self.types.insert(plant_type.id, plant_type);
    }

    /// Get a plant type by ID.
    #[must_use]
    pub fn get(&self, id: PlantTypeId) -> Option<&PlantType> {
        self.types.get(&id)
    }

    /// Whether the catalog knows a plant type.
    #[must_use]
    pub fn contains(&self, id: PlantTypeId) -> bool {
        self.types.contains_key(&id)
    }

    /// Iterate over all plant types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PlantType> {
        self.types.values()
    }

    /// Number of plant types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Sample species used by the demo binary and the in-memory backend.
#[must_use]
pub fn default_plant_types() -> Vec<PlantType> {
    vec![
        PlantType::builder(plant_types::LETTUCE, "Lechuga")
            .requirements(50, 60, 40)
            .growth_duration(60)
            .fruit_production_time(30)
            .image("/images/huerto/lechuga-1.png")
            .image("/images/huerto/lechuga-2.png")
            .image("/images/huerto/lechuga-3.png")
            .price(5)
            .build(),
        PlantType::builder(plant_types::TOMATO, "Tomate")
            .requirements(80, 60, 60)
            .growth_duration(180)
            .fruit_production_time(60)
            .image("/images/huerto/tomate-1.png")
            .image("/images/huerto/tomate-2.png")
            .image("/images/huerto/tomate-3.png")
            .price(15)
            .build(),
        PlantType::builder(plant_types::CARROT, "Zanahoria")
            .requirements(60, 40, 70)
            .growth_duration(120)
            .image("/images/huerto/zanahoria-1.png")
            .image("/images/huerto/zanahoria-2.png")
            .image("/images/huerto/zanahoria-3.png")
            .price(10)
            .build(),
        PlantType::builder(plant_types::STRAWBERRY, "Fresa")
            .requirements(70, 70, 50)
            .growth_duration(240)
            .fruit_production_time(90)
            .image("/images/huerto/fresa-1.png")
            .image("/images/huerto/fresa-2.png")
            .image("/images/huerto/fresa-3.png")
            .price(20)
            .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_type_builder() {
        let def = PlantType::builder(PlantTypeId::new(9), "Test Plant")
            .requirements(10, 20, 130)
            .growth_duration(90)
            .price(7)
            .build();

        assert_eq!(def.name, "Test Plant");
        assert_eq!(def.requirements, Requirements::new(10, 20, 100));
        assert_eq!(def.fruit_cycle(), 90);
        assert_eq!(def.price, 7);
    }

    #[test]
    fn test_form_scale_conversion() {
        assert_eq!(Requirements::from_form_scale(1, 3, 5), Requirements::new(0, 50, 100));
        // Out-of-range form values are clamped before conversion
        assert_eq!(Requirements::from_form_scale(0, 9, 2), Requirements::new(0, 100, 25));
    }

    #[test]
    fn test_image_for_stage() {
        let def = PlantType::builder(PlantTypeId::new(1), "Three")
            .image("a")
            .image("b")
            .image("c")
            .build();

        assert_eq!(def.image_for_stage(0), Some("a"));
        assert_eq!(def.image_for_stage(1), Some("a"));
        assert_eq!(def.image_for_stage(3), Some("c"));
        assert_eq!(def.image_for_stage(12), Some("c"));

        let bare = PlantType::builder(PlantTypeId::new(2), "Bare").build();
        assert_eq!(bare.image_for_stage(1), None);
    }

    #[test]
    fn test_growth_progress() {
        assert!((growth_progress_percent(0) - 0.0).abs() < 0.01);
        assert!((growth_progress_percent(1) - 33.33).abs() < 0.01);
        assert!((growth_progress_percent(3) - 100.0).abs() < 0.01);
        assert!((growth_progress_percent(7) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::with_defaults();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.contains(plant_types::TOMATO));
        assert!(catalog.get(PlantTypeId::new(99)).is_none());
    }

    #[test]
    fn test_catalog_wire_format() {
        let json = r#"[{
            "id": 3,
            "name": "Zanahoria",
            "light": 60,
            "water": 40,
            "nutrients": 70,
            "growthDuration": 120,
            "images": ["/a.png", "/b.png"],
            "precio": 12
        }]"#;

        let types: Vec<PlantType> = serde_json::from_str(json).expect("parse catalog");
        let catalog = Catalog::from_types(types);
        let carrot = catalog.get(PlantTypeId::new(3)).expect("carrot");
        assert_eq!(carrot.price, 12);
        assert_eq!(carrot.requirements.water, 40);
        assert_eq!(carrot.fruit_production_time, None);
        assert_eq!(carrot.images.len(), 2);
    }
}
