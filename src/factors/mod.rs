//! Static emission factor table and the activity presets built on top of it.
//! Everything here is a process wide constant, never mutated at runtime.

use std::fmt::Display;

use clap::ValueEnum;

use crate::store::entities::ActivityCategory;

/// Closed set of emission factor keys. Keeping the set closed means a preset
/// can never reference a factor that doesn't exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FactorKey {
    CarKm,
    BusKm,
    SubwayKm,
    BikeKm,
    WalkKm,
    PlaneKm,
    TrainKm,
    BeefMeal,
    PorkMeal,
    ChickenMeal,
    VegetarianMeal,
    ElectricityKwh,
    NaturalGasM3,
    ClothesItem,
    Electronics,
    PlasticBag,
}

impl FactorKey {
    /// Kg of CO₂ equivalent emitted (or avoided, for reduction presets) per
    /// unit of activity.
    pub fn kg_per_unit(self) -> f64 {
        match self {
            FactorKey::CarKm => 0.21,
            FactorKey::BusKm => 0.089,
            FactorKey::SubwayKm => 0.035,
            FactorKey::BikeKm => 0.,
            FactorKey::WalkKm => 0.,
            FactorKey::PlaneKm => 0.255,
            FactorKey::TrainKm => 0.041,
            FactorKey::BeefMeal => 6.61,
            FactorKey::PorkMeal => 1.72,
            FactorKey::ChickenMeal => 0.98,
            FactorKey::VegetarianMeal => 0.39,
            FactorKey::ElectricityKwh => 0.785,
            FactorKey::NaturalGasM3 => 2.09,
            FactorKey::ClothesItem => 10.,
            FactorKey::Electronics => 50.,
            FactorKey::PlasticBag => 0.01,
        }
    }
}

impl Display for FactorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self
            .to_possible_value()
            .expect("no skipped variants in FactorKey");
        write!(f, "{}", value.get_name())
    }
}

/// Template for a single logged activity. Presets only drive the input
/// surface, they are not part of the persisted state.
#[derive(Debug, Clone, Copy)]
pub struct ActivityPreset {
    pub name: &'static str,
    pub factor: FactorKey,
    pub unit: &'static str,
    pub icon: &'static str,
    pub is_reduction: bool,
}

const TRANSPORT_PRESETS: &[ActivityPreset] = &[
    ActivityPreset {
        name: "Drive",
        factor: FactorKey::CarKm,
        unit: "km",
        icon: "🚗",
        is_reduction: false,
    },
    ActivityPreset {
        name: "Bus",
        factor: FactorKey::BusKm,
        unit: "km",
        icon: "🚌",
        is_reduction: true,
    },
    ActivityPreset {
        name: "Metro",
        factor: FactorKey::SubwayKm,
        unit: "km",
        icon: "🚇",
        is_reduction: true,
    },
    ActivityPreset {
        name: "Cycle",
        factor: FactorKey::BikeKm,
        unit: "km",
        icon: "🚲",
        is_reduction: true,
    },
    ActivityPreset {
        name: "Walk",
        factor: FactorKey::WalkKm,
        unit: "km",
        icon: "🚶",
        is_reduction: true,
    },
    ActivityPreset {
        name: "Flight",
        factor: FactorKey::PlaneKm,
        unit: "km",
        icon: "✈️",
        is_reduction: false,
    },
    ActivityPreset {
        name: "High-speed rail",
        factor: FactorKey::TrainKm,
        unit: "km",
        icon: "🚄",
        is_reduction: true,
    },
];

const FOOD_PRESETS: &[ActivityPreset] = &[
    ActivityPreset {
        name: "Beef meal",
        factor: FactorKey::BeefMeal,
        unit: "meal",
        icon: "🥩",
        is_reduction: false,
    },
    ActivityPreset {
        name: "Pork meal",
        factor: FactorKey::PorkMeal,
        unit: "meal",
        icon: "🍖",
        is_reduction: false,
    },
    ActivityPreset {
        name: "Chicken meal",
        factor: FactorKey::ChickenMeal,
        unit: "meal",
        icon: "🍗",
        is_reduction: false,
    },
    ActivityPreset {
        name: "Vegetarian meal",
        factor: FactorKey::VegetarianMeal,
        unit: "meal",
        icon: "🥗",
        is_reduction: true,
    },
];

const ENERGY_PRESETS: &[ActivityPreset] = &[
    ActivityPreset {
        name: "Electricity",
        factor: FactorKey::ElectricityKwh,
        unit: "kWh",
        icon: "⚡",
        is_reduction: false,
    },
    ActivityPreset {
        name: "Natural gas",
        factor: FactorKey::NaturalGasM3,
        unit: "m³",
        icon: "🔥",
        is_reduction: false,
    },
];

const SHOPPING_PRESETS: &[ActivityPreset] = &[
    ActivityPreset {
        name: "New clothes",
        factor: FactorKey::ClothesItem,
        unit: "item",
        icon: "👕",
        is_reduction: false,
    },
    ActivityPreset {
        name: "Electronics",
        factor: FactorKey::Electronics,
        unit: "item",
        icon: "📱",
        is_reduction: false,
    },
    ActivityPreset {
        name: "Plastic bag",
        factor: FactorKey::PlasticBag,
        unit: "bag",
        icon: "🛍️",
        is_reduction: false,
    },
];

/// Ordered presets for a category. Categories without presets ("other")
/// return an empty slice.
pub fn presets_for(category: ActivityCategory) -> &'static [ActivityPreset] {
    match category {
        ActivityCategory::Transport => TRANSPORT_PRESETS,
        ActivityCategory::Food => FOOD_PRESETS,
        ActivityCategory::Energy => ENERGY_PRESETS,
        ActivityCategory::Shopping => SHOPPING_PRESETS,
        ActivityCategory::Other => &[],
    }
}

/// Finds the preset a factor key belongs to, together with its category.
/// Every key is referenced by exactly one preset, so a miss here is a bug in
/// the tables above, not a runtime condition.
pub fn preset_by_key(key: FactorKey) -> (ActivityCategory, &'static ActivityPreset) {
    for category in ActivityCategory::ALL {
        if let Some(preset) = presets_for(category).iter().find(|p| p.factor == key) {
            return (category, preset);
        }
    }
    unreachable!("factor key {key} is not referenced by any preset")
}
