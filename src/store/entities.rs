use std::fmt::Display;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;

/// Daily goal used when the user hasn't configured one, or configured
/// something unusable. Kg of CO₂ per day.
pub const DEFAULT_DAILY_GOAL: f64 = 8.0;

pub type RecordId = u64;

/// Fixed set of categories an activity can be logged under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Transport,
    Food,
    Energy,
    Shopping,
    Other,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 5] = [
        ActivityCategory::Transport,
        ActivityCategory::Food,
        ActivityCategory::Energy,
        ActivityCategory::Shopping,
        ActivityCategory::Other,
    ];
}

impl Display for ActivityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityCategory::Transport => write!(f, "transport"),
            ActivityCategory::Food => write!(f, "food"),
            ActivityCategory::Energy => write!(f, "energy"),
            ActivityCategory::Shopping => write!(f, "shopping"),
            ActivityCategory::Other => write!(f, "other"),
        }
    }
}

/// A single logged activity. Records are immutable once created, the only
/// mutation the store supports for them is deletion.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: RecordId,
    pub category: ActivityCategory,
    /// Denormalized display label, for example "Drive 10km".
    pub name: Arc<str>,
    /// Kg of CO₂ equivalent. For reduction records this is the amount
    /// avoided, not emitted.
    pub carbon_kg: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub is_reduction: bool,
}

/// The struct used for storing state on the disk. The whole value is written
/// out on every mutation, so the `Default` impl doubles as the state of a
/// fresh install.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSnapshot {
    pub activities: Vec<ActivityRecord>,
    pub daily_goal: f64,
    pub api_key: String,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            activities: vec![],
            daily_goal: DEFAULT_DAILY_GOAL,
            api_key: String::new(),
        }
    }
}
