use serde::{Deserialize, Serialize};

use crate::constants::{
    MIN_SHIP_SPEED, MS_PER_SECOND, TRIP_BASE_SECONDS, TRIP_SECONDS_PER_DIFFICULTY,
};
use crate::numbers::{floor_f64_to_u64, u64_to_f64};
use crate::resources::RewardTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDrop {
    pub item_id: String,
    pub chance: f64,
}

/// A destination for live expeditions and autopilot trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: u32,
    pub fuel_cost: u64,
    pub required_attack: f64,
    pub required_defense: f64,
    pub xp_reward: u64,
    #[serde(default)]
    pub enemy_chance: f64,
    #[serde(default)]
    pub hazard_chance: f64,
    #[serde(default)]
    pub capsule_chance: f64,
    #[serde(default)]
    pub rewards: RewardTable,
    #[serde(default)]
    pub item_drop: Option<ItemDrop>,
}

impl Location {
    /// Live trip length for a ship of the given speed.
    #[must_use]
    pub fn trip_duration_ms(&self, speed: f64) -> u64 {
        trip_duration_ms(self.difficulty, speed)
    }
}

/// A long-haul destination resolved in one batch when the trip ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepSpaceLocation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: u32,
    pub min_duration_hours: u32,
    pub max_duration_hours: u32,
    pub xp_per_hour: u64,
    #[serde(default)]
    pub rewards_per_hour: RewardTable,
    #[serde(default)]
    pub event_chance_per_hour: f64,
}

/// `60s + difficulty × 30s / speed`, in milliseconds.
#[must_use]
pub fn trip_duration_ms(difficulty: u32, speed: f64) -> u64 {
    let speed = if speed.is_finite() {
        speed.max(MIN_SHIP_SPEED)
    } else {
        1.0
    };
    let seconds = TRIP_BASE_SECONDS + f64::from(difficulty) * TRIP_SECONDS_PER_DIFFICULTY / speed;
    floor_f64_to_u64(seconds * u64_to_f64(MS_PER_SECOND))
}
