//! Centralized balance and tuning constants for the Starhaul simulation.
//!
//! Reference data (locations, upgrades, events…) lives in the JSON assets;
//! the arithmetic knobs that drive resolution live here so they can only be
//! changed through reviewed code.

use crate::rarity::Rarity;

// Persistence --------------------------------------------------------------
pub const SAVE_VERSION: &str = "1.5.0";
pub(crate) const MIGRATION_BASELINE_VERSION: &str = "1.4.0";
pub(crate) const LEGACY_SAVE_VERSION: &str = "1.0.0";

// Time ---------------------------------------------------------------------
pub const MS_PER_SECOND: u64 = 1_000;
pub const MS_PER_HOUR: u64 = 3_600_000;
pub const TICK_INTERVAL_MS: u64 = MS_PER_SECOND;

// Player progression -------------------------------------------------------
pub const BASE_XP_TO_LEVEL_UP: u64 = 100;
pub const XP_SCALING_FACTOR: f64 = 1.4;
pub(crate) const ATTRIBUTE_POINTS_PER_LEVEL: u32 = 1;

// Starting state -----------------------------------------------------------
pub(crate) const STARTING_CREDITS: u64 = 1_000;
pub(crate) const STARTING_FUEL: u64 = 100;
pub(crate) const STARTING_IRON: u64 = 50;
pub(crate) const STARTING_COPPER: u64 = 25;
pub(crate) const STARTING_SHIP_BOXES: u32 = 1;

// Trips --------------------------------------------------------------------
pub(crate) const TRIP_BASE_SECONDS: f64 = 60.0;
pub(crate) const TRIP_SECONDS_PER_DIFFICULTY: f64 = 30.0;
pub(crate) const MIN_SHIP_SPEED: f64 = 0.01;

// Live expedition milestones -----------------------------------------------
pub(crate) const MILESTONE_EVENT_CHANCE: f64 = 0.25;
pub(crate) const HAZARD_DAMAGE_MIN: f64 = 2.0;
pub(crate) const HAZARD_DAMAGE_MAX: f64 = 5.0;

// Completion and combat ----------------------------------------------------
pub(crate) const CRITICAL_SUCCESS_BASE: f64 = 0.1;
pub(crate) const CRITICAL_LUCK_MULTIPLIER: f64 = 1.5;
pub(crate) const FAILURE_XP_DIVISOR: u64 = 4;
pub(crate) const ENCOUNTER_ATTACK_WEIGHT: f64 = 1.5;
pub(crate) const DEFEAT_CARGO_LOSS_FRACTION: f64 = 0.5;
pub(crate) const EXPEDITION_CAPSULE_RARITIES: [Rarity; 5] = [
    Rarity::Common,
    Rarity::Uncommon,
    Rarity::Rare,
    Rarity::Epic,
    Rarity::Legendary,
];

// Combat power weights -----------------------------------------------------
pub(crate) const POWER_ATTACK_WEIGHT: f64 = 1.5;
pub(crate) const POWER_DEFENSE_WEIGHT: f64 = 1.5;
pub(crate) const POWER_INTEGRITY_WEIGHT: f64 = 0.2;
pub(crate) const POWER_SPEED_WEIGHT: f64 = 10.0;
pub(crate) const POWER_CARGO_WEIGHT: f64 = 0.1;
pub(crate) const POWER_CRIT_CHANCE_WEIGHT: f64 = 200.0;
pub(crate) const POWER_MULTIPLIER_WEIGHT: f64 = 50.0;
pub(crate) const POWER_CRIT_DAMAGE_BASELINE: f64 = 1.5;

// Skill checks -------------------------------------------------------------
pub(crate) const SKILL_CHECK_CAP: f64 = 0.95;
pub(crate) const INTERACTIVE_SKILL_MULTIPLIER: f64 = 0.5;
pub(crate) const INTERACTIVE_SKILL_FLOOR: f64 = 0.1;
pub(crate) const AUTOMATED_SKILL_MULTIPLIER: f64 = 0.6;
pub(crate) const AUTOMATED_COST_PENALTY: f64 = 10.0;

// Deep space ---------------------------------------------------------------
pub(crate) const DEEP_SPACE_SUCCESS_CAP: f64 = 0.98;
pub(crate) const DEEP_SPACE_SUCCESS_BASE: f64 = 0.5;
pub(crate) const DEEP_SPACE_POWER_WEIGHT: f64 = 0.25;
pub(crate) const DEEP_SPACE_POWER_PER_DIFFICULTY: f64 = 50.0;

// Autopilot ----------------------------------------------------------------
pub(crate) const AUTOPILOT_EVENT_CHANCE: f64 = 0.25;
pub(crate) const AUTOPILOT_REPAIR_THRESHOLD: f64 = 0.7;
pub(crate) const AUTOPILOT_NARRATIVE_CHANCE: f64 = 0.4;
pub(crate) const AUTOPILOT_CAPSULE_RARITIES: [Rarity; 3] =
    [Rarity::Common, Rarity::Uncommon, Rarity::Rare];
pub const AUTOPILOT_MODULE_COST: u64 = 250;
pub const AUTOPILOT_MODULE_DURATION_MS: u64 = MS_PER_HOUR;

// Missions -----------------------------------------------------------------
pub const MISSION_REFRESH_INTERVAL_MS: u64 = 24 * MS_PER_HOUR;
pub const MAX_ACCEPTED_MISSIONS: usize = 3;
pub(crate) const MIN_MISSION_BATCH: usize = 1;
pub(crate) const MAX_MISSION_BATCH: usize = 5;
pub const MISSION_RARITY_WEIGHTS: [(Rarity, f64); 5] = [
    (Rarity::Common, 0.5),
    (Rarity::Uncommon, 0.3),
    (Rarity::Rare, 0.15),
    (Rarity::Epic, 0.04),
    (Rarity::Legendary, 0.01),
];

// Ships and store ----------------------------------------------------------
pub const SHIP_RARITY_WEIGHTS: [(Rarity, f64); 6] = [
    (Rarity::Common, 0.40),
    (Rarity::Uncommon, 0.30),
    (Rarity::Rare, 0.15),
    (Rarity::Epic, 0.09),
    (Rarity::Legendary, 0.05),
    (Rarity::Mythic, 0.01),
];
pub(crate) const SHIP_BOX_BASE_COST: f64 = 50_000.0;
pub(crate) const SHIP_BOX_LEVEL_SCALE: f64 = 0.2;
pub(crate) const SHIELD_BASE_COST: f64 = 250.0;
pub(crate) const SHIELD_LEVEL_SCALE: f64 = 0.1;
pub const MAX_SHIELDS: u32 = 5;
pub(crate) const UPGRADE_COST_GROWTH: f64 = 1.2;
pub(crate) const DEFAULT_CONSUMABLE_VALUE: u64 = 50;

// Farm ---------------------------------------------------------------------
pub const FARM_UNLOCK_COST: u64 = 10_000;
pub const FARM_GRID_SIZE: usize = 5;
