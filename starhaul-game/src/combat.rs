//! Combat power, expedition success and enemy encounters.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{
    CRITICAL_LUCK_MULTIPLIER, CRITICAL_SUCCESS_BASE, DEFEAT_CARGO_LOSS_FRACTION,
    ENCOUNTER_ATTACK_WEIGHT, EXPEDITION_CAPSULE_RARITIES, FAILURE_XP_DIVISOR,
    POWER_ATTACK_WEIGHT, POWER_CARGO_WEIGHT, POWER_CRIT_CHANCE_WEIGHT,
    POWER_CRIT_DAMAGE_BASELINE, POWER_DEFENSE_WEIGHT, POWER_INTEGRITY_WEIGHT,
    POWER_MULTIPLIER_WEIGHT, POWER_SPEED_WEIGHT,
};
use crate::content::GameContent;
use crate::expedition::Expedition;
use crate::locations::Location;
use crate::numbers::{floor_f64_to_u64, index_from_fraction, u64_to_f64};
use crate::rarity::{Rarity, draw_uniform};
use crate::resources::{ResourceAmounts, ResourceDelta, RewardTable};
use crate::rewards::{RewardMultipliers, roll_inclusive, roll_rewards};
use crate::ship::{Ship, ShipId, ShipStats};

/// Single scalar summarising a ship, floored.
#[must_use]
pub fn combat_power(stats: &ShipStats) -> u64 {
    let power = stats.attack * POWER_ATTACK_WEIGHT
        + stats.defense * POWER_DEFENSE_WEIGHT
        + stats.max_integrity * POWER_INTEGRITY_WEIGHT
        + stats.speed * POWER_SPEED_WEIGHT
        + stats.cargo * POWER_CARGO_WEIGHT
        + stats.crit_chance * POWER_CRIT_CHANCE_WEIGHT
        + (stats.crit_damage - POWER_CRIT_DAMAGE_BASELINE) * POWER_MULTIPLIER_WEIGHT
        + (stats.luck - 1.0) * POWER_MULTIPLIER_WEIGHT
        + (stats.mining_efficiency - 1.0) * POWER_MULTIPLIER_WEIGHT;
    floor_f64_to_u64(power)
}

/// `min(1, (atk + def) / (reqAtk + reqDef)) × luck`.
#[must_use]
pub fn expedition_success_chance(stats: &ShipStats, location: &Location) -> f64 {
    let required = location.required_attack + location.required_defense;
    let ratio = if required <= 0.0 {
        1.0
    } else {
        ((stats.attack + stats.defense) / required).min(1.0)
    };
    ratio * stats.luck
}

/// Head-to-head strength used in encounters.
#[must_use]
pub fn encounter_power(attack: f64, defense: f64) -> f64 {
    attack * ENCOUNTER_ATTACK_WEIGHT + defense
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enemy {
    pub name: String,
    pub attack: f64,
    pub defense: f64,
    #[serde(default)]
    pub min_difficulty: u32,
    #[serde(default)]
    pub rewards: RewardTable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatOutcome {
    pub victory: bool,
    pub enemy_name: String,
    pub log: String,
    #[serde(default)]
    pub special_loot: ResourceAmounts,
    #[serde(default)]
    pub resources_lost: ResourceAmounts,
}

/// One-shot payload produced when an expedition ends, held until claimed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpeditionResult {
    pub id: u64,
    pub ship_id: ShipId,
    pub location_name: String,
    pub resources_gained: ResourceDelta,
    #[serde(default)]
    pub items_gained: Vec<String>,
    #[serde(default)]
    pub capsule_gained: Option<Rarity>,
    pub xp_gained: u64,
    pub integrity_lost: u64,
    #[serde(default)]
    pub combat_outcome: Option<CombatOutcome>,
    pub success: bool,
    pub critical_success: bool,
    #[serde(default)]
    pub combat_log: String,
    #[serde(default)]
    pub is_deep_space: bool,
    #[serde(default)]
    pub deep_space_event_log: Vec<String>,
}

/// Uniform pick among enemies allowed at `difficulty`.
pub fn pick_enemy<'a, R>(
    enemies: &'a BTreeMap<String, Enemy>,
    difficulty: u32,
    rng: &mut R,
) -> Option<&'a Enemy>
where
    R: Rng + ?Sized,
{
    let eligible: Vec<&Enemy> = enemies
        .values()
        .filter(|enemy| enemy.min_difficulty <= difficulty)
        .collect();
    if eligible.is_empty() {
        return None;
    }
    let roll: f64 = rng.r#gen();
    eligible.get(index_from_fraction(roll, eligible.len())).copied()
}

/// Fight `enemy`. Victory rolls bonus loot; defeat halves `gains` in place.
pub fn resolve_encounter<R>(
    stats: &ShipStats,
    enemy: &Enemy,
    gains: &mut ResourceAmounts,
    rng: &mut R,
) -> CombatOutcome
where
    R: Rng + ?Sized,
{
    let player = encounter_power(stats.attack, stats.defense);
    let opponent = encounter_power(enemy.attack, enemy.defense);
    let total = player + opponent;
    let victory_chance = if total <= 0.0 { 0.5 } else { player / total };
    let victory = rng.r#gen::<f64>() < victory_chance;

    if victory {
        let mut special_loot = ResourceAmounts::new();
        for (id, range) in &enemy.rewards {
            *special_loot.entry(*id).or_insert(0) += roll_inclusive(rng, *range);
        }
        return CombatOutcome {
            victory,
            enemy_name: enemy.name.clone(),
            log: format!("Encountered a {}! The ship emerged victorious.", enemy.name),
            special_loot,
            resources_lost: ResourceAmounts::new(),
        };
    }

    let mut resources_lost = ResourceAmounts::new();
    for (id, amount) in gains.iter_mut() {
        let lost = floor_f64_to_u64(u64_to_f64(*amount) * DEFEAT_CARGO_LOSS_FRACTION);
        if lost > 0 {
            *amount -= lost;
            resources_lost.insert(*id, lost);
        }
    }
    CombatOutcome {
        victory,
        enemy_name: enemy.name.clone(),
        log: format!(
            "Encountered a {}! The ship was defeated and lost part of its cargo.",
            enemy.name
        ),
        special_loot: ResourceAmounts::new(),
        resources_lost,
    }
}

/// Integrity lost between launch and `current`, floored.
#[must_use]
pub fn integrity_loss(launch_integrity: f64, current: f64) -> u64 {
    floor_f64_to_u64(launch_integrity - current)
}

/// Resolve a finished live expedition into its claimable result.
pub fn resolve_expedition<R>(
    expedition: &Expedition,
    ship: &Ship,
    location: &Location,
    content: &GameContent,
    rng: &mut R,
) -> ExpeditionResult
where
    R: Rng + ?Sized,
{
    let stats = &ship.stats;
    let success = rng.r#gen::<f64>() < expedition_success_chance(stats, location);
    let critical_success = success && rng.r#gen::<f64>() < CRITICAL_SUCCESS_BASE * stats.luck;

    let mut gains = ResourceAmounts::new();
    let mut items_gained = Vec::new();
    let mut capsule_gained = None;
    let mut combat_outcome = None;
    let mut combat_log = "No combat encountered.".to_string();

    if success {
        let multipliers = RewardMultipliers::new(stats.mining_efficiency, stats.luck)
            .with_critical(critical_success.then_some(CRITICAL_LUCK_MULTIPLIER));
        gains = roll_rewards(&location.rewards, multipliers, rng);

        if let Some(drop) = &location.item_drop
            && rng.r#gen::<f64>() < drop.chance * stats.luck
            && content.items.contains_key(&drop.item_id)
        {
            items_gained.push(drop.item_id.clone());
        }
        if rng.r#gen::<f64>() < location.capsule_chance * stats.luck {
            capsule_gained = draw_uniform(&EXPEDITION_CAPSULE_RARITIES, rng);
        }
        if rng.r#gen::<f64>() < location.enemy_chance
            && let Some(enemy) = pick_enemy(&content.enemies, location.difficulty, rng)
        {
            let outcome = resolve_encounter(stats, enemy, &mut gains, rng);
            combat_log.clone_from(&outcome.log);
            combat_outcome = Some(outcome);
        }
    } else {
        combat_log = "The expedition found nothing of value.".to_string();
    }

    let xp_gained = if success {
        location.xp_reward
    } else {
        location.xp_reward / FAILURE_XP_DIVISOR
    };

    log::debug!(
        "expedition #{} at {} resolved: success={success} critical={critical_success}",
        expedition.id,
        location.name
    );

    ExpeditionResult {
        id: expedition.id,
        ship_id: ship.id.clone(),
        location_name: location.name.clone(),
        resources_gained: ResourceDelta::from_amounts(&gains),
        items_gained,
        capsule_gained,
        xp_gained,
        integrity_lost: integrity_loss(expedition.starting_integrity, expedition.current_integrity),
        combat_outcome,
        success,
        critical_success,
        combat_log,
        is_deep_space: false,
        deep_space_event_log: Vec::new(),
    }
}
