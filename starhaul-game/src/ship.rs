//! Ships, derived stats, upgrade crafting and procedural generation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::combat::combat_power;
use crate::constants::UPGRADE_COST_GROWTH;
use crate::error::CommandError;
use crate::numbers::{
    floor_f64_to_u64, index_from_fraction, round_to_places, u64_to_f64, usize_to_f64,
};
use crate::player::PlayerState;
use crate::rarity::Rarity;
use crate::resources::{ResourceAmounts, ResourceLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatKind {
    Attack,
    Defense,
    Integrity,
    MaxIntegrity,
    CritChance,
    CritDamage,
    Speed,
    Cargo,
    MiningEfficiency,
    Luck,
}

/// How a derived stat is normalised after upgrades are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatRounding {
    Floor,
    FourPlaces,
}

impl StatKind {
    pub const ALL: [Self; 10] = [
        Self::Attack,
        Self::Defense,
        Self::Integrity,
        Self::MaxIntegrity,
        Self::CritChance,
        Self::CritDamage,
        Self::Speed,
        Self::Cargo,
        Self::MiningEfficiency,
        Self::Luck,
    ];

    #[must_use]
    pub const fn rounding(self) -> StatRounding {
        match self {
            Self::CritChance | Self::CritDamage | Self::Luck | Self::MiningEfficiency | Self::Speed => {
                StatRounding::FourPlaces
            }
            Self::Attack | Self::Defense | Self::Integrity | Self::MaxIntegrity | Self::Cargo => {
                StatRounding::Floor
            }
        }
    }

    /// Base-stat increase bought by one attribute point.
    #[must_use]
    pub const fn attribute_increment(self) -> Option<f64> {
        match self {
            Self::Attack | Self::Defense => Some(1.0),
            Self::MaxIntegrity => Some(5.0),
            Self::Speed => Some(0.1),
            Self::Cargo => Some(10.0),
            Self::CritChance => Some(0.01),
            Self::CritDamage | Self::MiningEfficiency | Self::Luck => Some(0.05),
            Self::Integrity => None,
        }
    }

    #[must_use]
    pub fn round(self, value: f64) -> f64 {
        match self.rounding() {
            StatRounding::Floor => value.floor(),
            StatRounding::FourPlaces => round_to_places(value, 4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipStats {
    pub attack: f64,
    pub defense: f64,
    pub integrity: f64,
    pub max_integrity: f64,
    pub crit_chance: f64,
    pub crit_damage: f64,
    pub speed: f64,
    pub cargo: f64,
    pub mining_efficiency: f64,
    pub luck: f64,
}

impl Default for ShipStats {
    fn default() -> Self {
        Self {
            attack: 5.0,
            defense: 5.0,
            integrity: 100.0,
            max_integrity: 100.0,
            crit_chance: 0.05,
            crit_damage: 1.5,
            speed: 1.0,
            cargo: 100.0,
            mining_efficiency: 1.0,
            luck: 1.0,
        }
    }
}

impl ShipStats {
    #[must_use]
    pub const fn get(&self, kind: StatKind) -> f64 {
        match kind {
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::Integrity => self.integrity,
            StatKind::MaxIntegrity => self.max_integrity,
            StatKind::CritChance => self.crit_chance,
            StatKind::CritDamage => self.crit_damage,
            StatKind::Speed => self.speed,
            StatKind::Cargo => self.cargo,
            StatKind::MiningEfficiency => self.mining_efficiency,
            StatKind::Luck => self.luck,
        }
    }

    pub const fn set(&mut self, kind: StatKind, value: f64) {
        match kind {
            StatKind::Attack => self.attack = value,
            StatKind::Defense => self.defense = value,
            StatKind::Integrity => self.integrity = value,
            StatKind::MaxIntegrity => self.max_integrity = value,
            StatKind::CritChance => self.crit_chance = value,
            StatKind::CritDamage => self.crit_damage = value,
            StatKind::Speed => self.speed = value,
            StatKind::Cargo => self.cargo = value,
            StatKind::MiningEfficiency => self.mining_efficiency = value,
            StatKind::Luck => self.luck = value,
        }
    }

    #[must_use]
    pub fn rounded(mut self) -> Self {
        for kind in StatKind::ALL {
            self.set(kind, kind.round(self.get(kind)));
        }
        self
    }

    /// Current integrity as a fraction of max, 1.0 for a zero-max hull.
    #[must_use]
    pub fn integrity_fraction(&self) -> f64 {
        if self.max_integrity <= 0.0 {
            1.0
        } else {
            self.integrity / self.max_integrity
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipId(pub String);

impl ShipId {
    #[must_use]
    pub fn from_seq(seq: u64) -> Self {
        Self(format!("ship_{seq}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    pub id: ShipId,
    pub name: String,
    pub rarity: Rarity,
    pub base_stats: ShipStats,
    pub stats: ShipStats,
    #[serde(default)]
    pub upgrades: BTreeMap<String, u32>,
    #[serde(default)]
    pub combat_power: u64,
}

impl Ship {
    /// Fresh ship at full integrity with no upgrades.
    #[must_use]
    pub fn new(id: ShipId, name: String, rarity: Rarity, mut stats: ShipStats) -> Self {
        stats.integrity = stats.max_integrity;
        let combat_power = combat_power(&stats);
        Self {
            id,
            name,
            rarity,
            base_stats: stats.clone(),
            stats,
            upgrades: BTreeMap::new(),
            combat_power,
        }
    }

    pub fn refresh_combat_power(&mut self) {
        self.combat_power = combat_power(&self.stats);
    }

    /// Re-derive stats from base and upgrades, keeping current integrity.
    pub fn recompute(&mut self, catalog: &[UpgradeDef]) {
        let current = self.stats.integrity;
        self.stats = derive_stats(&self.base_stats, &self.upgrades, catalog);
        self.stats.integrity = current.min(self.stats.max_integrity).max(0.0);
        self.refresh_combat_power();
    }

    pub fn take_damage(&mut self, amount: f64) {
        self.stats.integrity = (self.stats.integrity - amount).max(0.0);
    }

    pub fn repair(&mut self, amount: f64) {
        self.stats.integrity = (self.stats.integrity + amount).min(self.stats.max_integrity);
    }

    pub fn set_integrity(&mut self, value: f64) {
        self.stats.integrity = value.min(self.stats.max_integrity).max(0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeCategory {
    Utility,
    Combat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub stat: StatKind,
    pub value: f64,
    pub cost: ResourceAmounts,
    pub category: UpgradeCategory,
}

/// `base + base × Σ(value × level)` per stat, then normalised per stat.
///
/// Pure in `(base, upgrades)`: upgrade ids are iterated in sorted order so the
/// floating point sum is identical on every call.
#[must_use]
pub fn derive_stats(
    base: &ShipStats,
    upgrades: &BTreeMap<String, u32>,
    catalog: &[UpgradeDef],
) -> ShipStats {
    let mut bonus: BTreeMap<StatKind, f64> = BTreeMap::new();
    for (upgrade_id, level) in upgrades {
        if let Some(def) = catalog.iter().find(|def| &def.id == upgrade_id) {
            *bonus.entry(def.stat).or_insert(0.0) += def.value * f64::from(*level);
        }
    }
    let mut stats = base.clone();
    for (kind, percent) in bonus {
        let base_value = base.get(kind);
        stats.set(kind, base_value + base_value * percent);
    }
    stats.rounded()
}

/// Material cost of the next level: `floor(cost × 1.2^level)`.
#[must_use]
pub fn upgrade_cost(def: &UpgradeDef, current_level: u32) -> ResourceAmounts {
    let multiplier = UPGRADE_COST_GROWTH.powi(i32::try_from(current_level).unwrap_or(i32::MAX));
    def.cost
        .iter()
        .map(|(id, amount)| (*id, floor_f64_to_u64(u64_to_f64(*amount) * multiplier)))
        .collect()
}

/// Buy one level of `upgrade_id` for `ship`, returning the new level.
///
/// # Errors
///
/// Rejects unknown upgrades and unaffordable costs without touching state.
pub fn craft_upgrade(
    ship: &mut Ship,
    ledger: &mut ResourceLedger,
    catalog: &[UpgradeDef],
    upgrade_id: &str,
) -> Result<u32, CommandError> {
    let def = catalog
        .iter()
        .find(|def| def.id == upgrade_id)
        .ok_or_else(|| CommandError::UnknownUpgrade(upgrade_id.to_string()))?;
    let level = ship.upgrades.get(upgrade_id).copied().unwrap_or(0);
    ledger.try_debit(&upgrade_cost(def, level))?;

    let previous = ship.stats.clone();
    let new_level = level + 1;
    ship.upgrades.insert(def.id.clone(), new_level);
    let mut stats = derive_stats(&ship.base_stats, &ship.upgrades, catalog);
    stats.integrity = if def.stat == StatKind::MaxIntegrity {
        (previous.integrity + ship.base_stats.max_integrity * def.value).min(stats.max_integrity)
    } else {
        stats.max_integrity * previous.integrity_fraction()
    }
    .floor();
    ship.stats = stats;
    ship.refresh_combat_power();
    log::info!("{} upgraded {} to level {new_level}", ship.name, def.id);
    Ok(new_level)
}

/// Spend one attribute point on a base stat of `ship`.
///
/// # Errors
///
/// Rejects when no points are available or the stat cannot be trained.
pub fn distribute_attribute_point(
    ship: &mut Ship,
    player: &mut PlayerState,
    stat: StatKind,
    catalog: &[UpgradeDef],
) -> Result<(), CommandError> {
    if player.attribute_points == 0 {
        return Err(CommandError::NoAttributePoints);
    }
    let increment = stat
        .attribute_increment()
        .ok_or(CommandError::NotTrainable(stat))?;
    let raised = round_to_places(ship.base_stats.get(stat) + increment, 4);
    ship.base_stats.set(stat, raised);
    if stat == StatKind::MaxIntegrity {
        ship.base_stats.integrity += increment;
        ship.stats.integrity += increment;
    }
    ship.stats.integrity = ship.stats.integrity.floor();
    ship.recompute(catalog);
    player.attribute_points -= 1;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub base: f64,
    pub spread: f64,
}

/// Stat ranges rolled for a freshly generated ship of one rarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityStatRanges {
    pub attack: [u32; 2],
    pub defense: [u32; 2],
    pub max_integrity: [u32; 2],
    pub crit_chance: f64,
    pub crit_damage: f64,
    pub speed: SpeedRange,
    pub cargo: [u32; 2],
    pub mining_efficiency: f64,
    pub luck: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipCatalog {
    pub rarities: BTreeMap<Rarity, RarityStatRanges>,
    #[serde(default)]
    pub name_prefixes: Vec<String>,
    #[serde(default)]
    pub name_suffixes: Vec<String>,
    #[serde(default)]
    pub mythic_names: Vec<String>,
    #[serde(default)]
    pub mythic_name_chance: f64,
}

fn roll_stat<R: Rng + ?Sized>(range: [u32; 2], rng: &mut R) -> f64 {
    let [min, max] = range;
    let span = usize::try_from(max.saturating_sub(min)).unwrap_or(0) + 1;
    let offset = index_from_fraction(rng.r#gen(), span);
    f64::from(min) + usize_to_f64(offset)
}

fn pick_name<'a, R: Rng + ?Sized>(pool: &'a [String], rng: &mut R) -> &'a str {
    let roll: f64 = rng.r#gen();
    pool.get(index_from_fraction(roll, pool.len()))
        .map_or("Unnamed", String::as_str)
}

/// Roll a ship name; mythic hulls usually carry a unique title.
pub fn generate_ship_name<R>(catalog: &ShipCatalog, rarity: Rarity, rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    if rarity == Rarity::Mythic
        && !catalog.mythic_names.is_empty()
        && rng.r#gen::<f64>() < catalog.mythic_name_chance
    {
        return pick_name(&catalog.mythic_names, rng).to_string();
    }
    let prefix = pick_name(&catalog.name_prefixes, rng);
    let suffix = pick_name(&catalog.name_suffixes, rng);
    format!("{prefix} {suffix}")
}

/// Roll a ship of `rarity`. Unknown rarities fall back to starter stats.
pub fn generate_ship<R>(catalog: &ShipCatalog, rarity: Rarity, id: ShipId, rng: &mut R) -> Ship
where
    R: Rng + ?Sized,
{
    let stats = catalog.rarities.get(&rarity).map_or_else(ShipStats::default, |ranges| {
        let attack = roll_stat(ranges.attack, rng);
        let defense = roll_stat(ranges.defense, rng);
        let max_integrity = roll_stat(ranges.max_integrity, rng);
        let speed_roll: f64 = rng.r#gen();
        let speed = round_to_places(
            ranges.speed.base + round_to_places(speed_roll * ranges.speed.spread, 2),
            2,
        );
        let cargo = roll_stat(ranges.cargo, rng);
        ShipStats {
            attack,
            defense,
            integrity: max_integrity,
            max_integrity,
            crit_chance: ranges.crit_chance,
            crit_damage: ranges.crit_damage,
            speed,
            cargo,
            mining_efficiency: ranges.mining_efficiency,
            luck: ranges.luck,
        }
    });
    let name = generate_ship_name(catalog, rarity, rng);
    Ship::new(id, name, rarity, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceId;
    use crate::test_support::{FixedRng, ScriptedRng};

    fn upgrade(id: &str, stat: StatKind, value: f64) -> UpgradeDef {
        UpgradeDef {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            stat,
            value,
            cost: [(ResourceId::Iron, 100), (ResourceId::Copper, 50)]
                .into_iter()
                .collect(),
            category: UpgradeCategory::Utility,
        }
    }

    fn starter() -> Ship {
        Ship::new(
            ShipId::from_seq(1),
            "Nova Drifter".to_string(),
            Rarity::Common,
            ShipStats::default(),
        )
    }

    #[test]
    fn derived_stats_are_deterministic() {
        let catalog = vec![
            upgrade("speed1", StatKind::Speed, 0.05),
            upgrade("speed2", StatKind::Speed, 0.10),
            upgrade("attack1", StatKind::Attack, 0.02),
        ];
        let base = ShipStats {
            speed: 1.17,
            attack: 23.0,
            ..ShipStats::default()
        };
        let upgrades: BTreeMap<String, u32> = [
            ("speed1".to_string(), 3),
            ("speed2".to_string(), 1),
            ("attack1".to_string(), 7),
        ]
        .into_iter()
        .collect();
        let first = derive_stats(&base, &upgrades, &catalog);
        for _ in 0..16 {
            let again = derive_stats(&base, &upgrades, &catalog);
            assert_eq!(first.speed.to_bits(), again.speed.to_bits());
            assert_eq!(first.attack.to_bits(), again.attack.to_bits());
        }
        assert!((first.speed - 1.4625).abs() < 1e-9);
        assert!((first.attack - 26.0).abs() < f64::EPSILON);
    }

    #[test]
    fn crafting_scales_cost_and_keeps_integrity_fraction() {
        let catalog = vec![upgrade("cargo1", StatKind::Cargo, 0.10)];
        let mut ship = starter();
        ship.stats.integrity = 50.0;
        let mut ledger: ResourceLedger = [(ResourceId::Iron, 500), (ResourceId::Copper, 500)]
            .into_iter()
            .collect();

        assert_eq!(craft_upgrade(&mut ship, &mut ledger, &catalog, "cargo1"), Ok(1));
        assert_eq!(ledger.get(ResourceId::Iron), 400);
        assert!((ship.stats.cargo - 110.0).abs() < f64::EPSILON);
        // Still at half of the unchanged max.
        assert!((ship.stats.integrity - 50.0).abs() < f64::EPSILON);

        assert_eq!(craft_upgrade(&mut ship, &mut ledger, &catalog, "cargo1"), Ok(2));
        assert_eq!(ledger.get(ResourceId::Iron), 280);
        assert_eq!(ledger.get(ResourceId::Copper), 390);
    }

    #[test]
    fn crafting_rejects_without_mutation() {
        let catalog = vec![upgrade("cargo1", StatKind::Cargo, 0.10)];
        let mut ship = starter();
        let before = ship.clone();
        let mut ledger: ResourceLedger = [(ResourceId::Iron, 10)].into_iter().collect();
        let err = craft_upgrade(&mut ship, &mut ledger, &catalog, "cargo1").unwrap_err();
        assert!(matches!(err, CommandError::InsufficientResources { .. }));
        assert_eq!(ship, before);
        assert_eq!(ledger.get(ResourceId::Iron), 10);
        assert!(matches!(
            craft_upgrade(&mut ship, &mut ledger, &catalog, "warp9"),
            Err(CommandError::UnknownUpgrade(_))
        ));
    }

    #[test]
    fn hull_upgrade_tops_up_integrity() {
        let catalog = vec![upgrade("integrity1", StatKind::MaxIntegrity, 0.05)];
        let mut ship = starter();
        ship.stats.integrity = 80.0;
        let mut ledger: ResourceLedger = [(ResourceId::Iron, 100), (ResourceId::Copper, 50)]
            .into_iter()
            .collect();
        craft_upgrade(&mut ship, &mut ledger, &catalog, "integrity1").unwrap();
        assert!((ship.stats.max_integrity - 105.0).abs() < f64::EPSILON);
        assert!((ship.stats.integrity - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn attribute_points_raise_base_stats() {
        let mut ship = starter();
        ship.stats.integrity = 60.0;
        let mut player = PlayerState {
            attribute_points: 2,
            ..PlayerState::default()
        };
        distribute_attribute_point(&mut ship, &mut player, StatKind::MaxIntegrity, &[]).unwrap();
        assert!((ship.base_stats.max_integrity - 105.0).abs() < f64::EPSILON);
        assert!((ship.stats.integrity - 65.0).abs() < f64::EPSILON);
        distribute_attribute_point(&mut ship, &mut player, StatKind::Speed, &[]).unwrap();
        assert!((ship.stats.speed - 1.1).abs() < 1e-9);
        assert_eq!(player.attribute_points, 0);
        assert_eq!(
            distribute_attribute_point(&mut ship, &mut player, StatKind::Attack, &[]),
            Err(CommandError::NoAttributePoints)
        );
    }

    #[test]
    fn integrity_is_not_trainable() {
        let mut ship = starter();
        let mut player = PlayerState {
            attribute_points: 1,
            ..PlayerState::default()
        };
        assert_eq!(
            distribute_attribute_point(&mut ship, &mut player, StatKind::Integrity, &[]),
            Err(CommandError::NotTrainable(StatKind::Integrity))
        );
        assert_eq!(player.attribute_points, 1);
    }

    #[test]
    fn generated_ship_respects_ranges() {
        let catalog: ShipCatalog =
            serde_json::from_str(include_str!("../assets/ships.json")).unwrap();
        let mut rng = FixedRng::fraction(0.999);
        let ship = generate_ship(&catalog, Rarity::Rare, ShipId::from_seq(7), &mut rng);
        assert!((ship.stats.attack - 16.0).abs() < f64::EPSILON);
        assert!((ship.stats.max_integrity - 180.0).abs() < f64::EPSILON);
        assert!((ship.stats.integrity - ship.stats.max_integrity).abs() < f64::EPSILON);
        assert!((ship.stats.speed - 1.9).abs() < 1e-9);
        assert_eq!(ship.base_stats, ship.stats);
        assert!(ship.upgrades.is_empty());
        assert_eq!(ship.name, "Andromeda Pioneer");
    }

    #[test]
    fn mythic_ships_usually_get_unique_names() {
        let catalog: ShipCatalog =
            serde_json::from_str(include_str!("../assets/ships.json")).unwrap();
        let mut rng = ScriptedRng::new(&[0.1, 0.0]);
        let name = generate_ship_name(&catalog, Rarity::Mythic, &mut rng);
        assert_eq!(name, "The Unraveler");
    }
}
