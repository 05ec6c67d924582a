//! Resource identifiers, display registry and the non-negative ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CommandError;
use crate::numbers::u64_to_i64;
use crate::rarity::Rarity;

/// Every tradeable quantity in the game, including currency and consumables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceId {
    Credits,
    Fuel,
    Iron,
    Copper,
    Silicon,
    Titanium,
    Gold,
    Platinum,
    Uranium,
    Quantonium,
    Zypherite,
    SingularityCore,
    AlienAlloy,
    Biomass,
    AutoPilotModule,
    FuelCapsule,
    RepairCapsule,
}

impl ResourceId {
    pub const ALL: [Self; 17] = [
        Self::Credits,
        Self::Fuel,
        Self::Iron,
        Self::Copper,
        Self::Silicon,
        Self::Titanium,
        Self::Gold,
        Self::Platinum,
        Self::Uranium,
        Self::Quantonium,
        Self::Zypherite,
        Self::SingularityCore,
        Self::AlienAlloy,
        Self::Biomass,
        Self::AutoPilotModule,
        Self::FuelCapsule,
        Self::RepairCapsule,
    ];

    /// Stable key used in saves and content files.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Credits => "credits",
            Self::Fuel => "fuel",
            Self::Iron => "iron",
            Self::Copper => "copper",
            Self::Silicon => "silicon",
            Self::Titanium => "titanium",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Uranium => "uranium",
            Self::Quantonium => "quantonium",
            Self::Zypherite => "zypherite",
            Self::SingularityCore => "singularity_core",
            Self::AlienAlloy => "alien_alloy",
            Self::Biomass => "biomass",
            Self::AutoPilotModule => "auto_pilot_module",
            Self::FuelCapsule => "fuel_capsule",
            Self::RepairCapsule => "repair_capsule",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Display and pricing metadata for a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rarity: Rarity,
    #[serde(default)]
    pub base_sell_price: u64,
    /// Effect magnitude for consumables (fuel restored, integrity repaired, ms granted).
    #[serde(default)]
    pub value: Option<u64>,
    #[serde(default)]
    pub shop_price: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRegistry(BTreeMap<ResourceId, ResourceDef>);

impl ResourceRegistry {
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&ResourceDef> {
        self.0.get(&id)
    }

    /// Human readable name, falling back to the stable key.
    #[must_use]
    pub fn name(&self, id: ResourceId) -> String {
        self.get(id)
            .map_or_else(|| id.key().to_string(), |def| def.name.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Unsigned amounts: costs, reward rolls and mission bundles.
pub type ResourceAmounts = BTreeMap<ResourceId, u64>;

/// Inclusive `[min, max]` ranges per resource.
pub type RewardTable = BTreeMap<ResourceId, [u64; 2]>;

/// Signed per-resource change. Applied to a ledger with clamping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceDelta(BTreeMap<ResourceId, i64>);

impl ResourceDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_amounts(amounts: &ResourceAmounts) -> Self {
        let mut delta = Self::new();
        for (id, amount) in amounts {
            delta.add(*id, u64_to_i64(*amount));
        }
        delta
    }

    /// Negated cost, for folding a spend into a running total.
    #[must_use]
    pub fn debit(cost: &ResourceAmounts) -> Self {
        let mut delta = Self::new();
        for (id, amount) in cost {
            delta.add(*id, -u64_to_i64(*amount));
        }
        delta
    }

    pub fn add(&mut self, id: ResourceId, amount: i64) {
        let entry = self.0.entry(id).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn merge(&mut self, other: &Self) {
        for (id, amount) in &other.0 {
            self.add(*id, *amount);
        }
    }

    #[must_use]
    pub fn get(&self, id: ResourceId) -> i64 {
        self.0.get(&id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, i64)> + '_ {
        self.0.iter().map(|(id, amount)| (*id, *amount))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ResourceId, &mut i64)> {
        self.0.iter_mut()
    }

    /// Strictly positive entries only.
    pub fn gains(&self) -> impl Iterator<Item = (ResourceId, u64)> + '_ {
        self.0
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(id, amount)| (*id, amount.unsigned_abs()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|amount| *amount == 0)
    }
}

impl FromIterator<(ResourceId, i64)> for ResourceDelta {
    fn from_iter<T: IntoIterator<Item = (ResourceId, i64)>>(iter: T) -> Self {
        let mut delta = Self::new();
        for (id, amount) in iter {
            delta.add(id, amount);
        }
        delta
    }
}

/// Player holdings. No entry is ever negative; entries appear on first credit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLedger(BTreeMap<ResourceId, u64>);

impl ResourceLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: ResourceId) -> u64 {
        self.0.get(&id).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, id: ResourceId, amount: u64) {
        if amount == 0 {
            return;
        }
        let entry = self.0.entry(id).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn credit_all(&mut self, amounts: &ResourceAmounts) {
        for (id, amount) in amounts {
            self.credit(*id, *amount);
        }
    }

    /// Apply a signed delta, clamping every entry at zero.
    pub fn apply(&mut self, delta: &ResourceDelta) {
        for (id, amount) in delta.iter() {
            if amount >= 0 {
                self.credit(id, amount.unsigned_abs());
            } else if let Some(entry) = self.0.get_mut(&id) {
                *entry = entry.saturating_sub(amount.unsigned_abs());
            }
        }
    }

    #[must_use]
    pub fn can_afford(&self, cost: &ResourceAmounts) -> bool {
        self.first_shortfall(cost).is_none()
    }

    fn first_shortfall(&self, cost: &ResourceAmounts) -> Option<CommandError> {
        cost.iter().find_map(|(id, required)| {
            let available = self.get(*id);
            (available < *required).then(|| CommandError::insufficient(*id, *required, available))
        })
    }

    /// Debit every entry of `cost`, or nothing at all.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InsufficientResources`] for the first resource
    /// that cannot cover its share of the cost.
    pub fn try_debit(&mut self, cost: &ResourceAmounts) -> Result<(), CommandError> {
        if let Some(err) = self.first_shortfall(cost) {
            return Err(err);
        }
        for (id, amount) in cost {
            if let Some(entry) = self.0.get_mut(id) {
                *entry -= amount;
            }
        }
        Ok(())
    }

    /// Single-resource variant of [`Self::try_debit`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InsufficientResources`] when the holding is short.
    pub fn try_spend(&mut self, id: ResourceId, amount: u64) -> Result<(), CommandError> {
        let available = self.get(id);
        if available < amount {
            return Err(CommandError::insufficient(id, amount, available));
        }
        if let Some(entry) = self.0.get_mut(&id) {
            *entry -= amount;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, u64)> + '_ {
        self.0.iter().map(|(id, amount)| (*id, *amount))
    }
}

impl FromIterator<(ResourceId, u64)> for ResourceLedger {
    fn from_iter<T: IntoIterator<Item = (ResourceId, u64)>>(iter: T) -> Self {
        let mut ledger = Self::new();
        for (id, amount) in iter {
            ledger.credit(id, amount);
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_clamps_at_zero() {
        let mut ledger: ResourceLedger = [(ResourceId::Credits, 100)].into_iter().collect();
        ledger.apply(&[(ResourceId::Credits, -250)].into_iter().collect());
        assert_eq!(ledger.get(ResourceId::Credits), 0);
    }

    #[test]
    fn debits_never_create_entries() {
        let mut ledger = ResourceLedger::new();
        ledger.apply(&[(ResourceId::Gold, -5)].into_iter().collect());
        assert_eq!(ledger.iter().count(), 0);
        ledger.apply(&[(ResourceId::Gold, 5)].into_iter().collect());
        assert_eq!(ledger.get(ResourceId::Gold), 5);
    }

    #[test]
    fn try_debit_is_all_or_nothing() {
        let mut ledger: ResourceLedger = [(ResourceId::Iron, 100), (ResourceId::Copper, 10)]
            .into_iter()
            .collect();
        let cost: ResourceAmounts = [(ResourceId::Iron, 50), (ResourceId::Copper, 20)]
            .into_iter()
            .collect();
        let err = ledger.try_debit(&cost).unwrap_err();
        assert_eq!(
            err,
            CommandError::InsufficientResources {
                resource: ResourceId::Copper,
                required: 20,
                available: 10,
            }
        );
        assert_eq!(ledger.get(ResourceId::Iron), 100);

        ledger.credit(ResourceId::Copper, 10);
        ledger.try_debit(&cost).unwrap();
        assert_eq!(ledger.get(ResourceId::Iron), 50);
        assert_eq!(ledger.get(ResourceId::Copper), 0);
    }

    #[test]
    fn delta_merges_and_reports_gains() {
        let mut delta = ResourceDelta::from_amounts(&[(ResourceId::Iron, 10)].into_iter().collect());
        delta.merge(&ResourceDelta::debit(
            &[(ResourceId::Fuel, 5)].into_iter().collect(),
        ));
        delta.add(ResourceId::Iron, 3);
        assert_eq!(delta.get(ResourceId::Iron), 13);
        assert_eq!(delta.get(ResourceId::Fuel), -5);
        let gains: Vec<_> = delta.gains().collect();
        assert_eq!(gains, vec![(ResourceId::Iron, 13)]);
    }

    #[test]
    fn keys_round_trip_through_serde() {
        for id in ResourceId::ALL {
            let encoded = serde_json::to_string(&id).unwrap();
            assert_eq!(encoded, format!("\"{}\"", id.key()));
            assert_eq!(ResourceId::from_key(id.key()), Some(id));
        }
    }
}
