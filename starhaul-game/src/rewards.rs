//! Reward rolling: range tables scaled by ship multipliers, and capsule pulls.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::numbers::{floor_f64_to_u64, index_from_fraction, u64_to_f64};
use crate::resources::{ResourceAmounts, ResourceId, RewardTable};

/// Scalars applied on top of a uniform roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardMultipliers {
    pub mining_efficiency: f64,
    pub luck: f64,
    pub critical_boost: Option<f64>,
    /// Extra linear factor, e.g. trip length in hours.
    pub scale: f64,
}

impl Default for RewardMultipliers {
    fn default() -> Self {
        Self {
            mining_efficiency: 1.0,
            luck: 1.0,
            critical_boost: None,
            scale: 1.0,
        }
    }
}

impl RewardMultipliers {
    #[must_use]
    pub const fn new(mining_efficiency: f64, luck: f64) -> Self {
        Self {
            mining_efficiency,
            luck,
            critical_boost: None,
            scale: 1.0,
        }
    }

    #[must_use]
    pub const fn with_critical(mut self, boost: Option<f64>) -> Self {
        self.critical_boost = boost;
        self
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn product(&self) -> f64 {
        self.mining_efficiency * self.luck * self.critical_boost.unwrap_or(1.0) * self.scale
    }
}

/// Continuous draw in `[min, max)`.
pub fn uniform<R>(rng: &mut R, min: f64, max: f64) -> f64
where
    R: Rng + ?Sized,
{
    min + rng.r#gen::<f64>() * (max - min)
}

/// Integer draw in `[min, max]`, both ends inclusive.
pub fn roll_inclusive<R>(rng: &mut R, range: [u64; 2]) -> u64
where
    R: Rng + ?Sized,
{
    let [min, max] = range;
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let span = u64_to_f64(high - low) + 1.0;
    low.saturating_add(floor_f64_to_u64(rng.r#gen::<f64>() * span))
        .min(high)
}

/// `floor(uniform(min, max) × Π multipliers)` per resource, never negative.
pub fn roll_rewards<R>(
    table: &RewardTable,
    multipliers: RewardMultipliers,
    rng: &mut R,
) -> ResourceAmounts
where
    R: Rng + ?Sized,
{
    let factor = multipliers.product();
    table
        .iter()
        .map(|(id, [min, max])| {
            let base = uniform(rng, u64_to_f64(*min), u64_to_f64(*max));
            (*id, floor_f64_to_u64(base * factor))
        })
        .collect()
}

/// Contents of a capsule of one rarity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleTable {
    pub pulls: u32,
    pub resource_pool: RewardTable,
}

/// Perform `pulls` draws, each picking a pool resource uniformly.
pub fn open_capsule<R>(table: &CapsuleTable, rng: &mut R) -> ResourceAmounts
where
    R: Rng + ?Sized,
{
    let pool: Vec<(ResourceId, [u64; 2])> = table
        .resource_pool
        .iter()
        .map(|(id, range)| (*id, *range))
        .collect();
    let mut results = ResourceAmounts::new();
    if pool.is_empty() {
        return results;
    }
    for _ in 0..table.pulls {
        let (id, range) = pool[index_from_fraction(rng.r#gen(), pool.len())];
        let amount = roll_inclusive(rng, range);
        *results.entry(id).or_insert(0) += amount;
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FixedRng, ScriptedRng};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn common_capsule() -> CapsuleTable {
        CapsuleTable {
            pulls: 2,
            resource_pool: [
                (ResourceId::Iron, [25, 75]),
                (ResourceId::Copper, [20, 60]),
                (ResourceId::Silicon, [20, 60]),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn rolls_scale_with_every_multiplier() {
        let table: RewardTable = [(ResourceId::Iron, [20, 40])].into_iter().collect();
        let multipliers = RewardMultipliers::new(1.5, 1.0)
            .with_critical(Some(2.0))
            .with_scale(3.0);
        let rolled = roll_rewards(&table, multipliers, &mut FixedRng::fraction(0.5));
        assert_eq!(rolled[&ResourceId::Iron], 270);
    }

    #[test]
    fn non_positive_multipliers_clamp_to_zero() {
        let table: RewardTable = [(ResourceId::Gold, [10, 20])].into_iter().collect();
        let rolled = roll_rewards(
            &table,
            RewardMultipliers::new(1.0, -0.5),
            &mut FixedRng::fraction(0.9),
        );
        assert_eq!(rolled[&ResourceId::Gold], 0);
    }

    #[test]
    fn inclusive_roll_reaches_both_ends() {
        assert_eq!(roll_inclusive(&mut FixedRng::fraction(0.0), [5, 9]), 5);
        assert_eq!(roll_inclusive(&mut FixedRng::fraction(0.999_999), [5, 9]), 9);
        assert_eq!(roll_inclusive(&mut FixedRng::fraction(0.5), [3, 3]), 3);
    }

    #[test]
    fn common_capsule_yields_two_pulls_in_range() {
        let table = common_capsule();
        let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
        for _ in 0..200 {
            let mut scripted = ScriptedRng::new(&[rng.r#gen(), rng.r#gen(), rng.r#gen(), rng.r#gen()]);
            let results = open_capsule(&table, &mut scripted);
            assert_eq!(scripted.consumed(), 4);
            let distinct = results.len();
            assert!((1..=2).contains(&distinct));
            for (id, amount) in &results {
                let [min, max] = table.resource_pool[id];
                let (min, max) = if distinct == 1 {
                    (min * 2, max * 2)
                } else {
                    (min, max)
                };
                assert!(
                    (min..=max).contains(amount),
                    "{id} rolled {amount} outside {min}..={max}"
                );
            }
        }
    }

    #[test]
    fn scripted_capsule_credits_each_pull() {
        let mut rng = ScriptedRng::new(&[0.5, 0.0, 0.9, 0.999_999]);
        let results = open_capsule(&common_capsule(), &mut rng);
        assert_eq!(results.get(&ResourceId::Copper), Some(&20));
        assert_eq!(results.get(&ResourceId::Silicon), Some(&60));
    }
}
