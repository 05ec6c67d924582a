//! Rarity tiers shared by items, capsules, ships and missions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::numbers::index_from_fraction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub const ALL: [Self; 6] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
        Self::Mythic,
    ];

    /// Credits paid when an inventory item of this rarity is sold.
    #[must_use]
    pub const fn sell_value(self) -> u64 {
        match self {
            Self::Common => 50,
            Self::Uncommon => 150,
            Self::Rare => 400,
            Self::Epic => 1_000,
            Self::Legendary => 5_000,
            Self::Mythic => 15_000,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
            Self::Mythic => "Mythic",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cumulative weighted draw. Falls back to `Common` when the draw lands past
/// the summed weights.
pub fn draw_weighted<R>(weights: &[(Rarity, f64)], rng: &mut R) -> Rarity
where
    R: Rng + ?Sized,
{
    let roll: f64 = rng.r#gen();
    let mut cumulative = 0.0;
    for (rarity, weight) in weights {
        cumulative += weight;
        if roll < cumulative {
            return *rarity;
        }
    }
    Rarity::Common
}

/// Uniform pick from a fixed pool.
pub fn draw_uniform<R>(pool: &[Rarity], rng: &mut R) -> Option<Rarity>
where
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return None;
    }
    let roll: f64 = rng.r#gen();
    pool.get(index_from_fraction(roll, pool.len())).copied()
}
