use serde::{Deserialize, Serialize};

use crate::constants::{ATTRIBUTE_POINTS_PER_LEVEL, BASE_XP_TO_LEVEL_UP, XP_SCALING_FACTOR};
use crate::numbers::{floor_f64_to_u64, u64_to_f64};

/// Commander progression shared by every ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub level: u32,
    pub xp: u64,
    pub xp_to_next_level: u64,
    #[serde(default)]
    pub attribute_points: u32,
    #[serde(default)]
    pub shields: u32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            xp_to_next_level: BASE_XP_TO_LEVEL_UP,
            attribute_points: 0,
            shields: 0,
        }
    }
}

impl PlayerState {
    /// Grant xp, levelling up as many times as the total allows.
    /// Returns the number of levels gained.
    pub fn add_xp(&mut self, amount: u64) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        if self.xp_to_next_level == 0 {
            self.xp_to_next_level = xp_to_next_for_level(self.level);
        }
        let mut gained = 0;
        while self.xp >= self.xp_to_next_level {
            self.xp -= self.xp_to_next_level;
            self.level = self.level.saturating_add(1);
            self.xp_to_next_level = next_threshold(self.xp_to_next_level);
            self.attribute_points = self
                .attribute_points
                .saturating_add(ATTRIBUTE_POINTS_PER_LEVEL);
            gained += 1;
        }
        if gained > 0 {
            log::info!("commander reached level {}", self.level);
        }
        gained
    }
}

fn next_threshold(current: u64) -> u64 {
    floor_f64_to_u64(u64_to_f64(current) * XP_SCALING_FACTOR).max(1)
}

/// Xp required to leave `level`, recomputed from level 1.
#[must_use]
pub fn xp_to_next_for_level(level: u32) -> u64 {
    (1..level.max(1)).fold(BASE_XP_TO_LEVEL_UP, |threshold, _| next_threshold(threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_carries_over_multiple_levels() {
        let mut player = PlayerState::default();
        let gained = player.add_xp(250);
        assert_eq!(gained, 2);
        assert_eq!(player.level, 3);
        assert_eq!(player.xp, 10);
        assert_eq!(player.xp_to_next_level, 196);
        assert_eq!(player.attribute_points, 2);
    }

    #[test]
    fn partial_xp_does_not_level() {
        let mut player = PlayerState::default();
        assert_eq!(player.add_xp(99), 0);
        assert_eq!(player.level, 1);
        assert_eq!(player.xp, 99);
    }

    #[test]
    fn thresholds_follow_scaling_curve() {
        assert_eq!(xp_to_next_for_level(1), 100);
        assert_eq!(xp_to_next_for_level(2), 140);
        assert_eq!(xp_to_next_for_level(3), 196);
        assert_eq!(xp_to_next_for_level(5), 383);
        assert_eq!(xp_to_next_for_level(0), 100);
    }

    #[test]
    fn zero_threshold_is_repaired_before_levelling() {
        let mut player = PlayerState {
            xp_to_next_level: 0,
            ..PlayerState::default()
        };
        player.add_xp(10);
        assert_eq!(player.level, 1);
        assert_eq!(player.xp_to_next_level, 100);
    }
}
