//! Random event catalog and option resolution.
//!
//! The catalog only answers "which events may fire here" and "what does this
//! option do". Trigger probabilities belong to the callers (live milestones,
//! autopilot trips, deep-space hours) so one catalog serves all of them.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTOMATED_COST_PENALTY, AUTOMATED_SKILL_MULTIPLIER, INTERACTIVE_SKILL_FLOOR,
    INTERACTIVE_SKILL_MULTIPLIER, SKILL_CHECK_CAP,
};
use crate::numbers::index_from_fraction;
use crate::resources::{ResourceAmounts, ResourceDelta, ResourceLedger};
use crate::ship::{ShipStats, StatKind};

/// Deterministic consequences of an event choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub log: String,
    #[serde(default)]
    pub resources_gained: ResourceDelta,
    #[serde(default)]
    pub integrity_lost: u64,
    #[serde(default)]
    pub xp_gained: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCheck {
    pub stat: StatKind,
    pub difficulty: f64,
    pub success: EventResult,
    pub failure: EventResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptionEffect {
    Direct(EventResult),
    SkillCheck(SkillCheck),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOption {
    pub text: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "ResourceAmounts::is_empty")]
    pub cost: ResourceAmounts,
    pub effect: OptionEffect,
}

impl EventOption {
    #[must_use]
    pub fn has_cost(&self) -> bool {
        self.cost.values().any(|amount| *amount > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub min_difficulty: u32,
    pub options: Vec<EventOption>,
}

/// Which probability curve a skill check is rolled on.
///
/// The player-facing prompt and unattended resolution are tuned separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillCurve {
    /// Player picked the option while the expedition was paused.
    Interactive,
    /// Autopilot or deep-space resolution picked it.
    Automated,
}

impl SkillCurve {
    #[must_use]
    pub fn success_chance(self, stat_value: f64, difficulty: f64) -> f64 {
        let ratio = stat_value / difficulty.max(1.0);
        match self {
            Self::Interactive => (ratio * INTERACTIVE_SKILL_MULTIPLIER)
                .min(SKILL_CHECK_CAP)
                .max(INTERACTIVE_SKILL_FLOOR),
            Self::Automated => (ratio * AUTOMATED_SKILL_MULTIPLIER).min(SKILL_CHECK_CAP),
        }
    }
}

/// Outcome of resolving one option. `cost` is reported separately so callers
/// decide whether to debit a ledger or fold it into a batch total.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionResolution {
    pub cost: ResourceAmounts,
    pub result: EventResult,
    pub succeeded: bool,
}

/// Events whose difficulty gate admits `difficulty`.
#[must_use]
pub fn eligible_events(catalog: &[RandomEvent], difficulty: u32) -> Vec<&RandomEvent> {
    catalog
        .iter()
        .filter(|event| event.min_difficulty <= difficulty)
        .collect()
}

/// Uniform pick among eligible events. Consumes no randomness when nothing is eligible.
pub fn select_eligible_event<'a, R>(
    catalog: &'a [RandomEvent],
    difficulty: u32,
    rng: &mut R,
) -> Option<&'a RandomEvent>
where
    R: Rng + ?Sized,
{
    let eligible = eligible_events(catalog, difficulty);
    if eligible.is_empty() {
        return None;
    }
    let roll: f64 = rng.r#gen();
    eligible
        .get(index_from_fraction(roll, eligible.len()))
        .copied()
}

/// Resolve an option against ship stats. Unconditional options always succeed.
pub fn resolve_option<R>(
    option: &EventOption,
    stats: &ShipStats,
    curve: SkillCurve,
    rng: &mut R,
) -> OptionResolution
where
    R: Rng + ?Sized,
{
    let (result, succeeded) = match &option.effect {
        OptionEffect::Direct(result) => (result.clone(), true),
        OptionEffect::SkillCheck(check) => {
            let chance = curve.success_chance(stats.get(check.stat), check.difficulty);
            let succeeded = rng.r#gen::<f64>() < chance;
            let branch = if succeeded { &check.success } else { &check.failure };
            (branch.clone(), succeeded)
        }
    };
    OptionResolution {
        cost: option.cost.clone(),
        result,
        succeeded,
    }
}

/// Debit the option cost from `ledger` (clamped), then resolve it.
pub fn pay_and_resolve<R>(
    option: &EventOption,
    stats: &ShipStats,
    curve: SkillCurve,
    ledger: &mut ResourceLedger,
    rng: &mut R,
) -> OptionResolution
where
    R: Rng + ?Sized,
{
    if option.has_cost() {
        ledger.apply(&ResourceDelta::debit(&option.cost));
    }
    resolve_option(option, stats, curve, rng)
}

/// Autopilot choice: the last cost-free option, or the first option when
/// every option costs something.
#[must_use]
pub fn choose_safest_option(event: &RandomEvent) -> Option<&EventOption> {
    let (first, rest) = event.options.split_first()?;
    Some(
        rest.iter()
            .fold(first, |best, current| if current.has_cost() { best } else { current }),
    )
}

/// Deep-space choice: maximise `stat / difficulty`, minus a flat penalty for
/// costly options. Ties keep the earlier option.
#[must_use]
pub fn choose_best_option<'a>(event: &'a RandomEvent, stats: &ShipStats) -> Option<&'a EventOption> {
    let score = |option: &EventOption| {
        let base = match &option.effect {
            OptionEffect::SkillCheck(check) => stats.get(check.stat) / check.difficulty.max(1.0),
            OptionEffect::Direct(_) => 0.0,
        };
        if option.has_cost() {
            base - AUTOMATED_COST_PENALTY
        } else {
            base
        }
    };
    let (first, rest) = event.options.split_first()?;
    let mut best = first;
    let mut best_score = score(first);
    for option in rest {
        let current = score(option);
        if current > best_score {
            best = option;
            best_score = current;
        }
    }
    Some(best)
}
