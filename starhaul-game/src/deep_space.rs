//! Long-haul expeditions resolved in one batch when they end.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::{ExpeditionResult, combat_power};
use crate::constants::{
    CRITICAL_LUCK_MULTIPLIER, CRITICAL_SUCCESS_BASE, DEEP_SPACE_POWER_PER_DIFFICULTY,
    DEEP_SPACE_POWER_WEIGHT, DEEP_SPACE_SUCCESS_BASE, DEEP_SPACE_SUCCESS_CAP, MS_PER_HOUR,
};
use crate::content::GameContent;
use crate::error::CommandError;
use crate::events::{RandomEvent, SkillCurve, choose_best_option, resolve_option, select_eligible_event};
use crate::locations::DeepSpaceLocation;
use crate::numbers::{floor_f64_to_u64, u64_to_f64};
use crate::resources::ResourceDelta;
use crate::rewards::{RewardMultipliers, roll_rewards};
use crate::ship::{Ship, ShipId};
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepSpaceExpedition {
    pub id: u64,
    pub ship_id: ShipId,
    pub location_id: String,
    pub start_time: u64,
    pub end_time: u64,
}

impl DeepSpaceExpedition {
    #[must_use]
    pub fn duration_hours(&self) -> f64 {
        u64_to_f64(self.end_time.saturating_sub(self.start_time)) / u64_to_f64(MS_PER_HOUR)
    }
}

/// `min(0.98, 0.5 + 0.25 × power / (difficulty × 50))`.
#[must_use]
pub fn deep_space_success_chance(power: u64, difficulty: u32) -> f64 {
    let scale = f64::from(difficulty.max(1)) * DEEP_SPACE_POWER_PER_DIFFICULTY;
    (DEEP_SPACE_SUCCESS_BASE + DEEP_SPACE_POWER_WEIGHT * u64_to_f64(power) / scale)
        .min(DEEP_SPACE_SUCCESS_CAP)
}

/// Commit `ship_id` to a deep-space run of `hours`.
///
/// # Errors
///
/// Rejects unknown ships or locations, busy ships and durations outside the
/// location's range.
pub fn start_deep_space(
    state: &mut GameState,
    content: &GameContent,
    ship_id: &ShipId,
    location_id: &str,
    hours: u32,
    now: u64,
) -> Result<u64, CommandError> {
    state.require_ship(ship_id)?;
    let location = content
        .deep_space_location(location_id)
        .ok_or_else(|| CommandError::UnknownLocation(location_id.to_string()))?;
    if !(location.min_duration_hours..=location.max_duration_hours).contains(&hours) {
        return Err(CommandError::DurationOutOfRange {
            hours,
            min: location.min_duration_hours,
            max: location.max_duration_hours,
        });
    }
    state.ensure_idle(ship_id)?;

    let id = state.next_id();
    state.active_deep_space_expeditions.push(DeepSpaceExpedition {
        id,
        ship_id: ship_id.clone(),
        location_id: location.id.clone(),
        start_time: now,
        end_time: now.saturating_add(u64::from(hours) * MS_PER_HOUR),
    });
    log::info!("deep-space run #{id} to {} for {hours}h", location.name);
    Ok(id)
}

/// Resolve a whole run. Hourly events pick the option with the best
/// stat-to-difficulty ratio; costs are folded into the haul.
pub fn resolve_deep_space<R, E>(
    expedition: &DeepSpaceExpedition,
    ship: &Ship,
    location: &DeepSpaceLocation,
    events: &[RandomEvent],
    rng: &mut R,
    event_rng: &mut E,
) -> ExpeditionResult
where
    R: Rng + ?Sized,
    E: Rng + ?Sized,
{
    let stats = &ship.stats;
    let hours = expedition.duration_hours();
    let chance = deep_space_success_chance(combat_power(stats), location.difficulty);
    let success = rng.r#gen::<f64>() < chance;
    let critical_success = success && rng.r#gen::<f64>() < CRITICAL_SUCCESS_BASE * stats.luck;

    let mut resources = ResourceDelta::new();
    let mut xp_gained = 0;
    let mut integrity_lost = 0;
    let mut event_log = Vec::new();

    if success {
        let luck_factor = if critical_success {
            CRITICAL_LUCK_MULTIPLIER * stats.luck
        } else {
            stats.luck
        };
        xp_gained = floor_f64_to_u64(u64_to_f64(location.xp_per_hour) * hours * luck_factor);
        let multipliers = RewardMultipliers::new(stats.mining_efficiency, stats.luck)
            .with_critical(critical_success.then_some(CRITICAL_LUCK_MULTIPLIER))
            .with_scale(hours);
        resources = ResourceDelta::from_amounts(&roll_rewards(&location.rewards_per_hour, multipliers, rng));

        for _ in 0..floor_f64_to_u64(hours) {
            if rng.r#gen::<f64>() >= location.event_chance_per_hour {
                continue;
            }
            let Some(event) = select_eligible_event(events, location.difficulty, event_rng) else {
                continue;
            };
            let Some(option) = choose_best_option(event, stats) else {
                continue;
            };
            event_log.push(format!("> Event detected: {}", event.title));
            event_log.push(format!("> AI decision: \"{}\"", option.text));
            let resolution = resolve_option(option, stats, SkillCurve::Automated, event_rng);
            resources.merge(&ResourceDelta::debit(&resolution.cost));
            resources.merge(&resolution.result.resources_gained);
            integrity_lost += resolution.result.integrity_lost;
            xp_gained += resolution.result.xp_gained;
            event_log.push(format!("> Result: {}", resolution.result.log));
        }
    }

    ExpeditionResult {
        id: expedition.id,
        ship_id: ship.id.clone(),
        location_name: location.name.clone(),
        resources_gained: resources,
        items_gained: Vec::new(),
        capsule_gained: None,
        xp_gained,
        integrity_lost,
        combat_outcome: None,
        success,
        critical_success,
        combat_log: String::new(),
        is_deep_space: true,
        deep_space_event_log: event_log,
    }
}

/// Resolve every finished deep-space run into a pending result.
pub fn complete_deep_space<R, E>(
    state: &mut GameState,
    content: &GameContent,
    now: u64,
    rng: &mut R,
    event_rng: &mut E,
) -> Vec<u64>
where
    R: Rng + ?Sized,
    E: Rng + ?Sized,
{
    let (due, running): (Vec<DeepSpaceExpedition>, Vec<DeepSpaceExpedition>) =
        std::mem::take(&mut state.active_deep_space_expeditions)
            .into_iter()
            .partition(|expedition| now >= expedition.end_time);
    state.active_deep_space_expeditions = running;

    let mut completed = Vec::with_capacity(due.len());
    for expedition in due {
        let (Some(ship), Some(location)) = (
            state.ship(&expedition.ship_id),
            content.deep_space_location(&expedition.location_id),
        ) else {
            log::warn!(
                "dropping deep-space run #{}: ship {} or location {} is missing",
                expedition.id,
                expedition.ship_id,
                expedition.location_id
            );
            continue;
        };
        let result = resolve_deep_space(&expedition, ship, location, &content.events, rng, event_rng);
        if let Some(ship) = state.ship_mut(&expedition.ship_id) {
            ship.take_damage(u64_to_f64(result.integrity_lost));
        }
        log::info!(
            "deep-space run #{} finished at {} (success={}, {} events)",
            expedition.id,
            location.name,
            result.success,
            result.deep_space_event_log.len() / 3
        );
        completed.push(expedition.id);
        state.pending_results.push(result);
    }
    completed
}
