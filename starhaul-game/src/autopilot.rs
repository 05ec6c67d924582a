//! Unattended trip loop with a purchasable time budget and offline replay.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTOPILOT_CAPSULE_RARITIES, AUTOPILOT_EVENT_CHANCE, AUTOPILOT_NARRATIVE_CHANCE,
    AUTOPILOT_REPAIR_THRESHOLD, HAZARD_DAMAGE_MAX, HAZARD_DAMAGE_MIN,
};
use crate::content::GameContent;
use crate::error::CommandError;
use crate::events::{
    RandomEvent, SkillCurve, choose_safest_option, eligible_events, resolve_option,
    select_eligible_event,
};
use crate::expedition::launch_expedition;
use crate::locations::{Location, trip_duration_ms};
use crate::narrative::{LogLine, NarrativeTarget, autopilot_fallback, clock_stamp};
use crate::numbers::{floor_f64_to_u64, u64_to_f64};
use crate::rarity::{Rarity, draw_uniform};
use crate::resources::{ResourceDelta, ResourceId, ResourceRegistry};
use crate::rewards::{RewardMultipliers, roll_rewards, uniform};
use crate::ship::{ShipId, ShipStats};
use crate::state::GameState;
use crate::store::use_consumable;

/// Everything earned since the autopilot was engaged, credited on stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGains {
    #[serde(default)]
    pub resources: ResourceDelta,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub capsules: Vec<Rarity>,
}

impl SessionGains {
    pub fn fold(&mut self, trip: &TripOutcome) {
        self.resources.merge(&trip.resources);
        self.xp = self.xp.saturating_add(trip.xp);
        self.capsules.extend(trip.capsule);
    }

    pub fn merge(&mut self, other: &Self) {
        self.resources.merge(&other.resources);
        self.xp = self.xp.saturating_add(other.xp);
        self.capsules.extend(other.capsules.iter().copied());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.xp == 0 && self.capsules.is_empty()
    }

    fn credit(&self, state: &mut GameState) {
        state.resources.apply(&self.resources);
        state.player_state.add_xp(self.xp);
        for rarity in &self.capsules {
            state.add_capsule(*rarity);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPilotState {
    pub active: bool,
    pub remaining_time_ms: u64,
    #[serde(default)]
    pub ship_id: Option<ShipId>,
    #[serde(default)]
    pub location_ids: Vec<u32>,
    #[serde(default)]
    pub cycle_index: usize,
    #[serde(default)]
    pub last_update_time: u64,
    #[serde(default)]
    pub log: Vec<LogLine>,
    #[serde(default)]
    pub session_gains: SessionGains,
}

impl AutoPilotState {
    fn stamp(&mut self, now: u64, text: &str) -> usize {
        self.log.push(LogLine::plain(format!("[{}] {text}", clock_stamp(now))));
        self.log.len() - 1
    }

    #[must_use]
    pub fn current_location(&self) -> Option<u32> {
        if self.location_ids.is_empty() {
            return None;
        }
        self.location_ids.get(self.cycle_index % self.location_ids.len()).copied()
    }
}

/// Summary shown after a session ends, live or replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotReport {
    pub gains: SessionGains,
    pub log: Vec<LogLine>,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub trips: u32,
    #[serde(default)]
    pub simulated_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    BudgetExhausted,
    ShipMissing,
    LocationMissing,
    OutOfFuel,
}

/// What one reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutopilotStep {
    Inactive,
    /// The ship is away on a trip that has not ended yet.
    InFlight,
    /// The ship is held by something else, e.g. a player expedition.
    Waiting,
    Launched(u64),
    Returned(u64),
    Stopped(StopReason),
}

/// Result of one unattended trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripOutcome {
    pub resources: ResourceDelta,
    pub xp: u64,
    pub capsule: Option<Rarity>,
    pub integrity_lost: u64,
    pub log: Vec<String>,
}

/// Roll one trip: rewards, capsule, hazard, then maybe an event answered with
/// the safest option.
pub fn simulate_trip<R, E>(
    stats: &ShipStats,
    location: &Location,
    events: &[RandomEvent],
    rng: &mut R,
    event_rng: &mut E,
) -> TripOutcome
where
    R: Rng + ?Sized,
    E: Rng + ?Sized,
{
    let multipliers = RewardMultipliers::new(stats.mining_efficiency, stats.luck);
    let mut outcome = TripOutcome {
        resources: ResourceDelta::from_amounts(&roll_rewards(&location.rewards, multipliers, rng)),
        xp: location.xp_reward,
        ..TripOutcome::default()
    };

    if rng.r#gen::<f64>() < location.capsule_chance * stats.luck {
        outcome.capsule = draw_uniform(&AUTOPILOT_CAPSULE_RARITIES, rng);
    }

    if rng.r#gen::<f64>() < location.hazard_chance {
        let damage = floor_f64_to_u64(
            f64::from(location.difficulty) * uniform(rng, HAZARD_DAMAGE_MIN, HAZARD_DAMAGE_MAX),
        );
        outcome.integrity_lost += damage;
        outcome.log.push(format!("Environmental hazard detected. Damage taken: {damage}."));
    } else {
        outcome.log.push("Smooth sailing, no immediate hazards.".to_string());
    }

    if !eligible_events(events, location.difficulty).is_empty()
        && rng.r#gen::<f64>() < AUTOPILOT_EVENT_CHANCE
        && let Some(event) = select_eligible_event(events, location.difficulty, event_rng)
        && let Some(option) = choose_safest_option(event)
    {
        let resolution = resolve_option(option, stats, SkillCurve::Automated, event_rng);
        outcome.log.push(format!(
            "Event encountered: \"{}\". Decision: \"{}\". {}",
            event.title,
            option.text,
            if resolution.succeeded { "Success." } else { "Failure." }
        ));
        outcome.resources.merge(&ResourceDelta::debit(&resolution.cost));
        outcome.resources.merge(&resolution.result.resources_gained);
        outcome.integrity_lost += resolution.result.integrity_lost;
        outcome.xp = outcome.xp.saturating_add(resolution.result.xp_gained);
    }
    outcome
}

fn describe_trip(trip: &TripOutcome, registry: &ResourceRegistry) -> String {
    let mut context = "Returned successfully.".to_string();
    let gained: Vec<String> = trip
        .resources
        .gains()
        .map(|(id, amount)| format!("{amount} {}", registry.name(id)))
        .collect();
    if !gained.is_empty() {
        context.push_str(&format!(" Resources gained: {}.", gained.join(", ")));
    }
    if trip.integrity_lost > 0 {
        context.push_str(&format!(" The ship took {} damage.", trip.integrity_lost));
    }
    if let Some(rarity) = trip.capsule {
        context.push_str(&format!(" A {rarity} capsule was found."));
    }
    context
}

/// Engage the autopilot for `ship_id` over `location_ids`.
///
/// # Errors
///
/// Rejects an already running loop, an empty budget, an empty or unknown
/// route and unknown or busy ships.
pub fn start_autopilot(
    state: &mut GameState,
    content: &GameContent,
    ship_id: &ShipId,
    location_ids: Vec<u32>,
    now: u64,
) -> Result<(), CommandError> {
    if state.auto_pilot_state.active {
        return Err(CommandError::AutopilotActive);
    }
    if state.auto_pilot_state.remaining_time_ms == 0 {
        return Err(CommandError::AutopilotBudgetExhausted);
    }
    if location_ids.is_empty() {
        return Err(CommandError::EmptyRoute);
    }
    if let Some(missing) = location_ids.iter().find(|id| content.location(**id).is_none()) {
        return Err(CommandError::UnknownLocation(missing.to_string()));
    }
    let ship_name = state.require_ship(ship_id)?.name.clone();
    state.ensure_idle(ship_id)?;

    let autopilot = &mut state.auto_pilot_state;
    autopilot.active = true;
    autopilot.ship_id = Some(ship_id.clone());
    autopilot.location_ids = location_ids;
    autopilot.cycle_index = 0;
    autopilot.last_update_time = now;
    autopilot.log.clear();
    autopilot.session_gains = SessionGains::default();
    autopilot.stamp(now, &format!("Autopilot engaged for {ship_name}."));
    state.autopilot_report = None;
    log::info!("autopilot engaged for {ship_id}");
    Ok(())
}

/// Disengage, crediting session gains and keeping the unspent budget.
/// Returns `None` when the loop was not running.
pub fn stop_autopilot(state: &mut GameState, now: u64, reason: StopReason) -> Option<AutopilotReport> {
    if !state.auto_pilot_state.active {
        return None;
    }
    let previous = std::mem::take(&mut state.auto_pilot_state);
    let elapsed = now.saturating_sub(previous.last_update_time);
    state.auto_pilot_state.remaining_time_ms = previous.remaining_time_ms.saturating_sub(elapsed);
    state.auto_pilot_state.last_update_time = now;
    state.active_expeditions.retain(|expedition| !expedition.is_auto);

    previous.session_gains.credit(state);
    let report = AutopilotReport {
        gains: previous.session_gains,
        log: previous.log,
        offline: false,
        trips: u32::try_from(previous.cycle_index).unwrap_or(u32::MAX),
        simulated_ms: 0,
    };
    match reason {
        StopReason::Requested | StopReason::BudgetExhausted => {
            log::info!("autopilot stopped: {reason:?}");
        }
        StopReason::ShipMissing | StopReason::LocationMissing | StopReason::OutOfFuel => {
            log::warn!("autopilot forced to stop: {reason:?}");
        }
    }
    state.autopilot_report = Some(report.clone());
    Some(report)
}

fn prepare_departure(state: &mut GameState, content: &GameContent, ship_id: &ShipId, location: &Location, now: u64) {
    let needs_repair = state
        .ship(ship_id)
        .is_some_and(|ship| ship.stats.integrity < ship.stats.max_integrity * AUTOPILOT_REPAIR_THRESHOLD);
    if needs_repair
        && state.resources.get(ResourceId::RepairCapsule) > 0
        && use_consumable(state, content, ResourceId::RepairCapsule, Some(ship_id)).is_ok()
    {
        state.auto_pilot_state.stamp(now, "Repair capsule consumed.");
    }
    if state.resources.get(ResourceId::Fuel) < location.fuel_cost
        && state.resources.get(ResourceId::FuelCapsule) > 0
        && use_consumable(state, content, ResourceId::FuelCapsule, None).is_ok()
    {
        state.auto_pilot_state.stamp(now, "Fuel capsule consumed.");
    }
}

/// Live reconciliation, called once per tick.
pub fn tick_autopilot<R, E>(
    state: &mut GameState,
    content: &GameContent,
    now: u64,
    rng: &mut R,
    event_rng: &mut E,
) -> AutopilotStep
where
    R: Rng + ?Sized,
    E: Rng + ?Sized,
{
    if !state.auto_pilot_state.active {
        return AutopilotStep::Inactive;
    }
    let elapsed = now.saturating_sub(state.auto_pilot_state.last_update_time);
    if elapsed >= state.auto_pilot_state.remaining_time_ms {
        stop_autopilot(state, now, StopReason::BudgetExhausted);
        return AutopilotStep::Stopped(StopReason::BudgetExhausted);
    }
    state.auto_pilot_state.remaining_time_ms -= elapsed;
    state.auto_pilot_state.last_update_time = now;

    let Some(ship_id) = state
        .auto_pilot_state
        .ship_id
        .clone()
        .filter(|id| state.ship(id).is_some())
    else {
        stop_autopilot(state, now, StopReason::ShipMissing);
        return AutopilotStep::Stopped(StopReason::ShipMissing);
    };

    let in_flight = state
        .active_expeditions
        .iter()
        .find(|expedition| expedition.is_auto)
        .map(|expedition| (expedition.id, expedition.location_id, expedition.end_time));

    match in_flight {
        None => {
            let Some(location) = state
                .auto_pilot_state
                .current_location()
                .and_then(|id| content.location(id))
            else {
                stop_autopilot(state, now, StopReason::LocationMissing);
                return AutopilotStep::Stopped(StopReason::LocationMissing);
            };
            prepare_departure(state, content, &ship_id, location, now);
            if state.resources.get(ResourceId::Fuel) < location.fuel_cost {
                state.auto_pilot_state.stamp(now, "Insufficient fuel. Autopilot disengaged.");
                stop_autopilot(state, now, StopReason::OutOfFuel);
                return AutopilotStep::Stopped(StopReason::OutOfFuel);
            }
            match launch_expedition(state, content, &ship_id, location.id, now, true) {
                Ok(id) => {
                    let ship_name = state.ship(&ship_id).map(|ship| ship.name.clone()).unwrap_or_default();
                    state
                        .auto_pilot_state
                        .stamp(now, &format!("{ship_name} departed for {}.", location.name));
                    AutopilotStep::Launched(id)
                }
                Err(err) => {
                    log::debug!("autopilot waiting: {err}");
                    AutopilotStep::Waiting
                }
            }
        }
        Some((id, location_id, end_time)) if now >= end_time => {
            state.active_expeditions.retain(|expedition| expedition.id != id);
            let (Some(ship), Some(location)) = (state.ship(&ship_id), content.location(location_id)) else {
                stop_autopilot(state, now, StopReason::LocationMissing);
                return AutopilotStep::Stopped(StopReason::LocationMissing);
            };
            let trip = simulate_trip(&ship.stats, location, &content.events, rng, event_rng);
            if let Some(ship) = state.ship_mut(&ship_id) {
                ship.take_damage(u64_to_f64(trip.integrity_lost));
            }
            record_live_trip(state, content, location, &trip, now, rng);
            state.auto_pilot_state.session_gains.fold(&trip);
            state.auto_pilot_state.cycle_index += 1;
            log::debug!("autopilot trip #{id} returned from {}", location.name);
            AutopilotStep::Returned(id)
        }
        Some(_) => AutopilotStep::InFlight,
    }
}

fn record_live_trip<R>(
    state: &mut GameState,
    content: &GameContent,
    location: &Location,
    trip: &TripOutcome,
    now: u64,
    rng: &mut R,
) where
    R: Rng + ?Sized,
{
    for line in &trip.log {
        state.auto_pilot_state.stamp(now, line);
    }
    let context = describe_trip(trip, &content.resources);
    if rng.r#gen::<f64>() < AUTOPILOT_NARRATIVE_CHANCE {
        let autopilot = &mut state.auto_pilot_state;
        autopilot
            .log
            .push(LogLine::plain(autopilot_fallback(now, &location.name, &context)));
        let line = autopilot.log.len() - 1;
        state.narrative.push(NarrativeTarget::Autopilot, line, context);
    } else {
        let gained: Vec<String> = trip
            .resources
            .gains()
            .map(|(id, amount)| format!("{amount} {}", content.resources.name(id)))
            .collect();
        let mut text = format!("Returned from {}.", location.name);
        if !gained.is_empty() {
            text.push_str(&format!(" Resources: {}.", gained.join(", ")));
        }
        state.auto_pilot_state.stamp(now, &text);
    }
}

/// Compress the time spent offline into whole trips.
///
/// Replays at most `min(now − lastUpdateTime, remainingTimeMs)`; the budget
/// is reduced by the summed trip durations only. The loop ends disengaged.
pub fn replay_offline<R, E>(
    state: &mut GameState,
    content: &GameContent,
    now: u64,
    rng: &mut R,
    event_rng: &mut E,
) -> Option<AutopilotReport>
where
    R: Rng + ?Sized,
    E: Rng + ?Sized,
{
    let autopilot = &state.auto_pilot_state;
    if !autopilot.active || autopilot.location_ids.is_empty() {
        return None;
    }
    let ship_id = autopilot.ship_id.clone()?;
    let offline_ms = now.saturating_sub(autopilot.last_update_time);
    let budget = offline_ms.min(autopilot.remaining_time_ms);

    let mut gains = std::mem::take(&mut state.auto_pilot_state.session_gains);
    let mut log = vec![LogLine::plain(format!(
        "[{}] Back in range. Computing offline progress...",
        clock_stamp(now)
    ))];
    let mut simulated = 0_u64;
    let mut trips = 0_u32;

    loop {
        let Some(stats) = state.ship(&ship_id).map(|ship| ship.stats.clone()) else {
            log::warn!("offline replay stopped: ship {ship_id} is missing");
            break;
        };
        let Some(location) = state
            .auto_pilot_state
            .current_location()
            .and_then(|id| content.location(id))
        else {
            log::warn!("offline replay stopped: route location is missing");
            break;
        };
        let duration = trip_duration_ms(location.difficulty, stats.speed);
        if simulated.saturating_add(duration) > budget {
            break;
        }
        simulated += duration;

        let trip = simulate_trip(&stats, location, &content.events, rng, event_rng);
        log.extend(trip.log.iter().map(|line| LogLine::plain(format!("[AFK] {line}"))));
        if let Some(ship) = state.ship_mut(&ship_id) {
            ship.take_damage(u64_to_f64(trip.integrity_lost));
        }
        gains.fold(&trip);
        trips += 1;
        state.auto_pilot_state.cycle_index += 1;
    }

    state.active_expeditions.retain(|expedition| !expedition.is_auto);
    gains.credit(state);

    let autopilot = &mut state.auto_pilot_state;
    autopilot.active = false;
    autopilot.remaining_time_ms = autopilot.remaining_time_ms.saturating_sub(simulated);
    autopilot.last_update_time = now;
    log::info!("offline replay simulated {trips} trips over {simulated} ms");

    if simulated == 0 && gains.is_empty() {
        return None;
    }
    let report = AutopilotReport {
        gains,
        log,
        offline: true,
        trips,
        simulated_ms: simulated,
    };
    state.autopilot_report = Some(report.clone());
    Some(report)
}
