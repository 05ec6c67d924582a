//! Live expeditions: launch, milestone checks, event pauses and completion.

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::combat::{ExpeditionResult, resolve_expedition};
use crate::constants::{HAZARD_DAMAGE_MAX, HAZARD_DAMAGE_MIN, MILESTONE_EVENT_CHANCE};
use crate::content::GameContent;
use crate::error::CommandError;
use crate::events::{EventResult, RandomEvent, SkillCurve, eligible_events, pay_and_resolve, select_eligible_event};
use crate::locations::Location;
use crate::narrative::{LogLine, NarrativeTarget, event_fallback};
use crate::numbers::{floor_f64_to_u64, u64_to_f64};
use crate::resources::ResourceId;
use crate::rewards::uniform;
use crate::ship::{Ship, ShipId};
use crate::state::GameState;

/// Fractional progress checkpoint. Persisted as its fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum Milestone {
    Quarter,
    Half,
    ThreeQuarters,
}

impl Milestone {
    pub const ALL: [Self; 3] = [Self::Quarter, Self::Half, Self::ThreeQuarters];

    #[must_use]
    pub const fn fraction(self) -> f64 {
        match self {
            Self::Quarter => 0.25,
            Self::Half => 0.5,
            Self::ThreeQuarters => 0.75,
        }
    }
}

impl From<Milestone> for f64 {
    fn from(milestone: Milestone) -> Self {
        milestone.fraction()
    }
}

impl TryFrom<f64> for Milestone {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|milestone| (milestone.fraction() - value).abs() < 1e-9)
            .ok_or_else(|| format!("{value} is not a milestone fraction"))
    }
}

pub type MilestoneSet = SmallVec<[Milestone; 3]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expedition {
    pub id: u64,
    pub ship_id: ShipId,
    pub location_id: u32,
    pub start_time: u64,
    pub end_time: u64,
    pub starting_integrity: f64,
    pub current_integrity: f64,
    #[serde(default)]
    pub milestones: MilestoneSet,
    #[serde(default)]
    pub active_event: Option<RandomEvent>,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub last_pause_start_time: Option<u64>,
    #[serde(default)]
    pub log: Vec<LogLine>,
    /// Owned by the autopilot loop, which resolves it without pauses.
    #[serde(default)]
    pub is_auto: bool,
}

impl Expedition {
    #[must_use]
    pub fn has_visited(&self, milestone: Milestone) -> bool {
        self.milestones.contains(&milestone)
    }

    /// Elapsed fraction of the trip at `now`. Zero-length trips count as done.
    #[must_use]
    pub fn progress(&self, now: u64) -> f64 {
        let duration = self.end_time.saturating_sub(self.start_time);
        if duration == 0 {
            return 1.0;
        }
        u64_to_f64(now.saturating_sub(self.start_time)) / u64_to_f64(duration)
    }

    #[must_use]
    pub const fn is_due(&self, now: u64) -> bool {
        !self.is_paused && now >= self.end_time
    }

    fn push_log(&mut self, text: impl Into<String>) -> usize {
        self.log.push(LogLine::plain(text));
        self.log.len() - 1
    }

    #[cfg(test)]
    pub(crate) fn for_test(id: u64, ship: &Ship, start_time: u64, end_time: u64) -> Self {
        Self {
            id,
            ship_id: ship.id.clone(),
            location_id: 1,
            start_time,
            end_time,
            starting_integrity: ship.stats.integrity,
            current_integrity: ship.stats.integrity,
            milestones: MilestoneSet::new(),
            active_event: None,
            is_paused: false,
            last_pause_start_time: None,
            log: Vec::new(),
            is_auto: false,
        }
    }
}

/// What happened to one expedition during a milestone pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MilestoneReport {
    pub visited: Vec<(u64, Milestone)>,
    pub hazard_damage: Vec<(u64, u64)>,
    pub paused: Vec<u64>,
}

/// Send `ship_id` to `location_id`, paying the fuel cost.
///
/// # Errors
///
/// Rejects unknown ships or locations, ships already away and missing fuel.
/// Nothing is mutated on rejection.
pub fn launch_expedition(
    state: &mut GameState,
    content: &GameContent,
    ship_id: &ShipId,
    location_id: u32,
    now: u64,
    is_auto: bool,
) -> Result<u64, CommandError> {
    let ship = state.require_ship(ship_id)?;
    let location = content
        .location(location_id)
        .ok_or_else(|| CommandError::UnknownLocation(location_id.to_string()))?;
    state.ensure_idle(ship_id)?;

    let duration = location.trip_duration_ms(ship.stats.speed);
    let integrity = ship.stats.integrity;
    state.resources.try_spend(ResourceId::Fuel, location.fuel_cost)?;

    let id = state.next_id();
    let mut expedition = Expedition {
        id,
        ship_id: ship_id.clone(),
        location_id,
        start_time: now,
        end_time: now.saturating_add(duration),
        starting_integrity: integrity,
        current_integrity: integrity,
        milestones: MilestoneSet::new(),
        active_event: None,
        is_paused: false,
        last_pause_start_time: None,
        log: Vec::new(),
        is_auto,
    };
    expedition.push_log(format!("Expedition to {} launched.", location.name));
    log::info!("expedition #{id} launched to {} ({duration} ms)", location.name);
    state.active_expeditions.push(expedition);
    Ok(id)
}

fn hazard_damage<R: Rng + ?Sized>(location: &Location, rng: &mut R) -> u64 {
    floor_f64_to_u64(
        f64::from(location.difficulty) * uniform(rng, HAZARD_DAMAGE_MIN, HAZARD_DAMAGE_MAX),
    )
}

/// Visit every newly crossed checkpoint of one expedition, in order.
/// Returns as soon as an event pauses the trip.
fn visit_milestones<R, E>(
    expedition: &mut Expedition,
    location: &Location,
    events: &[RandomEvent],
    now: u64,
    rng: &mut R,
    event_rng: &mut E,
    report: &mut MilestoneReport,
) where
    R: Rng + ?Sized,
    E: Rng + ?Sized,
{
    let progress = expedition.progress(now);
    for milestone in Milestone::ALL {
        if expedition.has_visited(milestone) || progress < milestone.fraction() {
            continue;
        }
        expedition.milestones.push(milestone);
        report.visited.push((expedition.id, milestone));
        log::debug!("expedition #{} crossed {:?}", expedition.id, milestone);

        if rng.r#gen::<f64>() < location.hazard_chance {
            let damage = hazard_damage(location, rng);
            expedition.current_integrity = (expedition.current_integrity - u64_to_f64(damage)).max(0.0);
            expedition.push_log(format!("ALERT: environmental hazard! The ship took {damage} damage."));
            report.hazard_damage.push((expedition.id, damage));
        }

        if !eligible_events(events, location.difficulty).is_empty()
            && rng.r#gen::<f64>() < MILESTONE_EVENT_CHANCE
            && let Some(event) = select_eligible_event(events, location.difficulty, event_rng)
        {
            expedition.push_log(format!("{}: awaiting orders.", event.title));
            expedition.active_event = Some(event.clone());
            expedition.is_paused = true;
            expedition.last_pause_start_time = Some(now);
            report.paused.push(expedition.id);
            log::info!("expedition #{} paused for {}", expedition.id, event.id);
            return;
        }
    }
}

/// Per-tick milestone pass over running, player-owned expeditions.
pub fn evaluate_milestones<R, E>(
    state: &mut GameState,
    content: &GameContent,
    now: u64,
    rng: &mut R,
    event_rng: &mut E,
) -> MilestoneReport
where
    R: Rng + ?Sized,
    E: Rng + ?Sized,
{
    let mut report = MilestoneReport::default();
    for expedition in &mut state.active_expeditions {
        if expedition.is_paused || expedition.is_auto || now >= expedition.end_time {
            continue;
        }
        let Some(location) = content.location(expedition.location_id) else {
            continue;
        };
        visit_milestones(expedition, location, &content.events, now, rng, event_rng, &mut report);
    }
    report
}

/// Answer the event pausing `expedition_id` with option `option_index`.
///
/// The option cost is paid first, effects land immediately, then the trip
/// resumes with its end time pushed back by the time spent paused.
///
/// # Errors
///
/// Rejects unknown expeditions, expeditions that are not paused and
/// out-of-range options without mutating state.
pub fn resolve_active_event<R>(
    state: &mut GameState,
    expedition_id: u64,
    option_index: usize,
    now: u64,
    rng: &mut R,
) -> Result<EventResult, CommandError>
where
    R: Rng + ?Sized,
{
    let index = state
        .active_expeditions
        .iter()
        .position(|expedition| expedition.id == expedition_id)
        .ok_or(CommandError::UnknownExpedition(expedition_id))?;
    let expedition = &state.active_expeditions[index];
    let event = match (&expedition.active_event, expedition.is_paused) {
        (Some(event), true) => event.clone(),
        _ => return Err(CommandError::NoActiveEvent(expedition_id)),
    };
    let option = event
        .options
        .get(option_index)
        .ok_or(CommandError::UnknownOption(option_index))?;
    let ship = state.require_ship(&expedition.ship_id)?;
    let stats = ship.stats.clone();
    let ship_name = ship.name.clone();
    let ship_id = ship.id.clone();

    let resolution = pay_and_resolve(option, &stats, SkillCurve::Interactive, &mut state.resources, rng);
    let result = resolution.result;
    state.resources.apply(&result.resources_gained);
    state.player_state.add_xp(result.xp_gained);

    let context = format!(
        "The ship {ship_name} encountered \"{}\". Action: \"{}\". Result: {}.",
        event.title,
        option.text,
        if resolution.succeeded { "Success" } else { "Failure" }
    );
    let expedition = &mut state.active_expeditions[index];
    expedition.current_integrity =
        (expedition.current_integrity - u64_to_f64(result.integrity_lost)).max(0.0);
    let line = expedition.push_log(event_fallback(&context));
    let paused_for = now.saturating_sub(expedition.last_pause_start_time.unwrap_or(now));
    expedition.end_time = expedition.end_time.saturating_add(paused_for);
    expedition.is_paused = false;
    expedition.active_event = None;
    expedition.last_pause_start_time = None;
    let integrity = expedition.current_integrity;

    if let Some(ship) = state.ship_mut(&ship_id) {
        ship.set_integrity(integrity);
    }
    state
        .narrative
        .push(NarrativeTarget::Expedition(expedition_id), line, context);
    log::info!("expedition #{expedition_id} resumed after {paused_for} ms");
    Ok(result)
}

/// Turn every due player-owned expedition into a pending result.
///
/// Expeditions whose ship or location vanished are dropped with a warning.
pub fn complete_due_expeditions<R>(
    state: &mut GameState,
    content: &GameContent,
    now: u64,
    rng: &mut R,
) -> Vec<u64>
where
    R: Rng + ?Sized,
{
    let (due, running): (Vec<Expedition>, Vec<Expedition>) = std::mem::take(&mut state.active_expeditions)
        .into_iter()
        .partition(|expedition| !expedition.is_auto && expedition.is_due(now));
    state.active_expeditions = running;

    let mut completed = Vec::with_capacity(due.len());
    for expedition in due {
        let (Some(ship), Some(location)) = (
            state.ship(&expedition.ship_id),
            content.location(expedition.location_id),
        ) else {
            log::warn!(
                "dropping expedition #{}: ship {} or location {} is missing",
                expedition.id,
                expedition.ship_id,
                expedition.location_id
            );
            continue;
        };
        let result = resolve_expedition(&expedition, ship, location, content, rng);
        if let Some(ship) = state.ship_mut(&expedition.ship_id) {
            ship.set_integrity(expedition.current_integrity);
        }
        log::info!(
            "expedition #{} completed at {} (success={})",
            expedition.id,
            location.name,
            result.success
        );
        completed.push(expedition.id);
        state.pending_results.push(result);
    }
    completed
}

/// Take a pending result and credit it. A second claim yields `None`.
pub fn claim_result(state: &mut GameState, result_id: u64) -> Option<ExpeditionResult> {
    let index = state
        .pending_results
        .iter()
        .position(|result| result.id == result_id)?;
    let result = state.pending_results.remove(index);

    state.resources.apply(&result.resources_gained);
    if let Some(outcome) = &result.combat_outcome {
        state.resources.credit_all(&outcome.special_loot);
    }
    state.inventory.extend(result.items_gained.iter().cloned());
    if let Some(rarity) = result.capsule_gained {
        state.add_capsule(rarity);
    }
    state.player_state.add_xp(result.xp_gained);
    Some(result)
}
