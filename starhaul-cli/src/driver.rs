use anyhow::{Context, Result, bail};
use starhaul_game::constants::MAX_ACCEPTED_MISSIONS;
use starhaul_game::events::{choose_best_option, choose_safest_option};
use starhaul_game::{
    AutopilotStep, CommandError, NarrativeSource, ShipId, SimSession, StopReason,
    accept_mission, buy_autopilot_module, claim_mission,
};

/// Scripted play-through settings.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub duration_ms: u64,
    pub tick_ms: u64,
    pub route: Vec<u32>,
    pub autopilot_modules: u32,
    pub take_missions: bool,
}

/// Counters collected while the plan runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    pub ticks: u64,
    pub launched: u32,
    pub claimed: u32,
    pub successes: u32,
    pub events_resolved: u32,
    pub autopilot_trips: u32,
    pub autopilot_stop: Option<StopReason>,
    pub missions_completed: u32,
    pub narrated: usize,
}

/// Make sure the session has a ship to fly, opening the starter box when
/// the hangar is empty.
///
/// # Errors
///
/// Fails when there is no ship and no box to open.
pub fn ensure_ship(session: &mut SimSession) -> Result<ShipId> {
    if let Some(id) = session.state().active_ship_id.clone() {
        return Ok(id);
    }
    if let Some(ship) = session.state().ships.first() {
        let id = ship.id.clone();
        session
            .with_state_mut(|state| state.set_active_ship(&id))
            .context("selecting the first ship")?;
        return Ok(id);
    }
    let id = session.open_ship_box().context("opening the starter ship box")?;
    log::info!("opened starter box: {id}");
    Ok(id)
}

fn engage_autopilot(session: &mut SimSession, plan: &RunPlan, ship: &ShipId, now: u64) -> Result<bool> {
    if plan.autopilot_modules == 0 {
        return Ok(false);
    }
    let (state, content) = session.parts_mut();
    for _ in 0..plan.autopilot_modules {
        match buy_autopilot_module(state, content) {
            Ok(remaining) => log::debug!("autopilot budget now {remaining} ms"),
            Err(err @ CommandError::InsufficientResources { .. }) => {
                log::warn!("stopped buying autopilot modules: {err}");
                break;
            }
            Err(err) => return Err(err).context("buying autopilot module"),
        }
    }
    match session.start_autopilot(ship, plan.route.clone(), now) {
        Ok(()) => Ok(true),
        Err(CommandError::AutopilotBudgetExhausted) => Ok(false),
        Err(err) => Err(err).context("engaging autopilot"),
    }
}

/// Drive `session` from `start` for the planned duration.
///
/// With autopilot modules the loop runs unattended; otherwise the ship is
/// flown by hand around the route, answering events with the strongest
/// affordable option and claiming every result.
///
/// # Errors
///
/// Fails on an empty route or when no ship can be found.
pub fn play<N>(session: &mut SimSession, plan: &RunPlan, start: u64, narrator: &mut N) -> Result<RunTally>
where
    N: NarrativeSource + ?Sized,
{
    if plan.route.is_empty() {
        bail!("route must name at least one location");
    }
    let ship = ensure_ship(session)?;
    let mut tally = RunTally::default();
    let autopilot = engage_autopilot(session, plan, &ship, start)?;
    let mut leg = 0_usize;
    let end = start.saturating_add(plan.duration_ms);
    let mut now = start;

    while now < end {
        now = now.saturating_add(plan.tick_ms.max(1)).min(end);
        let report = session.advance(now, narrator);
        tally.ticks += 1;
        tally.narrated += report.narrated;
        match report.autopilot {
            AutopilotStep::Returned(_) => tally.autopilot_trips += 1,
            AutopilotStep::Stopped(reason) => tally.autopilot_stop = Some(reason),
            _ => {}
        }

        for result_id in report.completed {
            if let Some(result) = session.claim(result_id) {
                tally.claimed += 1;
                if result.success {
                    tally.successes += 1;
                }
            }
        }
        tally.events_resolved += answer_events(session, now);
        if plan.take_missions {
            tally.missions_completed += work_missions(session);
        }
        if !autopilot && !session.state().is_ship_busy(&ship) {
            let location = plan.route[leg % plan.route.len()];
            match session.launch(&ship, location, now) {
                Ok(id) => {
                    tally.launched += 1;
                    leg += 1;
                    log::debug!("manual launch #{id} to location {location}");
                }
                Err(err) => log::debug!("launch deferred: {err}"),
            }
        }
    }
    tally.narrated += session.enrich_narrative(narrator);
    Ok(tally)
}

fn answer_events(session: &mut SimSession, now: u64) -> u32 {
    let pending: Vec<(u64, usize)> = session
        .state()
        .active_expeditions
        .iter()
        .filter(|expedition| expedition.is_paused)
        .filter_map(|expedition| {
            let event = expedition.active_event.as_ref()?;
            let state = session.state();
            let stats = &state.ship(&expedition.ship_id)?.stats;
            let best = choose_best_option(event, stats)?;
            let pick = if state.resources.can_afford(&best.cost) {
                best
            } else {
                choose_safest_option(event)?
            };
            let index = event
                .options
                .iter()
                .position(|option| std::ptr::eq(option, pick))?;
            Some((expedition.id, index))
        })
        .collect();

    let mut resolved = 0;
    for (expedition_id, option) in pending {
        match session.resolve_event(expedition_id, option, now) {
            Ok(_) => resolved += 1,
            Err(err) => log::warn!("could not answer event on #{expedition_id}: {err}"),
        }
    }
    resolved
}

fn work_missions(session: &mut SimSession) -> u32 {
    session.with_state_mut(|state| {
        let accepted: Vec<u64> = state
            .mission_state
            .accepted_missions
            .iter()
            .map(|mission| mission.id)
            .collect();
        let mut completed = 0;
        for id in accepted {
            if claim_mission(state, id).is_ok() {
                completed += 1;
            }
        }
        while state.mission_state.accepted_missions.len() < MAX_ACCEPTED_MISSIONS {
            // smallest delivery first
            let Some(id) = state
                .mission_state
                .available_missions
                .iter()
                .min_by_key(|mission| mission.objective.amount)
                .map(|mission| mission.id)
            else {
                break;
            };
            if accept_mission(state, id).is_err() {
                break;
            }
        }
        completed
    })
}
