//! Deterministic scheduler wrapping state, content and random streams.

use crate::autopilot::{
    AutopilotReport, AutopilotStep, StopReason, replay_offline, start_autopilot, stop_autopilot,
    tick_autopilot,
};
use crate::combat::ExpeditionResult;
use crate::content::GameContent;
use crate::deep_space::{complete_deep_space, start_deep_space};
use crate::error::CommandError;
use crate::events::EventResult;
use crate::expedition::{
    MilestoneReport, claim_result, complete_due_expeditions, evaluate_milestones,
    launch_expedition, resolve_active_event,
};
use crate::missions::refresh_missions_if_needed;
use crate::narrative::{LogLine, NarrativeSource, NarrativeTarget, annotate};
use crate::resources::ResourceAmounts;
use crate::rng::RngBundle;
use crate::save::SaveDocument;
use crate::ship::ShipId;
use crate::state::GameState;
use crate::store::{open_capsule, open_ship_box};

/// What one [`SimSession::advance`] call did, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub now: u64,
    pub milestones: MilestoneReport,
    pub completed: Vec<u64>,
    pub deep_space_completed: Vec<u64>,
    pub autopilot: AutopilotStep,
    pub missions_refreshed: bool,
    pub narrated: usize,
}

/// Work done while bringing a saved game back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub offline_autopilot: Option<AutopilotReport>,
    pub missions_refreshed: bool,
}

/// Owns one game and drives it forward in fixed order.
#[derive(Debug)]
pub struct SimSession {
    state: GameState,
    content: GameContent,
    rng: RngBundle,
}

impl SimSession {
    #[must_use]
    pub fn new(content: GameContent, seed: u64) -> Self {
        Self {
            state: GameState::new(seed),
            content,
            rng: RngBundle::from_user_seed(seed),
        }
    }

    /// Restore a saved game: replay any offline autopilot time, then
    /// refresh a stale mission board.
    #[must_use]
    pub fn resume(content: GameContent, document: SaveDocument, now: u64) -> (Self, LoadReport) {
        let state = document.data;
        let rng = RngBundle::resumed(state.seed, state.save_time);
        let mut session = Self { state, content, rng };

        let offline_autopilot = replay_offline(
            &mut session.state,
            &session.content,
            now,
            &mut *session.rng.autopilot(),
            &mut *session.rng.events(),
        );
        let missions_refreshed = session.refresh_missions(now);
        (
            session,
            LoadReport {
                offline_autopilot,
                missions_refreshed,
            },
        )
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn content(&self) -> &GameContent {
        &self.content
    }

    /// Mutable state alongside the read-only catalogs, for commands that
    /// need no randomness.
    pub fn parts_mut(&mut self) -> (&mut GameState, &GameContent) {
        (&mut self.state, &self.content)
    }

    pub fn with_state_mut<F, T>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut GameState) -> T,
    {
        f(&mut self.state)
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    #[must_use]
    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }

    #[must_use]
    pub fn save(&self, now: u64) -> SaveDocument {
        SaveDocument::capture(&self.state, now)
    }

    /// One scheduler step. Never fails: missing references degrade into
    /// forced stops inside the individual passes.
    ///
    /// Order: milestones, live completions, deep-space completions,
    /// autopilot, mission board, then narrative enrichment.
    pub fn advance<N>(&mut self, now: u64, narrator: &mut N) -> TickReport
    where
        N: NarrativeSource + ?Sized,
    {
        let milestones = evaluate_milestones(
            &mut self.state,
            &self.content,
            now,
            &mut *self.rng.expedition(),
            &mut *self.rng.events(),
        );
        let completed = complete_due_expeditions(&mut self.state, &self.content, now, &mut *self.rng.expedition());
        let deep_space_completed = complete_deep_space(
            &mut self.state,
            &self.content,
            now,
            &mut *self.rng.rewards(),
            &mut *self.rng.events(),
        );
        let autopilot = tick_autopilot(
            &mut self.state,
            &self.content,
            now,
            &mut *self.rng.autopilot(),
            &mut *self.rng.events(),
        );
        let missions_refreshed = self.refresh_missions(now);
        let narrated = self.enrich_narrative(narrator);
        TickReport {
            now,
            milestones,
            completed,
            deep_space_completed,
            autopilot,
            missions_refreshed,
            narrated,
        }
    }

    fn refresh_missions(&mut self, now: u64) -> bool {
        refresh_missions_if_needed(
            &mut self.state,
            &self.content.missions,
            &self.content.resources,
            now,
            &mut *self.rng.missions(),
        )
    }

    /// Hand queued requests to `narrator`. Returns how many lines changed.
    pub fn enrich_narrative<N>(&mut self, narrator: &mut N) -> usize
    where
        N: NarrativeSource + ?Sized,
    {
        let requests: Vec<_> = self.state.narrative.drain().collect();
        let mut narrated = 0;
        for request in requests {
            let Some(line) = self.log_line_mut(request.target, request.line_index) else {
                log::debug!("narrative target {:?} is gone", request.target);
                continue;
            };
            if annotate(line, narrator, &request.context) {
                narrated += 1;
            }
        }
        narrated
    }

    fn log_line_mut(&mut self, target: NarrativeTarget, index: usize) -> Option<&mut LogLine> {
        match target {
            NarrativeTarget::Expedition(id) => self
                .state
                .active_expeditions
                .iter_mut()
                .find(|expedition| expedition.id == id)
                .and_then(|expedition| expedition.log.get_mut(index)),
            // a loop stopped this tick has moved its log into the report
            NarrativeTarget::Autopilot if self.state.auto_pilot_state.log.is_empty() => self
                .state
                .autopilot_report
                .as_mut()
                .and_then(|report| report.log.get_mut(index)),
            NarrativeTarget::Autopilot => self.state.auto_pilot_state.log.get_mut(index),
        }
    }

    /// # Errors
    ///
    /// See [`launch_expedition`].
    pub fn launch(&mut self, ship_id: &ShipId, location_id: u32, now: u64) -> Result<u64, CommandError> {
        launch_expedition(&mut self.state, &self.content, ship_id, location_id, now, false)
    }

    /// # Errors
    ///
    /// See [`resolve_active_event`].
    pub fn resolve_event(
        &mut self,
        expedition_id: u64,
        option_index: usize,
        now: u64,
    ) -> Result<EventResult, CommandError> {
        resolve_active_event(&mut self.state, expedition_id, option_index, now, &mut *self.rng.events())
    }

    pub fn claim(&mut self, result_id: u64) -> Option<ExpeditionResult> {
        claim_result(&mut self.state, result_id)
    }

    /// # Errors
    ///
    /// See [`start_deep_space`].
    pub fn start_deep_space(
        &mut self,
        ship_id: &ShipId,
        location_id: &str,
        hours: u32,
        now: u64,
    ) -> Result<u64, CommandError> {
        start_deep_space(&mut self.state, &self.content, ship_id, location_id, hours, now)
    }

    /// # Errors
    ///
    /// See [`start_autopilot`].
    pub fn start_autopilot(&mut self, ship_id: &ShipId, location_ids: Vec<u32>, now: u64) -> Result<(), CommandError> {
        start_autopilot(&mut self.state, &self.content, ship_id, location_ids, now)
    }

    pub fn stop_autopilot(&mut self, now: u64) -> Option<AutopilotReport> {
        stop_autopilot(&mut self.state, now, StopReason::Requested)
    }

    /// # Errors
    ///
    /// See [`open_capsule`].
    pub fn open_capsule(&mut self, capsule_id: u64) -> Result<ResourceAmounts, CommandError> {
        open_capsule(&mut self.state, &self.content, capsule_id, &mut *self.rng.rewards())
    }

    /// # Errors
    ///
    /// See [`open_ship_box`].
    pub fn open_ship_box(&mut self) -> Result<ShipId, CommandError> {
        open_ship_box(&mut self.state, &self.content, &mut *self.rng.store())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MS_PER_HOUR;
    use crate::narrative::{NoNarrator, TemplateNarrator};
    use crate::resources::ResourceId;

    fn session_with_ship(seed: u64) -> (SimSession, ShipId) {
        let mut session = SimSession::new(GameContent::load_from_static(), seed);
        let ship = session.open_ship_box().unwrap();
        (session, ship)
    }

    #[test]
    fn first_advance_fills_mission_board() {
        let mut session = SimSession::new(GameContent::load_from_static(), 5);
        let report = session.advance(0, &mut NoNarrator);
        assert!(report.missions_refreshed);
        assert!(!session.state().mission_state.available_missions.is_empty());
        assert_eq!(report.autopilot, AutopilotStep::Inactive);
    }

    #[test]
    fn live_expedition_completes_into_pending_result() {
        let (mut session, ship) = session_with_ship(11);
        let id = session.launch(&ship, 1, 0).unwrap();
        let mut now = 0;
        let mut completed = Vec::new();
        while completed.is_empty() && now < MS_PER_HOUR {
            now += 1_000;
            let pending: Vec<u64> = session
                .state()
                .active_expeditions
                .iter()
                .filter(|expedition| expedition.is_paused)
                .map(|expedition| expedition.id)
                .collect();
            for paused in pending {
                session.resolve_event(paused, 0, now).unwrap();
            }
            completed = session.advance(now, &mut TemplateNarrator::default()).completed;
        }
        assert_eq!(completed, vec![id]);
        assert!(session.state().active_expeditions.is_empty());
        assert!(session.claim(id).is_some());
        assert!(session.claim(id).is_none());
    }

    #[test]
    fn same_seed_same_story() {
        let run = |seed| {
            let (mut session, ship) = session_with_ship(seed);
            session.with_state_mut(|state| state.auto_pilot_state.remaining_time_ms = MS_PER_HOUR);
            session.start_autopilot(&ship, vec![1, 2], 0).unwrap();
            for second in 1..=1_200 {
                session.advance(second * 1_000, &mut NoNarrator);
            }
            session.into_state()
        };
        assert_eq!(run(21), run(21));
    }

    #[test]
    fn narrator_annotates_event_lines() {
        let (mut session, ship) = session_with_ship(3);
        let id = session.launch(&ship, 1, 0).unwrap();
        let end_time = session.state().active_expeditions[0].end_time;
        let event = session.content().events[0].clone();
        session.with_state_mut(|state| {
            let expedition = &mut state.active_expeditions[0];
            expedition.active_event = Some(event);
            expedition.is_paused = true;
            expedition.last_pause_start_time = Some(10_000);
        });
        session.resolve_event(id, 1, 20_000).unwrap();
        let narrated = session.enrich_narrative(&mut TemplateNarrator::default());
        assert_eq!(narrated, 1);
        let line = session.state().active_expeditions[0].log.last().unwrap();
        assert!(line.text.starts_with("Log: Event resolved."));
        assert!(line.display().starts_with("The comms crackle:"));
        assert_eq!(session.state().active_expeditions[0].end_time, end_time + 10_000);
    }

    #[test]
    fn resume_replays_offline_autopilot() {
        let (mut session, ship) = session_with_ship(8);
        session.with_state_mut(|state| state.auto_pilot_state.remaining_time_ms = MS_PER_HOUR);
        session.start_autopilot(&ship, vec![1], 0).unwrap();
        let document = session.save(0);

        let (resumed, report) = SimSession::resume(GameContent::load_from_static(), document, 2 * MS_PER_HOUR);
        let offline = report.offline_autopilot.unwrap();
        assert!(offline.offline);
        assert!(offline.trips > 0);
        let autopilot = &resumed.state().auto_pilot_state;
        assert!(!autopilot.active);
        assert_eq!(autopilot.remaining_time_ms, MS_PER_HOUR - offline.simulated_ms);
        assert!(report.missions_refreshed);
        assert!(resumed.state().resources.get(ResourceId::Credits) > 0);
    }
}
