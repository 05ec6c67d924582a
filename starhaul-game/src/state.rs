//! The persisted game document and its bookkeeping helpers.

use serde::{Deserialize, Serialize};

use crate::autopilot::{AutoPilotState, AutopilotReport};
use crate::combat::ExpeditionResult;
use crate::constants::{
    STARTING_COPPER, STARTING_CREDITS, STARTING_FUEL, STARTING_IRON, STARTING_SHIP_BOXES,
};
use crate::deep_space::DeepSpaceExpedition;
use crate::error::CommandError;
use crate::expedition::Expedition;
use crate::farm::FarmState;
use crate::missions::MissionState;
use crate::narrative::NarrativeQueue;
use crate::player::PlayerState;
use crate::rarity::Rarity;
use crate::resources::{ResourceId, ResourceLedger};
use crate::ship::{Ship, ShipId};
use crate::store::Capsule;

/// Complete player state. Everything except the narrative queue is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub seed: u64,
    #[serde(default)]
    pub resources: ResourceLedger,
    #[serde(default)]
    pub player_state: PlayerState,
    /// Item ids in pickup order.
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub capsules: Vec<Capsule>,
    #[serde(default)]
    pub ships: Vec<Ship>,
    #[serde(default)]
    pub active_ship_id: Option<ShipId>,
    #[serde(default)]
    pub defending_ship_id: Option<ShipId>,
    #[serde(default)]
    pub ship_boxes: u32,
    #[serde(default)]
    pub active_expeditions: Vec<Expedition>,
    #[serde(default)]
    pub active_deep_space_expeditions: Vec<DeepSpaceExpedition>,
    #[serde(default)]
    pub pending_results: Vec<ExpeditionResult>,
    #[serde(default)]
    pub farm_state: FarmState,
    #[serde(default)]
    pub mission_state: MissionState,
    #[serde(default)]
    pub auto_pilot_state: AutoPilotState,
    #[serde(default)]
    pub autopilot_report: Option<AutopilotReport>,
    /// Last id handed out by [`GameState::next_id`].
    #[serde(default)]
    pub id_seq: u64,
    /// Wall-clock time of the last save, used to re-key random streams.
    #[serde(default)]
    pub save_time: u64,
    #[serde(skip)]
    pub narrative: NarrativeQueue,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GameState {
    /// Fresh commander: starting credits, fuel and ore plus one ship box.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let resources = [
            (ResourceId::Credits, STARTING_CREDITS),
            (ResourceId::Fuel, STARTING_FUEL),
            (ResourceId::Iron, STARTING_IRON),
            (ResourceId::Copper, STARTING_COPPER),
        ]
        .into_iter()
        .collect();
        Self {
            seed,
            resources,
            player_state: PlayerState::default(),
            inventory: Vec::new(),
            capsules: Vec::new(),
            ships: Vec::new(),
            active_ship_id: None,
            defending_ship_id: None,
            ship_boxes: STARTING_SHIP_BOXES,
            active_expeditions: Vec::new(),
            active_deep_space_expeditions: Vec::new(),
            pending_results: Vec::new(),
            farm_state: FarmState::default(),
            mission_state: MissionState::default(),
            auto_pilot_state: AutoPilotState::default(),
            autopilot_report: None,
            id_seq: 0,
            save_time: 0,
            narrative: NarrativeQueue::default(),
        }
    }

    /// Monotonic id shared by ships, expeditions, capsules and missions.
    pub fn next_id(&mut self) -> u64 {
        self.id_seq = self.id_seq.saturating_add(1);
        self.id_seq
    }

    #[must_use]
    pub fn ship(&self, id: &ShipId) -> Option<&Ship> {
        self.ships.iter().find(|ship| &ship.id == id)
    }

    pub fn ship_mut(&mut self, id: &ShipId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|ship| &ship.id == id)
    }

    /// # Errors
    ///
    /// [`CommandError::UnknownShip`] when no ship has `id`.
    pub fn require_ship(&self, id: &ShipId) -> Result<&Ship, CommandError> {
        self.ship(id)
            .ok_or_else(|| CommandError::UnknownShip(id.to_string()))
    }

    #[must_use]
    pub fn active_ship(&self) -> Option<&Ship> {
        self.active_ship_id.as_ref().and_then(|id| self.ship(id))
    }

    /// # Errors
    ///
    /// Rejects unknown ships.
    pub fn set_active_ship(&mut self, id: &ShipId) -> Result<(), CommandError> {
        self.require_ship(id)?;
        self.active_ship_id = Some(id.clone());
        Ok(())
    }

    /// # Errors
    ///
    /// Rejects unknown ships.
    pub fn set_defending_ship(&mut self, id: &ShipId) -> Result<(), CommandError> {
        self.require_ship(id)?;
        self.defending_ship_id = Some(id.clone());
        Ok(())
    }

    /// Whether the ship is on a live or deep-space expedition.
    #[must_use]
    pub fn is_ship_busy(&self, id: &ShipId) -> bool {
        self.active_expeditions.iter().any(|expedition| &expedition.ship_id == id)
            || self
                .active_deep_space_expeditions
                .iter()
                .any(|expedition| &expedition.ship_id == id)
    }

    /// # Errors
    ///
    /// [`CommandError::ShipBusy`] while the ship is away.
    pub fn ensure_idle(&self, id: &ShipId) -> Result<(), CommandError> {
        if self.is_ship_busy(id) {
            return Err(CommandError::ShipBusy(id.to_string()));
        }
        Ok(())
    }

    /// Store an unopened capsule and return its id.
    pub fn add_capsule(&mut self, rarity: Rarity) -> u64 {
        let id = self.next_id();
        self.capsules.push(Capsule { id, rarity });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ship::ShipStats;

    #[test]
    fn new_game_has_starting_kit() {
        let state = GameState::new(9);
        assert_eq!(state.resources.get(ResourceId::Credits), 1_000);
        assert_eq!(state.resources.get(ResourceId::Fuel), 100);
        assert_eq!(state.resources.get(ResourceId::Iron), 50);
        assert_eq!(state.resources.get(ResourceId::Copper), 25);
        assert_eq!(state.ship_boxes, 1);
        assert!(state.ships.is_empty());
        assert_eq!(state.player_state.level, 1);
    }

    #[test]
    fn ids_are_monotonic_across_kinds() {
        let mut state = GameState::new(0);
        let first = state.next_id();
        let capsule = state.add_capsule(Rarity::Rare);
        assert!(capsule > first);
        assert_eq!(state.capsules[0].rarity, Rarity::Rare);
    }

    #[test]
    fn ship_selection_requires_known_ship() {
        let mut state = GameState::new(0);
        let id = ShipId::from_seq(state.next_id());
        assert_eq!(
            state.set_active_ship(&id),
            Err(CommandError::UnknownShip(id.to_string()))
        );
        state
            .ships
            .push(Ship::new(id.clone(), "Kestrel".to_string(), Rarity::Common, ShipStats::default()));
        state.set_active_ship(&id).unwrap();
        state.set_defending_ship(&id).unwrap();
        assert_eq!(state.active_ship().map(|ship| ship.name.as_str()), Some("Kestrel"));
        assert!(state.ensure_idle(&id).is_ok());
    }

    #[test]
    fn narrative_queue_is_not_saved() {
        let mut state = GameState::new(4);
        state
            .narrative
            .push(crate::narrative::NarrativeTarget::Autopilot, 0, "x");
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("narrative"));
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert!(back.narrative.is_empty());
        assert_eq!(back.resources, state.resources);
    }
}
