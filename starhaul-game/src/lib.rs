//! Starhaul Game Engine
//!
//! Platform-agnostic core of the Starhaul space idle game: timed ship
//! expeditions, unattended autopilot with offline replay, deep-space runs,
//! missions, store and farm. No UI or platform-specific dependencies.

pub mod autopilot;
pub mod combat;
pub mod constants;
pub mod content;
pub mod deep_space;
pub mod error;
pub mod events;
pub mod expedition;
pub mod farm;
pub mod locations;
pub mod missions;
pub mod narrative;
pub mod numbers;
pub mod player;
pub mod rarity;
pub mod resources;
pub mod rewards;
pub mod rng;
pub mod save;
pub mod session;
pub mod ship;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use autopilot::{
    AutoPilotState, AutopilotReport, AutopilotStep, SessionGains, StopReason, TripOutcome,
    replay_offline, simulate_trip, start_autopilot, stop_autopilot, tick_autopilot,
};
pub use combat::{CombatOutcome, Enemy, ExpeditionResult, combat_power, expedition_success_chance};
pub use content::{ContentError, GameContent, ItemDef};
pub use deep_space::{DeepSpaceExpedition, complete_deep_space, resolve_deep_space, start_deep_space};
pub use error::CommandError;
pub use events::{EventOption, EventResult, OptionEffect, RandomEvent, SkillCheck, SkillCurve};
pub use expedition::{
    Expedition, Milestone, MilestoneReport, claim_result, complete_due_expeditions,
    evaluate_milestones, launch_expedition, resolve_active_event,
};
pub use farm::{FarmPlot, FarmState, PlantDef, harvest, plant, unlock_farm};
pub use locations::{DeepSpaceLocation, Location, trip_duration_ms};
pub use missions::{
    Mission, MissionState, MissionTemplate, abandon_mission, accept_mission, claim_mission,
    generate_missions, refresh_missions_if_needed,
};
pub use narrative::{LogLine, NarrativeError, NarrativeSource, NoNarrator, TemplateNarrator};
pub use player::PlayerState;
pub use rarity::Rarity;
pub use resources::{ResourceAmounts, ResourceDelta, ResourceId, ResourceLedger, ResourceRegistry};
pub use rng::RngBundle;
pub use save::{SaveDocument, SaveError, migrate_document};
pub use session::{LoadReport, SimSession, TickReport};
pub use ship::{Ship, ShipId, ShipStats, StatKind, UpgradeDef, craft_upgrade, distribute_attribute_point};
pub use state::GameState;
pub use store::{
    Capsule, buy_autopilot_module, buy_consumable, buy_shield, buy_ship_box, open_capsule,
    open_ship_box, sell_item, sell_resource, shield_price, ship_box_price, use_consumable,
};

use anyhow::Context;

/// Trait for abstracting content loading.
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every reference catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogs cannot be read or parsed.
    fn load_content(&self) -> Result<GameContent, Self::Error>;
}

/// Loader backed by the catalogs compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

impl DataLoader for StaticLoader {
    type Error = ContentError;

    fn load_content(&self) -> Result<GameContent, Self::Error> {
        GameContent::try_load_static()
    }
}

/// Trait for abstracting save/load operations.
///
/// Storage traffics in encoded documents so that migration runs on the raw
/// JSON before it is typed.
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn save_game(&self, save_name: &str, document: &str) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn load_game(&self, save_name: &str) -> Result<Option<String>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Main game engine for creating, saving and restoring sessions
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// # Errors
    ///
    /// Returns an error if content cannot be loaded.
    pub fn create_session(&self, seed: u64) -> Result<SimSession, L::Error> {
        Ok(SimSession::new(self.data_loader.load_content()?, seed))
    }

    /// # Errors
    ///
    /// Returns an error if the document cannot be encoded or written.
    pub fn save_session(&self, save_name: &str, session: &SimSession, now: u64) -> anyhow::Result<()>
    where
        S::Error: Into<anyhow::Error>,
    {
        let json = session.save(now).to_json()?;
        self.storage
            .save_game(save_name, &json)
            .map_err(Into::into)
            .with_context(|| format!("writing save `{save_name}`"))
    }

    /// Load, migrate and resume a saved game, running offline replay.
    ///
    /// # Errors
    ///
    /// Returns an error if storage, decoding or content loading fails.
    pub fn load_session(&self, save_name: &str, now: u64) -> anyhow::Result<Option<(SimSession, LoadReport)>>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(json) = self.storage.load_game(save_name).map_err(Into::into)? else {
            return Ok(None);
        };
        let document =
            SaveDocument::from_json(&json).with_context(|| format!("decoding save `{save_name}`"))?;
        let content = self.data_loader.load_content().map_err(Into::into)?;
        Ok(Some(SimSession::resume(content, document, now)))
    }

    /// # Errors
    ///
    /// Returns an error if the slot cannot be removed.
    pub fn delete_save(&self, save_name: &str) -> Result<(), S::Error> {
        self.storage.delete_save(save_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_content(&self) -> Result<GameContent, Self::Error> {
            Ok(GameContent::load_from_static())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, String>>>,
    }

    impl GameStorage for MemoryStorage {
        type Error = Infallible;

        fn save_game(&self, save_name: &str, document: &str) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(save_name.to_string(), document.to_string());
            Ok(())
        }

        fn load_game(&self, save_name: &str) -> Result<Option<String>, Self::Error> {
            Ok(self.saves.borrow().get(save_name).cloned())
        }

        fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(save_name);
            Ok(())
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_session() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let mut session = engine.create_session(0xABCD).unwrap();
        session.with_state_mut(|state| {
            state.resources.credit(ResourceId::Gold, 12);
            state.player_state.level = 3;
        });
        engine.save_session("slot-one", &session, 5_000).unwrap();

        let (loaded, report) = engine.load_session("slot-one", 6_000).unwrap().expect("save exists");
        assert_eq!(loaded.state().resources.get(ResourceId::Gold), 12);
        assert_eq!(loaded.state().player_state.level, 3);
        assert_eq!(loaded.state().save_time, 5_000);
        assert!(report.offline_autopilot.is_none());
        assert!(engine.load_session("missing-slot", 0).unwrap().is_none());

        engine.delete_save("slot-one").unwrap();
        assert!(engine.load_session("slot-one", 0).unwrap().is_none());
    }

    #[test]
    fn corrupt_save_reports_context() {
        let storage = MemoryStorage::default();
        storage.save_game("broken", "{\"version\":\"1.5.0\"}").unwrap();
        let engine = GameEngine::new(FixtureLoader, storage);
        let err = engine.load_session("broken", 0).err().expect("missing data is rejected");
        assert!(err.to_string().contains("decoding save `broken`"));
    }

    #[test]
    fn static_loader_parses_embedded_catalogs() {
        let content = StaticLoader.load_content().unwrap();
        assert!(!content.locations.is_empty());
        assert!(!content.events.is_empty());
    }
}
