//! Static reference data embedded from `assets/`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::combat::Enemy;
use crate::events::RandomEvent;
use crate::farm::PlantDef;
use crate::locations::{DeepSpaceLocation, Location};
use crate::missions::MissionTemplate;
use crate::rarity::Rarity;
use crate::resources::ResourceRegistry;
use crate::rewards::CapsuleTable;
use crate::ship::{ShipCatalog, UpgradeDef};

const RESOURCES_JSON: &str = include_str!("../assets/resources.json");
const ITEMS_JSON: &str = include_str!("../assets/items.json");
const ENEMIES_JSON: &str = include_str!("../assets/enemies.json");
const CAPSULES_JSON: &str = include_str!("../assets/capsules.json");
const UPGRADES_JSON: &str = include_str!("../assets/upgrades.json");
const EVENTS_JSON: &str = include_str!("../assets/events.json");
const LOCATIONS_JSON: &str = include_str!("../assets/locations.json");
const DEEP_SPACE_JSON: &str = include_str!("../assets/deep_space.json");
const MISSIONS_JSON: &str = include_str!("../assets/missions.json");
const SHIPS_JSON: &str = include_str!("../assets/ships.json");
const PLANTS_JSON: &str = include_str!("../assets/plants.json");

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to parse {asset}: {source}")]
    Parse {
        asset: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDef {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rarity: Rarity,
}

/// Every catalog the simulation reads. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameContent {
    pub resources: ResourceRegistry,
    pub items: BTreeMap<String, ItemDef>,
    pub enemies: BTreeMap<String, Enemy>,
    pub capsules: BTreeMap<Rarity, CapsuleTable>,
    pub upgrades: Vec<UpgradeDef>,
    pub events: Vec<RandomEvent>,
    pub locations: Vec<Location>,
    pub deep_space: Vec<DeepSpaceLocation>,
    pub missions: BTreeMap<Rarity, MissionTemplate>,
    pub ships: ShipCatalog,
    pub plants: BTreeMap<String, PlantDef>,
}

fn parse<T>(asset: &'static str, json: &str) -> Result<T, ContentError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(json).map_err(|source| ContentError::Parse { asset, source })
}

impl GameContent {
    /// Parse the embedded catalogs.
    ///
    /// # Errors
    ///
    /// Returns the first asset that fails to deserialize.
    pub fn try_load_static() -> Result<Self, ContentError> {
        Ok(Self {
            resources: parse("resources.json", RESOURCES_JSON)?,
            items: parse("items.json", ITEMS_JSON)?,
            enemies: parse("enemies.json", ENEMIES_JSON)?,
            capsules: parse("capsules.json", CAPSULES_JSON)?,
            upgrades: parse("upgrades.json", UPGRADES_JSON)?,
            events: parse("events.json", EVENTS_JSON)?,
            locations: parse("locations.json", LOCATIONS_JSON)?,
            deep_space: parse("deep_space.json", DEEP_SPACE_JSON)?,
            missions: parse("missions.json", MISSIONS_JSON)?,
            ships: parse("ships.json", SHIPS_JSON)?,
            plants: parse("plants.json", PLANTS_JSON)?,
        })
    }

    /// Embedded catalogs, or an empty catalog if the assets are corrupt.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::try_load_static().unwrap_or_else(|err| {
            log::error!("embedded content is invalid: {err}");
            Self::default()
        })
    }

    #[must_use]
    pub fn location(&self, id: u32) -> Option<&Location> {
        self.locations.iter().find(|location| location.id == id)
    }

    #[must_use]
    pub fn deep_space_location(&self, id: &str) -> Option<&DeepSpaceLocation> {
        self.deep_space.iter().find(|location| location.id == id)
    }

    #[must_use]
    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|upgrade| upgrade.id == id)
    }

    #[must_use]
    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }
}

/// Process-wide cached catalog.
pub fn content() -> &'static GameContent {
    static CONTENT: OnceLock<GameContent> = OnceLock::new();
    CONTENT.get_or_init(GameContent::load_from_static)
}
