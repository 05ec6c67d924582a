//! Versioned save document and forward migration.
//!
//! Documents are migrated as raw JSON before they are typed, so fields that
//! older versions never wrote can be backfilled from what they did write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::{LEGACY_SAVE_VERSION, MIGRATION_BASELINE_VERSION, SAVE_VERSION};
use crate::player::xp_to_next_for_level;
use crate::state::GameState;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save document is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("save data does not match the game state layout: {0}")]
    Layout(#[source] serde_json::Error),
    #[error("failed to encode save document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unrecognised save version `{0}`")]
    Version(String),
    #[error("save document has no `data` object")]
    MissingData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SaveVersion(u32, u32, u32);

impl SaveVersion {
    fn parse(raw: &str) -> Result<Self, SaveError> {
        let mut parts = raw.trim().split('.').map(str::parse::<u32>);
        let mut next = || match parts.next() {
            Some(Ok(part)) => Ok(part),
            None => Ok(0),
            Some(Err(_)) => Err(SaveError::Version(raw.to_string())),
        };
        let version = Self(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(SaveError::Version(raw.to_string()));
        }
        Ok(version)
    }
}

/// `{version, data}` envelope written to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub version: String,
    pub data: GameState,
}

impl SaveDocument {
    /// Snapshot `state` for writing at `now`.
    ///
    /// A running autopilot is charged for the time since its last tick and
    /// stamped with `now`, so offline replay starts counting from the save.
    #[must_use]
    pub fn capture(state: &GameState, now: u64) -> Self {
        let mut data = state.clone();
        data.save_time = now;
        let autopilot = &mut data.auto_pilot_state;
        if autopilot.active {
            let elapsed = now.saturating_sub(autopilot.last_update_time);
            autopilot.remaining_time_ms = autopilot.remaining_time_ms.saturating_sub(elapsed);
        }
        autopilot.last_update_time = now;
        Self {
            version: SAVE_VERSION.to_string(),
            data,
        }
    }

    /// # Errors
    ///
    /// Returns [`SaveError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SaveError> {
        serde_json::to_string(self).map_err(SaveError::Encode)
    }

    /// Decode and migrate a stored document.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, an unparsable version or data that does not
    /// fit the current layout after migration.
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let mut document: Value = serde_json::from_str(json).map_err(SaveError::Decode)?;
        migrate_document(&mut document)?;
        serde_json::from_value(document).map_err(SaveError::Layout)
    }
}

/// Bring a raw document up to [`SAVE_VERSION`]. Returns whether anything
/// was rewritten.
///
/// # Errors
///
/// Rejects documents without a `data` object or with a malformed version.
pub fn migrate_document(document: &mut Value) -> Result<bool, SaveError> {
    let Some(root) = document.as_object_mut() else {
        return Err(SaveError::MissingData);
    };
    let raw_version = root
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or(LEGACY_SAVE_VERSION)
        .to_string();
    let version = SaveVersion::parse(&raw_version)?;
    let current = SaveVersion::parse(SAVE_VERSION)?;
    if version > current {
        log::warn!("save written by a newer build ({raw_version}); loading as {SAVE_VERSION}");
    }
    let data = root
        .get_mut("data")
        .and_then(Value::as_object_mut)
        .ok_or(SaveError::MissingData)?;

    let mut changed = false;
    if version < SaveVersion::parse(MIGRATION_BASELINE_VERSION)? {
        changed |= recompute_xp_threshold(data);
    }
    changed |= backfill_ship_baselines(data);
    if raw_version != SAVE_VERSION {
        root.insert("version".to_string(), Value::from(SAVE_VERSION));
        changed = true;
    }
    if changed {
        log::info!("migrated save from {raw_version} to {SAVE_VERSION}");
    }
    Ok(changed)
}

fn recompute_xp_threshold(data: &mut Map<String, Value>) -> bool {
    let Some(player) = data.get_mut("playerState").and_then(Value::as_object_mut) else {
        return false;
    };
    let level = player
        .get("level")
        .and_then(Value::as_u64)
        .and_then(|level| u32::try_from(level).ok())
        .unwrap_or(1);
    player.insert("xpToNextLevel".to_string(), Value::from(xp_to_next_for_level(level)));
    true
}

fn backfill_ship_baselines(data: &mut Map<String, Value>) -> bool {
    let Some(ships) = data.get_mut("ships").and_then(Value::as_array_mut) else {
        return false;
    };
    let mut changed = false;
    for ship in ships.iter_mut().filter_map(Value::as_object_mut) {
        if ship.contains_key("baseStats") && ship.contains_key("upgrades") {
            continue;
        }
        let Some(stats) = ship.get("stats").cloned() else {
            continue;
        };
        ship.insert("baseStats".to_string(), stats);
        ship.insert("upgrades".to_string(), Value::Object(Map::new()));
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn versions_order_numerically() {
        assert!(SaveVersion::parse("1.10.0").unwrap() > SaveVersion::parse("1.4.0").unwrap());
        assert_eq!(SaveVersion::parse("1.4").unwrap(), SaveVersion(1, 4, 0));
        assert!(matches!(SaveVersion::parse("one.two"), Err(SaveError::Version(_))));
    }

    #[test]
    fn legacy_player_threshold_is_recomputed() {
        let mut document = json!({
            "version": "1.0.0",
            "data": { "playerState": { "level": 3, "xp": 5, "xpToNextLevel": 100 } }
        });
        assert!(migrate_document(&mut document).unwrap());
        assert_eq!(document["data"]["playerState"]["xpToNextLevel"], json!(196));
        assert_eq!(document["version"], json!(SAVE_VERSION));
    }

    #[test]
    fn baseline_threshold_is_left_alone() {
        let mut document = json!({
            "version": "1.4.0",
            "data": { "playerState": { "level": 3, "xp": 5, "xpToNextLevel": 100 } }
        });
        migrate_document(&mut document).unwrap();
        assert_eq!(document["data"]["playerState"]["xpToNextLevel"], json!(100));
    }

    #[test]
    fn missing_version_is_treated_as_legacy() {
        let mut document = json!({ "data": { "playerState": { "level": 2 } } });
        migrate_document(&mut document).unwrap();
        assert_eq!(document["data"]["playerState"]["xpToNextLevel"], json!(140));
    }

    #[test]
    fn current_document_is_untouched() {
        let mut document = json!({ "version": SAVE_VERSION, "data": { "ships": [] } });
        assert!(!migrate_document(&mut document).unwrap());
    }

    #[test]
    fn rejects_documents_without_data() {
        let mut document = json!({ "version": "1.5.0" });
        assert!(matches!(migrate_document(&mut document), Err(SaveError::MissingData)));
        assert!(matches!(SaveDocument::from_json("[1, 2"), Err(SaveError::Decode(_))));
    }

    #[test]
    fn capture_charges_running_autopilot() {
        let mut state = GameState::new(1);
        state.auto_pilot_state.active = true;
        state.auto_pilot_state.remaining_time_ms = 10_000;
        state.auto_pilot_state.last_update_time = 1_000;
        let document = SaveDocument::capture(&state, 4_000);
        assert_eq!(document.version, SAVE_VERSION);
        assert_eq!(document.data.save_time, 4_000);
        assert_eq!(document.data.auto_pilot_state.remaining_time_ms, 7_000);
        assert_eq!(document.data.auto_pilot_state.last_update_time, 4_000);
    }

    #[test]
    fn document_round_trips_through_json() {
        let document = SaveDocument::capture(&GameState::new(77), 123);
        let decoded = SaveDocument::from_json(&document.to_json().unwrap()).unwrap();
        assert_eq!(decoded, document);
    }
}
