use serde_json::{Value, json};
use starhaul_game::constants::{MS_PER_HOUR, SAVE_VERSION};
use starhaul_game::{
    GameContent, Rarity, ResourceId, SaveDocument, SaveError, ShipId, SimSession, migrate_document,
};

fn legacy_ship() -> Value {
    json!({
        "id": "ship_1",
        "name": "Rustbucket",
        "rarity": "Common",
        "stats": {
            "attack": 12.0,
            "defense": 9.0,
            "integrity": 80.0,
            "maxIntegrity": 120.0,
            "critChance": 0.05,
            "critDamage": 1.5,
            "speed": 1.2,
            "cargo": 150.0,
            "miningEfficiency": 1.0,
            "luck": 1.0
        }
    })
}

fn legacy_document() -> Value {
    json!({
        "version": "1.0.0",
        "data": {
            "seed": 99,
            "resources": { "credits": 500, "iron": 20 },
            "playerState": { "level": 4, "xp": 12, "xpToNextLevel": 100 },
            "ships": [legacy_ship()],
            "activeShipId": "ship_1",
            "saveTime": 1_000
        }
    })
}

#[test]
fn legacy_document_loads_with_backfilled_ship() {
    let document = SaveDocument::from_json(&legacy_document().to_string()).unwrap();
    assert_eq!(document.version, SAVE_VERSION);

    let state = &document.data;
    let ship = state.ship(&ShipId("ship_1".to_string())).unwrap();
    assert_eq!(ship.rarity, Rarity::Common);
    assert_eq!(ship.base_stats, ship.stats);
    assert!(ship.upgrades.is_empty());
    assert_eq!(state.player_state.level, 4);
    // 100 -> 140 -> 196 -> 274
    assert_eq!(state.player_state.xp_to_next_level, 274);
    assert_eq!(state.resources.get(ResourceId::Credits), 500);
    assert_eq!(state.resources.get(ResourceId::Fuel), 0);
}

#[test]
fn migration_is_idempotent() {
    let mut document = legacy_document();
    assert!(migrate_document(&mut document).unwrap());
    let once = document.clone();
    assert!(!migrate_document(&mut document).unwrap());
    assert_eq!(document, once);
}

#[test]
fn upgraded_ship_keeps_its_baseline() {
    let mut ship = legacy_ship();
    ship["baseStats"] = ship["stats"].clone();
    ship["baseStats"]["attack"] = json!(10.0);
    ship["upgrades"] = json!({ "attack1": 1 });
    let mut document = json!({
        "version": "1.4.2",
        "data": { "seed": 1, "ships": [ship] }
    });
    migrate_document(&mut document).unwrap();
    assert_eq!(document["data"]["ships"][0]["baseStats"]["attack"], json!(10.0));
    assert_eq!(document["data"]["ships"][0]["upgrades"], json!({ "attack1": 1 }));
}

#[test]
fn newer_versions_still_load() {
    let document = json!({ "version": "9.0.0", "data": { "seed": 3 } });
    let decoded = SaveDocument::from_json(&document.to_string()).unwrap();
    assert_eq!(decoded.version, SAVE_VERSION);
    assert_eq!(decoded.data.seed, 3);
}

#[test]
fn malformed_documents_are_rejected() {
    assert!(matches!(
        SaveDocument::from_json(r#"{"version":"x.y","data":{"seed":1}}"#),
        Err(SaveError::Version(_))
    ));
    assert!(matches!(
        SaveDocument::from_json(r#"{"version":"1.5.0","data":{"seed":"nope"}}"#),
        Err(SaveError::Layout(_))
    ));
    assert!(matches!(
        SaveDocument::from_json(r#"{"version":"1.5.0","data":[]}"#),
        Err(SaveError::MissingData)
    ));
}

#[test]
fn save_resume_preserves_state_outside_replay() {
    let mut session = SimSession::new(GameContent::load_from_static(), 4242);
    let ship = session.open_ship_box().unwrap();
    session.launch(&ship, 1, 0).unwrap();
    let json = session.save(5_000).to_json().unwrap();

    let document = SaveDocument::from_json(&json).unwrap();
    let (resumed, report) = SimSession::resume(GameContent::load_from_static(), document, MS_PER_HOUR);
    assert!(report.offline_autopilot.is_none());
    assert_eq!(resumed.state().ships, session.state().ships);
    assert_eq!(resumed.state().active_expeditions, session.state().active_expeditions);
    assert_eq!(resumed.state().resources, session.state().resources);
    assert_eq!(resumed.state().save_time, 5_000);
}
