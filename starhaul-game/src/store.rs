//! Shop, market and hangar commands: the player's credit sinks and sources.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTOPILOT_MODULE_COST, AUTOPILOT_MODULE_DURATION_MS, DEFAULT_CONSUMABLE_VALUE, MAX_SHIELDS,
    SHIELD_BASE_COST, SHIELD_LEVEL_SCALE, SHIP_BOX_BASE_COST, SHIP_BOX_LEVEL_SCALE,
    SHIP_RARITY_WEIGHTS,
};
use crate::content::GameContent;
use crate::error::CommandError;
use crate::numbers::{floor_f64_to_u64, u64_to_f64};
use crate::rarity::{Rarity, draw_weighted};
use crate::resources::{ResourceAmounts, ResourceId};
use crate::rewards::open_capsule as roll_capsule;
use crate::ship::{ShipId, generate_ship};
use crate::state::GameState;

/// An unopened capsule in the hangar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capsule {
    pub id: u64,
    pub rarity: Rarity,
}

fn level_scaled(base: f64, scale: f64, level: u32) -> u64 {
    floor_f64_to_u64(base * (1.0 + f64::from(level.saturating_sub(1)) * scale))
}

/// `floor(50000 × (1 + (level − 1) × 0.2))`.
#[must_use]
pub fn ship_box_price(level: u32) -> u64 {
    level_scaled(SHIP_BOX_BASE_COST, SHIP_BOX_LEVEL_SCALE, level)
}

/// `floor(250 × (1 + (level − 1) × 0.1))`.
#[must_use]
pub fn shield_price(level: u32) -> u64 {
    level_scaled(SHIELD_BASE_COST, SHIELD_LEVEL_SCALE, level)
}

/// # Errors
///
/// Rejects unknown capsules.
pub fn open_capsule<R>(
    state: &mut GameState,
    content: &GameContent,
    capsule_id: u64,
    rng: &mut R,
) -> Result<ResourceAmounts, CommandError>
where
    R: Rng + ?Sized,
{
    let index = state
        .capsules
        .iter()
        .position(|capsule| capsule.id == capsule_id)
        .ok_or(CommandError::UnknownCapsule(capsule_id))?;
    let capsule = state.capsules.remove(index);
    let results = content
        .capsules
        .get(&capsule.rarity)
        .map(|table| roll_capsule(table, rng))
        .unwrap_or_default();
    state.resources.credit_all(&results);
    log::debug!("opened {} capsule #{capsule_id}", capsule.rarity);
    Ok(results)
}

/// Roll a new ship. The first ship in the hangar becomes the active one.
///
/// # Errors
///
/// Rejects when no boxes are held.
pub fn open_ship_box<R>(state: &mut GameState, content: &GameContent, rng: &mut R) -> Result<ShipId, CommandError>
where
    R: Rng + ?Sized,
{
    if state.ship_boxes == 0 {
        return Err(CommandError::NoShipBoxes);
    }
    state.ship_boxes -= 1;
    let rarity = draw_weighted(&SHIP_RARITY_WEIGHTS, rng);
    let id = ShipId::from_seq(state.next_id());
    let ship = generate_ship(&content.ships, rarity, id.clone(), rng);
    log::info!("ship box yielded {} ({rarity})", ship.name);
    state.ships.push(ship);
    if state.active_ship_id.is_none() {
        state.active_ship_id = Some(id.clone());
    }
    Ok(id)
}

/// # Errors
///
/// Rejects resources without a market price and missing stock.
pub fn sell_resource(
    state: &mut GameState,
    content: &GameContent,
    resource: ResourceId,
    amount: u64,
) -> Result<u64, CommandError> {
    let price = content
        .resources
        .get(resource)
        .map_or(0, |def| def.base_sell_price);
    if price == 0 || resource == ResourceId::Credits {
        return Err(CommandError::NotSellable(resource));
    }
    state.resources.try_spend(resource, amount)?;
    let value = price.saturating_mul(amount);
    state.resources.credit(ResourceId::Credits, value);
    Ok(value)
}

/// Sell the inventory item at `index` for its rarity value.
///
/// # Errors
///
/// Rejects an empty slot.
pub fn sell_item(state: &mut GameState, content: &GameContent, index: usize) -> Result<u64, CommandError> {
    if index >= state.inventory.len() {
        return Err(CommandError::UnknownItem(index));
    }
    let item_id = state.inventory.remove(index);
    let rarity = content.item(&item_id).map_or(Rarity::Common, |item| item.rarity);
    let value = rarity.sell_value();
    state.resources.credit(ResourceId::Credits, value);
    Ok(value)
}

/// Buy one unit of a shop consumable at its listed price.
///
/// # Errors
///
/// Rejects unlisted resources and missing credits.
pub fn buy_consumable(state: &mut GameState, content: &GameContent, item: ResourceId) -> Result<(), CommandError> {
    let price = content
        .resources
        .get(item)
        .and_then(|def| def.shop_price)
        .filter(|_| matches!(item, ResourceId::FuelCapsule | ResourceId::RepairCapsule))
        .ok_or(CommandError::NotConsumable(item))?;
    state.resources.try_spend(ResourceId::Credits, price)?;
    state.resources.credit(item, 1);
    Ok(())
}

/// Consume one capsule. Repairs target `ship`, or the active ship.
///
/// # Errors
///
/// Rejects items that are not usable, an empty stock and a repair with no
/// ship to target. Nothing changes on rejection.
pub fn use_consumable(
    state: &mut GameState,
    content: &GameContent,
    item: ResourceId,
    ship: Option<&ShipId>,
) -> Result<(), CommandError> {
    let value = content
        .resources
        .get(item)
        .and_then(|def| def.value)
        .unwrap_or(DEFAULT_CONSUMABLE_VALUE);
    match item {
        ResourceId::FuelCapsule => {
            state.resources.try_spend(item, 1)?;
            state.resources.credit(ResourceId::Fuel, value);
        }
        ResourceId::RepairCapsule => {
            let target = ship
                .cloned()
                .or_else(|| state.active_ship_id.clone())
                .ok_or(CommandError::NoActiveShip)?;
            state.require_ship(&target)?;
            state.resources.try_spend(item, 1)?;
            if let Some(ship) = state.ship_mut(&target) {
                ship.repair(u64_to_f64(value));
            }
        }
        other => return Err(CommandError::NotConsumable(other)),
    }
    Ok(())
}

/// 250 credits for one more hour of autopilot budget.
///
/// # Errors
///
/// Rejects missing credits.
pub fn buy_autopilot_module(state: &mut GameState, content: &GameContent) -> Result<u64, CommandError> {
    let module = content.resources.get(ResourceId::AutoPilotModule);
    let price = module.and_then(|def| def.shop_price).unwrap_or(AUTOPILOT_MODULE_COST);
    let duration = module
        .and_then(|def| def.value)
        .unwrap_or(AUTOPILOT_MODULE_DURATION_MS);
    state.resources.try_spend(ResourceId::Credits, price)?;
    let autopilot = &mut state.auto_pilot_state;
    autopilot.remaining_time_ms = autopilot.remaining_time_ms.saturating_add(duration);
    Ok(autopilot.remaining_time_ms)
}

/// # Errors
///
/// Rejects missing credits.
pub fn buy_ship_box(state: &mut GameState) -> Result<(), CommandError> {
    let price = ship_box_price(state.player_state.level);
    state.resources.try_spend(ResourceId::Credits, price)?;
    state.ship_boxes = state.ship_boxes.saturating_add(1);
    Ok(())
}

/// # Errors
///
/// Rejects a full shield bank and missing credits.
pub fn buy_shield(state: &mut GameState) -> Result<(), CommandError> {
    if state.player_state.shields >= MAX_SHIELDS {
        return Err(CommandError::ShieldsMaxed(MAX_SHIELDS));
    }
    let price = shield_price(state.player_state.level);
    state.resources.try_spend(ResourceId::Credits, price)?;
    state.player_state.shields += 1;
    Ok(())
}
