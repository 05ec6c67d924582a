use serde::{Deserialize, Serialize};

use crate::constants::{FARM_GRID_SIZE, FARM_UNLOCK_COST};
use crate::content::GameContent;
use crate::error::CommandError;
use crate::resources::{ResourceAmounts, ResourceId};
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDef {
    pub name: String,
    pub growth_time_ms: u64,
    #[serde(default)]
    pub cost: ResourceAmounts,
    #[serde(default, rename = "yield")]
    pub harvest: ResourceAmounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmPlot {
    #[serde(default)]
    pub plant_id: Option<String>,
    #[serde(default)]
    pub growth_start_time: Option<u64>,
    #[serde(default)]
    pub growth_end_time: Option<u64>,
}

impl FarmPlot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plant_id.is_none()
    }

    #[must_use]
    pub fn is_grown(&self, now: u64) -> bool {
        self.plant_id.is_some() && self.growth_end_time.is_some_and(|end| now >= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmState {
    pub unlocked: bool,
    /// Row-major `plots[y][x]`.
    pub plots: Vec<Vec<FarmPlot>>,
    #[serde(default)]
    pub attack_logs: Vec<String>,
}

impl Default for FarmState {
    fn default() -> Self {
        Self {
            unlocked: false,
            plots: vec![vec![FarmPlot::default(); FARM_GRID_SIZE]; FARM_GRID_SIZE],
            attack_logs: Vec::new(),
        }
    }
}

impl FarmState {
    fn plot_mut(&mut self, x: usize, y: usize) -> Result<&mut FarmPlot, CommandError> {
        self.plots
            .get_mut(y)
            .and_then(|row| row.get_mut(x))
            .ok_or(CommandError::PlotOutOfBounds { x, y })
    }
}

/// # Errors
///
/// Rejects a second unlock and missing credits.
pub fn unlock_farm(state: &mut GameState) -> Result<(), CommandError> {
    if state.farm_state.unlocked {
        return Err(CommandError::FarmAlreadyUnlocked);
    }
    state.resources.try_spend(ResourceId::Credits, FARM_UNLOCK_COST)?;
    state.farm_state.unlocked = true;
    log::info!("farm unlocked");
    Ok(())
}

/// Pay the seed cost and start growing `plant_id` at `(x, y)`.
///
/// # Errors
///
/// Rejects a locked farm, unknown plants, bad coordinates, occupied plots and
/// missing resources.
pub fn plant(
    state: &mut GameState,
    content: &GameContent,
    x: usize,
    y: usize,
    plant_id: &str,
    now: u64,
) -> Result<(), CommandError> {
    if !state.farm_state.unlocked {
        return Err(CommandError::FarmLocked);
    }
    let def = content
        .plants
        .get(plant_id)
        .ok_or_else(|| CommandError::UnknownPlant(plant_id.to_string()))?;
    if !state.farm_state.plot_mut(x, y)?.is_empty() {
        return Err(CommandError::PlotOccupied { x, y });
    }
    state.resources.try_debit(&def.cost)?;

    let plot = state.farm_state.plot_mut(x, y)?;
    plot.plant_id = Some(plant_id.to_string());
    plot.growth_start_time = Some(now);
    plot.growth_end_time = Some(now.saturating_add(def.growth_time_ms));
    Ok(())
}

/// Collect a fully grown plot and clear it.
///
/// # Errors
///
/// Rejects bad coordinates and plots that are empty or still growing.
pub fn harvest(
    state: &mut GameState,
    content: &GameContent,
    x: usize,
    y: usize,
    now: u64,
) -> Result<ResourceAmounts, CommandError> {
    let plot = state.farm_state.plot_mut(x, y)?;
    if !plot.is_grown(now) {
        return Err(CommandError::NothingToHarvest { x, y });
    }
    let plant_id = plot.plant_id.take().unwrap_or_default();
    *plot = FarmPlot::default();

    let harvest = content
        .plants
        .get(&plant_id)
        .map(|def| def.harvest.clone())
        .unwrap_or_default();
    if harvest.is_empty() {
        log::warn!("plot ({x}, {y}) held unknown plant `{plant_id}`; cleared without yield");
    }
    state.resources.credit_all(&harvest);
    Ok(harvest)
}
