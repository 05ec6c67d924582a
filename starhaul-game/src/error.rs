use thiserror::Error;

use crate::resources::ResourceId;
use crate::ship::StatKind;

/// A player command that was rejected before any state was touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("not enough {resource}: need {required}, have {available}")]
    InsufficientResources {
        resource: ResourceId,
        required: u64,
        available: u64,
    },
    #[error("unknown ship `{0}`")]
    UnknownShip(String),
    #[error("no active ship selected")]
    NoActiveShip,
    #[error("unknown location `{0}`")]
    UnknownLocation(String),
    #[error("unknown upgrade `{0}`")]
    UnknownUpgrade(String),
    #[error("unknown plant `{0}`")]
    UnknownPlant(String),
    #[error("unknown mission #{0}")]
    UnknownMission(u64),
    #[error("unknown expedition #{0}")]
    UnknownExpedition(u64),
    #[error("unknown capsule #{0}")]
    UnknownCapsule(u64),
    #[error("no inventory item at slot {0}")]
    UnknownItem(usize),
    #[error("event has no option {0}")]
    UnknownOption(usize),
    #[error("ship `{0}` is already on an expedition")]
    ShipBusy(String),
    #[error("expedition #{0} is not waiting on an event")]
    NoActiveEvent(u64),
    #[error("no attribute points to spend")]
    NoAttributePoints,
    #[error("{0:?} cannot be trained with attribute points")]
    NotTrainable(StatKind),
    #[error("no ship boxes to open")]
    NoShipBoxes,
    #[error("accepted mission limit of {0} reached")]
    MissionLimitReached(usize),
    #[error("duration of {hours}h outside {min}h..={max}h")]
    DurationOutOfRange { hours: u32, min: u32, max: u32 },
    #[error("autopilot has no remaining time budget")]
    AutopilotBudgetExhausted,
    #[error("autopilot is already running")]
    AutopilotActive,
    #[error("autopilot route is empty")]
    EmptyRoute,
    #[error("farm is locked")]
    FarmLocked,
    #[error("farm is already unlocked")]
    FarmAlreadyUnlocked,
    #[error("plot ({x}, {y}) is outside the farm grid")]
    PlotOutOfBounds { x: usize, y: usize },
    #[error("plot ({x}, {y}) is already planted")]
    PlotOccupied { x: usize, y: usize },
    #[error("plot ({x}, {y}) has nothing ready to harvest")]
    NothingToHarvest { x: usize, y: usize },
    #[error("shield capacity of {0} reached")]
    ShieldsMaxed(u32),
    #[error("{0} cannot be bought or used here")]
    NotConsumable(ResourceId),
    #[error("{0} has no market value")]
    NotSellable(ResourceId),
}

impl CommandError {
    pub(crate) const fn insufficient(resource: ResourceId, required: u64, available: u64) -> Self {
        Self::InsufficientResources {
            resource,
            required,
            available,
        }
    }
}
