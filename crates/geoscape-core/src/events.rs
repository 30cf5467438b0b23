//! Popups raised by the simulation for the player's attention.
//!
//! Every popup pauses the clock until dismissed. They are queued FIFO and
//! shown one at a time.

use serde::{Deserialize, Serialize};

use crate::enums::ProductionProgress;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Popup {
    // --- Tracking ---
    UfoDetected { ufo: UfoId, hyperwave: bool },
    /// Radar contact lost on a UFO that craft were following.
    UfoLost { ufo: UfoId },
    MissionSiteDetected { site: SiteId },
    AlienBaseDiscovered { alien_base: AlienBaseId },

    // --- Craft ---
    LowFuel { craft: CraftId },
    /// Reached a waypoint and is circling.
    CraftPatrol { craft: CraftId },
    ConfirmLanding { craft: CraftId, target: Target },
    CraftDestroyed { craft: CraftId, base: BaseId },
    RefuelShortage { craft: CraftId, item: String },
    RearmShortage { craft: CraftId, item: String },

    // --- Bases ---
    BaseDefense { base: BaseId, ufo: UfoId },
    TransfersArrived { base: BaseId },
    ProductionFinished {
        base: BaseId,
        project: String,
        progress: ProductionProgress,
    },
    /// Stores are over capacity; the player must sell.
    SellStock { base: BaseId },
    FacilityComplete { base: BaseId, facility: String },
    ResearchComplete { topic: String, bonus: Option<String> },
    Cutscene { id: String },

    // --- Campaign ---
    Autosave,
    MonthlyReport {
        year: i32,
        month: u32,
        rating: i32,
        funding_change: i64,
        funds: i64,
    },
}
