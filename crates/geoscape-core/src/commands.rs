//! Player commands sent from the host to the simulation.
//!
//! Commands are queued and processed at the next frame boundary.

use serde::{Deserialize, Serialize};

use crate::enums::{DogfightStance, TimeSpeed};
use crate::types::{CraftId, Target};

/// All possible player actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerCommand {
    // --- Clock ---
    SetTimeSpeed { speed: TimeSpeed },
    Pause,
    Resume,
    /// Close the popup currently on screen.
    DismissPopup,

    // --- Craft orders ---
    SendCraft { craft: CraftId, target: Target },
    ReturnToBase { craft: CraftId },
    /// Answer a landing confirmation.
    ConfirmLanding { craft: CraftId, accept: bool },
    /// Result of the tactical battle started by an accepted landing.
    BattleOutcome { victory: bool },

    // --- Dogfights ---
    MinimizeDogfight { slot: u8 },
    RestoreDogfight { slot: u8 },
    SetDogfightStance { slot: u8, stance: DogfightStance },
    /// Same as switching the fight to the disengage stance.
    Disengage { slot: u8 },
}
