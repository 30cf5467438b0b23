//! Time handlers and the services they share.
//!
//! Each granularity module exposes `run(&mut TickContext)`. The engine calls
//! them coarsest first, so a coarse handler's effects are visible to the
//! finer ones within the same tick. Handlers hold no state of their own; all
//! state lives in the campaign.

pub mod alien_missions;
pub mod daily;
pub mod detection;
pub mod five_seconds;
pub mod hourly;
pub mod mission_scheduler;
pub mod monthly;
pub mod snapshot;
pub mod ten_minutes;
pub mod thirty_minutes;

use geoscape_core::ruleset::Ruleset;

use crate::campaign::Campaign;
use crate::dogfight::DogfightCoordinator;
use crate::engine::GameOptions;
use crate::popups::PopupQueue;
use crate::rng::SimRng;

/// Everything a handler may touch during one tick.
pub struct TickContext<'a> {
    pub campaign: &'a mut Campaign,
    pub ruleset: &'a Ruleset,
    pub rng: &'a mut SimRng,
    pub popups: &'a mut PopupQueue,
    pub dogfights: &'a mut DogfightCoordinator,
    pub options: &'a GameOptions,
}
