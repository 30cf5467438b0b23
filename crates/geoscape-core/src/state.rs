//! Snapshot types handed to the host each frame.
//!
//! Read-only views; only detected enemy contacts are included.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::Popup;
use crate::types::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerCounts {
    pub five_seconds: u64,
    pub ten_minutes: u64,
    pub thirty_minutes: u64,
    pub hourly: u64,
    pub daily: u64,
    pub monthly: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoscapeSnapshot {
    pub time: GameTime,
    pub speed: TimeSpeed,
    pub paused: bool,
    pub funds: i64,
    pub months_passed: u32,
    pub popup: Option<Popup>,
    pub queued_popups: usize,
    pub ufos: Vec<UfoView>,
    pub crafts: Vec<CraftView>,
    pub bases: Vec<BaseView>,
    pub mission_sites: Vec<SiteView>,
    pub alien_bases: Vec<AlienBaseView>,
    pub dogfights: Vec<DogfightView>,
    pub handler_counts: HandlerCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UfoView {
    pub id: UfoId,
    pub rule: String,
    pub position: GeoPoint,
    pub status: UfoStatus,
    pub hyper_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftView {
    pub id: CraftId,
    pub base: BaseId,
    pub rule: String,
    pub position: GeoPoint,
    pub status: CraftStatus,
    pub destination: Option<Target>,
    pub fuel: u32,
    pub damage: u32,
    pub low_fuel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseView {
    pub id: BaseId,
    pub name: String,
    pub position: GeoPoint,
    pub research: Vec<String>,
    pub productions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteView {
    pub id: SiteId,
    pub mission_rule: String,
    pub position: GeoPoint,
    pub seconds_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlienBaseView {
    pub id: AlienBaseId,
    pub position: GeoPoint,
    pub race: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DogfightView {
    pub slot: u8,
    pub craft: CraftId,
    pub ufo: UfoId,
    pub distance: u32,
    pub stance: DogfightStance,
    pub minimized: bool,
}
