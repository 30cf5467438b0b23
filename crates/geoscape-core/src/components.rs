//! Entity records owned by the campaign.
//!
//! Plain data with small rule-aware helpers. Cross-references between
//! entities are by id, never by pointer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::ruleset::{CraftRule, Ruleset};
use crate::types::*;

// --- Alien side ---

/// An alien craft on the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ufo {
    pub id: UfoId,
    pub rule: String,
    pub position: GeoPoint,
    /// Point the UFO is flying toward.
    pub destination: GeoPoint,
    /// Knots.
    pub speed: f64,
    pub status: UfoStatus,
    pub altitude: Altitude,
    pub detected: bool,
    /// Picked up by a hyperwave decoder; cleared only when tracking is lost.
    pub hyper_detected: bool,
    /// Ground timer while LANDED; wreck timer while CRASHED.
    pub seconds_remaining: u32,
    pub trajectory: String,
    pub trajectory_point: usize,
    pub mission: MissionId,
    pub damage: u32,
    /// Base an assault run is heading for.
    pub target_base: Option<BaseId>,
}

impl Ufo {
    /// Apply a status change if the lifecycle allows it.
    pub fn set_status(&mut self, status: UfoStatus) -> bool {
        if !self.status.can_become(status) {
            return false;
        }
        self.status = status;
        if status == UfoStatus::Destroyed {
            self.detected = false;
            self.hyper_detected = false;
        }
        true
    }

    pub fn is_destroyed(&self) -> bool {
        self.status == UfoStatus::Destroyed
    }

    pub fn visibility(&self, size: UfoSize) -> i32 {
        size.visibility() + self.altitude.visibility()
    }
}

/// An alien mission in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlienMission {
    pub id: MissionId,
    pub rule: String,
    pub region: String,
    pub race: String,
    pub next_wave: usize,
    /// UFOs already launched from the current wave.
    pub next_ufo_counter: u32,
    /// Minutes until the next UFO launches.
    pub spawn_countdown: u32,
    pub live_ufos: u32,
    /// Area index inside the spawn zone chosen for site missions.
    pub site_zone: Option<usize>,
    /// Alien base this mission resupplies.
    pub alien_base: Option<AlienBaseId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlienBase {
    pub id: AlienBaseId,
    pub position: GeoPoint,
    pub race: String,
    pub region: String,
    pub deployment: String,
    pub discovered: bool,
}

/// A ground location (terror site and similar) the player may assault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSite {
    pub id: SiteId,
    pub mission_rule: String,
    pub deployment: String,
    pub position: GeoPoint,
    pub race: String,
    pub region: String,
    pub seconds_remaining: u32,
    pub detected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: WaypointId,
    pub position: GeoPoint,
}

// --- XCOM side ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftWeapon {
    pub rule: String,
    pub ammo: u32,
    pub rearming: bool,
}

/// An XCOM craft. Always owned by exactly one base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Craft {
    pub id: CraftId,
    pub rule: String,
    pub base: BaseId,
    pub position: GeoPoint,
    pub destination: Option<Target>,
    /// Knots.
    pub speed: f64,
    pub fuel: u32,
    pub damage: u32,
    pub status: CraftStatus,
    pub low_fuel: bool,
    pub in_dogfight: bool,
    /// A shortage popup has been shown for the current refuel/rearm cycle.
    pub warned: bool,
    /// Waiting on the player to confirm a landing.
    pub landing_pending: bool,
    pub weapons: Vec<CraftWeapon>,
}

impl Craft {
    pub fn new(id: CraftId, rule: &CraftRule, base: BaseId, position: GeoPoint) -> Self {
        Self {
            id,
            rule: rule.name.clone(),
            base,
            position,
            destination: None,
            speed: 0.0,
            fuel: rule.max_fuel,
            damage: 0,
            status: CraftStatus::Ready,
            low_fuel: false,
            in_dogfight: false,
            warned: false,
            landing_pending: false,
            weapons: Vec::new(),
        }
    }

    /// Fuel burnt every 10 minutes at the current speed.
    pub fn fuel_consumption(&self) -> u32 {
        (self.speed / 100.0).floor() as u32
    }

    pub fn consume_fuel(&mut self) {
        self.fuel = self.fuel.saturating_sub(self.fuel_consumption());
    }

    /// Fuel needed to fly from here back to `home`.
    pub fn fuel_limit(&self, home: GeoPoint) -> u32 {
        let step = radian_speed(self.speed);
        if step <= 0.0 {
            return 0;
        }
        let distance = self.position.distance_to(home);
        (self.fuel_consumption() as f64 * distance / (step * 120.0)).floor() as u32
    }

    /// Launch toward `target` at full speed.
    pub fn set_destination(&mut self, target: Target, rule: &CraftRule) {
        self.destination = Some(target);
        self.speed = rule.max_speed;
        self.status = CraftStatus::Out;
        self.landing_pending = false;
    }

    pub fn return_to_base(&mut self, rule: &CraftRule) {
        let home = Target::Base(self.base);
        self.set_destination(home, rule);
    }

    /// Landed at its own base: start the maintenance cycle.
    pub fn arrive_home(&mut self, home: GeoPoint, rule: &CraftRule) {
        self.position = home;
        self.destination = None;
        self.speed = 0.0;
        self.low_fuel = false;
        self.in_dogfight = false;
        self.landing_pending = false;
        self.warned = false;
        self.status = if self.damage > 0 {
            CraftStatus::Repairs
        } else if self.fuel < rule.max_fuel {
            CraftStatus::Refuelling
        } else {
            CraftStatus::Rearming
        };
        for weapon in &mut self.weapons {
            weapon.rearming = true;
        }
    }

    pub fn repair(&mut self, rule: &CraftRule) {
        self.damage = self.damage.saturating_sub(rule.repair_rate);
        if self.damage == 0 {
            self.status = CraftStatus::Refuelling;
        }
    }

    pub fn refuel(&mut self, rule: &CraftRule) {
        self.fuel = (self.fuel + rule.refuel_rate).min(rule.max_fuel);
        if self.fuel >= rule.max_fuel {
            self.status = CraftStatus::Rearming;
        }
    }

    pub fn is_destroyed(&self, rule: &CraftRule) -> bool {
        rule.max_damage > 0 && self.damage >= rule.max_damage
    }

    pub fn is_airborne(&self) -> bool {
        self.status == CraftStatus::Out
    }

    pub fn has_ammo(&self) -> bool {
        self.weapons.iter().any(|w| w.ammo > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soldier {
    pub id: SoldierId,
    pub name: String,
    pub craft: Option<CraftId>,
    /// Days until fit for duty.
    pub wound_recovery: u32,
    pub psi_training: bool,
    pub psi_skill: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub rule: String,
    /// Days left until construction completes.
    pub build_days: u32,
}

impl Facility {
    pub fn is_complete(&self) -> bool {
        self.build_days == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchProject {
    pub name: String,
    pub spent: u32,
    pub cost: u32,
    pub scientists: u32,
}

impl ResearchProject {
    /// One day of work. Returns true once the topic is finished.
    pub fn step(&mut self) -> bool {
        self.spent += self.scientists;
        self.spent >= self.cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub rule: String,
    pub amount_total: u32,
    pub amount_produced: u32,
    /// Engineer-hours accumulated.
    pub time_spent: u32,
    pub engineers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransferCargo {
    Items { item: String, quantity: u32 },
    Soldier(Soldier),
    Scientists(u32),
    Engineers(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub cargo: TransferCargo,
    pub hours: u32,
}

/// An XCOM base and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Base {
    pub id: BaseId,
    pub name: String,
    pub position: GeoPoint,
    pub facilities: Vec<Facility>,
    pub crafts: Vec<Craft>,
    pub soldiers: Vec<Soldier>,
    pub storage: BTreeMap<String, u32>,
    pub scientists: u32,
    pub engineers: u32,
    pub research: Vec<ResearchProject>,
    pub productions: Vec<Production>,
    pub transfers: Vec<Transfer>,
    /// Spotted by aliens; retaliation missions may target it.
    pub retaliation_target: bool,
}

impl Base {
    pub fn new(id: BaseId, name: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            facilities: Vec::new(),
            crafts: Vec::new(),
            soldiers: Vec::new(),
            storage: BTreeMap::new(),
            scientists: 0,
            engineers: 0,
            research: Vec::new(),
            productions: Vec::new(),
            transfers: Vec::new(),
            retaliation_target: false,
        }
    }

    pub fn craft(&self, id: CraftId) -> Option<&Craft> {
        self.crafts.iter().find(|c| c.id == id)
    }

    pub fn craft_mut(&mut self, id: CraftId) -> Option<&mut Craft> {
        self.crafts.iter_mut().find(|c| c.id == id)
    }

    pub fn soldiers_aboard(&self, craft: CraftId) -> usize {
        self.soldiers
            .iter()
            .filter(|s| s.craft == Some(craft))
            .count()
    }

    pub fn item_count(&self, item: &str) -> u32 {
        self.storage.get(item).copied().unwrap_or(0)
    }

    pub fn add_items(&mut self, item: &str, quantity: u32) {
        if quantity > 0 {
            *self.storage.entry(item.to_string()).or_insert(0) += quantity;
        }
    }

    /// Remove items if enough are in stock.
    pub fn remove_items(&mut self, item: &str, quantity: u32) -> bool {
        match self.storage.get_mut(item) {
            Some(count) if *count >= quantity => {
                *count -= quantity;
                if *count == 0 {
                    self.storage.remove(item);
                }
                true
            }
            _ => quantity == 0,
        }
    }

    pub fn completed_facilities(&self) -> impl Iterator<Item = &Facility> {
        self.facilities.iter().filter(|f| f.is_complete())
    }

    /// Percent chance a UFO in sight range notices this base.
    pub fn detection_chance(&self, ruleset: &Ruleset) -> i32 {
        let completed = self.completed_facilities().count() as i32;
        let shields: i32 = self
            .completed_facilities()
            .filter_map(|f| ruleset.facility(&f.rule))
            .map(|r| r.mind_shield)
            .sum();
        (completed / 6 + 15) / (shields + 1)
    }

    pub fn available_storage(&self, ruleset: &Ruleset) -> f64 {
        self.completed_facilities()
            .filter_map(|f| ruleset.facility(&f.rule))
            .map(|r| r.storage)
            .sum()
    }

    pub fn used_storage(&self, ruleset: &Ruleset) -> f64 {
        self.storage
            .iter()
            .map(|(item, qty)| ruleset.item(item).map_or(0.0, |r| r.size) * *qty as f64)
            .sum()
    }

    pub fn stores_overfull(&self, ruleset: &Ruleset) -> bool {
        self.used_storage(ruleset) > self.available_storage(ruleset) + 1e-9
    }

    pub fn psi_lab_capacity(&self, ruleset: &Ruleset) -> u32 {
        self.completed_facilities()
            .filter_map(|f| ruleset.facility(&f.rule))
            .map(|r| r.psi_labs)
            .sum()
    }

    /// Monthly upkeep of facilities, craft, and soldiers.
    pub fn monthly_maintenance(&self, ruleset: &Ruleset, soldier_salary: i64) -> i64 {
        let facilities: i64 = self
            .facilities
            .iter()
            .filter_map(|f| ruleset.facility(&f.rule))
            .map(|r| r.monthly_cost)
            .sum();
        let crafts: i64 = self
            .crafts
            .iter()
            .filter_map(|c| ruleset.craft(&c.rule))
            .map(|r| r.monthly_cost)
            .sum();
        facilities + crafts + self.soldiers.len() as i64 * soldier_salary
    }
}

// --- World ---

/// Monthly activity points, newest month last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLedger {
    pub alien: Vec<i32>,
    pub xcom: Vec<i32>,
}

impl Default for ActivityLedger {
    fn default() -> Self {
        Self {
            alien: vec![0],
            xcom: vec![0],
        }
    }
}

impl ActivityLedger {
    pub fn add_alien(&mut self, points: i32) {
        if let Some(current) = self.alien.last_mut() {
            *current += points;
        }
    }

    pub fn add_xcom(&mut self, points: i32) {
        if let Some(current) = self.xcom.last_mut() {
            *current += points;
        }
    }

    pub fn current_alien(&self) -> i32 {
        self.alien.last().copied().unwrap_or(0)
    }

    pub fn current_xcom(&self) -> i32 {
        self.xcom.last().copied().unwrap_or(0)
    }

    pub fn new_month(&mut self) {
        self.alien.push(0);
        self.xcom.push(0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionState {
    pub rule: String,
    pub activity: ActivityLedger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryState {
    pub rule: String,
    /// Monthly funding history, current month last.
    pub funding: Vec<i64>,
    pub activity: ActivityLedger,
}

impl CountryState {
    pub fn current_funding(&self) -> i64 {
        self.funding.last().copied().unwrap_or(0)
    }
}
