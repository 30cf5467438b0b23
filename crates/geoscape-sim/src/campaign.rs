//! The campaign: every persistent entity collection the engine advances.
//!
//! Collections are plain `Vec`s in insertion order. Entities refer to each
//! other by id; lookups are linear, matching the small counts involved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use geoscape_core::components::*;
use geoscape_core::enums::Difficulty;
use geoscape_core::ruleset::Ruleset;
use geoscape_core::types::*;

use crate::strategy::AlienStrategy;

/// A landing the player accepted; held until the host reports the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattleRequest {
    pub craft: CraftId,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub time: GameTime,
    pub difficulty: Difficulty,
    pub ironman: bool,
    pub funds: i64,
    pub months_passed: u32,
    pub bases: Vec<Base>,
    pub ufos: Vec<Ufo>,
    pub waypoints: Vec<Waypoint>,
    pub mission_sites: Vec<MissionSite>,
    pub alien_bases: Vec<AlienBase>,
    pub alien_missions: Vec<AlienMission>,
    pub regions: Vec<RegionState>,
    pub countries: Vec<CountryState>,
    pub alien_strategy: AlienStrategy,
    pub discovered_research: Vec<String>,
    pub pending_battle: Option<BattleRequest>,
    next_ids: BTreeMap<String, u32>,
}

impl Campaign {
    /// Empty campaign with region and country ledgers from the ruleset.
    pub fn new(ruleset: &Ruleset, difficulty: Difficulty) -> Self {
        Self {
            time: GameTime::default(),
            difficulty,
            ironman: false,
            funds: 0,
            months_passed: 0,
            bases: Vec::new(),
            ufos: Vec::new(),
            waypoints: Vec::new(),
            mission_sites: Vec::new(),
            alien_bases: Vec::new(),
            alien_missions: Vec::new(),
            regions: ruleset
                .regions
                .iter()
                .map(|r| RegionState {
                    rule: r.name.clone(),
                    activity: ActivityLedger::default(),
                })
                .collect(),
            countries: ruleset
                .countries
                .iter()
                .map(|c| CountryState {
                    rule: c.name.clone(),
                    funding: vec![c.funding],
                    activity: ActivityLedger::default(),
                })
                .collect(),
            alien_strategy: AlienStrategy::new(ruleset),
            discovered_research: Vec::new(),
            pending_battle: None,
            next_ids: BTreeMap::new(),
        }
    }

    /// Next id for an entity kind, starting at 1.
    pub fn next_id(&mut self, kind: &str) -> u32 {
        let counter = self.next_ids.entry(kind.to_string()).or_insert(1);
        let id = *counter;
        *counter += 1;
        id
    }

    pub fn is_researched(&self, topic: &str) -> bool {
        self.discovered_research.iter().any(|t| t == topic)
    }

    pub fn discover(&mut self, topic: &str) {
        if !self.is_researched(topic) {
            self.discovered_research.push(topic.to_string());
        }
    }

    // --- Lookups ---

    pub fn base(&self, id: BaseId) -> Option<&Base> {
        self.bases.iter().find(|b| b.id == id)
    }

    pub fn base_mut(&mut self, id: BaseId) -> Option<&mut Base> {
        self.bases.iter_mut().find(|b| b.id == id)
    }

    /// (base index, craft index) of a craft.
    pub fn craft_location(&self, id: CraftId) -> Option<(usize, usize)> {
        self.bases.iter().enumerate().find_map(|(bi, base)| {
            base.crafts
                .iter()
                .position(|c| c.id == id)
                .map(|ci| (bi, ci))
        })
    }

    pub fn craft(&self, id: CraftId) -> Option<&Craft> {
        self.craft_location(id)
            .map(|(bi, ci)| &self.bases[bi].crafts[ci])
    }

    pub fn craft_mut(&mut self, id: CraftId) -> Option<&mut Craft> {
        self.craft_location(id)
            .map(move |(bi, ci)| &mut self.bases[bi].crafts[ci])
    }

    pub fn crafts(&self) -> impl Iterator<Item = &Craft> {
        self.bases.iter().flat_map(|b| b.crafts.iter())
    }

    pub fn ufo_index(&self, id: UfoId) -> Option<usize> {
        self.ufos.iter().position(|u| u.id == id)
    }

    pub fn ufo(&self, id: UfoId) -> Option<&Ufo> {
        self.ufos.iter().find(|u| u.id == id)
    }

    pub fn ufo_mut(&mut self, id: UfoId) -> Option<&mut Ufo> {
        self.ufos.iter_mut().find(|u| u.id == id)
    }

    pub fn mission(&self, id: MissionId) -> Option<&AlienMission> {
        self.alien_missions.iter().find(|m| m.id == id)
    }

    pub fn mission_mut(&mut self, id: MissionId) -> Option<&mut AlienMission> {
        self.alien_missions.iter_mut().find(|m| m.id == id)
    }

    pub fn site(&self, id: SiteId) -> Option<&MissionSite> {
        self.mission_sites.iter().find(|s| s.id == id)
    }

    pub fn alien_base(&self, id: AlienBaseId) -> Option<&AlienBase> {
        self.alien_bases.iter().find(|b| b.id == id)
    }

    /// Where a target currently is, if it still exists.
    pub fn target_position(&self, target: Target) -> Option<GeoPoint> {
        match target {
            Target::Ufo(id) => self.ufo(id).map(|u| u.position),
            Target::Waypoint(id) => self
                .waypoints
                .iter()
                .find(|w| w.id == id)
                .map(|w| w.position),
            Target::Base(id) => self.base(id).map(|b| b.position),
            Target::MissionSite(id) => self.site(id).map(|s| s.position),
            Target::AlienBase(id) => self.alien_base(id).map(|b| b.position),
        }
    }

    /// Number of craft currently heading for `target`.
    pub fn followers(&self, target: Target) -> usize {
        self.crafts()
            .filter(|c| c.destination == Some(target))
            .count()
    }

    // --- Scoring ---

    /// Credit alien activity to the region and country containing `point`.
    pub fn add_alien_activity(&mut self, ruleset: &Ruleset, point: GeoPoint, points: i32) {
        for ledger in self.ledgers_at(ruleset, point) {
            ledger.add_alien(points);
        }
    }

    /// Credit XCOM activity (negative for losses) where `point` lies.
    pub fn add_xcom_activity(&mut self, ruleset: &Ruleset, point: GeoPoint, points: i32) {
        for ledger in self.ledgers_at(ruleset, point) {
            ledger.add_xcom(points);
        }
    }

    fn ledgers_at(&mut self, ruleset: &Ruleset, point: GeoPoint) -> Vec<&mut ActivityLedger> {
        let region = ruleset.locate_region(point).map(|r| r.name.as_str());
        let country = ruleset.locate_country(point).map(|c| c.name.as_str());
        let mut ledgers = Vec::new();
        if let Some(state) = self
            .regions
            .iter_mut()
            .find(|r| Some(r.rule.as_str()) == region)
        {
            ledgers.push(&mut state.activity);
        }
        if let Some(state) = self
            .countries
            .iter_mut()
            .find(|c| Some(c.rule.as_str()) == country)
        {
            ledgers.push(&mut state.activity);
        }
        ledgers
    }

    pub fn region_state(&self, name: &str) -> Option<&RegionState> {
        self.regions.iter().find(|r| r.rule == name)
    }
}
