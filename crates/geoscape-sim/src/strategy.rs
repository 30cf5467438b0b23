//! Alien strategy table: which regions and mission types the aliens favour.
//!
//! Mission scripts without explicit weights draw from here. Entries used
//! with `use_table` are consumed until the table empties and is refilled.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use geoscape_core::ruleset::{Ruleset, WeightedOptions};

use crate::rng::SimRng;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlienStrategy {
    region_chances: WeightedOptions,
    region_missions: BTreeMap<String, WeightedOptions>,
    missions_run: BTreeMap<String, u32>,
    /// Recently used (region, area index) pairs per script counter.
    mission_locations: BTreeMap<String, VecDeque<(String, usize)>>,
}

impl AlienStrategy {
    pub fn new(ruleset: &Ruleset) -> Self {
        let mut strategy = Self::default();
        strategy.init(ruleset);
        strategy
    }

    /// Refill region and mission tables from the ruleset.
    pub fn init(&mut self, ruleset: &Ruleset) {
        self.region_chances = WeightedOptions::default();
        self.region_missions.clear();
        for region in &ruleset.regions {
            if region.missions.is_empty() {
                continue;
            }
            self.region_chances.set(&region.name, region.weight);
            self.region_missions
                .insert(region.name.clone(), region.missions.clone());
        }
    }

    /// Weighted region pick; refills the table when it has been used up.
    pub fn choose_random_region(&mut self, ruleset: &Ruleset, rng: &mut SimRng) -> Option<String> {
        if let Some(region) = rng.choose(&self.region_chances) {
            return Some(region);
        }
        self.init(ruleset);
        rng.choose(&self.region_chances)
    }

    pub fn choose_random_mission(&self, region: &str, rng: &mut SimRng) -> Option<String> {
        self.region_missions
            .get(region)
            .and_then(|missions| rng.choose(missions))
    }

    /// Drop a region/mission pair. Returns true if the region emptied out.
    pub fn remove_mission(&mut self, region: &str, mission: &str) -> bool {
        let Some(missions) = self.region_missions.get_mut(region) else {
            return false;
        };
        missions.set(mission, 0);
        if missions.is_empty() {
            self.region_missions.remove(region);
            self.region_chances.set(region, 0);
            return true;
        }
        false
    }

    /// The region still has missions on offer.
    pub fn valid_mission_region(&self, region: &str) -> bool {
        self.region_missions.contains_key(region)
    }

    pub fn missions_run(&self, var_name: &str) -> u32 {
        self.missions_run.get(var_name).copied().unwrap_or(0)
    }

    pub fn add_mission_run(&mut self, var_name: &str) {
        if var_name.is_empty() {
            return;
        }
        *self.missions_run.entry(var_name.to_string()).or_insert(0) += 1;
    }

    /// The location was not among the last few used under `var_name`.
    pub fn valid_mission_location(&self, var_name: &str, region: &str, area: usize) -> bool {
        self.mission_locations.get(var_name).map_or(true, |used| {
            !used.iter().any(|(r, a)| r == region && *a == area)
        })
    }

    pub fn add_mission_location(&mut self, var_name: &str, region: &str, area: usize, window: usize) {
        if window == 0 || var_name.is_empty() {
            return;
        }
        let used = self
            .mission_locations
            .entry(var_name.to_string())
            .or_default();
        used.push_back((region.to_string(), area));
        while used.len() > window {
            used.pop_front();
        }
    }
}
