//! Ruleset model: immutable content the simulation reads by identifier.
//!
//! Everything here is plain serde data. `Ruleset::from_json_str` parses and
//! validates a full ruleset; the built-in one ships embedded in the crate.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::enums::{Altitude, Difficulty, MissionObjective, UfoSize};
use crate::error::ConfigError;
use crate::types::GeoPoint;

pub const BUILTIN_RULESET: &str = include_str!("data/ruleset.json");

// --- Weighted tables ---

/// Named weights for random selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedOptions(BTreeMap<String, u32>);

impl WeightedOptions {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        let mut options = Self::default();
        for (name, weight) in pairs {
            options.set(name, weight);
        }
        options
    }

    /// Set a weight; zero removes the option.
    pub fn set(&mut self, name: &str, weight: u32) {
        if weight == 0 {
            self.0.remove(name);
        } else {
            self.0.insert(name.to_string(), weight);
        }
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn weight(&self, name: &str) -> u32 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn names(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, w)| **w > 0)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Resolve a roll in `0..total()` to an option name.
    pub fn pick(&self, roll: u32) -> Option<&str> {
        let mut acc = 0;
        for (name, weight) in &self.0 {
            acc += weight;
            if roll < acc {
                return Some(name);
            }
        }
        None
    }
}

/// Weighted tables keyed by the first campaign month they apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlyWeights(BTreeMap<u32, WeightedOptions>);

impl MonthlyWeights {
    pub fn new(entries: impl IntoIterator<Item = (u32, WeightedOptions)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Table in effect at `month`: the latest key not after it, else the earliest.
    pub fn at_month(&self, month: u32) -> Option<&WeightedOptions> {
        self.0
            .range(..=month)
            .next_back()
            .or_else(|| self.0.iter().next())
            .map(|(_, w)| w)
    }
}

// --- Geography ---

/// Rectangular lon/lat area in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Area {
    pub fn contains(&self, point: GeoPoint) -> bool {
        let lon = point.lon.to_degrees().rem_euclid(360.0);
        let lat = point.lat.to_degrees();
        let (lon_min, lon_max) = (self.lon_min.rem_euclid(360.0), self.lon_max.rem_euclid(360.0));
        let in_lon = if self.lon_max - self.lon_min >= 360.0 {
            true
        } else if lon_min <= lon_max {
            lon >= lon_min && lon <= lon_max
        } else {
            lon >= lon_min || lon <= lon_max
        };
        in_lon && lat >= self.lat_min && lat <= self.lat_max
    }

    /// A single location rather than a region (a city).
    pub fn is_point(&self) -> bool {
        self.lon_min == self.lon_max && self.lat_min == self.lat_max
    }

    /// Point at fractional offsets `fx`, `fy` in `0.0..=1.0` across the area.
    pub fn point_at(&self, fx: f64, fy: f64) -> GeoPoint {
        GeoPoint::from_degrees(
            self.lon_min + (self.lon_max - self.lon_min) * fx,
            self.lat_min + (self.lat_max - self.lat_min) * fy,
        )
    }
}

/// A named spawn location inside a mission zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionArea {
    #[serde(flatten)]
    pub area: Area,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionZone {
    pub areas: Vec<MissionArea>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionRule {
    pub name: String,
    pub areas: Vec<Area>,
    /// Weight in the alien strategy's region table.
    pub weight: u32,
    /// Missions the alien strategy may run here.
    pub missions: WeightedOptions,
    /// Spawn zones, indexed by trajectory waypoint zone.
    pub zones: Vec<MissionZone>,
}

impl RegionRule {
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.areas.iter().any(|a| a.contains(point))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountryRule {
    pub name: String,
    pub areas: Vec<Area>,
    /// Starting monthly funding.
    pub funding: i64,
}

impl CountryRule {
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.areas.iter().any(|a| a.contains(point))
    }
}

// --- Aliens ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UfoRule {
    pub name: String,
    pub size: UfoSize,
    /// Knots.
    pub max_speed: f64,
    pub max_damage: u32,
    /// Nautical miles.
    pub sight_range: f64,
    pub weapon_power: u32,
    pub weapon_range: u32,
    /// Seconds of combat before the UFO tries to break off.
    pub break_off_time: u32,
    /// Points scored when shot down.
    pub score: i32,
    /// Operates below the surface; only depth-capable craft may engage.
    pub underwater: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryWaypoint {
    pub zone: usize,
    pub altitude: Altitude,
    /// Percentage of the UFO's max speed.
    pub speed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UfoTrajectory {
    pub id: String,
    /// Seconds spent on the ground at a landing point.
    pub ground_timer: u32,
    pub waypoints: Vec<TrajectoryWaypoint>,
}

impl UfoTrajectory {
    pub fn zone(&self, point: usize) -> Option<usize> {
        self.waypoints.get(point).map(|w| w.zone)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionWave {
    pub ufo: String,
    pub count: u32,
    pub trajectory: String,
    /// Minutes until the next wave.
    pub spawn_timer: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlienMissionRule {
    pub name: String,
    pub objective: MissionObjective,
    pub waves: Vec<MissionWave>,
    pub race_weights: MonthlyWeights,
    /// Zone used for site/base placement.
    pub spawn_zone: usize,
    /// Deployment for the site or base this mission creates.
    pub deployment: Option<String>,
    /// Activity points scored per UFO that reaches its goal.
    pub points: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceRule {
    pub name: String,
    pub retaliation_mission: Option<String>,
    pub supply_mission: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentRule {
    pub name: String,
    /// Alien points per half hour the site stays open.
    pub points: i32,
    /// Alien points when the site despawns unvisited.
    pub despawn_penalty: i32,
}

// --- XCOM hardware ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraftRule {
    pub name: String,
    pub max_speed: f64,
    pub max_fuel: u32,
    pub refuel_rate: u32,
    pub refuel_item: Option<String>,
    pub repair_rate: u32,
    pub max_damage: u32,
    /// Nautical miles.
    pub radar_range: f64,
    /// Nautical miles; used to spot alien bases.
    pub sight_range: f64,
    /// Non-zero for craft able to engage submerged UFOs.
    pub max_depth: u32,
    pub soldiers: u32,
    /// Score lost when the craft is destroyed.
    pub score: i32,
    pub monthly_cost: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraftWeaponRule {
    pub name: String,
    pub ammo_max: u32,
    pub rearm_rate: u32,
    pub clip_item: Option<String>,
    pub power: u32,
    pub range: u32,
    /// Rounds between shots.
    pub reload: u32,
    pub accuracy: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityRule {
    pub name: String,
    /// Nautical miles.
    pub radar_range: f64,
    pub radar_chance: i32,
    pub hyperwave: bool,
    pub build_days: u32,
    pub monthly_cost: i64,
    pub storage: f64,
    pub mind_shield: i32,
    pub psi_labs: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemRule {
    pub name: String,
    pub size: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchRule {
    pub name: String,
    /// Scientist-days.
    pub cost: u32,
    pub points: i32,
    /// Side topics one of which may be granted for free on completion.
    pub get_one_free: Vec<String>,
    /// Item placed in the completing base's stores.
    pub spawned_item: Option<String>,
    pub cutscene: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManufactureRule {
    pub name: String,
    /// Engineer-hours per unit.
    pub time: u32,
    pub cost: i64,
    pub required_items: BTreeMap<String, u32>,
    pub produced_items: BTreeMap<String, u32>,
}

// --- Mission scripts ---

/// A monthly directive for spawning alien missions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionScript {
    pub name: String,
    /// Counter key for run caps and repeat avoidance.
    pub var_name: Option<String>,
    pub first_month: u32,
    /// -1 for no end.
    pub last_month: i32,
    /// 0 for none.
    pub label: u32,
    pub execution_odds: i32,
    pub target_base_odds: i32,
    pub min_difficulty: Difficulty,
    /// -1 for unlimited.
    pub max_runs: i32,
    pub avoid_repeats: usize,
    /// Minutes before the first wave; 0 uses the wave timer.
    pub start_delay: u32,
    /// Signed labels: positive must have succeeded, negative must have failed.
    pub conditionals: Vec<i32>,
    pub region_weights: MonthlyWeights,
    pub mission_weights: MonthlyWeights,
    pub race_weights: MonthlyWeights,
    pub research_triggers: BTreeMap<String, bool>,
    /// Consume the chosen region/mission pair from the strategy table.
    pub use_table: bool,
    /// Derived at load: every mission type this script can pick creates a site.
    #[serde(skip)]
    pub site_type: bool,
}

impl Default for MissionScript {
    fn default() -> Self {
        Self {
            name: String::new(),
            var_name: None,
            first_month: 0,
            last_month: -1,
            label: 0,
            execution_odds: 100,
            target_base_odds: 0,
            min_difficulty: Difficulty::Beginner,
            max_runs: -1,
            avoid_repeats: 0,
            start_delay: 0,
            conditionals: Vec::new(),
            region_weights: MonthlyWeights::default(),
            mission_weights: MonthlyWeights::default(),
            race_weights: MonthlyWeights::default(),
            research_triggers: BTreeMap::new(),
            use_table: true,
            site_type: false,
        }
    }
}

impl MissionScript {
    pub fn var_name(&self) -> &str {
        self.var_name.as_deref().unwrap_or("")
    }

    /// Mission types selectable at `month`.
    pub fn mission_types(&self, month: u32) -> Vec<String> {
        self.mission_weights
            .at_month(month)
            .map(WeightedOptions::names)
            .unwrap_or_default()
    }

    /// Regions selectable at `month`.
    pub fn regions(&self, month: u32) -> Vec<String> {
        self.region_weights
            .at_month(month)
            .map(WeightedOptions::names)
            .unwrap_or_default()
    }
}

// --- Ruleset ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    pub regions: Vec<RegionRule>,
    pub countries: Vec<CountryRule>,
    pub ufos: Vec<UfoRule>,
    pub trajectories: Vec<UfoTrajectory>,
    pub alien_missions: Vec<AlienMissionRule>,
    pub races: Vec<RaceRule>,
    pub deployments: Vec<DeploymentRule>,
    pub mission_scripts: Vec<MissionScript>,
    pub crafts: Vec<CraftRule>,
    pub craft_weapons: Vec<CraftWeaponRule>,
    pub facilities: Vec<FacilityRule>,
    pub items: Vec<ItemRule>,
    pub research: Vec<ResearchRule>,
    pub manufacture: Vec<ManufactureRule>,
}

impl Ruleset {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_RULESET)
    }

    /// Parse and validate a ruleset.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut ruleset: Ruleset = serde_json::from_str(json)?;
        ruleset.finalize()?;
        Ok(ruleset)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Derive load-time flags and check cross-references. Must be called on
    /// rulesets assembled in code before handing them to the engine.
    pub fn finalize(&mut self) -> Result<(), ConfigError> {
        let site_flags: Vec<bool> = self
            .mission_scripts
            .iter()
            .map(|script| self.is_site_script(script))
            .collect();
        for (script, site) in self.mission_scripts.iter_mut().zip(site_flags) {
            script.site_type = site;
        }
        self.validate()
    }

    fn is_site_script(&self, script: &MissionScript) -> bool {
        if script.mission_weights.is_empty() {
            return false;
        }
        let mut any = false;
        for table in script.mission_weights.0.values() {
            for name in table.names() {
                any = true;
                match self.alien_mission(&name) {
                    Some(rule) if rule.objective == MissionObjective::Site => {}
                    _ => return false,
                }
            }
        }
        any
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for script in &self.mission_scripts {
            if (script.max_runs > 0 || script.avoid_repeats > 0) && script.var_name().is_empty() {
                return Err(ConfigError::MissingVarName {
                    script: script.name.clone(),
                });
            }
        }
        for mission in &self.alien_missions {
            let context = format!("alien mission {}", mission.name);
            for wave in &mission.waves {
                self.require_ufo(&context, &wave.ufo)?;
                self.require_trajectory(&context, &wave.trajectory)?;
            }
            if matches!(
                mission.objective,
                MissionObjective::Site | MissionObjective::Base
            ) {
                let what = if mission.objective == MissionObjective::Site {
                    "a mission site"
                } else {
                    "an alien base"
                };
                let deployment =
                    mission
                        .deployment
                        .as_deref()
                        .ok_or_else(|| ConfigError::MissingDeployment {
                            mission: mission.name.clone(),
                            what,
                        })?;
                self.require_deployment(&context, deployment)?;
            }
        }
        for race in &self.races {
            let context = format!("race {}", race.name);
            for mission in [&race.retaliation_mission, &race.supply_mission]
                .into_iter()
                .flatten()
            {
                self.require_alien_mission(&context, mission)?;
            }
        }
        for craft in &self.crafts {
            if let Some(item) = &craft.refuel_item {
                self.require_item(&format!("craft {}", craft.name), item)?;
            }
        }
        for weapon in &self.craft_weapons {
            if let Some(item) = &weapon.clip_item {
                self.require_item(&format!("craft weapon {}", weapon.name), item)?;
            }
        }
        for topic in &self.research {
            let context = format!("research {}", topic.name);
            for free in &topic.get_one_free {
                self.require_research(&context, free)?;
            }
            if let Some(item) = &topic.spawned_item {
                self.require_item(&context, item)?;
            }
        }
        for project in &self.manufacture {
            let context = format!("manufacture {}", project.name);
            for item in project
                .required_items
                .keys()
                .chain(project.produced_items.keys())
            {
                self.require_item(&context, item)?;
            }
        }
        Ok(())
    }

    // --- Lookups ---

    pub fn region(&self, name: &str) -> Option<&RegionRule> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn alien_mission(&self, name: &str) -> Option<&AlienMissionRule> {
        self.alien_missions.iter().find(|m| m.name == name)
    }

    pub fn race(&self, name: &str) -> Option<&RaceRule> {
        self.races.iter().find(|r| r.name == name)
    }

    pub fn ufo(&self, name: &str) -> Option<&UfoRule> {
        self.ufos.iter().find(|u| u.name == name)
    }

    pub fn trajectory(&self, id: &str) -> Option<&UfoTrajectory> {
        self.trajectories.iter().find(|t| t.id == id)
    }

    pub fn deployment(&self, name: &str) -> Option<&DeploymentRule> {
        self.deployments.iter().find(|d| d.name == name)
    }

    pub fn craft(&self, name: &str) -> Option<&CraftRule> {
        self.crafts.iter().find(|c| c.name == name)
    }

    pub fn craft_weapon(&self, name: &str) -> Option<&CraftWeaponRule> {
        self.craft_weapons.iter().find(|w| w.name == name)
    }

    pub fn facility(&self, name: &str) -> Option<&FacilityRule> {
        self.facilities.iter().find(|f| f.name == name)
    }

    pub fn item(&self, name: &str) -> Option<&ItemRule> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn research_topic(&self, name: &str) -> Option<&ResearchRule> {
        self.research.iter().find(|r| r.name == name)
    }

    pub fn manufacture_project(&self, name: &str) -> Option<&ManufactureRule> {
        self.manufacture.iter().find(|m| m.name == name)
    }

    /// First region (declaration order) containing `point`.
    pub fn locate_region(&self, point: GeoPoint) -> Option<&RegionRule> {
        self.regions.iter().find(|r| r.contains(point))
    }

    /// First country (declaration order) containing `point`.
    pub fn locate_country(&self, point: GeoPoint) -> Option<&CountryRule> {
        self.countries.iter().find(|c| c.contains(point))
    }

    // --- Fatal lookups ---

    pub fn require_region(&self, context: &str, name: &str) -> Result<&RegionRule, ConfigError> {
        self.region(name)
            .ok_or_else(|| ConfigError::undefined(context, "region", name))
    }

    pub fn require_alien_mission(
        &self,
        context: &str,
        name: &str,
    ) -> Result<&AlienMissionRule, ConfigError> {
        self.alien_mission(name)
            .ok_or_else(|| ConfigError::undefined(context, "alien mission", name))
    }

    pub fn require_race(&self, context: &str, name: &str) -> Result<&RaceRule, ConfigError> {
        self.race(name)
            .ok_or_else(|| ConfigError::undefined(context, "race", name))
    }

    pub fn require_ufo(&self, context: &str, name: &str) -> Result<&UfoRule, ConfigError> {
        self.ufo(name)
            .ok_or_else(|| ConfigError::undefined(context, "UFO", name))
    }

    pub fn require_trajectory(
        &self,
        context: &str,
        id: &str,
    ) -> Result<&UfoTrajectory, ConfigError> {
        self.trajectory(id)
            .ok_or_else(|| ConfigError::undefined(context, "trajectory", id))
    }

    pub fn require_deployment(
        &self,
        context: &str,
        name: &str,
    ) -> Result<&DeploymentRule, ConfigError> {
        self.deployment(name)
            .ok_or_else(|| ConfigError::undefined(context, "deployment", name))
    }

    pub fn require_craft(&self, context: &str, name: &str) -> Result<&CraftRule, ConfigError> {
        self.craft(name)
            .ok_or_else(|| ConfigError::undefined(context, "craft", name))
    }

    pub fn require_item(&self, context: &str, name: &str) -> Result<&ItemRule, ConfigError> {
        self.item(name)
            .ok_or_else(|| ConfigError::undefined(context, "item", name))
    }

    pub fn require_research(
        &self,
        context: &str,
        name: &str,
    ) -> Result<&ResearchRule, ConfigError> {
        self.research_topic(name)
            .ok_or_else(|| ConfigError::undefined(context, "research", name))
    }
}
