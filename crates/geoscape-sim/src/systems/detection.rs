//! Detection predicates: XCOM radar against UFOs, aliens against XCOM bases.
//!
//! Pure functions over positions and ranges. Every roll goes through the
//! shared `SimRng`, so results are reproducible for a fixed seed.

use geoscape_core::components::Ufo;
use geoscape_core::constants::{RETALIATION_APPROACH_ZONE, RETALIATION_ASSAULT_RUN};
use geoscape_core::enums::{DetectionKind, MissionObjective, UfoSize, UfoStatus};
use geoscape_core::ruleset::{Ruleset, UfoRule, UfoTrajectory};
use geoscape_core::types::{nautical_miles_to_radians, GeoPoint};

use crate::campaign::Campaign;
use crate::rng::SimRng;

/// Whether a UFO notices an XCOM base this scan.
///
/// Fresh UFOs, UFOs in the approach zone, UFOs already flying an assault
/// run, and wrecks never look. Outside aggressive mode only retaliation
/// missions look at all.
#[allow(clippy::too_many_arguments)]
pub fn detect_xcom_base(
    ufo: &Ufo,
    ufo_rule: &UfoRule,
    trajectory: &UfoTrajectory,
    objective: MissionObjective,
    aggressive: bool,
    base_position: GeoPoint,
    chance: i32,
    rng: &mut SimRng,
) -> bool {
    if ufo.trajectory_point <= 1 {
        return false;
    }
    if trajectory.zone(ufo.trajectory_point) == Some(RETALIATION_APPROACH_ZONE) {
        return false;
    }
    if (objective != MissionObjective::Retaliation && !aggressive)
        || trajectory.id == RETALIATION_ASSAULT_RUN
        || matches!(ufo.status, UfoStatus::Crashed | UfoStatus::Destroyed)
    {
        return false;
    }
    let range = nautical_miles_to_radians(ufo_rule.sight_range);
    if ufo.position.distance_to(base_position) >= range {
        return false;
    }
    rng.percent(chance)
}

/// One radar source: a completed base facility or an airborne craft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radar {
    pub position: GeoPoint,
    /// Radians.
    pub range: f64,
    pub chance: i32,
    pub hyperwave: bool,
}

impl Radar {
    pub fn covers(&self, point: GeoPoint) -> bool {
        self.position.distance_to(point) <= self.range
    }
}

/// All radars in play: base facilities first, then airborne craft.
pub fn radars(campaign: &Campaign, ruleset: &Ruleset) -> Vec<Radar> {
    let mut radars = Vec::new();
    for base in &campaign.bases {
        for facility in base.completed_facilities() {
            let Some(rule) = ruleset.facility(&facility.rule) else {
                continue;
            };
            if rule.radar_range <= 0.0 {
                continue;
            }
            radars.push(Radar {
                position: base.position,
                range: nautical_miles_to_radians(rule.radar_range),
                chance: rule.radar_chance,
                hyperwave: rule.hyperwave,
            });
        }
    }
    for craft in campaign.crafts().filter(|c| c.is_airborne()) {
        let Some(rule) = ruleset.craft(&craft.rule) else {
            continue;
        };
        if rule.radar_range <= 0.0 {
            continue;
        }
        radars.push(Radar {
            position: craft.position,
            range: nautical_miles_to_radians(rule.radar_range),
            chance: 100,
            hyperwave: false,
        });
    }
    radars
}

/// Scan for a UFO that is not currently tracked.
///
/// A hyperwave decoder in range settles it at once. Conventional radars
/// roll `chance * (100 + visibility) / 100` until one succeeds; the scan then
/// only keeps looking for a hyperwave source.
pub fn detect_ufo(ufo: &Ufo, size: UfoSize, radars: &[Radar], rng: &mut SimRng) -> DetectionKind {
    let visibility = ufo.visibility(size);
    let mut result = DetectionKind::None;
    for radar in radars.iter().filter(|r| r.covers(ufo.position)) {
        if radar.hyperwave {
            return DetectionKind::Hyperwave;
        }
        if result == DetectionKind::None {
            let chance = radar.chance * (100 + visibility) / 100;
            if rng.percent(chance) {
                result = DetectionKind::Conventional;
            }
        }
    }
    result
}

/// Coverage check for a UFO that is already tracked. No rolls: contact is
/// kept while any radar still has it in range.
pub fn track_ufo(ufo: &Ufo, radars: &[Radar]) -> DetectionKind {
    let mut result = DetectionKind::None;
    for radar in radars.iter().filter(|r| r.covers(ufo.position)) {
        if radar.hyperwave {
            return DetectionKind::Hyperwave;
        }
        result = DetectionKind::Conventional;
    }
    result
}
