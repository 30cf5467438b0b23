//! Monthly alien mission scheduling from the ruleset's mission scripts.
//!
//! Scripts are evaluated once per month in declaration order. A script may
//! name a label; later scripts reference labels through signed conditionals
//! (positive: that script must have run, negative: it must not have). A
//! label nobody has evaluated yet does not block.

use std::collections::{BTreeMap, BTreeSet};

use geoscape_core::error::ConfigError;
use geoscape_core::ruleset::{MissionScript, WeightedOptions};

use crate::systems::alien_missions;
use crate::systems::TickContext;

/// Scripts whose month window, run cap, difficulty floor, and research
/// triggers allow them to run this month.
pub fn available_scripts<'r>(ctx: &TickContext<'r>) -> Vec<&'r MissionScript> {
    let month = ctx.campaign.months_passed;
    let ruleset = ctx.ruleset;
    ruleset
        .mission_scripts
        .iter()
        .filter(|script| {
            script.first_month <= month
                && (script.last_month < 0 || month <= script.last_month as u32)
                && (script.max_runs < 0
                    || ctx.campaign.alien_strategy.missions_run(script.var_name())
                        < script.max_runs as u32)
                && ctx.campaign.difficulty >= script.min_difficulty
                && script
                    .research_triggers
                    .iter()
                    .all(|(topic, wanted)| ctx.campaign.is_researched(topic) == *wanted)
        })
        .collect()
}

/// Run this month's scripts. Returns how many missions were started.
///
/// Two available scripts sharing a label is a content error; it is raised
/// before any script runs, so nothing spawns that month.
pub fn determine_alien_missions(ctx: &mut TickContext<'_>) -> Result<usize, ConfigError> {
    let scripts = available_scripts(ctx);

    let mut seen = BTreeSet::new();
    for script in &scripts {
        if script.label > 0 && !seen.insert(script.label) {
            let err = ConfigError::DuplicateLabel {
                script: script.name.clone(),
                label: script.label,
            };
            tracing::error!(target: "geoscape::missions", error = %err, "config.fatal");
            return Err(err);
        }
    }

    let mut outcomes: BTreeMap<u32, bool> = BTreeMap::new();
    let mut started = 0;
    for script in scripts {
        let allowed = script.conditionals.iter().all(|&condition| {
            match outcomes.get(&condition.unsigned_abs()) {
                Some(&succeeded) => succeeded == (condition > 0),
                None => true,
            }
        });
        let mut success = false;
        if allowed && ctx.rng.percent(script.execution_odds) {
            success = process_script(ctx, script).inspect_err(|err| {
                tracing::error!(target: "geoscape::missions", error = %err, "config.fatal");
            })?;
        }
        if success {
            started += 1;
        }
        if script.label > 0 {
            outcomes.insert(script.label, success);
        }
    }
    tracing::info!(
        target: "geoscape::missions",
        month = ctx.campaign.months_passed,
        started,
        "missions.scheduled"
    );
    Ok(started)
}

/// Resolve region, mission type, and race for one script and start it.
/// `Ok(false)` means nothing suitable this month.
pub fn process_script(ctx: &mut TickContext<'_>, script: &MissionScript) -> Result<bool, ConfigError> {
    let ruleset = ctx.ruleset;
    let month = ctx.campaign.months_passed;
    let context = format!("mission script {}", script.name);

    let mut site_zone = None;
    let region: Option<String>;
    let mission_type: Option<String>;

    if script.site_type {
        let Some((chosen_type, chosen_region, area)) = pick_site_location(ctx, script)? else {
            return Ok(false);
        };
        site_zone = Some(area);
        region = Some(chosen_region);
        mission_type = Some(chosen_type);
    } else {
        region = if ctx.rng.percent(script.target_base_odds) {
            pick_base_region(ctx, script)
        } else if let Some(weights) = script.region_weights.at_month(month) {
            ctx.rng.choose(weights)
        } else {
            ctx.campaign
                .alien_strategy
                .choose_random_region(ruleset, ctx.rng)
        };
        mission_type = match (&region, script.mission_weights.at_month(month)) {
            (None, _) => None,
            (Some(_), Some(weights)) => ctx.rng.choose(weights),
            (Some(region), None) => ctx
                .campaign
                .alien_strategy
                .choose_random_mission(region, ctx.rng),
        };
    }

    let (Some(region), Some(mission_type)) = (region, mission_type) else {
        return Ok(false);
    };
    ruleset.require_region(&context, &region)?;
    let mission_rule = ruleset.require_alien_mission(&context, &mission_type)?;

    let race_table = script
        .race_weights
        .at_month(month)
        .or_else(|| mission_rule.race_weights.at_month(month));
    let race = race_table.and_then(|weights| ctx.rng.choose(weights));
    let Some(race) = race else {
        return Err(ConfigError::NoRaces {
            script: script.name.clone(),
            mission: mission_type,
        });
    };
    ruleset.require_race(&context, &race)?;

    let id = alien_missions::start_mission(ctx, &mission_type, &region, &race, script.start_delay)?;
    if let Some(mission) = ctx.campaign.mission_mut(id) {
        mission.site_zone = site_zone;
    }
    ctx.campaign
        .alien_strategy
        .add_mission_run(script.var_name());
    if script.use_table {
        ctx.campaign
            .alien_strategy
            .remove_mission(&region, &mission_type);
    }
    Ok(true)
}

/// Site scripts: try each candidate mission type in turn, starting from a
/// random one, until a region offers an area in the type's spawn zone that
/// was not used recently under this script's counter.
fn pick_site_location(
    ctx: &mut TickContext<'_>,
    script: &MissionScript,
) -> Result<Option<(String, String, usize)>, ConfigError> {
    let ruleset = ctx.ruleset;
    let month = ctx.campaign.months_passed;
    let context = format!("mission script {}", script.name);
    let types = script.mission_types(month);
    if types.is_empty() {
        return Ok(None);
    }
    let regions = if script.region_weights.is_empty() {
        ruleset.regions.iter().map(|r| r.name.clone()).collect()
    } else {
        script.regions(month)
    };

    let mut entry = ctx.rng.index(types.len());
    for _ in 0..types.len() {
        let mission_type = &types[entry];
        let zone = ruleset
            .require_alien_mission(&context, mission_type)?
            .spawn_zone;
        let mut valid: Vec<(String, usize)> = Vec::new();
        for name in &regions {
            let region = ruleset.require_region(&context, name)?;
            let Some(areas) = region.zones.get(zone).map(|z| &z.areas) else {
                continue;
            };
            for index in 0..areas.len() {
                if script.avoid_repeats == 0
                    || ctx.campaign.alien_strategy.valid_mission_location(
                        script.var_name(),
                        name,
                        index,
                    )
                {
                    valid.push((name.clone(), index));
                }
            }
        }
        if valid.is_empty() {
            entry = (entry + 1) % types.len();
            continue;
        }

        let region = match script.region_weights.at_month(month) {
            Some(weights) => {
                // Only regions that still have room are eligible.
                let mut eligible = WeightedOptions::default();
                for name in weights.names() {
                    if valid.iter().any(|(r, _)| *r == name) {
                        eligible.set(&name, weights.weight(&name));
                    }
                }
                ctx.rng.choose(&eligible)
            }
            None => {
                let distinct: Vec<&String> = {
                    let mut names: Vec<&String> = valid.iter().map(|(r, _)| r).collect();
                    names.dedup();
                    names
                };
                Some(distinct[ctx.rng.index(distinct.len())].clone())
            }
        };
        let Some(region) = region else {
            return Ok(None);
        };
        let areas: Vec<usize> = valid
            .iter()
            .filter(|(r, _)| *r == region)
            .map(|(_, a)| *a)
            .collect();
        let area = areas[ctx.rng.index(areas.len())];
        ctx.campaign.alien_strategy.add_mission_location(
            script.var_name(),
            &region,
            area,
            script.avoid_repeats,
        );
        return Ok(Some((mission_type.clone(), region, area)));
    }
    Ok(None)
}

/// A region holding an XCOM base that has no live mission of this script's
/// types yet.
fn pick_base_region(ctx: &mut TickContext<'_>, script: &MissionScript) -> Option<String> {
    let ruleset = ctx.ruleset;
    let types = script.mission_types(ctx.campaign.months_passed);
    let mut candidates: Vec<String> = Vec::new();
    for base in &ctx.campaign.bases {
        let Some(region) = ruleset.locate_region(base.position) else {
            continue;
        };
        let busy = ctx
            .campaign
            .alien_missions
            .iter()
            .any(|m| m.region == region.name && types.contains(&m.rule));
        if !busy && !candidates.contains(&region.name) {
            candidates.push(region.name.clone());
        }
    }
    if candidates.is_empty() {
        return None;
    }
    let index = ctx.rng.index(candidates.len());
    Some(candidates.swap_remove(index))
}
