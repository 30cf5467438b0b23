//! Every 10 minutes: fuel, alien base spotting, and aliens spotting bases.

use std::collections::BTreeMap;

use geoscape_core::constants::{ALIEN_BASE_SPOT_CHANCE, ALIEN_BASE_SPOT_PENALTY};
use geoscape_core::enums::{MissionObjective, UfoStatus};
use geoscape_core::error::ConfigError;
use geoscape_core::events::Popup;
use geoscape_core::types::*;

use crate::systems::{alien_missions, detection, TickContext};

pub fn run(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    // 1. Fuel
    burn_fuel(ctx);
    // 2. Craft spotting alien bases
    spot_alien_bases(ctx);
    // 3. UFOs spotting XCOM bases
    detect_bases(ctx)
}

fn burn_fuel(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    for base in &mut ctx.campaign.bases {
        let home = base.position;
        for craft in base.crafts.iter_mut().filter(|c| c.is_airborne()) {
            let Some(rule) = ruleset.craft(&craft.rule) else {
                continue;
            };
            craft.consume_fuel();
            if !craft.low_fuel && craft.fuel <= craft.fuel_limit(home) {
                craft.low_fuel = true;
                craft.return_to_base(rule);
                tracing::debug!(target: "geoscape::craft", craft = %craft.id, fuel = craft.fuel, "craft.low_fuel");
                ctx.popups.push(Popup::LowFuel { craft: craft.id });
            }
        }
    }
}

fn spot_alien_bases(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let chance = ALIEN_BASE_SPOT_CHANCE - ALIEN_BASE_SPOT_PENALTY * ctx.campaign.difficulty.level();
    let spotters: Vec<(GeoPoint, f64)> = ctx
        .campaign
        .crafts()
        .filter(|c| c.is_airborne())
        .filter_map(|c| {
            let rule = ruleset.craft(&c.rule)?;
            (rule.sight_range > 0.0).then(|| (c.position, nautical_miles_to_radians(rule.sight_range)))
        })
        .collect();
    if spotters.is_empty() {
        return;
    }

    for alien_base in ctx.campaign.alien_bases.iter_mut().filter(|b| !b.discovered) {
        for &(position, range) in &spotters {
            if position.distance_to(alien_base.position) <= range && ctx.rng.percent(chance) {
                alien_base.discovered = true;
                tracing::info!(target: "geoscape::detection", alien_base = %alien_base.id, "alien_base.spotted");
                ctx.popups.push(Popup::AlienBaseDiscovered {
                    alien_base: alien_base.id,
                });
                break;
            }
        }
    }
}

/// UFOs look for unmarked XCOM bases. In aggressive mode every base seen is
/// marked at once; otherwise only the last base seen in each region is.
fn detect_bases(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    let aggressive = ctx.options.aggressive_retaliation;
    let mut per_region: BTreeMap<String, (usize, String)> = BTreeMap::new();
    let mut marked: Vec<(usize, String, String)> = Vec::new();

    for bi in 0..ctx.campaign.bases.len() {
        let base = &ctx.campaign.bases[bi];
        if base.retaliation_target {
            continue;
        }
        let position = base.position;
        let chance = base.detection_chance(ruleset);
        let Some(region) = ruleset.locate_region(position) else {
            continue;
        };

        let mut seen_by = None;
        for ufo in ctx
            .campaign
            .ufos
            .iter()
            .filter(|u| u.status != UfoStatus::Crashed)
        {
            let Some(mission) = ctx.campaign.mission(ufo.mission) else {
                continue;
            };
            let (Some(ufo_rule), Some(trajectory), Some(mission_rule)) = (
                ruleset.ufo(&ufo.rule),
                ruleset.trajectory(&ufo.trajectory),
                ruleset.alien_mission(&mission.rule),
            ) else {
                continue;
            };
            if detection::detect_xcom_base(
                ufo,
                ufo_rule,
                trajectory,
                mission_rule.objective,
                aggressive,
                position,
                chance,
                ctx.rng,
            ) {
                seen_by = Some(mission.race.clone());
                break;
            }
        }
        let Some(race) = seen_by else {
            continue;
        };
        if aggressive {
            marked.push((bi, region.name.clone(), race));
        } else {
            per_region.insert(region.name.clone(), (bi, race));
        }
    }
    marked.extend(
        per_region
            .into_iter()
            .map(|(region, (bi, race))| (bi, region, race)),
    );

    for (bi, region, race) in marked {
        let base = &mut ctx.campaign.bases[bi];
        base.retaliation_target = true;
        tracing::info!(target: "geoscape::detection", base = %base.id, %region, "base.spotted");
        start_retaliation(ctx, &region, &race)?;
    }
    Ok(())
}

/// Launch the race's retaliation mission in `region` unless one is already
/// running there.
fn start_retaliation(ctx: &mut TickContext<'_>, region: &str, race: &str) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    let running = ctx.campaign.alien_missions.iter().any(|m| {
        m.region == region
            && ruleset
                .alien_mission(&m.rule)
                .is_some_and(|r| r.objective == MissionObjective::Retaliation)
    });
    if running {
        return Ok(());
    }
    let Some(mission) = ruleset.race(race).and_then(|r| r.retaliation_mission.as_deref()) else {
        return Ok(());
    };
    alien_missions::start_mission(ctx, mission, region, race, 0)?;
    Ok(())
}
