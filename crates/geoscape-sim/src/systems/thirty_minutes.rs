//! Every 30 minutes: missions think, wrecks expire, craft refuel, radar
//! sweeps, and mission sites count down.

use geoscape_core::constants::SITE_TICK_SECONDS;
use geoscape_core::enums::{CraftStatus, DetectionKind, UfoStatus};
use geoscape_core::error::ConfigError;
use geoscape_core::events::Popup;
use geoscape_core::types::*;

use crate::systems::{alien_missions, detection, TickContext};

pub fn run(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    // 1. Missions
    advance_missions(ctx)?;
    // 2. Crash sites
    expire_wrecks(ctx)?;
    // 3. Refuelling
    refuel_crafts(ctx);
    // 4. Radar
    sweep_radar(ctx);
    // 5. Mission sites
    process_sites(ctx);
    Ok(())
}

fn advance_missions(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    for index in 0..ctx.campaign.alien_missions.len() {
        alien_missions::think(ctx, index)?;
    }
    ctx.campaign.alien_missions.retain(|mission| {
        let over = ruleset
            .alien_mission(&mission.rule)
            .is_some_and(|rule| alien_missions::is_over(mission, rule));
        if over {
            tracing::info!(target: "geoscape::missions", mission = %mission.id, rule = %mission.rule, "mission.finished");
        }
        !over
    });
    Ok(())
}

fn expire_wrecks(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    for index in 0..ctx.campaign.ufos.len() {
        let ufo = &mut ctx.campaign.ufos[index];
        if ufo.status != UfoStatus::Crashed {
            continue;
        }
        if ufo.seconds_remaining > SITE_TICK_SECONDS {
            ufo.seconds_remaining -= SITE_TICK_SECONDS;
        } else {
            alien_missions::ufo_lifting(ctx, index)?;
        }
    }
    Ok(())
}

fn refuel_crafts(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    for base in &mut ctx.campaign.bases {
        for ci in 0..base.crafts.len() {
            let craft = &base.crafts[ci];
            if craft.status != CraftStatus::Refuelling {
                continue;
            }
            let Some(rule) = ruleset.craft(&craft.rule) else {
                continue;
            };
            let craft_id = craft.id;
            match rule.refuel_item.as_deref() {
                None => base.crafts[ci].refuel(rule),
                Some(item) if base.remove_items(item, 1) => {
                    let craft = &mut base.crafts[ci];
                    craft.refuel(rule);
                    craft.warned = false;
                }
                Some(item) => {
                    let craft = &mut base.crafts[ci];
                    if !craft.warned {
                        craft.warned = true;
                        ctx.popups.push(Popup::RefuelShortage {
                            craft: craft_id,
                            item: item.to_string(),
                        });
                    }
                }
            }
        }
    }
}

fn sweep_radar(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let radars = detection::radars(ctx.campaign, ruleset);
    for index in 0..ctx.campaign.ufos.len() {
        let ufo = &ctx.campaign.ufos[index];
        if matches!(ufo.status, UfoStatus::Crashed | UfoStatus::Destroyed) {
            continue;
        }
        let Some(rule) = ruleset.ufo(&ufo.rule) else {
            continue;
        };
        let id = ufo.id;

        if !ufo.detected {
            let kind = detection::detect_ufo(ufo, rule.size, &radars, ctx.rng);
            if kind == DetectionKind::None {
                continue;
            }
            let hyperwave = kind == DetectionKind::Hyperwave;
            let ufo = &mut ctx.campaign.ufos[index];
            ufo.detected = true;
            ufo.hyper_detected = hyperwave;
            tracing::debug!(target: "geoscape::detection", ufo = %id, hyperwave, "ufo.detected");
            ctx.popups.push(Popup::UfoDetected { ufo: id, hyperwave });
            continue;
        }

        match detection::track_ufo(ufo, &radars) {
            DetectionKind::None => {
                let followers = ctx.campaign.followers(Target::Ufo(id));
                let ufo = &mut ctx.campaign.ufos[index];
                ufo.detected = false;
                ufo.hyper_detected = false;
                tracing::debug!(target: "geoscape::detection", ufo = %id, followers, "ufo.lost");
                if followers > 0 {
                    ctx.popups.push(Popup::UfoLost { ufo: id });
                }
            }
            DetectionKind::Hyperwave => ctx.campaign.ufos[index].hyper_detected = true,
            DetectionKind::Conventional => {}
        }
    }
}

/// Sites score for the aliens every half hour. Once the timer runs out a
/// site vanishes with its despawn penalty, but only if no craft is on its
/// way; a site with followers stays and keeps scoring.
fn process_sites(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let sites: Vec<(SiteId, usize)> = ctx
        .campaign
        .mission_sites
        .iter()
        .map(|s| (s.id, ctx.campaign.followers(Target::MissionSite(s.id))))
        .collect();

    for (id, followers) in sites {
        let Some(index) = ctx.campaign.mission_sites.iter().position(|s| s.id == id) else {
            continue;
        };
        let site = &mut ctx.campaign.mission_sites[index];
        let deployment = ruleset.deployment(&site.deployment);
        let position = site.position;
        let expired = site.seconds_remaining < SITE_TICK_SECONDS;
        if !expired {
            site.seconds_remaining -= SITE_TICK_SECONDS;
        }
        let remove = expired && followers == 0;
        let points = match (deployment, remove) {
            (Some(d), true) => d.despawn_penalty,
            (Some(d), false) => d.points,
            (None, _) => 0,
        };
        ctx.campaign.add_alien_activity(ruleset, position, points);
        if remove {
            ctx.campaign.mission_sites.remove(index);
            tracing::info!(target: "geoscape::missions", site = %id, "site.expired");
        }
    }
}
