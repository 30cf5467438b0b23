//! Every tick: UFO and craft movement, arrivals, and cleanup.

use geoscape_core::components::Waypoint;
use geoscape_core::enums::UfoStatus;
use geoscape_core::error::ConfigError;
use geoscape_core::events::Popup;
use geoscape_core::types::*;

use crate::systems::alien_missions;
use crate::systems::TickContext;

pub fn run(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    // 1. UFOs
    move_ufos(ctx)?;
    // 2. Craft
    move_crafts(ctx);
    // 3. Lost craft
    remove_destroyed_crafts(ctx);
    // 4. Dead UFOs no dogfight still references
    reap_ufos(ctx);
    // 5. Waypoints nobody follows
    let campaign = &*ctx.campaign;
    let keep: Vec<bool> = campaign
        .waypoints
        .iter()
        .map(|w| campaign.followers(Target::Waypoint(w.id)) > 0)
        .collect();
    let mut keep = keep.into_iter();
    ctx.campaign
        .waypoints
        .retain(|_| keep.next().unwrap_or(false));
    Ok(())
}

fn move_ufos(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    // UFOs spawned mid-loop (none today) would simply wait for the next tick.
    let count = ctx.campaign.ufos.len();
    for index in 0..count {
        let ufo = &mut ctx.campaign.ufos[index];
        match ufo.status {
            UfoStatus::Flying => {
                if ctx.dogfights.engages_ufo(ufo.id) {
                    continue;
                }
                let step = radian_speed(ufo.speed);
                let (position, arrived) = ufo.position.step_towards(ufo.destination, step);
                ufo.position = position;
                if arrived {
                    alien_missions::ufo_reached_waypoint(ctx, index)?;
                }
            }
            UfoStatus::Landed => {
                ufo.seconds_remaining = ufo.seconds_remaining.saturating_sub(5);
                if ufo.seconds_remaining == 0 {
                    alien_missions::ufo_lifting(ctx, index)?;
                }
            }
            UfoStatus::Crashed => {
                // Wrecks stay visible until they expire.
                ufo.detected = true;
            }
            UfoStatus::Destroyed => {}
        }
    }
    Ok(())
}

fn move_crafts(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let ids: Vec<CraftId> = ctx
        .campaign
        .crafts()
        .filter(|c| c.is_airborne() && !c.landing_pending && !ctx.dogfights.engages_craft(c.id))
        .map(|c| c.id)
        .collect();

    for id in ids {
        let Some((bi, ci)) = ctx.campaign.craft_location(id) else {
            continue;
        };
        let craft = &ctx.campaign.bases[bi].crafts[ci];
        let Some(rule) = ruleset.craft(&craft.rule) else {
            continue;
        };
        let Some(mut target) = craft.destination else {
            // Patrolling on the spot.
            continue;
        };

        // A pursued UFO that dropped off radar leaves a waypoint at its
        // last known position.
        if let Target::Ufo(ufo_id) = target {
            match ctx.campaign.ufo(ufo_id) {
                Some(ufo) if ufo.is_destroyed() => {
                    ctx.campaign.bases[bi].crafts[ci].return_to_base(rule);
                    continue;
                }
                Some(ufo) if !ufo.detected => {
                    let position = ufo.position;
                    let waypoint = WaypointId(ctx.campaign.next_id("WAYPOINTS"));
                    ctx.campaign.waypoints.push(Waypoint {
                        id: waypoint,
                        position,
                    });
                    target = Target::Waypoint(waypoint);
                    ctx.campaign.bases[bi].crafts[ci].destination = Some(target);
                }
                Some(_) => {}
                None => {
                    ctx.campaign.bases[bi].crafts[ci].return_to_base(rule);
                    continue;
                }
            }
        }

        let Some(destination) = ctx.campaign.target_position(target) else {
            ctx.campaign.bases[bi].crafts[ci].return_to_base(rule);
            continue;
        };
        let craft = &mut ctx.campaign.bases[bi].crafts[ci];
        let (position, arrived) = craft
            .position
            .step_towards(destination, radian_speed(craft.speed));
        craft.position = position;
        if arrived {
            craft_arrived(ctx, bi, ci, target);
        }
    }
}

fn craft_arrived(ctx: &mut TickContext<'_>, bi: usize, ci: usize, target: Target) {
    let ruleset = ctx.ruleset;
    let craft = &ctx.campaign.bases[bi].crafts[ci];
    let craft_id = craft.id;
    let Some(rule) = ruleset.craft(&craft.rule) else {
        return;
    };
    let soldiers = ctx.campaign.bases[bi].soldiers_aboard(craft_id);

    match target {
        Target::Base(_) => {
            let home = ctx.campaign.bases[bi].position;
            ctx.campaign.bases[bi].crafts[ci].arrive_home(home, rule);
            tracing::debug!(target: "geoscape::craft", craft = %craft_id, "craft.home");
        }
        Target::Waypoint(_) => {
            let craft = &mut ctx.campaign.bases[bi].crafts[ci];
            craft.destination = None;
            craft.speed = rule.max_speed / 2.0;
            ctx.popups.push(Popup::CraftPatrol { craft: craft_id });
        }
        Target::Ufo(ufo_id) => {
            let Some(ufo) = ctx.campaign.ufo(ufo_id) else {
                ctx.campaign.bases[bi].crafts[ci].return_to_base(rule);
                return;
            };
            if ufo.status == UfoStatus::Flying {
                let underwater = ruleset.ufo(&ufo.rule).is_some_and(|r| r.underwater);
                let craft = &ctx.campaign.bases[bi].crafts[ci];
                if !craft.has_ammo() || (underwater && rule.max_depth == 0) {
                    ctx.campaign.bases[bi].crafts[ci].return_to_base(rule);
                } else if ctx.dogfights.queue(craft_id, ufo_id) {
                    ctx.campaign.bases[bi].crafts[ci].in_dogfight = true;
                }
                // Refused: keep chasing and try again next tick.
            } else if soldiers > 0 {
                request_landing(ctx, bi, ci, target);
            } else if ufo.status != UfoStatus::Landed {
                ctx.campaign.bases[bi].crafts[ci].return_to_base(rule);
            }
            // Nobody aboard: hold over a landed UFO until it lifts off.
        }
        Target::MissionSite(_) => {
            if soldiers > 0 {
                request_landing(ctx, bi, ci, target);
            } else {
                ctx.campaign.bases[bi].crafts[ci].return_to_base(rule);
            }
        }
        Target::AlienBase(id) => {
            let discovered = ctx.campaign.alien_base(id).is_some_and(|b| b.discovered);
            if discovered && soldiers > 0 {
                request_landing(ctx, bi, ci, target);
            } else {
                ctx.campaign.bases[bi].crafts[ci].return_to_base(rule);
            }
        }
    }
}

fn request_landing(ctx: &mut TickContext<'_>, bi: usize, ci: usize, target: Target) {
    let craft = &mut ctx.campaign.bases[bi].crafts[ci];
    craft.landing_pending = true;
    let craft_id = craft.id;
    ctx.popups.push(Popup::ConfirmLanding {
        craft: craft_id,
        target,
    });
}

fn remove_destroyed_crafts(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let mut lost = Vec::new();
    for base in &ctx.campaign.bases {
        for craft in &base.crafts {
            if ruleset
                .craft(&craft.rule)
                .is_some_and(|rule| craft.is_destroyed(rule))
            {
                let score = ruleset.craft(&craft.rule).map_or(0, |r| r.score);
                lost.push((base.id, craft.id, craft.position, score));
            }
        }
    }

    for (base_id, craft_id, position, score) in lost {
        if let Some(base) = ctx.campaign.base_mut(base_id) {
            base.soldiers.retain(|s| s.craft != Some(craft_id));
            base.crafts.retain(|c| c.id != craft_id);
        }
        ctx.campaign.add_xcom_activity(ruleset, position, -score);
        ctx.dogfights.drop_craft(craft_id);
        tracing::info!(target: "geoscape::craft", craft = %craft_id, "craft.destroyed");
        ctx.popups.push(Popup::CraftDestroyed {
            craft: craft_id,
            base: base_id,
        });
    }
}

fn reap_ufos(ctx: &mut TickContext<'_>) {
    let dogfights = &*ctx.dogfights;
    let mut reaped = Vec::new();
    ctx.campaign.ufos.retain(|ufo| {
        let dead = ufo.is_destroyed() && !dogfights.involves_ufo(ufo.id);
        if dead {
            reaped.push(ufo.mission);
        }
        !dead
    });
    for mission in reaped {
        if let Some(mission) = ctx.campaign.mission_mut(mission) {
            mission.live_ufos = mission.live_ufos.saturating_sub(1);
        }
    }
}
