//! Alien mission progression: wave spawning, UFO waypoints, landings.
//!
//! A UFO's `trajectory_point` is the index of the trajectory waypoint it
//! last reached; it is always flying toward the next one. Landing at a
//! waypoint inside the mission's spawn zone is where site and base missions
//! do their work.

use geoscape_core::components::{AlienBase, AlienMission, MissionSite, Ufo};
use geoscape_core::constants::*;
use geoscape_core::enums::{Altitude, MissionObjective, UfoStatus};
use geoscape_core::error::ConfigError;
use geoscape_core::events::Popup;
use geoscape_core::ruleset::{AlienMissionRule, MissionWave, TrajectoryWaypoint, UfoTrajectory};
use geoscape_core::types::*;

use crate::rng::SimRng;
use crate::systems::TickContext;

/// Minutes until the next wave: half the wave timer, plus or minus a quarter.
fn wave_countdown(spawn_timer: u32, rng: &mut SimRng) -> u32 {
    let half = (spawn_timer / 2) as i32;
    let sign = 2 * rng.generate(0, 1) - 1;
    (half + sign * half / 2).max(0) as u32
}

/// Create and register a mission. A non-zero `delay` overrides the first
/// wave's countdown (minutes).
pub fn start_mission(
    ctx: &mut TickContext<'_>,
    rule: &str,
    region: &str,
    race: &str,
    delay: u32,
) -> Result<MissionId, ConfigError> {
    let ruleset = ctx.ruleset;
    let mission_rule = ruleset.require_alien_mission("starting mission", rule)?;
    ruleset.require_region(rule, region)?;
    let spawn_countdown = if delay > 0 {
        delay
    } else {
        let timer = mission_rule.waves.first().map_or(0, |w| w.spawn_timer);
        wave_countdown(timer, ctx.rng)
    };
    let id = MissionId(ctx.campaign.next_id("ALIEN_MISSIONS"));
    ctx.campaign.alien_missions.push(AlienMission {
        id,
        rule: rule.to_string(),
        region: region.to_string(),
        race: race.to_string(),
        next_wave: 0,
        next_ufo_counter: 0,
        spawn_countdown,
        live_ufos: 0,
        site_zone: None,
        alien_base: None,
    });
    tracing::info!(
        target: "geoscape::missions",
        mission = %id,
        rule,
        region,
        race,
        countdown = spawn_countdown,
        "mission.started"
    );
    Ok(id)
}

/// All waves spawned and nothing left flying. Infiltrations never end.
pub fn is_over(mission: &AlienMission, rule: &AlienMissionRule) -> bool {
    rule.objective != MissionObjective::Infiltration
        && mission.next_wave >= rule.waves.len()
        && mission.live_ufos == 0
}

/// Half-hourly step: count down, and launch the next UFO when due.
pub fn think(ctx: &mut TickContext<'_>, index: usize) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    let mission = ctx.campaign.alien_missions[index].clone();
    let rule = ruleset
        .require_alien_mission("active mission", &mission.rule)?;
    if mission.next_wave >= rule.waves.len() {
        return Ok(());
    }
    if mission.spawn_countdown > 30 {
        ctx.campaign.alien_missions[index].spawn_countdown -= 30;
        return Ok(());
    }

    let wave = rule.waves[mission.next_wave].clone();
    let ufo = spawn_ufo(ctx, &mission, rule, &wave)?;
    tracing::debug!(
        target: "geoscape::missions",
        mission = %mission.id,
        ufo = %ufo.id,
        rule = %ufo.rule,
        trajectory = %ufo.trajectory,
        "ufo.spawned"
    );
    ctx.campaign.ufos.push(ufo);

    let entry = &mut ctx.campaign.alien_missions[index];
    entry.live_ufos += 1;
    entry.next_ufo_counter += 1;
    if entry.next_ufo_counter >= wave.count {
        entry.next_ufo_counter = 0;
        entry.next_wave += 1;
    }
    if rule.objective == MissionObjective::Infiltration && entry.next_wave == rule.waves.len() {
        entry.next_wave = 0;
    }
    if let Some(next) = rule.waves.get(entry.next_wave) {
        entry.spawn_countdown = wave_countdown(next.spawn_timer, ctx.rng);
    }
    Ok(())
}

fn spawn_ufo(
    ctx: &mut TickContext<'_>,
    mission: &AlienMission,
    rule: &AlienMissionRule,
    wave: &MissionWave,
) -> Result<Ufo, ConfigError> {
    let ruleset = ctx.ruleset;
    let context = format!("alien mission {}", rule.name);
    let region = ruleset.require_region(&context, &mission.region)?;

    if rule.objective == MissionObjective::Retaliation {
        let marked = ctx
            .campaign
            .bases
            .iter()
            .find(|b| b.retaliation_target && region.contains(b.position))
            .map(|b| (b.id, b.position));
        if let Some((base, base_position)) = marked {
            let ufo_rule = ruleset.require_ufo(&context, RETALIATION_ASSAULT_UFO)?;
            let trajectory = ruleset
                .require_trajectory(&context, RETALIATION_ASSAULT_RUN)?;
            let first = first_waypoint(&context, trajectory)?;
            let position = random_point(ctx, &context, &mission.region, first.zone)?;
            let id = UfoId(ctx.campaign.next_id("UFOS"));
            tracing::info!(
                target: "geoscape::missions",
                mission = %mission.id,
                base = %base,
                "retaliation.assault_run"
            );
            return Ok(Ufo {
                id,
                rule: ufo_rule.name.clone(),
                position,
                destination: base_position,
                speed: ufo_rule.max_speed * first.speed as f64 / 100.0,
                status: UfoStatus::Flying,
                altitude: first.altitude,
                detected: false,
                hyper_detected: false,
                seconds_remaining: 0,
                trajectory: trajectory.id.clone(),
                trajectory_point: 0,
                mission: mission.id,
                damage: 0,
                target_base: Some(base),
            });
        }
    }

    let ufo_rule = ruleset.require_ufo(&context, &wave.ufo)?;
    let trajectory = ruleset.require_trajectory(&context, &wave.trajectory)?;
    let first = first_waypoint(&context, trajectory)?;
    let position = waypoint_position(ctx, mission, rule, trajectory, 0)?;
    let destination = if trajectory.waypoints.len() > 1 {
        waypoint_position(ctx, mission, rule, trajectory, 1)?
    } else {
        position
    };
    Ok(Ufo {
        id: UfoId(ctx.campaign.next_id("UFOS")),
        rule: ufo_rule.name.clone(),
        position,
        destination,
        speed: ufo_rule.max_speed * first.speed as f64 / 100.0,
        status: UfoStatus::Flying,
        altitude: first.altitude,
        detected: false,
        hyper_detected: false,
        seconds_remaining: 0,
        trajectory: trajectory.id.clone(),
        trajectory_point: 0,
        mission: mission.id,
        damage: 0,
        target_base: None,
    })
}

fn first_waypoint(
    context: &str,
    trajectory: &UfoTrajectory,
) -> Result<TrajectoryWaypoint, ConfigError> {
    trajectory
        .waypoints
        .first()
        .copied()
        .ok_or_else(|| ConfigError::undefined(context, "trajectory waypoint", &trajectory.id))
}

/// Random point inside one of a region's mission zones.
fn random_point(
    ctx: &mut TickContext<'_>,
    context: &str,
    region: &str,
    zone: usize,
) -> Result<GeoPoint, ConfigError> {
    let ruleset = ctx.ruleset;
    let rule = ruleset.require_region(context, region)?;
    let areas = rule
        .zones
        .get(zone)
        .map(|z| &z.areas)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            ConfigError::undefined(context, "mission zone", format!("{region}/{zone}"))
        })?;
    let area = areas[ctx.rng.index(areas.len())].area;
    Ok(area.point_at(ctx.rng.fraction(), ctx.rng.fraction()))
}

/// Where waypoint `point` of a trajectory lies for this mission.
fn waypoint_position(
    ctx: &mut TickContext<'_>,
    mission: &AlienMission,
    rule: &AlienMissionRule,
    trajectory: &UfoTrajectory,
    point: usize,
) -> Result<GeoPoint, ConfigError> {
    let ruleset = ctx.ruleset;
    let context = format!("alien mission {}", rule.name);
    let waypoint = trajectory
        .waypoints
        .get(point)
        .ok_or_else(|| ConfigError::undefined(&context, "trajectory waypoint", &trajectory.id))?;

    if rule.objective == MissionObjective::Supply && waypoint.altitude == Altitude::Ground {
        if let Some(base) = mission.alien_base.and_then(|id| ctx.campaign.alien_base(id)) {
            return Ok(base.position);
        }
    }
    if waypoint.zone == rule.spawn_zone {
        if let Some(area_index) = mission.site_zone {
            let region = ruleset.require_region(&context, &mission.region)?;
            if let Some(area) = region
                .zones
                .get(waypoint.zone)
                .and_then(|z| z.areas.get(area_index))
            {
                return Ok(area.area.point_at(ctx.rng.fraction(), ctx.rng.fraction()));
            }
        }
    }
    random_point(ctx, &context, &mission.region, waypoint.zone)
}

/// A flying UFO arrived at its destination.
pub fn ufo_reached_waypoint(ctx: &mut TickContext<'_>, index: usize) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    let ufo = ctx.campaign.ufos[index].clone();
    let Some(mission) = ctx.campaign.mission(ufo.mission).cloned() else {
        escape(&mut ctx.campaign.ufos[index]);
        return Ok(());
    };
    let rule = ruleset
        .require_alien_mission("active mission", &mission.rule)?;
    let trajectory = ruleset
        .require_trajectory(&format!("alien mission {}", rule.name), &ufo.trajectory)?;

    if ufo.target_base.is_some() {
        return assault_base(ctx, index);
    }

    let reached = ufo.trajectory_point + 1;
    let Some(waypoint) = trajectory.waypoints.get(reached).copied() else {
        escape(&mut ctx.campaign.ufos[index]);
        return Ok(());
    };
    ctx.campaign.ufos[index].trajectory_point = reached;
    ctx.campaign.ufos[index].altitude = waypoint.altitude;

    if waypoint.altitude != Altitude::Ground {
        if reached + 1 >= trajectory.waypoints.len() {
            escape(&mut ctx.campaign.ufos[index]);
            return Ok(());
        }
        let speed_pct = waypoint.speed;
        let destination = waypoint_position(ctx, &mission, rule, trajectory, reached + 1)?;
        let max_speed = ruleset.ufo(&ufo.rule).map_or(0.0, |r| r.max_speed);
        let entry = &mut ctx.campaign.ufos[index];
        entry.destination = destination;
        entry.speed = max_speed * speed_pct as f64 / 100.0;
        return Ok(());
    }

    // Landed.
    let in_spawn_zone = waypoint.zone == rule.spawn_zone;
    match rule.objective {
        MissionObjective::Site if in_spawn_zone => create_site(ctx, index, &mission, rule),
        MissionObjective::Base if in_spawn_zone && mission.alien_base.is_none() => {
            found_alien_base(ctx, &mission, rule, ufo.position)?;
            land(ctx, index, trajectory.ground_timer);
            Ok(())
        }
        _ => {
            land(ctx, index, trajectory.ground_timer);
            Ok(())
        }
    }
}

fn escape(ufo: &mut Ufo) {
    ufo.detected = false;
    ufo.set_status(UfoStatus::Destroyed);
}

fn land(ctx: &mut TickContext<'_>, index: usize, ground_timer: u32) {
    let ufo = &mut ctx.campaign.ufos[index];
    ufo.set_status(UfoStatus::Landed);
    ufo.altitude = Altitude::Ground;
    ufo.destination = ufo.position;
    ufo.seconds_remaining = ground_timer;
}

fn create_site(
    ctx: &mut TickContext<'_>,
    index: usize,
    mission: &AlienMission,
    rule: &AlienMissionRule,
) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    let context = format!("alien mission {}", rule.name);
    let deployment = rule
        .deployment
        .as_deref()
        .ok_or_else(|| ConfigError::MissingDeployment {
            mission: rule.name.clone(),
            what: "a mission site",
        })?;
    ruleset.require_deployment(&context, deployment)?;

    let ufo_id = ctx.campaign.ufos[index].id;
    let position = ctx.campaign.ufos[index].position;
    let hours = SITE_MIN_HOURS + ctx.rng.generate(0, SITE_EXTRA_HOURS as i32) as u32;
    let id = SiteId(ctx.campaign.next_id("MISSION_SITES"));
    ctx.campaign.mission_sites.push(MissionSite {
        id,
        mission_rule: rule.name.clone(),
        deployment: deployment.to_string(),
        position,
        race: mission.race.clone(),
        region: mission.region.clone(),
        seconds_remaining: hours * 3600,
        detected: true,
    });
    ctx.campaign
        .add_alien_activity(ruleset, position, rule.points);
    escape(&mut ctx.campaign.ufos[index]);

    // Crews that can fight follow the aliens to the ground.
    let followers: Vec<CraftId> = ctx
        .campaign
        .crafts()
        .filter(|c| c.destination == Some(Target::Ufo(ufo_id)))
        .map(|c| c.id)
        .collect();
    for craft_id in followers {
        let Some((bi, ci)) = ctx.campaign.craft_location(craft_id) else {
            continue;
        };
        if ctx.campaign.bases[bi].soldiers_aboard(craft_id) == 0 {
            continue;
        }
        let craft_rule = ctx.campaign.bases[bi].crafts[ci].rule.clone();
        if let Some(craft_rule) = ruleset.craft(&craft_rule) {
            ctx.campaign.bases[bi].crafts[ci].set_destination(Target::MissionSite(id), craft_rule);
        }
    }

    tracing::info!(
        target: "geoscape::missions",
        mission = %mission.id,
        site = %id,
        hours,
        "site.created"
    );
    ctx.popups.push(Popup::MissionSiteDetected { site: id });
    Ok(())
}

fn found_alien_base(
    ctx: &mut TickContext<'_>,
    mission: &AlienMission,
    rule: &AlienMissionRule,
    position: GeoPoint,
) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    let deployment = rule
        .deployment
        .as_deref()
        .ok_or_else(|| ConfigError::MissingDeployment {
            mission: rule.name.clone(),
            what: "an alien base",
        })?;
    ruleset
        .require_deployment(&format!("alien mission {}", rule.name), deployment)?;
    let id = AlienBaseId(ctx.campaign.next_id("ALIEN_BASES"));
    ctx.campaign.alien_bases.push(AlienBase {
        id,
        position,
        race: mission.race.clone(),
        region: mission.region.clone(),
        deployment: deployment.to_string(),
        discovered: false,
    });
    if let Some(entry) = ctx.campaign.mission_mut(mission.id) {
        entry.alien_base = Some(id);
    }
    ctx.campaign
        .add_alien_activity(ruleset, position, rule.points);
    tracing::info!(
        target: "geoscape::missions",
        mission = %mission.id,
        alien_base = %id,
        region = %mission.region,
        "alien_base.founded"
    );
    Ok(())
}

fn assault_base(ctx: &mut TickContext<'_>, index: usize) -> Result<(), ConfigError> {
    let ufo_id = ctx.campaign.ufos[index].id;
    let target = ctx.campaign.ufos[index].target_base;
    escape(&mut ctx.campaign.ufos[index]);
    let Some(base) = target.and_then(|id| ctx.campaign.base_mut(id)) else {
        return Ok(());
    };
    base.retaliation_target = false;
    let base_id = base.id;
    tracing::info!(target: "geoscape::missions", base = %base_id, ufo = %ufo_id, "base.defense");
    ctx.popups.push(Popup::BaseDefense {
        base: base_id,
        ufo: ufo_id,
    });
    Ok(())
}

/// A UFO's ground timer ran out (LANDED) or its wreck expired (CRASHED).
pub fn ufo_lifting(ctx: &mut TickContext<'_>, index: usize) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    let ufo = ctx.campaign.ufos[index].clone();
    match ufo.status {
        UfoStatus::Landed => {}
        UfoStatus::Crashed => {
            escape(&mut ctx.campaign.ufos[index]);
            return Ok(());
        }
        UfoStatus::Flying | UfoStatus::Destroyed => return Ok(()),
    }

    let Some(mission) = ctx.campaign.mission(ufo.mission).cloned() else {
        escape(&mut ctx.campaign.ufos[index]);
        return Ok(());
    };
    let rule = ruleset
        .require_alien_mission("active mission", &mission.rule)?;
    let trajectory = ruleset
        .require_trajectory(&format!("alien mission {}", rule.name), &ufo.trajectory)?;

    let next = ufo.trajectory_point + 1;
    let Some(waypoint) = trajectory.waypoints.get(next).copied() else {
        escape(&mut ctx.campaign.ufos[index]);
        return Ok(());
    };
    let destination = waypoint_position(ctx, &mission, rule, trajectory, next)?;
    let speed_pct = if waypoint.speed > 0 { waypoint.speed } else { 100 };
    let max_speed = ruleset.ufo(&ufo.rule).map_or(0.0, |r| r.max_speed);

    // Base missions score when the base is founded, not on every lift-off.
    if rule.objective != MissionObjective::Base && rule.points > 0 {
        ctx.campaign
            .add_alien_activity(ruleset, ufo.position, rule.points);
    }

    let entry = &mut ctx.campaign.ufos[index];
    entry.set_status(UfoStatus::Flying);
    entry.altitude = Altitude::VeryLow;
    entry.destination = destination;
    entry.speed = max_speed * speed_pct as f64 / 100.0;
    entry.seconds_remaining = 0;
    Ok(())
}

/// A UFO of this mission was brought down: push the next wave back.
pub fn ufo_shot_down(ctx: &mut TickContext<'_>, mission: MissionId) {
    let ruleset = ctx.ruleset;
    let Some(index) = ctx
        .campaign
        .alien_missions
        .iter()
        .position(|m| m.id == mission)
    else {
        return;
    };
    let Some(rule) = ruleset
        .alien_mission(&ctx.campaign.alien_missions[index].rule)
    else {
        return;
    };
    let next_wave = ctx.campaign.alien_missions[index].next_wave;
    if let Some(wave) = rule.waves.get(next_wave) {
        let delay = wave_countdown(wave.spawn_timer, ctx.rng);
        ctx.campaign.alien_missions[index].spawn_countdown += delay;
    }
}
