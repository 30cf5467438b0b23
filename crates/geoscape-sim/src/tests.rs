//! Tests for the geoscape engine: clock cascade, handlers, and commands.

use geoscape_core::commands::PlayerCommand;
use geoscape_core::components::{
    AlienBase, Base, MissionSite, Production, ResearchProject, Ufo, Waypoint,
};
use geoscape_core::constants::{
    ALIEN_BASE_DESTROYED_POINTS, DOGFIGHT_ROUND_FRAMES, DOGFIGHT_STANDOFF_DISTANCE,
    DOGFIGHT_ZOOM_IN_FRAMES, DOGFIGHT_ZOOM_OUT_FRAMES,
};
use geoscape_core::enums::{
    Altitude, CraftStatus, Difficulty, DogfightStance, ProductionProgress, TimeSpeed, UfoStatus,
    ZoomState,
};
use geoscape_core::error::ConfigError;
use geoscape_core::events::Popup;
use geoscape_core::ruleset::{MissionScript, MonthlyWeights, Ruleset, WeightedOptions};
use geoscape_core::types::*;

use crate::campaign::Campaign;
use crate::engine::{SimConfig, GeoscapeEngine};
use crate::scenario;
use crate::systems::{
    alien_missions, five_seconds, hourly, mission_scheduler, ten_minutes, thirty_minutes,
};

fn builtin() -> Ruleset {
    Ruleset::builtin().unwrap()
}

/// Equipped starting campaign with no missions scheduled.
fn quiet_engine() -> GeoscapeEngine {
    let ruleset = builtin();
    let campaign = scenario::new_campaign(&ruleset, Difficulty::Beginner).unwrap();
    GeoscapeEngine::with_campaign(SimConfig::default(), ruleset, campaign)
}

fn empty_engine() -> GeoscapeEngine {
    let ruleset = Ruleset::default();
    let campaign = Campaign::new(&ruleset, Difficulty::Beginner);
    GeoscapeEngine::with_campaign(SimConfig::default(), ruleset, campaign)
}

fn count_popups(engine: &GeoscapeEngine, matches: impl Fn(&Popup) -> bool) -> usize {
    engine.popups().iter().filter(|p| matches(p)).count()
}

/// Play `frames` frames at `speed`, closing every popup as it appears.
fn play(engine: &mut GeoscapeEngine, speed: TimeSpeed, frames: usize) -> Vec<String> {
    engine.queue_command(PlayerCommand::SetTimeSpeed { speed });
    let mut snapshots = Vec::with_capacity(frames);
    for _ in 0..frames {
        if !engine.popups().is_empty() {
            engine.queue_command(PlayerCommand::DismissPopup);
        }
        if engine.campaign().pending_battle.is_some() {
            engine.queue_command(PlayerCommand::BattleOutcome { victory: false });
        }
        let snap = engine.frame().unwrap();
        snapshots.push(serde_json::to_string(&snap).unwrap());
    }
    snapshots
}

// ---- Determinism ----

#[test]
fn test_determinism_same_seed() {
    let config = SimConfig {
        seed: 12345,
        ..Default::default()
    };
    let mut engine_a = GeoscapeEngine::new_game(config.clone(), builtin()).unwrap();
    let mut engine_b = GeoscapeEngine::new_game(config, builtin()).unwrap();

    let snaps_a = play(&mut engine_a, TimeSpeed::OneHour, 300);
    let snaps_b = play(&mut engine_b, TimeSpeed::OneHour, 300);
    for (a, b) in snaps_a.iter().zip(&snaps_b) {
        assert_eq!(a, b, "Snapshots diverged with same seed");
    }
    assert_eq!(engine_a.campaign(), engine_b.campaign());
}

#[test]
fn test_new_game_schedules_first_month() {
    let engine = GeoscapeEngine::new_game(SimConfig::default(), builtin()).unwrap();
    assert!(
        !engine.campaign().alien_missions.is_empty(),
        "Month 0 scripts should start at least one mission"
    );
    assert_eq!(engine.campaign().months_passed, 0);
}

// ---- Clock ----

#[test]
fn test_tick_advances_five_seconds() {
    let mut engine = empty_engine();
    let before = engine.campaign().time;
    let trigger = engine.tick().unwrap();
    assert_eq!(trigger, TimeTrigger::FiveSeconds);
    let after = engine.campaign().time;
    assert_eq!(after.second, (before.second + 5) % 60);
    assert_eq!(engine.counts().five_seconds, 1);
}

#[test]
fn test_day_boundary_runs_every_finer_handler() {
    let mut engine = empty_engine();
    engine.campaign_mut().time = GameTime::new(1999, 3, 4, 23, 59, 55);
    let trigger = engine.tick().unwrap();
    assert_eq!(trigger, TimeTrigger::Day);

    let counts = engine.counts();
    assert_eq!(counts.daily, 1);
    assert_eq!(counts.hourly, 1);
    assert_eq!(counts.thirty_minutes, 1);
    assert_eq!(counts.ten_minutes, 1);
    assert_eq!(counts.five_seconds, 1);
    assert_eq!(counts.monthly, 0);
}

#[test]
fn test_speed_sets_ticks_per_frame() {
    let mut engine = empty_engine();
    engine.queue_command(PlayerCommand::SetTimeSpeed {
        speed: TimeSpeed::OneMinute,
    });
    engine.frame().unwrap();
    assert_eq!(engine.counts().five_seconds, 12);
    assert_eq!(engine.speed(), TimeSpeed::OneMinute);
}

#[test]
fn test_pause_holds_clock() {
    let mut engine = empty_engine();
    let before = engine.campaign().time;
    engine.queue_command(PlayerCommand::Pause);
    let snap = engine.frame().unwrap();
    assert!(snap.paused);
    assert_eq!(engine.campaign().time, before);

    engine.queue_command(PlayerCommand::Resume);
    engine.frame().unwrap();
    assert_ne!(engine.campaign().time, before);
}

#[test]
fn test_popup_stops_time_advance() {
    let mut engine = empty_engine();
    // Day 10 autosave fires on the second tick of this frame.
    engine.campaign_mut().time = GameTime::new(1999, 3, 9, 23, 59, 50);
    engine.queue_command(PlayerCommand::SetTimeSpeed {
        speed: TimeSpeed::OneHour,
    });
    engine.frame().unwrap();

    assert_eq!(engine.counts().five_seconds, 2);
    assert!(engine.is_paused());
    assert_eq!(engine.speed(), TimeSpeed::FiveSeconds);

    // Held until the popup is closed.
    engine.frame().unwrap();
    assert_eq!(engine.counts().five_seconds, 2);
    engine.queue_command(PlayerCommand::DismissPopup);
    engine.frame().unwrap();
    assert_eq!(engine.counts().five_seconds, 3);
}

#[test]
fn test_closed_popup_leaves_no_pause_behind() {
    let mut engine = empty_engine();
    engine.campaign_mut().time = GameTime::new(1999, 3, 1, 12, 0, 0);
    // Raised outside a tick, as a command handler would.
    engine.context().popups.push(Popup::Autosave);
    engine.queue_commands([
        PlayerCommand::DismissPopup,
        PlayerCommand::SetTimeSpeed {
            speed: TimeSpeed::OneHour,
        },
    ]);
    engine.frame().unwrap();
    assert_eq!(engine.counts().five_seconds, 720);
    assert_eq!(engine.speed(), TimeSpeed::OneHour);
}

// ---- Daily ----

#[test]
fn test_autosave_only_on_save_days() {
    let mut engine = empty_engine();
    engine.campaign_mut().time = GameTime::new(1999, 3, 9, 23, 59, 55);
    engine.tick().unwrap();
    assert_eq!(count_popups(&engine, |p| matches!(p, Popup::Autosave)), 1);

    let mut engine = empty_engine();
    engine.campaign_mut().time = GameTime::new(1999, 3, 10, 23, 59, 55);
    engine.tick().unwrap();
    assert_eq!(count_popups(&engine, |p| matches!(p, Popup::Autosave)), 0);
}

#[test]
fn test_ironman_never_autosaves() {
    let mut engine = empty_engine();
    engine.campaign_mut().ironman = true;
    engine.campaign_mut().time = GameTime::new(1999, 3, 19, 23, 59, 55);
    engine.tick().unwrap();
    assert_eq!(count_popups(&engine, |p| matches!(p, Popup::Autosave)), 0);
}

#[test]
fn test_research_completion_clears_every_base() {
    let mut engine = quiet_engine();
    let campaign = engine.campaign_mut();
    let second = BaseId(campaign.next_id("BASES"));
    campaign
        .bases
        .push(Base::new(second, "Annex", GeoPoint::from_degrees(10.0, 50.0)));

    let topic = "STR_SECTOID_ENGINEER";
    campaign.bases[0].research.push(ResearchProject {
        name: topic.to_string(),
        spent: 130,
        cost: 140,
        scientists: 10,
    });
    for name in [topic, "STR_ALIEN_ORIGINS", "STR_UFO_NAVIGATION"] {
        campaign.bases[1].research.push(ResearchProject {
            name: name.to_string(),
            spent: 0,
            cost: 1000,
            scientists: 1,
        });
    }
    campaign.time = GameTime::new(1999, 3, 4, 23, 59, 55);
    engine.tick().unwrap();

    let campaign = engine.campaign();
    assert!(campaign.is_researched(topic));
    assert!(campaign.bases[0].research.is_empty());
    // One of the two free topics went with it.
    assert_eq!(campaign.bases[1].research.len(), 1);
    let left = &campaign.bases[1].research[0].name;
    assert!(!campaign.is_researched(left));
    assert_eq!(campaign.bases[0].item_count("STR_SECTOID_CORPSE"), 1);

    let bonus = engine.popups().iter().find_map(|p| match p {
        Popup::ResearchComplete { topic: t, bonus } if t == topic => Some(bonus.clone()),
        _ => None,
    });
    let bonus = bonus.expect("research popup").expect("bonus topic");
    assert!(campaign.is_researched(&bonus));
    assert_ne!(&bonus, left);
}

// ---- Ten minutes ----

#[test]
fn test_low_fuel_warns_once() {
    let mut engine = quiet_engine();
    let campaign = engine.campaign_mut();
    let far = GeoPoint::from_degrees(100.0, -30.0);
    let waypoint = WaypointId(campaign.next_id("WAYPOINTS"));
    campaign.waypoints.push(Waypoint {
        id: waypoint,
        position: GeoPoint::from_degrees(120.0, -35.0),
    });
    let craft_id = campaign.bases[0].crafts[0].id;
    engine.queue_command(PlayerCommand::SendCraft {
        craft: craft_id,
        target: Target::Waypoint(waypoint),
    });
    engine.frame().unwrap();

    {
        let craft = engine.campaign_mut().craft_mut(craft_id).unwrap();
        assert_eq!(craft.status, CraftStatus::Out);
        craft.position = far;
        craft.fuel = 5;
    }

    // Three 10-minute boundaries.
    for _ in 0..(3 * 120) {
        engine.tick().unwrap();
    }
    assert_eq!(
        count_popups(&engine, |p| matches!(p, Popup::LowFuel { craft } if *craft == craft_id)),
        1
    );
    let craft = engine.campaign().craft(craft_id).unwrap();
    assert!(craft.low_fuel);
    assert_eq!(craft.destination, Some(Target::Base(craft.base)));
}

#[test]
fn test_low_fuel_craft_refuses_new_orders() {
    let mut engine = quiet_engine();
    let craft_id = engine.campaign().bases[0].crafts[0].id;
    let base_id = engine.campaign().bases[0].id;
    {
        let craft = engine.campaign_mut().craft_mut(craft_id).unwrap();
        craft.status = CraftStatus::Out;
        craft.low_fuel = true;
        craft.destination = Some(Target::Base(base_id));
    }
    let waypoint = WaypointId(engine.campaign_mut().next_id("WAYPOINTS"));
    engine.campaign_mut().waypoints.push(Waypoint {
        id: waypoint,
        position: GeoPoint::from_degrees(0.0, 0.0),
    });
    engine.queue_command(PlayerCommand::SendCraft {
        craft: craft_id,
        target: Target::Waypoint(waypoint),
    });
    engine.queue_command(PlayerCommand::Pause);
    engine.frame().unwrap();
    assert_eq!(
        engine.campaign().craft(craft_id).unwrap().destination,
        Some(Target::Base(base_id))
    );
}

#[test]
fn test_low_fuel_at_exact_limit() {
    let mut engine = quiet_engine();
    let home = engine.campaign().bases[0].position;
    let ids: Vec<CraftId> = engine.campaign().bases[0].crafts[..2]
        .iter()
        .map(|c| c.id)
        .collect();
    for (slack, &id) in [0, 1].into_iter().zip(&ids) {
        let craft = engine.campaign_mut().craft_mut(id).unwrap();
        craft.status = CraftStatus::Out;
        craft.speed = 2100.0;
        craft.position = GeoPoint::from_degrees(-60.0, 20.0);
        craft.fuel = craft.fuel_limit(home) + craft.fuel_consumption() + slack;
    }
    ten_minutes::run(&mut engine.context()).unwrap();
    assert!(engine.campaign().craft(ids[0]).unwrap().low_fuel);
    assert!(!engine.campaign().craft(ids[1]).unwrap().low_fuel);
    assert_eq!(count_popups(&engine, |p| matches!(p, Popup::LowFuel { .. })), 1);
}

fn retaliation_ufo(engine: &mut GeoscapeEngine, status: UfoStatus) -> UfoId {
    let mission = alien_missions::start_mission(
        &mut engine.context(),
        "STR_ALIEN_RETALIATION",
        "STR_NORTH_AMERICA",
        "STR_SECTOID",
        10_000,
    )
    .unwrap();
    let campaign = engine.campaign_mut();
    let base = campaign.bases[0].position;
    let position = GeoPoint::new(base.lon + 0.0002, base.lat);
    let id = UfoId(campaign.next_id("UFOS"));
    campaign.ufos.push(Ufo {
        id,
        rule: "STR_LARGE_SCOUT".to_string(),
        position,
        destination: position,
        speed: 0.0,
        status,
        altitude: Altitude::Ground,
        detected: false,
        hyper_detected: false,
        seconds_remaining: 3600,
        trajectory: "P9".to_string(),
        trajectory_point: 3,
        mission,
        damage: 0,
        target_base: None,
    });
    id
}

#[test]
fn test_landed_ufo_can_spot_base() {
    let mut engine = quiet_engine();
    retaliation_ufo(&mut engine, UfoStatus::Landed);
    for _ in 0..300 {
        ten_minutes::run(&mut engine.context()).unwrap();
        if engine.campaign().bases[0].retaliation_target {
            break;
        }
    }
    assert!(engine.campaign().bases[0].retaliation_target);
}

#[test]
fn test_crashed_ufo_never_spots_base() {
    let mut engine = quiet_engine();
    retaliation_ufo(&mut engine, UfoStatus::Crashed);
    for _ in 0..300 {
        ten_minutes::run(&mut engine.context()).unwrap();
    }
    assert!(!engine.campaign().bases[0].retaliation_target);
}

// ---- Five seconds ----

#[test]
fn test_five_second_handler_is_idle_on_empty_campaign() {
    let mut engine = empty_engine();
    let before = engine.campaign().clone();
    five_seconds::run(&mut engine.context()).unwrap();
    five_seconds::run(&mut engine.context()).unwrap();
    assert_eq!(engine.campaign(), &before);
    assert!(engine.popups().is_empty());
}

#[test]
fn test_unfollowed_waypoints_are_collected() {
    let mut engine = empty_engine();
    let id = WaypointId(engine.campaign_mut().next_id("WAYPOINTS"));
    engine.campaign_mut().waypoints.push(Waypoint {
        id,
        position: GeoPoint::from_degrees(0.0, 0.0),
    });
    engine.tick().unwrap();
    assert!(engine.campaign().waypoints.is_empty());
}

#[test]
fn test_empty_craft_holds_over_landed_ufo() {
    let mut engine = quiet_engine();
    let ufo = retaliation_ufo(&mut engine, UfoStatus::Landed);
    let position = engine.campaign().ufo(ufo).unwrap().position;
    engine.campaign_mut().ufo_mut(ufo).unwrap().detected = true;
    let craft = engine.campaign().bases[0].crafts[0].id;
    let base = engine.campaign().bases[0].id;
    let interceptor = engine.campaign_mut().craft_mut(craft).unwrap();
    interceptor.status = CraftStatus::Out;
    interceptor.speed = 2100.0;
    interceptor.position = position;
    interceptor.destination = Some(Target::Ufo(ufo));

    for _ in 0..3 {
        five_seconds::run(&mut engine.context()).unwrap();
    }
    let interceptor = engine.campaign().craft(craft).unwrap();
    assert_eq!(interceptor.destination, Some(Target::Ufo(ufo)));
    assert!(!interceptor.landing_pending);
    assert!(engine.popups().is_empty());

    // A wreck is not worth waiting over.
    engine.campaign_mut().ufo_mut(ufo).unwrap().status = UfoStatus::Crashed;
    five_seconds::run(&mut engine.context()).unwrap();
    assert_eq!(
        engine.campaign().craft(craft).unwrap().destination,
        Some(Target::Base(base))
    );
}

// ---- Mission scheduling ----

#[test]
fn test_duplicate_label_spawns_nothing() {
    let mut ruleset = Ruleset::default();
    for name in ["first", "second"] {
        ruleset.mission_scripts.push(MissionScript {
            name: name.to_string(),
            label: 3,
            ..Default::default()
        });
    }
    let campaign = Campaign::new(&ruleset, Difficulty::Beginner);
    let mut engine = GeoscapeEngine::with_campaign(SimConfig::default(), ruleset, campaign);

    let result = mission_scheduler::determine_alien_missions(&mut engine.context());
    assert!(matches!(result, Err(ConfigError::DuplicateLabel { label: 3, .. })));
    assert!(engine.campaign().alien_missions.is_empty());
}

fn weights(name: &str) -> MonthlyWeights {
    MonthlyWeights::new([(0, WeightedOptions::from_pairs([(name, 100)]))])
}

/// Research mission in Europe, counted under its own name.
fn research_script(name: &str) -> MissionScript {
    MissionScript {
        name: name.to_string(),
        var_name: Some(name.to_string()),
        region_weights: weights("STR_EUROPE"),
        mission_weights: weights("STR_ALIEN_RESEARCH"),
        race_weights: weights("STR_SECTOID"),
        use_table: false,
        ..Default::default()
    }
}

fn scripted_engine(scripts: Vec<MissionScript>) -> GeoscapeEngine {
    let mut ruleset = builtin();
    ruleset.mission_scripts = scripts;
    ruleset.finalize().unwrap();
    let campaign = scenario::new_campaign(&ruleset, Difficulty::Beginner).unwrap();
    GeoscapeEngine::with_campaign(SimConfig::default(), ruleset, campaign)
}

#[test]
fn test_conditionals_follow_labelled_outcomes() {
    let conditional = |name: &str, conditionals: Vec<i32>| MissionScript {
        conditionals,
        ..research_script(name)
    };
    let scripts = vec![
        MissionScript {
            label: 1,
            ..research_script("ran")
        },
        MissionScript {
            label: 2,
            execution_odds: 0,
            ..research_script("skipped")
        },
        conditional("after_ran", vec![1]),
        conditional("after_skipped", vec![-2]),
        conditional("unless_ran", vec![-1]),
        conditional("unless_skipped", vec![2]),
        conditional("unknown_label", vec![9]),
    ];
    let mut engine = scripted_engine(scripts);

    let started = mission_scheduler::determine_alien_missions(&mut engine.context()).unwrap();
    assert_eq!(started, 4);
    let strategy = &engine.campaign().alien_strategy;
    for (name, runs) in [
        ("ran", 1),
        ("skipped", 0),
        ("after_ran", 1),
        ("after_skipped", 1),
        ("unless_ran", 0),
        ("unless_skipped", 0),
        ("unknown_label", 1),
    ] {
        assert_eq!(strategy.missions_run(name), runs, "{name}");
    }
}

#[test]
fn test_site_script_avoids_recent_areas() {
    let script = MissionScript {
        name: "terror".to_string(),
        var_name: Some("terror".to_string()),
        avoid_repeats: 3,
        region_weights: weights("STR_ASIA"),
        mission_weights: weights("STR_ALIEN_TERROR"),
        race_weights: weights("STR_SECTOID"),
        use_table: false,
        ..Default::default()
    };
    let mut engine = scripted_engine(vec![script]);
    let script = engine.ruleset().mission_scripts[0].clone();
    assert!(script.site_type);

    for _ in 0..3 {
        assert!(mission_scheduler::process_script(&mut engine.context(), &script).unwrap());
    }
    let mut areas: Vec<usize> = engine
        .campaign()
        .alien_missions
        .iter()
        .map(|m| {
            assert_eq!(m.region, "STR_ASIA");
            m.site_zone.unwrap()
        })
        .collect();
    areas.sort_unstable();
    assert_eq!(areas, vec![0, 1, 2]);

    // Every Asian city was used within the window.
    assert!(!mission_scheduler::process_script(&mut engine.context(), &script).unwrap());
}

#[test]
fn test_base_targeting_picks_a_free_base_region() {
    let script = MissionScript {
        target_base_odds: 100,
        ..research_script("hunt")
    };
    let mut engine = scripted_engine(vec![script.clone()]);

    assert!(mission_scheduler::process_script(&mut engine.context(), &script).unwrap());
    assert_eq!(engine.campaign().alien_missions[0].region, "STR_NORTH_AMERICA");

    // The only base region is already busy with this mission type.
    assert!(!mission_scheduler::process_script(&mut engine.context(), &script).unwrap());
    assert_eq!(engine.campaign().alien_missions.len(), 1);
}

#[test]
fn test_undefined_script_references_are_fatal() {
    let cases = [
        (
            MissionScript {
                region_weights: weights("STR_ATLANTIS"),
                ..research_script("bad_region")
            },
            "region",
        ),
        (
            MissionScript {
                mission_weights: weights("STR_ALIEN_PICNIC"),
                ..research_script("bad_mission")
            },
            "alien mission",
        ),
        (
            MissionScript {
                race_weights: weights("STR_GREYS"),
                ..research_script("bad_race")
            },
            "race",
        ),
    ];
    for (script, expected) in cases {
        let mut engine = scripted_engine(vec![script]);
        let result = mission_scheduler::determine_alien_missions(&mut engine.context());
        match result {
            Err(ConfigError::Undefined { kind, .. }) => assert_eq!(kind, expected),
            other => panic!("expected an undefined {expected}, got {other:?}"),
        }
        assert!(engine.campaign().alien_missions.is_empty());
    }
}

// ---- Dogfights ----

/// Interceptor 0 alongside a flying UFO, the fight queued.
fn dogfight_engine() -> (GeoscapeEngine, CraftId, UfoId) {
    let mut engine = quiet_engine();
    let ufo = retaliation_ufo(&mut engine, UfoStatus::Flying);
    let position = {
        let target = engine.campaign_mut().ufo_mut(ufo).unwrap();
        target.altitude = Altitude::Low;
        // Parked: never reaches its next waypoint.
        target.destination = GeoPoint::from_degrees(0.0, 0.0);
        target.position
    };
    let craft = engine.campaign().bases[0].crafts[0].id;
    let interceptor = engine.campaign_mut().craft_mut(craft).unwrap();
    interceptor.status = CraftStatus::Out;
    interceptor.position = position;
    interceptor.destination = Some(Target::Ufo(ufo));
    interceptor.in_dogfight = true;
    assert!(engine.context().dogfights.queue(craft, ufo));
    (engine, craft, ufo)
}

fn open_fights(engine: &mut GeoscapeEngine) {
    for _ in 0..DOGFIGHT_ZOOM_IN_FRAMES {
        engine.frame().unwrap();
    }
}

fn play_rounds(engine: &mut GeoscapeEngine, rounds: u32) {
    for _ in 0..rounds * DOGFIGHT_ROUND_FRAMES {
        engine.frame().unwrap();
    }
}

#[test]
fn test_queued_fights_open_together_after_zoom() {
    let (mut engine, first, ufo) = dogfight_engine();
    let second = engine.campaign().bases[0].crafts[1].id;
    engine.campaign_mut().craft_mut(second).unwrap().status = CraftStatus::Out;
    assert!(engine.context().dogfights.queue(second, ufo));
    let before = engine.campaign().time;

    for _ in 1..DOGFIGHT_ZOOM_IN_FRAMES {
        engine.frame().unwrap();
    }
    assert!(engine.dogfights().active().is_empty());
    assert!(engine.is_paused());

    engine.frame().unwrap();
    let slots: Vec<(u8, CraftId)> = engine
        .dogfights()
        .active()
        .iter()
        .map(|d| (d.slot, d.craft))
        .collect();
    assert_eq!(slots, vec![(1, first), (2, second)]);
    assert_eq!(engine.campaign().time, before);
}

#[test]
fn test_standoff_fight_holds_fire() {
    let (mut engine, craft, ufo) = dogfight_engine();
    let ammo = |engine: &GeoscapeEngine| -> Vec<u32> {
        let craft = engine.campaign().craft(craft).unwrap();
        craft.weapons.iter().map(|w| w.ammo).collect()
    };
    let loaded = ammo(&engine);
    open_fights(&mut engine);
    play_rounds(&mut engine, 5);

    let fight = &engine.dogfights().active()[0];
    assert_eq!(fight.stance, DogfightStance::Standoff);
    assert_eq!(fight.distance, DOGFIGHT_STANDOFF_DISTANCE);
    assert_eq!(ammo(&engine), loaded);
    assert_eq!(engine.campaign().ufo(ufo).unwrap().damage, 0);
}

#[test]
fn test_aggressive_stance_closes_and_fires() {
    let (mut engine, craft, _) = dogfight_engine();
    open_fights(&mut engine);
    engine.queue_command(PlayerCommand::SetDogfightStance {
        slot: 1,
        stance: DogfightStance::Aggressive,
    });
    play_rounds(&mut engine, 12);
    // The stingray is in range from the tenth round.
    let interceptor = engine.campaign().craft(craft).unwrap();
    assert!(interceptor.weapons[0].ammo < 6);
}

#[test]
fn test_disengaged_craft_breaks_off_and_clock_resumes() {
    let (mut engine, craft, _) = dogfight_engine();
    let before = engine.campaign().time;
    open_fights(&mut engine);
    play_rounds(&mut engine, 2);
    engine.queue_command(PlayerCommand::Disengage { slot: 1 });
    play_rounds(&mut engine, 2);

    assert!(engine.dogfights().active().is_empty());
    assert!(matches!(engine.dogfights().zoom(), ZoomState::ZoomingOut { .. }));
    assert_eq!(engine.campaign().time, before);
    let interceptor = engine.campaign().craft(craft).unwrap();
    assert!(!interceptor.in_dogfight);
    assert_eq!(interceptor.destination, Some(Target::Base(interceptor.base)));

    for _ in 0..DOGFIGHT_ZOOM_OUT_FRAMES {
        engine.frame().unwrap();
    }
    assert_eq!(engine.dogfights().zoom(), ZoomState::Idle);
    assert_ne!(engine.campaign().time, before);
}

#[test]
fn test_minimized_fight_disengages_at_next_round() {
    let (mut engine, craft, _) = dogfight_engine();
    open_fights(&mut engine);
    engine.queue_commands([
        PlayerCommand::MinimizeDogfight { slot: 1 },
        PlayerCommand::Disengage { slot: 1 },
    ]);
    play_rounds(&mut engine, 1);
    assert!(engine.dogfights().active().is_empty());
    assert!(!engine.campaign().craft(craft).unwrap().in_dogfight);
}

// ---- Thirty minutes ----

#[test]
fn test_lost_ufo_alerts_only_when_followed() {
    let mut engine = quiet_engine();
    let ufo = retaliation_ufo(&mut engine, UfoStatus::Flying);
    let far = GeoPoint::from_degrees(100.0, 40.0);
    let hide = |engine: &mut GeoscapeEngine| {
        let tracked = engine.campaign_mut().ufo_mut(ufo).unwrap();
        tracked.position = far;
        tracked.destination = far;
        tracked.detected = true;
    };
    let lost = |engine: &GeoscapeEngine| count_popups(engine, |p| matches!(p, Popup::UfoLost { .. }));

    hide(&mut engine);
    thirty_minutes::run(&mut engine.context()).unwrap();
    assert!(!engine.campaign().ufo(ufo).unwrap().detected);
    assert_eq!(lost(&engine), 0);

    hide(&mut engine);
    let craft = engine.campaign().bases[0].crafts[0].id;
    engine.campaign_mut().craft_mut(craft).unwrap().destination = Some(Target::Ufo(ufo));
    thirty_minutes::run(&mut engine.context()).unwrap();
    assert_eq!(lost(&engine), 1);
}

fn north_american_alien_points(engine: &GeoscapeEngine) -> i32 {
    engine
        .campaign()
        .region_state("STR_NORTH_AMERICA")
        .unwrap()
        .activity
        .current_alien()
}

#[test]
fn test_expired_site_waits_for_inbound_craft() {
    let (mut engine, craft, site) = site_engine();
    engine.campaign_mut().mission_sites[0].seconds_remaining = 0;
    let start = north_american_alien_points(&engine);

    thirty_minutes::run(&mut engine.context()).unwrap();
    assert!(engine.campaign().site(site).is_some());
    assert_eq!(north_american_alien_points(&engine), start + 10);

    engine.campaign_mut().craft_mut(craft).unwrap().destination = None;
    thirty_minutes::run(&mut engine.context()).unwrap();
    assert!(engine.campaign().site(site).is_none());
    assert_eq!(north_american_alien_points(&engine), start + 10 + 200);
}

// ---- Hourly ----

fn production(rule: &str, amount_total: u32, engineers: u32) -> Production {
    Production {
        rule: rule.to_string(),
        amount_total,
        amount_produced: 0,
        time_spent: 0,
        engineers,
    }
}

#[test]
fn test_finished_and_stalled_lines_close_together() {
    let mut engine = quiet_engine();
    {
        let campaign = engine.campaign_mut();
        campaign.funds = 8_000 + 5_000;
        campaign.bases[0].productions = vec![
            production("STR_LASER_PISTOL", 1, 300),
            production("STR_MOTION_SCANNER", 2, 1),
            production("STR_STINGRAY_MISSILES", 5, 100),
        ];
    }
    let pistols = engine.campaign().bases[0].item_count("STR_LASER_PISTOL");

    hourly::run(&mut engine.context());

    let base = &engine.campaign().bases[0];
    let remaining: Vec<&str> = base.productions.iter().map(|p| p.rule.as_str()).collect();
    assert_eq!(remaining, vec!["STR_MOTION_SCANNER"]);
    assert_eq!(base.item_count("STR_LASER_PISTOL"), pistols + 1);
    assert_eq!(engine.campaign().funds, 5_000);
    let finished = |project: &str, progress: ProductionProgress| {
        count_popups(&engine, |p| {
            matches!(p, Popup::ProductionFinished { project: name, progress: got, .. }
                if name == project && *got == progress)
        })
    };
    assert_eq!(finished("STR_LASER_PISTOL", ProductionProgress::Complete), 1);
    assert_eq!(finished("STR_STINGRAY_MISSILES", ProductionProgress::NotEnoughMoney), 1);
}

// ---- Landings ----

fn site_engine() -> (GeoscapeEngine, CraftId, SiteId) {
    let mut engine = quiet_engine();
    let campaign = engine.campaign_mut();
    let site = SiteId(campaign.next_id("SITES"));
    let position = GeoPoint::from_degrees(-90.0, 35.0);
    campaign.mission_sites.push(MissionSite {
        id: site,
        mission_rule: "STR_ALIEN_TERROR".to_string(),
        deployment: "STR_TERROR_MISSION".to_string(),
        position,
        race: "STR_SECTOID".to_string(),
        region: "STR_NORTH_AMERICA".to_string(),
        seconds_remaining: 3600 * 10,
        detected: true,
    });
    let craft = campaign.bases[0].crafts[2].id;
    let transport = campaign.craft_mut(craft).unwrap();
    transport.status = CraftStatus::Out;
    transport.position = position;
    transport.destination = Some(Target::MissionSite(site));
    transport.landing_pending = true;
    (engine, craft, site)
}

#[test]
fn test_accepted_landing_waits_for_battle() {
    let (mut engine, craft, site) = site_engine();
    engine.queue_command(PlayerCommand::ConfirmLanding {
        craft,
        accept: true,
    });
    engine.frame().unwrap();
    assert!(engine.is_paused());
    assert_eq!(
        engine.campaign().pending_battle.map(|b| b.target),
        Some(Target::MissionSite(site))
    );

    engine.queue_command(PlayerCommand::BattleOutcome { victory: true });
    engine.frame().unwrap();
    let campaign = engine.campaign();
    assert!(campaign.pending_battle.is_none());
    assert!(campaign.site(site).is_none());
    let transport = campaign.craft(craft).unwrap();
    assert_eq!(transport.destination, Some(Target::Base(transport.base)));
    assert_eq!(campaign.bases[0].soldiers_aboard(craft), 8);
}

#[test]
fn test_lost_battle_loses_soldiers_aboard() {
    let (mut engine, craft, site) = site_engine();
    engine.queue_command(PlayerCommand::ConfirmLanding {
        craft,
        accept: true,
    });
    engine.queue_command(PlayerCommand::BattleOutcome { victory: false });
    engine.frame().unwrap();
    let campaign = engine.campaign();
    assert!(campaign.site(site).is_some());
    assert_eq!(campaign.bases[0].soldiers_aboard(craft), 0);
}

#[test]
fn test_declined_landing_returns_home() {
    let (mut engine, craft, _) = site_engine();
    engine.queue_command(PlayerCommand::ConfirmLanding {
        craft,
        accept: false,
    });
    engine.frame().unwrap();
    let transport = engine.campaign().craft(craft).unwrap();
    assert!(!transport.landing_pending);
    assert_eq!(transport.destination, Some(Target::Base(transport.base)));
    assert!(engine.campaign().pending_battle.is_none());
}

#[test]
fn test_destroyed_alien_base_credits_region() {
    let mut engine = quiet_engine();
    let campaign = engine.campaign_mut();
    let alien_base = AlienBaseId(campaign.next_id("ALIEN_BASES"));
    let position = GeoPoint::from_degrees(-100.0, 45.0);
    campaign.alien_bases.push(AlienBase {
        id: alien_base,
        position,
        race: "STR_SECTOID".to_string(),
        region: "STR_NORTH_AMERICA".to_string(),
        deployment: "STR_ALIEN_BASE_ASSAULT".to_string(),
        discovered: true,
    });
    let craft = campaign.bases[0].crafts[2].id;
    let transport = campaign.craft_mut(craft).unwrap();
    transport.status = CraftStatus::Out;
    transport.position = position;
    transport.destination = Some(Target::AlienBase(alien_base));
    transport.landing_pending = true;

    engine.queue_commands([
        PlayerCommand::ConfirmLanding {
            craft,
            accept: true,
        },
        PlayerCommand::BattleOutcome { victory: true },
    ]);
    engine.frame().unwrap();

    let campaign = engine.campaign();
    assert!(campaign.alien_base(alien_base).is_none());
    let region = campaign.region_state("STR_NORTH_AMERICA").unwrap();
    assert_eq!(region.activity.current_xcom(), ALIEN_BASE_DESTROYED_POINTS);
}

// ---- Persistence ----

#[test]
fn test_resume_from_save_clears_transient_flags() {
    let mut engine = GeoscapeEngine::new_game(SimConfig::default(), builtin()).unwrap();
    play(&mut engine, TimeSpeed::OneHour, 50);
    engine.campaign_mut().bases[0].crafts[0].in_dogfight = true;

    let save = engine.save_data("slot");
    assert_eq!(save.slot_name, "slot");
    let restored = GeoscapeEngine::from_save(save, builtin(), Default::default());
    assert_eq!(restored.campaign().time, engine.campaign().time);
    assert_eq!(restored.campaign().alien_missions, engine.campaign().alien_missions);
    assert!(!restored.campaign().bases[0].crafts[0].in_dogfight);
}
