//! geoscape-headless: run a campaign unattended and print the final snapshot.
//!
//! Usage:
//!   geoscape-headless --days 90 --seed 7
//!   geoscape-headless --ruleset mod.json --days 30 --save-dir saves/

use std::path::PathBuf;
use std::process;

use geoscape_core::commands::PlayerCommand;
use geoscape_core::enums::{DogfightStance, TimeSpeed};
use geoscape_core::events::Popup;
use geoscape_core::ruleset::Ruleset;
use geoscape_sim::engine::SimConfig;
use geoscape_sim::persistence;
use geoscape_sim::GeoscapeEngine;

struct Args {
    ruleset: Option<PathBuf>,
    seed: u64,
    days: u64,
    save_dir: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = match parse_args(std::env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            print_usage();
            process::exit(1);
        }
    };

    let ruleset = match &args.ruleset {
        Some(path) => Ruleset::from_file(path),
        None => Ruleset::builtin(),
    };
    let ruleset = ruleset.unwrap_or_else(|e| {
        eprintln!("Failed to load ruleset: {e}");
        process::exit(1);
    });

    let config = SimConfig {
        seed: args.seed,
        ..Default::default()
    };
    let mut engine = GeoscapeEngine::new_game(config, ruleset).unwrap_or_else(|e| {
        eprintln!("Failed to start campaign: {e}");
        process::exit(1);
    });

    while engine.counts().daily < args.days {
        if engine.speed() != TimeSpeed::OneDay {
            engine.queue_command(PlayerCommand::SetTimeSpeed {
                speed: TimeSpeed::OneDay,
            });
        }
        let autosave = matches!(engine.popups().active(), Some(Popup::Autosave));
        if autosave {
            if let Some(dir) = &args.save_dir {
                let data = engine.save_data("autosave");
                if let Err(e) = persistence::save_to_file(dir, "autosave", &data) {
                    tracing::warn!(target: "geoscape::persistence", error = %e, "autosave.failed");
                }
            }
        }
        // Landing prompts are declined by closing them.
        if !engine.popups().is_empty() {
            engine.queue_command(PlayerCommand::DismissPopup);
        }
        if engine.campaign().pending_battle.is_some() {
            engine.queue_command(PlayerCommand::BattleOutcome { victory: false });
        }
        // Fights open at standoff; close in to the shortest weapon range.
        for view in engine.dogfights().views() {
            if view.stance == DogfightStance::Standoff {
                engine.queue_command(PlayerCommand::SetDogfightStance {
                    slot: view.slot,
                    stance: DogfightStance::Standard,
                });
            }
        }
        if let Err(e) = engine.frame() {
            eprintln!("Campaign halted: {e}");
            process::exit(2);
        }
    }

    let snapshot = engine.snapshot();
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to encode snapshot: {e}");
            process::exit(1);
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    let mut parsed = Args {
        ruleset: None,
        seed: 42,
        days: 30,
        save_dir: None,
    };
    let mut iter = args.into_iter();
    while let Some(flag) = iter.next() {
        let mut value = || iter.next().ok_or_else(|| format!("Missing value for {flag}"));
        match flag.as_str() {
            "--ruleset" => parsed.ruleset = Some(PathBuf::from(value()?)),
            "--seed" => parsed.seed = value()?.parse().map_err(|e| format!("Bad --seed: {e}"))?,
            "--days" => parsed.days = value()?.parse().map_err(|e| format!("Bad --days: {e}"))?,
            "--save-dir" => parsed.save_dir = Some(PathBuf::from(value()?)),
            "help" | "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }
    Ok(parsed)
}

fn print_usage() {
    eprintln!(
        "geoscape-headless: run a geoscape campaign without a host\n\
         \n\
           --ruleset <path>   Ruleset JSON (default: built-in)\n\
           --seed <N>         RNG seed (default: 42)\n\
           --days <N>         Days to simulate (default: 30)\n\
           --save-dir <path>  Write autosaves here (optional)\n\
         \n\
         Set RUST_LOG=geoscape=info for event logs.\n"
    );
}
