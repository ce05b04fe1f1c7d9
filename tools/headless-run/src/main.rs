//! headless-run: drive a GRAVWELL session without a renderer.
//!
//! Usage:
//!   headless-run --ticks 3600 --seed 7
//!   headless-run --config session.json --snapshot final.json
//!
//! Verbosity follows `RUST_LOG` (e.g. `RUST_LOG=debug`).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use gravwell_sim::core::enums::GamePhase;
use gravwell_sim::core::events::SimEvent;
use gravwell_sim::{SimConfig, SimulationEngine};

const DEFAULT_TICKS: u64 = 3600;

struct Args {
    config: Option<PathBuf>,
    seed: Option<u64>,
    ticks: u64,
    snapshot: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.iter().any(|a| a == "help" || a == "--help" || a == "-h") {
        print_usage();
        return;
    }
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            print_usage();
            process::exit(1);
        }
    };

    let mut config = match &args.config {
        Some(path) => match SimConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {e}", path.display());
                process::exit(1);
            }
        },
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut engine = match SimulationEngine::try_new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            process::exit(1);
        }
    };

    let mut tally: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut last = engine.snapshot();
    for _ in 0..args.ticks {
        last = engine.tick();
        for event in &last.events {
            *tally.entry(event_name(event)).or_default() += 1;
        }
        if last.phase == GamePhase::GameOver {
            log::info!("run ended at tick {}", last.time.tick);
            break;
        }
    }

    log::info!(
        "tick {} ({:.1}s): {} bodies, {} units, {} projectiles, planet limit {}",
        last.time.tick,
        last.time.elapsed_secs,
        last.bodies.len(),
        last.units.len(),
        last.projectiles.len(),
        last.planet_limit
    );
    if let Some(player) = &last.player {
        log::info!(
            "player: score {}, tier {}, lives {}, squad {}",
            player.score,
            player.tier,
            player.lives,
            player.squad_size
        );
    }
    for (name, count) in &tally {
        log::info!("  {name}: {count}");
    }

    if let Some(path) = args.snapshot {
        let json = match serde_json::to_string_pretty(&last) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Failed to encode snapshot: {e}");
                process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            eprintln!("Failed to write {}: {e}", path.display());
            process::exit(1);
        }
        log::info!("snapshot written to {}", path.display());
    }
}

fn print_usage() {
    eprintln!(
        "headless-run: run a GRAVWELL session without a renderer\n\
         \n\
           --config <path>    JSON session config (missing fields take defaults)\n\
           --seed <N>         Override the config seed\n\
           --ticks <N>        Ticks to simulate (default: {DEFAULT_TICKS})\n\
           --snapshot <path>  Write the final snapshot as JSON\n"
    );
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args {
        config: None,
        seed: None,
        ticks: DEFAULT_TICKS,
        snapshot: None,
    };
    let mut it = raw.iter();
    while let Some(flag) = it.next() {
        let mut value = || it.next().ok_or_else(|| format!("{flag} needs a value"));
        match flag.as_str() {
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--snapshot" => args.snapshot = Some(PathBuf::from(value()?)),
            "--seed" => {
                let v = value()?;
                args.seed = Some(v.parse().map_err(|_| format!("Invalid seed: {v}"))?);
            }
            "--ticks" => {
                let v = value()?;
                args.ticks = v.parse().map_err(|_| format!("Invalid tick count: {v}"))?;
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn event_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::Explosion { .. } => "explosions",
        SimEvent::LaserFired { .. } => "shots fired",
        SimEvent::SoftThud { .. } => "soft thuds",
        SimEvent::HomePlanetLost => "home planet lost",
        SimEvent::StationDestroyed { .. } => "stations destroyed",
        SimEvent::ShipDestroyed { .. } => "ships destroyed",
        SimEvent::PlayerHit { .. } => "player hits",
        SimEvent::PlayerKilled { .. } => "player deaths",
        SimEvent::PlayerRespawned => "player respawns",
        SimEvent::TierChanged { .. } => "tier changes",
        SimEvent::GodRing { .. } => "god rings",
        SimEvent::Betrayal => "betrayals",
    }
}
