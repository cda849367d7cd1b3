//! `rover` – run a simulated sample-return mission from the command line.
//!
//! The binary:
//!
//! 1. Loads `rover.toml` (or `--config PATH`), falling back to defaults, and
//!    applies `ROVER_*` environment overrides.
//! 2. Drives a [`SimRover`] for `--ticks` control ticks, feeding
//!    [`SimCamera`] frames through the mission and the resulting commands
//!    back into the simulated vehicle.
//! 3. Intercepts **Ctrl-C** to finish the current tick and stop.
//! 4. Prints a mission summary.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use tracing::{error, info, warn};

use rover_hal::{SimActuator, SimCamera, SimRover};
use rover_perception::{Channel, WorldMap};
use rover_runtime::{Mission, MissionConfig, init_tracing};
use rover_types::Mode;

/// Simulated seconds per control tick.
const TICK_SECONDS: f32 = 0.1;
/// Distance ahead of the start pose at which `--rock` places a sample.
const ROCK_AHEAD: f32 = 8.0;

#[derive(Parser, Debug)]
#[command(name = "rover", version, about = "Run a simulated rover mission")]
struct Cli {
    /// Mission configuration file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Number of control ticks to run.
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Place a rock sample just ahead of the starting pose.
    #[arg(long)]
    rock: bool,

    /// Write the effective configuration to `--config` and exit.
    #[arg(long)]
    init: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing("rover");

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    if cli.init {
        return match config::save_to(&cfg, &cli.config) {
            Ok(()) => {
                println!("  Config written to {}", cli.config.display().to_string().bold());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Config error".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this tick …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    match run(&cli, &cfg, &shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Mission aborted".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<MissionConfig, String> {
    match config::load_from(&cli.config)? {
        Some(cfg) => {
            info!(path = %cli.config.display(), "config loaded");
            Ok(cfg)
        }
        None => {
            let mut cfg = MissionConfig::default();
            config::apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mission loop
// ─────────────────────────────────────────────────────────────────────────────

fn run(cli: &Cli, cfg: &MissionConfig, shutdown: &AtomicBool) -> Result<(), String> {
    let mut mission = Mission::new(cfg).map_err(|e| e.to_string())?;

    let arena = cfg.perception.world_size as f32;
    let start = arena / 2.0;
    let samples = if cli.rock {
        vec![(start + ROCK_AHEAD, start)]
    } else {
        Vec::new()
    };
    let mut rover = SimRover::new(arena, samples);
    let rectifier = &cfg.perception.rectifier;
    let mut camera = SimCamera::new("front_rgb", rectifier.image_width, rectifier.image_height);
    let mut actuator = SimActuator::new("drive");

    println!(
        "\n  Running {} ticks in a {}×{} arena …",
        cli.ticks.to_string().bold(),
        cfg.perception.world_size,
        cfg.perception.world_size
    );

    for _ in 0..cli.ticks {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        camera.set_scene(rover.scene());
        let telemetry = rover.telemetry();
        let report = mission
            .run_once(&mut camera, &mut actuator, &telemetry)
            .map_err(|e| {
                error!(error = %e, "tick failed");
                e.to_string()
            })?;
        rover.apply(&report.command, TICK_SECONDS);
    }

    print_summary(&mission, &rover);
    Ok(())
}

fn print_summary(mission: &Mission, rover: &SimRover) {
    let state = mission.state();
    let telemetry = rover.telemetry();
    let map = mission.map();
    let cells = map.size() * map.size();

    let mode = match state.mode {
        Mode::Forward => state.mode.to_string().green(),
        Mode::Stop => state.mode.to_string().yellow(),
        Mode::Pickup => state.mode.to_string().cyan(),
    };

    println!();
    println!("{}", "  Mission summary".bold().underline());
    println!("  Ticks run         : {}", mission.ticks());
    println!("  Final mode        : {}", mode.bold());
    println!(
        "  Pose              : x={:.2} y={:.2} yaw={:.1}°",
        telemetry.pose.x, telemetry.pose.y, telemetry.pose.yaw
    );
    println!("  Stuck count       : {}", state.stuck_count);
    println!("  Pickup requests   : {}", mission.pickups_requested());
    println!("  Samples collected : {}", rover.collected());
    println!("  Cells explored    : {} of {}", explored_cells(map), cells);
    println!("  World map coverage:");
    for (label, channel) in [
        ("navigable", Channel::Navigable),
        ("obstacle", Channel::Obstacle),
        ("rock", Channel::Rock),
    ] {
        let count = map.count(channel);
        let pct = 100.0 * count as f64 / cells.max(1) as f64;
        println!("    • {:<9} {:>6} cells ({:.2}%)", label, count, pct);
    }
    println!();
}

/// Cells carrying evidence on any channel, read off the map image.
fn explored_cells(map: &WorldMap) -> usize {
    map.to_image().pixels().filter(|p| *p != [0, 0, 0]).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["rover"]);
        assert_eq!(cli.config, PathBuf::from("rover.toml"));
        assert_eq!(cli.ticks, 200);
        assert!(!cli.rock);
        assert!(!cli.init);
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::parse_from(["rover", "--config", "m.toml", "--ticks", "5", "--rock"]);
        assert_eq!(cli.config, PathBuf::from("m.toml"));
        assert_eq!(cli.ticks, 5);
        assert!(cli.rock);
    }

    #[test]
    fn short_simulated_mission_runs() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("rover.toml");
        let cli = Cli::parse_from([
            "rover",
            "--config",
            path.to_str().unwrap(),
            "--ticks",
            "3",
            "--rock",
        ]);
        let shutdown = AtomicBool::new(false);
        assert!(run(&cli, &MissionConfig::default(), &shutdown).is_ok());
    }

    #[test]
    fn explored_cells_counts_map_evidence() {
        let mut mission = Mission::new(&MissionConfig::default()).unwrap();
        assert_eq!(explored_cells(mission.map()), 0);

        let mut camera = SimCamera::new("front_rgb", 320, 160);
        let mut actuator = SimActuator::new("drive");
        let rover = SimRover::new(200.0, vec![]);
        mission
            .run_once(&mut camera, &mut actuator, &rover.telemetry())
            .unwrap();
        let explored = explored_cells(mission.map());
        assert!(explored > 0);
        assert!(explored >= mission.map().count(Channel::Navigable));
    }

    #[test]
    fn raised_shutdown_flag_skips_ticks() {
        let cli = Cli::parse_from(["rover", "--ticks", "50"]);
        let shutdown = AtomicBool::new(true);
        assert!(run(&cli, &MissionConfig::default(), &shutdown).is_ok());
    }
}
