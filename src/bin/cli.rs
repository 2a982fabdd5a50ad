//! navtrack CLI - Debug tool for replaying fix logs through the engine
//!
//! Usage:
//!   navtrack-cli replay <route.json> <fixes.json> [--arrival-threshold <m>]
//!   navtrack-cli synth <output-dir> [--lateral-offset <m>]
//!
//! `replay` feeds a recorded fix log against a route and prints every state
//! transition and maneuver announcement. `synth` writes a matching pair of
//! route/fix files for experimenting with thresholds.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use navtrack::engine::{NavigationEngine, NavigationState};
use navtrack::synthetic::{fixes_along, straight_route, FixStreamConfig};
use navtrack::{GpsPoint, LocationFix, Maneuver, NavConfig, NavUpdate, RouteGeometry};

#[derive(Parser)]
#[command(name = "navtrack-cli")]
#[command(about = "Debug tool for the navigation state machine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a fix log against a route and print transitions
    Replay {
        /// Route geometry JSON ({points, maneuvers})
        route: PathBuf,

        /// Fix log JSON (array of LocationFix)
        fixes: PathBuf,

        /// Arrival threshold in meters
        #[arg(long, default_value = "100.0")]
        arrival_threshold: f64,

        /// Off-route threshold in meters
        #[arg(long, default_value = "70.0")]
        off_route_threshold: f64,
    },

    /// Generate a synthetic route + fix log pair
    Synth {
        /// Output directory for route.json and fixes.json
        output: PathBuf,

        /// Lateral offset of the fix stream from the route, in meters
        #[arg(long, default_value = "0.0")]
        lateral_offset: f64,

        /// Route length in meters
        #[arg(long, default_value = "2000.0")]
        length: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Replay {
            route,
            fixes,
            arrival_threshold,
            off_route_threshold,
        } => replay(route, fixes, arrival_threshold, off_route_threshold),
        Commands::Synth {
            output,
            lateral_offset,
            length,
        } => synth(output, lateral_offset, length),
    }
}

fn replay(
    route_path: PathBuf,
    fixes_path: PathBuf,
    arrival_threshold: f64,
    off_route_threshold: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let geometry: RouteGeometry = serde_json::from_reader(BufReader::new(File::open(route_path)?))?;
    let fixes: Vec<LocationFix> = serde_json::from_reader(BufReader::new(File::open(fixes_path)?))?;
    let route = geometry.into_model()?;

    println!(
        "route: {} vertices, {} maneuvers, {:.0}m",
        route.vertices().len(),
        route.maneuvers().len(),
        route.total_length_m()
    );

    let config = NavConfig {
        arrival_threshold_m: arrival_threshold,
        off_route_threshold_m: off_route_threshold,
        ..NavConfig::default()
    };

    let mut engine = NavigationEngine::new(config);
    let mut last_state = NavigationState::Idle;
    engine.add_observer(Box::new(move |update: &NavUpdate| {
        if update.state != last_state {
            println!("state: {:?} -> {:?}", last_state, update.state);
            last_state = update.state;
        }
        if let Some(m) = &update.active_maneuver {
            println!(
                "  next: {} in {:.0}m",
                m.maneuver.instruction, m.remaining_distance_m
            );
        }
    }));
    engine.start_with_route(route);

    for fix in fixes {
        engine.on_fix(fix);
    }

    println!("final state: {:?}", engine.state());
    Ok(())
}

fn synth(
    output: PathBuf,
    lateral_offset: f64,
    length: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(&output)?;

    let origin = GpsPoint::new(47.3769, 8.5417);
    let points = straight_route(origin, 0.0, length, 50.0);
    let halfway = points.len() / 2;
    let geometry = RouteGeometry {
        maneuvers: vec![Maneuver {
            instruction: "Turn left".to_string(),
            begin_index: halfway,
            end_index: None,
            length_m: length / 2.0,
        }],
        points: points.clone(),
    };

    let fixes = fixes_along(
        &points,
        0,
        &FixStreamConfig {
            lateral_offset_m: lateral_offset,
            noise_m: 3.0,
            ..FixStreamConfig::default()
        },
    );

    serde_json::to_writer_pretty(File::create(output.join("route.json"))?, &geometry)?;
    serde_json::to_writer_pretty(File::create(output.join("fixes.json"))?, &fixes)?;
    println!(
        "wrote {} route vertices and {} fixes to {}",
        geometry.points.len(),
        fixes.len(),
        output.display()
    );
    Ok(())
}
