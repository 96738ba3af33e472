//! signalmatch CLI - Debug tool for signal matching and zone clustering
//!
//! Usage:
//!   signalmatch-cli zones <catalog.json> [--radius <m>] [--output <file>]
//!   signalmatch-cli match <catalog.json> <route.gpx|route.json> [--radius <m>] [--max <n>]
//!
//! The catalog is a JSON array of signal documents (`_id`/`id`, `lat`,
//! `lng`). Routes are read from GPX tracks/routes or from a JSON array of
//! `{lat, lng}` points.

use clap::{Parser, Subcommand};
use gpx::{Gpx, read};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use signalmatch::{
    DispatchEngine, EngineConfig, GeoPoint, JsonFileSource, MatchConfig, ZoneConfig,
    geo_utils::haversine_distance,
};

#[derive(Parser)]
#[command(name = "signalmatch-cli")]
#[command(about = "Debug tool for signal matching and zone clustering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster the catalog into patrol zones
    Zones {
        /// Signal catalog (JSON array of documents)
        catalog: PathBuf,

        /// Target zone radius in meters
        #[arg(short, long)]
        radius: Option<f64>,

        /// Write the zone listing as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find the signals along a route
    Match {
        /// Signal catalog (JSON array of documents)
        catalog: PathBuf,

        /// Route file (GPX, or JSON array of points)
        route: PathBuf,

        /// Corridor radius in meters
        #[arg(short, long)]
        radius: Option<f64>,

        /// Maximum number of results (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        max: usize,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    let result = match cli.command {
        Commands::Zones {
            catalog,
            radius,
            output,
        } => run_zones(config, &catalog, radius, output.as_deref(), cli.verbose),
        Commands::Match {
            catalog,
            route,
            radius,
            max,
        } => run_match(config, &catalog, &route, radius, max, cli.verbose),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load the catalog into a fresh engine
fn load_engine(mut config: EngineConfig, catalog: &Path, zone_radius: Option<f64>) -> Result<DispatchEngine, String> {
    if let Some(radius) = zone_radius {
        config.zones = ZoneConfig {
            target_radius_meters: radius,
            ..config.zones
        };
    }

    println!("\n{}", "=".repeat(60));
    println!("Loading signal catalog from: {}", catalog.display());
    println!("{}", "=".repeat(60));

    let engine = DispatchEngine::with_config(config);
    engine
        .load(&JsonFileSource::new(catalog))
        .map_err(|e| e.to_string())?;

    if let Some(stats) = engine.stats() {
        println!(
            "  Loaded {} signals ({} rejected), {} zones, {} grid cells",
            stats.signal_count, stats.rejected_count, stats.zone_count, stats.grid_cells
        );
    }
    Ok(engine)
}

/// Run zone clustering
fn run_zones(
    config: EngineConfig,
    catalog: &Path,
    radius: Option<f64>,
    output: Option<&Path>,
    verbose: bool,
) -> Result<(), String> {
    let engine = load_engine(config, catalog, radius)?;
    let snapshot = engine.snapshot().map_err(|e| e.to_string())?;

    println!("\n{}", "-".repeat(60));
    println!(
        "RESULTS: {} zones (target radius {:.0}m)",
        snapshot.zones.len(),
        snapshot.zone_config.target_radius_meters
    );
    println!("{}", "-".repeat(60));

    for zone in snapshot.zones.zones() {
        println!(
            "\n  Zone {} ({} signals, radius {:.0}m):",
            zone.index,
            zone.len(),
            zone.radius_meters
        );
        println!(
            "    Centroid: ({:.5}, {:.5})",
            zone.centroid.latitude, zone.centroid.longitude
        );
        println!(
            "    Bounds: [{:.4}, {:.4}] to [{:.4}, {:.4}]",
            zone.bounds.min_lat, zone.bounds.min_lng, zone.bounds.max_lat, zone.bounds.max_lng
        );
        if verbose {
            println!("    Signals:");
            for signal in &zone.members {
                println!(
                    "      - {} ({:.5}, {:.5})",
                    signal.id, signal.location.latitude, signal.location.longitude
                );
            }
        }
    }

    if let Some(path) = output {
        let listing = snapshot.zones.summaries();
        let json = serde_json::to_string_pretty(&listing).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| format!("{}: {}", path.display(), e))?;
        println!("\n  Wrote zone listing to {}", path.display());
    }

    Ok(())
}

/// Run route matching
fn run_match(
    config: EngineConfig,
    catalog: &Path,
    route_path: &Path,
    radius: Option<f64>,
    max_results: usize,
    verbose: bool,
) -> Result<(), String> {
    let route = load_route(route_path)?;
    println!(
        "  Route: {} points, {:.2}km",
        route.len(),
        route_length(&route) / 1000.0
    );

    let match_config = MatchConfig {
        corridor_radius_meters: radius.unwrap_or(config.matching.corridor_radius_meters),
        max_results,
        ..config.matching.clone()
    };
    let engine = load_engine(config, catalog, None)?;

    let matches = engine
        .match_route_detailed(&route, &match_config)
        .map_err(|e| e.to_string())?;

    println!("\n{}", "-".repeat(60));
    println!(
        "RESULTS: {} signals within {:.0}m of the route",
        matches.len(),
        match_config.corridor_radius_meters
    );
    println!("{}", "-".repeat(60));

    for (i, m) in matches.iter().enumerate() {
        println!(
            "  {:>3}. {} at route point {} ({:.1}m off route)",
            i + 1,
            m.signal.id,
            m.route_index,
            m.distance
        );
        if verbose {
            println!(
                "       location ({:.6}, {:.6}), {:.1}m from route point",
                m.signal.location.latitude, m.signal.location.longitude, m.route_point_distance
            );
            if let Ok(zone) = engine.nearest_zone(&m.signal.location) {
                println!("       zone {}", zone.index);
            }
        }
    }

    Ok(())
}

/// Read a route from GPX or JSON depending on the extension
fn load_route(path: &Path) -> Result<Vec<GeoPoint>, String> {
    let is_gpx = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gpx"));

    if is_gpx {
        parse_gpx_route(path)
    } else {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        serde_json::from_str(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }
}

/// Parse track points (or, failing that, route points) from a GPX file
fn parse_gpx_route(path: &Path) -> Result<Vec<GeoPoint>, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let reader = BufReader::new(file);
    let gpx: Gpx = read(reader).map_err(|e| e.to_string())?;

    let mut points = Vec::new();
    for track in &gpx.tracks {
        for segment in &track.segments {
            for pt in &segment.points {
                let p = pt.point();
                points.push(GeoPoint::new(p.y(), p.x()));
            }
        }
    }

    if points.is_empty() {
        for route in &gpx.routes {
            for pt in &route.points {
                let p = pt.point();
                points.push(GeoPoint::new(p.y(), p.x()));
            }
        }
    }

    if points.is_empty() {
        return Err("No track or route points found".to_string());
    }
    Ok(points)
}

fn route_length(route: &[GeoPoint]) -> f64 {
    route
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}
