// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use aviflux_core::tracking::{
    AudioCue, EngineBuilder, FlightStateProvider, OfflineProvider, OpenSkyClient,
};
use aviflux_core::{
    AirportDirectory, HealthReport, PlannerOptions, RoutePlanner, Settings, SnapshotUpdate,
};
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to settings.json
    #[arg(short, long, global = true, env = "AVIFLUX_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every known airport
    Airports,
    /// Check whether airport codes are known
    Validate {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Plan a route and print its metrics
    Route {
        departure: String,
        arrival: String,
        /// Intermediate waypoint (repeatable)
        #[arg(long = "via")]
        via: Vec<String>,
        /// Return to the departure airport
        #[arg(long)]
        circular: bool,
        /// Print JSON including GeoJSON geometry
        #[arg(long)]
        json: bool,
    },
    /// Track live traffic along a route such as "KJFK-KORD-KLAX"
    Track {
        route: String,
        /// Stop after this many published updates
        #[arg(long)]
        ticks: Option<usize>,
        /// Ring the terminal bell while tracking
        #[arg(long)]
        sound: bool,
        /// Never contact the flight-state provider
        #[arg(long)]
        offline: bool,
    },
    /// Print a service summary
    Health,
}

/// Rings the terminal bell.
struct TerminalBell;

impl AudioCue for TerminalBell {
    fn play(&self) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("aviflux")
        .build();
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn settings_source(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(Settings::default_path)
        .filter(|p| p.exists())
}

fn load_directory(settings: &Settings) -> Result<AirportDirectory> {
    let mut directory = AirportDirectory::builtin().clone();
    if let Some(csv) = &settings.airports_csv {
        directory
            .extend_from_csv(csv)
            .with_context(|| format!("Failed to load airports from {}", csv.display()))?;
    }
    Ok(directory)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let directory = load_directory(&settings)?;

    match cli.command {
        Commands::Airports => {
            for airport in directory.iter() {
                println!(
                    "{}  {:>9.4} {:>10.4}  {}",
                    airport.code, airport.lat, airport.lng, airport.name
                );
            }
            println!("{} airports", directory.len());
        }
        Commands::Validate { codes } => {
            let mut all_valid = true;
            for (code, valid) in directory.validate_codes(codes.as_slice()) {
                all_valid &= valid;
                println!("{} {}", if valid { "[x]" } else { "[ ]" }, code);
            }
            if !all_valid {
                std::process::exit(1);
            }
        }
        Commands::Route {
            departure,
            arrival,
            via,
            circular,
            json,
        } => {
            let options = PlannerOptions {
                circular,
                ..settings.planner_options()
            };
            let planned = RoutePlanner::with_options(&directory, options)
                .plan_route(&departure, &arrival, via.as_slice())?;

            if json {
                let out = serde_json::json!({
                    "route": planned.codes(),
                    "metrics": planned.metrics,
                    "viewport": planned.viewport,
                    "circular": planned.circular,
                    "segments": planned.segments(),
                    "geometry": planned.geometry(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Route: {}", planned.codes());
                for seg in planned.segments() {
                    println!(
                        "  {} -> {}  {:>8.1} nm  {:>5.1} deg",
                        seg.from, seg.to, seg.distance_nm, seg.bearing_deg
                    );
                }
                println!("Distance: {:.1} nm", planned.metrics.total_distance_nm);
                println!(
                    "Flight time: {:.2} h at {:.0} kt",
                    planned.metrics.flight_time_hours, options.cruise_speed_kt
                );
                println!("Waypoints: {}", planned.metrics.waypoint_count);
                println!(
                    "Viewport: ({:.4}, {:.4}) zoom {}",
                    planned.viewport.center.lat,
                    planned.viewport.center.lng,
                    planned.viewport.zoom_level
                );
            }
        }
        Commands::Track {
            route,
            ticks,
            sound,
            offline,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            if offline {
                runtime.block_on(track(
                    OfflineProvider,
                    &settings,
                    directory,
                    &route,
                    ticks,
                    sound,
                ))?;
            } else {
                let client =
                    OpenSkyClient::new(&settings.provider_url, settings.provider_timeout())?;
                runtime.block_on(track(client, &settings, directory, &route, ticks, sound))?;
            }
        }
        Commands::Health => {
            let source = settings_source(cli.config.as_deref());
            let report = HealthReport::new(&directory, source.as_deref());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn track<P: FlightStateProvider + 'static>(
    provider: P,
    settings: &Settings,
    directory: AirportDirectory,
    route_text: &str,
    ticks: Option<usize>,
    sound: bool,
) -> Result<()> {
    let engine = EngineBuilder::new(provider)
        .directory(Arc::new(directory))
        .config(settings.tracking_config())
        .audio(Arc::new(TerminalBell))
        .build()?;

    let (tx, mut rx) = mpsc::unbounded_channel::<SnapshotUpdate>();
    engine.on_snapshot_update(move |update| {
        let _ = tx.send(update.clone());
    });

    engine.set_sound_enabled(sound);
    let codes = engine
        .set_manual_route(route_text)
        .with_context(|| format!("Cannot track '{}'", route_text))?;
    engine.start(codes);

    let mut seen = 0usize;
    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else { break };
                print_update(&update);
                if let Some(current) = engine.current_flight() {
                    println!("  > highlighted: {}", current.flight_id);
                }
                seen += 1;
                if ticks.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }
    }

    engine.stop();
    Ok(())
}

fn print_update(update: &SnapshotUpdate) {
    println!(
        "#{} {} [{:?}] {} flights",
        update.sequence,
        update.route,
        update.feed,
        update.flights.len()
    );
    for flight in &update.flights {
        let eta = flight
            .eta
            .map(|t| t.format("%H:%MZ").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        println!(
            "  {:<8} {:<5} {:>6} ft {:>4} kt {:>5.1} deg  {:>5.1}%  {:<10} ETA {}{}",
            flight.flight_id,
            flight.aircraft_type,
            flight.altitude_ft,
            flight.ground_speed_kt,
            flight.heading_deg,
            flight.progress_pct,
            flight.status.to_string(),
            eta,
            if flight.is_live_sourced { "" } else { " (sim)" }
        );
    }
}
