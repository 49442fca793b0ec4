//! livewire-replay: headless live-wire sessions for tuning and inspection.
//!
//! Loads an image, builds its intensity and cost fields, replays a
//! sequence of pointer events through a trace session and reports the
//! result. Useful for:
//!
//! - Checking where the wire snaps on a given image
//! - Measuring per-move search cost and re-anchoring frequency
//! - Inspecting the intensity and cost fields numerically
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin livewire-replay -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod overlay;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use livewire_core::diagnostics::{
    self, Clock, FieldDiagnostics, SessionDiagnostics, build_fields_with_diagnostics,
};
use livewire_core::{PointerEvent, ReanchorPolicy, SessionSnapshot, TraceConfig, TraceSession};
use serde::Serialize;

/// Headless live-wire session replay.
///
/// Replays seed and cursor events over an image and prints the traced
/// boundary together with per-stage and per-event diagnostics.
#[derive(Parser)]
#[command(name = "livewire-replay", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP, GIF).
    image_path: PathBuf,

    /// JSON file with an array of pointer events, e.g.
    /// `[{"type": "place_seed", "x": 10, "y": 4}, {"type": "move_cursor", "x": 80, "y": 40}]`.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Seed position, replayed after any script events.
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    seed: Option<(i64, i64)>,

    /// Cursor position; repeat to replay several moves in order.
    #[arg(long = "move", value_name = "X,Y", value_parser = parse_point)]
    moves: Vec<(i64, i64)>,

    /// Live path length that triggers re-anchoring.
    #[arg(long, default_value_t = TraceConfig::DEFAULT_MAX_LENGTH, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(2..))]
    max_length: usize,

    /// Strictly positive lower bound on pixel cost.
    #[arg(long, default_value_t = TraceConfig::DEFAULT_COST_FLOOR)]
    cost_floor: f32,

    /// Re-anchor so that this many trailing pixels stay live, instead of
    /// re-anchoring at the midpoint.
    #[arg(long)]
    keep_tail: Option<usize>,

    /// Full trace config as a JSON string.
    ///
    /// When provided, the individual config flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Print the top-left N x N values of the intensity and cost fields.
    #[arg(long, value_name = "N")]
    dump_fields: Option<u32>,

    /// Write the image with the traced boundary drawn over it.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Output the session snapshot and diagnostics as JSON.
    #[arg(long)]
    json: bool,
}

/// Parse `"X,Y"` into signed pixel coordinates.
fn parse_point(s: &str) -> Result<(i64, i64), String> {
    let (x_str, y_str) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'X,Y', got: '{s}'"))?;
    let x = x_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid X '{x_str}': {e}"))?;
    let y = y_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid Y '{y_str}': {e}"))?;
    Ok((x, y))
}

/// Build a [`TraceConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<TraceConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        TraceConfig {
            max_length: cli.max_length,
            reanchor: cli
                .keep_tail
                .map_or(ReanchorPolicy::Midpoint, |keep| ReanchorPolicy::KeepTail { keep }),
            cost_floor: cli.cost_floor,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Collect the events to replay: script first, then `--seed`, then `--move`s.
fn events_from_cli(cli: &Cli) -> Result<Vec<PointerEvent>, String> {
    let mut events: Vec<PointerEvent> = match cli.script {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("Error parsing script {}: {e}", path.display()))?
        }
        None => Vec::new(),
    };
    if let Some((x, y)) = cli.seed {
        events.push(PointerEvent::PlaceSeed { x, y });
    }
    events.extend(
        cli.moves
            .iter()
            .map(|&(x, y)| PointerEvent::MoveCursor { x, y }),
    );
    Ok(events)
}

/// Everything `--json` prints.
#[derive(Serialize)]
struct ReplayReport<'a> {
    config: &'a TraceConfig,
    fields: &'a FieldDiagnostics,
    updates: &'a SessionDiagnostics,
    snapshot: &'a SessionSnapshot,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let events = match events_from_cli(&cli) {
        Ok(e) => e,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    let raster = match image::load_from_memory(&image_bytes) {
        Ok(img) => img.to_rgb8(),
        Err(e) => {
            eprintln!("Error decoding {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    eprintln!("img size: {} x {}", raster.width(), raster.height());
    eprintln!("Config: {config:?}");

    let (intensity, cost, field_diagnostics) =
        match build_fields_with_diagnostics(&raster, config.cost_floor, &StdClock) {
            Ok(built) => built,
            Err(e) => {
                eprintln!("Field construction error: {e}");
                return ExitCode::FAILURE;
            }
        };

    if let Some(n) = cli.dump_fields {
        eprintln!("{}", diagnostics::excerpt("intensity", &intensity, n));
        eprintln!("{}", diagnostics::excerpt("cost", &cost, n));
    }

    let mut session = match TraceSession::new(cost, config.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Session error: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Replaying {} events", events.len());
    let mut session_diagnostics = SessionDiagnostics::default();
    for event in events {
        if let Err(e) = session_diagnostics.record(&mut session, event, &StdClock) {
            eprintln!("Error replaying {event:?}: {e}");
            return ExitCode::FAILURE;
        }
    }

    let snapshot = session.snapshot();

    if cli.json {
        let report = ReplayReport {
            config: &config,
            fields: &field_diagnostics,
            updates: &session_diagnostics,
            snapshot: &snapshot,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", field_diagnostics.report());
        println!();
        println!("{}", session_diagnostics.report());
        println!();
        print_boundary(&session);
    }

    if let Some(ref path) = cli.overlay {
        let rendered = overlay::render(&raster, &snapshot);
        match rendered.save(path) {
            Ok(()) => eprintln!("Overlay written to {}", path.display()),
            Err(e) => {
                eprintln!("Error writing overlay to {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

/// Print the traced boundary in human-readable form.
fn print_boundary(session: &TraceSession) {
    let boundary = session.boundary();
    match session.seed() {
        Some(seed) => println!("Seed: {seed}"),
        None => println!("Seed: none"),
    }
    match session.cursor() {
        Some(cursor) => println!("Cursor: {cursor}"),
        None => println!("Cursor: none"),
    }
    println!(
        "Boundary: {} pixels ({} frozen, {} live)",
        boundary.len(),
        session.frozen().len(),
        session.accumulated().len(),
    );
    let joined: Vec<String> = boundary.pixels().iter().map(ToString::to_string).collect();
    println!("{}", joined.join(" "));
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
