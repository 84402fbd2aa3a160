//! leolink: command-line harness for the telemetry link simulator.
//!
//! Supports:
//! - Running encode→inject→recover cycles with a chosen FEC scheme
//! - Corrupting hex frames from a file through the channel simulator
//! - Validating hex frames with the layered validator

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use leolink_core::channel::ChannelSimulator;
use leolink_core::pipeline::{FecScheme, PipelineConfig, TelemetryPipeline};
use leolink_core::telemetry::{TelemetryRecord, Visibility};
use leolink_core::types::{hex_decode, hex_encode};
use leolink_core::validator::FrameValidator;
use leolink_core::DeliveryOutcome;

#[derive(Parser)]
#[command(name = "leolink", version, about = "Telemetry FEC link simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run simulated downlink cycles and print a link summary
    Simulate {
        /// Number of frames to push through the channel
        #[arg(long, default_value = "10")]
        frames: u32,

        /// Channel severity multiplier
        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// Channel seed (same seed, same impairments)
        #[arg(long, default_value = "450755613")]
        seed: u64,

        /// FEC scheme: none, hamming, bch, bch+interleave, convolutional,
        /// reed-solomon
        #[arg(long, default_value = "convolutional")]
        scheme: String,

        /// Let strategy recommendations switch the scheme between frames
        #[arg(short, long)]
        adaptive: bool,

        /// Emit per-cycle reports as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Corrupt hex frames from a file (one frame per line)
    Inject {
        /// Path to file containing hex frames
        file: PathBuf,

        /// Channel severity multiplier
        #[arg(long, default_value = "1.0")]
        scale: f64,

        #[arg(long, default_value = "1")]
        seed: u64,
    },

    /// Validate hex frames from a file
    Validate {
        /// Path to file containing hex frames
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            frames,
            scale,
            seed,
            scheme,
            adaptive,
            json,
        } => cmd_simulate(frames, scale, seed, &scheme, adaptive, json),
        Commands::Inject { file, scale, seed } => cmd_inject(file, scale, seed),
        Commands::Validate { file } => cmd_validate(file),
    }
}

fn parse_scheme(name: &str) -> FecScheme {
    match name {
        "none" => FecScheme::None,
        "hamming" => FecScheme::Hamming,
        "bch" => FecScheme::Bch,
        "bch+interleave" | "interleaved-bch" => FecScheme::InterleavedBch,
        "convolutional" | "viterbi" => FecScheme::Convolutional,
        "reed-solomon" | "rs" => FecScheme::ReedSolomon,
        other => {
            eprintln!("Unknown scheme: {other}");
            std::process::exit(1);
        }
    }
}

/// Synthetic LEO pass: one record per frame with a drifting sub-satellite
/// point.
fn synthetic_record(i: u32) -> TelemetryRecord {
    TelemetryRecord {
        sat_id: 25544,
        timestamp: 1_700_000_000 + i as i64,
        latitude: 31.45 - 0.06 * i as f64,
        longitude: -112.23 + 0.07 * i as f64,
        altitude: 408.2,
        velocity: 27_600.5,
        footprint: 4432.1,
        daynum: 18255.5 + i as f64 / 86_400.0,
        solar_lat: -12.3,
        solar_lon: 88.4,
        visibility: Visibility::Daylight,
        units: "km".into(),
    }
}

fn cmd_simulate(frames: u32, scale: f64, seed: u64, scheme: &str, adaptive: bool, json: bool) {
    let mut pipeline = TelemetryPipeline::new(PipelineConfig {
        scheme: parse_scheme(scheme),
        channel_seed: seed,
        channel_scale: scale,
        adaptive,
    });

    eprintln!("Simulating {frames} frames (scheme={scheme}, scale={scale}, seed={seed})");

    for i in 0..frames {
        let report = match pipeline.run_cycle(&synthetic_record(i)) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };

        if json {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error: {e}"),
            }
            continue;
        }

        let outcome = match report.outcome {
            DeliveryOutcome::Delivered { corrected: true } => "delivered (corrected)",
            DeliveryOutcome::Delivered { corrected: false } => "delivered",
            DeliveryOutcome::RetransmitRequested => "retransmit requested",
            DeliveryOutcome::Failed => "FAILED",
        };
        println!(
            "seq {:>4}  {:<13} {:>4} bit errs  {:<14} -> {:<10} {}",
            report.sequence,
            report.scheme.to_string(),
            report.analysis.bit_errors,
            report.analysis.primary.to_string(),
            report.strategy.primary.to_string(),
            outcome
        );
    }

    let stats = pipeline.stats();
    eprintln!(
        "{} frames: {} delivered ({} corrected), {} retransmits, {} failed",
        stats.frames, stats.delivered, stats.corrected, stats.retransmits, stats.failed
    );
}

fn cmd_inject(file: PathBuf, scale: f64, seed: u64) {
    let content = match fs::read_to_string(&file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {e}", file.display());
            std::process::exit(1);
        }
    };

    let mut sim = ChannelSimulator::new(seed);
    let mut count = 0u64;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match hex_decode(line) {
            Some(data) => {
                let outcome = sim.inject_detailed(&data, scale);
                let kinds: Vec<String> =
                    outcome.applied.iter().map(|k| format!("{k:?}")).collect();
                println!("{}", hex_encode(&outcome.data));
                eprintln!("  applied: {}", kinds.join(", "));
                count += 1;
            }
            None => eprintln!("Skipping invalid hex line"),
        }
    }
    eprintln!("{count} frames corrupted");
}

fn cmd_validate(file: PathBuf) {
    let content = match fs::read_to_string(&file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {e}", file.display());
            std::process::exit(1);
        }
    };

    let validator = FrameValidator::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match hex_decode(line) {
            Some(data) => {
                let report = validator.validate(&data);
                println!(
                    "{:?} sync={:?}@{} structure={:?} crc_ok={} confidence={:.2}",
                    report.status,
                    report.sync,
                    report.sync_offset,
                    report.structure,
                    report.crc_ok,
                    report.confidence
                );
            }
            None => eprintln!("Skipping invalid hex line"),
        }
    }
}
