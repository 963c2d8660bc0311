//! Headless Stardust galaxy driver.
//!
//! Runs the simulation without any presentation layer, controlled via JSON
//! on stdin/stdout or by RON scenario files.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p stardust_headless
//!
//! # Interactive with a tuning file, recording a replay
//! cargo run -p stardust_headless -- run --config tuning.ron --record session.replay
//!
//! # Run a scenario and write the JSON report
//! cargo run -p stardust_headless -- scenario --file scenarios/raid.ron --output report.json
//!
//! # Check a scenario for determinism on 16 parallel runs
//! cargo run -p stardust_headless -- verify --file scenarios/raid.ron --runs 16
//!
//! # Verify a replay
//! cargo run -p stardust_headless -- replay --file session.replay --verify
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stardust_core::config::GameConfig;
use stardust_core::galaxy::Galaxy;
use stardust_core::replay::{Replay, ReplayPlayer};
use stardust_headless::{
    batch::verify_determinism,
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "stardust_headless")]
#[command(about = "Headless Stardust galaxy driver for scripted runs and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a galaxy interactively over stdin/stdout
    Run {
        /// Tuning file (RON) replacing the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output state after every tick
        #[arg(long)]
        auto_state: bool,

        /// Save a replay of the session to this path
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a scripted scenario and print a JSON report
    Scenario {
        /// Scenario file (RON)
        #[arg(short, long)]
        file: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save a replay of the run to this path
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Verify determinism by running a scenario several times in parallel
    Verify {
        /// Scenario file (RON); the built-in raid when absent
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: usize,
    },

    /// Play back a recorded replay
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify replay produces identical hash
        #[arg(long)]
        verify: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            config,
            auto_state,
            record,
        }) => cmd_run(config, auto_state, record),
        Some(Commands::Scenario {
            file,
            output,
            record,
        }) => cmd_scenario(file, output, record),
        Some(Commands::Verify { file, runs }) => cmd_verify(file, runs),
        Some(Commands::Replay { file, verify }) => cmd_replay(file, verify),
        None => cmd_run(None, false, None),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

/// Run interactive mode
fn cmd_run(config: Option<PathBuf>, auto_state: bool, record: Option<PathBuf>) {
    let config = match config {
        Some(path) => {
            tracing::info!("Loading tuning from: {}", path.display());
            GameConfig::load(&path)
                .unwrap_or_else(|e| fail(format!("Failed to load config: {e}")))
        }
        None => GameConfig::default(),
    };
    let galaxy = Galaxy::new(config).unwrap_or_else(|e| fail(format!("Invalid config: {e}")));

    let headless = HeadlessConfig {
        auto_state_output: auto_state,
        record_replay: record.is_some(),
    };
    let mut runner = HeadlessRunner::new(galaxy, headless)
        .unwrap_or_else(|e| fail(format!("Failed to start runner: {e}")));

    tracing::info!("Starting headless session");
    let stdin = io::stdin();
    if let Err(e) = runner.run(stdin.lock(), io::stdout().lock()) {
        fail(format!("I/O error: {e}"));
    }

    if let (Some(path), Some(replay)) = (record, runner.take_replay()) {
        if let Err(e) = replay.save(&path) {
            fail(format!("Failed to save replay: {e}"));
        }
        eprintln!("Replay saved to: {}", path.display());
    }
}

/// Run a scripted scenario
fn cmd_scenario(file: PathBuf, output: Option<PathBuf>, record: Option<PathBuf>) {
    tracing::info!("Loading scenario: {}", file.display());

    let scenario = Scenario::load(&file).unwrap_or_else(|e| fail(e));
    let run = scenario.run().unwrap_or_else(|e| fail(e));

    if let Some(path) = record {
        if let Err(e) = run.replay.save(&path) {
            fail(format!("Failed to save replay: {e}"));
        }
        eprintln!("Replay saved to: {}", path.display());
    }

    if let Some(path) = output {
        if let Err(e) = run.report.save(&path) {
            fail(format!("Failed to write report: {e}"));
        }
        eprintln!("Report saved to: {}", path.display());
    } else {
        match run.report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => fail(e),
        }
    }

    eprintln!(
        "{}: {} steps, {} refused, hash {:016x}",
        run.report.scenario,
        run.report.steps.len(),
        run.report.refused,
        run.report.final_hash
    );
    if !run.report.passed {
        fail("FAIL: expectations not met");
    }
}

/// Verify determinism
fn cmd_verify(file: Option<PathBuf>, runs: usize) {
    let scenario = match file {
        Some(path) => Scenario::load(&path).unwrap_or_else(|e| fail(e)),
        None => Scenario::raid_1v1(),
    };

    let report = verify_determinism(&scenario, runs).unwrap_or_else(|e| fail(e));

    if report.is_deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        eprintln!("  Unique hashes: {}", report.unique_hashes());
        std::process::exit(1);
    }
}

/// Replay a recorded session
fn cmd_replay(file: PathBuf, verify: bool) {
    if verify {
        tracing::info!("Verifying replay: {}", file.display());
    } else {
        tracing::info!("Playing replay: {}", file.display());
    }

    let replay = Replay::load(&file).unwrap_or_else(|e| fail(format!("Failed to load replay: {e}")));

    eprintln!("Loaded replay:");
    eprintln!("  Scenario: {}", replay.scenario_id);
    eprintln!("  Commands: {}", replay.command_count());

    let mut player = ReplayPlayer::new(replay)
        .unwrap_or_else(|e| fail(format!("Failed to create replay player: {e}")));

    if verify {
        eprintln!("Verifying replay...");
        match player.verify() {
            Ok(true) => {
                eprintln!("PASS: Replay verification successful");
                eprintln!("  Expected hash: {:016x}", player.replay().final_hash);
                eprintln!("  Actual hash:   {:016x}", player.galaxy().state_hash());
            }
            Ok(false) => {
                eprintln!("FAIL: Replay hash mismatch");
                eprintln!("  Expected hash: {:016x}", player.replay().final_hash);
                eprintln!("  Actual hash:   {:016x}", player.galaxy().state_hash());
                std::process::exit(1);
            }
            Err(e) => fail(format!("Verification error: {e}")),
        }
    } else {
        while player.advance() {}
        eprintln!(
            "Replay finished: {} commands, {} refused",
            player.position(),
            player.rejected()
        );
        match serde_json::to_string_pretty(&player.galaxy().view()) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(e),
        }
    }
}
