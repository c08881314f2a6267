#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Parasite Lost headlessly with a seeded
//! autoplayer and prints a summary of the run.

mod config;
mod driver;

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Result};
use clap::Parser;
use log::{info, LevelFilter};
use parasite_lost_world::query;

use crate::driver::{Driver, RunOptions};

/// Headless Parasite Lost simulation.
#[derive(Debug, Parser)]
#[command(name = "parasite-lost", version, about)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the autoplayer and note jitter.
    #[arg(short, long, default_value_t = 7)]
    seed: u64,

    /// Simulated frame length in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Frames to simulate before giving up.
    #[arg(long, default_value_t = 20_000)]
    max_frames: u64,

    /// Chance that the autoplayer presses when a note is on the hit line.
    #[arg(long, default_value_t = 0.85)]
    skill: f64,

    /// Log verbosity.
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

/// Entry point for the Parasite Lost command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(args.log_level)
        .init();

    ensure!(args.frame_ms > 0, "--frame-ms must be greater than zero");
    ensure!(
        (0.0..=1.0).contains(&args.skill),
        "--skill must lie between 0 and 1, got {}",
        args.skill
    );

    let settings = config::load(args.config.as_deref(), args.seed)?;
    info!(
        "loaded {} levels, seed {}, {}ms frames",
        settings.levels.len(),
        args.seed,
        args.frame_ms
    );

    let driver = Driver::new(
        settings,
        RunOptions {
            seed: args.seed,
            frame: Duration::from_millis(args.frame_ms),
            skill: args.skill,
        },
    );
    println!("{}", query::welcome_banner(driver.world()));

    let summary = driver.run(args.max_frames);
    println!("{summary}");
    Ok(())
}
