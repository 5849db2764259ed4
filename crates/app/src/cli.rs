//! CLI argument parsing for the looptrack binary.
//!
//! This module owns translation of CLI arguments into a `RigConfig` struct
//! which downstream stages use without re-parsing flags.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use preproc::{BackgroundMethod, PreprocConfig};
use stage_link::{Capacity, OverflowPolicy};

use crate::rig::RigConfig;

#[derive(Debug, Parser)]
#[command(
    name = "looptrack",
    about = "Closed-loop frame preprocessing and stage streaming rig"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the rig against the synthetic scene and the mock stage.
    Run(RunArgs),
}

/// CLI arguments accepted by the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Capture width in pixels.
    #[arg(long, value_name = "PX", default_value_t = 320)]
    pub width: i32,
    /// Capture height in pixels.
    #[arg(long, value_name = "PX", default_value_t = 240)]
    pub height: i32,
    /// Acquisition rate in frames per second.
    #[arg(long, value_name = "FPS", default_value_t = 60.0)]
    pub fps: f64,
    /// Downscale factor applied before other preprocessing steps (0.01-1.0).
    #[arg(long = "scale", value_name = "FACTOR", default_value_t = 1.0)]
    pub image_scale: f64,
    /// Box smoothing kernel size in pixels; 0 disables smoothing.
    #[arg(long, value_name = "PX", default_value_t = 0)]
    pub filter_size: i32,
    /// Invert intensities after smoothing.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub invert: bool,
    /// Background model: off, running-average, knn or mog2.
    #[arg(long, value_name = "METHOD", default_value = "running-average")]
    pub method: String,
    /// Exponential smoothing rate for the running-average model (0.001-1.0).
    #[arg(long, value_name = "RATE", default_value_t = 0.01)]
    pub learning_rate: f64,
    /// Refresh the running-average model every N frames (1-1000).
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub learn_every: u32,
    /// Decision threshold for the adaptive subtractors (> 0).
    #[arg(long, value_name = "T", default_value_t = 128.0)]
    pub threshold: f64,
    /// Stage consumer wait window in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 200)]
    pub timeout_ms: u64,
    /// Position queue capacity in slots; 0 selects an unbounded queue.
    #[arg(long, value_name = "SLOTS", default_value_t = 64)]
    pub queue_capacity: usize,
    /// Drop positions instead of blocking when the queue is full.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub drop_on_full: bool,
    /// Stop after this many seconds; runs until Ctrl+C when omitted.
    #[arg(long, value_name = "SECS")]
    pub duration_secs: Option<u64>,
    /// Emit verbose logging (per-frame positions, queue depths).
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

impl RunArgs {
    pub fn into_config(self) -> Result<RigConfig> {
        if self.width <= 0 || self.height <= 0 {
            bail!("--width and --height must be positive");
        }
        if self.fps <= 0.0 || !self.fps.is_finite() {
            bail!("--fps must be a positive number");
        }
        if self.timeout_ms == 0 {
            bail!("--timeout-ms must be at least 1");
        }

        let method: BackgroundMethod = self.method.parse()?;
        let preproc = PreprocConfig {
            image_scale: self.image_scale,
            filter_size: self.filter_size,
            color_invert: self.invert,
            learning_rate: self.learning_rate,
            learn_every: self.learn_every,
            method,
            threshold: self.threshold,
        };
        preproc.validate()?;

        let capacity = if self.queue_capacity == 0 {
            Capacity::Unbounded
        } else {
            Capacity::Bounded(self.queue_capacity)
        };
        let policy = if self.drop_on_full {
            OverflowPolicy::DropNewest
        } else {
            OverflowPolicy::Block
        };

        Ok(RigConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            preproc,
            stage_timeout: Duration::from_millis(self.timeout_ms),
            capacity,
            policy,
            duration: self.duration_secs.map(Duration::from_secs),
            verbose: self.verbose,
        })
    }
}
