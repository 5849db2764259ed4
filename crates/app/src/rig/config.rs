use std::time::Duration;

use preproc::PreprocConfig;
use stage_link::{Capacity, OverflowPolicy};

/// Canonical configuration shared by every stage of the rig.
#[derive(Clone, Debug)]
pub struct RigConfig {
    /// Capture width streamed by the frame source.
    pub width: i32,
    /// Capture height streamed by the frame source.
    pub height: i32,
    /// Acquisition pacing in frames per second.
    pub fps: f64,
    /// Preprocessing parameters, validated before the rig starts.
    pub preproc: PreprocConfig,
    /// Bounded wait used by the stage consumer when popping positions.
    pub stage_timeout: Duration,
    /// Position queue capacity between acquisition and actuation.
    pub capacity: Capacity,
    /// Overflow behaviour when the position queue is bounded and full.
    pub policy: OverflowPolicy,
    /// Optional session length; the rig runs until Ctrl+C when absent.
    pub duration: Option<Duration>,
    /// Emit verbose logging (per-frame positions, queue depths).
    pub verbose: bool,
}
