//! Rig supervisor tying together capture, preprocessing, and the stage link.
//!
//! The supervisor wires the channels between stages, keeps watchdog state in
//! sync, and restarts the rig when a component stalls.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Once,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use frame_ingest::{spawn_source_reader, SyntheticScene};
use preproc::PreprocPipeline;
use stage_link::{stream_channel, MockStage, Position};
use tracing::{debug, error, info, warn};

use crate::rig::{
    config::RigConfig,
    estimator::intensity_centroid,
    stage::spawn_stage_worker,
    telemetry,
    watchdog::{
        spawn_watchdog, HealthComponent, RigHealth, WatchdogState, WATCHDOG_STALE_THRESHOLD_MS,
    },
};

/// Run the rig, automatically restarting on recoverable faults.
pub fn run(config: RigConfig) -> Result<()> {
    static CTRL_HANDLER: Once = Once::new();

    telemetry::init_tracing();
    let metrics_handle = telemetry::init_metrics_recorder();

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = shutdown.clone();
    CTRL_HANDLER.call_once(move || {
        if let Err(err) = ctrlc::set_handler(move || {
            handler_shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Failed to install Ctrl+C handler: {err}");
        }
    });

    let deadline = config.duration.map(|duration| Instant::now() + duration);

    let mut attempt: u32 = 0;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        match run_rig_once(&config, shutdown.clone(), deadline) {
            Ok(RigOutcome::Graceful) => break,
            Ok(RigOutcome::Restart(reason)) => {
                attempt = attempt.saturating_add(1);
                warn!("Rig watchdog requested restart (reason: {reason}), attempt #{attempt}");
                thread::sleep(Duration::from_secs(1));
            }
            Err(err) => {
                error!("Rig error: {err:?}");
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                attempt = attempt.saturating_add(1);
                thread::sleep(Duration::from_secs(1));
            }
        }
    }

    debug!("final metrics snapshot:\n{}", metrics_handle.render());
    Ok(())
}

/// Result of a single rig run attempt.
enum RigOutcome {
    Graceful,
    Restart(&'static str),
}

/// Execute the rig once, returning whether to exit or restart.
fn run_rig_once(
    config: &RigConfig,
    shutdown: Arc<AtomicBool>,
    deadline: Option<Instant>,
) -> Result<RigOutcome> {
    if shutdown.load(Ordering::SeqCst) {
        return Ok(RigOutcome::Graceful);
    }

    let rig_span = tracing::info_span!(
        "rig",
        width = config.width,
        height = config.height,
        fps = config.fps,
        method = config.preproc.method.as_str(),
        scale = config.preproc.image_scale,
    );
    let _rig_span_guard = rig_span.enter();

    let mut pipeline = PreprocPipeline::new(config.preproc.clone())
        .context("Invalid preprocessing configuration")?;

    let source = SyntheticScene::new(config.width, config.height);
    let frames = spawn_source_reader(Box::new(source), config.fps);

    let (position_tx, position_rx) = stream_channel::<Position>(config.capacity, config.policy);

    // A slow but healthy frame rate must not read as a stall.
    let stale_threshold_ms =
        WATCHDOG_STALE_THRESHOLD_MS.max((3_000.0 / config.fps).ceil() as u64);
    let health = Arc::new(RigHealth::new(stale_threshold_ms));
    let rig_running = Arc::new(AtomicBool::new(true));
    let watchdog_state = Arc::new(WatchdogState::new());

    let watchdog_handle = spawn_watchdog(
        health.clone(),
        rig_running.clone(),
        shutdown.clone(),
        watchdog_state.clone(),
    );

    let stage_handle = spawn_stage_worker(
        position_rx,
        MockStage::new(),
        config.stage_timeout,
        rig_running.clone(),
    );

    info!(
        "Rig running: {}x{} @ {} fps, method {}",
        config.width,
        config.height,
        config.fps,
        config.preproc.method.as_str()
    );

    let mut frame_number: u64 = 0;
    let mut smoothed_fps: f32 = 0.0;
    let mut last_instant = Instant::now();
    let mut restart_reason: Option<&'static str> = None;
    let mut failure: Option<anyhow::Error> = None;

    while rig_running.load(Ordering::Relaxed) {
        if shutdown.load(Ordering::Relaxed) {
            rig_running.store(false, Ordering::SeqCst);
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!("session duration elapsed");
            rig_running.store(false, Ordering::SeqCst);
            break;
        }

        let frame = match frames.recv() {
            Ok(Ok(frame)) => frame,
            Ok(Err(err)) => {
                error!("Capture error: {err}");
                restart_reason = Some("capture error");
                rig_running.store(false, Ordering::SeqCst);
                break;
            }
            Err(err) => {
                error!("Frame channel closed: {err}");
                restart_reason = Some("capture channel closed");
                rig_running.store(false, Ordering::SeqCst);
                break;
            }
        };

        health.beat(HealthComponent::Capture);
        frame_number = frame_number.wrapping_add(1);

        let now = Instant::now();
        let elapsed = now.duration_since(last_instant).as_secs_f32();
        last_instant = now;
        if elapsed > 0.0 {
            let instant_fps = 1.0 / elapsed;
            smoothed_fps = if smoothed_fps == 0.0 {
                instant_fps
            } else {
                0.9 * smoothed_fps + 0.1 * instant_fps
            };
            metrics::gauge!("looptrack_rig_fps").set(f64::from(smoothed_fps));
        }

        let processed = match pipeline.run(&frame) {
            Ok(processed) => processed,
            Err(err) => {
                failure = Some(anyhow::Error::new(err).context("Frame preprocessing failed"));
                rig_running.store(false, Ordering::SeqCst);
                break;
            }
        };
        health.beat(HealthComponent::Preproc);
        metrics::counter!("looptrack_frames_total").increment(1);

        if frame_number % 120 == 0 {
            debug!(
                "rig heartbeat: frame #{frame_number}, {smoothed_fps:.1} fps, queue depth {}",
                position_tx.len()
            );
            metrics::gauge!("looptrack_dropped_positions").set(position_tx.dropped() as f64);
        }

        match intensity_centroid(&processed) {
            Some(position) => {
                if position_tx.push(position).is_err() {
                    error!("Stage worker terminated unexpectedly");
                    restart_reason = Some("position channel disconnected");
                    rig_running.store(false, Ordering::SeqCst);
                    break;
                }
                metrics::gauge!("looptrack_queue_depth").set(position_tx.len() as f64);
                if config.verbose {
                    debug!(
                        frame = frame_number,
                        x = position.x,
                        y = position.y,
                        "position queued"
                    );
                }
            }
            None => debug!(frame = frame_number, "no foreground signal, skipping cycle"),
        }
    }

    debug!("Stopping rig");

    rig_running.store(false, Ordering::SeqCst);
    let dropped_positions = position_tx.dropped();
    // Closing the position stream lets the stage worker drain the backlog and
    // observe a deterministic end instead of waiting out its timeout.
    drop(position_tx);
    drop(frames);

    let report = stage_handle.join().ok().flatten();
    let _ = watchdog_handle.join();

    if let Some(report) = report {
        info!(
            frames = frame_number,
            positions = report.processed,
            dropped = dropped_positions,
            exit = ?report.exit,
            "rig session summary"
        );
    }

    if let Some(err) = failure {
        return Err(err);
    }

    if watchdog_state.is_triggered() {
        let reason = watchdog_state
            .reason()
            .map(|component| component.label())
            .unwrap_or("watchdog");
        return Ok(RigOutcome::Restart(reason));
    }

    if let Some(reason) = restart_reason {
        return Ok(RigOutcome::Restart(reason));
    }

    Ok(RigOutcome::Graceful)
}
