use std::{
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::debug;

use crate::types::{CaptureError, Frame};

/// Camera-facing boundary. Hardware drivers implement this; the rest of the
/// rig only ever sees frames coming out of [`spawn_source_reader`].
pub trait FrameSource: Send {
    /// Identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Produce the next frame. Dimensions must stay fixed for the session.
    fn acquire_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Spawns a background thread that continually acquires frames from `source`.
///
/// Frames are paced to `fps` and forwarded over the returned [`Receiver`]. The
/// buffer is intentionally small to backpressure the acquisition loop when
/// downstream consumers fall behind. The thread stops when the receiver is
/// dropped or the source fails; a failure is forwarded before shutting down.
pub fn spawn_source_reader(
    source: Box<dyn FrameSource>,
    fps: f64,
) -> Receiver<Result<Frame, CaptureError>> {
    let (tx, rx) = bounded(2);
    thread::spawn(move || acquire_loop(source, fps, tx));
    rx
}

fn acquire_loop(
    mut source: Box<dyn FrameSource>,
    fps: f64,
    tx: Sender<Result<Frame, CaptureError>>,
) {
    let frame_interval = if fps > 0.0 {
        Duration::from_secs_f64(1.0 / fps)
    } else {
        Duration::ZERO
    };

    loop {
        let started = Instant::now();
        match source.acquire_frame() {
            Ok(frame) => {
                if tx.send(Ok(frame)).is_err() {
                    debug!("frame receiver dropped, stopping {} reader", source.name());
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err));
                break;
            }
        }
        let elapsed = started.elapsed();
        if elapsed < frame_interval {
            thread::sleep(frame_interval - elapsed);
        }
    }
}
