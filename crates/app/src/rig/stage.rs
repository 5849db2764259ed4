use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use stage_link::{run_position_consumer, Actuator, ConsumerReport, Position, StreamReceiver};
use tracing::{error, info};

/// Spawn the consumer thread that drives the actuator from the position
/// queue.
///
/// The actuator moves into the thread and nothing else touches it. The worker
/// clears `running` when its loop ends so the acquisition side winds down
/// too.
pub(crate) fn spawn_stage_worker<A>(
    receiver: StreamReceiver<Position>,
    mut actuator: A,
    timeout: Duration,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<Option<ConsumerReport>>
where
    A: Actuator + 'static,
{
    thread::Builder::new()
        .name("rig-stage".into())
        .spawn(move || {
            let result = run_position_consumer(&receiver, &mut actuator, timeout, &running, |_| {
                metrics::counter!("looptrack_stage_moves_total").increment(1);
            });
            running.store(false, Ordering::SeqCst);
            match result {
                Ok(report) => {
                    info!(
                        processed = report.processed,
                        exit = ?report.exit,
                        "stage worker finished"
                    );
                    Some(report)
                }
                Err(err) => {
                    error!("Stage worker failed: {err}");
                    None
                }
            }
        })
        .expect("failed to spawn stage worker thread")
}
