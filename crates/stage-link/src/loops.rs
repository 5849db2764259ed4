//! Producer and consumer loops around the stream channel.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use tracing::{debug, warn};

use crate::{
    actuator::{Actuator, ActuatorError},
    channel::{Pop, StreamReceiver, StreamSender},
    position::Position,
};

/// Why the consumer loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerExit {
    /// Every producer dropped its sender; deterministic completion.
    ChannelClosed,
    /// The queue stayed empty for a whole wait window. Historically treated
    /// as completion, but a producer stalled for longer than the timeout
    /// looks exactly the same — prefer closing the channel.
    TimedOut,
    /// The shared running flag was cleared externally.
    Stopped,
}

/// Summary returned by a finished consumer loop.
#[derive(Clone, Copy, Debug)]
pub struct ConsumerReport {
    pub processed: u64,
    pub exit: ConsumerExit,
}

/// Spawn a thread that pushes positions from `supply` until the supply ends,
/// the channel closes, or `running` clears. Returns the number pushed.
///
/// The sender moves into the thread, so a producer built with the only
/// sender closes the stream deterministically when it finishes.
pub fn spawn_position_producer<F>(
    sender: StreamSender<Position>,
    running: Arc<AtomicBool>,
    mut supply: F,
) -> thread::JoinHandle<u64>
where
    F: FnMut() -> Option<Position> + Send + 'static,
{
    thread::spawn(move || {
        let mut pushed = 0u64;
        while running.load(Ordering::Relaxed) {
            let position = match supply() {
                Some(position) => position,
                None => break,
            };
            if sender.push(position).is_err() {
                debug!("position receiver dropped, stopping producer");
                break;
            }
            pushed += 1;
        }
        pushed
    })
}

/// Drain the channel into the actuator until the stream ends.
///
/// Opens the actuator, then pops with a bounded wait: each value is forwarded
/// to `move_to` followed by a `get_position` readback, and `on_cycle` runs
/// once per value (heartbeat/metrics hook). The loop ends on channel close,
/// a timed-out wait, or a cleared running flag. The actuator is closed on
/// every exit path; actuator failures propagate unchanged and are never
/// mistaken for normal completion.
pub fn run_position_consumer<A, F>(
    receiver: &StreamReceiver<Position>,
    actuator: &mut A,
    timeout: Duration,
    running: &AtomicBool,
    mut on_cycle: F,
) -> Result<ConsumerReport, ActuatorError>
where
    A: Actuator + ?Sized,
    F: FnMut(&Position),
{
    actuator.open()?;
    let mut processed = 0u64;

    let exit = loop {
        if !running.load(Ordering::Relaxed) {
            break ConsumerExit::Stopped;
        }
        match receiver.pop(timeout) {
            Pop::Value(target) => {
                let reached = actuator
                    .move_to(target)
                    .and_then(|()| actuator.get_position());
                match reached {
                    Ok(reached) => {
                        debug!(x = reached.x, y = reached.y, "stage settled");
                        processed += 1;
                        on_cycle(&target);
                    }
                    Err(err) => {
                        let _ = actuator.close();
                        return Err(err);
                    }
                }
            }
            Pop::Empty => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "position queue idle for a full wait window, treating as end of stream"
                );
                break ConsumerExit::TimedOut;
            }
            Pop::Closed => break ConsumerExit::ChannelClosed,
        }
    };

    actuator.close()?;
    Ok(ConsumerReport { processed, exit })
}

/// Run the consumer loop on its own thread, taking exclusive ownership of the
/// actuator.
pub fn spawn_position_consumer<A>(
    receiver: StreamReceiver<Position>,
    mut actuator: A,
    timeout: Duration,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<Result<ConsumerReport, ActuatorError>>
where
    A: Actuator + 'static,
{
    thread::spawn(move || run_position_consumer(&receiver, &mut actuator, timeout, &running, |_| {}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MockStage;
    use crate::channel::{stream_channel, Capacity, OverflowPolicy};

    const TIMEOUT: Duration = Duration::from_millis(10);

    fn unbounded_channel() -> (StreamSender<Position>, StreamReceiver<Position>) {
        stream_channel(Capacity::Unbounded, OverflowPolicy::Block)
    }

    #[test]
    fn consumer_processes_backlog_then_times_out() {
        let (tx, rx) = unbounded_channel();
        for i in 0..5 {
            tx.push(Position::at(i as f64, 0.0, i)).unwrap();
        }

        let mut stage = MockStage::new();
        let running = AtomicBool::new(true);
        let report = run_position_consumer(&rx, &mut stage, TIMEOUT, &running, |_| {}).unwrap();

        assert_eq!(report.processed, 5);
        assert_eq!(report.exit, ConsumerExit::TimedOut);
        assert_eq!(stage.moves(), 5);
        assert!(!stage.is_open(), "actuator must be closed on exit");
        drop(tx);
    }

    #[test]
    fn closed_channel_ends_the_consumer_deterministically() {
        let (tx, rx) = unbounded_channel();
        for i in 0..3 {
            tx.push(Position::at(0.0, i as f64, i)).unwrap();
        }
        drop(tx);

        let mut stage = MockStage::new();
        let running = AtomicBool::new(true);
        // A generous timeout: termination must come from the close, not the
        // clock.
        let report =
            run_position_consumer(&rx, &mut stage, Duration::from_secs(30), &running, |_| {})
                .unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.exit, ConsumerExit::ChannelClosed);
    }

    #[test]
    fn cleared_running_flag_stops_the_consumer() {
        let (_tx, rx) = unbounded_channel();
        let mut stage = MockStage::new();
        let running = AtomicBool::new(false);
        let report = run_position_consumer(&rx, &mut stage, TIMEOUT, &running, |_| {}).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.exit, ConsumerExit::Stopped);
        assert!(!stage.is_open());
    }

    #[test]
    fn on_cycle_runs_once_per_value() {
        let (tx, rx) = unbounded_channel();
        for i in 0..4 {
            tx.push(Position::at(i as f64, i as f64, i)).unwrap();
        }
        let mut stage = MockStage::new();
        let running = AtomicBool::new(true);
        let mut cycles = 0u64;
        let report = run_position_consumer(&rx, &mut stage, TIMEOUT, &running, |_| cycles += 1)
            .unwrap();
        assert_eq!(report.processed, 4);
        assert_eq!(cycles, 4);
        drop(tx);
    }

    /// Fails on the nth move to exercise error propagation.
    struct FaultyStage {
        inner: MockStage,
        fail_on_move: u64,
    }

    impl Actuator for FaultyStage {
        fn name(&self) -> &str {
            "faulty-stage"
        }

        fn open(&mut self) -> Result<(), ActuatorError> {
            self.inner.open()
        }

        fn move_to(&mut self, target: Position) -> Result<(), ActuatorError> {
            if self.inner.moves() + 1 == self.fail_on_move {
                return Err(ActuatorError::Fault("axis jammed".to_string()));
            }
            self.inner.move_to(target)
        }

        fn get_position(&mut self) -> Result<Position, ActuatorError> {
            self.inner.get_position()
        }

        fn close(&mut self) -> Result<(), ActuatorError> {
            self.inner.close()
        }
    }

    #[test]
    fn actuator_faults_propagate_instead_of_ending_quietly() {
        let (tx, rx) = unbounded_channel();
        for i in 0..5 {
            tx.push(Position::at(i as f64, 0.0, i)).unwrap();
        }

        let mut stage = FaultyStage {
            inner: MockStage::new(),
            fail_on_move: 3,
        };
        let running = AtomicBool::new(true);
        let err =
            run_position_consumer(&rx, &mut stage, TIMEOUT, &running, |_| {}).unwrap_err();
        assert!(matches!(err, ActuatorError::Fault(_)));
        assert!(!stage.inner.is_open(), "stage closed before propagating");
        drop(tx);
    }

    #[test]
    fn producer_thread_pushes_its_whole_supply() {
        let (tx, rx) = unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let mut remaining = 5u32;
        let handle = spawn_position_producer(tx, running, move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            Some(Position::at(f64::from(remaining), 0.0, 0))
        });

        assert_eq!(handle.join().unwrap(), 5);
        // The producer owned the only sender, so the stream is now closed.
        let mut seen = 0;
        loop {
            match rx.pop(TIMEOUT) {
                Pop::Value(_) => seen += 1,
                Pop::Closed => break,
                Pop::Empty => panic!("stream should be closed"),
            }
        }
        assert_eq!(seen, 5);
    }
}
