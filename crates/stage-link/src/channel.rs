//! FIFO hand-off queue between the producer and consumer contexts.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use thiserror::Error;

/// Queue capacity between producer and consumer.
///
/// `Unbounded` applies no backpressure: a slow consumer grows the queue
/// without limit in the producer's address space, acceptable only when
/// sessions are short and bounded. `Bounded` is the recommended explicit
/// limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capacity {
    Unbounded,
    Bounded(usize),
}

/// What a bounded sender does when the queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Wait for the consumer to drain a slot.
    #[default]
    Block,
    /// Discard the incoming value and count it.
    DropNewest,
}

/// Returned when pushing after every receiver has been dropped.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("stream channel closed")]
pub struct ChannelClosed;

/// Result of a bounded-wait pop.
#[derive(Debug, PartialEq)]
pub enum Pop<T> {
    /// A value arrived within the wait window.
    Value(T),
    /// Nothing arrived before the timeout; the producer may be slow or gone.
    Empty,
    /// Every sender has been dropped; no more values will ever arrive.
    Closed,
}

/// Create a FIFO stream channel.
///
/// `policy` only matters for [`Capacity::Bounded`]; an unbounded queue is
/// never full.
pub fn stream_channel<T>(
    capacity: Capacity,
    policy: OverflowPolicy,
) -> (StreamSender<T>, StreamReceiver<T>) {
    let (tx, rx) = match capacity {
        Capacity::Unbounded => unbounded(),
        Capacity::Bounded(slots) => bounded(slots),
    };
    (
        StreamSender {
            tx,
            policy,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        StreamReceiver { rx },
    )
}

/// Producer endpoint. Cloneable; concurrent pushes serialize in FIFO order.
pub struct StreamSender<T> {
    tx: Sender<T>,
    policy: OverflowPolicy,
    dropped: Arc<AtomicU64>,
}

impl<T> Clone for StreamSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            policy: self.policy,
            dropped: self.dropped.clone(),
        }
    }
}

impl<T> StreamSender<T> {
    /// Push a value onto the queue, relinquishing ownership.
    ///
    /// Unbounded channels never block. Bounded channels follow the overflow
    /// policy: `Block` waits for a free slot, `DropNewest` discards `value`
    /// and increments the drop counter.
    pub fn push(&self, value: T) -> Result<(), ChannelClosed> {
        match self.policy {
            OverflowPolicy::Block => self.tx.send(value).map_err(|_| ChannelClosed),
            OverflowPolicy::DropNewest => match self.tx.try_send(value) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(TrySendError::Disconnected(_)) => Err(ChannelClosed),
            },
        }
    }

    /// Values discarded so far under [`OverflowPolicy::DropNewest`].
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Values queued and not yet popped.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer endpoint.
pub struct StreamReceiver<T> {
    rx: Receiver<T>,
}

impl<T> StreamReceiver<T> {
    /// Wait up to `timeout` for the next value.
    ///
    /// [`Pop::Closed`] is the deterministic end-of-stream signal.
    /// [`Pop::Empty`] only means the wait window elapsed.
    pub fn pop(&self, timeout: Duration) -> Pop<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Pop::Value(value),
            Err(RecvTimeoutError::Timeout) => Pop::Empty,
            Err(RecvTimeoutError::Disconnected) => Pop::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT_WAIT: Duration = Duration::from_millis(10);

    #[test]
    fn values_pop_in_push_order() {
        let (tx, rx) = stream_channel(Capacity::Unbounded, OverflowPolicy::Block);
        for value in [1, 2, 3] {
            tx.push(value).unwrap();
        }
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Value(1));
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Value(2));
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Value(3));
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Empty);
    }

    #[test]
    fn dropping_all_senders_closes_the_stream() {
        let (tx, rx) = stream_channel(Capacity::Unbounded, OverflowPolicy::Block);
        let tx2 = tx.clone();
        tx.push(9).unwrap();
        drop(tx);
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Value(9));
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Empty, "a live sender remains");
        drop(tx2);
        assert_eq!(rx.pop(Duration::from_secs(5)), Pop::Closed);
    }

    #[test]
    fn push_fails_once_the_receiver_is_gone() {
        let (tx, rx) = stream_channel(Capacity::Unbounded, OverflowPolicy::Block);
        drop(rx);
        assert_eq!(tx.push(1), Err(ChannelClosed));
    }

    #[test]
    fn drop_newest_discards_and_counts_overflow() {
        let (tx, rx) = stream_channel(Capacity::Bounded(2), OverflowPolicy::DropNewest);
        for value in 0..5 {
            tx.push(value).unwrap();
        }
        assert_eq!(tx.dropped(), 3);
        assert_eq!(tx.len(), 2);
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Value(0));
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Value(1));
        assert_eq!(rx.pop(SHORT_WAIT), Pop::Empty);
    }

    #[test]
    fn multiple_producers_serialize_onto_one_stream() {
        let (tx, rx) = stream_channel(Capacity::Unbounded, OverflowPolicy::Block);
        let tx2 = tx.clone();
        let writer = std::thread::spawn(move || {
            for value in 0..100 {
                tx2.push(value).unwrap();
            }
        });
        for value in 100..200 {
            tx.push(value).unwrap();
        }
        writer.join().unwrap();
        drop(tx);

        let mut seen = Vec::new();
        loop {
            match rx.pop(SHORT_WAIT) {
                Pop::Value(value) => seen.push(value),
                Pop::Closed => break,
                Pop::Empty => panic!("stream should already be closed"),
            }
        }
        assert_eq!(seen.len(), 200);
        // Each producer's own values must still arrive in its push order.
        let low: Vec<_> = seen.iter().copied().filter(|v| *v < 100).collect();
        let high: Vec<_> = seen.iter().copied().filter(|v| *v >= 100).collect();
        assert_eq!(low, (0..100).collect::<Vec<_>>());
        assert_eq!(high, (100..200).collect::<Vec<_>>());
    }
}
