//! Position streaming between the acquisition and actuation contexts.
//!
//! The stream channel is the single synchronization point between the two
//! workers: the producer pushes positions as they are computed, the consumer
//! drains them into an actuator it owns exclusively. Channel close (every
//! sender dropped) is the deterministic end-of-stream signal; the bounded pop
//! timeout is kept as a liveness heuristic but reported distinctly, since a
//! stalled producer is indistinguishable from a finished one by silence
//! alone.

pub use actuator::{Actuator, ActuatorError, MockStage};
pub use channel::{
    stream_channel, Capacity, ChannelClosed, OverflowPolicy, Pop, StreamReceiver, StreamSender,
};
pub use loops::{
    run_position_consumer, spawn_position_consumer, spawn_position_producer, ConsumerExit,
    ConsumerReport,
};
pub use position::Position;

mod actuator;
mod channel;
mod loops;
mod position;
