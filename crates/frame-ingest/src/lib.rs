//! Frame acquisition boundary for the looptrack rig.
//!
//! Camera drivers live behind the [`FrameSource`] trait; this crate owns the
//! shared [`Frame`] type, the background reader thread that paces a source
//! into a bounded channel, and a synthetic scene for running the rig without
//! hardware.

pub use source::{spawn_source_reader, FrameSource};
pub use synthetic::SyntheticScene;
pub use types::{CaptureError, Frame, FrameFormat};

mod source;
mod synthetic;
mod types;
