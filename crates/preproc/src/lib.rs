//! Frame preprocessing: a stateless prefilter stage plus swappable
//! background-subtraction models.
//!
//! Model state is a value threaded explicitly through [`process`]; nothing is
//! hidden inside a stage object, so swapping or resetting a model at runtime
//! amounts to replacing the state for the next call. [`PreprocPipeline`]
//! wraps that contract for callers that want the state carried for them.
//!
//! The module is split into focused submodules:
//! - `config`: parameter set, bounds, and validation.
//! - `ops`: per-frame image operations (resize, smooth, invert, diff).
//! - `background`: the running-average and adaptive background models.
//! - `pipeline`: stage/model orchestration and the state-threading contract.

pub use background::{AdaptiveMethod, AdaptiveModel, RunningAverage};
pub use config::{BackgroundMethod, PreprocConfig};
pub use error::PreprocError;
pub use pipeline::{prefilter, process, ModelState, PreprocPipeline};

mod background;
mod config;
mod error;
mod ops;
mod pipeline;
