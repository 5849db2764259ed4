//! Stateful background models.
//!
//! Both variants keep their mutable model in an explicit state value owned by
//! exactly one pipeline. The running average keeps separate update and
//! subtract steps so the model can adapt slowly under fast foreground
//! extraction; the adaptive models update and mask in a single call.

use frame_ingest::Frame;
use opencv::{
    core::{Mat, Ptr},
    prelude::*,
    video,
};
use tracing::trace;

use crate::{error::PreprocError, ops};

/// Running estimate of the static scene, blended at a configurable cadence.
///
/// The accumulator is seeded from the first frame it sees. Afterwards the
/// cyclic counter advances on every update and the accumulator blends by
/// exponential smoothing only when the counter wraps, so `learn_every`
/// controls adaptation cost independently of the per-frame subtraction.
#[derive(Clone, Default)]
pub struct RunningAverage {
    accumulator: Option<Vec<u8>>,
    width: i32,
    height: i32,
    tick: u32,
}

impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `frame` can feed this model without reshaping it.
    pub fn accepts(&self, frame: &Frame) -> bool {
        self.accumulator.is_none() || (self.width == frame.width && self.height == frame.height)
    }

    /// Advance the model by one frame.
    ///
    /// `learn_every` must be at least 1 (enforced by config validation).
    pub fn update(&mut self, frame: &Frame, learn_every: u32, learning_rate: f64) {
        match self.accumulator.as_mut() {
            None => {
                self.accumulator = Some(frame.data.clone());
                self.width = frame.width;
                self.height = frame.height;
            }
            Some(accumulator) if self.tick == 0 => {
                trace!("blending frame into background accumulator");
                for (a, &v) in accumulator.iter_mut().zip(&frame.data) {
                    *a = (f64::from(v) * learning_rate + f64::from(*a) * (1.0 - learning_rate))
                        as u8;
                }
            }
            Some(_) => {}
        }
        self.tick = (self.tick + 1) % learn_every;
    }

    /// Absolute per-sample difference between `frame` and the background
    /// estimate, independent of whether an update blended this cycle.
    pub fn subtract(&self, frame: &Frame) -> Frame {
        match &self.accumulator {
            Some(accumulator) => ops::absdiff(frame, accumulator),
            None => frame.clone(),
        }
    }

    /// Drop the accumulated background and reseed on the next update.
    pub fn reset(&mut self) {
        self.accumulator = None;
        self.tick = 0;
    }
}

/// Method implemented by an adaptive subtractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdaptiveMethod {
    Knn,
    Mog2,
}

/// History length handed to the OpenCV subtractors.
const ADAPTIVE_HISTORY: i32 = 500;

/// Adaptive statistical background model backed by OpenCV.
///
/// Construction records the parameters it was built for; any difference in
/// `method` or `threshold` on a later frame must construct a fresh model
/// rather than reconfigure this one, so two algorithms' histories never mix.
pub struct AdaptiveModel {
    method: AdaptiveMethod,
    threshold: f64,
    subtractor: Subtractor,
    frames_seen: u64,
}

enum Subtractor {
    Knn(Ptr<video::BackgroundSubtractorKNN>),
    Mog2(Ptr<video::BackgroundSubtractorMOG2>),
}

impl AdaptiveModel {
    pub fn new(method: AdaptiveMethod, threshold: f64) -> Result<Self, PreprocError> {
        let subtractor = match method {
            AdaptiveMethod::Knn => Subtractor::Knn(video::create_background_subtractor_knn(
                ADAPTIVE_HISTORY,
                threshold,
                false,
            )?),
            AdaptiveMethod::Mog2 => Subtractor::Mog2(video::create_background_subtractor_mog2(
                ADAPTIVE_HISTORY,
                threshold,
                false,
            )?),
        };
        Ok(Self {
            method,
            threshold,
            subtractor,
            frames_seen: 0,
        })
    }

    /// True when this model was built for exactly these parameters.
    pub fn matches(&self, method: AdaptiveMethod, threshold: f64) -> bool {
        self.method == method && self.threshold == threshold
    }

    pub fn method(&self) -> AdaptiveMethod {
        self.method
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Frames folded into the statistics since construction.
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Update the model statistics and return the foreground mask, in one
    /// call.
    pub fn apply(&mut self, frame: &Frame) -> Result<Frame, PreprocError> {
        let src = ops::to_mat(frame)?;
        let mut mask = Mat::default();
        match &mut self.subtractor {
            Subtractor::Knn(subtractor) => {
                BackgroundSubtractorTrait::apply(subtractor, &src, &mut mask, -1.0)?
            }
            Subtractor::Mog2(subtractor) => {
                BackgroundSubtractorTrait::apply(subtractor, &src, &mut mask, -1.0)?
            }
        }
        self.frames_seen += 1;
        ops::from_mat(&mask, frame.timestamp_ms)
    }
}
