//! Stage/model orchestration with explicitly threaded state.

use frame_ingest::Frame;
use tracing::debug;

use crate::{
    background::{AdaptiveMethod, AdaptiveModel, RunningAverage},
    config::{BackgroundMethod, PreprocConfig},
    error::PreprocError,
    ops,
};

/// Mutable model state carried between frames.
///
/// Always threaded through [`process`] by value and never shared between
/// execution contexts, so a pipeline can be reset or relocated by replacing
/// the state wholesale.
pub enum ModelState {
    RunningAverage(RunningAverage),
    Adaptive(AdaptiveModel),
}

/// Stateless prefilter: optional area resize, box smoothing and inversion,
/// applied in that fixed order.
pub fn prefilter(frame: &Frame, config: &PreprocConfig) -> Result<Frame, PreprocError> {
    let mut out = None;
    if config.image_scale != 1.0 {
        out = Some(ops::resize_area(frame, config.image_scale)?);
    }
    if config.filter_size > 0 {
        out = Some(ops::box_smooth(out.as_ref().unwrap_or(frame), config.filter_size)?);
    }
    if config.color_invert {
        out = Some(ops::invert(out.as_ref().unwrap_or(frame)));
    }
    Ok(out.unwrap_or_else(|| frame.clone()))
}

/// Run one frame through the prefilter and the configured background model.
///
/// `state` is whatever the previous call returned. A state that no longer
/// fits the configuration — wrong variant, changed method or threshold, or a
/// frame shape the model was not built for — is discarded and rebuilt here,
/// never surfaced to the caller. `config` must have passed
/// [`PreprocConfig::validate`].
pub fn process(
    frame: &Frame,
    state: Option<ModelState>,
    config: &PreprocConfig,
) -> Result<(Frame, Option<ModelState>), PreprocError> {
    let staged = prefilter(frame, config)?;

    match config.method {
        BackgroundMethod::Off => Ok((staged, None)),
        BackgroundMethod::RunningAverage => {
            let mut model = match state {
                Some(ModelState::RunningAverage(model)) if model.accepts(&staged) => model,
                _ => {
                    debug!("starting fresh running-average model");
                    RunningAverage::new()
                }
            };
            model.update(&staged, config.learn_every, config.learning_rate);
            let out = model.subtract(&staged);
            Ok((out, Some(ModelState::RunningAverage(model))))
        }
        BackgroundMethod::Knn | BackgroundMethod::Mog2 => {
            let method = if config.method == BackgroundMethod::Knn {
                AdaptiveMethod::Knn
            } else {
                AdaptiveMethod::Mog2
            };
            let mut model = match state {
                Some(ModelState::Adaptive(model)) if model.matches(method, config.threshold) => {
                    model
                }
                _ => {
                    debug!(
                        method = ?method,
                        threshold = config.threshold,
                        "building adaptive subtractor"
                    );
                    AdaptiveModel::new(method, config.threshold)?
                }
            };
            let out = model.apply(&staged)?;
            Ok((out, Some(ModelState::Adaptive(model))))
        }
    }
}

/// Owns the active configuration and the model state across frames.
///
/// One instance per acquisition session; never shared between execution
/// contexts.
pub struct PreprocPipeline {
    config: PreprocConfig,
    state: Option<ModelState>,
}

impl std::fmt::Debug for PreprocPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreprocPipeline")
            .field("config", &self.config)
            .field("has_state", &self.state.is_some())
            .finish()
    }
}

impl PreprocPipeline {
    /// Validates `config` up front; a parameter outside its declared range
    /// aborts construction before any frame is processed.
    pub fn new(config: PreprocConfig) -> Result<Self, PreprocError> {
        config.validate()?;
        Ok(Self {
            config,
            state: None,
        })
    }

    pub fn config(&self) -> &PreprocConfig {
        &self.config
    }

    /// Swap the configuration at runtime. Model state that no longer fits the
    /// new parameters is replaced on the next frame, not mutated in place.
    pub fn set_config(&mut self, config: PreprocConfig) -> Result<(), PreprocError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Drop any accumulated model state.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Process one frame, carrying the model state to the next call.
    pub fn run(&mut self, frame: &Frame) -> Result<Frame, PreprocError> {
        let (out, next) = process(frame, self.state.take(), &self.config)?;
        self.state = next;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame() -> Frame {
        let data: Vec<u8> = (0..64).map(|i| (i * 3) as u8).collect();
        Frame::gray(8, 8, data, 11).unwrap()
    }

    fn neutral_config() -> PreprocConfig {
        PreprocConfig {
            image_scale: 1.0,
            filter_size: 0,
            color_invert: false,
            ..PreprocConfig::default()
        }
    }

    #[test]
    fn neutral_prefilter_is_identity() {
        let frame = gradient_frame();
        let (out, state) = process(&frame, None, &neutral_config()).unwrap();
        assert_eq!(out.data, frame.data);
        assert_eq!((out.width, out.height), (frame.width, frame.height));
        assert!(state.is_none());
    }

    #[test]
    fn inversion_is_involutive() {
        let frame = gradient_frame();
        let mut config = neutral_config();
        config.color_invert = true;

        let (once, _) = process(&frame, None, &config).unwrap();
        assert_ne!(once.data, frame.data);
        let (twice, _) = process(&once, None, &config).unwrap();
        assert_eq!(twice.data, frame.data);
    }

    #[test]
    fn running_average_zeroes_a_constant_scene() {
        let frame = Frame::gray(8, 8, vec![77; 64], 0).unwrap();
        let mut config = neutral_config();
        config.method = BackgroundMethod::RunningAverage;
        config.learn_every = 3;

        let mut state = None;
        for _ in 0..3 {
            let (out, next) = process(&frame, state, &config).unwrap();
            assert!(out.data.iter().all(|&v| v == 0));
            state = next;
        }
        assert!(matches!(state, Some(ModelState::RunningAverage(_))));
    }

    #[test]
    fn switching_method_off_drops_the_model_state() {
        let frame = gradient_frame();
        let mut config = neutral_config();
        config.method = BackgroundMethod::RunningAverage;

        let (_, state) = process(&frame, None, &config).unwrap();
        assert!(state.is_some());

        config.method = BackgroundMethod::Off;
        let (out, state) = process(&frame, state, &config).unwrap();
        assert!(state.is_none());
        assert_eq!(out.data, frame.data);
    }

    #[test]
    fn pipeline_rejects_invalid_config_before_any_frame() {
        let mut config = neutral_config();
        config.learning_rate = 1.5;
        let err = PreprocPipeline::new(config).unwrap_err();
        assert!(matches!(
            err,
            PreprocError::Config {
                name: "learning_rate",
                ..
            }
        ));
    }

    #[test]
    fn pipeline_carries_state_between_runs() {
        let frame = Frame::gray(8, 8, vec![50; 64], 0).unwrap();
        let mut config = neutral_config();
        config.method = BackgroundMethod::RunningAverage;

        let mut pipeline = PreprocPipeline::new(config).unwrap();
        for _ in 0..5 {
            let out = pipeline.run(&frame).unwrap();
            assert!(out.data.iter().all(|&v| v == 0));
        }

        pipeline.reset();
        let out = pipeline.run(&frame).unwrap();
        assert!(out.data.iter().all(|&v| v == 0));
    }
}
