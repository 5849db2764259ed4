use std::str::FromStr;

use crate::error::PreprocError;

/// Background model run after the prefilter stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackgroundMethod {
    /// Prefilter only; no model, no state.
    Off,
    /// Exponentially smoothed running average with absolute-difference output.
    RunningAverage,
    /// Adaptive KNN subtractor.
    Knn,
    /// Adaptive Gaussian-mixture (MOG2) subtractor.
    Mog2,
}

impl BackgroundMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            BackgroundMethod::Off => "off",
            BackgroundMethod::RunningAverage => "running-average",
            BackgroundMethod::Knn => "knn",
            BackgroundMethod::Mog2 => "mog2",
        }
    }
}

impl FromStr for BackgroundMethod {
    type Err = PreprocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(BackgroundMethod::Off),
            "running-average" => Ok(BackgroundMethod::RunningAverage),
            "knn" => Ok(BackgroundMethod::Knn),
            "mog2" => Ok(BackgroundMethod::Mog2),
            other => Err(PreprocError::UnknownMethod(other.to_string())),
        }
    }
}

/// Canonical preprocessing parameters shared by every stage.
///
/// Each field documents its valid range; [`PreprocConfig::validate`] rejects
/// anything outside it rather than clamping.
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocConfig {
    /// Downscale factor applied before all other steps (0.01..=1.0).
    pub image_scale: f64,
    /// Box smoothing kernel size in pixels; 0 disables smoothing.
    pub filter_size: i32,
    /// Invert sample intensities (`v -> 255 - v`).
    pub color_invert: bool,
    /// Exponential smoothing rate for the running-average model (0.001..=1.0).
    pub learning_rate: f64,
    /// Refresh the running-average model once every this many frames (1..=1000).
    pub learn_every: u32,
    /// Which background model to run after the prefilter.
    pub method: BackgroundMethod,
    /// Decision threshold for the adaptive subtractors (> 0).
    pub threshold: f64,
}

impl Default for PreprocConfig {
    fn default() -> Self {
        Self {
            image_scale: 1.0,
            filter_size: 0,
            color_invert: false,
            learning_rate: 0.01,
            learn_every: 1,
            method: BackgroundMethod::Off,
            threshold: 128.0,
        }
    }
}

impl PreprocConfig {
    /// Check every parameter against its declared range.
    pub fn validate(&self) -> Result<(), PreprocError> {
        if !(0.01..=1.0).contains(&self.image_scale) {
            return Err(PreprocError::Config {
                name: "image_scale",
                value: self.image_scale.to_string(),
                range: "within 0.01..=1.0",
            });
        }
        if self.filter_size < 0 {
            return Err(PreprocError::Config {
                name: "filter_size",
                value: self.filter_size.to_string(),
                range: ">= 0",
            });
        }
        if !(0.001..=1.0).contains(&self.learning_rate) {
            return Err(PreprocError::Config {
                name: "learning_rate",
                value: self.learning_rate.to_string(),
                range: "within 0.001..=1.0",
            });
        }
        if !(1..=1000).contains(&self.learn_every) {
            return Err(PreprocError::Config {
                name: "learn_every",
                value: self.learn_every.to_string(),
                range: "within 1..=1000",
            });
        }
        if self.threshold <= 0.0 {
            return Err(PreprocError::Config {
                name: "threshold",
                value: self.threshold.to_string(),
                range: "> 0",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_error_name(config: &PreprocConfig) -> &'static str {
        match config.validate() {
            Err(PreprocError::Config { name, .. }) => name,
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PreprocConfig::default().validate().is_ok());
    }

    #[test]
    fn learning_rate_bounds_are_enforced() {
        let mut config = PreprocConfig::default();
        config.learning_rate = 0.0;
        assert_eq!(config_error_name(&config), "learning_rate");
        config.learning_rate = 1.5;
        assert_eq!(config_error_name(&config), "learning_rate");
        config.learning_rate = 0.001;
        assert!(config.validate().is_ok());
        config.learning_rate = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn image_scale_bounds_are_enforced() {
        let mut config = PreprocConfig::default();
        config.image_scale = 0.005;
        assert_eq!(config_error_name(&config), "image_scale");
        config.image_scale = 1.2;
        assert_eq!(config_error_name(&config), "image_scale");
        config.image_scale = 0.01;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn remaining_bounds_are_enforced() {
        let mut config = PreprocConfig::default();
        config.filter_size = -1;
        assert_eq!(config_error_name(&config), "filter_size");

        let mut config = PreprocConfig::default();
        config.learn_every = 0;
        assert_eq!(config_error_name(&config), "learn_every");
        config.learn_every = 1001;
        assert_eq!(config_error_name(&config), "learn_every");

        let mut config = PreprocConfig::default();
        config.threshold = 0.0;
        assert_eq!(config_error_name(&config), "threshold");
    }

    #[test]
    fn method_names_round_trip() {
        for method in [
            BackgroundMethod::Off,
            BackgroundMethod::RunningAverage,
            BackgroundMethod::Knn,
            BackgroundMethod::Mog2,
        ] {
            assert_eq!(method.as_str().parse::<BackgroundMethod>().unwrap(), method);
        }
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = "median".parse::<BackgroundMethod>().unwrap_err();
        assert!(matches!(err, PreprocError::UnknownMethod(name) if name == "median"));
    }
}
