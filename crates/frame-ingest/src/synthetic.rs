use chrono::Utc;

use crate::source::FrameSource;
use crate::types::{CaptureError, Frame};

/// Bright spot orbiting the centre of a dark field.
///
/// Stands in for a camera when exercising the rig without hardware: the spot
/// gives the background models a moving foreground to separate and the
/// estimator something to follow.
pub struct SyntheticScene {
    width: i32,
    height: i32,
    angle: f64,
}

const BACKGROUND_LEVEL: u8 = 16;
const SPOT_LEVEL: u8 = 230;
const ANGLE_STEP: f64 = 0.05;

impl SyntheticScene {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            angle: 0.0,
        }
    }

    fn render(&self) -> Vec<u8> {
        let (w, h) = (self.width as f64, self.height as f64);
        let orbit = w.min(h) / 4.0;
        let radius = (w.min(h) / 16.0).max(2.0);
        let cx = w / 2.0 + orbit * self.angle.cos();
        let cy = h / 2.0 + orbit * self.angle.sin();

        let mut data = vec![BACKGROUND_LEVEL; (self.width * self.height) as usize];
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = f64::from(x) - cx;
                let dy = f64::from(y) - cy;
                if dx * dx + dy * dy <= radius * radius {
                    data[(y * self.width + x) as usize] = SPOT_LEVEL;
                }
            }
        }
        data
    }
}

impl FrameSource for SyntheticScene {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn acquire_frame(&mut self) -> Result<Frame, CaptureError> {
        let data = self.render();
        self.angle = (self.angle + ANGLE_STEP) % std::f64::consts::TAU;
        Frame::gray(self.width, self.height, data, Utc::now().timestamp_millis())
    }
}
