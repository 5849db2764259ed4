use anyhow::Error;
use thiserror::Error;

/// Single grayscale frame acquired from a video source.
///
/// Samples are row-major, one byte per pixel. Dimensions are fixed for the
/// lifetime of an acquisition session; only deterministic scaling inside the
/// preprocessing pipeline may change them downstream.
#[derive(Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub timestamp_ms: i64,
    pub format: FrameFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFormat {
    Gray8,
}

impl Frame {
    /// Build a grayscale frame, verifying the buffer matches the dimensions.
    pub fn gray(
        width: i32,
        height: i32,
        data: Vec<u8>,
        timestamp_ms: i64,
    ) -> Result<Self, CaptureError> {
        if width <= 0 || height <= 0 || data.len() != (width as usize) * (height as usize) {
            return Err(CaptureError::BadFrame {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_ms,
            format: FrameFormat::Gray8,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn same_dimensions(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open frame source {name:?}")]
    Open { name: String },
    #[error("frame buffer of {len} bytes does not match {width}x{height}")]
    BadFrame { width: i32, height: i32, len: usize },
    #[error(transparent)]
    Other(#[from] Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_rejects_mismatched_buffer() {
        let err = Frame::gray(4, 4, vec![0u8; 15], 0);
        assert!(matches!(
            err,
            Err(CaptureError::BadFrame { width: 4, height: 4, len: 15 })
        ));
    }

    #[test]
    fn gray_rejects_degenerate_dimensions() {
        assert!(Frame::gray(0, 4, vec![], 0).is_err());
        assert!(Frame::gray(4, -1, vec![], 0).is_err());
    }

    #[test]
    fn same_dimensions_compares_shape_only() {
        let a = Frame::gray(4, 2, vec![0u8; 8], 0).unwrap();
        let b = Frame::gray(4, 2, vec![255u8; 8], 99).unwrap();
        let c = Frame::gray(2, 4, vec![0u8; 8], 0).unwrap();
        assert!(a.same_dimensions(&b));
        assert!(!a.same_dimensions(&c));
    }
}
