//! Per-frame image operations.
//!
//! OpenCV handles resampling and smoothing; inversion and differencing are
//! plain element arithmetic.

use frame_ingest::{Frame, FrameFormat};
use opencv::{
    core::{self, Mat, MatTraitConstManual, Point, Size},
    imgproc,
    prelude::*,
};

use crate::error::PreprocError;

/// Copy a frame into an owned single-channel `Mat`.
pub(crate) fn to_mat(frame: &Frame) -> Result<Mat, PreprocError> {
    let flat = Mat::from_slice(&frame.data)?;
    Ok(flat.reshape(1, frame.height)?.try_clone()?)
}

/// Copy a single-channel `Mat` back into a frame, keeping the timestamp.
pub(crate) fn from_mat(mat: &Mat, timestamp_ms: i64) -> Result<Frame, PreprocError> {
    Ok(Frame {
        data: mat.data_bytes()?.to_vec(),
        width: mat.cols(),
        height: mat.rows(),
        timestamp_ms,
        format: FrameFormat::Gray8,
    })
}

/// Area-averaging resample by `scale` in both axes.
pub(crate) fn resize_area(frame: &Frame, scale: f64) -> Result<Frame, PreprocError> {
    let src = to_mat(frame)?;
    let mut dst = Mat::default();
    imgproc::resize(
        &src,
        &mut dst,
        Size::new(0, 0),
        scale,
        scale,
        imgproc::INTER_AREA,
    )?;
    from_mat(&dst, frame.timestamp_ms)
}

/// Normalized box smoothing with a square kernel of `size` pixels.
pub(crate) fn box_smooth(frame: &Frame, size: i32) -> Result<Frame, PreprocError> {
    let src = to_mat(frame)?;
    let mut dst = Mat::default();
    imgproc::box_filter(
        &src,
        &mut dst,
        -1,
        Size::new(size, size),
        Point::new(-1, -1),
        true,
        core::BORDER_DEFAULT,
    )?;
    from_mat(&dst, frame.timestamp_ms)
}

/// Intensity inversion, `v -> 255 - v`.
pub(crate) fn invert(frame: &Frame) -> Frame {
    let mut out = frame.clone();
    for v in &mut out.data {
        *v = 255 - *v;
    }
    out
}

/// Per-sample absolute difference between a frame and a reference buffer of
/// the same length.
pub(crate) fn absdiff(frame: &Frame, reference: &[u8]) -> Frame {
    let mut out = frame.clone();
    for (v, r) in out.data.iter_mut().zip(reference) {
        *v = (*v).abs_diff(*r);
    }
    out
}
