use frame_ingest::Frame;
use stage_link::Position;

/// Intensity-weighted centroid of a processed frame.
///
/// Stands in for the external tracking collaborator: bright samples in the
/// foreground signal pull the stage target toward them. Returns `None` for an
/// all-dark frame, which the rig treats as "nothing to follow this cycle".
pub(crate) fn intensity_centroid(frame: &Frame) -> Option<Position> {
    let width = frame.width as usize;
    let mut total: u64 = 0;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;

    for (index, &value) in frame.data.iter().enumerate() {
        if value == 0 {
            continue;
        }
        let weight = u64::from(value);
        total += weight;
        sum_x += (index % width) as f64 * weight as f64;
        sum_y += (index / width) as f64 * weight as f64;
    }

    if total == 0 {
        return None;
    }
    Some(Position::at(
        sum_x / total as f64,
        sum_y / total as f64,
        frame.timestamp_ms,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bright_pixel_is_its_own_centroid() {
        let mut data = vec![0u8; 8 * 8];
        data[2 * 8 + 5] = 200;
        let frame = Frame::gray(8, 8, data, 3).unwrap();
        let position = intensity_centroid(&frame).unwrap();
        assert_eq!((position.x, position.y), (5.0, 2.0));
        assert_eq!(position.timestamp_ms, 3);
    }

    #[test]
    fn all_dark_frame_yields_no_position() {
        let frame = Frame::gray(8, 8, vec![0u8; 64], 0).unwrap();
        assert!(intensity_centroid(&frame).is_none());
    }

    #[test]
    fn centroid_sits_between_equal_weights() {
        let mut data = vec![0u8; 8 * 8];
        data[8] = 100; // (0, 1)
        data[8 + 4] = 100; // (4, 1)
        let frame = Frame::gray(8, 8, data, 0).unwrap();
        let position = intensity_centroid(&frame).unwrap();
        assert_eq!((position.x, position.y), (2.0, 1.0));
    }
}
