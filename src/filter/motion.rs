//! Coarse motion and novelty measurement.
//!
//! Motion is the mean squared difference between co-located blocks of the
//! current smoothed frame and each frame in the history, averaged over the
//! history and broadcast across the block. There is no search for
//! displacement: this measures change, not motion vectors.

use super::HistoryBuffer;
use crate::imgproc::{ImageError, Plane};
use rayon::prelude::*;

/// Mean squared difference of one `size × size` block.
fn block_distance(a: &Plane, b: &Plane, x0: usize, y0: usize, size: usize) -> f32 {
    let mut sum = 0.0f32;
    for y in y0..y0 + size {
        let ra = &a.row(y)[x0..x0 + size];
        let rb = &b.row(y)[x0..x0 + size];
        sum += ra
            .iter()
            .zip(rb)
            .map(|(&p, &q)| (p - q) * (p - q))
            .sum::<f32>();
    }
    sum / (size * size) as f32
}

/// Block-wise motion of `current` against every frame in `history`.
///
/// Only blocks that lie entirely inside the frame are measured. Partial
/// blocks along the right and bottom borders keep a motion value of zero.
/// An empty history yields an all-zero field.
pub fn block_motion(
    current: &Plane,
    history: &HistoryBuffer,
    block_size: usize,
) -> Result<Plane, ImageError> {
    if block_size == 0 {
        return Err(ImageError::InvalidWindow(block_size));
    }
    for past in history.iter() {
        current.ensure_same_size(past)?;
    }

    let (width, height) = current.dimensions();
    let mut motion = Plane::zeros(width, height);
    if history.is_empty() || width < block_size || height < block_size {
        return Ok(motion);
    }

    let blocks_x = width / block_size;
    let frames = history.len() as f32;

    motion
        .data_mut()
        .par_chunks_mut(width * block_size)
        .enumerate()
        .filter(|(_, band)| band.len() == width * block_size)
        .for_each(|(by, band)| {
            let y0 = by * block_size;
            for bx in 0..blocks_x {
                let x0 = bx * block_size;
                let total: f32 = history
                    .iter()
                    .map(|past| block_distance(current, past, x0, y0, block_size))
                    .sum();
                let value = total / frames;
                for row in band.chunks_mut(width) {
                    row[x0..x0 + block_size].fill(value);
                }
            }
        });

    Ok(motion)
}

/// Novelty weight `exp(-m² / (2·σc²))` for each motion value.
///
/// Values near 1 mark static content, values near 0 strong change.
pub fn novelty_weights(motion: &Plane, sigma: f32) -> Plane {
    let denom = 2.0 * sigma * sigma;
    let mut weights = motion.clone();
    for w in weights.data_mut() {
        *w = (-(*w * *w) / denom).exp();
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_frames_have_no_motion() {
        let frame = Plane::from_fn(16, 16, |x, y| (x * y) as f32);
        let mut history = HistoryBuffer::new(3);
        history.push(&frame);
        history.push(&frame);

        let motion = block_motion(&frame, &history, 8).unwrap();
        assert!(motion.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_block_value_is_mean_squared_difference() {
        let current = Plane::filled(8, 8, 10.0);
        let mut history = HistoryBuffer::new(2);
        history.push(&Plane::filled(8, 8, 7.0)); // diff 3 -> 9
        history.push(&Plane::filled(8, 8, 9.0)); // diff 1 -> 1

        let motion = block_motion(&current, &history, 8).unwrap();
        assert!(motion.data().iter().all(|&v| (v - 5.0).abs() < 1e-5));
    }

    #[test]
    fn test_motion_is_local_to_block() {
        let past = Plane::zeros(16, 8);
        let current = Plane::from_fn(16, 8, |x, _| if x >= 8 { 2.0 } else { 0.0 });
        let mut history = HistoryBuffer::new(1);
        history.push(&past);

        let motion = block_motion(&current, &history, 8).unwrap();
        assert_eq!(motion.get(3, 3), 0.0);
        assert!((motion.get(12, 3) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_border_blocks_skipped() {
        // 12x12 frame: one full 8x8 block, the rest is partial
        let current = Plane::filled(12, 12, 4.0);
        let mut history = HistoryBuffer::new(1);
        history.push(&Plane::zeros(12, 12));

        let motion = block_motion(&current, &history, 8).unwrap();
        assert!((motion.get(0, 0) - 16.0).abs() < 1e-6);
        assert!((motion.get(7, 7) - 16.0).abs() < 1e-6);
        assert_eq!(motion.get(8, 0), 0.0);
        assert_eq!(motion.get(0, 8), 0.0);
        assert_eq!(motion.get(11, 11), 0.0);
    }

    #[test]
    fn test_exact_tiling_measures_last_block() {
        let current = Plane::filled(16, 16, 3.0);
        let mut history = HistoryBuffer::new(1);
        history.push(&Plane::zeros(16, 16));

        let motion = block_motion(&current, &history, 8).unwrap();
        for (x, y) in [(0, 0), (15, 0), (0, 15), (15, 15)] {
            assert!((motion.get(x, y) - 9.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_frame_smaller_than_block() {
        let current = Plane::filled(4, 4, 100.0);
        let mut history = HistoryBuffer::new(1);
        history.push(&Plane::zeros(4, 4));

        let motion = block_motion(&current, &history, 8).unwrap();
        assert!(motion.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mismatched_history_rejected() {
        let mut history = HistoryBuffer::new(1);
        history.push(&Plane::zeros(4, 4));
        assert!(block_motion(&Plane::zeros(8, 8), &history, 4).is_err());
    }

    #[test]
    fn test_novelty_weights() {
        let motion = Plane::from_vec(2, 1, vec![0.0, 30.0]).unwrap();
        let weights = novelty_weights(&motion, 30.0);
        assert_eq!(weights.get(0, 0), 1.0);
        assert!((weights.get(1, 0) - (-0.5f32).exp()).abs() < 1e-6);
    }
}
