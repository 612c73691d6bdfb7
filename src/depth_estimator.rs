
use std::num::NonZeroUsize;

use smallvec::SmallVec;

use crate::{
    motion_estimator::{BLOCK_SIZE, BORDER},
    mv::MotionVector,
};

/// How many past depth maps feed the temporal median.
pub const MAX_HISTORY: usize = 3;

/// Depth value per pixel of horizontal displacement.
const MULTIPLIER: u64 = 16;

/// Cross-bilateral window radius (7x7 window).
const S: isize = 3;
const SIGMA_SPATIAL: f64 = 15.0;
const SIGMA_LUMA: f64 = 100.0;

/// Converts a motion-vector field into a dense 8-bit depth map.
///
/// Depth is proportional to the magnitude of apparent horizontal motion (the
/// target use-case is stereo-from-monocular parallax). The raw projection is
/// smoothed with a cross-bilateral filter guided by the luma plane, then a
/// temporal median over a short history of past maps, each warped into the
/// current frame's coordinate system, suppresses flicker.
pub struct DepthEstimator {
    /// Frame width (not including borders)
    width: NonZeroUsize,
    /// Frame height (not including borders)
    height: NonZeroUsize,
    #[allow(dead_code)]
    quality: u8,
    /// Extended frame width (including borders)
    width_ext: usize,
    /// Number of blocks per X-axis
    num_blocks_hor: usize,
    /// Position of the first visible pixel in the extended frame
    first_row_offset: usize,
    /// Past depth maps, oldest first.
    history: SmallVec<[Vec<u8>; MAX_HISTORY]>,
    /// Reused by the history warp and the bilateral filter so reads always
    /// see pre-pass values.
    scratch: Vec<u8>,
}

impl DepthEstimator {
    #[must_use]
    pub fn new(width: NonZeroUsize, height: NonZeroUsize, quality: u8) -> Self {
        let width_ext = width.get() + 2 * BORDER;

        DepthEstimator {
            width,
            height,
            quality,
            width_ext,
            num_blocks_hor: (width.get() + BLOCK_SIZE - 1) / BLOCK_SIZE,
            first_row_offset: width_ext * BORDER + BORDER,
            history: SmallVec::new(),
            scratch: vec![0; width.get() * height.get()],
        }
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Estimates the depth map of a frame from its motion-vector field.
    ///
    /// `cur_y` uses the extended layout; the chroma side channels are
    /// accepted for interface compatibility but the filter guides on luma
    /// only. Consecutive calls must be consecutive frames: the estimator
    /// keeps a rolling history of the maps it produced.
    pub fn estimate(
        &mut self,
        cur_y: &[u8],
        _cur_u: &[i16],
        _cur_v: &[i16],
        mvectors: &[MotionVector],
        depth_map: &mut [u8],
    ) {
        assert_eq!(cur_y.len(), self.width_ext * (self.height.get() + 2 * BORDER));
        assert_eq!(depth_map.len(), self.width.get() * self.height.get());

        self.create_initial_map(mvectors, depth_map);
        self.update_history(mvectors);
        self.apply_cross_bilateral_filter(depth_map, cur_y);
        self.apply_median_filter(depth_map);
        self.cache(depth_map);
    }

    /// Projects the motion field onto a per-pixel map: the covering leaf
    /// vector's horizontal magnitude, scaled and saturated.
    fn create_initial_map(&self, mvectors: &[MotionVector], depth_map: &mut [u8]) {
        let width = self.width.get();
        for y in 0..self.height.get() {
            for x in 0..width {
                let mv = leaf_vector(mvectors, self.num_blocks_hor, x, y);
                let depth = (mv.x.unsigned_abs() as u64 * MULTIPLIER).min(255);
                depth_map[y * width + x] = depth as u8;
            }
        }
    }

    /// Warps every cached map through the current motion field so past
    /// estimates line up with the current frame before the median.
    fn update_history(&mut self, mvectors: &[MotionVector]) {
        let width = self.width.get();
        let height = self.height.get();
        let num_blocks_hor = self.num_blocks_hor;
        let scratch = &mut self.scratch;

        for map in &mut self.history {
            scratch.copy_from_slice(map);

            for y in 0..height {
                for x in 0..width {
                    let mv = leaf_vector(mvectors, num_blocks_hor, x, y);
                    let px = (x as isize + mv.x).clamp(0, width as isize - 1) as usize;
                    let py = (y as isize + mv.y).clamp(0, height as isize - 1) as usize;
                    map[y * width + x] = scratch[py * width + px];
                }
            }
        }
    }

    /// Smooths the depth map with weights falling off with spatial distance
    /// and with luma difference, so depth edges align with luma edges. Only
    /// in-bounds neighbors contribute; the realized weight sum normalizes.
    fn apply_cross_bilateral_filter(&mut self, depth_map: &mut [u8], cur_y: &[u8]) {
        let width = self.width.get() as isize;
        let height = self.height.get() as isize;
        let width_ext = self.width_ext as isize;
        let first_row_offset = self.first_row_offset as isize;
        let scratch = &mut self.scratch;

        for y in 0..height {
            for x in 0..width {
                let luma_center = f64::from(cur_y[(first_row_offset + y * width_ext + x) as usize]);

                let mut acc = 0.0;
                let mut weight_sum = 0.0;
                for i in -S..=S {
                    let ny = y + i;
                    if ny < 0 || ny >= height {
                        continue;
                    }
                    for j in -S..=S {
                        let nx = x + j;
                        if nx < 0 || nx >= width {
                            continue;
                        }

                        let luma =
                            f64::from(cur_y[(first_row_offset + ny * width_ext + nx) as usize]);
                        let weight = (-0.5 * ((i * i + j * j) as f64).sqrt() / SIGMA_SPATIAL).exp()
                            * (-0.5 * (luma_center - luma).abs() / SIGMA_LUMA).exp();

                        acc += weight * f64::from(depth_map[(ny * width + nx) as usize]);
                        weight_sum += weight;
                    }
                }

                // The center pixel always contributes weight 1, so the sum
                // never vanishes. Rounding keeps a constant map constant.
                scratch[(y * width + x) as usize] = (acc / weight_sum).round() as u8;
            }
        }

        depth_map.copy_from_slice(scratch);
    }

    /// Temporal median over the cached maps and the current one. Skipped
    /// until the history is full; with less temporal context an outlier
    /// cannot be voted down.
    fn apply_median_filter(&self, depth_map: &mut [u8]) {
        if self.history.len() < MAX_HISTORY {
            return;
        }

        let mut values: SmallVec<[u8; MAX_HISTORY + 1]> = SmallVec::new();
        for (i, depth) in depth_map.iter_mut().enumerate() {
            values.clear();
            values.extend(self.history.iter().map(|map| map[i]));
            values.push(*depth);

            let mid = values.len() / 2;
            let (_, median, _) = values.select_nth_unstable(mid);
            *depth = *median;
        }
    }

    /// Appends a copy of the map just produced, evicting the oldest entry
    /// once the history is full.
    fn cache(&mut self, depth_map: &[u8]) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(depth_map.to_vec());
    }
}

/// Walks the quad-tree down to the leaf vector covering pixel `(x, y)`.
fn leaf_vector<'a>(
    mvectors: &'a [MotionVector],
    num_blocks_hor: usize,
    x: usize,
    y: usize,
) -> &'a MotionVector {
    let block_id = (y / BLOCK_SIZE) * num_blocks_hor + x / BLOCK_SIZE;

    let mut mv = &mvectors[block_id];
    if mv.is_split() {
        let h = 2 * usize::from(y % BLOCK_SIZE >= BLOCK_SIZE / 2)
            + usize::from(x % BLOCK_SIZE >= BLOCK_SIZE / 2);
        mv = mv.sub(h);

        if mv.is_split() {
            let h2 = 2 * usize::from(y % (BLOCK_SIZE / 2) >= BLOCK_SIZE / 4)
                + usize::from(x % (BLOCK_SIZE / 2) >= BLOCK_SIZE / 4);
            mv = mv.sub(h2);
        }
    }
    mv
}
