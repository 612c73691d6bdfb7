
use std::num::NonZeroUsize;

use crate::{
    mv::MotionVector,
    params::{SearchStrategy, SearchThresholds, ShiftDir},
    sad::{get_sad, get_sad_safe},
};

/// Size of the borders added to extended frames, in pixels. This is the most
/// pixels a motion vector can extend past the image border.
pub const BORDER: usize = 16;

/// Size of the block covered by one top-level motion vector.
pub const BLOCK_SIZE: usize = 16;

/// One bounds-checked SAD kernel; the search body is the same at every
/// quad-tree level and only the kernel changes.
type SafeSadFn = fn(&MotionEstimator, &[u8], usize, &[u8], isize) -> Option<u64>;

/// The three half-pixel phases of the previous luma plane, present only when
/// the estimator was constructed with `use_half_pixel`.
struct HalfPixelPlanes<'a> {
    up: &'a [u8],
    left: &'a [u8],
    upleft: &'a [u8],
}

struct SearchContext<'a> {
    cur: &'a [u8],
    prev: &'a [u8],
    half: Option<HalfPixelPlanes<'a>>,
}

/// Block-matching motion estimator over extended luma planes.
///
/// For every 16x16 block of the current frame it finds a displacement into
/// the previous frame minimizing the sum of absolute differences, descending
/// to 8x8 and 4x4 sub-blocks where that pays off. Stateless between frames
/// apart from its configuration.
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    /// Frame width (not including borders)
    #[allow(dead_code)]
    width: NonZeroUsize,
    /// Frame height (not including borders)
    height: NonZeroUsize,
    /// Whether candidates in the half-pixel reference planes are probed
    use_half_pixel: bool,
    strategy: SearchStrategy,
    /// Extended frame width (including borders)
    width_ext: usize,
    stride: NonZeroUsize,
    /// Number of blocks per X-axis
    num_blocks_hor: usize,
    /// Number of blocks per Y-axis
    num_blocks_vert: usize,
    /// Position of the first visible pixel in the extended frame
    first_row_offset: usize,
    img_size: usize,
    thresholds: SearchThresholds,
}

impl MotionEstimator {
    #[must_use]
    pub fn new(width: NonZeroUsize, height: NonZeroUsize, quality: u8, use_half_pixel: bool) -> Self {
        let stride = width.saturating_add(2 * BORDER);
        let width_ext = stride.get();

        MotionEstimator {
            width,
            height,
            use_half_pixel,
            strategy: SearchStrategy::Arps,
            width_ext,
            stride,
            num_blocks_hor: (width.get() + BLOCK_SIZE - 1) / BLOCK_SIZE,
            num_blocks_vert: (height.get() + BLOCK_SIZE - 1) / BLOCK_SIZE,
            first_row_offset: width_ext * BORDER + BORDER,
            img_size: width_ext * height.get(),
            thresholds: SearchThresholds::new(quality, use_half_pixel),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn num_blocks_hor(&self) -> usize {
        self.num_blocks_hor
    }

    #[must_use]
    pub fn num_blocks_vert(&self) -> usize {
        self.num_blocks_vert
    }

    /// Number of motion vectors `estimate` writes.
    #[must_use]
    pub fn mv_count(&self) -> usize {
        self.num_blocks_hor * self.num_blocks_vert
    }

    /// Length in samples of an extended luma plane for this frame size.
    #[must_use]
    pub fn extended_len(&self) -> usize {
        self.width_ext * (self.height.get() + 2 * BORDER)
    }

    /// Estimates motion between two frames, filling one vector per 16x16
    /// block in raster order.
    ///
    /// All planes use the extended layout. The three shifted planes are only
    /// read when the estimator was constructed with `use_half_pixel`; without
    /// it callers may pass `None`.
    pub fn estimate(
        &self,
        cur_y: &[u8],
        prev_y: &[u8],
        prev_y_up: Option<&[u8]>,
        prev_y_left: Option<&[u8]>,
        prev_y_upleft: Option<&[u8]>,
        mvectors: &mut [MotionVector],
    ) {
        assert_eq!(cur_y.len(), self.extended_len());
        assert_eq!(prev_y.len(), self.extended_len());
        assert_eq!(mvectors.len(), self.mv_count());

        let half = if self.use_half_pixel {
            let up = prev_y_up.expect("half-pixel estimation requires the UP-shifted plane");
            let left = prev_y_left.expect("half-pixel estimation requires the LEFT-shifted plane");
            let upleft =
                prev_y_upleft.expect("half-pixel estimation requires the UPLEFT-shifted plane");
            assert_eq!(up.len(), self.extended_len());
            assert_eq!(left.len(), self.extended_len());
            assert_eq!(upleft.len(), self.extended_len());
            Some(HalfPixelPlanes { up, left, upleft })
        } else {
            None
        };

        let ctx = SearchContext {
            cur: cur_y,
            prev: prev_y,
            half,
        };

        match self.strategy {
            SearchStrategy::FullSearch => self.full_search(&ctx, mvectors),
            SearchStrategy::Arps => self.arps(&ctx, mvectors),
        }
    }

    fn safe_sad_16x16(
        &self,
        cur: &[u8],
        block_off: usize,
        ref_plane: &[u8],
        cand_off: isize,
    ) -> Option<u64> {
        get_sad_safe::<16>(
            &cur[block_off..],
            self.stride,
            ref_plane,
            self.stride,
            cand_off,
            self.first_row_offset,
            self.img_size,
        )
    }

    fn safe_sad_8x8(
        &self,
        cur: &[u8],
        block_off: usize,
        ref_plane: &[u8],
        cand_off: isize,
    ) -> Option<u64> {
        get_sad_safe::<8>(
            &cur[block_off..],
            self.stride,
            ref_plane,
            self.stride,
            cand_off,
            self.first_row_offset,
            self.img_size,
        )
    }

    /// A 4x4 candidate is scored as the 8x8 window shifted up-left by two
    /// pixels. This keeps a single fast kernel; the surrounding context in
    /// the window penalizes over-splitting.
    fn safe_sad_4x4(
        &self,
        cur: &[u8],
        block_off: usize,
        ref_plane: &[u8],
        cand_off: isize,
    ) -> Option<u64> {
        let shift = 2 * self.width_ext + 2;
        let cand = cand_off - shift as isize;
        if cand < 0 || cand > (self.first_row_offset + self.img_size) as isize {
            return None;
        }

        Some(get_sad::<8>(
            &cur[block_off - shift..],
            self.stride,
            &ref_plane[cand as usize..],
            self.stride,
        ))
    }

    /// Evaluates one candidate displacement and keeps it if it beats the
    /// current best. Out-of-range candidates are skipped by the safe kernel.
    fn probe(
        &self,
        sad: SafeSadFn,
        cur: &[u8],
        block_off: usize,
        ref_plane: &[u8],
        x: isize,
        y: isize,
        shift_dir: ShiftDir,
        best: &mut MotionVector,
    ) {
        let cand = block_off as isize + y * self.width_ext as isize + x;
        if let Some(error) = sad(self, cur, block_off, ref_plane, cand) {
            if best.is_improved_by(error) {
                *best = MotionVector {
                    x,
                    y,
                    shift_dir,
                    sad: Some(error),
                    ..MotionVector::zero()
                };
            }
        }
    }

    /// The three-phase search shared by the 8x8 and 4x4 levels: zero-motion
    /// prediction, adaptive rood around the predicted vector, then unit-step
    /// refinement, with an optional half-pixel pass at the end.
    fn estimate_at_level(
        &self,
        sad: SafeSadFn,
        ctx: &SearchContext<'_>,
        block_off: usize,
        at_edge: bool,
        predicted: &MotionVector,
        best: &mut MotionVector,
    ) {
        let cur = ctx.cur;
        let prev = ctx.prev;

        // Zero-motion prediction. Whenever the block start is inside the
        // valid range this also guarantees a finite error.
        self.probe(sad, cur, block_off, prev, 0, 0, ShiftDir::None, best);
        if below(best, self.thresholds.zmp) {
            return;
        }

        // Adaptive rood around the predicted vector. Blocks with no left
        // neighbor fall back to a fixed arm of 2.
        let arm = if at_edge {
            2
        } else {
            predicted.x.abs().max(predicted.y.abs())
        };
        if arm != 0 {
            self.probe(sad, cur, block_off, prev, -arm, 0, ShiftDir::None, best);
            self.probe(sad, cur, block_off, prev, arm, 0, ShiftDir::None, best);
            self.probe(sad, cur, block_off, prev, 0, -arm, ShiftDir::None, best);
            self.probe(sad, cur, block_off, prev, 0, arm, ShiftDir::None, best);

            // The predictor itself, when it is not on one of the rood arms.
            if !at_edge && predicted.x != 0 && predicted.y != 0 {
                self.probe(
                    sad,
                    cur,
                    block_off,
                    prev,
                    predicted.x,
                    predicted.y,
                    ShiftDir::None,
                    best,
                );
            }
        }
        if below(best, self.thresholds.first) {
            return;
        }

        // Unit-step refinement until the best stops moving.
        loop {
            let (cx, cy) = (best.x, best.y);
            self.probe(sad, cur, block_off, prev, cx - 1, cy, ShiftDir::None, best);
            self.probe(sad, cur, block_off, prev, cx + 1, cy, ShiftDir::None, best);
            self.probe(sad, cur, block_off, prev, cx, cy - 1, ShiftDir::None, best);
            self.probe(sad, cur, block_off, prev, cx, cy + 1, ShiftDir::None, best);
            if below(best, self.thresholds.first) || (best.x, best.y) == (cx, cy) {
                break;
            }
        }

        // Half-pixel refinement. The LEFT and UP phases are probed at the
        // integer best and one step along the shift direction; whichever
        // wins, the two adjacent UPLEFT candidates are probed as well. The
        // candidate geometry encodes how the phases were interpolated, so
        // keep it exactly.
        let Some(half) = ctx.half.as_ref() else {
            return;
        };
        if best.sad.unwrap_or(u64::MAX) <= self.thresholds.second {
            return;
        }

        let (bx, by) = (best.x, best.y);
        self.probe(sad, cur, block_off, half.left, bx, by, ShiftDir::Left, best);
        self.probe(sad, cur, block_off, half.left, bx + 1, by, ShiftDir::Left, best);
        self.probe(sad, cur, block_off, half.up, bx, by, ShiftDir::Up, best);
        self.probe(sad, cur, block_off, half.up, bx, by + 1, ShiftDir::Up, best);

        match best.shift_dir {
            ShiftDir::Up => {
                self.probe(sad, cur, block_off, half.upleft, bx, by, ShiftDir::UpLeft, best);
                self.probe(sad, cur, block_off, half.upleft, bx + 1, by, ShiftDir::UpLeft, best);
            }
            ShiftDir::Left => {
                self.probe(sad, cur, block_off, half.upleft, bx, by, ShiftDir::UpLeft, best);
                self.probe(sad, cur, block_off, half.upleft, bx, by + 1, ShiftDir::UpLeft, best);
            }
            _ => {}
        }
    }

    /// Adaptive rood pattern search. Every block is split into four 8x8
    /// sub-blocks; each runs the three-phase search seeded by the previously
    /// searched sub-block, and descends to 4x4 while the match is still poor.
    fn arps(&self, ctx: &SearchContext<'_>, mvectors: &mut [MotionVector]) {
        // MV of the previously searched sub-block in scan order.
        let mut predicted = MotionVector::zero();

        for i in 0..self.num_blocks_vert {
            for j in 0..self.num_blocks_hor {
                let block_id = i * self.num_blocks_hor + j;

                let mut best16 = MotionVector::zero();
                best16.split();

                for h in 0..4 {
                    let hor_offset = j * BLOCK_SIZE + if (h & 1) != 0 { BLOCK_SIZE / 2 } else { 0 };
                    let vert_offset = i * BLOCK_SIZE + if h > 1 { BLOCK_SIZE / 2 } else { 0 };
                    let block_off =
                        self.first_row_offset + vert_offset * self.width_ext + hor_offset;
                    let at_edge = j == 0 && (h & 1) == 0;

                    let mut best8 = MotionVector::zero();
                    self.estimate_at_level(
                        Self::safe_sad_8x8,
                        ctx,
                        block_off,
                        at_edge,
                        &predicted,
                        &mut best8,
                    );

                    // Descend to 4x4 only while the 8x8 match is still poor;
                    // a clean zero-motion accept stops here.
                    if best8.sad.unwrap_or(u64::MAX) > self.thresholds.zmp {
                        best8.split();
                        let predicted4 = best8.as_leaf();

                        for h2 in 0..4 {
                            let hor_offset =
                                hor_offset + if (h2 & 1) != 0 { BLOCK_SIZE / 4 } else { 0 };
                            let vert_offset =
                                vert_offset + if h2 > 1 { BLOCK_SIZE / 4 } else { 0 };
                            let block_off =
                                self.first_row_offset + vert_offset * self.width_ext + hor_offset;
                            let at_edge = at_edge && (h2 & 1) == 0;

                            let mut best4 = MotionVector::zero();
                            self.estimate_at_level(
                                Self::safe_sad_4x4,
                                ctx,
                                block_off,
                                at_edge,
                                &predicted4,
                                &mut best4,
                            );
                            *best8.sub_mut(h2) = best4;
                        }

                        // Four quarter scores that do not clearly beat the
                        // whole block do not justify the split.
                        if children_error(&best8) >= best8.sad.unwrap_or(u64::MAX).saturating_mul(3)
                        {
                            best8.unsplit();
                        }
                    }

                    predicted = best8.as_leaf();
                    *best16.sub_mut(h) = best8;
                }

                // Mirror the first sub-vector at the root so every node of
                // the tree carries a concrete displacement and error.
                let leaf = best16.sub(0).as_leaf();
                best16.x = leaf.x;
                best16.y = leaf.y;
                best16.shift_dir = leaf.shift_dir;
                best16.sad = leaf.sad;

                mvectors[block_id] = best16;
            }
        }
    }

    /// Exhaustive reference search over the full `±BORDER` window, splitting
    /// into 8x8 sub-blocks when the whole-block match is poor. Ground truth
    /// for the pattern search; far too slow for real video.
    fn full_search(&self, ctx: &SearchContext<'_>, mvectors: &mut [MotionVector]) {
        for i in 0..self.num_blocks_vert {
            for j in 0..self.num_blocks_hor {
                let block_id = i * self.num_blocks_hor + j;
                let block_off = self.first_row_offset
                    + i * BLOCK_SIZE * self.width_ext
                    + j * BLOCK_SIZE;

                let mut best = MotionVector::zero();
                self.exhaustive(Self::safe_sad_16x16, ctx, block_off, &mut best);

                if best.sad.unwrap_or(u64::MAX) > 1000 {
                    let parent_error = best.sad.unwrap_or(u64::MAX);
                    best.split();

                    for h in 0..4 {
                        let hor_offset =
                            j * BLOCK_SIZE + if (h & 1) != 0 { BLOCK_SIZE / 2 } else { 0 };
                        let vert_offset =
                            i * BLOCK_SIZE + if h > 1 { BLOCK_SIZE / 2 } else { 0 };
                        let sub_off =
                            self.first_row_offset + vert_offset * self.width_ext + hor_offset;

                        let mut sub_best = MotionVector::zero();
                        self.exhaustive(Self::safe_sad_8x8, ctx, sub_off, &mut sub_best);
                        *best.sub_mut(h) = sub_best;
                    }

                    // Revert unless the split improves on the unified score
                    // by more than the 0.7 ratio.
                    if children_error(&best).saturating_mul(10) > parent_error.saturating_mul(7) {
                        best.unsplit();
                    }
                }

                mvectors[block_id] = best;
            }
        }
    }

    fn exhaustive(
        &self,
        sad: SafeSadFn,
        ctx: &SearchContext<'_>,
        block_off: usize,
        best: &mut MotionVector,
    ) {
        let range = BORDER as isize;
        let mut planes: [Option<(&[u8], ShiftDir)>; 4] = [Some((ctx.prev, ShiftDir::None)), None, None, None];
        if let Some(half) = ctx.half.as_ref() {
            planes[1] = Some((half.up, ShiftDir::Up));
            planes[2] = Some((half.left, ShiftDir::Left));
            planes[3] = Some((half.upleft, ShiftDir::UpLeft));
        }

        for (plane, dir) in planes.into_iter().flatten() {
            for y in -range..=range {
                for x in -range..=range {
                    self.probe(sad, ctx.cur, block_off, plane, x, y, dir, best);
                }
            }
        }
    }
}

fn below(best: &MotionVector, threshold: u64) -> bool {
    best.sad.is_some_and(|error| error < threshold)
}

/// Sum of the four sub-vector errors, saturating on unevaluated children.
fn children_error(mv: &MotionVector) -> u64 {
    (0..4).fold(0u64, |acc, h| {
        acc.saturating_add(mv.sub(h).sad.unwrap_or(u64::MAX))
    })
}
