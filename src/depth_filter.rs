#[cfg(test)]
mod tests;

use std::{num::NonZeroUsize, sync::Mutex};

use anyhow::{Result, anyhow, bail};
use vapoursynth::{
    format::{ColorFamily, Format, SampleType},
    frame::{FrameRef, FrameRefMut},
    node::Node,
    plugins::Filter,
    video_info::Resolution,
};

use crate::{
    depth_estimator::DepthEstimator,
    motion_estimator::{BORDER, MotionEstimator},
    mv::MotionVector,
    params::SearchStrategy,
    pad::pad_extended_plane,
    refine::{refine_diagonal_bilinear, refine_horizontal_bilinear, refine_vertical_bilinear},
    util::{fill_extended_plane, upsample_chroma_plane},
};

/// Per-clip estimators and scratch planes. Guarded by a mutex because the
/// host may call `get_frame` from several worker threads; the depth history
/// additionally assumes frames arrive in presentation order, which the
/// pipelines this filter is written for guarantee.
struct DepthState {
    motion: MotionEstimator,
    depth: DepthEstimator,
    mvectors: Vec<MotionVector>,
    cur_ext: Vec<u8>,
    prev_ext: Vec<u8>,
    prev_up: Vec<u8>,
    prev_left: Vec<u8>,
    prev_upleft: Vec<u8>,
    cur_u: Vec<i16>,
    cur_v: Vec<i16>,
    depth_map: Vec<u8>,
}

/// Produce a per-pixel depth map for each frame by analyzing motion against
/// the previous frame. The depth map is written into the luma plane of the
/// output; chroma planes are set to the neutral value.
pub struct DepthFilter<'core> {
    /// Input clip
    clip: Node<'core>,
    /// Quality, 0-255. Higher quality tightens the SAD thresholds at which
    /// the pattern search accepts a candidate.
    #[allow(dead_code)]
    quality: u8,
    /// Whether to refine motion vectors against half-pixel-shifted versions
    /// of the previous frame.
    use_half_pixel: bool,
    /// Block search strategy; the exhaustive variant exists for verification
    /// on short clips.
    #[allow(dead_code)]
    strategy: SearchStrategy,

    // Internal fields
    width: NonZeroUsize,
    height: NonZeroUsize,
    format: Format<'core>,
    state: Mutex<DepthState>,
}

impl<'core> DepthFilter<'core> {
    pub fn new(
        clip: Node<'core>,
        quality: Option<i64>,
        half_pixel: Option<i64>,
        search: Option<i64>,
    ) -> Result<Self> {
        let quality = match quality {
            Some(quality) => u8::try_from(quality)
                .map_err(|_| anyhow!("Depth: quality must be between 0 and 255 (inclusive)."))?,
            None => 75,
        };
        let use_half_pixel = half_pixel.map(|half_pixel| half_pixel > 0).unwrap_or(true);
        let strategy = search
            .map(SearchStrategy::try_from)
            .unwrap_or(Ok(SearchStrategy::Arps))?;

        let info = clip.info();
        let format = match info.format {
            vapoursynth::prelude::Property::Variable => {
                bail!("Depth: variable format input clips are not supported")
            }
            vapoursynth::prelude::Property::Constant(format) => format,
        };
        if format.sample_type() != SampleType::Integer || format.bits_per_sample() != 8 {
            bail!("Depth: input clip must be 8-bit integer");
        }
        if ![ColorFamily::YUV, ColorFamily::Gray].contains(&format.color_family())
            || format.sub_sampling_w() > 1
            || format.sub_sampling_h() > 1
        {
            bail!("Depth: input clip must be GRAY, 420, 422, 440, or 444");
        }

        let (width, height) = match info.resolution {
            vapoursynth::prelude::Property::Variable => {
                bail!("Depth: variable resolution input clips are not supported")
            }
            // SAFETY: width and height must be positive
            vapoursynth::prelude::Property::Constant(resolution) => unsafe {
                (
                    NonZeroUsize::new_unchecked(resolution.width),
                    NonZeroUsize::new_unchecked(resolution.height),
                )
            },
        };

        let motion =
            MotionEstimator::new(width, height, quality, use_half_pixel).with_strategy(strategy);
        let depth = DepthEstimator::new(width, height, quality);

        let ext_len = motion.extended_len();
        let img_len = width.get() * height.get();
        let half_len = if use_half_pixel { ext_len } else { 0 };
        let chroma_len = if format.color_family() == ColorFamily::YUV {
            img_len
        } else {
            0
        };

        let mv_count = motion.mv_count();
        let state = DepthState {
            motion,
            depth,
            mvectors: vec![MotionVector::zero(); mv_count],
            cur_ext: vec![0; ext_len],
            prev_ext: vec![0; ext_len],
            prev_up: vec![0; half_len],
            prev_left: vec![0; half_len],
            prev_upleft: vec![0; half_len],
            cur_u: vec![0; chroma_len],
            cur_v: vec![0; chroma_len],
            depth_map: vec![0; img_len],
        };

        Ok(Self {
            clip,
            quality,
            use_half_pixel,
            strategy,
            width,
            height,
            format,
            state: Mutex::new(state),
        })
    }

    fn get_frame_internal(
        &self,
        core: vapoursynth::core::CoreRef<'core>,
        context: vapoursynth::plugins::FrameContext,
        n: usize,
    ) -> Result<FrameRef<'core>> {
        let src = self
            .clip
            .get_frame_filter(context, n)
            .ok_or_else(|| anyhow!("Depth: couldn't get the source frame"))?;

        // The first frame has no predecessor; estimating against itself
        // yields zero motion and an all-zero depth map.
        let prev = if n > 0 {
            Some(
                self.clip
                    .get_frame_filter(context, n - 1)
                    .ok_or_else(|| anyhow!("Depth: couldn't get the previous frame"))?,
            )
        } else {
            None
        };
        let prev = prev.as_ref().unwrap_or(&src);

        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("Depth: estimator state mutex poisoned"))?;
        let state = &mut *state;

        fill_extended_plane(&mut state.cur_ext, self.width, self.height, |y| {
            src.plane_row::<u8>(0, y)
        });
        pad_extended_plane(&mut state.cur_ext, self.width, self.height);

        fill_extended_plane(&mut state.prev_ext, self.width, self.height, |y| {
            prev.plane_row::<u8>(0, y)
        });
        pad_extended_plane(&mut state.prev_ext, self.width, self.height);

        if self.use_half_pixel {
            let ext_width = self.width.saturating_add(2 * BORDER);
            let ext_height = self.height.saturating_add(2 * BORDER);
            refine_vertical_bilinear(&mut state.prev_up, &state.prev_ext, ext_width, ext_height);
            refine_horizontal_bilinear(
                &mut state.prev_left,
                &state.prev_ext,
                ext_width,
                ext_height,
            );
            refine_diagonal_bilinear(
                &mut state.prev_upleft,
                &state.prev_ext,
                ext_width,
                ext_height,
            );
        }

        state.motion.estimate(
            &state.cur_ext,
            &state.prev_ext,
            self.use_half_pixel.then_some(state.prev_up.as_slice()),
            self.use_half_pixel.then_some(state.prev_left.as_slice()),
            self.use_half_pixel.then_some(state.prev_upleft.as_slice()),
            &mut state.mvectors,
        );

        if self.format.color_family() == ColorFamily::YUV {
            let sub_w = self.format.sub_sampling_w();
            let sub_h = self.format.sub_sampling_h();
            upsample_chroma_plane(&mut state.cur_u, self.width, self.height, sub_w, sub_h, |y| {
                src.plane_row::<u8>(1, y)
            });
            upsample_chroma_plane(&mut state.cur_v, self.width, self.height, sub_w, sub_h, |y| {
                src.plane_row::<u8>(2, y)
            });
        }

        state.depth.estimate(
            &state.cur_ext,
            &state.cur_u,
            &state.cur_v,
            &state.mvectors,
            &mut state.depth_map,
        );

        // SAFETY: Every plane is fully written below
        let mut dest = unsafe {
            FrameRefMut::new_uninitialized(core, Some(&src), self.format, Resolution {
                width: self.width.get(),
                height: self.height.get(),
            })
        };

        for y in 0..self.height.get() {
            let row = &state.depth_map[y * self.width.get()..][..self.width.get()];
            dest.plane_row_mut::<u8>(0, y).copy_from_slice(row);
        }
        for plane in 1..self.format.plane_count() {
            for y in 0..dest.height(plane) {
                dest.plane_row_mut::<u8>(plane, y).fill(128);
            }
        }

        Ok(dest.into())
    }
}

impl<'core> Filter<'core> for DepthFilter<'core> {
    fn video_info(
        &self,
        _api: vapoursynth::prelude::API,
        _core: vapoursynth::core::CoreRef<'core>,
    ) -> Vec<vapoursynth::video_info::VideoInfo<'core>> {
        vec![self.clip.info()]
    }

    fn get_frame_initial(
        &self,
        _api: vapoursynth::prelude::API,
        _core: vapoursynth::core::CoreRef<'core>,
        context: vapoursynth::plugins::FrameContext,
        n: usize,
    ) -> std::result::Result<Option<vapoursynth::prelude::FrameRef<'core>>, anyhow::Error> {
        if n > 0 {
            self.clip.request_frame_filter(context, n - 1);
        }
        self.clip.request_frame_filter(context, n);
        Ok(None)
    }

    fn get_frame(
        &self,
        _api: vapoursynth::prelude::API,
        core: vapoursynth::core::CoreRef<'core>,
        context: vapoursynth::plugins::FrameContext,
        n: usize,
    ) -> std::result::Result<vapoursynth::prelude::FrameRef<'core>, anyhow::Error> {
        self.get_frame_internal(core, context, n)
    }
}
