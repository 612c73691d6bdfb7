#[cfg(target_arch = "x86_64")]
mod avx2;
mod rust;


use std::num::NonZeroUsize;

use cfg_if::cfg_if;

/// Sum of absolute differences over an `N`x`N` tile.
///
/// Both slices start at the top-left sample of their tile and carry at least
/// `(N - 1) * pitch + N` samples; the pitches are the row strides of the
/// extended frames the tiles live in.
#[must_use]
pub fn get_sad<const N: usize>(
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_: &[u8],
    ref_pitch: NonZeroUsize,
) -> u64 {
    cfg_if! {
        if #[cfg(all(target_arch = "x86_64", not(feature = "no_simd")))] {
            if crate::util::has_avx2() {
                // SAFETY: We check for AVX2 first
                return unsafe { avx2::get_sad::<N>(src, src_pitch, ref_, ref_pitch) };
            }
        }
    }

    rust::get_sad::<N>(src, src_pitch, ref_, ref_pitch)
}

/// Bounds-checked SAD against a whole reference plane.
///
/// `cand_offset` is the signed offset of the candidate tile's first sample
/// within `ref_plane`. When it falls outside
/// `[first_row_offset, first_row_offset + img_size]` no memory is read and the
/// candidate is reported as invalid. This is the only guard between the search
/// and the edge of the extended frame, so every speculative candidate must go
/// through it.
#[must_use]
pub fn get_sad_safe<const N: usize>(
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_plane: &[u8],
    ref_pitch: NonZeroUsize,
    cand_offset: isize,
    first_row_offset: usize,
    img_size: usize,
) -> Option<u64> {
    if cand_offset < first_row_offset as isize
        || cand_offset > (first_row_offset + img_size) as isize
    {
        return None;
    }

    Some(get_sad::<N>(
        src,
        src_pitch,
        &ref_plane[cand_offset as usize..],
        ref_pitch,
    ))
}
