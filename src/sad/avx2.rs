#![allow(clippy::undocumented_unsafe_blocks)]

use std::arch::x86_64::*;
use std::num::NonZeroUsize;

/// SAD over an `N`x`N` tile using the hardware `psadbw` kernel. Tiles narrower
/// than 8 samples fall back to the portable implementation; the blow-up from
/// partial vector loads is not worth it for them.
#[target_feature(enable = "avx2")]
pub fn get_sad<const N: usize>(
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_: &[u8],
    ref_pitch: NonZeroUsize,
) -> u64 {
    match N {
        8 => unsafe { get_sad_8(src, src_pitch.get(), ref_, ref_pitch.get()) },
        16 => unsafe { get_sad_16(src, src_pitch.get(), ref_, ref_pitch.get()) },
        _ => super::rust::get_sad::<N>(src, src_pitch, ref_, ref_pitch),
    }
}

#[target_feature(enable = "avx2")]
unsafe fn get_sad_16(src: &[u8], src_pitch: usize, ref_: &[u8], ref_pitch: usize) -> u64 {
    debug_assert!(src.len() >= 15 * src_pitch + 16);
    debug_assert!(ref_.len() >= 15 * ref_pitch + 16);

    let mut acc = _mm_setzero_si128();
    for y in 0..16 {
        let a = _mm_loadu_si128(src.as_ptr().add(y * src_pitch) as *const __m128i);
        let b = _mm_loadu_si128(ref_.as_ptr().add(y * ref_pitch) as *const __m128i);
        acc = _mm_add_epi64(acc, _mm_sad_epu8(a, b));
    }
    (_mm_extract_epi64(acc, 0) + _mm_extract_epi64(acc, 1)) as u64
}

#[target_feature(enable = "avx2")]
unsafe fn get_sad_8(src: &[u8], src_pitch: usize, ref_: &[u8], ref_pitch: usize) -> u64 {
    debug_assert!(src.len() >= 7 * src_pitch + 8);
    debug_assert!(ref_.len() >= 7 * ref_pitch + 8);

    let mut acc = _mm_setzero_si128();
    for y in 0..8 {
        // The upper lane stays zero, so its SAD contributes nothing.
        let a = _mm_loadl_epi64(src.as_ptr().add(y * src_pitch) as *const __m128i);
        let b = _mm_loadl_epi64(ref_.as_ptr().add(y * ref_pitch) as *const __m128i);
        acc = _mm_add_epi64(acc, _mm_sad_epu8(a, b));
    }
    _mm_cvtsi128_si64(acc) as u64
}
