#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;

use crate::motion_estimator::BORDER;

#[cfg(target_arch = "x86_64")]
cpufeatures::new!(cpuid_avx2, "avx2");

#[cfg(target_arch = "x86_64")]
pub use cpuid_avx2::get as has_avx2;

/// Copies a visible luma plane into the extended layout: row stride
/// `width + 2 * BORDER`, first visible sample at `(BORDER, BORDER)`. The
/// borders are left untouched; run `pad_extended_plane` afterwards.
///
/// `src_row` yields the visible row `y`, at least `width` samples long. Taking
/// rows instead of one slice lets callers feed host frames whose rows are not
/// contiguous.
pub fn fill_extended_plane<'a>(
    dest: &mut [u8],
    width: NonZeroUsize,
    height: NonZeroUsize,
    mut src_row: impl FnMut(usize) -> &'a [u8],
) {
    let width_ext = width.get() + 2 * BORDER;
    for y in 0..height.get() {
        let offset = (y + BORDER) * width_ext + BORDER;
        dest[offset..offset + width.get()].copy_from_slice(&src_row(y)[..width.get()]);
    }
}

/// Nearest-neighbor upsampling of a subsampled chroma plane to a
/// full-resolution signed 16-bit side channel, recentered around zero.
///
/// `src_row` yields the subsampled row (index already divided by the vertical
/// subsampling); `sub_w`/`sub_h` are log2 subsampling factors.
pub fn upsample_chroma_plane<'a>(
    dest: &mut [i16],
    width: NonZeroUsize,
    height: NonZeroUsize,
    sub_w: u8,
    sub_h: u8,
    mut src_row: impl FnMut(usize) -> &'a [u8],
) {
    for y in 0..height.get() {
        let row = src_row(y >> sub_h);
        let dest_row = &mut dest[y * width.get()..][..width.get()];
        for x in 0..width.get() {
            dest_row[x] = i16::from(row[x >> sub_w]) - 128;
        }
    }
}
