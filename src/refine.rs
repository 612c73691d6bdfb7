//! Half-pixel phases of a reference plane, produced by 2-tap bilinear
//! interpolation over the whole extended plane (borders included, so shifted
//! candidates near the frame edge stay meaningful).
//!
//! The LEFT phase samples at `x + 0.5`, the UP phase at `y + 0.5`, and the
//! UPLEFT phase at both. The last column/row has no neighbor to average with
//! and copies the source.


use std::num::NonZeroUsize;

/// LEFT phase: each sample is the rounded average of a pixel and its right
/// neighbor.
pub fn refine_horizontal_bilinear(
    dest: &mut [u8],
    src: &[u8],
    width: NonZeroUsize,
    height: NonZeroUsize,
) {
    let width = width.get();
    let mut offset = 0;
    for _j in 0..height.get() {
        let src_row = &src[offset..][..width];
        let dest_row = &mut dest[offset..][..width];

        for i in 0..width - 1 {
            let a = u32::from(src_row[i]);
            let b = u32::from(src_row[i + 1]);
            dest_row[i] = ((a + b + 1) / 2) as u8;
        }
        // last column
        dest_row[width - 1] = src_row[width - 1];

        offset += width;
    }
}

/// UP phase: each sample is the rounded average of a pixel and the one below
/// it.
pub fn refine_vertical_bilinear(
    dest: &mut [u8],
    src: &[u8],
    width: NonZeroUsize,
    height: NonZeroUsize,
) {
    let width = width.get();
    let mut offset = 0;
    for _j in 0..height.get() - 1 {
        for i in 0..width {
            let a = u32::from(src[offset + i]);
            let b = u32::from(src[offset + i + width]);
            dest[offset + i] = ((a + b + 1) / 2) as u8;
        }
        offset += width;
    }

    // last row
    dest[offset..offset + width].copy_from_slice(&src[offset..offset + width]);
}

/// UPLEFT phase: each sample is the rounded average of a 2x2 neighborhood.
pub fn refine_diagonal_bilinear(
    dest: &mut [u8],
    src: &[u8],
    width: NonZeroUsize,
    height: NonZeroUsize,
) {
    let width = width.get();
    let mut offset = 0;
    for _j in 0..height.get() - 1 {
        for i in 0..width - 1 {
            let a = u32::from(src[offset + i]);
            let b = u32::from(src[offset + i + 1]);
            let c = u32::from(src[offset + i + width]);
            let d = u32::from(src[offset + i + width + 1]);
            dest[offset + i] = ((a + b + c + d + 2) / 4) as u8;
        }
        // last column averages vertically only
        let a = u32::from(src[offset + width - 1]);
        let c = u32::from(src[offset + 2 * width - 1]);
        dest[offset + width - 1] = ((a + c + 1) / 2) as u8;

        offset += width;
    }

    // last row averages horizontally only
    for i in 0..width - 1 {
        let a = u32::from(src[offset + i]);
        let b = u32::from(src[offset + i + 1]);
        dest[offset + i] = ((a + b + 1) / 2) as u8;
    }
    dest[offset + width - 1] = src[offset + width - 1];
}
