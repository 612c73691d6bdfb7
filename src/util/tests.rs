#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::num::NonZeroUsize;

use super::*;

fn nz(val: usize) -> NonZeroUsize {
    NonZeroUsize::new(val).unwrap()
}

#[test]
fn fill_extended_plane_places_the_visible_area() {
    let width = 6;
    let height = 4;
    let pitch = width + 2 * BORDER;
    let visible: Vec<u8> = (0..width * height).map(|i| i as u8).collect();

    let mut ext = vec![200u8; pitch * (height + 2 * BORDER)];
    fill_extended_plane(&mut ext, nz(width), nz(height), |y| &visible[y * width..]);

    for y in 0..height {
        for x in 0..width {
            assert_eq!(
                ext[(y + BORDER) * pitch + x + BORDER],
                visible[y * width + x]
            );
        }
    }
    // Borders are not written by the fill.
    assert_eq!(ext[0], 200);
    assert_eq!(ext[BORDER * pitch], 200);
}

#[test]
fn fill_extended_plane_tolerates_padded_source_rows() {
    // Source rows longer than the visible width: only `width` samples count.
    let width = 4;
    let height = 2;
    let src_stride = 10;
    let pitch = width + 2 * BORDER;
    let mut src = vec![0u8; src_stride * height];
    for y in 0..height {
        for x in 0..width {
            src[y * src_stride + x] = (10 * y + x) as u8;
        }
        src[y * src_stride + width] = 99; // stride padding, must be ignored
    }

    let mut ext = vec![0u8; pitch * (height + 2 * BORDER)];
    fill_extended_plane(&mut ext, nz(width), nz(height), |y| &src[y * src_stride..]);

    for y in 0..height {
        for x in 0..width {
            assert_eq!(ext[(y + BORDER) * pitch + x + BORDER], (10 * y + x) as u8);
        }
        assert_ne!(ext[(y + BORDER) * pitch + width + BORDER], 99);
    }
}

#[test]
fn chroma_upsampling_recenters_and_repeats() {
    // A 4x2 chroma plane feeding an 8x4 frame (4:2:0).
    let chroma = vec![
        128u8, 130, 126, 255, //
        0, 64, 192, 128, //
    ];
    let mut dest = vec![0i16; 8 * 4];
    upsample_chroma_plane(&mut dest, nz(8), nz(4), 1, 1, |y| &chroma[y * 4..]);

    // Each chroma sample covers a 2x2 region, recentered around zero.
    for y in 0..4 {
        for x in 0..8 {
            let expected = i16::from(chroma[(y / 2) * 4 + x / 2]) - 128;
            assert_eq!(dest[y * 8 + x], expected, "pixel ({x}, {y})");
        }
    }
    assert_eq!(dest[0], 0);
    assert_eq!(dest[7], 127);
    assert_eq!(dest[2 * 8], -128);
}

#[test]
fn chroma_upsampling_supports_full_resolution_planes() {
    let chroma = vec![100u8, 110, 120, 130];
    let mut dest = vec![0i16; 4];
    upsample_chroma_plane(&mut dest, nz(2), nz(2), 0, 0, |y| &chroma[y * 2..]);

    assert_eq!(dest, vec![-28, -18, -8, 2]);
}
