#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::num::NonZeroUsize;

use super::*;
use crate::util::fill_extended_plane;

fn nz(val: usize) -> NonZeroUsize {
    NonZeroUsize::new(val).unwrap()
}

fn make_padded(width: usize, height: usize) -> Vec<u8> {
    let mut visible = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            visible[y * width + x] = ((y * width + x) % 255) as u8;
        }
    }

    let mut ext = vec![0u8; (width + 2 * BORDER) * (height + 2 * BORDER)];
    fill_extended_plane(&mut ext, nz(width), nz(height), |y| &visible[y * width..]);
    pad_extended_plane(&mut ext, nz(width), nz(height));
    ext
}

#[test]
fn borders_replicate_the_visible_edges() {
    let width = 24;
    let height = 10;
    let pitch = width + 2 * BORDER;
    let ext = make_padded(width, height);
    let at = |x: usize, y: usize| ext[y * pitch + x];

    // Top and bottom strips repeat the first/last visible row.
    for x in 0..width {
        let top = at(BORDER + x, BORDER);
        let bottom = at(BORDER + x, BORDER + height - 1);
        for y in 0..BORDER {
            assert_eq!(at(BORDER + x, y), top, "top strip at ({x}, {y})");
            assert_eq!(
                at(BORDER + x, BORDER + height + y),
                bottom,
                "bottom strip at ({x}, {y})"
            );
        }
    }

    // Left and right strips repeat the first/last visible column.
    for y in 0..height {
        let left = at(BORDER, BORDER + y);
        let right = at(BORDER + width - 1, BORDER + y);
        for x in 0..BORDER {
            assert_eq!(at(x, BORDER + y), left, "left strip at ({x}, {y})");
            assert_eq!(
                at(BORDER + width + x, BORDER + y),
                right,
                "right strip at ({x}, {y})"
            );
        }
    }
}

#[test]
fn corners_replicate_the_corner_pixels() {
    let width = 24;
    let height = 10;
    let pitch = width + 2 * BORDER;
    let ext = make_padded(width, height);
    let at = |x: usize, y: usize| ext[y * pitch + x];

    let tl = at(BORDER, BORDER);
    let tr = at(BORDER + width - 1, BORDER);
    let bl = at(BORDER, BORDER + height - 1);
    let br = at(BORDER + width - 1, BORDER + height - 1);

    for y in 0..BORDER {
        for x in 0..BORDER {
            assert_eq!(at(x, y), tl);
            assert_eq!(at(BORDER + width + x, y), tr);
            assert_eq!(at(x, BORDER + height + y), bl);
            assert_eq!(at(BORDER + width + x, BORDER + height + y), br);
        }
    }
}

#[test]
fn visible_area_is_untouched() {
    let width = 24;
    let height = 10;
    let pitch = width + 2 * BORDER;
    let ext = make_padded(width, height);

    for y in 0..height {
        for x in 0..width {
            let expected = ((y * width + x) % 255) as u8;
            assert_eq!(ext[(y + BORDER) * pitch + x + BORDER], expected);
        }
    }
}
