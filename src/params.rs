
use anyhow::{Result, bail};

/// Which half-pixel phase of the previous luma plane a motion vector points
/// into. `None` is the unshifted plane; the other three are produced by
/// bilinear interpolation (see `refine`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShiftDir {
    #[default]
    None,
    Up,
    Left,
    UpLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Exhaustive search over the full ±BORDER window. Ground-truth quality,
    /// prohibitively slow for real video.
    FullSearch,
    /// Adaptive rood pattern search with unit-step refinement. Production path.
    Arps,
}

impl TryFrom<i64> for SearchStrategy {
    type Error = anyhow::Error;

    fn try_from(val: i64) -> Result<Self> {
        Ok(match val {
            0 => Self::FullSearch,
            1 => Self::Arps,
            _ => bail!("Invalid value for 'search', must be 0 or 1, got {val}."),
        })
    }
}

/// SAD acceptance thresholds for the ARPS phases, selected by the quality
/// setting.
///
/// The raw table values are scaled to a 16x16 block; the final division by 4
/// brings them to the 8x8 tile the search actually runs on. `second` gates
/// the half-pixel refinement and is overridden to equal `first`; the override
/// is kept for behavioral equivalence with the reference filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchThresholds {
    pub zmp: u64,
    pub first: u64,
    pub second: u64,
}

impl SearchThresholds {
    #[must_use]
    pub fn new(quality: u8, use_half_pixel: bool) -> Self {
        let (zmp, first) = if quality > 90 {
            let tight = if use_half_pixel { 128 } else { 256 };
            (tight, tight)
        } else if quality > 70 {
            (512, 512)
        } else if quality > 50 {
            (768, 768)
        } else if quality > 30 {
            (1024, 1024)
        } else {
            (1536, 1536)
        };
        // The table carries a distinct third column (64/256/512/768/1024), but
        // the reference overrides it with `first` before scaling. Keep that.
        let second = first;

        SearchThresholds {
            zmp: zmp / 4,
            first: first / 4,
            second: second / 4,
        }
    }
}
