use std::{hint::black_box, num::NonZeroUsize};

use criterion::{Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;
use vapoursynth_zoodepth::{
    depth_estimator::DepthEstimator,
    motion_estimator::{BORDER, MotionEstimator},
    mv::MotionVector,
    pad::pad_extended_plane,
    params::SearchStrategy,
    util::fill_extended_plane,
};

const WIDTH: usize = 320;
const HEIGHT: usize = 240;

fn random_extended(rng: &mut Xoshiro128StarStar) -> Vec<u8> {
    let width = NonZeroUsize::new(WIDTH).unwrap();
    let height = NonZeroUsize::new(HEIGHT).unwrap();
    let mut visible = vec![0u8; WIDTH * HEIGHT];
    rng.fill(visible.as_mut_slice());

    let mut ext = vec![0u8; (WIDTH + 2 * BORDER) * (HEIGHT + 2 * BORDER)];
    fill_extended_plane(&mut ext, width, height, |y| &visible[y * WIDTH..]);
    pad_extended_plane(&mut ext, width, height);
    ext
}

pub fn bench_arps(c: &mut Criterion) {
    c.bench_function("motion estimate arps 320x240", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let cur = random_extended(&mut rng);
        let prev = random_extended(&mut rng);
        let estimator = MotionEstimator::new(
            NonZeroUsize::new(WIDTH).unwrap(),
            NonZeroUsize::new(HEIGHT).unwrap(),
            75,
            false,
        );
        let mut mvectors = vec![MotionVector::zero(); estimator.mv_count()];

        b.iter(|| {
            estimator.estimate(
                black_box(&cur),
                black_box(&prev),
                None,
                None,
                None,
                &mut mvectors,
            );
        })
    });
}

pub fn bench_full_search(c: &mut Criterion) {
    c.bench_function("motion estimate full search 64x48", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        // Full search is far too slow for a full-size frame.
        let width = NonZeroUsize::new(64).unwrap();
        let height = NonZeroUsize::new(48).unwrap();
        let mut visible = vec![0u8; 64 * 48];
        rng.fill(visible.as_mut_slice());
        let mut cur = vec![0u8; (64 + 2 * BORDER) * (48 + 2 * BORDER)];
        fill_extended_plane(&mut cur, width, height, |y| &visible[y * 64..]);
        pad_extended_plane(&mut cur, width, height);
        let mut prev = cur.clone();
        rng.fill(visible.as_mut_slice());
        fill_extended_plane(&mut prev, width, height, |y| &visible[y * 64..]);
        pad_extended_plane(&mut prev, width, height);

        let estimator = MotionEstimator::new(width, height, 75, false)
            .with_strategy(SearchStrategy::FullSearch);
        let mut mvectors = vec![MotionVector::zero(); estimator.mv_count()];

        b.iter(|| {
            estimator.estimate(
                black_box(&cur),
                black_box(&prev),
                None,
                None,
                None,
                &mut mvectors,
            );
        })
    });
}

pub fn bench_depth_estimate(c: &mut Criterion) {
    c.bench_function("depth estimate 320x240", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let cur = random_extended(&mut rng);
        let prev = random_extended(&mut rng);
        let width = NonZeroUsize::new(WIDTH).unwrap();
        let height = NonZeroUsize::new(HEIGHT).unwrap();

        let motion = MotionEstimator::new(width, height, 75, false);
        let mut mvectors = vec![MotionVector::zero(); motion.mv_count()];
        motion.estimate(&cur, &prev, None, None, None, &mut mvectors);

        let mut depth = DepthEstimator::new(width, height, 75);
        let mut depth_map = vec![0u8; WIDTH * HEIGHT];

        b.iter(|| {
            depth.estimate(
                black_box(&cur),
                &[],
                &[],
                black_box(&mvectors),
                &mut depth_map,
            );
        })
    });
}

criterion_group!(estimate, bench_arps, bench_full_search, bench_depth_estimate);
criterion_main!(estimate);
