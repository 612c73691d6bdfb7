#![allow(clippy::unwrap_used, reason = "allow in test files")]

use vapoursynth::format::PresetFormat;

use super::*;
use crate::tests::create_test_env;

#[test]
fn new_with_default_args() {
    let env = create_test_env(640, 480, PresetFormat::YUV420P8, 10).unwrap();
    let (node, _) = env.get_output(0).unwrap();

    let depth = DepthFilter::new(node, None, None, None).unwrap();

    assert_eq!(depth.quality, 75);
    assert!(depth.use_half_pixel);
    assert_eq!(depth.strategy, SearchStrategy::Arps);
    assert_eq!(depth.width.get(), 640);
    assert_eq!(depth.height.get(), 480);
}

#[test]
fn new_with_specified_args() {
    let env = create_test_env(320, 240, PresetFormat::YUV444P8, 5).unwrap();
    let (node, _) = env.get_output(0).unwrap();

    let depth = DepthFilter::new(node, Some(100), Some(0), Some(0)).unwrap();

    assert_eq!(depth.quality, 100);
    assert!(!depth.use_half_pixel);
    assert_eq!(depth.strategy, SearchStrategy::FullSearch);
}

#[test]
fn state_buffers_are_sized_at_construction() {
    let env = create_test_env(64, 48, PresetFormat::YUV420P8, 5).unwrap();
    let (node, _) = env.get_output(0).unwrap();

    let depth = DepthFilter::new(node, Some(90), Some(1), None).unwrap();
    let state = depth.state.lock().unwrap();

    let ext_len = (64 + 32) * (48 + 32);
    assert_eq!(state.cur_ext.len(), ext_len);
    assert_eq!(state.prev_ext.len(), ext_len);
    assert_eq!(state.prev_up.len(), ext_len);
    assert_eq!(state.prev_left.len(), ext_len);
    assert_eq!(state.prev_upleft.len(), ext_len);
    assert_eq!(state.cur_u.len(), 64 * 48);
    assert_eq!(state.cur_v.len(), 64 * 48);
    assert_eq!(state.depth_map.len(), 64 * 48);
    assert_eq!(state.mvectors.len(), 4 * 3);
}

#[test]
fn half_pixel_planes_are_not_allocated_when_disabled() {
    let env = create_test_env(64, 48, PresetFormat::Gray8, 5).unwrap();
    let (node, _) = env.get_output(0).unwrap();

    let depth = DepthFilter::new(node, None, Some(0), None).unwrap();
    let state = depth.state.lock().unwrap();

    assert!(state.prev_up.is_empty());
    assert!(state.prev_left.is_empty());
    assert!(state.prev_upleft.is_empty());
    // Gray input carries no chroma side channel either.
    assert!(state.cur_u.is_empty());
    assert!(state.cur_v.is_empty());
}

#[test]
fn rejects_high_bit_depth_clips() {
    let env = create_test_env(64, 48, PresetFormat::YUV420P10, 5).unwrap();
    let (node, _) = env.get_output(0).unwrap();

    assert!(DepthFilter::new(node, None, None, None).is_err());
}

#[test]
fn rejects_out_of_range_quality() {
    let env = create_test_env(64, 48, PresetFormat::YUV420P8, 5).unwrap();
    let (node, _) = env.get_output(0).unwrap();

    assert!(DepthFilter::new(node, Some(300), None, None).is_err());
}

#[test]
fn rejects_unknown_search_strategy() {
    let env = create_test_env(64, 48, PresetFormat::YUV420P8, 5).unwrap();
    let (node, _) = env.get_output(0).unwrap();

    assert!(DepthFilter::new(node, None, None, Some(7)).is_err());
}
