#![allow(dead_code)]

use endoyolo::dataset::RawAnnotation;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Tolerance for values that went through a 6-decimal label line.
pub fn eps_yolo(image_w: u32, image_h: u32) -> f64 {
    image_w.max(image_h) as f64 * 1e-6
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_image_dims() -> BoxedStrategy<(u32, u32)> {
    (2u32..=4096, 2u32..=4096).boxed()
}

/// A non-degenerate box lying inside a `width` x `height` image.
pub fn arb_raw_within(width: u32, height: u32) -> BoxedStrategy<RawAnnotation> {
    (prop::num::u32::ANY, class_name_strategy())
        .prop_map(move |(seed, class_name)| {
            raw_from_seed(
                class_name,
                width,
                height,
                seed,
                seed.rotate_left(3),
                seed.rotate_left(7),
                seed.rotate_left(11),
            )
        })
        .boxed()
}

/// An image size together with a handful of boxes inside it.
pub fn arb_item(max_boxes: usize) -> BoxedStrategy<(u32, u32, Vec<RawAnnotation>)> {
    arb_image_dims()
        .prop_flat_map(move |(w, h)| {
            (
                Just(w),
                Just(h),
                prop::collection::vec(arb_raw_within(w, h), 0..=max_boxes),
            )
        })
        .boxed()
}

pub fn arb_class_sequence(max_len: usize) -> BoxedStrategy<Vec<String>> {
    prop::collection::vec(class_name_strategy(), 0..=max_len).boxed()
}

fn class_name_strategy() -> BoxedStrategy<String> {
    prop::sample::select(vec!["polyp", "adenoma", "hyperplastic", "sessile", "pedunculated"])
        .prop_map(str::to_string)
        .boxed()
}

fn raw_from_seed(
    class_name: String,
    width: u32,
    height: u32,
    sx: u32,
    sy: u32,
    sw: u32,
    sh: u32,
) -> RawAnnotation {
    let xmin = sx % (width - 1);
    let ymin = sy % (height - 1);
    let xmax = xmin + 1 + (sw % (width - xmin));
    let ymax = ymin + 1 + (sh % (height - ymin));

    RawAnnotation {
        class_name,
        xmin: xmin as i64,
        ymin: ymin as i64,
        xmax: xmax as i64,
        ymax: ymax as i64,
    }
}
