//! Fuzz target for per-image annotation CSV parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run annotation_csv_parse

#![no_main]

use endoyolo::dataset::annotation::fuzz_parse_annotation_csv;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Annotation files hold a few boxes; 1MB is plenty.
    if data.len() > 1024 * 1024 {
        return;
    }

    let _ = fuzz_parse_annotation_csv(data);
});
