//! Fuzz target for trainer results log replay.
//!
//! Run with:
//!   cargo +nightly fuzz run results_csv_parse

#![no_main]

use endoyolo::metrics::fuzz_replay_results;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = fuzz_replay_results(data);
});
