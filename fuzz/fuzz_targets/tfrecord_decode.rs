//! Fuzz target for TFRecord frame decoding.
//!
//! Run with:
//!   cargo +nightly fuzz run tfrecord_decode

#![no_main]

use endoyolo::metrics::events::{decode_records, Event};
use libfuzzer_sys::fuzz_target;
use prost::Message;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Some(payloads) = decode_records(data) {
        for payload in payloads {
            let _ = Event::decode(payload.as_slice());
        }
    }
});
