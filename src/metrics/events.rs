//! TensorBoard event files.
//!
//! An event file is a sequence of TFRecord frames, each holding one protobuf
//! `Event`:
//!
//! ```text
//! u64 LE length | u32 LE masked crc32c(length) | payload | u32 LE masked crc32c(payload)
//! ```
//!
//! Only the handful of `Event`/`Summary` fields needed for scalars are
//! modelled; field numbers follow TensorFlow's `event.proto` and
//! `summary.proto`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;

use super::MetricSink;
use crate::error::EndoYoloError;

const FILE_VERSION: &str = "brain.Event:2";
const CRC_MASK_DELTA: u32 = 0xa282_ead8;

#[derive(Clone, PartialEq, Message)]
pub struct Event {
    #[prost(double, tag = "1")]
    pub wall_time: f64,
    #[prost(int64, tag = "2")]
    pub step: i64,
    #[prost(oneof = "EventPayload", tags = "3, 5")]
    pub payload: Option<EventPayload>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum EventPayload {
    #[prost(string, tag = "3")]
    FileVersion(String),
    #[prost(message, tag = "5")]
    Summary(Summary),
}

#[derive(Clone, PartialEq, Message)]
pub struct Summary {
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<SummaryValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SummaryValue {
    #[prost(string, tag = "1")]
    pub tag: String,
    // A oneof so that 0.0 is still written on the wire.
    #[prost(oneof = "SummaryPayload", tags = "2")]
    pub payload: Option<SummaryPayload>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum SummaryPayload {
    #[prost(float, tag = "2")]
    SimpleValue(f32),
}

/// Masked CRC32C as used by TFRecord framing.
pub fn masked_crc32c(bytes: &[u8]) -> u32 {
    let crc = crc32c::crc32c(bytes);
    ((crc >> 15) | (crc << 17)).wrapping_add(CRC_MASK_DELTA)
}

/// Frames one payload as a TFRecord.
pub fn encode_record(payload: &[u8]) -> Vec<u8> {
    let len = (payload.len() as u64).to_le_bytes();
    let mut record = Vec::with_capacity(payload.len() + 16);
    record.extend_from_slice(&len);
    record.extend_from_slice(&masked_crc32c(&len).to_le_bytes());
    record.extend_from_slice(payload);
    record.extend_from_slice(&masked_crc32c(payload).to_le_bytes());
    record
}

/// Splits a byte stream of TFRecords back into payloads, verifying checksums.
///
/// Returns `None` on truncation or a checksum mismatch.
pub fn decode_records(mut bytes: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut payloads = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < 12 {
            return None;
        }
        let (len_bytes, rest) = bytes.split_at(8);
        let (len_crc, rest) = rest.split_at(4);
        if masked_crc32c(len_bytes).to_le_bytes() != len_crc {
            return None;
        }
        let len = usize::try_from(u64::from_le_bytes(len_bytes.try_into().ok()?)).ok()?;
        if rest.len() < 4 || len > rest.len() - 4 {
            return None;
        }
        let (payload, rest) = rest.split_at(len);
        let (payload_crc, rest) = rest.split_at(4);
        if masked_crc32c(payload).to_le_bytes() != payload_crc {
            return None;
        }
        payloads.push(payload.to_vec());
        bytes = rest;
    }
    Some(payloads)
}

/// A [`MetricSink`] writing scalars to a TensorBoard event file.
pub struct EventFileWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl EventFileWriter {
    /// Creates `log_dir` if needed and opens a new
    /// `events.out.tfevents.<unix-seconds>.<host>` file inside it.
    pub fn create(log_dir: &Path) -> Result<Self, EndoYoloError> {
        std::fs::create_dir_all(log_dir).map_err(|source| EndoYoloError::EventWrite {
            path: log_dir.to_path_buf(),
            source,
        })?;

        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let host = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        let path = log_dir.join(format!("events.out.tfevents.{seconds}.{host}"));

        let file = File::create(&path).map_err(|source| EndoYoloError::EventWrite {
            path: path.clone(),
            source,
        })?;

        let mut writer = Self {
            path,
            writer: BufWriter::new(file),
        };
        writer.write_event(&Event {
            wall_time: wall_time(),
            step: 0,
            payload: Some(EventPayload::FileVersion(FILE_VERSION.to_string())),
        })?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_event(&mut self, event: &Event) -> Result<(), EndoYoloError> {
        let record = encode_record(&event.encode_to_vec());
        self.writer
            .write_all(&record)
            .map_err(|source| EndoYoloError::EventWrite {
                path: self.path.clone(),
                source,
            })
    }
}

impl MetricSink for EventFileWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, step: i64) -> Result<(), EndoYoloError> {
        self.write_event(&Event {
            wall_time: wall_time(),
            step,
            payload: Some(EventPayload::Summary(Summary {
                value: vec![SummaryValue {
                    tag: tag.to_string(),
                    payload: Some(SummaryPayload::SimpleValue(value as f32)),
                }],
            })),
        })
    }

    fn flush(&mut self) -> Result<(), EndoYoloError> {
        self.writer
            .flush()
            .map_err(|source| EndoYoloError::EventWrite {
                path: self.path.clone(),
                source,
            })
    }
}

fn wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
