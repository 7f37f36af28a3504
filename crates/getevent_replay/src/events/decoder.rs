//! Decoder for raw `input_event` captures

use serde::Serialize;

use crate::config::{describe_event, RecordLayout};

/// One decoded input event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// Seconds since the epoch, `tv_sec + tv_usec / 1e6`
    pub timestamp: f64,
    pub seconds: i64,
    pub microseconds: i64,
    pub event_type: u16,
    pub event_code: u16,
    pub event_value: i32,
    /// The record exactly as it appeared in the capture
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl EventRecord {
    /// Build a record and its raw bytes for the given layout
    pub fn new(
        layout: &RecordLayout,
        seconds: i64,
        microseconds: i64,
        event_type: u16,
        event_code: u16,
        event_value: i32,
    ) -> Self {
        let mut raw = vec![0u8; layout.record_size];
        let order = layout.byte_order;
        layout.seconds.write(&mut raw, seconds, order);
        layout.microseconds.write(&mut raw, microseconds, order);
        layout.event_type.write(&mut raw, event_type as i64, order);
        layout.event_code.write(&mut raw, event_code as i64, order);
        layout.event_value.write(&mut raw, event_value as i64, order);

        Self {
            timestamp: to_timestamp(seconds, microseconds),
            seconds,
            microseconds,
            event_type,
            event_code,
            event_value,
            raw,
        }
    }

    /// Decode one full-width chunk
    fn from_chunk(layout: &RecordLayout, chunk: &[u8]) -> Self {
        let order = layout.byte_order;
        let seconds = layout.seconds.read(chunk, order);
        let microseconds = layout.microseconds.read(chunk, order);

        Self {
            timestamp: to_timestamp(seconds, microseconds),
            seconds,
            microseconds,
            event_type: layout.event_type.read(chunk, order) as u16,
            event_code: layout.event_code.read(chunk, order) as u16,
            event_value: layout.event_value.read(chunk, order) as i32,
            raw: chunk.to_vec(),
        }
    }

    /// Render in the style of `getevent -lt`
    pub fn describe(&self) -> String {
        let (type_label, code_label) = describe_event(self.event_type, self.event_code);
        format!(
            "[{:>14.6}] {:<12} {:<14} {:08x}",
            self.timestamp, type_label, code_label, self.event_value as u32
        )
    }
}

fn to_timestamp(seconds: i64, microseconds: i64) -> f64 {
    seconds as f64 + microseconds as f64 / 1_000_000.0
}

/// Lazy iterator over the complete records of a capture
///
/// Cloning yields an independent iterator from the same position, so a
/// capture can be walked any number of times without re-reading it.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
    layout: RecordLayout,
}

impl<'a> Decoder<'a> {
    /// Number of trailing bytes that do not form a complete record
    pub fn remainder_len(&self) -> usize {
        self.chunks.remainder().len()
    }
}

impl Iterator for Decoder<'_> {
    type Item = EventRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks
            .next()
            .map(|chunk| EventRecord::from_chunk(&self.layout, chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Decoder<'_> {}

/// Decode a capture into records
///
/// A trailing partial record is dropped; captures interrupted mid-write end
/// that way routinely.
pub fn decode<'a>(data: &'a [u8], layout: &RecordLayout) -> Decoder<'a> {
    Decoder {
        chunks: data.chunks_exact(layout.record_size),
        layout: *layout,
    }
}

/// Undo the `\n` to `\r\n` translation a pty-backed `adb shell` applies
pub fn normalize_crlf(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'\r' && data.get(i + 1) == Some(&b'\n') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}
