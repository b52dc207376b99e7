/// Reporting capability for matched frames.
///
/// The capture core never talks to a console or socket directly. It builds
/// an ordered list of `(label, value)` fields and hands it to a [`Reporter`].
/// Implementations decide where the fields go and must absorb their own
/// sink errors; nothing flows back into the capture callback.

use core::fmt;

use heapless::Vec;
use thiserror::Error;

use crate::classify::ClassifiedFrame;
use crate::frame::MalformedFrame;
use crate::mac::MacAddr;

/// Most fields a single report carries
pub const MAX_FIELDS: usize = 12;

/// Payload bytes included in a report
pub const PAYLOAD_PREVIEW_LEN: usize = 16;

/// A field value: integer, string, or raw bytes rendered as hex pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Int(i64),
    Str(&'a str),
    Bytes(&'a [u8]),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Bytes(b) => write!(f, "{}", HexBytes(b)),
        }
    }
}

/// Renders bytes as space-separated lowercase hex pairs: `04 95 e6`.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub label: &'static str,
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    pub const fn int(label: &'static str, value: i64) -> Self {
        Self {
            label,
            value: FieldValue::Int(value),
        }
    }

    pub const fn str(label: &'static str, value: &'a str) -> Self {
        Self {
            label,
            value: FieldValue::Str(value),
        }
    }

    pub const fn bytes(label: &'static str, value: &'a [u8]) -> Self {
        Self {
            label,
            value: FieldValue::Bytes(value),
        }
    }
}

/// Failures absorbed inside the capture path and surfaced once here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error(transparent)]
    MalformedFrame(#[from] MalformedFrame),
    #[error("report queue full, {dropped} reports dropped")]
    QueueOverflow { dropped: u32 },
}

impl CaptureError {
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::MalformedFrame(_) => "malformed_frame",
            CaptureError::QueueOverflow { .. } => "queue_overflow",
        }
    }
}

/// Destination for match reports.
///
/// `report` may be called from the radio driver's callback context. An
/// implementation whose sink can block must queue instead of writing
/// (see `QueuedReporter`).
pub trait Reporter: Send + Sync {
    fn report(&self, fields: &[Field<'_>]);

    /// Error channel for failures the capture path swallowed.
    fn report_error(&self, _error: &CaptureError) {}

    /// Block until everything reported so far has reached the sink.
    /// Never called from callback context.
    fn flush(&self) {}
}

#[cfg(feature = "std")]
impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn report(&self, fields: &[Field<'_>]) {
        (**self).report(fields)
    }

    fn report_error(&self, error: &CaptureError) {
        (**self).report_error(error)
    }

    fn flush(&self) {
        (**self).flush()
    }
}

/// Everything reported about one matched frame. Stack-only, `Copy`, so the
/// callback can build it without touching the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRecord {
    pub count: u32,
    pub receiver: MacAddr,
    pub transmitter: Option<MacAddr>,
    pub bssid: Option<MacAddr>,
    pub address4: Option<MacAddr>,
    pub frame: ClassifiedFrame,
    pub timestamp: u32,
    payload: [u8; PAYLOAD_PREVIEW_LEN],
    payload_len: u8,
}

impl MatchRecord {
    pub fn new(
        count: u32,
        view: &crate::frame::FrameView<'_>,
        frame: ClassifiedFrame,
    ) -> Self {
        let src = view.payload();
        let n = src.len().min(PAYLOAD_PREVIEW_LEN);
        let mut payload = [0u8; PAYLOAD_PREVIEW_LEN];
        payload[..n].copy_from_slice(&src[..n]);
        Self {
            count,
            receiver: view.receiver(),
            transmitter: view.transmitter(),
            bssid: view.bssid(),
            address4: view.address4(),
            frame,
            timestamp: view.rx().timestamp,
            payload,
            payload_len: n as u8,
        }
    }

    /// First payload bytes (at most [`PAYLOAD_PREVIEW_LEN`]).
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len as usize]
    }

    /// Ordered fields: count, addresses present, signal, channel,
    /// bandwidth, category, timestamp, payload preview.
    pub fn fields(&self) -> Vec<Field<'_>, MAX_FIELDS> {
        let mut out = Vec::new();
        let _ = out.push(Field::int("count", self.count as i64));
        let _ = out.push(Field::bytes("receiver", self.receiver.as_bytes()));
        if let Some(ref ta) = self.transmitter {
            let _ = out.push(Field::bytes("transmitter", ta.as_bytes()));
        }
        if let Some(ref bssid) = self.bssid {
            let _ = out.push(Field::bytes("filtering", bssid.as_bytes()));
        }
        if let Some(ref a4) = self.address4 {
            let _ = out.push(Field::bytes("address4", a4.as_bytes()));
        }
        let _ = out.push(Field::int("rssi", self.frame.rssi as i64));
        let _ = out.push(Field::int("channel", self.frame.channel as i64));
        let _ = out.push(Field::str("bandwidth", self.frame.bandwidth.as_str()));
        let _ = out.push(Field::str("category", self.frame.category.as_str()));
        let _ = out.push(Field::int("timestamp", self.timestamp as i64));
        let _ = out.push(Field::bytes("payload", self.payload()));
        out
    }
}

/// Writes each field as its own `log` record, `label: value`.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, fields: &[Field<'_>]) {
        for field in fields {
            log::info!("{}: {}", field.label, field.value);
        }
    }

    fn report_error(&self, error: &CaptureError) {
        log::warn!("capture: {}", error);
    }
}
