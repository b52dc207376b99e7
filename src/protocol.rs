/// NDJSON message protocol for streaming capture results.
///
/// All messages are newline-delimited JSON objects tagged by `type`.
/// Encoding goes through `serde_json_core` into fixed-size buffers, so it
/// works without an allocator.
use core::fmt::Write as _;

use heapless::{String, Vec};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::report::{CaptureError, Field, FieldValue, HexBytes};

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 512;

/// Buffer type for serialized JSON messages
pub type MsgBuffer = Vec<u8, MAX_MSG_LEN>;

/// Ordered report fields, serialized as a JSON object in field order.
pub struct FieldMap<'a>(pub &'a [Field<'a>]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in self.0 {
            map.serialize_entry(field.label, &JsonValue(field.value))?;
        }
        map.end()
    }
}

struct JsonValue<'a>(FieldValue<'a>);

impl Serialize for JsonValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            FieldValue::Int(v) => serializer.serialize_i64(v),
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::Bytes(b) => {
                // 16-byte payload preview → 47 chars
                let mut hex: String<64> = String::new();
                let _ = write!(hex, "{}", HexBytes(b));
                serializer.serialize_str(&hex)
            }
        }
    }
}

/// Messages sent from the device to whoever reads the output stream
#[derive(serde::Serialize)]
#[serde(tag = "type")]
pub enum DeviceMessage<'a> {
    /// A frame that matched the target address
    #[serde(rename = "frame")]
    Frame { fields: FieldMap<'a> },
    /// A failure the capture path absorbed
    #[serde(rename = "error")]
    Error {
        /// "malformed_frame" or "queue_overflow"
        kind: &'static str,
        /// Reports dropped, or 1 for single events
        count: u32,
    },
    /// Device status heartbeat
    #[serde(rename = "status")]
    Status {
        capturing: bool,
        /// Matched frames in the current session
        count: u32,
        /// Uptime in seconds
        uptime: u32,
        /// Free heap in bytes
        heap_free: u32,
        /// Board identifier
        board: &'static str,
        /// Firmware version
        version: &'static str,
    },
}

impl DeviceMessage<'_> {
    pub fn from_error(error: &CaptureError) -> DeviceMessage<'static> {
        let count = match error {
            CaptureError::QueueOverflow { dropped } => *dropped,
            CaptureError::MalformedFrame(_) => 1,
        };
        DeviceMessage::Error {
            kind: error.kind(),
            count,
        }
    }
}

/// Serialize a DeviceMessage to JSON bytes and write to the output buffer.
/// Returns the number of bytes written, or None if serialization failed.
pub fn serialize_message(msg: &DeviceMessage, buf: &mut [u8]) -> Option<usize> {
    match serde_json_core::to_slice(msg, buf) {
        Ok(len) => {
            // Append newline for NDJSON
            if len < buf.len() {
                buf[len] = b'\n';
                Some(len + 1)
            } else {
                Some(len)
            }
        }
        Err(_) => None,
    }
}

/// Serialize into a fresh [`MsgBuffer`], trimmed to the encoded length.
pub fn encode(msg: &DeviceMessage) -> Option<MsgBuffer> {
    let mut buf = MsgBuffer::new();
    buf.resize_default(MAX_MSG_LEN).ok();
    let len = serialize_message(msg, &mut buf)?;
    buf.truncate(len);
    Some(buf)
}

/// Reporter that writes one NDJSON line per report to an `io::Write`.
///
/// Writes block, so wrap it in a `QueuedReporter` before handing it to a
/// capture session. Write errors are logged and dropped.
#[cfg(feature = "std")]
pub struct NdjsonReporter<W> {
    out: std::sync::Mutex<W>,
}

#[cfg(feature = "std")]
impl<W: std::io::Write + Send> NdjsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: std::sync::Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self, msg: &DeviceMessage) {
        let Some(buf) = encode(msg) else {
            log::warn!("NDJSON message exceeds {} bytes, dropped", MAX_MSG_LEN);
            return;
        };
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = out.write_all(&buf) {
            log::warn!("NDJSON write failed: {}", e);
        }
    }
}

#[cfg(feature = "std")]
impl<W: std::io::Write + Send> crate::report::Reporter for NdjsonReporter<W> {
    fn report(&self, fields: &[Field<'_>]) {
        self.write(&DeviceMessage::Frame {
            fields: FieldMap(fields),
        });
    }

    fn report_error(&self, error: &CaptureError) {
        self.write(&DeviceMessage::from_error(error));
    }

    fn flush(&self) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.flush();
        }
    }
}
