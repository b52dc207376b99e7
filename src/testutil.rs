//! Frame builders, a scripted radio and a recording reporter for unit tests.

use std::string::{String, ToString};
use std::sync::atomic::{AtomicU32, Ordering};
#[cfg(feature = "std")]
use std::sync::Arc;
use std::sync::Mutex;
#[cfg(feature = "std")]
use std::time::Instant;
use std::vec::Vec;

#[cfg(feature = "std")]
use crate::config::{FilterMask, SecondaryChannel};
use crate::frame::RxControl;
#[cfg(feature = "std")]
use crate::radio::{FrameHandler, Radio, RadioError};
use crate::report::{CaptureError, Field, Reporter};

pub fn rx_on(channel: u8, len: usize) -> RxControl {
    RxControl {
        rssi: -50,
        channel,
        cwb: 0,
        timestamp: 1000,
        sig_len: len as u16,
    }
}

/// Beacon frame (type 0, subtype 8).
pub fn mgmt_frame(ra: [u8; 6], ta: [u8; 6], bssid: [u8; 6], payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0x80, 0x00, 0x00, 0x00];
    buf.extend_from_slice(&ra);
    buf.extend_from_slice(&ta);
    buf.extend_from_slice(&bssid);
    buf.extend_from_slice(&[0x10, 0x00]);
    buf.extend_from_slice(payload);
    buf
}

/// ACK frame (type 1, subtype 13): receiver address only.
pub fn ack_frame(ra: [u8; 6]) -> Vec<u8> {
    let mut buf = vec![0xD4, 0x00, 0x00, 0x00];
    buf.extend_from_slice(&ra);
    buf
}

/// Data frame. `a4` sets ToDS+FromDS, otherwise ToDS only; `qos` picks
/// the QoS-data subtype.
pub fn data_frame(
    ra: [u8; 6],
    ta: [u8; 6],
    bssid: [u8; 6],
    a4: Option<[u8; 6]>,
    qos: bool,
    payload: &[u8],
) -> Vec<u8> {
    let fc0 = if qos { 0x88 } else { 0x08 };
    let fc1 = if a4.is_some() { 0x03 } else { 0x01 };
    let mut buf = vec![fc0, fc1, 0x00, 0x00];
    buf.extend_from_slice(&ra);
    buf.extend_from_slice(&ta);
    buf.extend_from_slice(&bssid);
    buf.extend_from_slice(&[0x20, 0x00]);
    if let Some(a4) = a4 {
        buf.extend_from_slice(&a4);
    }
    if qos {
        buf.extend_from_slice(&[0x00, 0x00]);
    }
    buf.extend_from_slice(payload);
    buf
}

/// Radio double: records every command and forwards injected frames to
/// the registered handler while promiscuous mode is on.
#[cfg(feature = "std")]
#[derive(Default)]
pub struct MockRadio {
    handler: Mutex<Option<Arc<dyn FrameHandler>>>,
    hops: Mutex<Vec<(u8, Instant)>>,
    masks: Mutex<Vec<FilterMask>>,
    rejected: Mutex<Vec<u8>>,
    enables: AtomicU32,
    stops: AtomicU32,
    fail_promiscuous: Mutex<bool>,
}

#[cfg(feature = "std")]
impl MockRadio {
    /// Make `set_channel` fail for this channel.
    pub fn reject_channel(&self, channel: u8) {
        self.rejected.lock().unwrap().push(channel);
    }

    pub fn fail_promiscuous(&self, fail: bool) {
        *self.fail_promiscuous.lock().unwrap() = fail;
    }

    pub fn hops(&self) -> Vec<(u8, Instant)> {
        self.hops.lock().unwrap().clone()
    }

    pub fn channels(&self) -> Vec<u8> {
        self.hops().into_iter().map(|(ch, _)| ch).collect()
    }

    pub fn masks(&self) -> Vec<FilterMask> {
        self.masks.lock().unwrap().clone()
    }

    pub fn handler(&self) -> Option<Arc<dyn FrameHandler>> {
        self.handler.lock().unwrap().clone()
    }

    pub fn enables(&self) -> u32 {
        self.enables.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    /// Deliver a frame the way the driver would. Returns false when no
    /// handler is registered.
    pub fn inject(&self, rx: RxControl, data: &[u8]) -> bool {
        match self.handler() {
            Some(handler) => {
                handler.on_frame(rx, data);
                true
            }
            None => false,
        }
    }
}

#[cfg(feature = "std")]
impl Radio for MockRadio {
    fn init(&self) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_promiscuous(
        &self,
        enabled: bool,
        handler: Option<Arc<dyn FrameHandler>>,
    ) -> Result<(), RadioError> {
        if *self.fail_promiscuous.lock().unwrap() {
            return Err(RadioError::Driver(-1));
        }
        let mut slot = self.handler.lock().unwrap();
        if enabled {
            self.enables.fetch_add(1, Ordering::SeqCst);
            *slot = handler;
        } else {
            *slot = None;
        }
        Ok(())
    }

    fn set_channel(&self, channel: u8, _secondary: SecondaryChannel) -> Result<(), RadioError> {
        self.hops.lock().unwrap().push((channel, Instant::now()));
        if self.rejected.lock().unwrap().contains(&channel) {
            return Err(RadioError::Driver(0x3007));
        }
        Ok(())
    }

    fn set_frame_filter(&self, mask: FilterMask) -> Result<(), RadioError> {
        self.masks.lock().unwrap().push(mask);
        Ok(())
    }

    fn stop(&self) -> Result<(), RadioError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.handler.lock().unwrap() = None;
        Ok(())
    }
}

pub type Report = Vec<(&'static str, String)>;

/// Reporter that keeps everything it is given, rendered to strings.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
    errors: Mutex<Vec<CaptureError>>,
    flushes: AtomicU32,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<CaptureError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> u32 {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn value(report: &Report, label: &str) -> Option<String> {
        report
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.clone())
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, fields: &[Field<'_>]) {
        let rendered = fields
            .iter()
            .map(|f| (f.label, f.value.to_string()))
            .collect();
        self.reports.lock().unwrap().push(rendered);
    }

    fn report_error(&self, error: &CaptureError) {
        self.errors.lock().unwrap().push(*error);
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}
