/// Zero-copy view over a raw 802.11 capture buffer.
///
/// The radio hands us its receive metadata ([`RxControl`]) and a borrowed
/// buffer holding the MAC frame. [`FrameView::new`] validates the declared
/// length against the header the frame-control field announces, so every
/// accessor afterwards reads inside the checked bounds.
///
/// Safe to construct from ISR / driver-callback context (no allocation).

use thiserror::Error;

use crate::mac::MacAddr;

/// Frame control (2) + duration (2) + address 1 (6)
pub const MIN_HEADER_LEN: usize = 10;

/// Management and three-address data header length
const LONG_HEADER_LEN: usize = 24;

/// Receive metadata reported by the radio alongside each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxControl {
    /// Received signal strength (dBm)
    pub rssi: i8,
    /// Primary channel the frame was received on
    pub channel: u8,
    /// Driver channel-bandwidth code (0 = 20 MHz, 1 = 40 MHz)
    pub cwb: u8,
    /// Local receive timestamp in microseconds
    pub timestamp: u32,
    /// Declared frame length in bytes
    pub sig_len: u16,
}

/// Coarse 802.11 frame classification (the two "type" bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameCategory {
    Management,
    Control,
    Data,
    Extension,
}

impl FrameCategory {
    pub const fn from_type_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => FrameCategory::Management,
            1 => FrameCategory::Control,
            2 => FrameCategory::Data,
            _ => FrameCategory::Extension,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameCategory::Management => "management",
            FrameCategory::Control => "control",
            FrameCategory::Data => "data",
            FrameCategory::Extension => "extension",
        }
    }
}

/// The buffer is too short for the header it claims to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed frame: {len} bytes available, header needs {required}")]
pub struct MalformedFrame {
    pub len: usize,
    pub required: usize,
}

/// A validated, borrowed view of one received frame.
///
/// Must not outlive the driver callback that produced the buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    rx: RxControl,
    bytes: &'a [u8],
    header_len: usize,
}

impl<'a> FrameView<'a> {
    /// Validate `buf` against the declared length `rx.sig_len`.
    pub fn new(rx: RxControl, buf: &'a [u8]) -> Result<Self, MalformedFrame> {
        let declared = rx.sig_len as usize;
        if declared < MIN_HEADER_LEN {
            return Err(MalformedFrame {
                len: declared,
                required: MIN_HEADER_LEN,
            });
        }
        if declared > buf.len() {
            return Err(MalformedFrame {
                len: buf.len(),
                required: declared,
            });
        }

        let bytes = &buf[..declared];
        let header_len = header_len(bytes[0], bytes[1]);
        if declared < header_len {
            return Err(MalformedFrame {
                len: declared,
                required: header_len,
            });
        }

        Ok(Self {
            rx,
            bytes,
            header_len,
        })
    }

    pub fn rx(&self) -> &RxControl {
        &self.rx
    }

    /// Raw frame bytes, header included, cut to the declared length.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn category(&self) -> FrameCategory {
        FrameCategory::from_type_bits(self.bytes[0] >> 2)
    }

    pub fn to_ds(&self) -> bool {
        self.bytes[1] & 0x01 != 0
    }

    pub fn from_ds(&self) -> bool {
        self.bytes[1] & 0x02 != 0
    }

    /// Address 1. Every category carries it.
    pub fn receiver(&self) -> MacAddr {
        self.addr_at(4).unwrap_or(MacAddr::ZERO)
    }

    /// Address 2, absent on CTS/ACK and extension frames.
    pub fn transmitter(&self) -> Option<MacAddr> {
        match self.category() {
            FrameCategory::Management | FrameCategory::Data => self.addr_at(10),
            FrameCategory::Control if self.header_len >= 16 => self.addr_at(10),
            _ => None,
        }
    }

    /// Address 3: management and data frames only.
    pub fn bssid(&self) -> Option<MacAddr> {
        match self.category() {
            FrameCategory::Management | FrameCategory::Data => self.addr_at(16),
            _ => None,
        }
    }

    /// Address 4: data frames with both ToDS and FromDS set (WDS / mesh).
    pub fn address4(&self) -> Option<MacAddr> {
        if self.category() == FrameCategory::Data && self.to_ds() && self.from_ds() {
            self.addr_at(24)
        } else {
            None
        }
    }

    /// All addresses this frame actually carries, in header order.
    pub fn addresses(&self) -> impl Iterator<Item = MacAddr> {
        [
            Some(self.receiver()),
            self.transmitter(),
            self.bssid(),
            self.address4(),
        ]
        .into_iter()
        .flatten()
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Bytes after the MAC header, up to the declared length.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.header_len..]
    }

    fn addr_at(&self, offset: usize) -> Option<MacAddr> {
        self.bytes
            .get(offset..offset + 6)
            .and_then(MacAddr::from_slice)
    }
}

/// Header length implied by the first two frame-control bytes.
fn header_len(fc0: u8, fc1: u8) -> usize {
    let subtype = (fc0 >> 4) & 0xF;
    match FrameCategory::from_type_bits(fc0 >> 2) {
        FrameCategory::Management => LONG_HEADER_LEN,
        // CTS and ACK carry only the receiver address
        FrameCategory::Control if matches!(subtype, 12 | 13) => MIN_HEADER_LEN,
        FrameCategory::Control => 16,
        FrameCategory::Data => {
            let mut len = LONG_HEADER_LEN;
            if fc1 & 0x03 == 0x03 {
                len += 6;
            }
            if subtype & 0x8 != 0 {
                len += 2; // QoS control
            }
            len
        }
        FrameCategory::Extension => MIN_HEADER_LEN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ack_frame, data_frame, mgmt_frame, rx_on};

    const RA: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
    const TA: [u8; 6] = [0x11, 0x12, 0x13, 0x14, 0x15, 0x16];
    const BSSID: [u8; 6] = [0x21, 0x22, 0x23, 0x24, 0x25, 0x26];
    const A4: [u8; 6] = [0x31, 0x32, 0x33, 0x34, 0x35, 0x36];

    #[test]
    fn rejects_every_length_below_minimum_header() {
        let buf = [0u8; MIN_HEADER_LEN];
        for len in 0..MIN_HEADER_LEN {
            let err = FrameView::new(rx_on(1, len), &buf).unwrap_err();
            assert_eq!(err, MalformedFrame { len, required: MIN_HEADER_LEN });
        }
    }

    #[test]
    fn rejects_declared_length_past_buffer_end() {
        let buf = mgmt_frame(RA, TA, BSSID, &[]);
        let err = FrameView::new(rx_on(1, buf.len() + 4), &buf).unwrap_err();
        assert_eq!(err.required, buf.len() + 4);
    }

    #[test]
    fn rejects_management_frame_shorter_than_its_header() {
        let buf = mgmt_frame(RA, TA, BSSID, &[]);
        let err = FrameView::new(rx_on(1, 20), &buf).unwrap_err();
        assert_eq!(err, MalformedFrame { len: 20, required: 24 });
    }

    #[test]
    fn management_frame_exposes_three_addresses() {
        let buf = mgmt_frame(RA, TA, BSSID, &[0xAA, 0xBB]);
        let view = FrameView::new(rx_on(6, buf.len()), &buf).unwrap();
        assert_eq!(view.category(), FrameCategory::Management);
        assert_eq!(view.receiver(), MacAddr(RA));
        assert_eq!(view.transmitter(), Some(MacAddr(TA)));
        assert_eq!(view.bssid(), Some(MacAddr(BSSID)));
        assert_eq!(view.address4(), None);
        assert_eq!(view.payload(), &[0xAA, 0xBB]);
    }

    #[test]
    fn ack_frame_carries_receiver_only() {
        let buf = ack_frame(RA);
        let view = FrameView::new(rx_on(1, buf.len()), &buf).unwrap();
        assert_eq!(view.category(), FrameCategory::Control);
        assert_eq!(view.receiver(), MacAddr(RA));
        assert_eq!(view.transmitter(), None);
        assert_eq!(view.bssid(), None);
        assert_eq!(view.addresses().count(), 1);
        assert!(view.payload().is_empty());
    }

    #[test]
    fn four_address_data_frame_exposes_address4() {
        let buf = data_frame(RA, TA, BSSID, Some(A4), false, &[0x42]);
        let view = FrameView::new(rx_on(11, buf.len()), &buf).unwrap();
        assert_eq!(view.category(), FrameCategory::Data);
        assert!(view.to_ds() && view.from_ds());
        assert_eq!(view.address4(), Some(MacAddr(A4)));
        assert_eq!(view.header_len(), 30);
        assert_eq!(view.payload(), &[0x42]);
    }

    #[test]
    fn truncated_four_address_header_is_malformed() {
        let buf = data_frame(RA, TA, BSSID, Some(A4), false, &[]);
        let err = FrameView::new(rx_on(11, 26), &buf).unwrap_err();
        assert_eq!(err, MalformedFrame { len: 26, required: 30 });
    }

    #[test]
    fn qos_data_payload_starts_after_qos_control() {
        let buf = data_frame(RA, TA, BSSID, None, true, &[0xde, 0xad]);
        let view = FrameView::new(rx_on(3, buf.len()), &buf).unwrap();
        assert_eq!(view.header_len(), 26);
        assert_eq!(view.payload(), &[0xde, 0xad]);
    }

    #[test]
    fn view_is_cut_to_declared_length() {
        let buf = mgmt_frame(RA, TA, BSSID, &[1, 2, 3, 4]);
        let view = FrameView::new(rx_on(1, 26), &buf).unwrap();
        assert_eq!(view.bytes().len(), 26);
        assert_eq!(view.payload(), &[1, 2]);
    }
}
