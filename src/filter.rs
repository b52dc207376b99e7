/// Target-address filter for captured frames.
///
/// Holds the operator's target MAC and tests a frame's address fields
/// against it. The target lives in a critical-section mutex so the driver
/// callback always reads a whole 6-byte value, even while the control
/// thread is replacing it mid-capture.

use core::cell::Cell;

use critical_section::Mutex;

use crate::frame::FrameView;
use crate::mac::MacAddr;

pub struct AddressFilter {
    target: Mutex<Cell<MacAddr>>,
}

impl AddressFilter {
    pub const fn new(target: MacAddr) -> Self {
        Self {
            target: Mutex::new(Cell::new(target)),
        }
    }

    /// Snapshot of the current target.
    pub fn target(&self) -> MacAddr {
        critical_section::with(|cs| self.target.borrow(cs).get())
    }

    /// Replace the target, returning the previous one.
    ///
    /// Frames that already loaded the old target finish with it; every
    /// frame reaching [`matches`](Self::matches) afterwards sees the new one.
    pub fn set_target(&self, target: MacAddr) -> MacAddr {
        critical_section::with(|cs| self.target.borrow(cs).replace(target))
    }

    /// True iff any address the frame carries equals the current target.
    pub fn matches(&self, frame: &FrameView<'_>) -> bool {
        let target = self.target();
        frame.addresses().any(|addr| addr == target)
    }
}

impl Default for AddressFilter {
    fn default() -> Self {
        Self::new(MacAddr::ZERO)
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
    const OTHER: [u8; 6] = [0x41, 0x42, 0x43, 0x44, 0x45, 0x46];

    fn four_addr() -> std::vec::Vec<u8> {
        data_frame(RA, TA, BSSID, Some(A4), false, &[])
    }

    #[test]
    fn matches_each_address_field_individually() {
        let buf = four_addr();
        let view = FrameView::new(rx_on(1, buf.len()), &buf).unwrap();
        for field in [RA, TA, BSSID, A4] {
            let filter = AddressFilter::new(MacAddr(field));
            assert!(filter.matches(&view), "target {:?} should match", field);
        }
    }

    #[test]
    fn no_match_when_target_is_absent() {
        let buf = four_addr();
        let view = FrameView::new(rx_on(1, buf.len()), &buf).unwrap();
        let filter = AddressFilter::new(MacAddr(OTHER));
        assert!(!filter.matches(&view));
    }

    #[test]
    fn absent_fields_never_match_zero_target() {
        // ACK carries only the receiver; the missing fields must not read as zeros
        let buf = ack_frame(RA);
        let view = FrameView::new(rx_on(1, buf.len()), &buf).unwrap();
        assert!(!AddressFilter::new(MacAddr::ZERO).matches(&view));
        assert!(AddressFilter::new(MacAddr(RA)).matches(&view));
    }

    #[test]
    fn set_target_takes_effect_on_next_frame() {
        let buf = mgmt_frame(RA, TA, BSSID, &[]);
        let view = FrameView::new(rx_on(1, buf.len()), &buf).unwrap();
        let filter = AddressFilter::new(MacAddr(OTHER));
        assert!(!filter.matches(&view));

        let previous = filter.set_target(MacAddr(TA));
        assert_eq!(previous, MacAddr(OTHER));
        assert_eq!(filter.target(), MacAddr(TA));
        assert!(filter.matches(&view));
    }

    #[test]
    fn concurrent_updates_never_expose_a_torn_target() {
        use std::sync::Arc;

        let a = MacAddr([0xaa; 6]);
        let b = MacAddr([0xbb; 6]);
        let filter = Arc::new(AddressFilter::new(a));

        let writer = {
            let filter = filter.clone();
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    filter.set_target(if i % 2 == 0 { b } else { a });
                }
            })
        };
        for _ in 0..10_000 {
            let t = filter.target();
            assert!(t == a || t == b, "torn read: {}", t);
        }
        writer.join().unwrap();
    }
}
