/// Capture callback: the per-frame hot path.
///
/// The radio driver calls [`CaptureCallback::on_frame`] once per received
/// frame from its own receive context. Everything here is synchronous and
/// allocation-free: validate, classify, filter, count, hand off to the
/// reporter. Failures are absorbed; the first malformed frame of a session
/// is surfaced once through the reporter's error channel.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::classify::classify;
use crate::config::FilterMask;
use crate::filter::AddressFilter;
use crate::frame::{FrameView, RxControl};
use crate::radio::FrameHandler;
use crate::report::{CaptureError, MatchRecord, Reporter};
use crate::state::{CaptureState, PacketCounter};

/// State shared between the control thread, the channel sweep and the
/// capture callback. Lives as long as the session object, across
/// start/stop cycles.
pub struct CaptureContext {
    state: CaptureState,
    filter: AddressFilter,
    counter: PacketCounter,
    malformed: AtomicU32,
    in_flight: AtomicU32,
}

impl CaptureContext {
    pub const fn new() -> Self {
        Self {
            state: CaptureState::new(),
            filter: AddressFilter::new(crate::mac::MacAddr::ZERO),
            counter: PacketCounter::new(),
            malformed: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn filter(&self) -> &AddressFilter {
        &self.filter
    }

    pub fn counter(&self) -> &PacketCounter {
        &self.counter
    }

    /// Malformed frames dropped this session.
    pub fn malformed_count(&self) -> u32 {
        self.malformed.load(Ordering::Relaxed)
    }

    pub(crate) fn reset_session(&self) {
        self.counter.reset();
        self.malformed.store(0, Ordering::Relaxed);
    }

    /// Spin until no callback invocation is between ingress and return.
    ///
    /// Callers clear the run flag first; any invocation that increments
    /// `in_flight` after we read zero is guaranteed to see the cleared flag.
    pub(crate) fn wait_idle(&self) {
        while self.in_flight.load(Ordering::SeqCst) != 0 {
            std::thread::yield_now();
        }
    }
}

impl Default for CaptureContext {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a AtomicU32);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Capability registered with the radio at session start.
pub struct CaptureCallback {
    ctx: Arc<CaptureContext>,
    reporter: Arc<dyn Reporter>,
    mask: FilterMask,
}

impl CaptureCallback {
    pub fn new(ctx: Arc<CaptureContext>, reporter: Arc<dyn Reporter>, mask: FilterMask) -> Self {
        Self {
            ctx,
            reporter,
            mask,
        }
    }

    /// Process one frame. Returns true when it matched and was reported.
    pub fn handle(&self, rx: RxControl, data: &[u8]) -> bool {
        let _guard = InFlight::enter(&self.ctx.in_flight);

        if !self.ctx.state.is_running() {
            return false;
        }

        let view = match FrameView::new(rx, data) {
            Ok(view) => view,
            Err(e) => {
                if self.ctx.malformed.fetch_add(1, Ordering::Relaxed) == 0 {
                    self.reporter.report_error(&CaptureError::MalformedFrame(e));
                }
                return false;
            }
        };

        // Drivers that ignore the filter mask still get it enforced here
        if !self.mask.admits(view.category()) {
            return false;
        }

        let frame = classify(&view);
        if !self.ctx.filter.matches(&view) {
            return false;
        }

        let count = self.ctx.counter.increment();
        let record = MatchRecord::new(count, &view, frame);
        self.reporter.report(&record.fields());
        true
    }
}

impl FrameHandler for CaptureCallback {
    fn on_frame(&self, rx: RxControl, data: &[u8]) {
        self.handle(rx, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameCategory;
    use crate::mac::MacAddr;
    use crate::testutil::{ack_frame, data_frame, mgmt_frame, rx_on, RecordingReporter};

    const TARGET: [u8; 6] = [0x04, 0x95, 0xe6, 0xf4, 0xfa, 0x11];
    const OTHER: [u8; 6] = [0x10, 0x20, 0x30, 0x40, 0x50, 0x60];

    fn running(mask: FilterMask) -> (Arc<CaptureContext>, Arc<RecordingReporter>, CaptureCallback) {
        let ctx = Arc::new(CaptureContext::new());
        ctx.filter().set_target(MacAddr(TARGET));
        assert!(ctx.state().start());
        let reporter = Arc::new(RecordingReporter::default());
        let callback = CaptureCallback::new(ctx.clone(), reporter.clone(), mask);
        (ctx, reporter, callback)
    }

    #[test]
    fn matching_frame_is_counted_and_reported() {
        let (ctx, reporter, callback) = running(FilterMask::ALL);
        let buf = mgmt_frame([0xff; 6], TARGET, OTHER, &[1, 2, 3]);
        assert!(callback.handle(rx_on(6, buf.len()), &buf));
        assert_eq!(ctx.counter().get(), 1);

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(RecordingReporter::value(&reports[0], "count").as_deref(), Some("1"));
        assert_eq!(RecordingReporter::value(&reports[0], "channel").as_deref(), Some("6"));
        assert_eq!(
            RecordingReporter::value(&reports[0], "payload").as_deref(),
            Some("01 02 03")
        );
    }

    #[test]
    fn counter_only_moves_on_matches_and_stays_ordered() {
        let (ctx, reporter, callback) = running(FilterMask::ALL);
        let hit = data_frame(TARGET, OTHER, OTHER, None, false, &[]);
        let miss = data_frame(OTHER, OTHER, OTHER, None, false, &[]);
        for i in 0..20 {
            let buf = if i % 3 == 0 { &hit } else { &miss };
            callback.handle(rx_on(1 + (i % 11) as u8, buf.len()), buf);
        }
        assert_eq!(ctx.counter().get(), 7);
        let counts: std::vec::Vec<String> = reporter
            .reports()
            .iter()
            .filter_map(|r| RecordingReporter::value(r, "count"))
            .collect();
        let expected: std::vec::Vec<String> = (1..=7).map(|n| n.to_string()).collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn stopped_state_short_circuits() {
        let (ctx, reporter, callback) = running(FilterMask::ALL);
        ctx.state().stop();
        let buf = mgmt_frame(TARGET, TARGET, TARGET, &[]);
        assert!(!callback.handle(rx_on(1, buf.len()), &buf));
        // Malformed input is not even inspected once stopped
        assert!(!callback.handle(rx_on(1, 2), &buf));
        assert!(reporter.reports().is_empty());
        assert!(reporter.errors().is_empty());
        assert_eq!(ctx.counter().get(), 0);
    }

    #[test]
    fn malformed_frames_surface_one_error() {
        let (ctx, reporter, callback) = running(FilterMask::ALL);
        let buf = [0u8; 4];
        for _ in 0..5 {
            assert!(!callback.handle(rx_on(1, buf.len()), &buf));
        }
        assert_eq!(ctx.malformed_count(), 5);
        let errors = reporter.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), "malformed_frame");
        assert!(reporter.reports().is_empty());
    }

    #[test]
    fn filter_mask_drops_excluded_categories() {
        let (_ctx, reporter, callback) = running(FilterMask::MGMT);
        let ack = ack_frame(TARGET);
        assert!(!callback.handle(rx_on(1, ack.len()), &ack));
        let mgmt = mgmt_frame(TARGET, OTHER, OTHER, &[]);
        assert!(callback.handle(rx_on(1, mgmt.len()), &mgmt));
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            RecordingReporter::value(&reports[0], "category").as_deref(),
            Some(FrameCategory::Management.as_str())
        );
    }

    #[test]
    fn target_change_applies_to_next_frame() {
        let (ctx, reporter, callback) = running(FilterMask::ALL);
        let buf = mgmt_frame(OTHER, OTHER, OTHER, &[]);
        assert!(!callback.handle(rx_on(1, buf.len()), &buf));
        ctx.filter().set_target(MacAddr(OTHER));
        assert!(callback.handle(rx_on(1, buf.len()), &buf));
        assert_eq!(reporter.reports().len(), 1);
    }
}
