/// Channel hop scheduler. Cycles the radio through the configured channel
/// list on a fixed dwell, until the capture flag clears.
///
/// Runs on its own thread. The run flag is checked before every hop, so a
/// stop request is honored within one dwell interval.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::capture::CaptureContext;
use crate::config::CaptureConfig;
use crate::radio::Radio;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Sweeping,
}

/// What a finished sweep did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepSummary {
    /// Complete passes over the channel list
    pub sweeps: u32,
    /// Channel changes issued
    pub hops: u64,
    /// The sweep limit was reached and the scheduler stopped capture itself
    pub self_cancelled: bool,
}

pub struct ChannelScheduler<R: Radio + ?Sized> {
    radio: Arc<R>,
    ctx: Arc<CaptureContext>,
    config: CaptureConfig,
    state: SchedulerState,
}

impl<R: Radio + ?Sized> ChannelScheduler<R> {
    pub fn new(radio: Arc<R>, ctx: Arc<CaptureContext>, config: CaptureConfig) -> Self {
        Self {
            radio,
            ctx,
            config,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Sweep until the capture flag clears (or the sweep limit is hit),
    /// then halt capture and return to Idle.
    pub fn run(&mut self) -> SweepSummary {
        self.state = SchedulerState::Sweeping;
        let dwell = Duration::from_millis(self.config.dwell_ms);
        let mut summary = SweepSummary::default();

        log::info!(
            "Channel sweep started: channels {:?}, {} ms dwell",
            self.config.channels.as_slice(),
            self.config.dwell_ms
        );

        'sweep: loop {
            for &channel in self.config.channels.iter() {
                if !self.ctx.state().is_running() {
                    break 'sweep;
                }
                match self.radio.set_channel(channel, self.config.secondary) {
                    Ok(()) => log::debug!("Sniffing on channel {}", channel),
                    Err(e) => log::warn!("Failed to tune channel {}: {}", channel, e),
                }
                summary.hops += 1;
                thread::sleep(dwell);
            }
            summary.sweeps += 1;

            if let Some(max) = self.config.max_sweeps {
                if summary.sweeps >= max {
                    summary.self_cancelled = self.ctx.state().stop();
                    break;
                }
            }
        }

        if let Err(e) = self.radio.stop() {
            log::error!("Radio failed to halt capture: {}", e);
        }
        self.state = SchedulerState::Idle;

        log::info!(
            "Channel sweep stopped after {} sweeps ({} hops)",
            summary.sweeps,
            summary.hops
        );
        summary
    }
}
