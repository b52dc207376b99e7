/// Capture session: start/stop orchestration.
///
/// A session owns the shared [`CaptureContext`] (run flag, target,
/// counter) for its whole lifetime and runs any number of start/stop
/// cycles. `start` registers a fresh [`CaptureCallback`] with the radio and
/// spawns the channel sweep; `stop` clears the flag, joins the sweep,
/// drains in-flight callbacks and flushes the reporter, so nothing from
/// the stopped session reaches the sink afterwards.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::capture::{CaptureCallback, CaptureContext};
use crate::config::{CaptureConfig, ConfigError};
use crate::mac::{InvalidAddressFormat, MacAddr};
use crate::radio::{FrameHandler, Radio, RadioError};
use crate::report::Reporter;
use crate::scheduler::{ChannelScheduler, SweepSummary};

/// Stack for the channel sweep thread
const SWEEP_STACK_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture is already running")]
    AlreadyRunning,
    #[error("capture is not running")]
    NotRunning,
    #[error("capture has no sweep limit and never ends by itself")]
    NoSweepLimit,
    #[error("invalid MAC address: {0}")]
    InvalidAddress(#[from] InvalidAddressFormat),
    #[error("invalid capture config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Radio(#[from] RadioError),
    #[error("failed to spawn channel sweep thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("channel sweep thread panicked")]
    SchedulerPanicked,
}

pub struct CaptureSession<R: Radio + ?Sized + 'static> {
    radio: Arc<R>,
    reporter: Arc<dyn Reporter>,
    ctx: Arc<CaptureContext>,
    sweep: Option<JoinHandle<SweepSummary>>,
    sweep_limited: bool,
}

impl<R: Radio + ?Sized + 'static> CaptureSession<R> {
    pub fn new(radio: Arc<R>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            radio,
            reporter,
            ctx: Arc::new(CaptureContext::new()),
            sweep: None,
            sweep_limited: false,
        }
    }

    /// Shared capture state, for observers such as a status heartbeat.
    pub fn context(&self) -> Arc<CaptureContext> {
        self.ctx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.ctx.state().is_running()
    }

    /// Matched frames since the last `start`.
    pub fn packet_count(&self) -> u32 {
        self.ctx.counter().get()
    }

    pub fn malformed_count(&self) -> u32 {
        self.ctx.malformed_count()
    }

    pub fn target(&self) -> MacAddr {
        self.ctx.filter().target()
    }

    /// Swap the target while capture runs. The next frame to reach the
    /// filter uses the new address.
    pub fn set_target(&self, target: MacAddr) -> MacAddr {
        let previous = self.ctx.filter().set_target(target);
        log::info!("Target changed {} -> {}", previous, target);
        previous
    }

    /// Parse operator input, then [`start`](Self::start).
    pub fn start_from_str(&mut self, input: &str, config: &CaptureConfig) -> Result<(), SessionError> {
        let target: MacAddr = input.parse()?;
        self.start(target, config)
    }

    pub fn start(&mut self, target: MacAddr, config: &CaptureConfig) -> Result<(), SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        // A sweep that ended on its own leaves a finished thread behind
        self.reap();
        config.validate()?;

        self.radio.set_frame_filter(config.filter_mask)?;
        let callback: Arc<dyn FrameHandler> = Arc::new(CaptureCallback::new(
            self.ctx.clone(),
            self.reporter.clone(),
            config.filter_mask,
        ));
        self.radio.set_promiscuous(true, Some(callback))?;

        // The run flag is still clear, so the callback drops everything
        // until the new target and counter are in place
        self.ctx.reset_session();
        self.ctx.filter().set_target(target);
        self.sweep_limited = config.max_sweeps.is_some();

        if !self.ctx.state().start() {
            return Err(SessionError::AlreadyRunning);
        }

        let mut scheduler = ChannelScheduler::new(self.radio.clone(), self.ctx.clone(), config.clone());
        let spawned = thread::Builder::new()
            .name("chanhop".into())
            .stack_size(SWEEP_STACK_SIZE)
            .spawn(move || scheduler.run());

        match spawned {
            Ok(handle) => self.sweep = Some(handle),
            Err(e) => {
                self.ctx.state().stop();
                if let Err(e) = self.radio.stop() {
                    log::error!("Radio failed to halt capture: {}", e);
                }
                return Err(e.into());
            }
        }

        log::info!(
            "Capture started: target {}, channels {:?}, {} ms dwell",
            target,
            config.channels.as_slice(),
            config.dwell_ms
        );
        Ok(())
    }

    /// Stop capture and block until the sweep has returned.
    pub fn stop(&mut self) -> Result<SweepSummary, SessionError> {
        if !self.ctx.state().stop() {
            self.reap();
            return Err(SessionError::NotRunning);
        }
        self.finish()
    }

    /// Block until a session configured with a sweep limit ends by itself.
    pub fn wait(&mut self) -> Result<SweepSummary, SessionError> {
        if self.sweep.is_none() {
            return Err(SessionError::NotRunning);
        }
        if !self.sweep_limited {
            return Err(SessionError::NoSweepLimit);
        }
        let summary = self.finish();
        self.ctx.state().stop();
        summary
    }

    fn finish(&mut self) -> Result<SweepSummary, SessionError> {
        let joined = match self.sweep.take() {
            Some(handle) => handle.join().map_err(|_| SessionError::SchedulerPanicked),
            None => Ok(SweepSummary::default()),
        };
        if joined.is_err() {
            // The sweep never reached its own halt
            self.ctx.state().stop();
            if let Err(e) = self.radio.stop() {
                log::error!("Radio failed to halt capture: {}", e);
            }
        }

        self.ctx.wait_idle();
        self.reporter.flush();

        log::info!(
            "Capture stopped: {} matched, {} malformed",
            self.packet_count(),
            self.malformed_count()
        );
        joined
    }

    fn reap(&mut self) {
        if self.sweep.is_some() {
            if let Err(e) = self.finish() {
                log::error!("Previous capture ended badly: {}", e);
            }
        }
    }
}

impl<R: Radio + ?Sized + 'static> Drop for CaptureSession<R> {
    fn drop(&mut self) {
        if self.ctx.state().stop() || self.sweep.is_some() {
            let _ = self.finish();
        }
    }
}
