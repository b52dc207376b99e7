/// Radio driver seam.
///
/// The capture engine never calls a vendor API directly. Firmware provides
/// a [`Radio`] implementation (ESP-IDF promiscuous mode), tests provide a
/// mock. Frames flow back through the [`FrameHandler`] capability passed to
/// [`Radio::set_promiscuous`].

use std::sync::Arc;

use thiserror::Error;

use crate::config::{FilterMask, SecondaryChannel};
use crate::frame::RxControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RadioError {
    /// Raw status code from the vendor driver
    #[error("radio driver returned error {0}")]
    Driver(i32),
    #[error("radio is not initialized")]
    NotInitialized,
}

/// Per-frame entry point the driver invokes.
///
/// Called from the driver's receive context: implementations must not
/// block, allocate unboundedly, or panic. `data` is only valid for the
/// duration of the call.
pub trait FrameHandler: Send + Sync {
    fn on_frame(&self, rx: RxControl, data: &[u8]);
}

/// Operations the capture engine needs from the radio.
pub trait Radio: Send + Sync {
    /// Bring the radio up in a mode that allows promiscuous capture.
    /// A failure here is fatal: nothing else can work.
    fn init(&self) -> Result<(), RadioError>;

    /// Enable or disable promiscuous receive. When enabling, `handler`
    /// replaces any previously registered handler.
    fn set_promiscuous(
        &self,
        enabled: bool,
        handler: Option<Arc<dyn FrameHandler>>,
    ) -> Result<(), RadioError>;

    fn set_channel(&self, channel: u8, secondary: SecondaryChannel) -> Result<(), RadioError>;

    /// Restrict which frame categories the driver delivers.
    fn set_frame_filter(&self, mask: FilterMask) -> Result<(), RadioError>;

    /// Halt capture: stop delivering frames and drop the registered handler.
    fn stop(&self) -> Result<(), RadioError>;
}

impl<T: Radio + ?Sized> Radio for Arc<T> {
    fn init(&self) -> Result<(), RadioError> {
        (**self).init()
    }

    fn set_promiscuous(
        &self,
        enabled: bool,
        handler: Option<Arc<dyn FrameHandler>>,
    ) -> Result<(), RadioError> {
        (**self).set_promiscuous(enabled, handler)
    }

    fn set_channel(&self, channel: u8, secondary: SecondaryChannel) -> Result<(), RadioError> {
        (**self).set_channel(channel, secondary)
    }

    fn set_frame_filter(&self, mask: FilterMask) -> Result<(), RadioError> {
        (**self).set_frame_filter(mask)
    }

    fn stop(&self) -> Result<(), RadioError> {
        (**self).stop()
    }
}
