/// Radio metadata extraction for a validated frame.

use crate::frame::{FrameCategory, FrameView};

/// Channel bandwidth as reported by the driver's `cwb` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bandwidth {
    Mhz20,
    Mhz40,
    /// Any code the driver documents no meaning for
    Unknown(u8),
}

impl Bandwidth {
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Bandwidth::Mhz20,
            1 => Bandwidth::Mhz40,
            other => Bandwidth::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Bandwidth::Mhz20 => "20MHz",
            Bandwidth::Mhz40 => "40MHz",
            Bandwidth::Unknown(_) => "unknown",
        }
    }
}

/// Metadata the reporter needs for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedFrame {
    pub category: FrameCategory,
    pub rssi: i8,
    pub channel: u8,
    pub bandwidth: Bandwidth,
}

/// Classify a frame. Pure: the same view always yields the same result.
pub fn classify(frame: &FrameView<'_>) -> ClassifiedFrame {
    let rx = frame.rx();
    ClassifiedFrame {
        category: frame.category(),
        rssi: rx.rssi,
        channel: rx.channel,
        bandwidth: Bandwidth::from_code(rx.cwb),
    }
}
