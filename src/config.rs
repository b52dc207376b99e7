/// Capture configuration: channel sweep plan and driver frame filter.
///
/// Defaults sweep the 2.4 GHz band. A JSON document can override any
/// field; it is parsed with `serde_json_core` into a flat raw struct and
/// folded over the defaults, then validated.

use heapless::Vec;
use serde::Deserialize;
use thiserror::Error;

/// Most channels a sweep plan can hold (2.4 GHz has 14)
pub const MAX_CHANNELS: usize = 14;

/// WiFi channels to scan (ESP32/ESP32-S3 promiscuous mode is 2.4 GHz only)
pub const WIFI_CHANNELS: &[u8] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];

/// Default dwell time per channel in milliseconds.
/// 120ms ensures reliable beacon capture (beacons broadcast every ~100ms).
/// Full cycle: 13 channels × 120ms = 1.56s.
pub const DEFAULT_DWELL_MS: u64 = 120;

/// Which frame categories the driver should deliver.
///
/// Bit values follow the ESP-IDF `WIFI_PROMIS_FILTER_MASK_*` constants so
/// the firmware can pass the mask straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FilterMask(pub u32);

impl FilterMask {
    pub const ALL: FilterMask = FilterMask(0xFFFF_FFFF);
    pub const MGMT: FilterMask = FilterMask(1 << 0);
    pub const CTRL: FilterMask = FilterMask(1 << 1);
    pub const DATA: FilterMask = FilterMask(1 << 2);
    pub const MISC: FilterMask = FilterMask(1 << 3);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn union(self, other: FilterMask) -> FilterMask {
        FilterMask(self.0 | other.0)
    }

    pub const fn contains(&self, other: FilterMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether frames of `category` pass this mask. Extension frames
    /// travel in the driver's "misc" bucket.
    pub fn admits(&self, category: crate::frame::FrameCategory) -> bool {
        use crate::frame::FrameCategory;
        let bit = match category {
            FrameCategory::Management => FilterMask::MGMT,
            FrameCategory::Control => FilterMask::CTRL,
            FrameCategory::Data => FilterMask::DATA,
            FrameCategory::Extension => FilterMask::MISC,
        };
        self.contains(bit)
    }
}

impl Default for FilterMask {
    fn default() -> Self {
        FilterMask::ALL
    }
}

/// Secondary channel policy passed with every tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryChannel {
    #[default]
    None,
    Above,
    Below,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Ordered sweep plan, visited cyclically
    pub channels: Vec<u8, MAX_CHANNELS>,
    /// Hold time per channel
    pub dwell_ms: u64,
    pub filter_mask: FilterMask,
    pub secondary: SecondaryChannel,
    /// Stop on our own after this many full sweeps
    pub max_sweeps: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("channel list is empty")]
    EmptyChannelList,
    #[error("channel {0} is outside 1..=14")]
    InvalidChannel(u8),
    #[error("channel list holds more than 14 entries")]
    TooManyChannels,
    #[error("dwell time must be non-zero")]
    ZeroDwell,
    #[error("sweep limit must be at least one sweep")]
    ZeroSweeps,
    #[error("config JSON could not be parsed")]
    Json,
}

/// Wire format for config overrides. Every field is optional.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    channels: Option<Vec<u8, MAX_CHANNELS>>,
    #[serde(default)]
    dwell_ms: Option<u64>,
    #[serde(default)]
    filter_mask: Option<FilterMask>,
    #[serde(default)]
    secondary: Option<SecondaryChannel>,
    #[serde(default)]
    max_sweeps: Option<u32>,
}

impl CaptureConfig {
    /// Build a config from a channel slice and dwell, everything else default.
    pub fn with_channels(channels: &[u8], dwell_ms: u64) -> Result<Self, ConfigError> {
        let channels = Vec::from_slice(channels).map_err(|_| ConfigError::TooManyChannels)?;
        let config = Self {
            channels,
            dwell_ms,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply a JSON override document on top of the defaults.
    ///
    /// `{"channels":[1,6,11],"dwell_ms":100,"filter_mask":1,"secondary":"above","max_sweeps":3}`
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        let (raw, _) =
            serde_json_core::from_slice::<RawConfig>(data).map_err(|_| ConfigError::Json)?;
        let mut config = Self::default();
        if let Some(channels) = raw.channels {
            config.channels = channels;
        }
        if let Some(dwell_ms) = raw.dwell_ms {
            config.dwell_ms = dwell_ms;
        }
        if let Some(mask) = raw.filter_mask {
            config.filter_mask = mask;
        }
        if let Some(secondary) = raw.secondary {
            config.secondary = secondary;
        }
        config.max_sweeps = raw.max_sweeps;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::EmptyChannelList);
        }
        if let Some(&bad) = self.channels.iter().find(|&&ch| !(1..=14).contains(&ch)) {
            return Err(ConfigError::InvalidChannel(bad));
        }
        if self.dwell_ms == 0 {
            return Err(ConfigError::ZeroDwell);
        }
        if self.max_sweeps == Some(0) {
            return Err(ConfigError::ZeroSweeps);
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let mut channels = Vec::new();
        for &ch in WIFI_CHANNELS {
            let _ = channels.push(ch);
        }
        Self {
            channels,
            dwell_ms: DEFAULT_DWELL_MS,
            filter_mask: FilterMask::ALL,
            secondary: SecondaryChannel::None,
            max_sweeps: None,
        }
    }
}
