/// Board identity, selected at compile time via feature flags.
///
/// Each board module carries the identity reported in status messages
/// plus the chip family logged at startup.

#[cfg(feature = "board-xiao")]
mod hw {
    pub const BOARD_NAME: &str = "xiao_esp32s3";
    pub const CHIP: &str = "esp32s3";
    pub const HAS_PSRAM: bool = true;
}

#[cfg(all(feature = "board-m5stickc", not(feature = "board-xiao")))]
mod hw {
    pub const BOARD_NAME: &str = "m5stickc_plus2";
    pub const CHIP: &str = "esp32";
    pub const HAS_PSRAM: bool = false;
}

#[cfg(not(any(feature = "board-xiao", feature = "board-m5stickc")))]
mod hw {
    pub const BOARD_NAME: &str = "unknown";
    pub const CHIP: &str = "unknown";
    pub const HAS_PSRAM: bool = false;
}

pub use hw::*;
