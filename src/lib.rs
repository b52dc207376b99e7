//! macsniff — promiscuous WiFi capture filtered on one hardware address.
//!
//! The radio delivers every 802.11 frame it hears; this crate keeps the ones
//! whose receiver, transmitter, BSSID or fourth address equals an
//! operator-chosen target, and reports each match as ordered label/value
//! fields. Platform binaries (the ESP-IDF firmware in `firmware-std/`)
//! provide the radio and the output sink.
//!
//! The library is organized in two layers:
//! - **Frame layer**: `mac`, `frame`, `classify`, `filter`, `state`,
//!   `config`, `report`, `protocol`, `board`. `no_std`, no allocator,
//!   testable on any host with `cargo test`.
//! - **Runtime layer** (feature `std`): `radio`, `capture`, `scheduler`,
//!   `session`, `queue`, `control`. Threads, the driver seam and the
//!   operator console.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod board;
pub mod classify;
pub mod config;
pub mod filter;
pub mod frame;
pub mod mac;
pub mod protocol;
pub mod report;
pub mod state;

#[cfg(feature = "std")]
pub mod capture;
#[cfg(feature = "std")]
pub mod control;
#[cfg(feature = "std")]
pub mod queue;
#[cfg(feature = "std")]
pub mod radio;
#[cfg(feature = "std")]
pub mod scheduler;
#[cfg(feature = "std")]
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;
