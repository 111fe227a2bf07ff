//! Timing engine shared by the doorbell sender and receiver.
//!
//! Everything here is driven by an explicit `tick(now)` call so the same state
//! machines run on the ESP32 firmware, in the host emulator, and under tests
//! with a synthetic clock.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod alert;
pub mod config;
pub mod hal;
pub mod indicator;
pub mod input;
pub mod link;
pub mod node;
pub mod protocol;
pub mod telemetry;
pub mod time;

#[cfg(feature = "std")]
pub mod net;
