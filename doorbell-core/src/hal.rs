//! Hardware and transport seams.
//!
//! The state machines talk to pins, sockets, and the radio link exclusively
//! through these traits. The firmware implements them over `esp-idf-svc`, the
//! emulator over `std::net` plus console output, and the tests over plain
//! in-memory mocks.

use core::fmt;
use core::net::SocketAddrV4;
use core::time::Duration;

use crate::config::StaticAddress;

/// Electrical level sampled from or driven onto a GPIO line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[must_use]
    pub const fn from_high(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }

    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("low"),
            Level::High => f.write_str("high"),
        }
    }
}

/// Raw push-button input, sampled once per tick.
pub trait ButtonInput {
    fn read(&mut self) -> Level;
}

/// On/off output such as an LED.
pub trait DigitalOutput {
    fn set_on(&mut self, on: bool);
}

/// Buzzer driven either with a square-wave tone or as a plain on/off level.
pub trait ToneOutput {
    /// Starts (or retunes) a square wave at `frequency_hz`.
    fn play(&mut self, frequency_hz: u32);

    /// Drives the output as a plain level, for active buzzers.
    fn set_level(&mut self, on: bool);

    /// Stops any tone and drives the output to its idle level.
    fn silence(&mut self);
}

/// Output that ignores every request.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopOutput;

impl NoopOutput {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DigitalOutput for NoopOutput {
    fn set_on(&mut self, _: bool) {}
}

impl ToneOutput for NoopOutput {
    fn play(&mut self, _: u32) {}

    fn set_level(&mut self, _: bool) {}

    fn silence(&mut self) {}
}

/// Radio association handle.
///
/// `reconnect` only starts an attempt; success is observed later through
/// `is_connected`, so neither call may block the tick loop.
pub trait LinkControl {
    type Error: fmt::Debug;

    /// Applies the static address before the first association attempt.
    fn apply_static_address(&mut self, address: &StaticAddress) -> Result<(), Self::Error>;

    fn is_connected(&mut self) -> bool;

    fn reconnect(&mut self) -> Result<(), Self::Error>;
}

/// Connectionless socket bound to this node's endpoint.
pub trait DatagramSocket {
    type Error: fmt::Debug;

    fn send_to(&mut self, payload: &[u8], peer: SocketAddrV4) -> Result<(), Self::Error>;

    /// Copies one pending datagram into `buffer`.
    ///
    /// Returns `Ok(None)` immediately when nothing is waiting.
    fn try_recv(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    /// Re-binds the socket after the link came back.
    fn rebind(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Listening side of the request/response transport.
pub trait RequestServer {
    type Connection: RequestConnection;
    type Error: fmt::Debug;

    /// Returns a pending client without waiting for one.
    fn try_accept(&mut self) -> Result<Option<Self::Connection>, Self::Error>;

    /// Restarts the listener after the link came back.
    fn rebind(&mut self) -> Result<(), Self::Error>;
}

/// A single accepted client.
pub trait RequestConnection {
    type Error: fmt::Debug;

    /// Reads the first request line (without its terminator) into `buffer`.
    ///
    /// Waits at most `timeout`; returns `Ok(0)` when the client sent nothing.
    /// Lines longer than `buffer` are truncated.
    fn read_line(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, Self::Error>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Gives the client at most `linger` to drain the response, then closes.
    fn close(self, linger: Duration);
}
