//! Deploy-time configuration for both doorbell roles.
//!
//! Every value here is fixed for the lifetime of the process. The defaults
//! reproduce the shipped field installation; targets override the network
//! block (credentials and addressing) and leave the timing alone.

use core::fmt;
use core::net::{Ipv4Addr, SocketAddrV4};
use core::time::Duration;

use crate::alert::{AlertShape, DOORBELL_MELODY};
use crate::hal::Level;
use crate::indicator::{
    CONFIRMED_PATTERN, DOORBELL_PATTERN, IndicatorPattern, UNCONFIRMED_PATTERN,
};
use crate::protocol::MAX_PAYLOAD_LEN;

/// Port shared by both endpoints in the field installation.
pub const DEFAULT_PORT: u16 = 4210;
/// Payload carried by every ring datagram.
pub const RING_TOKEN: &[u8] = b"RING";
/// Payload returned by the receiver to confirm a ring.
pub const ACK_TOKEN: &[u8] = b"QSL";
/// Path served by the request/response receiver.
pub const RING_PATH: &str = "/ring";

/// Debounce window applied to the push button.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);
/// Minimum spacing between two accepted presses.
pub const ANTI_SPAM_INTERVAL: Duration = Duration::from_millis(2_000);
/// Copies of the ring payload sent per accepted press.
pub const RING_REPEAT_COUNT: u8 = 3;
/// Spacing between two copies of one burst.
pub const RING_REPEAT_GAP: Duration = Duration::from_millis(100);
/// Time the status LED stays dark after each transmitted copy.
pub const RING_PULSE_WIDTH: Duration = Duration::from_millis(50);
/// How long the sender waits for the receiver's acknowledgment.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(3_000);
/// Reconnect cool-down on the sender.
pub const SENDER_RECONNECT_COOLDOWN: Duration = Duration::from_millis(5_000);
/// Reconnect cool-down on the receiver.
pub const RECEIVER_RECONNECT_COOLDOWN: Duration = Duration::from_millis(1_000);
/// Read budget for one request line on the request/response receiver.
pub const REQUEST_READ_TIMEOUT: Duration = Duration::from_millis(200);
/// Delay between writing a response and closing the connection.
pub const RESPONSE_LINGER: Duration = Duration::from_millis(100);

/// Which end of the doorbell a node plays.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Sender,
    Receiver,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sender => f.write_str("sender"),
            Role::Receiver => f.write_str("receiver"),
        }
    }
}

/// Whether the receiver confirms rings and the sender waits for it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AckMode {
    Disabled,
    Enabled,
}

impl AckMode {
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, AckMode::Enabled)
    }
}

/// How rings reach the receiver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transport {
    /// Connectionless datagrams carrying the ring token.
    Datagram,
    /// `GET <ring_path>` requests answered with a status line.
    Request,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Datagram => f.write_str("datagram"),
            Transport::Request => f.write_str("request"),
        }
    }
}

/// Static IPv4 settings applied to the radio before association.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StaticAddress {
    pub ip: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub dns: Ipv4Addr,
}

impl StaticAddress {
    /// Prefix length of the subnet mask (the mask is validated as contiguous).
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        // At most 32, always fits.
        u8::try_from(u32::from(self.subnet_mask).leading_ones()).unwrap_or(32)
    }
}

/// Credentials and fixed addressing for both peers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NetworkConfig {
    pub ssid: &'static str,
    pub password: &'static str,
    pub sender: SocketAddrV4,
    pub receiver: SocketAddrV4,
    pub gateway: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub dns: Ipv4Addr,
}

impl NetworkConfig {
    pub const DEFAULT: Self = Self {
        ssid: "doorbell",
        password: "",
        sender: SocketAddrV4::new(Ipv4Addr::new(192, 168, 2, 201), DEFAULT_PORT),
        receiver: SocketAddrV4::new(Ipv4Addr::new(192, 168, 2, 202), DEFAULT_PORT),
        gateway: Ipv4Addr::new(192, 168, 2, 254),
        subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
        dns: Ipv4Addr::new(8, 8, 8, 8),
    };

    /// Endpoint this role binds to.
    #[must_use]
    pub const fn local(&self, role: Role) -> SocketAddrV4 {
        match role {
            Role::Sender => self.sender,
            Role::Receiver => self.receiver,
        }
    }

    /// Endpoint this role talks to.
    #[must_use]
    pub const fn peer(&self, role: Role) -> SocketAddrV4 {
        match role {
            Role::Sender => self.receiver,
            Role::Receiver => self.sender,
        }
    }

    #[must_use]
    pub const fn static_address(&self, role: Role) -> StaticAddress {
        StaticAddress {
            ip: *self.local(role).ip(),
            gateway: self.gateway,
            subnet_mask: self.subnet_mask,
            dns: self.dns,
        }
    }

    /// Checks that the static addressing can work at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() {
            return Err(ConfigError::EmptySsid);
        }
        if self.sender.port() == 0 || self.receiver.port() == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.sender == self.receiver {
            return Err(ConfigError::EndpointsIdentical);
        }

        let mask = u32::from(self.subnet_mask);
        if mask.leading_ones() + mask.trailing_zeros() != 32 {
            return Err(ConfigError::NonContiguousMask);
        }

        let network = u32::from(self.gateway) & mask;
        for role in [Role::Sender, Role::Receiver] {
            if u32::from(*self.local(role).ip()) & mask != network {
                return Err(ConfigError::EndpointOffSubnet(role));
            }
        }

        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything the front-door node needs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SenderConfig {
    pub network: NetworkConfig,
    pub ring_token: &'static [u8],
    pub ack_token: &'static [u8],
    pub ack: AckMode,
    /// Level the button reads while pressed (low with the internal pull-up).
    pub active_level: Level,
    pub debounce: Duration,
    pub anti_spam: Duration,
    pub repeat_count: u8,
    pub repeat_gap: Duration,
    pub pulse_width: Duration,
    pub ack_timeout: Duration,
    pub confirmed: IndicatorPattern,
    pub unconfirmed: IndicatorPattern,
    pub reconnect_cooldown: Duration,
}

impl SenderConfig {
    pub const DEFAULT: Self = Self {
        network: NetworkConfig::DEFAULT,
        ring_token: RING_TOKEN,
        ack_token: ACK_TOKEN,
        ack: AckMode::Enabled,
        active_level: Level::Low,
        debounce: DEBOUNCE_WINDOW,
        anti_spam: ANTI_SPAM_INTERVAL,
        repeat_count: RING_REPEAT_COUNT,
        repeat_gap: RING_REPEAT_GAP,
        pulse_width: RING_PULSE_WIDTH,
        ack_timeout: ACK_TIMEOUT,
        confirmed: CONFIRMED_PATTERN,
        unconfirmed: UNCONFIRMED_PATTERN,
        reconnect_cooldown: SENDER_RECONNECT_COOLDOWN,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        validate_tokens(self.ring_token, self.ack_token)?;
        if self.repeat_count == 0 {
            return Err(ConfigError::ZeroRepeatCount);
        }
        if self.ack.is_enabled() && self.ack_timeout.is_zero() {
            return Err(ConfigError::ZeroAckTimeout);
        }
        self.confirmed.validate()?;
        self.unconfirmed.validate()
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything the indoor node needs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReceiverConfig {
    pub network: NetworkConfig,
    pub ring_token: &'static [u8],
    pub ack_token: &'static [u8],
    pub ack: AckMode,
    pub transport: Transport,
    pub ring_path: &'static str,
    pub request_timeout: Duration,
    pub response_linger: Duration,
    pub alert: AlertShape,
    pub indicator: IndicatorPattern,
    pub reconnect_cooldown: Duration,
}

impl ReceiverConfig {
    pub const DEFAULT: Self = Self {
        network: NetworkConfig::DEFAULT,
        ring_token: RING_TOKEN,
        ack_token: ACK_TOKEN,
        ack: AckMode::Enabled,
        transport: Transport::Datagram,
        ring_path: RING_PATH,
        request_timeout: REQUEST_READ_TIMEOUT,
        response_linger: RESPONSE_LINGER,
        alert: AlertShape::Melody(&DOORBELL_MELODY),
        indicator: DOORBELL_PATTERN,
        reconnect_cooldown: RECEIVER_RECONNECT_COOLDOWN,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        validate_tokens(self.ring_token, self.ack_token)?;
        if !self.ring_path.starts_with('/') || self.ring_path.contains(' ') {
            return Err(ConfigError::InvalidRingPath);
        }
        self.alert.validate()?;
        self.indicator.validate()
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn validate_tokens(ring: &[u8], ack: &[u8]) -> Result<(), ConfigError> {
    if ring.is_empty() || ack.is_empty() {
        return Err(ConfigError::EmptyToken);
    }
    if ring.len() > MAX_PAYLOAD_LEN || ack.len() > MAX_PAYLOAD_LEN {
        return Err(ConfigError::TokenTooLong);
    }
    if ring == ack {
        return Err(ConfigError::TokensIdentical);
    }
    Ok(())
}

/// Reasons a configuration is refused at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    EmptySsid,
    ZeroPort,
    EndpointsIdentical,
    NonContiguousMask,
    EndpointOffSubnet(Role),
    EmptyToken,
    TokenTooLong,
    TokensIdentical,
    ZeroRepeatCount,
    ZeroAckTimeout,
    InvalidRingPath,
    EmptyAlert,
    ZeroStepDuration { index: usize },
    ZeroIndicatorDuration,
    BlinkPeriodOutOfRange,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptySsid => f.write_str("network name is empty"),
            ConfigError::ZeroPort => f.write_str("endpoint port is zero"),
            ConfigError::EndpointsIdentical => {
                f.write_str("sender and receiver share one endpoint")
            }
            ConfigError::NonContiguousMask => f.write_str("subnet mask is not contiguous"),
            ConfigError::EndpointOffSubnet(role) => {
                write!(f, "{role} address is outside the gateway subnet")
            }
            ConfigError::EmptyToken => f.write_str("payload token is empty"),
            ConfigError::TokenTooLong => {
                write!(f, "payload token exceeds {MAX_PAYLOAD_LEN} bytes")
            }
            ConfigError::TokensIdentical => f.write_str("ring and ack tokens are identical"),
            ConfigError::ZeroRepeatCount => f.write_str("ring repeat count is zero"),
            ConfigError::ZeroAckTimeout => f.write_str("ack timeout is zero"),
            ConfigError::InvalidRingPath => f.write_str("ring path must start with `/`"),
            ConfigError::EmptyAlert => f.write_str("alert has no steps"),
            ConfigError::ZeroStepDuration { index } => {
                write!(f, "alert step {index} has zero duration")
            }
            ConfigError::ZeroIndicatorDuration => f.write_str("indicator duration is zero"),
            ConfigError::BlinkPeriodOutOfRange => {
                f.write_str("blink period must be non-zero and within the indicator duration")
            }
        }
    }
}

/// Fatal conditions that keep a node from starting.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StartupError<E> {
    Config(ConfigError),
    StaticAddress(E),
}

impl<E> From<ConfigError> for StartupError<E> {
    fn from(value: ConfigError) -> Self {
        StartupError::Config(value)
    }
}

impl<E: fmt::Debug> fmt::Display for StartupError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(err) => write!(f, "invalid configuration: {err}"),
            StartupError::StaticAddress(err) => {
                write!(f, "could not apply static address: {err:?}")
            }
        }
    }
}
