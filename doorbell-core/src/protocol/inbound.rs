use core::fmt;
use core::net::SocketAddrV4;

use crate::config::{AckMode, ReceiverConfig, Role};
use crate::hal::DatagramSocket;

use super::{MAX_PAYLOAD_LEN, TransportError, matches_token};

/// Transport a ring arrived on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RingSource {
    Datagram,
    Request,
}

impl fmt::Display for RingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingSource::Datagram => f.write_str("datagram"),
            RingSource::Request => f.write_str("request"),
        }
    }
}

/// What happened to the acknowledgment for a ring.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AckReply {
    NotRequested,
    Sent,
    Failed,
}

/// Result of one listener poll that saw traffic.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InboundEvent {
    Ring { source: RingSource, ack: AckReply },
    /// Datagram whose payload is not the ring token.
    Ignored { len: usize },
    /// Request answered with `404 Not Found`.
    Rejected,
    /// Client connected but sent no request line in time.
    TimedOut,
    Failed(TransportError),
}

/// Receiver-side source of rings.
pub trait InboundListener {
    /// Handles at most one datagram or connection without waiting for one.
    fn poll(&mut self) -> Option<InboundEvent>;

    /// Re-binds the transport after the link came back.
    fn rearm(&mut self) -> Result<(), TransportError>;
}

/// Rings carried as bare datagrams, optionally confirmed with the ack token.
#[derive(Debug)]
pub struct DatagramListener<S> {
    socket: S,
    ring_token: &'static [u8],
    ack_token: &'static [u8],
    ack: AckMode,
    reply_to: SocketAddrV4,
}

impl<S> DatagramListener<S>
where
    S: DatagramSocket,
{
    #[must_use]
    pub fn new(socket: S, config: &ReceiverConfig) -> Self {
        Self {
            socket,
            ring_token: config.ring_token,
            ack_token: config.ack_token,
            ack: config.ack,
            reply_to: config.network.peer(Role::Receiver),
        }
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }
}

impl<S> InboundListener for DatagramListener<S>
where
    S: DatagramSocket,
{
    fn poll(&mut self) -> Option<InboundEvent> {
        let mut buffer = [0_u8; MAX_PAYLOAD_LEN];
        let len = match self.socket.try_recv(&mut buffer) {
            Ok(Some(len)) => len.min(buffer.len()),
            Ok(None) => return None,
            Err(_) => return Some(InboundEvent::Failed(TransportError::Receive)),
        };

        if !matches_token(&buffer[..len], self.ring_token) {
            return Some(InboundEvent::Ignored { len });
        }

        // Duplicate copies of one burst are each confirmed; the sender only
        // counts the first.
        let ack = if self.ack.is_enabled() {
            match self.socket.send_to(self.ack_token, self.reply_to) {
                Ok(()) => AckReply::Sent,
                Err(_) => AckReply::Failed,
            }
        } else {
            AckReply::NotRequested
        };

        Some(InboundEvent::Ring {
            source: RingSource::Datagram,
            ack,
        })
    }

    fn rearm(&mut self) -> Result<(), TransportError> {
        self.socket.rebind().map_err(|_| TransportError::Rebind)
    }
}
