//! Ring/ack exchange between the two nodes.
//!
//! The sender fires a short burst of identical ring datagrams and optionally
//! waits for one acknowledgment. The receiver accepts rings either as
//! datagrams or as plain `GET` requests; both paths sit behind
//! [`InboundListener`] so the receiver node does not care which one is wired.

mod ack;
mod burst;
mod inbound;
pub mod request;

use core::fmt;

pub use ack::{AckListener, AckPoll, PendingAck};
pub use burst::{BurstPoll, RetransmitBurst};
pub use inbound::{AckReply, DatagramListener, InboundEvent, InboundListener, RingSource};
pub use request::RequestListener;

/// Largest payload either side sends or inspects.
pub const MAX_PAYLOAD_LEN: usize = 32;

/// Which transport operation failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransportError {
    Send,
    Receive,
    Accept,
    Respond,
    Rebind,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Send => f.write_str("send failed"),
            TransportError::Receive => f.write_str("receive failed"),
            TransportError::Accept => f.write_str("accept failed"),
            TransportError::Respond => f.write_str("response write failed"),
            TransportError::Rebind => f.write_str("listener re-bind failed"),
        }
    }
}

/// Exact, whole-payload token comparison.
#[must_use]
pub fn matches_token(payload: &[u8], token: &[u8]) -> bool {
    payload == token
}
