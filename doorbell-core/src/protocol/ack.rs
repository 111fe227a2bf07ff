use core::time::Duration;

use crate::hal::DatagramSocket;
use crate::time::TickInstant;

use super::{MAX_PAYLOAD_LEN, TransportError, matches_token};

/// Outstanding wait for the receiver's confirmation.
///
/// Cleared by exactly one of a matching ack or the timeout.
#[derive(Debug)]
pub struct PendingAck<I> {
    timeout: Duration,
    wait_started_at: Option<I>,
}

impl<I> PendingAck<I>
where
    I: TickInstant,
{
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            wait_started_at: None,
        }
    }

    #[must_use]
    pub const fn is_awaiting(&self) -> bool {
        self.wait_started_at.is_some()
    }

    /// Starts (or restarts) the wait at `now`.
    pub fn arm(&mut self, now: I) {
        self.wait_started_at = Some(now);
    }

    /// Clears the wait once strictly more than the timeout has elapsed.
    pub fn expire(&mut self, now: I) -> bool {
        let expired = self
            .wait_started_at
            .is_some_and(|started| now.saturating_duration_since(started) > self.timeout);
        if expired {
            self.wait_started_at = None;
        }
        expired
    }

    /// Clears the wait, returning how long it took.
    pub fn acknowledge(&mut self, now: I) -> Option<Duration> {
        self.wait_started_at
            .take()
            .map(|started| now.saturating_duration_since(started))
    }
}

/// Result of polling the sender socket for an acknowledgment.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AckPoll {
    Nothing,
    Confirmed { latency: Duration },
    /// An ack arrived while nothing was pending.
    Unexpected,
    /// Some other payload; discarded.
    Ignored { len: usize },
    Failed(TransportError),
}

/// Sender-side acknowledgment handling over the shared datagram socket.
#[derive(Debug)]
pub struct AckListener<I> {
    token: &'static [u8],
    pending: PendingAck<I>,
}

impl<I> AckListener<I>
where
    I: TickInstant,
{
    #[must_use]
    pub const fn new(token: &'static [u8], timeout: Duration) -> Self {
        Self {
            token,
            pending: PendingAck::new(timeout),
        }
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingAck<I> {
        &self.pending
    }

    pub fn arm(&mut self, now: I) {
        self.pending.arm(now);
    }

    /// Must run before [`AckListener::poll`] each tick.
    pub fn expire(&mut self, now: I) -> bool {
        self.pending.expire(now)
    }

    /// Reads at most one datagram without blocking.
    pub fn poll<S: DatagramSocket>(&mut self, now: I, socket: &mut S) -> AckPoll {
        let mut buffer = [0_u8; MAX_PAYLOAD_LEN];
        let len = match socket.try_recv(&mut buffer) {
            Ok(Some(len)) => len.min(buffer.len()),
            Ok(None) => return AckPoll::Nothing,
            Err(_) => return AckPoll::Failed(TransportError::Receive),
        };

        if !matches_token(&buffer[..len], self.token) {
            return AckPoll::Ignored { len };
        }

        match self.pending.acknowledge(now) {
            Some(latency) => AckPoll::Confirmed { latency },
            None => AckPoll::Unexpected,
        }
    }
}
