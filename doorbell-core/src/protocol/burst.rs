use core::net::SocketAddrV4;
use core::time::Duration;

use crate::hal::DatagramSocket;
use crate::time::TickInstant;

/// Outcome of one [`RetransmitBurst::poll`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BurstPoll {
    /// No burst in progress.
    Idle,
    /// The next copy is not due yet.
    Waiting,
    /// Copy `copy` of `of` went out (or failed to).
    Sent { copy: u8, of: u8, delivered: bool },
}

impl BurstPoll {
    /// True once the final copy of a burst has been handled.
    #[must_use]
    pub const fn is_last(self) -> bool {
        matches!(self, BurstPoll::Sent { copy, of, .. } if copy == of)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum BurstState<I> {
    Idle,
    Sending { sent: u8, started_at: I },
}

/// Fire-and-forget repetition of the ring payload.
///
/// Copy `k` (zero-based) is due at `start + k * gap`; each poll sends at most
/// one copy so the caller can log every transmission.
#[derive(Debug)]
pub struct RetransmitBurst<I> {
    copies: u8,
    gap: Duration,
    pulse: Duration,
    state: BurstState<I>,
    last_sent_at: Option<I>,
}

impl<I> RetransmitBurst<I>
where
    I: TickInstant,
{
    #[must_use]
    pub const fn new(copies: u8, gap: Duration, pulse: Duration) -> Self {
        Self {
            copies,
            gap,
            pulse,
            state: BurstState::Idle,
            last_sent_at: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, BurstState::Sending { .. })
    }

    /// Starts a new burst; an unfinished one is replaced.
    pub fn start(&mut self, now: I) {
        if self.copies == 0 {
            return;
        }
        self.state = BurstState::Sending {
            sent: 0,
            started_at: now,
        };
    }

    /// Drops the rest of the burst; returns how many copies had gone out.
    pub fn abort(&mut self) -> Option<u8> {
        match core::mem::replace(&mut self.state, BurstState::Idle) {
            BurstState::Sending { sent, .. } => Some(sent),
            BurstState::Idle => None,
        }
    }

    pub fn poll<S: DatagramSocket>(
        &mut self,
        now: I,
        socket: &mut S,
        peer: SocketAddrV4,
        payload: &[u8],
    ) -> BurstPoll {
        let BurstState::Sending { sent, started_at } = self.state else {
            return BurstPoll::Idle;
        };

        let due = started_at + self.gap * u32::from(sent);
        if now < due {
            return BurstPoll::Waiting;
        }

        let delivered = socket.send_to(payload, peer).is_ok();
        let copy = sent + 1;
        self.last_sent_at = Some(now);
        self.state = if copy >= self.copies {
            BurstState::Idle
        } else {
            BurstState::Sending {
                sent: copy,
                started_at,
            }
        };

        BurstPoll::Sent {
            copy,
            of: self.copies,
            delivered,
        }
    }

    /// Whether the status LED should be dark for the most recent copy.
    #[must_use]
    pub fn pulse_active(&self, now: I) -> bool {
        self.last_sent_at
            .is_some_and(|sent| now.saturating_duration_since(sent) < self.pulse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Millis;
    use core::net::Ipv4Addr;
    use heapless::Vec;

    #[derive(Default)]
    struct CountingSocket {
        sent: Vec<u64, 8>,
        fail: bool,
        clock: u64,
    }

    impl DatagramSocket for CountingSocket {
        type Error = ();

        fn send_to(&mut self, _: &[u8], _: SocketAddrV4) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.sent.push(self.clock).ok();
            Ok(())
        }

        fn try_recv(&mut self, _: &mut [u8]) -> Result<Option<usize>, ()> {
            Ok(None)
        }
    }

    const PEER: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 4210);

    fn ms(value: u64) -> Millis {
        Millis::from_millis(value)
    }

    fn drive(burst: &mut RetransmitBurst<Millis>, socket: &mut CountingSocket, now: u64) {
        socket.clock = now;
        while let BurstPoll::Sent { .. } = burst.poll(ms(now), socket, PEER, b"RING") {}
    }

    #[test]
    fn copies_follow_the_gap() {
        let mut burst = RetransmitBurst::new(
            3,
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        let mut socket = CountingSocket::default();
        burst.start(ms(1_000));

        for now in (1_000..1_400).step_by(10) {
            drive(&mut burst, &mut socket, now);
        }

        assert_eq!(socket.sent.as_slice(), &[1_000, 1_100, 1_200]);
        assert!(!burst.is_active());
    }

    #[test]
    fn zero_gap_sends_everything_in_one_tick() {
        let mut burst = RetransmitBurst::new(3, Duration::ZERO, Duration::from_millis(50));
        let mut socket = CountingSocket::default();
        burst.start(ms(0));
        drive(&mut burst, &mut socket, 0);
        assert_eq!(socket.sent.len(), 3);
        assert_eq!(burst.poll(ms(1), &mut socket, PEER, b"RING"), BurstPoll::Idle);
    }

    #[test]
    fn pulse_tracks_the_latest_copy() {
        let mut burst = RetransmitBurst::new(
            2,
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        let mut socket = CountingSocket::default();
        burst.start(ms(0));
        assert!(!burst.poll(ms(0), &mut socket, PEER, b"RING").is_last());
        assert!(burst.pulse_active(ms(49)));
        assert!(!burst.pulse_active(ms(50)));
        assert!(burst.poll(ms(100), &mut socket, PEER, b"RING").is_last());
        assert!(burst.pulse_active(ms(120)));
    }

    #[test]
    fn failed_sends_still_advance_and_abort_reports_progress() {
        let mut burst = RetransmitBurst::new(
            3,
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        let mut socket = CountingSocket {
            fail: true,
            ..CountingSocket::default()
        };
        burst.start(ms(0));
        assert_eq!(
            burst.poll(ms(0), &mut socket, PEER, b"RING"),
            BurstPoll::Sent {
                copy: 1,
                of: 3,
                delivered: false,
            }
        );
        assert_eq!(burst.poll(ms(50), &mut socket, PEER, b"RING"), BurstPoll::Waiting);
        assert_eq!(burst.abort(), Some(1));
        assert_eq!(burst.abort(), None);
    }
}
