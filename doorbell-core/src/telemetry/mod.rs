//! Telemetry event catalog shared by firmware and host targets.
//!
//! Nodes never print. Every observable occurrence becomes a typed
//! [`TelemetryEventKind`], kept in a fixed-size history ring and handed back
//! from each tick so the shell can log it through whatever backend it runs.

use core::fmt;
use core::time::Duration;

use heapless::{HistoryBuf, OldestOrdered, Vec};

use crate::alert::Tone;
use crate::protocol::{RingSource, TransportError};
use crate::time::TickInstant;

/// Monotonic identifier assigned to each recorded event.
pub type EventId = u32;

/// Discriminated telemetry events emitted by both node roles.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    LinkUp,
    LinkLost,
    ReconnectAttempt { attempt: u32, started: bool },
    ListenerRearmed,
    ListenerRearmFailed,
    PressDetected,
    PressRateLimited { since_last: Duration },
    RingDroppedOffline,
    RingSent { copy: u8, of: u8 },
    RingSendFailed { copy: u8, of: u8 },
    BurstAbandoned { sent: u8, of: u8 },
    AwaitingAck { timeout: Duration },
    AckConfirmed { latency: Duration },
    AckTimedOut,
    AckUnexpected,
    PayloadIgnored { len: usize },
    TransportFailed(TransportError),
    RingReceived(RingSource),
    AckReplySent,
    AckReplyFailed,
    RequestRejected,
    RequestTimedOut,
    AlertStarted { steps: usize },
    AlertStep { index: usize, tone: Tone },
    AlertAlreadyActive,
    AlertFinished,
    IndicatorStarted { restarted: bool },
    IndicatorExpired,
}

/// How loudly a shell should log an event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl TelemetryEventKind {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            TelemetryEventKind::TransportFailed(_)
            | TelemetryEventKind::ListenerRearmFailed
            | TelemetryEventKind::RingSendFailed { .. }
            | TelemetryEventKind::AckReplyFailed => Severity::Error,
            TelemetryEventKind::LinkLost
            | TelemetryEventKind::PressRateLimited { .. }
            | TelemetryEventKind::RingDroppedOffline
            | TelemetryEventKind::BurstAbandoned { .. }
            | TelemetryEventKind::AckTimedOut
            | TelemetryEventKind::ReconnectAttempt { started: false, .. } => Severity::Warn,
            TelemetryEventKind::AlertStep { .. }
            | TelemetryEventKind::PayloadIgnored { .. }
            | TelemetryEventKind::AckUnexpected
            | TelemetryEventKind::RequestTimedOut
            | TelemetryEventKind::IndicatorExpired => Severity::Debug,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::LinkUp => f.write_str("link up"),
            TelemetryEventKind::LinkLost => f.write_str("link lost"),
            TelemetryEventKind::ReconnectAttempt { attempt, started } => {
                if *started {
                    write!(f, "reconnect attempt #{attempt}")
                } else {
                    write!(f, "reconnect attempt #{attempt} refused by radio")
                }
            }
            TelemetryEventKind::ListenerRearmed => f.write_str("listener re-armed"),
            TelemetryEventKind::ListenerRearmFailed => f.write_str("listener re-arm failed"),
            TelemetryEventKind::PressDetected => f.write_str("button pressed"),
            TelemetryEventKind::PressRateLimited { since_last } => {
                write!(f, "press ignored, last ring {}ms ago", since_last.as_millis())
            }
            TelemetryEventKind::RingDroppedOffline => f.write_str("ring dropped, link down"),
            TelemetryEventKind::RingSent { copy, of } => write!(f, "ring sent ({copy}/{of})"),
            TelemetryEventKind::RingSendFailed { copy, of } => {
                write!(f, "ring send failed ({copy}/{of})")
            }
            TelemetryEventKind::BurstAbandoned { sent, of } => {
                write!(f, "burst abandoned after {sent}/{of}")
            }
            TelemetryEventKind::AwaitingAck { timeout } => {
                write!(f, "waiting {}ms for ack", timeout.as_millis())
            }
            TelemetryEventKind::AckConfirmed { latency } => {
                write!(f, "ack received after {}ms", latency.as_millis())
            }
            TelemetryEventKind::AckTimedOut => f.write_str("no ack received"),
            TelemetryEventKind::AckUnexpected => f.write_str("ack ignored, nothing pending"),
            TelemetryEventKind::PayloadIgnored { len } => {
                write!(f, "ignored {len}-byte payload")
            }
            TelemetryEventKind::TransportFailed(error) => write!(f, "transport: {error}"),
            TelemetryEventKind::RingReceived(source) => write!(f, "ring received ({source})"),
            TelemetryEventKind::AckReplySent => f.write_str("ack sent"),
            TelemetryEventKind::AckReplyFailed => f.write_str("ack send failed"),
            TelemetryEventKind::RequestRejected => f.write_str("request rejected (404)"),
            TelemetryEventKind::RequestTimedOut => f.write_str("request timed out"),
            TelemetryEventKind::AlertStarted { steps } => {
                write!(f, "alert started ({steps} steps)")
            }
            TelemetryEventKind::AlertStep { index, tone } => write!(f, "step {index}: {tone}"),
            TelemetryEventKind::AlertAlreadyActive => f.write_str("alert already playing"),
            TelemetryEventKind::AlertFinished => f.write_str("alert finished"),
            TelemetryEventKind::IndicatorStarted { restarted } => {
                if *restarted {
                    f.write_str("indicator restarted")
                } else {
                    f.write_str("indicator started")
                }
            }
            TelemetryEventKind::IndicatorExpired => f.write_str("indicator expired"),
        }
    }
}

/// Upper bound on events produced by one tick.
pub const MAX_TICK_EVENTS: usize = 16;

/// Events produced by a single `tick`, in emission order.
#[derive(Clone, Debug)]
pub struct TickEvents<I> {
    now: I,
    events: Vec<TelemetryEventKind, MAX_TICK_EVENTS>,
    overflowed: bool,
}

impl<I> TickEvents<I>
where
    I: Copy,
{
    #[must_use]
    pub const fn new(now: I) -> Self {
        Self {
            now,
            events: Vec::new(),
            overflowed: false,
        }
    }

    #[must_use]
    pub const fn now(&self) -> I {
        self.now
    }

    pub fn push(&mut self, event: TelemetryEventKind) {
        if self.events.push(event).is_err() {
            self.overflowed = true;
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[TelemetryEventKind] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetryEventKind> {
        self.events.iter()
    }

    #[must_use]
    pub fn contains(&self, event: &TelemetryEventKind) -> bool {
        self.events.contains(event)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether events past [`MAX_TICK_EVENTS`] were dropped.
    #[must_use]
    pub const fn overflowed(&self) -> bool {
        self.overflowed
    }
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TickInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total events recorded since startup, including those overwritten.
    pub fn total(&self) -> EventId {
        self.next_event_id
    }

    /// Time since the most recent record of `event`, if still in the ring.
    pub fn since_last(&self, event: &TelemetryEventKind, now: TInstant) -> Option<Duration> {
        let mut latest = None;
        for record in self.ring.oldest_ordered() {
            if record.event == *event {
                latest = Some(record.timestamp);
            }
        }
        latest.map(|at| now.saturating_duration_since(at))
    }

    /// Records an arbitrary telemetry event.
    pub fn record(&mut self, event: TelemetryEventKind, timestamp: TInstant) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
        });

        id
    }

    /// Records every event of one tick at the tick's timestamp.
    pub fn commit(&mut self, tick: &TickEvents<TInstant>) {
        for event in tick.iter() {
            self.record(*event, tick.now());
        }
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TickInstant,
{
    fn default() -> Self {
        Self::new()
    }
}
