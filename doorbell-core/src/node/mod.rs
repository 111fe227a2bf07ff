//! Per-role tick loops.
//!
//! A node owns its peripherals and every state machine of its role. Each call
//! to `tick(now)` polls them in a fixed order (link, input, network, outputs),
//! latches the output pins once, and returns the events it produced.

mod receiver;
mod sender;

pub use receiver::{ReceiverNode, ReceiverPeripherals, ReceiverStatus};
pub use sender::{SenderNode, SenderPeripherals, SenderStatus};

use core::time::Duration;

use crate::link::{LinkReport, LinkTransition};
use crate::telemetry::{TelemetryEventKind, TickEvents};
use crate::time::TickInstant;

/// Pushes the link events of one supervisor report.
fn push_link_events<I: Copy>(report: &LinkReport, tick: &mut TickEvents<I>) {
    match report.transition {
        LinkTransition::Established => tick.push(TelemetryEventKind::LinkUp),
        LinkTransition::Lost => tick.push(TelemetryEventKind::LinkLost),
        LinkTransition::Steady => {}
    }
    if let Some(attempt) = report.attempt {
        tick.push(TelemetryEventKind::ReconnectAttempt {
            attempt: attempt.number,
            started: attempt.started,
        });
    }
}

/// Re-binds the node's listener after a reconnect, retrying a failed attempt
/// once per cool-down while the link stays up.
#[derive(Debug)]
struct RearmRetry<I> {
    cooldown: Duration,
    failed_at: Option<I>,
}

impl<I: TickInstant> RearmRetry<I> {
    const fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            failed_at: None,
        }
    }

    /// True while the listener is unusable after a failed re-bind.
    const fn is_pending(&self) -> bool {
        self.failed_at.is_some()
    }

    fn run<E>(
        &mut self,
        now: I,
        report: &LinkReport,
        tick: &mut TickEvents<I>,
        rearm: impl FnOnce() -> Result<(), E>,
    ) {
        if report.transition == LinkTransition::Lost {
            self.failed_at = None;
        }
        if !report.connected {
            return;
        }
        let due = report.transition == LinkTransition::Established
            || self
                .failed_at
                .is_some_and(|at| now.saturating_duration_since(at) > self.cooldown);
        if !due {
            return;
        }

        if rearm().is_ok() {
            self.failed_at = None;
            tick.push(TelemetryEventKind::ListenerRearmed);
        } else {
            self.failed_at = Some(now);
            tick.push(TelemetryEventKind::ListenerRearmFailed);
        }
    }
}
