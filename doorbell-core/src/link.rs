//! Radio link supervision with cooled-down reconnects.

use core::time::Duration;

use crate::hal::LinkControl;
use crate::time::TickInstant;

/// Connectivity change observed during one tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkTransition {
    Steady,
    Established,
    Lost,
}

/// A reconnect started during one tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReconnectAttempt {
    /// One-based attempt number since the link was last up.
    pub number: u32,
    /// Whether the radio accepted the request.
    pub started: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LinkReport {
    /// Link state after this tick.
    pub connected: bool,
    pub transition: LinkTransition,
    pub attempt: Option<ReconnectAttempt>,
}

/// Tracks association state and paces reconnect attempts.
///
/// Starts disconnected so boot goes through the same path as a drop: the
/// first attempt is immediate, later ones wait for the cool-down.
#[derive(Debug)]
pub struct LinkSupervisor<I> {
    cooldown: Duration,
    connected: bool,
    last_attempt: Option<I>,
    attempts: u32,
    blink_on: bool,
}

impl<I> LinkSupervisor<I>
where
    I: TickInstant,
{
    #[must_use]
    pub const fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            connected: false,
            last_attempt: None,
            attempts: 0,
            blink_on: false,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Attempts made since the link was last up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Status blink level; flips on every reconnect attempt.
    #[must_use]
    pub const fn blink_on(&self) -> bool {
        self.blink_on
    }

    pub fn tick<L: LinkControl>(&mut self, now: I, link: &mut L) -> LinkReport {
        if link.is_connected() {
            let transition = if self.connected {
                LinkTransition::Steady
            } else {
                self.connected = true;
                self.attempts = 0;
                self.last_attempt = None;
                LinkTransition::Established
            };
            return LinkReport {
                connected: true,
                transition,
                attempt: None,
            };
        }

        let transition = if self.connected {
            self.connected = false;
            LinkTransition::Lost
        } else {
            LinkTransition::Steady
        };

        let due = self
            .last_attempt
            .is_none_or(|last| now.saturating_duration_since(last) > self.cooldown);
        let attempt = due.then(|| {
            self.last_attempt = Some(now);
            self.attempts = self.attempts.saturating_add(1);
            self.blink_on = !self.blink_on;
            ReconnectAttempt {
                number: self.attempts,
                started: link.reconnect().is_ok(),
            }
        });

        LinkReport {
            connected: false,
            transition,
            attempt,
        }
    }
}
