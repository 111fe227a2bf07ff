use core::time::Duration;

use crate::time::TickInstant;

/// Verdict for one trigger.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RateDecision {
    Accepted,
    /// Dropped; `since_last` is the time since the last accepted trigger.
    Rejected { since_last: Duration },
}

impl RateDecision {
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, RateDecision::Accepted)
    }
}

/// Enforces a minimum spacing between accepted triggers.
///
/// The first trigger is always accepted. Rejected triggers are dropped and do
/// not move the window.
#[derive(Debug)]
pub struct RateLimiter<I> {
    min_interval: Duration,
    last_accepted: Option<I>,
    accepted: u32,
    rejected: u32,
}

impl<I> RateLimiter<I>
where
    I: TickInstant,
{
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
            accepted: 0,
            rejected: 0,
        }
    }

    pub fn try_accept(&mut self, now: I) -> RateDecision {
        if let Some(last) = self.last_accepted {
            let since_last = now.saturating_duration_since(last);
            if since_last <= self.min_interval {
                self.rejected = self.rejected.saturating_add(1);
                return RateDecision::Rejected { since_last };
            }
        }

        self.last_accepted = Some(now);
        self.accepted = self.accepted.saturating_add(1);
        RateDecision::Accepted
    }

    #[must_use]
    pub const fn accepted(&self) -> u32 {
        self.accepted
    }

    #[must_use]
    pub const fn rejected(&self) -> u32 {
        self.rejected
    }
}
