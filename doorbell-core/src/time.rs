//! Injectable monotonic time.
//!
//! State machines never read a clock themselves; the tick loop samples one
//! instant per iteration and hands it down. Targets convert their native
//! timer into [`Millis`], tests drive a [`ManualClock`].

use core::cell::Cell;
use core::ops::Add;
use core::time::Duration;

/// Monotonic instant understood by every state machine in this crate.
pub trait TickInstant: Copy + Ord + Add<Duration, Output = Self> {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Milliseconds since an arbitrary, target-defined epoch (usually boot).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Millis(u64);

impl Millis {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_millis(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for Millis {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

impl TickInstant for Millis {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl core::fmt::Display for Millis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of the current instant for a tick loop.
pub trait Clock {
    type Instant: TickInstant;

    fn now(&self) -> Self::Instant;
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Moves the clock forward and returns the new instant.
    pub fn advance(&self, by: Duration) -> Millis {
        let next = self.now.get() + by;
        self.now.set(next);
        next
    }

    /// Jumps to an absolute instant. Going backwards is ignored.
    pub fn set(&self, to: Millis) {
        if to > self.now.get() {
            self.now.set(to);
        }
    }
}

impl Clock for ManualClock {
    type Instant = Millis;

    fn now(&self) -> Millis {
        self.now.get()
    }
}
