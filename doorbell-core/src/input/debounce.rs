use core::time::Duration;

use crate::hal::Level;
use crate::time::TickInstant;

/// A press accepted by the debouncer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Activation<I> {
    /// Tick on which the active level was judged stable.
    pub at: I,
}

/// Turns a bouncing button line into one activation per press.
///
/// A reading only counts once it has stayed unchanged for strictly longer
/// than the window. The activation fires on the first stable active sample
/// and is re-armed only by a stable inactive one.
#[derive(Debug)]
pub struct DebouncedInput<I> {
    window: Duration,
    active: Level,
    last_raw: Level,
    last_change: Option<I>,
    processed: bool,
}

impl<I> DebouncedInput<I>
where
    I: TickInstant,
{
    #[must_use]
    pub const fn new(window: Duration, active: Level) -> Self {
        Self {
            window,
            active,
            last_raw: active.toggled(),
            last_change: None,
            processed: false,
        }
    }

    /// Feeds one raw sample taken at `now`.
    pub fn sample(&mut self, level: Level, now: I) -> Option<Activation<I>> {
        if level != self.last_raw {
            self.last_raw = level;
            self.last_change = Some(now);
        }

        let stable = self
            .last_change
            .is_none_or(|changed| now.saturating_duration_since(changed) > self.window);
        if !stable {
            return None;
        }

        if level != self.active {
            self.processed = false;
            return None;
        }
        if self.processed {
            return None;
        }

        self.processed = true;
        Some(Activation { at: now })
    }

    /// Whether the current press has already produced its activation.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.processed
    }
}
