//! Self-expiring LED patterns.

use core::time::Duration;

use crate::config::ConfigError;
use crate::time::TickInstant;

/// How an indicator behaves after activation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IndicatorPattern {
    /// Time until the indicator clears itself.
    pub duration: Duration,
    /// Full on/off period; `None` keeps the LED solid on.
    pub blink_period: Option<Duration>,
    /// Level driven once the pattern has expired.
    pub rest_on: bool,
}

impl IndicatorPattern {
    #[must_use]
    pub const fn solid(duration: Duration, rest_on: bool) -> Self {
        Self {
            duration,
            blink_period: None,
            rest_on,
        }
    }

    #[must_use]
    pub const fn blinking(duration: Duration, period: Duration, rest_on: bool) -> Self {
        Self {
            duration,
            blink_period: Some(period),
            rest_on,
        }
    }

    /// Level the pattern shows `elapsed` after activation.
    #[must_use]
    pub fn level_at(&self, elapsed: Duration) -> bool {
        match self.blink_period {
            None => true,
            Some(period) => blink_level(elapsed, period),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroIndicatorDuration);
        }
        match self.blink_period {
            Some(period) if period.is_zero() || period > self.duration => {
                Err(ConfigError::BlinkPeriodOutOfRange)
            }
            _ => Ok(()),
        }
    }
}

/// Receiver LED after a ring: one second blink for a minute, then back on.
pub const DOORBELL_PATTERN: IndicatorPattern = IndicatorPattern::blinking(
    Duration::from_millis(60_000),
    Duration::from_millis(1_000),
    true,
);

/// Sender confirmation LED after an acknowledgment.
pub const CONFIRMED_PATTERN: IndicatorPattern =
    IndicatorPattern::solid(Duration::from_millis(2_000), false);

/// Sender confirmation LED when the acknowledgment never arrived.
pub const UNCONFIRMED_PATTERN: IndicatorPattern = IndicatorPattern::blinking(
    Duration::from_millis(2_000),
    Duration::from_millis(250),
    false,
);

/// On during the first half of each period, off during the second.
#[must_use]
pub fn blink_level(elapsed: Duration, period: Duration) -> bool {
    let period = period.as_millis();
    if period == 0 {
        return true;
    }
    elapsed.as_millis() % period < period / 2
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum IndicatorState<I> {
    Idle { level: bool },
    Active { started_at: I, pattern: IndicatorPattern },
}

/// Result of one indicator tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IndicatorUpdate {
    pub level: bool,
    /// Set on the one tick where the pattern ran out.
    pub expired: bool,
}

#[derive(Debug)]
pub struct TimedIndicator<I> {
    state: IndicatorState<I>,
}

impl<I> TimedIndicator<I>
where
    I: TickInstant,
{
    /// Creates an idle indicator showing `idle_on` until first activated.
    #[must_use]
    pub const fn new(idle_on: bool) -> Self {
        Self {
            state: IndicatorState::Idle { level: idle_on },
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, IndicatorState::Active { .. })
    }

    /// Starts `pattern` at `now`; returns `true` when it replaced a running one.
    pub fn activate(&mut self, now: I, pattern: IndicatorPattern) -> bool {
        let restarted = self.is_active();
        self.state = IndicatorState::Active {
            started_at: now,
            pattern,
        };
        restarted
    }

    pub fn tick(&mut self, now: I) -> IndicatorUpdate {
        match self.state {
            IndicatorState::Idle { level } => IndicatorUpdate {
                level,
                expired: false,
            },
            IndicatorState::Active {
                started_at,
                pattern,
            } => {
                let elapsed = now.saturating_duration_since(started_at);
                if elapsed >= pattern.duration {
                    self.state = IndicatorState::Idle {
                        level: pattern.rest_on,
                    };
                    IndicatorUpdate {
                        level: pattern.rest_on,
                        expired: true,
                    }
                } else {
                    IndicatorUpdate {
                        level: pattern.level_at(elapsed),
                        expired: false,
                    }
                }
            }
        }
    }
}
