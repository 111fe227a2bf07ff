//! Alert sequencing for the receiver's buzzer.

pub mod melody;

use core::fmt;
use core::time::Duration;

use crate::config::ConfigError;
use crate::hal::ToneOutput;
use crate::time::TickInstant;

pub use melody::{DOORBELL_MELODY, note_name};

/// What the buzzer does during one step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Tone {
    /// Square wave at the given frequency (passive buzzer).
    Frequency(u32),
    /// Output held on (active buzzer).
    Pulse,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tone::Frequency(hz) => write!(f, "{} ({hz} Hz)", note_name(*hz)),
            Tone::Pulse => f.write_str("pulse"),
        }
    }
}

/// One entry of an alert.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ToneStep {
    pub tone: Tone,
    pub duration: Duration,
}

impl ToneStep {
    #[must_use]
    pub const fn new(tone: Tone, duration: Duration) -> Self {
        Self { tone, duration }
    }
}

/// Shape of the alert a receiver plays on a ring.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlertShape {
    /// A fixed note sequence; a step ends once its duration has elapsed.
    Melody(&'static [ToneStep]),
    /// A single buzz that ends once strictly more than the duration elapsed.
    Pulse(Duration),
}

impl AlertShape {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            AlertShape::Melody(steps) => steps.len(),
            AlertShape::Pulse(_) => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<ToneStep> {
        match self {
            AlertShape::Melody(steps) => steps.get(index).copied(),
            AlertShape::Pulse(duration) => {
                (index == 0).then_some(ToneStep::new(Tone::Pulse, *duration))
            }
        }
    }

    fn step_complete(&self, elapsed: Duration, duration: Duration) -> bool {
        match self {
            AlertShape::Melody(_) => elapsed >= duration,
            AlertShape::Pulse(_) => elapsed > duration,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_empty() {
            return Err(ConfigError::EmptyAlert);
        }
        for index in 0..self.len() {
            if self.step(index).is_some_and(|step| step.duration.is_zero()) {
                return Err(ConfigError::ZeroStepDuration { index });
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SequencerState<I> {
    Idle,
    Playing { step: usize, step_started_at: I },
}

/// Result of asking the sequencer to start.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerOutcome {
    Started { steps: usize, first: ToneStep },
    /// A previous alert is still running; nothing changed.
    AlreadyPlaying,
    /// The shape has no steps.
    Empty,
}

/// What one `tick` did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SequencerUpdate {
    Idle,
    Holding,
    Advanced { index: usize, step: ToneStep },
    Finished,
}

/// Non-blocking player for an [`AlertShape`].
#[derive(Debug)]
pub struct AlertSequencer<I> {
    shape: AlertShape,
    state: SequencerState<I>,
}

impl<I> AlertSequencer<I>
where
    I: TickInstant,
{
    #[must_use]
    pub const fn new(shape: AlertShape) -> Self {
        Self {
            shape,
            state: SequencerState::Idle,
        }
    }

    #[must_use]
    pub const fn shape(&self) -> AlertShape {
        self.shape
    }

    #[must_use]
    pub const fn state(&self) -> SequencerState<I> {
        self.state
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.state, SequencerState::Playing { .. })
    }

    /// Index of the step currently sounding.
    #[must_use]
    pub const fn current_step(&self) -> Option<usize> {
        match self.state {
            SequencerState::Playing { step, .. } => Some(step),
            SequencerState::Idle => None,
        }
    }

    /// Starts the alert at `now` unless one is already running.
    pub fn trigger<T: ToneOutput>(&mut self, now: I, output: &mut T) -> TriggerOutcome {
        if self.is_playing() {
            return TriggerOutcome::AlreadyPlaying;
        }
        let Some(first) = self.shape.step(0) else {
            return TriggerOutcome::Empty;
        };

        emit(output, first.tone);
        self.state = SequencerState::Playing {
            step: 0,
            step_started_at: now,
        };
        TriggerOutcome::Started {
            steps: self.shape.len(),
            first,
        }
    }

    /// Advances at most one step.
    ///
    /// The next step starts exactly where the previous one was due to end, so
    /// a late tick shortens the following note instead of stretching the
    /// whole alert.
    pub fn tick<T: ToneOutput>(&mut self, now: I, output: &mut T) -> SequencerUpdate {
        let SequencerState::Playing {
            step,
            step_started_at,
        } = self.state
        else {
            return SequencerUpdate::Idle;
        };

        let Some(current) = self.shape.step(step) else {
            output.silence();
            self.state = SequencerState::Idle;
            return SequencerUpdate::Finished;
        };

        let elapsed = now.saturating_duration_since(step_started_at);
        if !self.shape.step_complete(elapsed, current.duration) {
            return SequencerUpdate::Holding;
        }

        let index = step + 1;
        match self.shape.step(index) {
            Some(next) => {
                emit(output, next.tone);
                self.state = SequencerState::Playing {
                    step: index,
                    step_started_at: step_started_at + current.duration,
                };
                SequencerUpdate::Advanced { index, step: next }
            }
            None => {
                output.silence();
                self.state = SequencerState::Idle;
                SequencerUpdate::Finished
            }
        }
    }
}

fn emit<T: ToneOutput>(output: &mut T, tone: Tone) {
    match tone {
        Tone::Frequency(hz) => output.play(hz),
        Tone::Pulse => output.set_level(true),
    }
}
