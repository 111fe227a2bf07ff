//! Doorbell chime played by the passive-buzzer receiver.
//!
//! An ascending C major arpeggio: three short notes and a held octave.

use core::time::Duration;

use super::{Tone, ToneStep};

pub const NOTE_C4: u32 = 262;
pub const NOTE_E4: u32 = 330;
pub const NOTE_G4: u32 = 392;
pub const NOTE_C5: u32 = 523;

/// Length of each of the three lead-in notes.
pub const SHORT_NOTE: Duration = Duration::from_millis(200);
/// Length of the closing octave.
pub const LONG_NOTE: Duration = Duration::from_millis(400);

/// Steps of the default chime.
pub const DOORBELL_MELODY: [ToneStep; 4] = [
    ToneStep::new(Tone::Frequency(NOTE_C4), SHORT_NOTE),
    ToneStep::new(Tone::Frequency(NOTE_E4), SHORT_NOTE),
    ToneStep::new(Tone::Frequency(NOTE_G4), SHORT_NOTE),
    ToneStep::new(Tone::Frequency(NOTE_C5), LONG_NOTE),
];

/// Musical name for one of the chime frequencies, `?` for anything else.
#[must_use]
pub const fn note_name(frequency_hz: u32) -> &'static str {
    match frequency_hz {
        NOTE_C4 => "C4",
        NOTE_E4 => "E4",
        NOTE_G4 => "G4",
        NOTE_C5 => "C5",
        _ => "?",
    }
}

/// Total playing time of a step list.
#[must_use]
pub fn total_duration(steps: &[ToneStep]) -> Duration {
    steps.iter().map(|step| step.duration).sum()
}
