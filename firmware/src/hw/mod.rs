//! ESP32 implementations of the doorbell peripheral traits.

mod wifi;

pub use wifi::WifiLink;

use core::fmt;

use doorbell_core::hal::{self, ButtonInput, DigitalOutput, ToneOutput};
use esp_idf_svc::hal::gpio::{self, InputMode, OutputMode, Pin, PinDriver};
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, SpeedMode};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::EspError;
use log::warn;

/// Front-door push button (pulled up, pressed pulls low).
pub const BUTTON_GPIO: u8 = 13;
/// Status LED on either node.
pub const STATUS_LED_GPIO: u8 = 22;
/// Sender confirmation LED, receiver network LED.
pub const AUX_LED_GPIO: u8 = 23;
pub const BUZZER_GPIO: u8 = 16;

/// Carrier used when the alert is a plain on/off pulse.
const PULSE_TONE_HZ: u32 = 2_000;

#[derive(Debug)]
pub enum BoardError {
    Esp(EspError),
    Io(std::io::Error),
    CredentialsTooLong,
    Startup(String),
}

impl From<EspError> for BoardError {
    fn from(err: EspError) -> Self {
        Self::Esp(err)
    }
}

impl From<std::io::Error> for BoardError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Esp(err) => write!(f, "esp-idf: {err}"),
            Self::Io(err) => write!(f, "socket: {err}"),
            Self::CredentialsTooLong => f.write_str("wifi credentials too long"),
            Self::Startup(reason) => write!(f, "startup refused: {reason}"),
        }
    }
}

pub struct GpioButton<'d, P: Pin, M: InputMode> {
    pin: PinDriver<'d, P, M>,
}

impl<'d, P: Pin, M: InputMode> GpioButton<'d, P, M> {
    pub fn new(pin: PinDriver<'d, P, M>) -> Self {
        Self { pin }
    }
}

impl<P: Pin, M: InputMode> ButtonInput for GpioButton<'_, P, M> {
    fn read(&mut self) -> hal::Level {
        if self.pin.is_high() {
            hal::Level::High
        } else {
            hal::Level::Low
        }
    }
}

pub struct GpioLed<'d, P: Pin, M: OutputMode> {
    pin: PinDriver<'d, P, M>,
}

impl<'d, P: Pin, M: OutputMode> GpioLed<'d, P, M> {
    pub fn new(pin: PinDriver<'d, P, M>) -> Self {
        Self { pin }
    }
}

impl<P: Pin, M: OutputMode> DigitalOutput for GpioLed<'_, P, M> {
    fn set_on(&mut self, on: bool) {
        if let Err(err) = self.pin.set_level(gpio::Level::from(on)) {
            warn!("gpio{} write failed: {err}", self.pin.pin());
        }
    }
}

/// Passive buzzer on an LEDC channel; the tone is set on the channel's timer.
pub struct LedcBuzzer<'d, S: SpeedMode> {
    timer: LedcTimerDriver<'d, S>,
    channel: LedcDriver<'d>,
}

impl<'d, S: SpeedMode> LedcBuzzer<'d, S> {
    /// `channel` must have been created from `timer`.
    pub fn new(timer: LedcTimerDriver<'d, S>, channel: LedcDriver<'d>) -> Self {
        Self { timer, channel }
    }

    fn sound(&mut self, frequency_hz: u32) -> Result<(), EspError> {
        self.timer.set_frequency(Hertz(frequency_hz))?;
        let half = self.channel.get_max_duty() / 2;
        self.channel.set_duty(half)
    }

    fn mute(&mut self) -> Result<(), EspError> {
        self.channel.set_duty(0)
    }
}

impl<S: SpeedMode> ToneOutput for LedcBuzzer<'_, S> {
    fn play(&mut self, frequency_hz: u32) {
        if let Err(err) = self.sound(frequency_hz) {
            warn!("buzzer tone {frequency_hz} Hz failed: {err}");
        }
    }

    fn set_level(&mut self, on: bool) {
        let result = if on { self.sound(PULSE_TONE_HZ) } else { self.mute() };
        if let Err(err) = result {
            warn!("buzzer level failed: {err}");
        }
    }

    fn silence(&mut self) {
        if let Err(err) = self.mute() {
            warn!("buzzer silence failed: {err}");
        }
    }
}
