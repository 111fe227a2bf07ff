//! Console-backed stand-ins for the doorbell hardware.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use doorbell_core::alert::note_name;
use doorbell_core::config::StaticAddress;
use doorbell_core::hal::{ButtonInput, DigitalOutput, Level, LinkControl, ToneOutput};
use doorbell_core::time::{Clock, Millis};
use log::{debug, info};

/// How long a key press holds the virtual button down.
pub const PRESS_HOLD: Duration = Duration::from_millis(150);
/// Delay between a reconnect request and the simulated association.
pub const ASSOCIATION_DELAY: Duration = Duration::from_millis(300);

/// Wall clock measured from emulator start.
#[derive(Debug)]
pub struct HostClock {
    started_at: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    type Instant = Millis;

    fn now(&self) -> Millis {
        let elapsed = self.started_at.elapsed().as_millis();
        Millis::from_millis(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}

/// Momentary button driven from the keyboard.
///
/// Terminals only report key-down, so each press holds the line low for
/// [`PRESS_HOLD`].
#[derive(Clone, Debug, Default)]
pub struct KeyButton {
    held_until: Rc<Cell<Option<Instant>>>,
}

impl KeyButton {
    pub fn press(&self) {
        self.held_until.set(Some(Instant::now() + PRESS_HOLD));
    }
}

impl ButtonInput for KeyButton {
    fn read(&mut self) -> Level {
        match self.held_until.get() {
            Some(until) if Instant::now() < until => Level::Low,
            _ => Level::High,
        }
    }
}

/// LED that logs every change of level.
#[derive(Debug)]
pub struct ConsoleLed {
    target: &'static str,
    name: &'static str,
    on: Option<bool>,
}

impl ConsoleLed {
    pub fn new(target: &'static str, name: &'static str) -> Self {
        Self {
            target,
            name,
            on: None,
        }
    }
}

impl DigitalOutput for ConsoleLed {
    fn set_on(&mut self, on: bool) {
        if self.on == Some(on) {
            return;
        }
        self.on = Some(on);
        debug!(target: self.target, "{} LED {}", self.name, if on { "on" } else { "off" });
    }
}

/// Buzzer that prints the notes it would play.
#[derive(Debug)]
pub struct ConsoleBuzzer {
    target: &'static str,
    sounding: bool,
}

impl ConsoleBuzzer {
    pub fn new(target: &'static str) -> Self {
        Self {
            target,
            sounding: false,
        }
    }
}

impl ToneOutput for ConsoleBuzzer {
    fn play(&mut self, frequency_hz: u32) {
        self.sounding = true;
        info!(target: self.target, "♪ {} {frequency_hz} Hz", note_name(frequency_hz));
    }

    fn set_level(&mut self, on: bool) {
        self.sounding = on;
        info!(target: self.target, "buzzer {}", if on { "on" } else { "off" });
    }

    fn silence(&mut self) {
        if self.sounding {
            self.sounding = false;
            info!(target: self.target, "buzzer silent");
        }
    }
}

/// Keyboard-controlled switch that cuts a simulated link.
#[derive(Clone, Debug, Default)]
pub struct LinkSwitch {
    cut: Rc<Cell<bool>>,
}

impl LinkSwitch {
    /// Flips the switch and returns whether the link is now cut.
    pub fn toggle(&self) -> bool {
        let cut = !self.cut.get();
        self.cut.set(cut);
        cut
    }

    pub fn is_cut(&self) -> bool {
        self.cut.get()
    }
}

/// Radio association that completes [`ASSOCIATION_DELAY`] after a request
/// unless the switch is cut.
#[derive(Debug)]
pub struct SimulatedLink {
    target: &'static str,
    switch: LinkSwitch,
    connected: bool,
    associating_since: Option<Instant>,
}

impl SimulatedLink {
    pub fn new(target: &'static str, switch: LinkSwitch) -> Self {
        Self {
            target,
            switch,
            connected: false,
            associating_since: None,
        }
    }
}

impl LinkControl for SimulatedLink {
    type Error = std::convert::Infallible;

    fn apply_static_address(&mut self, address: &StaticAddress) -> Result<(), Self::Error> {
        info!(
            target: self.target,
            "static address {}/{} via {} (dns {})",
            address.ip,
            address.prefix_len(),
            address.gateway,
            address.dns
        );
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        if self.switch.is_cut() {
            self.connected = false;
            self.associating_since = None;
        } else if self
            .associating_since
            .is_some_and(|since| since.elapsed() >= ASSOCIATION_DELAY)
        {
            self.connected = true;
            self.associating_since = None;
        }
        self.connected
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        if !self.switch.is_cut() && self.associating_since.is_none() {
            self.associating_since = Some(Instant::now());
        }
        Ok(())
    }
}
