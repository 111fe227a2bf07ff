use crate::alert::{AlertSequencer, SequencerUpdate, TriggerOutcome};
use crate::config::{ReceiverConfig, Role, StartupError};
use crate::hal::{DigitalOutput, LinkControl, ToneOutput};
use crate::indicator::TimedIndicator;
use crate::link::LinkSupervisor;
use crate::protocol::{AckReply, InboundEvent, InboundListener};
use crate::telemetry::{TelemetryEventKind, TelemetryRecorder, TickEvents};
use crate::time::{Millis, TickInstant};

use super::{RearmRetry, push_link_events};

/// Hardware owned by the indoor node.
#[derive(Debug)]
pub struct ReceiverPeripherals<T, L, X, N> {
    pub buzzer: T,
    /// Blinks after a ring; mirrors the link blink while disconnected.
    pub indicator_led: L,
    /// On while the link is up.
    pub network_led: L,
    pub listener: X,
    pub link: N,
}

/// Point-in-time view of the receiver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReceiverStatus {
    pub link_up: bool,
    pub reconnect_attempts: u32,
    pub rings_received: u32,
    pub alert_step: Option<usize>,
    pub indicator_active: bool,
    pub events_recorded: u32,
}

/// Indoor node: ring in, alert and indicator out, ack back.
pub struct ReceiverNode<T, L, X, N, I = Millis>
where
    I: Copy,
{
    config: ReceiverConfig,
    io: ReceiverPeripherals<T, L, X, N>,
    alert: AlertSequencer<I>,
    indicator: TimedIndicator<I>,
    link: LinkSupervisor<I>,
    rearm: RearmRetry<I>,
    telemetry: TelemetryRecorder<I>,
    rings: u32,
}

impl<T, L, X, N, I> ReceiverNode<T, L, X, N, I>
where
    T: ToneOutput,
    L: DigitalOutput,
    X: InboundListener,
    N: LinkControl,
    I: TickInstant,
{
    /// Validates `config`, applies the static address and parks the outputs.
    pub fn new(
        config: ReceiverConfig,
        mut io: ReceiverPeripherals<T, L, X, N>,
    ) -> Result<Self, StartupError<N::Error>> {
        config.validate()?;
        io.link
            .apply_static_address(&config.network.static_address(Role::Receiver))
            .map_err(StartupError::StaticAddress)?;
        io.buzzer.silence();
        io.indicator_led.set_on(false);
        io.network_led.set_on(false);

        Ok(Self {
            alert: AlertSequencer::new(config.alert),
            indicator: TimedIndicator::new(true),
            link: LinkSupervisor::new(config.reconnect_cooldown),
            rearm: RearmRetry::new(config.reconnect_cooldown),
            telemetry: TelemetryRecorder::new(),
            rings: 0,
            config,
            io,
        })
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn peripherals(&self) -> &ReceiverPeripherals<T, L, X, N> {
        &self.io
    }

    pub fn peripherals_mut(&mut self) -> &mut ReceiverPeripherals<T, L, X, N> {
        &mut self.io
    }

    pub fn telemetry(&self) -> &TelemetryRecorder<I> {
        &self.telemetry
    }

    pub fn status(&self) -> ReceiverStatus {
        ReceiverStatus {
            link_up: self.link.is_connected(),
            reconnect_attempts: self.link.attempts(),
            rings_received: self.rings,
            alert_step: self.alert.current_step(),
            indicator_active: self.indicator.is_active(),
            events_recorded: self.telemetry.total(),
        }
    }

    /// Runs one iteration of the receiver loop.
    ///
    /// The alert and indicator keep running while the link is down; only the
    /// listener is skipped, as it is while a failed re-bind awaits its retry.
    pub fn tick(&mut self, now: I) -> TickEvents<I> {
        let mut tick = TickEvents::new(now);

        let online = self.poll_link(now, &mut tick);
        if online && !self.rearm.is_pending() {
            self.poll_listener(now, &mut tick);
        }
        self.advance_alert(now, &mut tick);
        self.latch_outputs(now, online, &mut tick);

        self.telemetry.commit(&tick);
        tick
    }

    fn poll_link(&mut self, now: I, tick: &mut TickEvents<I>) -> bool {
        let report = self.link.tick(now, &mut self.io.link);
        push_link_events(&report, tick);

        let listener = &mut self.io.listener;
        self.rearm.run(now, &report, tick, || listener.rearm());

        report.connected
    }

    fn poll_listener(&mut self, now: I, tick: &mut TickEvents<I>) {
        let Some(event) = self.io.listener.poll() else {
            return;
        };

        match event {
            InboundEvent::Ring { source, ack } => {
                self.rings = self.rings.saturating_add(1);
                tick.push(TelemetryEventKind::RingReceived(source));
                match ack {
                    AckReply::Sent => tick.push(TelemetryEventKind::AckReplySent),
                    AckReply::Failed => tick.push(TelemetryEventKind::AckReplyFailed),
                    AckReply::NotRequested => {}
                }
                self.start_alert(now, tick);
            }
            InboundEvent::Ignored { len } => tick.push(TelemetryEventKind::PayloadIgnored { len }),
            InboundEvent::Rejected => tick.push(TelemetryEventKind::RequestRejected),
            InboundEvent::TimedOut => tick.push(TelemetryEventKind::RequestTimedOut),
            InboundEvent::Failed(error) => tick.push(TelemetryEventKind::TransportFailed(error)),
        }
    }

    fn start_alert(&mut self, now: I, tick: &mut TickEvents<I>) {
        match self.alert.trigger(now, &mut self.io.buzzer) {
            TriggerOutcome::Started { steps, first } => {
                tick.push(TelemetryEventKind::AlertStarted { steps });
                tick.push(TelemetryEventKind::AlertStep {
                    index: 0,
                    tone: first.tone,
                });
            }
            TriggerOutcome::AlreadyPlaying => tick.push(TelemetryEventKind::AlertAlreadyActive),
            TriggerOutcome::Empty => {}
        }

        let restarted = self.indicator.activate(now, self.config.indicator);
        tick.push(TelemetryEventKind::IndicatorStarted { restarted });
    }

    fn advance_alert(&mut self, now: I, tick: &mut TickEvents<I>) {
        match self.alert.tick(now, &mut self.io.buzzer) {
            SequencerUpdate::Advanced { index, step } => {
                tick.push(TelemetryEventKind::AlertStep {
                    index,
                    tone: step.tone,
                });
            }
            SequencerUpdate::Finished => tick.push(TelemetryEventKind::AlertFinished),
            SequencerUpdate::Idle | SequencerUpdate::Holding => {}
        }
    }

    fn latch_outputs(&mut self, now: I, online: bool, tick: &mut TickEvents<I>) {
        let indicator = self.indicator.tick(now);
        if indicator.expired {
            tick.push(TelemetryEventKind::IndicatorExpired);
        }

        let level = if online {
            indicator.level
        } else {
            self.link.blink_on()
        };
        self.io.indicator_led.set_on(level);
        self.io.network_led.set_on(online);
    }
}
