use crate::config::{Role, SenderConfig, StartupError};
use crate::hal::{ButtonInput, DatagramSocket, DigitalOutput, LinkControl};
use crate::indicator::TimedIndicator;
use crate::input::{DebouncedInput, RateDecision, RateLimiter};
use crate::link::{LinkSupervisor, LinkTransition};
use crate::protocol::{AckListener, AckPoll, BurstPoll, RetransmitBurst};
use crate::telemetry::{TelemetryEventKind, TelemetryRecorder, TickEvents};
use crate::time::{Millis, TickInstant};

use super::{RearmRetry, push_link_events};

/// Hardware owned by the front-door node.
#[derive(Debug)]
pub struct SenderPeripherals<B, L, S, N> {
    pub button: B,
    /// On when ready, blinking while the link is down, dark per ring copy.
    pub status_led: L,
    /// Shows the acknowledgment outcome.
    pub confirm_led: L,
    pub socket: S,
    pub link: N,
}

/// Point-in-time view of the sender.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SenderStatus {
    pub link_up: bool,
    pub reconnect_attempts: u32,
    pub presses_accepted: u32,
    pub presses_rejected: u32,
    pub burst_active: bool,
    pub awaiting_ack: bool,
    pub confirm_active: bool,
    pub events_recorded: u32,
}

/// Front-door node: button in, ring burst out, optional confirmation.
pub struct SenderNode<B, L, S, N, I = Millis>
where
    I: Copy,
{
    config: SenderConfig,
    io: SenderPeripherals<B, L, S, N>,
    input: DebouncedInput<I>,
    limiter: RateLimiter<I>,
    burst: RetransmitBurst<I>,
    ack: Option<AckListener<I>>,
    confirm: TimedIndicator<I>,
    link: LinkSupervisor<I>,
    rearm: RearmRetry<I>,
    telemetry: TelemetryRecorder<I>,
}

impl<B, L, S, N, I> SenderNode<B, L, S, N, I>
where
    B: ButtonInput,
    L: DigitalOutput,
    S: DatagramSocket,
    N: LinkControl,
    I: TickInstant,
{
    /// Validates `config`, applies the static address and parks the outputs.
    pub fn new(
        config: SenderConfig,
        mut io: SenderPeripherals<B, L, S, N>,
    ) -> Result<Self, StartupError<N::Error>> {
        config.validate()?;
        io.link
            .apply_static_address(&config.network.static_address(Role::Sender))
            .map_err(StartupError::StaticAddress)?;
        io.status_led.set_on(false);
        io.confirm_led.set_on(false);

        let ack = config
            .ack
            .is_enabled()
            .then(|| AckListener::new(config.ack_token, config.ack_timeout));

        Ok(Self {
            input: DebouncedInput::new(config.debounce, config.active_level),
            limiter: RateLimiter::new(config.anti_spam),
            burst: RetransmitBurst::new(
                config.repeat_count,
                config.repeat_gap,
                config.pulse_width,
            ),
            ack,
            confirm: TimedIndicator::new(false),
            link: LinkSupervisor::new(config.reconnect_cooldown),
            rearm: RearmRetry::new(config.reconnect_cooldown),
            telemetry: TelemetryRecorder::new(),
            config,
            io,
        })
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn peripherals(&self) -> &SenderPeripherals<B, L, S, N> {
        &self.io
    }

    pub fn peripherals_mut(&mut self) -> &mut SenderPeripherals<B, L, S, N> {
        &mut self.io
    }

    pub fn telemetry(&self) -> &TelemetryRecorder<I> {
        &self.telemetry
    }

    pub fn status(&self) -> SenderStatus {
        SenderStatus {
            link_up: self.link.is_connected(),
            reconnect_attempts: self.link.attempts(),
            presses_accepted: self.limiter.accepted(),
            presses_rejected: self.limiter.rejected(),
            burst_active: self.burst.is_active(),
            awaiting_ack: self
                .ack
                .as_ref()
                .is_some_and(|ack| ack.pending().is_awaiting()),
            confirm_active: self.confirm.is_active(),
            events_recorded: self.telemetry.total(),
        }
    }

    /// Runs one iteration of the sender loop.
    ///
    /// A socket whose re-bind failed counts as offline until the retry
    /// succeeds; the status LED still follows the link itself.
    pub fn tick(&mut self, now: I) -> TickEvents<I> {
        let mut tick = TickEvents::new(now);

        let online = self.poll_link(now, &mut tick);
        let ready = online && !self.rearm.is_pending();
        self.poll_button(now, ready, &mut tick);
        if ready {
            self.poll_burst(now, &mut tick);
        }
        self.poll_ack(now, ready, &mut tick);
        self.latch_outputs(now, online, &mut tick);

        self.telemetry.commit(&tick);
        tick
    }

    fn poll_link(&mut self, now: I, tick: &mut TickEvents<I>) -> bool {
        let report = self.link.tick(now, &mut self.io.link);
        push_link_events(&report, tick);

        if report.transition == LinkTransition::Lost
            && let Some(sent) = self.burst.abort()
        {
            tick.push(TelemetryEventKind::BurstAbandoned {
                sent,
                of: self.config.repeat_count,
            });
        }
        let socket = &mut self.io.socket;
        self.rearm.run(now, &report, tick, || socket.rebind());

        report.connected
    }

    fn poll_button(&mut self, now: I, online: bool, tick: &mut TickEvents<I>) {
        let level = self.io.button.read();
        if self.input.sample(level, now).is_none() {
            return;
        }
        tick.push(TelemetryEventKind::PressDetected);

        match self.limiter.try_accept(now) {
            RateDecision::Rejected { since_last } => {
                tick.push(TelemetryEventKind::PressRateLimited { since_last });
            }
            RateDecision::Accepted if !online => tick.push(TelemetryEventKind::RingDroppedOffline),
            RateDecision::Accepted => {
                self.burst.start(now);
                if let Some(ack) = &mut self.ack {
                    ack.arm(now);
                    tick.push(TelemetryEventKind::AwaitingAck {
                        timeout: self.config.ack_timeout,
                    });
                }
            }
        }
    }

    fn poll_burst(&mut self, now: I, tick: &mut TickEvents<I>) {
        let peer = self.config.network.peer(Role::Sender);
        while let BurstPoll::Sent {
            copy,
            of,
            delivered,
        } = self
            .burst
            .poll(now, &mut self.io.socket, peer, self.config.ring_token)
        {
            tick.push(if delivered {
                TelemetryEventKind::RingSent { copy, of }
            } else {
                TelemetryEventKind::RingSendFailed { copy, of }
            });
            if copy >= of {
                break;
            }
        }
    }

    fn poll_ack(&mut self, now: I, online: bool, tick: &mut TickEvents<I>) {
        let Some(ack) = &mut self.ack else {
            return;
        };

        if ack.expire(now) {
            tick.push(TelemetryEventKind::AckTimedOut);
            let restarted = self.confirm.activate(now, self.config.unconfirmed);
            tick.push(TelemetryEventKind::IndicatorStarted { restarted });
        }
        if !online {
            return;
        }

        match ack.poll(now, &mut self.io.socket) {
            AckPoll::Nothing => {}
            AckPoll::Confirmed { latency } => {
                tick.push(TelemetryEventKind::AckConfirmed { latency });
                let restarted = self.confirm.activate(now, self.config.confirmed);
                tick.push(TelemetryEventKind::IndicatorStarted { restarted });
            }
            AckPoll::Unexpected => tick.push(TelemetryEventKind::AckUnexpected),
            AckPoll::Ignored { len } => tick.push(TelemetryEventKind::PayloadIgnored { len }),
            AckPoll::Failed(error) => tick.push(TelemetryEventKind::TransportFailed(error)),
        }
    }

    fn latch_outputs(&mut self, now: I, online: bool, tick: &mut TickEvents<I>) {
        let status = if online {
            !self.burst.pulse_active(now)
        } else {
            self.link.blink_on()
        };
        self.io.status_led.set_on(status);

        let confirm = self.confirm.tick(now);
        if confirm.expired {
            tick.push(TelemetryEventKind::IndicatorExpired);
        }
        self.io.confirm_led.set_on(confirm.level);
    }
}
