use std::io;

use doorbell_core::config::{ReceiverConfig, Role, SenderConfig, StartupError, Transport};
use doorbell_core::net::{TcpRequestServer, UdpTransport};
use doorbell_core::node::{ReceiverNode, ReceiverPeripherals, SenderNode, SenderPeripherals};
use doorbell_core::protocol::{DatagramListener, InboundListener, RequestListener};
use doorbell_core::telemetry::{Severity, TickEvents};
use doorbell_core::time::Millis;
use log::{Level, info, log};

use crate::console::{ConsoleBuzzer, ConsoleLed, KeyButton, LinkSwitch, SimulatedLink};

/// One emulated node the main loop can drive.
pub trait Station {
    fn tick(&mut self, now: Millis);

    /// Logs a one-line summary of the node state.
    fn report_status(&self);
}

fn log_target(role: Role) -> &'static str {
    match role {
        Role::Sender => "sender",
        Role::Receiver => "receiver",
    }
}

fn level_for(severity: Severity) -> Level {
    match severity {
        Severity::Debug => Level::Debug,
        Severity::Info => Level::Info,
        Severity::Warn => Level::Warn,
        Severity::Error => Level::Error,
    }
}

/// Forwards the events of one tick to the logger.
fn log_events(role: Role, tick: &TickEvents<Millis>) {
    let target = log_target(role);
    for event in tick.iter() {
        log!(target: target, level_for(event.severity()), "[{}] {event}", tick.now());
    }
    if tick.overflowed() {
        log!(target: target, Level::Warn, "[{}] events dropped this tick", tick.now());
    }
}

fn startup_error<E: std::fmt::Debug>(err: &StartupError<E>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
}

type EmulatedSender = SenderNode<KeyButton, ConsoleLed, UdpTransport, SimulatedLink>;

pub struct SenderStation {
    node: EmulatedSender,
}

impl SenderStation {
    pub fn new(config: SenderConfig, button: KeyButton, link: LinkSwitch) -> io::Result<Self> {
        let target = log_target(Role::Sender);
        let socket = UdpTransport::bind(config.network.sender)?;
        let node = SenderNode::new(
            config,
            SenderPeripherals {
                button,
                status_led: ConsoleLed::new(target, "status"),
                confirm_led: ConsoleLed::new(target, "confirm"),
                socket,
                link: SimulatedLink::new(target, link),
            },
        )
        .map_err(|err| startup_error(&err))?;
        info!(
            target: target,
            "listening on {} -> {}",
            config.network.sender,
            config.network.receiver
        );
        Ok(Self { node })
    }
}

impl Station for SenderStation {
    fn tick(&mut self, now: Millis) {
        let events = self.node.tick(now);
        log_events(Role::Sender, &events);
    }

    fn report_status(&self) {
        let status = self.node.status();
        info!(
            target: log_target(Role::Sender),
            "link={} attempts={} presses={}/{} burst={} awaiting_ack={} confirm={} events={}",
            if status.link_up { "up" } else { "down" },
            status.reconnect_attempts,
            status.presses_accepted,
            status.presses_rejected,
            status.burst_active,
            status.awaiting_ack,
            status.confirm_active,
            status.events_recorded
        );
    }
}

type EmulatedReceiver<X> = ReceiverNode<ConsoleBuzzer, ConsoleLed, X, SimulatedLink>;

pub struct ReceiverStation<X> {
    node: EmulatedReceiver<X>,
}

impl<X: InboundListener> ReceiverStation<X> {
    fn with_listener(config: ReceiverConfig, listener: X, link: LinkSwitch) -> io::Result<Self> {
        let target = log_target(Role::Receiver);
        let node = ReceiverNode::new(
            config,
            ReceiverPeripherals {
                buzzer: ConsoleBuzzer::new(target),
                indicator_led: ConsoleLed::new(target, "indicator"),
                network_led: ConsoleLed::new(target, "network"),
                listener,
                link: SimulatedLink::new(target, link),
            },
        )
        .map_err(|err| startup_error(&err))?;
        info!(
            target: target,
            "{} listener on {}",
            config.transport,
            config.network.receiver
        );
        Ok(Self { node })
    }
}

impl ReceiverStation<DatagramListener<UdpTransport>> {
    pub fn datagram(config: ReceiverConfig, link: LinkSwitch) -> io::Result<Self> {
        let socket = UdpTransport::bind(config.network.receiver)?;
        Self::with_listener(config, DatagramListener::new(socket, &config), link)
    }
}

impl ReceiverStation<RequestListener<TcpRequestServer>> {
    pub fn request(config: ReceiverConfig, link: LinkSwitch) -> io::Result<Self> {
        let server = TcpRequestServer::bind(config.network.receiver)?;
        Self::with_listener(config, RequestListener::new(server, &config), link)
    }
}

impl<X: InboundListener> Station for ReceiverStation<X> {
    fn tick(&mut self, now: Millis) {
        let events = self.node.tick(now);
        log_events(Role::Receiver, &events);
    }

    fn report_status(&self) {
        let status = self.node.status();
        let step = status
            .alert_step
            .map_or_else(|| "idle".to_owned(), |step| format!("step {step}"));
        info!(
            target: log_target(Role::Receiver),
            "link={} attempts={} rings={} alert={} indicator={} events={}",
            if status.link_up { "up" } else { "down" },
            status.reconnect_attempts,
            status.rings_received,
            step,
            status.indicator_active,
            status.events_recorded
        );
    }
}

/// Builds the receiver station for the configured transport.
pub fn receiver_station(config: ReceiverConfig, link: LinkSwitch) -> io::Result<Box<dyn Station>> {
    Ok(match config.transport {
        Transport::Datagram => Box::new(ReceiverStation::datagram(config, link)?),
        Transport::Request => Box::new(ReceiverStation::request(config, link)?),
    })
}
