mod support;

use core::time::Duration;

use doorbell_core::alert::{AlertShape, Tone};
use doorbell_core::config::{AckMode, ReceiverConfig, Transport};
use doorbell_core::node::{ReceiverNode, ReceiverPeripherals};
use doorbell_core::protocol::{DatagramListener, RequestListener, RingSource};
use doorbell_core::telemetry::TelemetryEventKind;

use support::{
    Buzzer, BuzzerCall, EventLog, Led, Link, Network, RequestScript, Socket, TICK_MS, ms,
    test_network,
};

type TestReceiver = ReceiverNode<Buzzer, Led, DatagramListener<Socket>, Link>;

struct Bench {
    now: u64,
    node: TestReceiver,
    config: ReceiverConfig,
    buzzer: Buzzer,
    indicator_led: Led,
    network_led: Led,
    socket: Socket,
    link: Link,
    network: Network,
    log: EventLog,
}

impl Bench {
    fn new(config: ReceiverConfig) -> Self {
        let network = Network::default();
        let buzzer = Buzzer::default();
        let indicator_led = Led::default();
        let network_led = Led::default();
        let link = Link::up();
        let socket = network.socket(config.network.receiver);
        let node = ReceiverNode::new(
            config,
            ReceiverPeripherals {
                buzzer: buzzer.clone(),
                indicator_led: indicator_led.clone(),
                network_led: network_led.clone(),
                listener: DatagramListener::new(socket.clone(), &config),
                link: link.clone(),
            },
        )
        .expect("valid receiver config");
        buzzer.clear();

        Self {
            now: 0,
            node,
            config,
            buzzer,
            indicator_led,
            network_led,
            socket,
            link,
            network,
            log: EventLog::default(),
        }
    }

    fn run_until(&mut self, end: u64) {
        while self.now <= end {
            let tick = self.node.tick(ms(self.now));
            self.log.extend(&tick);
            self.now += TICK_MS;
        }
    }

    fn ring(&self) {
        self.network.deliver(self.config.network.receiver, b"RING");
    }

    fn acks_sent(&self) -> usize {
        self.network.sent_to(self.config.network.sender).len()
    }

    fn notes_played(&self) -> Vec<u32> {
        self.buzzer
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BuzzerCall::Play(hz) => Some(hz),
                _ => None,
            })
            .collect()
    }
}

fn default_config() -> ReceiverConfig {
    ReceiverConfig {
        network: test_network(),
        ..ReceiverConfig::DEFAULT
    }
}

#[test]
fn ring_plays_the_melody_once_and_acknowledges() {
    let mut bench = Bench::new(default_config());
    bench.run_until(990);
    assert!(bench.network_led.is_on());
    assert!(bench.indicator_led.is_on(), "indicator rests on while idle");
    assert_eq!(bench.socket.rebinds(), 1);

    bench.ring();
    bench.run_until(1_000);
    assert_eq!(bench.acks_sent(), 1);
    assert_eq!(
        bench.network.sent_to(bench.config.network.sender),
        vec![b"QSL".to_vec()]
    );
    assert!(bench.log.contains(&TelemetryEventKind::RingReceived(RingSource::Datagram)));
    assert_eq!(bench.node.status().alert_step, Some(0));

    bench.run_until(2_500);
    assert_eq!(
        bench.buzzer.calls(),
        vec![
            BuzzerCall::Play(262),
            BuzzerCall::Play(330),
            BuzzerCall::Play(392),
            BuzzerCall::Play(523),
            BuzzerCall::Silence,
        ]
    );
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::AlertStep {
            index: 3,
            tone: Tone::Frequency(523),
        }),
        vec![1_600]
    );
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::AlertFinished),
        vec![2_000]
    );
    assert_eq!(bench.node.status().rings_received, 1);
}

#[test]
fn indicator_blinks_for_a_minute_then_rests_on() {
    let mut bench = Bench::new(default_config());
    bench.run_until(990);
    bench.ring();

    bench.run_until(1_490);
    assert!(bench.indicator_led.is_on());
    bench.run_until(1_500);
    assert!(!bench.indicator_led.is_on());
    bench.run_until(1_990);
    assert!(!bench.indicator_led.is_on());
    bench.run_until(2_000);
    assert!(bench.indicator_led.is_on());

    bench.run_until(60_990);
    assert!(!bench.indicator_led.is_on());
    assert!(bench.node.status().indicator_active);

    bench.run_until(61_000);
    assert!(bench.indicator_led.is_on());
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::IndicatorExpired),
        vec![61_000]
    );
    assert!(!bench.node.status().indicator_active);

    bench.run_until(65_000);
    assert!(bench.indicator_led.is_on());
}

#[test]
fn duplicate_rings_do_not_restart_the_melody() {
    let mut bench = Bench::new(default_config());
    bench.run_until(990);
    bench.ring();
    bench.ring();
    bench.ring();
    bench.run_until(3_000);

    assert_eq!(bench.notes_played(), vec![262, 330, 392, 523]);
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::AlertAlreadyActive),
        vec![1_010, 1_020]
    );
    assert_eq!(
        bench
            .log
            .times_of(&TelemetryEventKind::IndicatorStarted { restarted: true }),
        vec![1_010, 1_020]
    );
    assert_eq!(bench.acks_sent(), 3);
    assert_eq!(bench.node.status().rings_received, 3);
}

#[test]
fn unknown_payload_changes_nothing() {
    let mut bench = Bench::new(default_config());
    bench.run_until(990);
    bench.network.deliver(bench.config.network.receiver, b"HELLO");
    bench.run_until(2_000);

    assert!(bench.log.contains(&TelemetryEventKind::PayloadIgnored { len: 5 }));
    assert!(bench.buzzer.calls().is_empty());
    assert_eq!(bench.acks_sent(), 0);

    let status = bench.node.status();
    assert_eq!(status.rings_received, 0);
    assert!(!status.indicator_active);
    assert!(bench.indicator_led.is_on());
}

#[test]
fn ack_disabled_rings_silently() {
    let config = ReceiverConfig {
        ack: AckMode::Disabled,
        ..default_config()
    };
    let mut bench = Bench::new(config);
    bench.run_until(990);
    bench.ring();
    bench.run_until(1_500);

    assert_eq!(bench.acks_sent(), 0);
    assert_eq!(bench.node.status().rings_received, 1);
    assert!(!bench.log.contains(&TelemetryEventKind::AckReplySent));
}

#[test]
fn link_drop_blinks_and_defers_the_listener() {
    let mut bench = Bench::new(default_config());
    bench.run_until(1_990);
    bench.link.set_up(false);

    bench.run_until(2_000);
    assert!(bench.log.contains(&TelemetryEventKind::LinkLost));
    assert!(!bench.network_led.is_on());
    assert!(bench.indicator_led.is_on(), "first attempt blink level");

    bench.ring();
    bench.run_until(3_000);
    assert_eq!(bench.network.pending(bench.config.network.receiver), 1);
    assert_eq!(bench.link.reconnects(), 1);

    bench.run_until(3_010);
    assert_eq!(bench.link.reconnects(), 2);
    assert!(!bench.indicator_led.is_on());

    bench.link.set_up(true);
    bench.run_until(4_000);
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::LinkUp),
        vec![0, 3_020]
    );
    assert_eq!(bench.socket.rebinds(), 2);
    assert_eq!(
        bench
            .log
            .times_of(&TelemetryEventKind::RingReceived(RingSource::Datagram)),
        vec![3_020]
    );
    assert!(bench.network_led.is_on());
}

#[test]
fn melody_finishes_while_the_link_is_down() {
    let mut bench = Bench::new(default_config());
    bench.run_until(990);
    bench.ring();
    bench.run_until(1_090);
    bench.link.set_up(false);
    bench.run_until(2_500);

    assert_eq!(bench.notes_played().len(), 4);
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::AlertFinished),
        vec![2_000]
    );
}

#[test]
fn pulse_alert_buzzes_once() {
    let config = ReceiverConfig {
        alert: AlertShape::Pulse(Duration::from_millis(500)),
        ..default_config()
    };
    let mut bench = Bench::new(config);
    bench.run_until(990);
    bench.ring();
    bench.run_until(1_500);
    assert_eq!(bench.buzzer.calls(), vec![BuzzerCall::Level(true)]);

    bench.run_until(1_510);
    assert_eq!(
        bench.buzzer.calls(),
        vec![BuzzerCall::Level(true), BuzzerCall::Silence]
    );
}

#[test]
fn failed_rebind_is_retried_after_the_cooldown() {
    let mut bench = Bench::new(default_config());
    bench.run_until(990);
    bench.link.set_up(false);
    bench.run_until(1_000);
    bench.socket.fail_next_rebinds(1);
    bench.link.set_up(true);

    bench.run_until(1_010);
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::ListenerRearmFailed),
        vec![1_010]
    );
    bench.ring();

    bench.run_until(2_010);
    assert_eq!(bench.network.pending(bench.config.network.receiver), 1);
    assert!(bench.network_led.is_on());

    bench.run_until(2_500);
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::ListenerRearmed),
        vec![0, 2_020]
    );
    assert_eq!(
        bench
            .log
            .times_of(&TelemetryEventKind::RingReceived(RingSource::Datagram)),
        vec![2_020]
    );
    assert_eq!(bench.socket.rebinds(), 3);
    assert_eq!(
        bench
            .log
            .count(|event| matches!(event, TelemetryEventKind::TransportFailed(_))),
        0
    );
}

type RequestReceiver = ReceiverNode<Buzzer, Led, RequestListener<RequestScript>, Link>;

struct RequestBench {
    now: u64,
    node: RequestReceiver,
    script: RequestScript,
    buzzer: Buzzer,
    indicator_led: Led,
    log: EventLog,
}

impl RequestBench {
    fn new() -> Self {
        let config = ReceiverConfig {
            transport: Transport::Request,
            ..default_config()
        };
        let script = RequestScript::default();
        let buzzer = Buzzer::default();
        let indicator_led = Led::default();
        let node = ReceiverNode::new(
            config,
            ReceiverPeripherals {
                buzzer: buzzer.clone(),
                indicator_led: indicator_led.clone(),
                network_led: Led::default(),
                listener: RequestListener::new(script.clone(), &config),
                link: Link::up(),
            },
        )
        .expect("valid receiver config");
        buzzer.clear();

        Self {
            now: 0,
            node,
            script,
            buzzer,
            indicator_led,
            log: EventLog::default(),
        }
    }

    fn run_until(&mut self, end: u64) {
        while self.now <= end {
            let tick = self.node.tick(ms(self.now));
            self.log.extend(&tick);
            self.now += TICK_MS;
        }
    }
}

#[test]
fn ring_request_starts_the_alert_and_answers_the_ack() {
    let mut bench = RequestBench::new();
    bench.run_until(990);
    bench.script.connect(b"GET /ring HTTP/1.1");
    bench.run_until(1_000);

    assert_eq!(
        bench
            .log
            .times_of(&TelemetryEventKind::RingReceived(RingSource::Request)),
        vec![1_000]
    );
    assert!(bench.log.contains(&TelemetryEventKind::AckReplySent));
    assert_eq!(bench.buzzer.calls(), vec![BuzzerCall::Play(262)]);

    let status = bench.node.status();
    assert_eq!(status.alert_step, Some(0));
    assert!(status.indicator_active);

    let responses = bench.script.responses();
    assert_eq!(responses.len(), 1);
    assert!(responses[0].starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert!(responses[0].ends_with(b"\r\n\r\nQSL\r\n"));
    assert_eq!(bench.script.lingers(), vec![Duration::from_millis(100)]);
}

#[test]
fn ring_path_with_trailing_text_still_rings() {
    let mut bench = RequestBench::new();
    bench.run_until(990);
    bench.script.connect(b"GET /ring/ HTTP/1.1 extra");
    bench.run_until(1_000);

    assert_eq!(bench.node.status().rings_received, 1);
    assert!(bench.script.responses()[0].starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[test]
fn not_found_and_silent_clients_leave_the_alert_idle() {
    let mut bench = RequestBench::new();
    bench.run_until(990);
    bench.script.connect(b"GET /favicon.ico HTTP/1.1");
    bench.script.connect_silent();
    bench.run_until(2_000);

    assert_eq!(bench.script.waiting(), 0);
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::RequestRejected),
        vec![1_000]
    );
    assert_eq!(
        bench.log.times_of(&TelemetryEventKind::RequestTimedOut),
        vec![1_010]
    );

    let responses = bench.script.responses();
    assert!(responses[0].starts_with(b"HTTP/1.1 404 Not Found\r\n"));
    assert!(responses[1].is_empty(), "silent client gets no response");
    assert_eq!(
        bench.script.lingers(),
        vec![Duration::from_millis(100), Duration::ZERO]
    );

    assert!(bench.buzzer.calls().is_empty());
    let status = bench.node.status();
    assert_eq!(status.rings_received, 0);
    assert_eq!(status.alert_step, None);
    assert!(!status.indicator_active);
    assert!(bench.indicator_led.is_on());
}
