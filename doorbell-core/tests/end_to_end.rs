//! Both nodes on one in-memory network, driven by one manual clock.

mod support;

use core::time::Duration;

use doorbell_core::config::{ReceiverConfig, SenderConfig};
use doorbell_core::node::{ReceiverNode, ReceiverPeripherals, SenderNode, SenderPeripherals};
use doorbell_core::protocol::DatagramListener;
use doorbell_core::telemetry::TelemetryEventKind;
use doorbell_core::time::{Clock, ManualClock};

use support::{Button, Buzzer, BuzzerCall, EventLog, Led, Link, Network, Socket, TICK_MS, test_network};

struct Doorbell {
    clock: ManualClock,
    sender: SenderNode<Button, Led, Socket, Link>,
    receiver: ReceiverNode<Buzzer, Led, DatagramListener<Socket>, Link>,
    button: Button,
    confirm_led: Led,
    buzzer: Buzzer,
    sender_log: EventLog,
    receiver_log: EventLog,
}

impl Doorbell {
    fn new() -> Self {
        let network = Network::default();
        let sender_config = SenderConfig {
            network: test_network(),
            ..SenderConfig::DEFAULT
        };
        let receiver_config = ReceiverConfig {
            network: test_network(),
            ..ReceiverConfig::DEFAULT
        };

        let button = Button::default();
        let confirm_led = Led::default();
        let buzzer = Buzzer::default();

        let sender = SenderNode::new(
            sender_config,
            SenderPeripherals {
                button: button.clone(),
                status_led: Led::default(),
                confirm_led: confirm_led.clone(),
                socket: network.socket(sender_config.network.sender),
                link: Link::up(),
            },
        )
        .expect("sender starts");
        let receiver = ReceiverNode::new(
            receiver_config,
            ReceiverPeripherals {
                buzzer: buzzer.clone(),
                indicator_led: Led::default(),
                network_led: Led::default(),
                listener: DatagramListener::new(
                    network.socket(receiver_config.network.receiver),
                    &receiver_config,
                ),
                link: Link::up(),
            },
        )
        .expect("receiver starts");
        buzzer.clear();

        Self {
            clock: ManualClock::default(),
            sender,
            receiver,
            button,
            confirm_led,
            buzzer,
            sender_log: EventLog::default(),
            receiver_log: EventLog::default(),
        }
    }

    fn run_until(&mut self, end: u64) {
        while self.clock.now().as_millis() <= end {
            let now = self.clock.now();
            let sent = self.sender.tick(now);
            self.sender_log.extend(&sent);
            let received = self.receiver.tick(now);
            self.receiver_log.extend(&received);
            self.clock.advance(Duration::from_millis(TICK_MS));
        }
    }
}

#[test]
fn press_rings_once_and_confirms_for_two_seconds() {
    let mut bell = Doorbell::new();
    bell.run_until(990);

    bell.button.press();
    bell.run_until(1_060);
    assert_eq!(
        bell.receiver_log
            .count(|event| matches!(event, TelemetryEventKind::RingReceived(_))),
        1
    );

    bell.run_until(1_070);
    assert!(bell.confirm_led.is_on());
    let confirmed = bell.sender_log.times_of(&TelemetryEventKind::AckConfirmed {
        latency: Duration::from_millis(10),
    });
    assert_eq!(confirmed, vec![1_070]);

    bell.run_until(3_060);
    assert!(bell.confirm_led.is_on());
    bell.run_until(3_070);
    assert!(!bell.confirm_led.is_on());

    bell.run_until(5_000);

    // Three copies arrive, the chime plays exactly once.
    assert_eq!(
        bell.receiver_log
            .count(|event| matches!(event, TelemetryEventKind::RingReceived(_))),
        3
    );
    assert_eq!(
        bell.buzzer.calls(),
        vec![
            BuzzerCall::Play(262),
            BuzzerCall::Play(330),
            BuzzerCall::Play(392),
            BuzzerCall::Play(523),
            BuzzerCall::Silence,
        ]
    );
    assert_eq!(
        bell.receiver_log.times_of(&TelemetryEventKind::AlertFinished),
        vec![2_060]
    );

    // Acks for the duplicate copies find nothing pending.
    assert_eq!(
        bell.sender_log.times_of(&TelemetryEventKind::AckUnexpected),
        vec![1_170, 1_270]
    );
    assert_eq!(bell.confirm_led.changes(), vec![true, false]);
    assert!(!bell.sender_log.contains(&TelemetryEventKind::AckTimedOut));
}
