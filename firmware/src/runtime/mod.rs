use core::net::{Ipv4Addr, SocketAddrV4};

use doorbell_core::config::{NetworkConfig, Role};
use doorbell_core::telemetry::{Severity, TickEvents};
use doorbell_core::time::Millis;
use embassy_time::Instant;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{Level, info, log};

use crate::hw::{AUX_LED_GPIO, BUTTON_GPIO, BUZZER_GPIO, BoardError, GpioLed, STATUS_LED_GPIO, WifiLink};

const LOOP_DELAY_MS: u32 = 10;

fn now() -> Millis {
    Millis::from_millis(Instant::now().as_millis())
}

fn network_config() -> NetworkConfig {
    NetworkConfig {
        ssid: option_env!("DOORBELL_SSID").unwrap_or(NetworkConfig::DEFAULT.ssid),
        password: option_env!("DOORBELL_PASSWORD").unwrap_or(NetworkConfig::DEFAULT.password),
        ..NetworkConfig::DEFAULT
    }
}

/// Sockets bind the wildcard address; the netif only exists once associated.
fn wildcard(endpoint: SocketAddrV4) -> SocketAddrV4 {
    SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, endpoint.port())
}

fn log_events(tick: &TickEvents<Millis>) {
    for event in tick.iter() {
        let level = match event.severity() {
            Severity::Debug => Level::Debug,
            Severity::Info => Level::Info,
            Severity::Warn => Level::Warn,
            Severity::Error => Level::Error,
        };
        log!(level, "[{}] {event}", tick.now());
    }
}

fn banner(role: Role, network: &NetworkConfig) {
    info!("doorbell {role} starting");
    info!("  ssid     : {}", network.ssid);
    info!("  local    : {}", network.local(role));
    info!("  peer     : {}", network.peer(role));
    info!("  gateway  : {} mask {}", network.gateway, network.subnet_mask);
    match role {
        Role::Sender => {
            info!("  button   : gpio{BUTTON_GPIO}");
            info!("  status   : gpio{STATUS_LED_GPIO}");
            info!("  confirm  : gpio{AUX_LED_GPIO}");
        }
        Role::Receiver => {
            info!("  buzzer   : gpio{BUZZER_GPIO}");
            info!("  indicator: gpio{STATUS_LED_GPIO}");
            info!("  network  : gpio{AUX_LED_GPIO}");
        }
    }
}

#[cfg(feature = "sender")]
pub fn run() -> Result<(), BoardError> {
    use doorbell_core::config::SenderConfig;
    use doorbell_core::net::UdpTransport;
    use doorbell_core::node::{SenderNode, SenderPeripherals};
    use esp_idf_svc::hal::gpio::Pull;

    use crate::hw::GpioButton;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let config = SenderConfig {
        network: network_config(),
        ..SenderConfig::DEFAULT
    };
    banner(Role::Sender, &config.network);

    let mut button = PinDriver::input(peripherals.pins.gpio13)?;
    button.set_pull(Pull::Up)?;
    let link = WifiLink::new(peripherals.modem, sysloop, nvs, &config.network)?;

    let mut node = SenderNode::new(
        config,
        SenderPeripherals {
            button: GpioButton::new(button),
            status_led: GpioLed::new(PinDriver::output(peripherals.pins.gpio22.downgrade_output())?),
            confirm_led: GpioLed::new(PinDriver::output(peripherals.pins.gpio23.downgrade_output())?),
            socket: UdpTransport::bind(wildcard(config.network.sender))?,
            link,
        },
    )
    .map_err(|err| BoardError::Startup(err.to_string()))?;

    loop {
        let tick = node.tick(now());
        log_events(&tick);
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}

#[cfg(not(feature = "sender"))]
pub fn run() -> Result<(), BoardError> {
    use doorbell_core::config::{ReceiverConfig, Transport};
    use doorbell_core::node::{ReceiverNode, ReceiverPeripherals};
    use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, config::TimerConfig};
    use esp_idf_svc::hal::units::Hertz;

    use crate::hw::LedcBuzzer;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let transport = if cfg!(feature = "http") {
        Transport::Request
    } else {
        Transport::Datagram
    };
    let config = ReceiverConfig {
        network: network_config(),
        transport,
        ..ReceiverConfig::DEFAULT
    };
    banner(Role::Receiver, &config.network);

    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new().frequency(Hertz(1_000)),
    )?;
    let channel = LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio16)?;
    let link = WifiLink::new(peripherals.modem, sysloop, nvs, &config.network)?;
    let indicator_led = GpioLed::new(PinDriver::output(peripherals.pins.gpio22.downgrade_output())?);
    let network_led = GpioLed::new(PinDriver::output(peripherals.pins.gpio23.downgrade_output())?);
    let local = wildcard(config.network.receiver);

    #[cfg(feature = "http")]
    let listener = doorbell_core::protocol::RequestListener::new(
        doorbell_core::net::TcpRequestServer::bind(local)?,
        &config,
    );
    #[cfg(not(feature = "http"))]
    let listener = doorbell_core::protocol::DatagramListener::new(
        doorbell_core::net::UdpTransport::bind(local)?,
        &config,
    );

    let mut node = ReceiverNode::new(
        config,
        ReceiverPeripherals {
            buzzer: LedcBuzzer::new(timer, channel),
            indicator_led,
            network_led,
            listener,
            link,
        },
    )
    .map_err(|err| BoardError::Startup(err.to_string()))?;
    info!("listening for {} rings", config.transport);

    loop {
        let tick = node.tick(now());
        log_events(&tick);
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
