mod console;
mod keys;
mod session;

use std::env;
use std::io::{self, Write};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::process;

use doorbell_core::config::{
    AckMode, DEFAULT_PORT, NetworkConfig, ReceiverConfig, Role, SenderConfig, Transport,
};
use doorbell_core::time::Clock;
use log::{LevelFilter, info, warn};

use console::{HostClock, KeyButton, LinkSwitch};
use keys::{Command, KEY_HELP, RawMode};
use session::{SenderStation, Station, receiver_station};

const USAGE: &str = "Usage: doorbell-emulator [sender|receiver|demo] [--bind <ip:port>] [--peer <ip:port>] [--http] [--no-ack]";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Sender,
    Receiver,
    Demo,
}

#[derive(Clone, Copy, Debug)]
struct Options {
    mode: Mode,
    bind: Option<SocketAddrV4>,
    peer: Option<SocketAddrV4>,
    transport: Transport,
    ack: AckMode,
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });
    init_logger();

    let network = network_for(&options);
    let sender_config = SenderConfig {
        network,
        ack: options.ack,
        ..SenderConfig::DEFAULT
    };
    let receiver_config = ReceiverConfig {
        network,
        ack: options.ack,
        transport: options.transport,
        ..ReceiverConfig::DEFAULT
    };

    let button = KeyButton::default();
    let sender_link = LinkSwitch::default();
    let receiver_link = LinkSwitch::default();
    let mut stations: Vec<Box<dyn Station>> = Vec::new();
    if options.mode != Mode::Receiver {
        stations.push(Box::new(SenderStation::new(
            sender_config,
            button.clone(),
            sender_link.clone(),
        )?));
    }
    if options.mode != Mode::Sender {
        stations.push(receiver_station(receiver_config, receiver_link.clone())?);
    }

    info!("Doorbell emulator ready ({:?}). {KEY_HELP}", options.mode);

    let raw_mode = match RawMode::enable() {
        Ok(guard) => Some(guard),
        Err(err) => {
            warn!("keyboard unavailable ({err}); running without key controls");
            None
        }
    };

    let clock = HostClock::new();
    loop {
        if raw_mode.is_some() {
            match keys::poll_command()? {
                Some(Command::Quit) => break,
                Some(Command::Press) => {
                    info!("button pressed");
                    button.press();
                }
                Some(Command::ToggleSenderLink) => {
                    info!("sender link {}", if sender_link.toggle() { "cut" } else { "restored" });
                }
                Some(Command::ToggleReceiverLink) => {
                    info!(
                        "receiver link {}",
                        if receiver_link.toggle() { "cut" } else { "restored" }
                    );
                }
                Some(Command::Status) => {
                    for station in &stations {
                        station.report_status();
                    }
                }
                None => {}
            }
        } else {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let now = clock.now();
        for station in &mut stations {
            station.tick(now);
        }
    }

    drop(raw_mode);
    info!("Session closed.");
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            // Raw mode needs explicit carriage returns.
            write!(
                buf,
                "{:<5} {:<8} {}\r\n",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

/// Loopback addressing unless overridden on the command line.
fn network_for(options: &Options) -> NetworkConfig {
    let receiver_default = SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT);
    let sender_default = SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT + 1);
    let (sender, receiver) = match options.mode {
        Mode::Sender => (
            options.bind.unwrap_or(sender_default),
            options.peer.unwrap_or(receiver_default),
        ),
        Mode::Receiver => (
            options.peer.unwrap_or(sender_default),
            options.bind.unwrap_or(receiver_default),
        ),
        Mode::Demo => (sender_default, receiver_default),
    };
    let local = match options.mode {
        Mode::Receiver => receiver,
        Mode::Sender | Mode::Demo => sender,
    };

    NetworkConfig {
        ssid: "emulator",
        password: "",
        sender,
        receiver,
        gateway: *local.ip(),
        // Host routing decides reachability.
        subnet_mask: Ipv4Addr::UNSPECIFIED,
        dns: Ipv4Addr::LOCALHOST,
    }
}

fn parse_options(args: impl IntoIterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        mode: Mode::Demo,
        bind: None,
        peer: None,
        transport: Transport::Datagram,
        ack: AckMode::Enabled,
    };
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "sender" => options.mode = Mode::Sender,
            "receiver" => options.mode = Mode::Receiver,
            "demo" => options.mode = Mode::Demo,
            "--http" => options.transport = Transport::Request,
            "--no-ack" => options.ack = AckMode::Disabled,
            "--bind" => options.bind = Some(parse_endpoint(args.next(), "--bind")?),
            "--peer" => options.peer = Some(parse_endpoint(args.next(), "--peer")?),
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }
    if options.mode == Mode::Demo && (options.bind.is_some() || options.peer.is_some()) {
        return Err("--bind and --peer apply to a single role".to_string());
    }
    if options.mode != Mode::Receiver && options.transport == Transport::Request {
        return Err(format!("--http only applies to the {}", Role::Receiver));
    }
    Ok(options)
}

fn parse_endpoint(value: Option<String>, flag: &str) -> Result<SocketAddrV4, String> {
    let value = value.ok_or_else(|| format!("Expected value after {flag}"))?;
    value
        .parse()
        .map_err(|_| format!("Invalid endpoint `{value}` for {flag}"))
}
