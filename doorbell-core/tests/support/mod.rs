#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;
use std::time::Duration;

use doorbell_core::config::{NetworkConfig, StaticAddress};
use doorbell_core::hal::{
    ButtonInput, DatagramSocket, DigitalOutput, Level, LinkControl, RequestConnection,
    RequestServer, ToneOutput,
};
use doorbell_core::telemetry::{TelemetryEventKind, TickEvents};
use doorbell_core::time::Millis;

pub const TICK_MS: u64 = 10;

pub fn ms(value: u64) -> Millis {
    Millis::from_millis(value)
}

/// Loopback addressing used by every test network.
pub fn test_network() -> NetworkConfig {
    NetworkConfig {
        ssid: "test",
        password: "",
        sender: SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 4210),
        receiver: SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 3), 4210),
        gateway: Ipv4Addr::new(10, 0, 0, 1),
        subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
        dns: Ipv4Addr::new(10, 0, 0, 1),
    }
}

#[derive(Clone, Default)]
pub struct Button {
    level: Rc<Cell<Option<Level>>>,
}

impl Button {
    pub fn press(&self) {
        self.level.set(Some(Level::Low));
    }

    pub fn release(&self) {
        self.level.set(Some(Level::High));
    }
}

impl ButtonInput for Button {
    fn read(&mut self) -> Level {
        self.level.get().unwrap_or(Level::High)
    }
}

/// LED probe that remembers every level change.
#[derive(Clone, Default)]
pub struct Led {
    state: Rc<RefCell<LedState>>,
}

#[derive(Default)]
struct LedState {
    on: bool,
    changes: Vec<bool>,
}

impl Led {
    pub fn is_on(&self) -> bool {
        self.state.borrow().on
    }

    pub fn changes(&self) -> Vec<bool> {
        self.state.borrow().changes.clone()
    }

    pub fn clear_changes(&self) {
        self.state.borrow_mut().changes.clear();
    }
}

impl DigitalOutput for Led {
    fn set_on(&mut self, on: bool) {
        let mut state = self.state.borrow_mut();
        if state.on != on {
            state.changes.push(on);
        }
        state.on = on;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuzzerCall {
    Play(u32),
    Level(bool),
    Silence,
}

#[derive(Clone, Default)]
pub struct Buzzer {
    calls: Rc<RefCell<Vec<BuzzerCall>>>,
}

impl Buzzer {
    pub fn calls(&self) -> Vec<BuzzerCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl ToneOutput for Buzzer {
    fn play(&mut self, frequency_hz: u32) {
        self.calls.borrow_mut().push(BuzzerCall::Play(frequency_hz));
    }

    fn set_level(&mut self, on: bool) {
        self.calls.borrow_mut().push(BuzzerCall::Level(on));
    }

    fn silence(&mut self) {
        self.calls.borrow_mut().push(BuzzerCall::Silence);
    }
}

/// Radio whose association state the test flips by hand.
#[derive(Clone, Default)]
pub struct Link {
    up: Rc<Cell<bool>>,
    reconnects: Rc<Cell<u32>>,
    applied: Rc<Cell<Option<StaticAddress>>>,
    refuse_static: bool,
}

impl Link {
    pub fn up() -> Self {
        let link = Self::default();
        link.set_up(true);
        link
    }

    pub fn refusing_static_address() -> Self {
        Self {
            refuse_static: true,
            ..Self::default()
        }
    }

    pub fn set_up(&self, up: bool) {
        self.up.set(up);
    }

    pub fn reconnects(&self) -> u32 {
        self.reconnects.get()
    }

    pub fn applied(&self) -> Option<StaticAddress> {
        self.applied.get()
    }
}

impl LinkControl for Link {
    type Error = &'static str;

    fn apply_static_address(&mut self, address: &StaticAddress) -> Result<(), Self::Error> {
        if self.refuse_static {
            return Err("static address rejected");
        }
        self.applied.set(Some(*address));
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.up.get()
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        self.reconnects.set(self.reconnects.get() + 1);
        Ok(())
    }
}

/// In-memory datagram fabric keyed by endpoint.
#[derive(Clone, Default)]
pub struct Network {
    queues: Rc<RefCell<HashMap<SocketAddrV4, VecDeque<Vec<u8>>>>>,
    log: Rc<RefCell<Vec<(SocketAddrV4, Vec<u8>)>>>,
}

impl Network {
    pub fn socket(&self, local: SocketAddrV4) -> Socket {
        self.queues.borrow_mut().entry(local).or_default();
        Socket {
            local,
            network: self.clone(),
            rebinds: Rc::default(),
            failing_rebinds: Rc::default(),
        }
    }

    /// Injects a datagram as if it came from elsewhere.
    pub fn deliver(&self, to: SocketAddrV4, payload: &[u8]) {
        self.queues
            .borrow_mut()
            .entry(to)
            .or_default()
            .push_back(payload.to_vec());
    }

    /// Every datagram sent so far, with its destination.
    pub fn sent(&self) -> Vec<(SocketAddrV4, Vec<u8>)> {
        self.log.borrow().clone()
    }

    pub fn sent_to(&self, to: SocketAddrV4) -> Vec<Vec<u8>> {
        self.log
            .borrow()
            .iter()
            .filter(|(dest, _)| *dest == to)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn pending(&self, at: SocketAddrV4) -> usize {
        self.queues.borrow().get(&at).map_or(0, VecDeque::len)
    }
}

#[derive(Clone)]
pub struct Socket {
    local: SocketAddrV4,
    network: Network,
    rebinds: Rc<Cell<u32>>,
    failing_rebinds: Rc<Cell<u32>>,
}

impl Socket {
    /// Re-bind attempts so far, failed ones included.
    pub fn rebinds(&self) -> u32 {
        self.rebinds.get()
    }

    /// Makes the next `count` re-binds fail, as if the port were still taken.
    pub fn fail_next_rebinds(&self, count: u32) {
        self.failing_rebinds.set(count);
    }
}

impl DatagramSocket for Socket {
    type Error = &'static str;

    fn send_to(&mut self, payload: &[u8], peer: SocketAddrV4) -> Result<(), Self::Error> {
        self.network.log.borrow_mut().push((peer, payload.to_vec()));
        self.network.deliver(peer, payload);
        Ok(())
    }

    fn try_recv(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Self::Error> {
        let mut queues = self.network.queues.borrow_mut();
        let Some(payload) = queues.get_mut(&self.local).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        let len = payload.len().min(buffer.len());
        buffer[..len].copy_from_slice(&payload[..len]);
        Ok(Some(len))
    }

    fn rebind(&mut self) -> Result<(), Self::Error> {
        self.rebinds.set(self.rebinds.get() + 1);
        let failing = self.failing_rebinds.get();
        if failing > 0 {
            self.failing_rebinds.set(failing - 1);
            return Err("address in use");
        }
        Ok(())
    }
}

/// Request server fed from a script of client request lines.
///
/// Clones share one script, so a test keeps a handle after moving the server
/// into a listener.
#[derive(Clone, Default)]
pub struct RequestScript {
    clients: Rc<RefCell<VecDeque<Option<Vec<u8>>>>>,
    responses: Rc<RefCell<Vec<Vec<u8>>>>,
    lingers: Rc<RefCell<Vec<Duration>>>,
}

impl RequestScript {
    /// Queues a client that sends `line`.
    pub fn connect(&self, line: &[u8]) {
        self.clients.borrow_mut().push_back(Some(line.to_vec()));
    }

    /// Queues a client that never sends a request line.
    pub fn connect_silent(&self) {
        self.clients.borrow_mut().push_back(None);
    }

    /// Bytes written to each closed connection, in order.
    pub fn responses(&self) -> Vec<Vec<u8>> {
        self.responses.borrow().clone()
    }

    pub fn lingers(&self) -> Vec<Duration> {
        self.lingers.borrow().clone()
    }

    pub fn waiting(&self) -> usize {
        self.clients.borrow().len()
    }
}

impl RequestServer for RequestScript {
    type Connection = ScriptedClient;
    type Error = &'static str;

    fn try_accept(&mut self) -> Result<Option<ScriptedClient>, Self::Error> {
        Ok(self
            .clients
            .borrow_mut()
            .pop_front()
            .map(|line| ScriptedClient {
                line,
                written: Vec::new(),
                script: self.clone(),
            }))
    }

    fn rebind(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct ScriptedClient {
    line: Option<Vec<u8>>,
    written: Vec<u8>,
    script: RequestScript,
}

impl RequestConnection for ScriptedClient {
    type Error = &'static str;

    fn read_line(&mut self, buffer: &mut [u8], _timeout: Duration) -> Result<usize, Self::Error> {
        let Some(line) = &self.line else {
            return Ok(0);
        };
        let len = line.len().min(buffer.len());
        buffer[..len].copy_from_slice(&line[..len]);
        Ok(len)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn close(self, linger: Duration) {
        self.script.responses.borrow_mut().push(self.written);
        self.script.lingers.borrow_mut().push(linger);
    }
}

/// Collects every event of a run together with its tick time.
#[derive(Default)]
pub struct EventLog {
    entries: Vec<(u64, TelemetryEventKind)>,
}

impl EventLog {
    pub fn extend(&mut self, tick: &TickEvents<Millis>) {
        let at = tick.now().as_millis();
        self.entries.extend(tick.iter().map(|event| (at, *event)));
    }

    pub fn times_of(&self, event: &TelemetryEventKind) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|(_, logged)| logged == event)
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&TelemetryEventKind) -> bool) -> usize {
        self.entries.iter().filter(|(_, event)| predicate(event)).count()
    }

    pub fn contains(&self, event: &TelemetryEventKind) -> bool {
        self.entries.iter().any(|(_, logged)| logged == event)
    }
}
