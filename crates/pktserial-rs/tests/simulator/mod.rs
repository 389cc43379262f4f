// crates/pktserial-rs/tests/simulator/mod.rs
#![allow(dead_code)]

use pktserial_rs::driver::{DeviceRecord, Driver};
use pktserial_rs::frame::{Codec, ControlPacket, FramePacket};
use pktserial_rs::types::{CONTROL_ADDRESS, MAX_PAYLOAD_SIZE};
use pktserial_rs::{DriverClass, Entropy, PktSerialError, Protocol, SerialBus, SerialNumber};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Initialises test logging once; `RUST_LOG=trace` shows the full exchange.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
}

/// A virtual single-wire broadcast medium that manages per-node delivery.
pub struct VirtualBus {
    running: bool,
    /// Pending frames per node. A sender never hears its own transmission.
    inboxes: Vec<VecDeque<Vec<u8>>>,
    /// Trace of all frames sent on the medium (for assertions).
    pub history: Vec<Vec<u8>>,
}

impl VirtualBus {
    pub fn new(nodes: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            running: true,
            inboxes: vec![VecDeque::new(); nodes],
            history: Vec::new(),
        }))
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn broadcast(&mut self, source: Option<usize>, envelope: Vec<u8>) {
        self.history.push(envelope.clone());
        for (node, inbox) in self.inboxes.iter_mut().enumerate() {
            if Some(node) != source {
                inbox.push_back(envelope.clone());
            }
        }
    }

    /// Injects a control packet as if sent by a device outside the simulated
    /// nodes.
    pub fn inject_control(&mut self, cp: &ControlPacket) {
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];
        let len = cp.serialize(&mut payload).unwrap();
        let frame = FramePacket::new(CONTROL_ADDRESS, &payload[..len]).unwrap();

        let mut envelope = vec![0u8; MAX_PAYLOAD_SIZE + 2];
        let len = frame.serialize(&mut envelope).unwrap();
        envelope.truncate(len);
        self.broadcast(None, envelope);
    }

    /// Every control packet observed on the medium, in transmission order.
    pub fn control_history(&self) -> Vec<ControlPacket> {
        self.history
            .iter()
            .filter(|envelope| envelope.first() == Some(&CONTROL_ADDRESS))
            .map(|envelope| {
                let frame = FramePacket::deserialize(envelope).unwrap();
                ControlPacket::deserialize(&frame.data).unwrap()
            })
            .collect()
    }
}

/// One node's attachment to the virtual bus.
pub struct BusPort {
    bus: Rc<RefCell<VirtualBus>>,
    node: usize,
}

impl SerialBus for BusPort {
    fn is_running(&self) -> bool {
        self.bus.borrow().running
    }

    fn send(&mut self, payload: &[u8], address: u8) -> Result<(), PktSerialError> {
        let mut bus = self.bus.borrow_mut();
        if !bus.running {
            return Err(PktSerialError::BusClosed);
        }

        let mut envelope = Vec::with_capacity(payload.len() + 2);
        envelope.push(address);
        envelope.push(payload.len() as u8);
        envelope.extend_from_slice(payload);
        bus.broadcast(Some(self.node), envelope);
        Ok(())
    }
}

/// Deterministic entropy: an optional scripted prefix, then an LCG stream.
pub struct ScriptedEntropy {
    script: VecDeque<u32>,
    state: u32,
}

impl ScriptedEntropy {
    pub fn seeded(seed: u32) -> Self {
        Self {
            script: VecDeque::new(),
            state: seed,
        }
    }

    pub fn with_script(seed: u32, script: &[u32]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            state: seed,
        }
    }
}

impl Entropy for ScriptedEntropy {
    fn random_u32(&mut self, bound: u32) -> u32 {
        if let Some(value) = self.script.pop_front() {
            return value % bound;
        }
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        (self.state >> 16) % bound
    }
}

/// Everything a probe endpoint observed.
#[derive(Default)]
pub struct ProbeState {
    pub connected: Vec<DeviceRecord>,
    pub removed: u32,
    pub control_packets: u32,
    pub frames: Vec<Vec<u8>>,
}

/// Driver endpoint recording every callback, for assertions.
pub struct Probe {
    state: Rc<RefCell<ProbeState>>,
}

impl Probe {
    pub fn new() -> (Box<dyn Driver>, Rc<RefCell<ProbeState>>) {
        let state = Rc::new(RefCell::new(ProbeState::default()));
        (
            Box::new(Self {
                state: state.clone(),
            }),
            state,
        )
    }
}

impl Driver for Probe {
    fn handle_control_packet(&mut self, _record: &DeviceRecord, _cp: &ControlPacket) {
        self.state.borrow_mut().control_packets += 1;
    }

    fn handle_packet(&mut self, _record: &DeviceRecord, packet: &FramePacket) {
        self.state.borrow_mut().frames.push(packet.data.clone());
    }

    fn device_connected(&mut self, record: &DeviceRecord) {
        self.state.borrow_mut().connected.push(*record);
    }

    fn device_removed(&mut self) {
        self.state.borrow_mut().removed += 1;
    }
}

/// Wraps one protocol instance and its bus attachment for the test harness.
pub struct NodeHarness {
    pub protocol: Protocol<BusPort, ScriptedEntropy>,
    bus: Rc<RefCell<VirtualBus>>,
    node: usize,
}

impl NodeHarness {
    pub fn new(
        bus: &Rc<RefCell<VirtualBus>>,
        node: usize,
        serial: SerialNumber,
        entropy: ScriptedEntropy,
    ) -> Self {
        let port = BusPort {
            bus: bus.clone(),
            node,
        };
        let mut protocol = Protocol::new(port, entropy, serial);
        protocol.start();
        Self {
            protocol,
            bus: bus.clone(),
            node,
        }
    }

    /// Registers a probe for a device attached to this node.
    pub fn add_local(
        &mut self,
        serial: SerialNumber,
        class: DriverClass,
    ) -> (usize, Rc<RefCell<ProbeState>>) {
        let (endpoint, state) = Probe::new();
        let slot = self
            .protocol
            .register(DeviceRecord::new_local(serial), class, endpoint)
            .unwrap();
        (slot, state)
    }

    /// Registers a probe slot awaiting a peer of the given class.
    pub fn add_remote(
        &mut self,
        serial: SerialNumber,
        class: DriverClass,
    ) -> (usize, Rc<RefCell<ProbeState>>) {
        let (endpoint, state) = Probe::new();
        let slot = self
            .protocol
            .register(DeviceRecord::new_remote(serial), class, endpoint)
            .unwrap();
        (slot, state)
    }

    /// Delivers every pending inbound frame to the protocol.
    pub fn drain(&mut self) {
        loop {
            let frame = self.bus.borrow_mut().inboxes[self.node].pop_front();
            match frame {
                Some(frame) => self.protocol.process_raw_frame(&frame),
                None => break,
            }
        }
    }

    /// One scheduler round: deliver pending frames, then run the tick.
    pub fn step(&mut self) {
        self.drain();
        self.protocol.periodic_callback();
    }
}
