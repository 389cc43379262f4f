//! Shared fixtures for the unit tests: a recording bus, a scripted entropy
//! source, and a driver endpoint that records every callback.

use crate::driver::{DeviceRecord, Driver};
use crate::frame::{Codec, ControlPacket, FramePacket};
use crate::types::{CONTROL_ADDRESS, MAX_PAYLOAD_SIZE};
use crate::{Entropy, PktSerialError, SerialBus};
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

/// Captures every transmission as an `(address, payload)` pair.
pub(crate) struct MockBus {
    pub(crate) running: bool,
    pub(crate) sent: Vec<(u8, Vec<u8>)>,
}

impl MockBus {
    pub(crate) fn new() -> Self {
        Self {
            running: true,
            sent: Vec::new(),
        }
    }
}

impl SerialBus for MockBus {
    fn is_running(&self) -> bool {
        self.running
    }

    fn send(&mut self, payload: &[u8], address: u8) -> Result<(), PktSerialError> {
        if !self.running {
            return Err(PktSerialError::BusClosed);
        }
        self.sent.push((address, payload.to_vec()));
        Ok(())
    }
}

/// Replays a fixed script of values, then falls back to a deterministic
/// generator so arbitration loops always terminate.
pub(crate) struct SeqEntropy {
    script: VecDeque<u32>,
    state: u32,
}

impl SeqEntropy {
    pub(crate) fn new(script: &[u32]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            state: 0x1b56_c4e9,
        }
    }
}

impl Entropy for SeqEntropy {
    fn random_u32(&mut self, bound: u32) -> u32 {
        if let Some(value) = self.script.pop_front() {
            return value % bound;
        }
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.state >> 16) % bound
    }
}

/// Everything a [`RecordingDriver`] observed.
#[derive(Default)]
pub(crate) struct DriverEvents {
    pub(crate) connected: Vec<DeviceRecord>,
    pub(crate) removed: u32,
    pub(crate) control_packets: u32,
    pub(crate) frames: Vec<Vec<u8>>,
}

/// Driver endpoint recording every callback into shared state.
pub(crate) struct RecordingDriver {
    events: Rc<RefCell<DriverEvents>>,
}

impl RecordingDriver {
    pub(crate) fn new() -> (Box<dyn Driver>, Rc<RefCell<DriverEvents>>) {
        let events = Rc::new(RefCell::new(DriverEvents::default()));
        (
            Box::new(Self {
                events: events.clone(),
            }),
            events,
        )
    }
}

impl Driver for RecordingDriver {
    fn handle_control_packet(&mut self, _record: &DeviceRecord, _cp: &ControlPacket) {
        self.events.borrow_mut().control_packets += 1;
    }

    fn handle_packet(&mut self, _record: &DeviceRecord, packet: &FramePacket) {
        self.events.borrow_mut().frames.push(packet.data.clone());
    }

    fn device_connected(&mut self, record: &DeviceRecord) {
        self.events.borrow_mut().connected.push(*record);
    }

    fn device_removed(&mut self) {
        self.events.borrow_mut().removed += 1;
    }
}

/// Driver endpoint that ignores everything.
pub(crate) struct NullDriver;

impl Driver for NullDriver {}

/// Driver endpoint that appends a fixed private payload to every control
/// packet emitted on its behalf.
pub(crate) struct PayloadDriver {
    pub(crate) payload: Vec<u8>,
}

impl Driver for PayloadDriver {
    fn fill_control_packet(&mut self, _record: &DeviceRecord, cp: &mut ControlPacket) {
        cp.payload.extend_from_slice(&self.payload);
    }
}

/// Wraps a control packet in its bus envelope.
pub(crate) fn control_frame(cp: &ControlPacket) -> FramePacket {
    let mut buffer = [0u8; MAX_PAYLOAD_SIZE];
    let len = cp.serialize(&mut buffer).unwrap();
    FramePacket::new(CONTROL_ADDRESS, &buffer[..len]).unwrap()
}
