//! Bridges host events onto the serial bus.
//!
//! Events registered through [`MessageBusHandle::listen`] are serialized for
//! transmission when they occur locally, and inbound event frames are handed
//! back to the host. An event delivered from the bus is suppressed from
//! re-transmission so two bridged nodes do not echo each other's events
//! forever.

use crate::driver::{DeviceRecord, Driver};
use crate::frame::{Codec, FramePacket};
use crate::logging::my_debug;
use crate::types::DriverClass;
use crate::PktSerialError;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

/// Driver class announced by message bus services.
pub const MESSAGE_BUS_CLASS: DriverClass = 0x4d42_5553;

/// Wildcard matching any event id.
pub const ID_ANY: u16 = 0xFFFF;
/// Wildcard matching any event value.
pub const VALUE_ANY: u16 = 0xFFFF;

/// Size of an event on the wire.
pub const EVENT_SIZE: usize = 8;

/// One host event, as carried over the bus.
///
/// Wire layout (little-endian): id (2), value (2), timestamp (4). The
/// timestamp is in the emitting node's local tick domain and is informational
/// only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusEvent {
    pub id: u16,
    pub value: u16,
    pub timestamp: u32,
}

impl Codec for BusEvent {
    fn serialize(&self, buffer: &mut [u8]) -> Result<usize, PktSerialError> {
        if buffer.len() < EVENT_SIZE {
            return Err(PktSerialError::BufferTooShort);
        }
        buffer[0..2].copy_from_slice(&self.id.to_le_bytes());
        buffer[2..4].copy_from_slice(&self.value.to_le_bytes());
        buffer[4..8].copy_from_slice(&self.timestamp.to_le_bytes());
        Ok(EVENT_SIZE)
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, PktSerialError> {
        if buffer.len() < EVENT_SIZE {
            return Err(PktSerialError::BufferTooShort);
        }
        Ok(Self {
            id: u16::from_le_bytes(buffer[0..2].try_into()?),
            value: u16::from_le_bytes(buffer[2..4].try_into()?),
            timestamp: u32::from_le_bytes(buffer[4..8].try_into()?),
        })
    }
}

struct Inner {
    listeners: Vec<(u16, u16)>,
    received: VecDeque<BusEvent>,
    suppress_forwarding: bool,
}

impl Inner {
    fn matches(&self, event: &BusEvent) -> bool {
        self.listeners.iter().any(|&(id, value)| {
            (id == ID_ANY || id == event.id) && (value == VALUE_ANY || value == event.value)
        })
    }
}

/// The driver endpoint half of the bridge. Register it in a protocol slot;
/// keep a [`MessageBusHandle`] for the host side.
pub struct MessageBusService {
    inner: Rc<RefCell<Inner>>,
}

impl MessageBusService {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                listeners: Vec::new(),
                received: VecDeque::new(),
                suppress_forwarding: false,
            })),
        }
    }

    /// The host-side handle. Clones share state with the endpoint.
    pub fn handle(&self) -> MessageBusHandle {
        MessageBusHandle {
            inner: self.inner.clone(),
        }
    }
}

impl Default for MessageBusService {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MessageBusService {
    fn handle_packet(&mut self, _record: &DeviceRecord, packet: &FramePacket) {
        match BusEvent::deserialize(&packet.data) {
            Ok(event) => self.inner.borrow_mut().received.push_back(event),
            Err(e) => my_debug!("[message-bus] dropping malformed event frame: {}", e),
        }
    }
}

/// Host-side access to a registered [`MessageBusService`].
#[derive(Clone)]
pub struct MessageBusHandle {
    inner: Rc<RefCell<Inner>>,
}

impl MessageBusHandle {
    /// Associates the given event with the serial channel. Once registered,
    /// matching events passed to [`Self::event_occurred`] produce a payload
    /// for retransmission on the bus. `ID_ANY` and `VALUE_ANY` act as
    /// wildcards.
    pub fn listen(&self, id: u16, value: u16) {
        let mut inner = self.inner.borrow_mut();
        if !inner.listeners.contains(&(id, value)) {
            inner.listeners.push((id, value));
        }
    }

    /// Disassociates the given event from the serial channel.
    pub fn ignore(&self, id: u16, value: u16) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|&entry| entry != (id, value));
    }

    /// Called by the host whenever a local event fires. Returns the wire
    /// payload to send from this service's slot, or `None` when the event is
    /// not registered or arrived from the bus in the first place.
    pub fn event_occurred(&self, event: &BusEvent) -> Option<[u8; EVENT_SIZE]> {
        let inner = self.inner.borrow();
        if inner.suppress_forwarding || !inner.matches(event) {
            return None;
        }

        let mut buffer = [0u8; EVENT_SIZE];
        match event.serialize(&mut buffer) {
            Ok(_) => Some(buffer),
            Err(_) => None,
        }
    }

    /// Drains events received from the bus, delivering each to the callback.
    /// Forwarding is suppressed for the duration so delivered events fired
    /// back into the host event loop are not echoed onto the bus.
    pub fn dispatch<F: FnMut(&BusEvent)>(&self, mut deliver: F) {
        loop {
            let event = {
                let mut inner = self.inner.borrow_mut();
                inner.suppress_forwarding = true;
                inner.received.pop_front()
            };
            match event {
                Some(event) => deliver(&event),
                None => break,
            }
        }
        self.inner.borrow_mut().suppress_forwarding = false;
    }
}
