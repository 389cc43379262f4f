//! The logic driver: address arbitration for local drivers, liveness tracking
//! for remote drivers, control packet dispatch, and the pairing filter.
//!
//! State lives in [`LogicDriver`]; the time-driven half is in [`tick`] and the
//! inbound half in [`dispatch`]. Both operate on the protocol slot table and
//! run to completion on the host's single cooperative thread.

pub(crate) mod dispatch;
pub(crate) mod tick;

use crate::frame::{Codec, ControlPacket};
use crate::logging::{my_error, my_warn};
use crate::protocol::DriverSlot;
use crate::types::{CONTROL_ADDRESS, MAX_FILTERS, MAX_PAYLOAD_SIZE};
use crate::SerialBus;
use core::ops::BitOr;

/// Lifecycle bits of the logic driver itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags(pub u8);

impl StatusFlags {
    /// The logic driver processes inbound control frames.
    pub const RUNNING: Self = Self(0x01);
    /// The periodic callback is armed.
    pub const SYSTEM_TICK: Self = Self(0x02);

    /// Checks if all of the specified flags are set.
    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Inserts the specified flags.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Removes the specified flags.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for StatusFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// State of the singleton arbitration driver: its status bits and the table
/// of addresses filtered because they are paired with a third party.
pub struct LogicDriver {
    status: StatusFlags,
    address_filters: [u8; MAX_FILTERS],
}

impl LogicDriver {
    pub(crate) fn new() -> Self {
        Self {
            status: StatusFlags::default(),
            address_filters: [0; MAX_FILTERS],
        }
    }

    /// Arms the periodic callback and inbound dispatch.
    pub fn start(&mut self) {
        self.status
            .insert(StatusFlags::RUNNING | StatusFlags::SYSTEM_TICK);
    }

    /// Suspends all timer-driven work and inbound dispatch. In-flight
    /// handling completes; nothing further mutates slot state.
    pub fn stop(&mut self) {
        self.status
            .remove(StatusFlags::RUNNING | StatusFlags::SYSTEM_TICK);
    }

    pub fn is_running(&self) -> bool {
        self.status.contains(StatusFlags::RUNNING)
    }

    /// Whether the given address is currently filtered. Address 0 is never
    /// filtered; it is the control address.
    pub(crate) fn filtered(&self, address: u8) -> bool {
        if address == 0 {
            return false;
        }
        self.address_filters.iter().any(|&entry| entry == address)
    }

    /// Inserts an address into the first empty filter slot. The filter is
    /// best effort; when the table is full the entry is dropped.
    pub(crate) fn insert_filter(&mut self, address: u8) {
        for entry in self.address_filters.iter_mut() {
            if *entry == 0 {
                *entry = address;
                return;
            }
        }
        my_warn!("[logic] filter table full, dropping address {}", address);
    }

    /// Removes every filter entry matching the given address.
    pub(crate) fn remove_filter(&mut self, address: u8) {
        for entry in self.address_filters.iter_mut() {
            if *entry == address {
                *entry = 0;
            }
        }
    }
}

/// Serializes a control packet and transmits it on the control address.
/// Transport failures are absorbed; the protocol is lossy by design.
pub(crate) fn send_control<B: SerialBus>(bus: &mut B, cp: &ControlPacket) {
    let mut buffer = [0u8; MAX_PAYLOAD_SIZE];
    match cp.serialize(&mut buffer) {
        Ok(len) => {
            if let Err(e) = bus.send(&buffer[..len], CONTROL_ADDRESS) {
                my_warn!("[logic] control packet send failed: {}", e);
            }
        }
        Err(e) => my_error!("[logic] control packet not serializable: {}", e),
    }
}

/// Builds and transmits the control packet describing one slot's device
/// record, giving the endpoint a chance to append its private payload.
pub(crate) fn queue_control_packet<B: SerialBus>(slot: &mut DriverSlot, bus: &mut B) {
    let DriverSlot {
        record,
        driver_class,
        endpoint,
    } = slot;

    let mut cp = ControlPacket::from_record(record, *driver_class);
    endpoint.fill_control_packet(record, &mut cp);
    send_control(bus, &cp);
}
