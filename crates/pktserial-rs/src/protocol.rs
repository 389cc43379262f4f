use crate::driver::{DeviceFlags, DeviceRecord, Driver};
use crate::frame::{deserialize_frame, FramePacket};
use crate::logic::{self, LogicDriver};
use crate::types::{DriverClass, SerialNumber, CONTROL_ADDRESS, DRIVER_SLOTS, LOGIC_DRIVER_CLASS, MAX_PAYLOAD_SIZE};
use crate::{Entropy, PktSerialError, SerialBus};
use alloc::boxed::Box;
use log::{debug, info, trace};

/// Slot index reserved for the logic driver's own record. It is created at
/// construction and skipped during peer iteration.
pub(crate) const LOGIC_SLOT: usize = 0;

/// One occupied entry of the protocol driver table. The record is owned here;
/// the endpoint receives shared views of it through [`Driver`] callbacks.
pub(crate) struct DriverSlot {
    pub(crate) record: DeviceRecord,
    pub(crate) driver_class: DriverClass,
    pub(crate) endpoint: Box<dyn Driver>,
}

/// Endpoint half of the logic driver's own slot. Control packets addressed to
/// the logic driver carry no driver-private semantics.
struct LogicEndpoint;

impl Driver for LogicEndpoint {}

/// The protocol container: owns the bus transport, the entropy source, the
/// logic driver, and the fixed table of driver slots.
///
/// The host scheduler drives it from a single logical thread: call
/// [`Protocol::periodic_callback`] once per tick and
/// [`Protocol::process_raw_frame`] for every frame the transport delivers.
pub struct Protocol<B: SerialBus, E: Entropy> {
    bus: B,
    entropy: E,
    logic: LogicDriver,
    slots: [Option<DriverSlot>; DRIVER_SLOTS],
}

impl<B: SerialBus, E: Entropy> Protocol<B, E> {
    /// Creates the protocol container for a node whose own device carries the
    /// given serial number. The logic driver is installed in its reserved
    /// slot, owning the control address without arbitration.
    pub fn new(bus: B, entropy: E, serial: SerialNumber) -> Self {
        let mut slots: [Option<DriverSlot>; DRIVER_SLOTS] = core::array::from_fn(|_| None);

        let record = DeviceRecord {
            address: CONTROL_ADDRESS,
            serial,
            flags: DeviceFlags::LOCAL | DeviceFlags::INITIALISED,
            rolling_counter: 0,
        };
        slots[LOGIC_SLOT] = Some(DriverSlot {
            record,
            driver_class: LOGIC_DRIVER_CLASS,
            endpoint: Box::new(LogicEndpoint),
        });

        Self {
            bus,
            entropy,
            logic: LogicDriver::new(),
            slots,
        }
    }

    /// Arms the periodic callback and inbound dispatch.
    pub fn start(&mut self) {
        info!("Starting bus logic layer");
        self.logic.start();
    }

    /// Suspends timer-driven work and inbound control dispatch.
    pub fn stop(&mut self) {
        info!("Stopping bus logic layer");
        self.logic.stop();
    }

    pub fn is_running(&self) -> bool {
        self.logic.is_running()
    }

    /// Registers a driver in the first empty slot and returns its index.
    ///
    /// A full table is a configuration error surfaced to the caller; it is
    /// fatal to that driver but not to the protocol.
    pub fn register(
        &mut self,
        record: DeviceRecord,
        driver_class: DriverClass,
        endpoint: Box<dyn Driver>,
    ) -> Result<usize, PktSerialError> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                info!(
                    "Registering driver class {:#010x} in slot {}",
                    driver_class, index
                );
                *slot = Some(DriverSlot {
                    record,
                    driver_class,
                    endpoint,
                });
                return Ok(index);
            }
        }
        Err(PktSerialError::SlotTableFull)
    }

    /// Empties a slot and hands the endpoint back to the caller. Drivers must
    /// be deregistered before their owner drops them. The logic driver's own
    /// slot cannot be removed.
    pub fn deregister(&mut self, slot: usize) -> Option<Box<dyn Driver>> {
        if slot == LOGIC_SLOT {
            return None;
        }
        let taken = self.slots.get_mut(slot)?.take()?;
        info!("Deregistered driver from slot {}", slot);
        Some(taken.endpoint)
    }

    /// The device record currently held in a slot.
    pub fn record(&self, slot: usize) -> Option<&DeviceRecord> {
        Some(&self.slots.get(slot)?.as_ref()?.record)
    }

    /// Whether an address is currently suppressed by the pairing filter.
    pub fn is_filtered(&self, address: u8) -> bool {
        self.logic.filtered(address)
    }

    /// Advances the protocol by one tick. Must be called at a regular period
    /// by the host scheduler. A stopped logic driver or a bus that is not
    /// running leaves all slot state untouched.
    pub fn periodic_callback(&mut self) {
        logic::tick::process_tick(
            &self.logic,
            &mut self.slots,
            &mut self.bus,
            &mut self.entropy,
        );
    }

    /// Decodes a raw frame from the transport and routes it. Malformed frames
    /// are dropped; the protocol is lossy by design.
    pub fn process_raw_frame(&mut self, buffer: &[u8]) {
        match deserialize_frame(buffer) {
            Ok(packet) => self.process_frame(&packet),
            Err(e) => debug!("Dropping malformed frame: {}", e),
        }
    }

    /// Routes a decoded frame: control frames to the logic driver, data
    /// frames to the slot owning the destination address.
    pub fn process_frame(&mut self, packet: &FramePacket) {
        if packet.address == CONTROL_ADDRESS {
            logic::dispatch::process_control_frame(
                &mut self.logic,
                &mut self.slots,
                &mut self.bus,
                packet,
            );
            return;
        }

        for slot in self.slots.iter_mut().flatten() {
            if slot.record.address == packet.address
                && slot.record.flags.contains(DeviceFlags::INITIALISED)
            {
                let DriverSlot {
                    record, endpoint, ..
                } = slot;
                endpoint.handle_packet(record, packet);
                return;
            }
        }

        trace!("No driver owns address {}, dropping frame", packet.address);
    }

    /// Transmits a data frame on behalf of a local driver, addressed with the
    /// slot's arbitrated address.
    pub fn send_from(&mut self, slot: usize, payload: &[u8]) -> Result<(), PktSerialError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(PktSerialError::FrameTooLarge);
        }

        let record = self
            .record(slot)
            .ok_or(PktSerialError::DriverNotReady)?;
        if !record
            .flags
            .contains(DeviceFlags::LOCAL | DeviceFlags::INITIALISED)
            || slot == LOGIC_SLOT
        {
            return Err(PktSerialError::DriverNotReady);
        }

        let address = record.address;
        self.bus.send(payload, address)
    }
}
