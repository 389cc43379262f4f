// crates/pktserial-rs/src/logic/tick.rs
//! Time-driven half of the logic driver: rolling counters, remote liveness
//! windows, and local address arbitration.

use super::{queue_control_packet, LogicDriver};
use crate::driver::DeviceFlags;
use crate::logging::{my_debug, my_info, my_trace, LogContext};
use crate::protocol::{DriverSlot, LOGIC_SLOT};
use crate::types::{ADDRESS_ALLOC_TIME, CTRLPACKET_PERIOD, DRIVER_SLOTS, DRIVER_TIMEOUT};
use crate::{Entropy, SerialBus};

/// Advances every occupied slot by one tick.
///
/// Precondition: the logic driver is running and the bus transport is up;
/// otherwise no slot state is touched and the next tick retries.
pub(crate) fn process_tick<B: SerialBus, E: Entropy>(
    logic: &LogicDriver,
    slots: &mut [Option<DriverSlot>; DRIVER_SLOTS],
    bus: &mut B,
    entropy: &mut E,
) {
    if !logic.is_running() {
        return;
    }

    // No sense continuing if there is no bus to transmit on.
    if !bus.is_running() {
        return;
    }

    for index in 0..DRIVER_SLOTS {
        // Ignore the logic driver's own record.
        if index == LOGIC_SLOT {
            continue;
        }

        let flags = {
            let Some(slot) = slots[index].as_mut() else {
                continue;
            };
            // The rolling counter triggers the timer-related events below. It
            // only runs while the driver takes part in arbitration/liveness.
            if slot
                .record
                .flags
                .intersects(DeviceFlags::INITIALISING | DeviceFlags::INITIALISED)
            {
                slot.record.rolling_counter = slot.record.rolling_counter.wrapping_add(1);
            }
            slot.record.flags
        };

        // Remote drivers perform no arbitration, only liveness bookkeeping.
        if flags.contains(DeviceFlags::REMOTE) {
            let Some(slot) = slots[index].as_mut() else {
                continue;
            };
            if slot.record.rolling_counter == DRIVER_TIMEOUT {
                close_liveness_window(slot, index);
                continue;
            }
        }

        if !flags.contains(DeviceFlags::LOCAL) {
            continue;
        }

        if !flags.intersects(DeviceFlags::INITIALISING | DeviceFlags::INITIALISED) {
            begin_arbitration(slots, index, bus, entropy);
        } else if flags.contains(DeviceFlags::INITIALISING) {
            let Some(slot) = slots[index].as_mut() else {
                continue;
            };
            // If no one has complained for the whole silence window, the
            // candidate address is ours.
            if slot.record.rolling_counter == ADDRESS_ALLOC_TIME {
                let DriverSlot {
                    record, endpoint, ..
                } = slot;
                record.flags.remove(DeviceFlags::INITIALISING);
                record.flags.insert(DeviceFlags::INITIALISED);
                record.rolling_counter = 0;
                my_debug!("[logic] slot {} owns address {}", index, record.address);
                endpoint.device_connected(record);
            }
        } else if flags.contains(DeviceFlags::INITIALISED) {
            let Some(slot) = slots[index].as_mut() else {
                continue;
            };
            if slot.record.rolling_counter > 0
                && slot.record.rolling_counter % CTRLPACKET_PERIOD == 0
            {
                queue_control_packet(slot, bus);
            }
        }
    }
}

/// A remote slot's liveness window has elapsed: remove the device if its
/// owner stayed silent, then open the next window.
fn close_liveness_window(slot: &mut DriverSlot, index: usize) {
    let DriverSlot {
        record, endpoint, ..
    } = slot;

    if !record.flags.contains(DeviceFlags::CP_SEEN) {
        my_info!(
            LogContext {
                component: "logic",
                address: record.address,
                serial: record.serial,
            },
            "remote timed out, slot {} dormant",
            index
        );
        endpoint.device_removed();
        // The slot stays registered but reverts to an unbound remote: it can
        // re-associate, and the frozen counter guarantees a single removal.
        record.address = 0;
        record.flags.remove(
            DeviceFlags::INITIALISED
                | DeviceFlags::PAIRED
                | DeviceFlags::BROADCAST,
        );
    }

    record.flags.remove(DeviceFlags::CP_SEEN);
    record.rolling_counter = 0;
}

/// Starts arbitration for an uninitialised local slot: picks a candidate
/// address, announces it, and opens the silence window.
fn begin_arbitration<B: SerialBus, E: Entropy>(
    slots: &mut [Option<DriverSlot>; DRIVER_SLOTS],
    index: usize,
    bus: &mut B,
    entropy: &mut E,
) {
    let candidate = free_address(slots, index, entropy);
    let Some(slot) = slots[index].as_mut() else {
        return;
    };

    slot.record.address = candidate;
    slot.record.flags.insert(DeviceFlags::INITIALISING);
    slot.record.rolling_counter = 0;
    my_debug!("[logic] slot {} announcing candidate {}", index, candidate);
    queue_control_packet(slot, bus);
}

/// Rolls candidate addresses until one is disjoint from every address already
/// initialised in the local table. Remote collisions are not precluded here;
/// resolving those is the on-wire conflict mechanism's job. The logic
/// driver's own record keeps the control address out of the pool.
fn free_address<E: Entropy>(
    slots: &[Option<DriverSlot>; DRIVER_SLOTS],
    own: usize,
    entropy: &mut E,
) -> u8 {
    loop {
        let candidate = entropy.random_u32(256) as u8;
        let taken = slots.iter().enumerate().any(|(other, slot)| {
            other != own
                && slot.as_ref().map_or(false, |slot| {
                    slot.record.flags.contains(DeviceFlags::INITIALISED)
                        && slot.record.address == candidate
                })
        });
        if !taken {
            my_trace!("[logic] candidate address {} is free", candidate);
            return candidate;
        }
    }
}
