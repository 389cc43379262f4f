// crates/pktserial-rs/src/logic/dispatch.rs
//! Inbound half of the logic driver: control packet dispatch, conflict
//! handling, pairing filter maintenance, and remote association.

use super::{send_control, LogicDriver};
use crate::driver::{DeviceFlags, DeviceRecord};
use crate::frame::{Codec, ControlFlags, ControlPacket, FramePacket};
use crate::logging::{my_debug, my_trace, LogContext};
use crate::protocol::DriverSlot;
use crate::types::DRIVER_SLOTS;
use crate::SerialBus;

/// Given a control frame, finds the associated driver, or if no driver is
/// associated yet, associates a remote device with one.
pub(crate) fn process_control_frame<B: SerialBus>(
    logic: &mut LogicDriver,
    slots: &mut [Option<DriverSlot>; DRIVER_SLOTS],
    bus: &mut B,
    packet: &FramePacket,
) {
    if !logic.is_running() {
        return;
    }

    let cp = match ControlPacket::deserialize(&packet.data) {
        Ok(cp) => cp,
        Err(e) => {
            my_debug!("[logic] dropping malformed control packet: {}", e);
            return;
        }
    };

    my_trace!(
        "[logic] control packet rx: address={}, serial={:#010x}, class={:#010x}",
        cp.address,
        cp.serial,
        cp.driver_class
    );

    // First check for any driver already holding this address.
    for index in 0..DRIVER_SLOTS {
        let Some(slot) = slots[index].as_mut() else {
            continue;
        };
        if slot.record.address != cp.address {
            continue;
        }

        let DriverSlot {
            record, endpoint, ..
        } = slot;

        if record.flags.contains(DeviceFlags::INITIALISING) {
            // Our candidate is contested, either by an explicit conflict
            // response or by another device announcing the same address.
            // A new address will be picked on the next tick.
            if cp.flags.contains(ControlFlags::CONFLICT) || record.serial != cp.serial {
                my_debug!(
                    "[logic] candidate {} contested, slot {} backs off",
                    cp.address,
                    index
                );
                record.flags.remove(DeviceFlags::INITIALISING);
                record.rolling_counter = 0;
                return;
            }
        } else if record.serial != cp.serial {
            // Another device claims an address we own: respond with the
            // packet echoed back, conflict-flagged, before returning.
            my_debug!("[logic] conflict on owned address {}", cp.address);
            let mut conflict = cp.clone();
            conflict.flags.insert(ControlFlags::CONFLICT);
            send_control(bus, &conflict);
            return;
        }

        // Flag as seen so the liveness window does not disconnect the device,
        // then let the driver look at the packet (pairing and the like).
        record.flags.insert(DeviceFlags::CP_SEEN);
        endpoint.handle_control_packet(record, &cp);
        return;
    }

    let filtered = logic.filtered(cp.address);

    // A device paired with some other peer is not ours to associate; remember
    // its address so later packets are ignored outright.
    if cp.flags.contains(ControlFlags::PAIRED) && !filtered {
        my_debug!("[logic] filtering paired address {}", cp.address);
        logic.insert_filter(cp.address);
        return;
    }

    if filtered {
        if cp.flags.contains(ControlFlags::BROADCAST) {
            // The pairing was dissolved; the address is fair game again.
            my_debug!("[logic] unfiltering address {}", cp.address);
            logic.remove_filter(cp.address);
            // Drop through to association.
        } else {
            return;
        }
    }

    // No associated device: find a remote-capable slot of the right class.
    for index in 0..DRIVER_SLOTS {
        let Some(slot) = slots[index].as_mut() else {
            continue;
        };
        let DriverSlot {
            record,
            driver_class,
            endpoint,
        } = slot;

        if !record.flags.contains(DeviceFlags::REMOTE)
            || record.flags.contains(DeviceFlags::INITIALISED)
        {
            continue;
        }
        if *driver_class != cp.driver_class {
            continue;
        }
        // This slot may be waiting for one specific device.
        if record.serial > 0 && record.serial != cp.serial {
            continue;
        }

        let mut flags = DeviceFlags::REMOTE | DeviceFlags::INITIALISED;
        if cp.flags.contains(ControlFlags::PAIRED) {
            flags.insert(DeviceFlags::PAIRED);
        }
        if cp.flags.contains(ControlFlags::BROADCAST) {
            flags.insert(DeviceFlags::BROADCAST);
        }

        *record = DeviceRecord {
            address: cp.address,
            serial: cp.serial,
            flags,
            rolling_counter: 0,
        };
        my_debug!(
            LogContext {
                component: "logic",
                address: cp.address,
                serial: cp.serial,
            },
            "associated with remote slot {}",
            index
        );
        endpoint.device_connected(record);
        return;
    }

    // No owner and no candidate slot: drop the packet.
    my_trace!("[logic] no slot for control packet from {}", cp.address);
}
