use crate::frame::{ControlPacket, FramePacket};
use crate::types::SerialNumber;
use core::ops::BitOr;

/// State bits of a device record, maintained by the logic layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceFlags(pub u8);

impl DeviceFlags {
    // --- Flag Constants ---
    /// The driver represents a device attached to this node.
    pub const LOCAL: Self = Self(0x01);
    /// The driver represents a peer elsewhere on the bus.
    pub const REMOTE: Self = Self(0x02);
    /// A candidate address has been announced and the silence window is open.
    pub const INITIALISING: Self = Self(0x04);
    /// The address is owned (local) or the peer is considered connected (remote).
    pub const INITIALISED: Self = Self(0x08);
    /// A control packet from the address owner arrived in the current
    /// liveness window.
    pub const CP_SEEN: Self = Self(0x10);
    /// The device is paired with a specific peer.
    pub const PAIRED: Self = Self(0x20);
    /// The device accepts unpaired communication.
    pub const BROADCAST: Self = Self(0x40);

    // --- Methods ---

    /// Checks if all of the specified flags are set.
    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Checks if any of the specified flags is set.
    pub fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Returns an empty set of flags.
    pub fn empty() -> Self {
        Self(0)
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

impl BitOr for DeviceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Per-driver device state.
///
/// Records are owned by the protocol slot table; endpoints observe them
/// through shared references passed into [`Driver`] callbacks, while the logic
/// layer advances flags and the rolling counter directly. The counter is only
/// advanced while the driver is initialising or initialised, and resets to 0
/// on every state transition the protocol observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Assigned bus address; 0 means unassigned.
    pub address: u8,
    /// Globally unique identifier of the physical device. For a remote slot,
    /// 0 requests association with any device of the right class.
    pub serial: SerialNumber,
    pub flags: DeviceFlags,
    /// Advanced once per periodic tick; wrapping. All compared constants fit
    /// in 7 bits.
    pub rolling_counter: u8,
}

impl DeviceRecord {
    /// A record for a device attached to this node. The address is assigned
    /// by arbitration once the protocol is running.
    pub fn new_local(serial: SerialNumber) -> Self {
        Self {
            address: 0,
            serial,
            flags: DeviceFlags::LOCAL,
            rolling_counter: 0,
        }
    }

    /// A record for a peer expected to appear on the bus. Pass `serial = 0`
    /// to accept any device of the matching class.
    pub fn new_remote(serial: SerialNumber) -> Self {
        Self {
            address: 0,
            serial,
            flags: DeviceFlags::REMOTE,
            rolling_counter: 0,
        }
    }
}

/// A driver endpoint: the per-device half of a protocol slot.
///
/// All methods default to no-ops so endpoints only implement the events they
/// care about. Implementations must not block; both callbacks run to
/// completion inside the tick or inbound-frame handler.
pub trait Driver {
    /// Called when a control packet from this driver's address owner arrives.
    fn handle_control_packet(&mut self, _record: &DeviceRecord, _cp: &ControlPacket) {}

    /// Called for non-control frames addressed to this driver.
    fn handle_packet(&mut self, _record: &DeviceRecord, _packet: &FramePacket) {}

    /// Invoked while the logic layer builds this driver's control packet,
    /// to append a driver-private payload. Local drivers only.
    fn fill_control_packet(&mut self, _record: &DeviceRecord, _cp: &mut ControlPacket) {}

    /// Called once when a remote driver is first associated, or when a local
    /// driver completes address arbitration.
    fn device_connected(&mut self, _record: &DeviceRecord) {}

    /// Called when liveness lapses for a remote driver.
    fn device_removed(&mut self) {}
}
