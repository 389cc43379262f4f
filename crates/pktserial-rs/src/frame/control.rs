// crates/pktserial-rs/src/frame/control.rs

use crate::driver::{DeviceFlags, DeviceRecord};
use crate::frame::codec::Codec;
use crate::types::{DriverClass, SerialNumber, MAX_PAYLOAD_SIZE};
use crate::PktSerialError;
use alloc::vec::Vec;
use core::ops::BitOr;

/// Size of the fixed control packet header. The driver-private payload, if
/// any, follows immediately after.
pub const CONTROL_HEADER_SIZE: usize = 10;

/// Flag bits carried on the wire by a control packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFlags(pub u8);

impl ControlFlags {
    // --- Flag Constants ---
    /// The announced address is already owned by another device.
    pub const CONFLICT: Self = Self(0x01);
    /// The announcing device is paired with a specific peer.
    pub const PAIRED: Self = Self(0x02);
    /// The announcing device accepts unpaired communication again.
    pub const BROADCAST: Self = Self(0x04);

    // --- Methods ---

    /// Creates a new `ControlFlags` struct from a raw u8 value.
    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits)
    }

    /// Checks if all of the specified flags are set.
    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
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

impl BitOr for ControlFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// The protocol metadata record announced periodically by every initialised
/// local driver, and exchanged during address arbitration.
///
/// Wire layout (little-endian, tightly packed):
///
/// | Offset | Size | Field          |
/// |--------|------|----------------|
/// | 0      | 1    | address        |
/// | 1      | 1    | flags          |
/// | 2      | 4    | serial         |
/// | 6      | 4    | driver_class   |
/// | 10     | ...  | opaque payload |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    pub address: u8,
    pub flags: ControlFlags,
    pub serial: SerialNumber,
    pub driver_class: DriverClass,
    pub payload: Vec<u8>,
}

impl ControlPacket {
    /// Builds the control packet describing a driver's device record. Pairing
    /// state is mirrored from the record; the payload starts empty and may be
    /// extended by the driver before transmission.
    pub fn from_record(record: &DeviceRecord, driver_class: DriverClass) -> Self {
        let mut flags = ControlFlags::empty();
        if record.flags.contains(DeviceFlags::PAIRED) {
            flags.insert(ControlFlags::PAIRED);
        }
        if record.flags.contains(DeviceFlags::BROADCAST) {
            flags.insert(ControlFlags::BROADCAST);
        }

        Self {
            address: record.address,
            flags,
            serial: record.serial,
            driver_class,
            payload: Vec::new(),
        }
    }
}

impl Codec for ControlPacket {
    fn serialize(&self, buffer: &mut [u8]) -> Result<usize, PktSerialError> {
        let total = CONTROL_HEADER_SIZE + self.payload.len();
        if total > MAX_PAYLOAD_SIZE {
            return Err(PktSerialError::FrameTooLarge);
        }
        if buffer.len() < total {
            return Err(PktSerialError::BufferTooShort);
        }

        buffer[0] = self.address;
        buffer[1] = self.flags.0;
        buffer[2..6].copy_from_slice(&self.serial.to_le_bytes());
        buffer[6..10].copy_from_slice(&self.driver_class.to_le_bytes());
        buffer[CONTROL_HEADER_SIZE..total].copy_from_slice(&self.payload);

        Ok(total)
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, PktSerialError> {
        if buffer.len() < CONTROL_HEADER_SIZE {
            return Err(PktSerialError::BufferTooShort);
        }

        Ok(Self {
            address: buffer[0],
            flags: ControlFlags::from_bits_truncate(buffer[1]),
            serial: SerialNumber::from_le_bytes(buffer[2..6].try_into()?),
            driver_class: DriverClass::from_le_bytes(buffer[6..10].try_into()?),
            payload: buffer[CONTROL_HEADER_SIZE..].to_vec(),
        })
    }
}
