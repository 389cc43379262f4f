pub mod codec;
mod control;

pub use codec::{deserialize_frame, Codec, CodecHelpers};
pub use control::{ControlFlags, ControlPacket, CONTROL_HEADER_SIZE};

use crate::types::MAX_PAYLOAD_SIZE;
use crate::PktSerialError;
use alloc::vec::Vec;
use core::fmt;

/// Size of the frame envelope header (address, size).
pub const FRAME_HEADER_SIZE: usize = 2;

/// The bus envelope: a length-prefixed frame addressed to a single driver.
///
/// Control frames are addressed to [`crate::types::CONTROL_ADDRESS`] and carry
/// a serialized [`ControlPacket`] as their data; every other frame is opaque
/// payload for the driver owning the address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePacket {
    pub address: u8,
    pub size: u8,
    pub data: Vec<u8>,
}

impl FramePacket {
    /// Creates a frame for the given destination address.
    pub fn new(address: u8, data: &[u8]) -> Result<Self, PktSerialError> {
        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(PktSerialError::FrameTooLarge);
        }
        Ok(Self {
            address,
            size: data.len() as u8,
            data: data.to_vec(),
        })
    }
}

impl fmt::Display for FramePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame[addr={}, len={}]", self.address, self.size)
    }
}

impl Codec for FramePacket {
    fn serialize(&self, buffer: &mut [u8]) -> Result<usize, PktSerialError> {
        let total = FRAME_HEADER_SIZE + self.data.len();
        if self.data.len() > MAX_PAYLOAD_SIZE {
            return Err(PktSerialError::FrameTooLarge);
        }
        if buffer.len() < total {
            return Err(PktSerialError::BufferTooShort);
        }
        CodecHelpers::serialize_frame_header(self.address, self.size, buffer);
        buffer[FRAME_HEADER_SIZE..total].copy_from_slice(&self.data);
        Ok(total)
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, PktSerialError> {
        let (address, size) = CodecHelpers::deserialize_frame_header(buffer)?;
        let len = size as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(PktSerialError::InvalidFrame);
        }
        // Trailing bytes are tolerated; the transport may pad frames.
        if buffer.len() < FRAME_HEADER_SIZE + len {
            return Err(PktSerialError::InvalidFrame);
        }
        Ok(Self {
            address,
            size,
            data: buffer[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + len].to_vec(),
        })
    }
}
