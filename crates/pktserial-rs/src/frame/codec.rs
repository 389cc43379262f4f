use crate::frame::{FramePacket, FRAME_HEADER_SIZE};
use crate::PktSerialError;
use log::debug;

/// A trait for objects that can be serialized into and deserialized from a byte buffer.
pub trait Codec: Sized {
    /// Serializes the object into the provided buffer and returns the number
    /// of bytes written.
    fn serialize(&self, buffer: &mut [u8]) -> Result<usize, PktSerialError>;

    /// Deserializes an object from the provided buffer.
    fn deserialize(buffer: &[u8]) -> Result<Self, PktSerialError>;
}

/// Contains helper functions for common serialization/deserialization tasks.
pub struct CodecHelpers;
impl CodecHelpers {
    /// Serializes the two-byte frame envelope header (address, size) into the
    /// start of a buffer.
    pub fn serialize_frame_header(address: u8, size: u8, buffer: &mut [u8]) {
        if buffer.len() >= FRAME_HEADER_SIZE {
            buffer[0] = address;
            buffer[1] = size;
        }
    }

    /// Deserializes the frame envelope header from the start of a buffer.
    /// Returns BufferTooShort if the buffer cannot hold it.
    pub fn deserialize_frame_header(buffer: &[u8]) -> Result<(u8, u8), PktSerialError> {
        if buffer.len() < FRAME_HEADER_SIZE {
            return Err(PktSerialError::BufferTooShort);
        }
        Ok((buffer[0], buffer[1]))
    }
}

/// Parses a raw byte buffer as received from the transport and returns the
/// corresponding `FramePacket`.
pub fn deserialize_frame(buffer: &[u8]) -> Result<FramePacket, PktSerialError> {
    let result = FramePacket::deserialize(buffer);

    if let Ok(frame) = &result {
        debug!("Successfully deserialized frame: {}", frame);
    }

    result
}
