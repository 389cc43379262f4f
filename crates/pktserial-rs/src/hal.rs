// crates/pktserial-rs/src/hal.rs
use core::array::TryFromSliceError;
use core::fmt;

/// Defines a portable, descriptive error type for the bus logic layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PktSerialError {
    /// The provided buffer is too small for the operation.
    BufferTooShort,
    /// A received frame is fundamentally invalid (e.g., inconsistent length).
    InvalidFrame,
    /// The payload exceeds the maximum frame size of the bus.
    FrameTooLarge,
    /// Every slot in the driver table is occupied.
    SlotTableFull,
    /// The referenced slot is empty, or its driver has not completed
    /// address arbitration yet.
    DriverNotReady,
    /// The bus transport is not running.
    BusClosed,
    /// An underlying I/O error occurred.
    IoError,
}

impl fmt::Display for PktSerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooShort => write!(f, "Buffer is too short"),
            Self::InvalidFrame => write!(f, "Invalid bus frame"),
            Self::FrameTooLarge => write!(f, "Payload exceeds maximum frame size"),
            Self::SlotTableFull => write!(f, "Driver slot table is full"),
            Self::DriverNotReady => write!(f, "Driver slot is empty or not yet initialised"),
            Self::BusClosed => write!(f, "Bus transport is not running"),
            Self::IoError => write!(f, "Underlying I/O error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PktSerialError {}

impl From<TryFromSliceError> for PktSerialError {
    fn from(_: TryFromSliceError) -> Self {
        PktSerialError::BufferTooShort
    }
}

/// Hardware abstraction for the single-wire broadcast transport.
///
/// The transport owns byte framing and integrity checking; this layer hands it
/// a payload and a destination address and receives already-framed packets
/// back through [`crate::protocol::Protocol::process_raw_frame`].
pub trait SerialBus {
    /// Returns whether the transport is currently able to exchange frames.
    /// The logic layer tolerates `false` on any tick and resumes cleanly.
    fn is_running(&self) -> bool;

    /// Queues a payload for transmission to the given bus address.
    fn send(&mut self, payload: &[u8], address: u8) -> Result<(), PktSerialError>;
}

/// Source of randomness for address arbitration.
///
/// Does not need to be cryptographically strong; it only has to make
/// simultaneous candidate collisions unlikely.
pub trait Entropy {
    /// Returns a uniformly distributed value in `[0, bound)`.
    fn random_u32(&mut self, bound: u32) -> u32;
}
