#![cfg_attr(not(feature = "std"), no_std)]

// 'alloc' is used for dynamic allocation (e.g., Vec<u8> payloads and boxed endpoints)
extern crate alloc;

// --- Foundation Modules ---
pub mod hal;
pub mod types;
pub(crate) mod logging;

// --- Wire Records ---
pub mod frame;

// --- Bus Logic Layer ---
pub mod driver;
pub mod logic;
pub mod protocol;

// --- Concrete Services ---
pub mod services;

#[cfg(test)]
pub(crate) mod test_util;

// Export core types and the transport abstraction
pub use driver::{DeviceFlags, DeviceRecord, Driver};
pub use hal::{Entropy, PktSerialError, SerialBus};
pub use protocol::Protocol;
pub use types::{DriverClass, SerialNumber};
