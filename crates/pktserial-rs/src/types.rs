// --- Primitive Identifiers ---

/// Identifies the application-level class of a driver. The logic layer treats
/// this as an opaque 32-bit tag; matching classes is how remote slots find
/// their peers.
pub type DriverClass = u32;

/// Globally unique identifier of the physical device behind a driver.
pub type SerialNumber = u32;

// --- Protocol Constants ---

/// Number of slots in the protocol driver table.
pub const DRIVER_SLOTS: usize = 16;

/// Number of entries in the logic driver's address filter table.
pub const MAX_FILTERS: usize = 16;

/// Ticks after which a silent remote driver is declared removed. Must exceed
/// the longest legitimate gap between a peer's control packets; the widest
/// such gap is the silence window plus one emission period, observed between
/// a peer's candidate announcement and its first periodic packet.
pub const DRIVER_TIMEOUT: u8 = 120;

/// Silence window, in ticks, that a local driver waits after announcing a
/// candidate address before declaring it owned. Must exceed the worst-case
/// round trip plus one control packet period.
pub const ADDRESS_ALLOC_TIME: u8 = 64;

/// Emission period, in ticks, for control packets of initialised local drivers.
pub const CTRLPACKET_PERIOD: u8 = 32;

/// Bus address owned by the logic driver. Control packets are always sent to
/// this address; in a device record, 0 also denotes "unassigned".
pub const CONTROL_ADDRESS: u8 = 0;

/// Driver class of the logic driver itself.
pub const LOGIC_DRIVER_CLASS: DriverClass = 0;

/// Maximum payload carried by a single bus frame.
pub const MAX_PAYLOAD_SIZE: usize = 32;

// The rolling counter is a wrapping u8; the comparisons in the periodic
// callback are only sound while every timing constant fits in 7 bits and the
// timeout exceeds the emission period.
const _: () = assert!((DRIVER_TIMEOUT as usize) < 0x80);
const _: () = assert!((ADDRESS_ALLOC_TIME as usize) < 0x80);
const _: () = assert!((CTRLPACKET_PERIOD as usize) < 0x80);
const _: () = assert!(DRIVER_TIMEOUT > CTRLPACKET_PERIOD);
const _: () = assert!(ADDRESS_ALLOC_TIME > CTRLPACKET_PERIOD);
const _: () = assert!(DRIVER_TIMEOUT > ADDRESS_ALLOC_TIME + CTRLPACKET_PERIOD);
