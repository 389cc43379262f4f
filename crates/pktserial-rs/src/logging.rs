use alloc::format;
use alloc::string::String;

/// Trait for structs that provide metadata for logging
pub trait LogMetadata {
    fn meta(&self) -> String;
}

/// Context of a single driver slot, for log lines that concern one device.
pub struct LogContext {
    pub component: &'static str,
    pub address: u8,
    pub serial: u32,
}

impl LogMetadata for LogContext {
    fn meta(&self) -> String {
        format!(
            "component={}, address={}, serial={:#010x}",
            self.component, self.address, self.serial
        )
    }
}

/// Level-parameterized logging macro behind the per-level aliases below.
///
/// The two-argument form forwards straight to the facade; the three-argument
/// form prefixes the message with the metadata of a [`LogContext`] (or any
/// other [`LogMetadata`] value). The plain form is listed first: a context is
/// never a bare literal, so a literal in second position always means "no
/// context".
macro_rules! my_log {
    ($level:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        log::log!($level, $fmt $(, $($arg)+)?);
    }};
    ($level:expr, $ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::logging::LogMetadata::meta(&$ctx);
        log::log!($level, concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

macro_rules! my_info {
    ($($args:tt)+) => { $crate::logging::my_log!(log::Level::Info, $($args)+) };
}

macro_rules! my_warn {
    ($($args:tt)+) => { $crate::logging::my_log!(log::Level::Warn, $($args)+) };
}

macro_rules! my_error {
    ($($args:tt)+) => { $crate::logging::my_log!(log::Level::Error, $($args)+) };
}

macro_rules! my_debug {
    ($($args:tt)+) => { $crate::logging::my_log!(log::Level::Debug, $($args)+) };
}

macro_rules! my_trace {
    ($($args:tt)+) => { $crate::logging::my_log!(log::Level::Trace, $($args)+) };
}

// Re-export macros for use in other files
pub(crate) use my_debug;
pub(crate) use my_error;
pub(crate) use my_info;
pub(crate) use my_log;
pub(crate) use my_trace;
pub(crate) use my_warn;
