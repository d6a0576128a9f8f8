/// Structured logging macros for laivm
///
/// Thin wrappers over `tracing` that take the message first and `key = value` fields after:
/// - log_info!("Message")
/// - log_debug!("Constant pool full", pool_size = 256, limit = 256)
/// - log_error!("Disassembly failed", error = "unknown opcode", file = "demo.lasm")

/// Log a debug message with optional structured data
#[macro_export]
macro_rules! log_debug {
    ($msg:expr) => {
        tracing::debug!($msg)
    };
    ($msg:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::debug!($($key = $value),+, $msg)
    };
}

/// Log an info message with optional structured data
#[macro_export]
macro_rules! log_info {
    ($msg:expr) => {
        tracing::info!($msg)
    };
    ($msg:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!($($key = $value),+, $msg)
    };
}

/// Log a warning message with optional structured data
#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        tracing::warn!($msg)
    };
    ($msg:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::warn!($($key = $value),+, $msg)
    };
}

/// Log an error message with optional structured data
#[macro_export]
macro_rules! log_error {
    ($msg:expr) => {
        tracing::error!($msg)
    };
    ($msg:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::error!($($key = $value),+, $msg)
    };
}

pub use crate::{log_debug, log_error, log_info, log_warn};
