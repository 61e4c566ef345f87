//! Shared diagnostics for the nestfs workspace.
//!
//! Thin wrappers around `emit` so every crate logs the same way without
//! carrying its own setup code.
//!
//! Levels are selected with the NESTFS_LOG environment variable:
//! off (default), error, warn, info, debug.

use std::sync::Once;

// Re-export emit so the macros can refer to it from other crates.
pub use emit;

static INIT: Once = Once::new();

/// Initialize diagnostics from the NESTFS_LOG environment variable.
///
/// Call once at startup. Repeated calls are ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let level = std::env::var("NESTFS_LOG").unwrap_or_else(|_| "off".to_string());

        let min = match level.as_str() {
            "off" => return,
            "debug" => emit::Level::Debug,
            "info" => emit::Level::Info,
            "warn" => emit::Level::Warn,
            "error" => emit::Level::Error,
            other => {
                eprintln!("Warning: unknown NESTFS_LOG value '{}', using 'info'", other);
                emit::Level::Info
            }
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(min))
            .init();

        // The emitter must live for the rest of the process.
        std::mem::forget(rt);
    });
}

/// Log normal operations users might want to see (mounts, commits, seeds).
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed internal steps (per-operation traces, cache state).
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable oddities (fallbacks, skipped entries).
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that abort the current operation.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_safe_to_call_multiple_times() {
        init_diagnostics();
        init_diagnostics();
        init_diagnostics();
    }

    #[test]
    fn test_macros_compile() {
        log_info!("info message");
        log_debug!("debug message with {value}", value: 42);
        log_warn!("warn message");
        log_error!("error message");
    }
}
