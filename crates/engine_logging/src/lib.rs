#![deny(missing_docs)]
//! Shared logging utilities for the pagewatch workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message is
//! tagged with the poll tick that produced it, so interleaved output from
//! concurrent fetches can be attributed to a single scheduler pass.

use std::sync::atomic::{AtomicU64, Ordering};

#[doc(hidden)]
pub use log;

/// Poll tick currently being processed. 0 means no tick has started yet.
static POLL_TICK: AtomicU64 = AtomicU64::new(0);

/// Publishes the tick number of the scheduler pass that is now running.
///
/// The scheduler runs on a multi-threaded runtime, so the value is process-wide
/// rather than thread-local.
pub fn set_poll_tick(tick: u64) {
    POLL_TICK.store(tick, Ordering::Relaxed);
}

/// Returns the tick number last published with [`set_poll_tick`].
pub fn poll_tick() -> u64 {
    POLL_TICK.load(Ordering::Relaxed)
}

/// Logs a trace-level message tagged with the current poll tick.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("[tick {}] {}", $crate::poll_tick(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current poll tick.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("[tick {}] {}", $crate::poll_tick(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current poll tick.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("[tick {}] {}", $crate::poll_tick(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current poll tick.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("[tick {}] {}", $crate::poll_tick(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current poll tick.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("[tick {}] {}", $crate::poll_tick(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::{poll_tick, set_poll_tick};

    #[test]
    fn tick_is_published_process_wide() {
        set_poll_tick(7);
        let seen = std::thread::spawn(poll_tick).join().unwrap();
        assert_eq!(seen, 7);
    }
}
