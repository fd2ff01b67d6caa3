// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging facade shared by the studyfs crates.
//!
//! Usage:
//! - Set STUDYFS_LOG=off (default) - no logs
//! - Set STUDYFS_LOG=error|warn - problems only (skipped outputs, bad cluster sections)
//! - Set STUDYFS_LOG=info - study opening, normalization summaries
//! - Set STUDYFS_LOG=debug - per-node reads, writes and lock traffic

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable selecting the minimum level
pub const LOG_ENV: &str = "STUDYFS_LOG";

static INIT: Once = Once::new();

/// Map a `STUDYFS_LOG` value to a minimum level.
///
/// Returns `Ok(None)` for "off", `Err(())` for values nobody understands.
pub fn parse_level(value: &str) -> Result<Option<emit::Level>, ()> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => Ok(None),
        "debug" => Ok(Some(emit::Level::Debug)),
        "info" => Ok(Some(emit::Level::Info)),
        "warn" => Ok(Some(emit::Level::Warn)),
        "error" => Ok(Some(emit::Level::Error)),
        _ => Err(()),
    }
}

/// Initialize diagnostics from the STUDYFS_LOG environment variable.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let raw = std::env::var(LOG_ENV).unwrap_or_default();
        let (level, unknown) = match parse_level(&raw) {
            Ok(None) => return,
            Ok(Some(level)) => (level, false),
            Err(()) => (emit::Level::Info, true),
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        if unknown {
            emit::warn!("Unknown {var} value {value}, using info", var: LOG_ENV, value: raw);
        }

        // The runtime must outlive every emitting thread.
        std::mem::forget(rt);
    });
}

/// Log basic operations (study opened, matrix normalized, output skipped)
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (node reads, lock acquisition, parse counts)
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems (invalid INI sections, unreadable output metadata)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that abort an operation
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;
