//! Logging setup for the overlay process.
//!
//! `diagnostics_enabled` in settings decides whether debug output (every
//! insert, eviction and bridge event) is shown or only warnings and errors.
//! It can be flipped while running through `POST /diagnostics`.

use log::LevelFilter;
use std::sync::atomic::{AtomicBool, Ordering};

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Initialize env_logger. `RUST_LOG` still narrows individual modules.
/// Call once at startup, then `set_diagnostics_enabled` with the settings value.
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Debug) // Runtime level comes from set_max_level
        .parse_default_env()
        .format_timestamp_millis()
        .format_module_path(true)
        .init();
}

/// When disabled, debug/info logs are silenced
pub fn set_diagnostics_enabled(enabled: bool) {
    DIAGNOSTICS_ENABLED.store(enabled, Ordering::SeqCst);
    log::set_max_level(level_for(enabled));

    if enabled {
        log::info!("[DiagnosticLogger] Diagnostics enabled, showing all logs");
    } else {
        log::warn!("[DiagnosticLogger] Diagnostics disabled, only warnings/errors");
    }
}

pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::SeqCst)
}

fn level_for(diagnostics_enabled: bool) -> LevelFilter {
    if diagnostics_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}
