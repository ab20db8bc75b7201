//! # chatgrab-settings
//!
//! Configuration management with layered sources for chatgrab.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`ChatgrabSettings::default()`]
//! 2. **User file** — `~/.chatgrab/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `CHATGRAB_*` overrides (highest priority)
//!
//! CLI flags (handled in the binary) override all of the above.
//!
//! # Usage
//!
//! ```no_run
//! use chatgrab_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("polling every {}ms", settings.monitor.poll_interval_ms);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    POLL_INTERVAL_RANGE_MS, WAIT_TIMEOUT_RANGE_MS, deep_merge, home_dir, load_settings,
    load_settings_from_path, settings_path, validate_settings,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
