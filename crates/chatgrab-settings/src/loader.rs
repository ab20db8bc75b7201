//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ChatgrabSettings::default()`]
//! 2. If `~/.chatgrab/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::ChatgrabSettings;

/// Allowed range for the poll interval, in milliseconds.
pub const POLL_INTERVAL_RANGE_MS: (u64, u64) = (100, 3_600_000);

/// Allowed range for UI element wait timeouts, in milliseconds.
pub const WAIT_TIMEOUT_RANGE_MS: (u64, u64) = (100, 600_000);

/// Resolve the chatgrab home directory (`~/.chatgrab`).
pub fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".chatgrab")
}

/// Resolve the path to the settings file (`~/.chatgrab/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ChatgrabSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<ChatgrabSettings> {
    let defaults = serde_json::to_value(ChatgrabSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ChatgrabSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate_settings(&settings)?;
    Ok(settings)
}

/// Reject settings values no source is allowed to produce.
///
/// The env var readers already enforce these ranges, but file values arrive
/// through the deep merge unchecked, and callers may mutate settings after
/// loading (CLI flags). Every interval ends up in `tokio::time::interval`
/// or a wait deadline, where zero is not a usable value.
pub fn validate_settings(settings: &ChatgrabSettings) -> Result<()> {
    let (min, max) = POLL_INTERVAL_RANGE_MS;
    if !(min..=max).contains(&settings.monitor.poll_interval_ms) {
        return Err(SettingsError::InvalidValue(format!(
            "monitor.pollIntervalMs must be in {min}..={max}, got {}",
            settings.monitor.poll_interval_ms
        )));
    }
    let (min, max) = WAIT_TIMEOUT_RANGE_MS;
    if !(min..=max).contains(&settings.monitor.wait_timeout_ms) {
        return Err(SettingsError::InvalidValue(format!(
            "monitor.waitTimeoutMs must be in {min}..={max}, got {}",
            settings.monitor.wait_timeout_ms
        )));
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Each env var has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are silently ignored (fall back to file/default)
pub fn apply_env_overrides(settings: &mut ChatgrabSettings) {
    // ── Monitor settings ─────────────────────────────────────────────
    if let Some(v) = read_env_string("CHATGRAB_CONVERSATION") {
        settings.monitor.conversation = v;
    }
    if let Some(v) = read_env_string("CHATGRAB_SENDER_FILTER") {
        settings.monitor.sender_filter = Some(v);
    }
    if let Some(v) = read_env_string("CHATGRAB_STORAGE_DIR") {
        settings.monitor.storage_dir = v;
    }
    if let Some(v) = read_env_u64(
        "CHATGRAB_POLL_INTERVAL_MS",
        POLL_INTERVAL_RANGE_MS.0,
        POLL_INTERVAL_RANGE_MS.1,
    ) {
        settings.monitor.poll_interval_ms = v;
    }
    if let Some(v) = read_env_u64(
        "CHATGRAB_WAIT_TIMEOUT_MS",
        WAIT_TIMEOUT_RANGE_MS.0,
        WAIT_TIMEOUT_RANGE_MS.1,
    ) {
        settings.monitor.wait_timeout_ms = v;
    }

    // ── Browser settings ─────────────────────────────────────────────
    if let Some(v) = read_env_string("CHATGRAB_APP_URL") {
        settings.browser.app_url = v;
    }
    if let Some(v) = read_env_string("CHATGRAB_PROFILE_DIR") {
        settings.browser.profile_dir = v;
    }
    if let Some(v) = read_env_string("CHROME_PATH") {
        settings.browser.chrome_path = Some(v);
    }
    if let Some(v) = read_env_bool("CHATGRAB_HEADED") {
        settings.browser.headed = v;
    }

    // ── Upload settings ──────────────────────────────────────────────
    if let Some(v) = read_env_bool("CHATGRAB_UPLOAD_ENABLED") {
        settings.upload.enabled = v;
    }
    if let Some(v) = read_env_string("CHATGRAB_UPLOAD_ENDPOINT") {
        settings.upload.endpoint = Some(v);
    }

    // ── Logging settings ─────────────────────────────────────────────
    if let Some(v) = read_env_string("CHATGRAB_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| parse_bool(&v))
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_u64_range(&v, min, max))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
