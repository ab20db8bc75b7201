//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial `settings.json` is valid — missing fields get their compiled
//! default during deserialization.

use serde::{Deserialize, Serialize};

/// Root settings type for chatgrab.
///
/// Loaded from `~/.chatgrab/settings.json` with defaults applied for missing
/// fields. Environment variables (`CHATGRAB_*`) can override specific values,
/// and CLI flags override everything.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatgrabSettings {
    /// Settings schema version.
    pub version: String,
    /// Monitoring behaviour (conversation, filter, storage, cadence).
    pub monitor: MonitorSettings,
    /// Browser lifecycle settings.
    pub browser: BrowserSettings,
    /// Upload hook settings.
    pub upload: UploadSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for ChatgrabSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            monitor: MonitorSettings::default(),
            browser: BrowserSettings::default(),
            upload: UploadSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// What to watch and where to put it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    /// Display name of the conversation or group to monitor.
    ///
    /// Matched exactly against the conversation title — a name that is a
    /// prefix of another conversation will not match it.
    pub conversation: String,
    /// Only capture images attributed to this sender display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_filter: Option<String>,
    /// Directory saved images are written to (relative to the working dir).
    pub storage_dir: String,
    /// Delay between DOM polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Upper bound for UI element waits (search box, conversation entry).
    pub wait_timeout_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            conversation: String::new(),
            sender_filter: None,
            storage_dir: "downloaded_images".to_string(),
            poll_interval_ms: 5_000,
            wait_timeout_ms: 20_000,
        }
    }
}

/// Browser lifecycle settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserSettings {
    /// URL of the web application.
    pub app_url: String,
    /// Chrome profile directory name (resolved under `~/.chatgrab`).
    ///
    /// A durable profile keeps the login session across runs so the QR scan
    /// is only needed once.
    pub profile_dir: String,
    /// Explicit Chrome binary path. When `None`, discovery runs
    /// (`CHROME_PATH` env var, then known install locations).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,
    /// Run Chrome with a visible window. The QR code login requires one.
    pub headed: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            app_url: "https://web.whatsapp.com".to_string(),
            profile_dir: "profile".to_string(),
            chrome_path: None,
            headed: true,
        }
    }
}

/// Upload hook settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadSettings {
    /// Whether saved files are forwarded to external storage.
    pub enabled: bool,
    /// Base URL files are PUT to (`<endpoint>/<filename>`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum log level (`trace`/`debug`/`info`/`warn`/`error`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let s = ChatgrabSettings::default();
        assert_eq!(s.version, "0.1.0");
        assert!(s.monitor.conversation.is_empty());
        assert!(s.monitor.sender_filter.is_none());
        assert_eq!(s.monitor.storage_dir, "downloaded_images");
        assert_eq!(s.monitor.poll_interval_ms, 5_000);
        assert_eq!(s.monitor.wait_timeout_ms, 20_000);
        assert_eq!(s.browser.app_url, "https://web.whatsapp.com");
        assert!(s.browser.headed);
        assert!(!s.upload.enabled);
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: ChatgrabSettings =
            serde_json::from_str(r#"{"monitor": {"conversation": "Family"}}"#).unwrap();
        assert_eq!(s.monitor.conversation, "Family");
        assert_eq!(s.monitor.poll_interval_ms, 5_000);
        assert_eq!(s.browser.app_url, "https://web.whatsapp.com");
    }

    #[test]
    fn camel_case_wire_format() {
        let s = ChatgrabSettings::default();
        let json = serde_json::to_value(&s).unwrap();
        assert!(json["monitor"]["pollIntervalMs"].is_number());
        assert!(json["monitor"]["storageDir"].is_string());
        assert!(json["browser"]["appUrl"].is_string());
    }

    #[test]
    fn none_sender_filter_omitted_from_json() {
        let s = ChatgrabSettings::default();
        let json = serde_json::to_value(&s).unwrap();
        assert!(json["monitor"].get("senderFilter").is_none());
    }

    #[test]
    fn round_trip_preserves_values() {
        let mut s = ChatgrabSettings::default();
        s.monitor.conversation = "Ops Channel".to_string();
        s.monitor.sender_filter = Some("Alice".to_string());
        s.upload.enabled = true;
        s.upload.endpoint = Some("https://store.example.com/images".to_string());

        let json = serde_json::to_string(&s).unwrap();
        let back: ChatgrabSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.monitor.conversation, "Ops Channel");
        assert_eq!(back.monitor.sender_filter.as_deref(), Some("Alice"));
        assert!(back.upload.enabled);
    }
}
