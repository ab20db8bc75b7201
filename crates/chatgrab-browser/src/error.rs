//! Browser-specific error types.

use thiserror::Error;

/// Errors from browser automation operations.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Failed to launch the Chrome browser process.
    #[error("failed to launch browser: {context}")]
    LaunchFailed {
        /// What went wrong during launch.
        context: String,
    },

    /// Navigation to a URL failed.
    #[error("navigation failed for {url}: {reason}")]
    NavigationFailed {
        /// The URL that failed to load.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// A browser action failed.
    #[error("{action} failed: {reason}")]
    ActionFailed {
        /// The action that failed (e.g., "click", "evaluate").
        action: String,
        /// Why it failed.
        reason: String,
    },

    /// Chrome executable not found on the system.
    #[error("Chrome not found — install Google Chrome or set CHROME_PATH")]
    ChromeNotFound,

    /// Element not found on the page.
    #[error("element not found: {selector}")]
    ElementNotFound {
        /// The CSS selector that matched nothing.
        selector: String,
    },

    /// Operation timed out.
    #[error("timed out after {timeout_ms}ms: {context}")]
    Timeout {
        /// How long we waited.
        timeout_ms: u64,
        /// What we were waiting for.
        context: String,
    },

    /// CDP protocol error.
    #[error("CDP error: {0}")]
    Cdp(String),
}
