//! Conversation navigation.
//!
//! Finds a conversation by display name via the search box and activates it.
//! A timeout here is fatal by design: the binary does not catch it, because
//! without the right conversation open there is nothing to monitor.

use chatgrab_browser::BrowserSession;
use tracing::info;

use crate::errors::MonitorError;
use crate::selectors;

/// Search for a conversation by exact display name and open it.
///
/// Waits up to `timeout_ms` for the search box, types the name, then waits
/// up to the same bound for a conversation entry whose title equals the name
/// exactly, and clicks it.
pub async fn open_conversation(
    session: &BrowserSession,
    name: &str,
    timeout_ms: u64,
) -> Result<(), MonitorError> {
    validate_name(name)?;

    session.wait_for(selectors::SEARCH_BOX, timeout_ms).await?;
    session.click(selectors::SEARCH_BOX).await?;
    session.type_text(selectors::SEARCH_BOX, name).await?;

    let entry = selectors::conversation_entry(name);
    session.wait_for(&entry, timeout_ms).await?;
    session.click(&entry).await?;

    info!(conversation = name, "conversation opened");
    Ok(())
}

/// Reject empty or whitespace-only conversation names before touching the UI.
fn validate_name(name: &str) -> Result<(), MonitorError> {
    if name.trim().is_empty() {
        return Err(MonitorError::InvalidTarget(
            "conversation name is empty".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Driving open_conversation against a live page is covered by the
    // browser-integration tests; validation runs before any session call.

    #[test]
    fn empty_name_is_invalid() {
        assert!(matches!(
            validate_name(""),
            Err(MonitorError::InvalidTarget(_))
        ));
    }

    #[test]
    fn whitespace_name_is_invalid() {
        assert!(matches!(
            validate_name("   "),
            Err(MonitorError::InvalidTarget(_))
        ));
    }

    #[test]
    fn normal_name_is_valid() {
        assert!(validate_name("EEE 355 Courseware Chatroom").is_ok());
    }
}
