//! WhatsApp Web DOM selectors.
//!
//! These match the live DOM structure of web.whatsapp.com and form a fragile
//! contract: an upstream UI change breaks matching silently, with no
//! compatibility version to check against. Keeping every selector in one
//! place is the only mitigation we have.

/// The search input textbox in the chat list pane.
pub const SEARCH_BOX: &str = "div[title='Search input textbox']";

/// Container marking a received (incoming) message.
///
/// Outgoing messages use a different class, so self-sent images are
/// structurally never matched.
pub const INCOMING_MESSAGE: &str = "div.message-in";

/// The element inside a message container holding the sender display name.
pub const SENDER_TEXT: &str = "span.selectable-text";

/// Inline images rendered from a data URI.
pub const INLINE_IMAGE: &str = "img[src^='data:image']";

/// Build the selector for a conversation entry with an exact title.
///
/// The title is JSON-encoded to produce a valid double-quoted CSS attribute
/// value, so names containing quotes or backslashes stay intact. Matching is
/// exact: a name that is a prefix of another conversation will not match it.
pub fn conversation_entry(name: &str) -> String {
    format!(
        "span[title={}]",
        serde_json::to_string(name).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_entry_quotes_name() {
        assert_eq!(conversation_entry("Family"), r#"span[title="Family"]"#);
    }

    #[test]
    fn conversation_entry_escapes_quotes() {
        let sel = conversation_entry(r#"The "A" Team"#);
        assert_eq!(sel, r#"span[title="The \"A\" Team"]"#);
    }

    #[test]
    fn inline_image_matches_data_prefix_only() {
        assert!(INLINE_IMAGE.contains("^='data:image'"));
    }
}
