//! Image discovery as a capability trait.
//!
//! The poll/persist logic depends on [`ImageSource`] rather than a live
//! browser, so it can be tested against a fake source. The CDP-backed
//! implementation discovers candidates with a single page-side evaluation
//! that returns plain strings — no element handles survive past the call, so
//! nothing can go stale between discovery and persistence.

use std::sync::Arc;

use async_trait::async_trait;
use chatgrab_browser::BrowserSession;
use serde_json::Value;
use tracing::debug;

use crate::errors::MonitorError;
use crate::selectors;

/// One inline image discovered during a poll cycle.
///
/// Ephemeral: re-discovered from scratch every cycle, never persisted as an
/// entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageCandidate {
    /// The full `data:image/...;base64,...` source attribute.
    pub data_uri: String,
    /// Sender display name, when the enclosing incoming-message container
    /// and its sender element were found. `None` means "sender unknown".
    pub sender: Option<String>,
}

/// Produces the pending image candidates for the current DOM snapshot.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// All inline images currently visible, with best-effort sender metadata.
    async fn pending_images(&self) -> Result<Vec<ImageCandidate>, MonitorError>;
}

/// CDP-backed image source reading the open conversation's DOM.
pub struct CdpImageSource {
    session: Arc<BrowserSession>,
}

impl CdpImageSource {
    /// Wrap a browser session with an open conversation.
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }

    /// Page-side discovery script.
    ///
    /// Walks from each inline image up to the nearest incoming-message
    /// container and reads the sender text. Traversal failure yields a null
    /// sender, not an error.
    fn discovery_script() -> String {
        format!(
            r"Array.from(document.querySelectorAll({img})).map((img) => {{
                const container = img.closest({container});
                const name = container ? container.querySelector({sender}) : null;
                return {{ src: img.getAttribute('src'), sender: name ? name.innerText : null }};
            }})",
            img = serde_json::to_string(selectors::INLINE_IMAGE).unwrap_or_default(),
            container = serde_json::to_string(selectors::INCOMING_MESSAGE).unwrap_or_default(),
            sender = serde_json::to_string(selectors::SENDER_TEXT).unwrap_or_default(),
        )
    }
}

#[async_trait]
impl ImageSource for CdpImageSource {
    async fn pending_images(&self) -> Result<Vec<ImageCandidate>, MonitorError> {
        let value = self.session.evaluate(&Self::discovery_script()).await?;
        Ok(parse_candidates(&value))
    }
}

/// Convert the evaluation result into candidates.
///
/// A non-array result (page still rendering) is treated as an empty snapshot.
fn parse_candidates(value: &Value) -> Vec<ImageCandidate> {
    let Some(items) = value.as_array() else {
        debug!("discovery returned non-array, treating as empty snapshot");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let data_uri = item["src"].as_str()?.to_string();
            let sender = item["sender"].as_str().map(String::from);
            Some(ImageCandidate { data_uri, sender })
        })
        .collect()
}
