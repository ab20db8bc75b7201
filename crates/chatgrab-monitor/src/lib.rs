//! Inline-image monitoring for a WhatsApp Web conversation.
//!
//! The crate covers everything between a live browser session and the disk:
//! navigating to a conversation by title, scanning the rendered DOM for
//! inline `data:` images, attributing each to a sender, decoding and
//! persisting them, and optionally handing saved files to an upload sink.
//!
//! The browser dependency is behind the [`ImageSource`] trait so the poll
//! loop and persistence layer are testable without a running Chrome.

#![deny(unsafe_code)]

pub mod errors;
pub mod navigate;
pub mod persist;
pub mod poll;
pub mod selectors;
pub mod source;
pub mod upload;

pub use errors::{MonitorError, UploadError};
pub use navigate::open_conversation;
pub use persist::ImagePersister;
pub use poll::Monitor;
pub use source::{CdpImageSource, ImageCandidate, ImageSource};
pub use upload::{HttpUploadSink, NoopUploadSink, UploadSink};
