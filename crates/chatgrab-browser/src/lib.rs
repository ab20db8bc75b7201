//! # chatgrab-browser
//!
//! Chrome lifecycle and CDP session driving for chatgrab.
//!
//! This crate provides:
//! - Chrome binary discovery (macOS and Linux install paths, `CHROME_PATH`)
//! - A single-page CDP session over `tokio-tungstenite` with a persistent
//!   profile directory, so WhatsApp Web login state survives restarts
//! - The handful of operations the monitor needs: navigate, wait for a
//!   selector, click, type, read text, evaluate JS

#![deny(unsafe_code)]

pub mod chrome;
pub mod error;
pub mod session;

pub use error::BrowserError;
pub use session::{BrowserSession, LaunchOptions};
