//! CDP browser session — thin client over `tokio-tungstenite`.
//!
//! Only implements the CDP commands the monitor actually needs (not the
//! entire protocol): navigation, element waits, typing, clicking, and
//! arbitrary JS evaluation.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::BrowserError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Pending CDP command waiting for response.
type PendingTx = oneshot::Sender<Result<Value, String>>;

/// How the Chrome process is launched.
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    /// Persistent profile directory (`--user-data-dir`). Login state
    /// survives restarts when this points at a durable location.
    pub profile_dir: std::path::PathBuf,
    /// Run with a visible window. Required for interactive QR login.
    pub headed: bool,
    /// Initial window size as `(width, height)`.
    pub window_size: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            profile_dir: std::path::PathBuf::from("profile"),
            headed: true,
            window_size: (1280, 800),
        }
    }
}

/// A single CDP browser session bound to one Chrome process.
pub struct BrowserSession {
    cmd_tx: mpsc::Sender<CdpCommand>,
    current_url: parking_lot::RwLock<Option<String>>,
    chrome_process: Mutex<Option<Child>>,
    _handler: JoinHandle<()>,
}

/// Internal CDP command message.
struct CdpCommand {
    method: String,
    params: Value,
    response_tx: PendingTx,
}

impl BrowserSession {
    /// Launch Chrome with a persistent profile, connect via CDP WebSocket.
    pub async fn launch(
        chrome_path: &Path,
        options: &LaunchOptions,
    ) -> Result<Self, BrowserError> {
        // Find a free port for the DevTools endpoint
        let listener = std::net::TcpListener::bind("127.0.0.1:0").map_err(|e| {
            BrowserError::LaunchFailed {
                context: format!("bind port: {e}"),
            }
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| BrowserError::LaunchFailed {
                context: format!("local_addr: {e}"),
            })?
            .port();
        drop(listener);

        let (width, height) = options.window_size;
        let mut cmd = Command::new(chrome_path);
        let _ = cmd
            .arg(format!("--remote-debugging-port={port}"))
            .arg(format!("--user-data-dir={}", options.profile_dir.display()))
            .arg(format!("--window-size={width},{height}"))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-dev-shm-usage");
        if !options.headed {
            let _ = cmd.arg("--headless=new").arg("--disable-gpu");
        }
        let mut child = cmd
            .arg("about:blank")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed {
                context: e.to_string(),
            })?;

        // Wait for Chrome to start accepting connections
        let ws_url = wait_for_ws_url(port, &mut child).await?;

        // Connect to the page WebSocket
        let (ws, _) = connect_async(&ws_url)
            .await
            .map_err(|e| BrowserError::LaunchFailed {
                context: format!("WebSocket connect: {e}"),
            })?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<CdpCommand>(64);
        let handler = tokio::spawn(cdp_handler_loop(ws, cmd_rx));

        tracing::info!(port, profile = %options.profile_dir.display(), "browser session launched");

        Ok(Self {
            cmd_tx,
            current_url: parking_lot::RwLock::new(None),
            chrome_process: Mutex::new(Some(child)),
            _handler: handler,
        })
    }

    /// Current page URL, if a navigation has completed.
    pub fn current_url(&self) -> Option<String> {
        self.current_url.read().clone()
    }

    // ─── CDP command helper ──────────────────────────────────────────────

    async fn send_cdp(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(CdpCommand {
                method: method.into(),
                params,
                response_tx: tx,
            })
            .await
            .map_err(|_| BrowserError::Cdp("handler closed".into()))?;

        let result = tokio::time::timeout(Duration::from_secs(30), rx)
            .await
            .map_err(|_| BrowserError::Timeout {
                timeout_ms: 30_000,
                context: format!("CDP {method}"),
            })?
            .map_err(|_| BrowserError::Cdp("response dropped".into()))?;

        result.map_err(BrowserError::Cdp)
    }

    // ─── Navigation ──────────────────────────────────────────────────────

    /// Navigate to a URL and wait for the document to finish loading.
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let _ = self
            .send_cdp("Page.navigate", json!({ "url": url }))
            .await
            .map_err(|e| BrowserError::NavigationFailed {
                url: url.into(),
                reason: e.to_string(),
            })?;

        // Poll readyState rather than subscribing to load events — one page,
        // one navigation at a time.
        for _ in 0..100 {
            if let Ok(state) = self.evaluate("document.readyState").await {
                if state.as_str() == Some("complete") {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        *self.current_url.write() = Some(url.to_string());
        Ok(())
    }

    // ─── Interaction ─────────────────────────────────────────────────────

    /// Click an element by CSS selector.
    pub async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.ensure_element_exists(selector).await?;
        let js = format!(
            r"document.querySelector({}).click()",
            serde_json::to_string(selector).unwrap_or_default(),
        );
        let _ = self.evaluate(&js).await?;
        Ok(())
    }

    /// Type text into an element, one key event pair per character.
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        self.ensure_element_exists(selector).await?;
        let focus_js = format!(
            "document.querySelector({}).focus()",
            serde_json::to_string(selector).unwrap_or_default(),
        );
        let _ = self.evaluate(&focus_js).await?;

        for ch in text.chars() {
            let _ = self
                .send_cdp(
                    "Input.dispatchKeyEvent",
                    json!({
                        "type": "keyDown",
                        "text": ch.to_string(),
                        "key": ch.to_string(),
                    }),
                )
                .await?;
            let _ = self
                .send_cdp(
                    "Input.dispatchKeyEvent",
                    json!({
                        "type": "keyUp",
                        "key": ch.to_string(),
                    }),
                )
                .await?;
        }
        Ok(())
    }

    // ─── Observation ─────────────────────────────────────────────────────

    /// Get text content of an element.
    pub async fn get_text(&self, selector: &str) -> Result<String, BrowserError> {
        self.ensure_element_exists(selector).await?;
        let js = format!(
            "document.querySelector({}).innerText || ''",
            serde_json::to_string(selector).unwrap_or_default(),
        );
        let val = self.evaluate(&js).await?;
        Ok(val.as_str().unwrap_or_default().to_string())
    }

    /// Wait for an element to appear, up to `timeout_ms`.
    pub async fn wait_for(&self, selector: &str, timeout_ms: u64) -> Result<(), BrowserError> {
        let js = format!(
            r"new Promise((resolve, reject) => {{
                if (document.querySelector({sel})) return resolve(true);
                const observer = new MutationObserver(() => {{
                    if (document.querySelector({sel})) {{
                        observer.disconnect();
                        resolve(true);
                    }}
                }});
                observer.observe(document.body, {{ childList: true, subtree: true }});
                setTimeout(() => {{ observer.disconnect(); reject(new Error('Timeout')); }}, {t});
            }})",
            sel = serde_json::to_string(selector).unwrap_or_default(),
            t = timeout_ms,
        );
        let _ = tokio::time::timeout(Duration::from_millis(timeout_ms + 1000), self.evaluate(&js))
            .await
            .map_err(|_| BrowserError::Timeout {
                timeout_ms,
                context: format!("waiting for {selector}"),
            })?
            .map_err(|e| BrowserError::Timeout {
                timeout_ms,
                context: e.to_string(),
            })?;
        Ok(())
    }

    /// Evaluate a JS expression in the page, returning its JSON value.
    ///
    /// Promises are awaited; thrown exceptions become [`BrowserError::ActionFailed`].
    pub async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .send_cdp(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        if let Some(exception) = result.get("exceptionDetails") {
            let msg = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("evaluation error");
            return Err(BrowserError::ActionFailed {
                action: "evaluate".into(),
                reason: msg.into(),
            });
        }
        Ok(result["result"]["value"].clone())
    }

    /// Close the browser process.
    pub async fn close(&self) -> Result<(), BrowserError> {
        if let Some(mut child) = self.chrome_process.lock().await.take() {
            let _ = child.kill().await;
            tracing::info!("browser session closed");
        }
        Ok(())
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    async fn ensure_element_exists(&self, selector: &str) -> Result<(), BrowserError> {
        let js = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector).unwrap_or_default(),
        );
        let val = self.evaluate(&js).await?;
        if val.as_bool() != Some(true) {
            return Err(BrowserError::ElementNotFound {
                selector: selector.into(),
            });
        }
        Ok(())
    }
}

/// Wait for Chrome to start, then query the `/json` DevTools endpoint for the
/// page's WebSocket URL.
async fn wait_for_ws_url(port: u16, child: &mut Child) -> Result<String, BrowserError> {
    let url = format!("http://127.0.0.1:{port}/json");

    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Check Chrome hasn't crashed
        if let Some(status) = child.try_wait().map_err(|e| BrowserError::LaunchFailed {
            context: format!("wait: {e}"),
        })? {
            return Err(BrowserError::LaunchFailed {
                context: format!("Chrome exited early with {status}"),
            });
        }

        let Ok(resp) = reqwest::get(&url).await else {
            continue;
        };
        let Ok(pages): Result<Vec<Value>, _> = resp.json().await else {
            continue;
        };
        if let Some(page) = pages.iter().find(|p| p["type"] == "page") {
            if let Some(ws_url) = page["webSocketDebuggerUrl"].as_str() {
                return Ok(ws_url.to_string());
            }
        }
    }

    Err(BrowserError::LaunchFailed {
        context: format!("Chrome did not start within 5 seconds on port {port}"),
    })
}

/// CDP WebSocket handler loop.
///
/// Receives commands from [`BrowserSession`], sends them over WS, and routes
/// responses back by id. CDP events (method field, no id) are ignored — the
/// monitor only issues request/response commands.
async fn cdp_handler_loop(ws: WsStream, mut cmd_rx: mpsc::Receiver<CdpCommand>) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<u64, PendingTx> = HashMap::new();
    let next_id = AtomicU64::new(1);

    loop {
        tokio::select! {
            // Incoming command from BrowserSession
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                let msg = json!({
                    "id": id,
                    "method": cmd.method,
                    "params": cmd.params,
                });
                let _ = pending.insert(id, cmd.response_tx);
                if ws_tx.send(Message::Text(msg.to_string().into())).await.is_err() {
                    break;
                }
            }
            // Incoming message from Chrome
            msg = ws_rx.next() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(val): Result<Value, _> = serde_json::from_str(&text) else {
                    continue;
                };
                if let Some(id) = val.get("id").and_then(Value::as_u64) {
                    if let Some(tx) = pending.remove(&id) {
                        if let Some(err) = val.get("error") {
                            let msg = err["message"].as_str().unwrap_or("CDP error");
                            let _ = tx.send(Err(msg.into()));
                        } else {
                            let _ = tx.send(Ok(val["result"].clone()));
                        }
                    }
                }
            }
        }
    }
}


#[cfg(test)]
#[cfg(feature = "browser-integration")]
mod integration_tests {
    use super::*;
    use crate::chrome;

    async fn launch_test_session() -> (BrowserSession, tempfile::TempDir) {
        let chrome = chrome::find_chrome().expect("Chrome required for integration tests");
        let profile = tempfile::tempdir().unwrap();
        let opts = LaunchOptions {
            profile_dir: profile.path().to_path_buf(),
            headed: false,
            window_size: (1280, 800),
        };
        let session = BrowserSession::launch(&chrome, &opts).await.unwrap();
        (session, profile)
    }

    #[tokio::test]
    async fn session_navigate_updates_url() {
        let (session, _profile) = launch_test_session().await;
        session
            .navigate("data:text/html,<h1>Test</h1>")
            .await
            .unwrap();
        assert!(session.current_url().is_some());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn session_get_text_from_element() {
        let (session, _profile) = launch_test_session().await;
        session
            .navigate(r#"data:text/html,<p id="t">content here</p>"#)
            .await
            .unwrap();
        let text = session.get_text("#t").await.unwrap();
        assert_eq!(text, "content here");
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn session_click_nonexistent_element_returns_error() {
        let (session, _profile) = launch_test_session().await;
        session
            .navigate("data:text/html,<p>nothing</p>")
            .await
            .unwrap();
        let err = session.click("#nonexistent").await;
        assert!(err.is_err());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn session_wait_for_existing_element() {
        let (session, _profile) = launch_test_session().await;
        session
            .navigate("data:text/html,<div id=\"target\">here</div>")
            .await
            .unwrap();
        session.wait_for("#target", 2000).await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn session_wait_for_timeout() {
        let (session, _profile) = launch_test_session().await;
        session
            .navigate("data:text/html,<p>empty</p>")
            .await
            .unwrap();
        let result = session.wait_for("#nonexistent", 500).await;
        assert!(result.is_err());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn session_evaluate_returns_value() {
        let (session, _profile) = launch_test_session().await;
        session
            .navigate("data:text/html,<p>x</p>")
            .await
            .unwrap();
        let val = session.evaluate("1 + 1").await.unwrap();
        assert_eq!(val.as_u64(), Some(2));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn session_evaluate_exception_is_error() {
        let (session, _profile) = launch_test_session().await;
        session
            .navigate("data:text/html,<p>x</p>")
            .await
            .unwrap();
        let err = session.evaluate("throw new Error('boom')").await;
        assert!(err.is_err());
        session.close().await.unwrap();
    }
}
