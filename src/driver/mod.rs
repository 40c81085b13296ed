//! Browser driver abstraction.
//!
//! The engine never talks to a browser engine directly; it goes through the
//! [`PageHandle`] / [`BrowserHandle`] traits. The Chromium adapter lives in
//! [`chromium`], and [`scripted`] provides a deterministic in-memory driver
//! for tests and embedding.
//!
//! Error taxonomy matters here: selector/evaluation failures are *expected*
//! and non-fatal (the engine skips and moves on), while a lost context is
//! unrecoverable at this layer and propagates to the caller.

pub mod chromium;
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the browser driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A script or selector failed to evaluate. Non-fatal: treated as "no
    /// result" by the engine.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// A driver round-trip exceeded its budget. Non-fatal.
    #[error("{op} timed out after {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: u64 },

    /// The browser context died. Fatal: the caller must recreate the context
    /// before retrying; this layer does not retry the browser.
    #[error("browser context lost: {0}")]
    ContextLost(String),
}

impl DriverError {
    /// Whether this error should abort the whole discovery run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::ContextLost(_))
    }
}

/// A viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ViewportSize {
    fn default() -> Self {
        // A mid-size laptop viewport; callers that care pass their own.
        ViewportSize::new(1366, 900)
    }
}

/// A browser engine that can open isolated page contexts.
///
/// Used by the viewport manager to spawn a desktop-sized context when the
/// caller's page is too narrow to render mega-menus.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// Open a new isolated page at `url` with the given viewport and,
    /// optionally, a user-agent override.
    async fn new_page(
        &self,
        url: &str,
        viewport: ViewportSize,
        user_agent: Option<&str>,
        timeout_ms: u64,
    ) -> Result<Box<dyn PageHandle>, DriverError>;
}

/// One already-navigated browser page.
///
/// DOM evaluations are opaque, atomic round-trips: the engine submits a
/// serializable script and receives structured JSON back. There is no shared
/// memory with the page.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Current page URL.
    async fn url(&self) -> Result<String, DriverError>;

    /// Evaluate a script in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// Full page HTML, for parse-without-round-trips strategies.
    async fn html(&self) -> Result<String, DriverError>;

    /// Current viewport size.
    async fn viewport(&self) -> Result<ViewportSize, DriverError>;

    /// Resize the viewport (mobile fallback path).
    async fn set_viewport(&self, size: ViewportSize) -> Result<(), DriverError>;

    /// Move the pointer to absolute page coordinates.
    async fn move_mouse(&self, x: f64, y: f64) -> Result<(), DriverError>;

    /// Move the pointer onto the first element matching `selector`.
    async fn hover(&self, selector: &str) -> Result<(), DriverError>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Scroll the page by the given deltas.
    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), DriverError>;

    /// Close this page/context. Must be called on spawned desktop contexts
    /// on every exit path.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(DriverError::ContextLost("gone".into()).is_fatal());
        assert!(!DriverError::Evaluation("bad selector".into()).is_fatal());
        assert!(!DriverError::Timeout { op: "evaluate", timeout_ms: 5000 }.is_fatal());
    }

    #[test]
    fn test_viewport_serde() {
        let v = ViewportSize::new(1920, 1080);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"width":1920,"height":1080}"#);
    }
}
