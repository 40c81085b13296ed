//! DOM-side extraction payloads and the evaluation helpers around them.
//!
//! Each payload is a single JS function expression embedded at compile time
//! via `include_str!`. The engine submits `(payload)(params)` as one opaque
//! round-trip and receives structured JSON back — no closures, no shared
//! memory with the page. Parameters are injected as a serialized JSON
//! literal, which sidesteps string-escaping issues entirely.
//!
//! Every payload starts with a `// navscout:<name>` marker comment; the
//! scripted test driver keys its canned responses off those markers (see
//! [`markers`]).

use crate::driver::PageHandle;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const HEADER_SCAN_JS: &str = include_str!("js/header_scan.js");
pub const TRIGGER_SCAN_JS: &str = include_str!("js/trigger_scan.js");
pub const PANEL_PROBE_JS: &str = include_str!("js/panel_probe.js");
pub const PANEL_EXTRACT_JS: &str = include_str!("js/panel_extract.js");
pub const NAV_ITEMS_JS: &str = include_str!("js/nav_items.js");
pub const MOBILE_NAV_JS: &str = include_str!("js/mobile_nav.js");
pub const HAMBURGER_SCAN_JS: &str = include_str!("js/hamburger_scan.js");

/// Marker substrings identifying each payload, for the scripted driver.
pub mod markers {
    pub const HEADER_SCAN: &str = "navscout:header_scan";
    pub const TRIGGER_SCAN: &str = "navscout:trigger_scan";
    pub const PANEL_PROBE: &str = "navscout:panel_probe";
    pub const PANEL_EXTRACT: &str = "navscout:panel_extract";
    pub const NAV_ITEMS: &str = "navscout:nav_items";
    pub const MOBILE_NAV: &str = "navscout:mobile_nav";
    pub const HAMBURGER_SCAN: &str = "navscout:hamburger_scan";
}

/// Attribute used to tag nav items so hovers can re-find them cheaply.
pub const MARK_ATTR: &str = "data-navscout-trigger";

/// Build the invocation `(payload)(params)` for a payload function.
pub fn call(payload: &str, params: &Value) -> String {
    format!("({})({})", payload.trim().trim_end_matches(';'), params)
}

/// Evaluate a script with a timeout, mapping non-fatal failures to `None`.
///
/// Selector/evaluation failures and timeouts are expected and simply skip the
/// candidate; only a lost browser context propagates as an error.
pub async fn eval_json(
    page: &dyn PageHandle,
    script: &str,
    timeout_ms: u64,
) -> Result<Option<Value>> {
    let fut = page.evaluate(script);
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(Ok(Value::Null)) => Ok(None),
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(e)) if e.is_fatal() => Err(e.into()),
        Ok(Err(e)) => {
            debug!("evaluation skipped: {e}");
            Ok(None)
        }
        Err(_) => {
            debug!("evaluation timed out after {timeout_ms}ms");
            Ok(None)
        }
    }
}

/// Invoke a payload with params and deserialize the result.
///
/// Shape mismatches are treated like evaluation failures: logged at debug
/// level and reported as `None`.
pub async fn eval_call<T: DeserializeOwned>(
    page: &dyn PageHandle,
    payload: &str,
    params: &Value,
    timeout_ms: u64,
) -> Result<Option<T>> {
    let script = call(payload, params);
    let Some(value) = eval_json(page, &script, timeout_ms).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            debug!("payload result had unexpected shape: {e}");
            Ok(None)
        }
    }
}
