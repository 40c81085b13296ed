//! Scripted in-memory driver for deterministic engine tests.
//!
//! Pages are seeded with canned JSON responses keyed by a marker substring of
//! the evaluated script (each embedded JS payload carries a `// navscout:...`
//! marker on its first line, see [`crate::dom::markers`]). Interactions are
//! logged so tests can assert on the exact hover/click choreography, and
//! close calls are counted so leaked desktop contexts are observable.

use super::{BrowserHandle, DriverError, PageHandle, ViewportSize};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    url: Mutex<String>,
    viewport: Mutex<ViewportSize>,
    html: Mutex<String>,
    /// marker substring → queued responses. The last response repeats.
    responses: Mutex<HashMap<String, VecDeque<Value>>>,
    hovers: Mutex<Vec<String>>,
    clicks: Mutex<Vec<String>>,
    mouse_moves: Mutex<Vec<(f64, f64)>>,
    scrolls: Mutex<Vec<(f64, f64)>>,
    viewport_sets: Mutex<Vec<ViewportSize>>,
    close_calls: AtomicUsize,
    fail_all: Mutex<Option<String>>,
}

/// A scripted page. Cheap to clone; clones share state, so tests can keep a
/// handle for assertions after the engine consumed a boxed copy.
#[derive(Clone, Default)]
pub struct ScriptedPage {
    inner: Arc<Inner>,
}

impl ScriptedPage {
    pub fn new(url: &str) -> Self {
        let page = Self::default();
        *page.inner.url.lock().unwrap() = url.to_string();
        page
    }

    pub fn with_viewport(self, size: ViewportSize) -> Self {
        *self.inner.viewport.lock().unwrap() = size;
        self
    }

    pub fn with_html(self, html: &str) -> Self {
        *self.inner.html.lock().unwrap() = html.to_string();
        self
    }

    /// Queue a response for scripts containing `marker`. Responses pop in
    /// order; the last one queued keeps repeating.
    pub fn respond(self, marker: &str, value: Value) -> Self {
        self.push_response(marker, value);
        self
    }

    /// Non-consuming variant of [`Self::respond`] for mid-test setup.
    pub fn push_response(&self, marker: &str, value: Value) {
        self.inner
            .responses
            .lock()
            .unwrap()
            .entry(marker.to_string())
            .or_default()
            .push_back(value);
    }

    /// Make every subsequent driver call fail fatally.
    pub fn poison(&self, message: &str) {
        *self.inner.fail_all.lock().unwrap() = Some(message.to_string());
    }

    pub fn close_count(&self) -> usize {
        self.inner.close_calls.load(Ordering::Relaxed)
    }

    pub fn hovered(&self) -> Vec<String> {
        self.inner.hovers.lock().unwrap().clone()
    }

    pub fn clicked(&self) -> Vec<String> {
        self.inner.clicks.lock().unwrap().clone()
    }

    pub fn mouse_moves(&self) -> Vec<(f64, f64)> {
        self.inner.mouse_moves.lock().unwrap().clone()
    }

    pub fn viewport_sets(&self) -> Vec<ViewportSize> {
        self.inner.viewport_sets.lock().unwrap().clone()
    }

    pub fn current_viewport(&self) -> ViewportSize {
        *self.inner.viewport.lock().unwrap()
    }

    fn check_poisoned(&self) -> Result<(), DriverError> {
        if let Some(msg) = self.inner.fail_all.lock().unwrap().as_ref() {
            return Err(DriverError::ContextLost(msg.clone()));
        }
        Ok(())
    }

    fn take_response(&self, script: &str) -> Value {
        let mut responses = self.inner.responses.lock().unwrap();
        for (marker, queue) in responses.iter_mut() {
            if script.contains(marker.as_str()) {
                if queue.len() > 1 {
                    return queue.pop_front().unwrap_or(Value::Null);
                }
                return queue.front().cloned().unwrap_or(Value::Null);
            }
        }
        Value::Null
    }
}

#[async_trait]
impl PageHandle for ScriptedPage {
    async fn url(&self) -> Result<String, DriverError> {
        self.check_poisoned()?;
        Ok(self.inner.url.lock().unwrap().clone())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        self.check_poisoned()?;
        Ok(self.take_response(script))
    }

    async fn html(&self) -> Result<String, DriverError> {
        self.check_poisoned()?;
        Ok(self.inner.html.lock().unwrap().clone())
    }

    async fn viewport(&self) -> Result<ViewportSize, DriverError> {
        self.check_poisoned()?;
        Ok(*self.inner.viewport.lock().unwrap())
    }

    async fn set_viewport(&self, size: ViewportSize) -> Result<(), DriverError> {
        self.check_poisoned()?;
        *self.inner.viewport.lock().unwrap() = size;
        self.inner.viewport_sets.lock().unwrap().push(size);
        Ok(())
    }

    async fn move_mouse(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.check_poisoned()?;
        self.inner.mouse_moves.lock().unwrap().push((x, y));
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), DriverError> {
        self.check_poisoned()?;
        self.inner.hovers.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.check_poisoned()?;
        self.inner.clicks.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), DriverError> {
        self.check_poisoned()?;
        self.inner.scrolls.lock().unwrap().push((dx, dy));
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.inner.close_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A scripted browser: hands out pre-seeded pages in FIFO order.
#[derive(Default)]
pub struct ScriptedBrowser {
    queued: Mutex<VecDeque<ScriptedPage>>,
    requests: Mutex<Vec<(String, ViewportSize)>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the page the next `new_page` call will return.
    pub fn enqueue(&self, page: ScriptedPage) {
        self.queued.lock().unwrap().push_back(page);
    }

    /// `(url, viewport)` of every `new_page` request, in order.
    pub fn page_requests(&self) -> Vec<(String, ViewportSize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserHandle for ScriptedBrowser {
    async fn new_page(
        &self,
        url: &str,
        viewport: ViewportSize,
        _user_agent: Option<&str>,
        _timeout_ms: u64,
    ) -> Result<Box<dyn PageHandle>, DriverError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), viewport));

        let page = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DriverError::ContextLost("no scripted page queued".into()))?;

        *page.inner.url.lock().unwrap() = url.to_string();
        *page.inner.viewport.lock().unwrap() = viewport;
        Ok(Box::new(page))
    }
}
