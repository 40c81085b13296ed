//! Per-domain hint caching.
//!
//! A hint records the selectors that worked for a domain so the next run can
//! skip re-discovery. The store itself is external and TTL-capable (Redis in
//! production); this module is a pass-through that serializes hints and
//! treats every store error as a cache miss — a broken cache must never break
//! discovery.

use crate::types::{InteractionMode, StrategyKind};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Key prefix in the external store.
pub const HINT_KEY_PREFIX: &str = "nav_hints:";

/// Mega-menu hints live longer — the selectors are structural.
pub const MEGA_MENU_HINT_TTL_SECS: u64 = 7 * 24 * 3600;
/// Adaptive hints decay faster; they came from heuristics.
pub const ADAPTIVE_HINT_TTL_SECS: u64 = 72 * 3600;

/// TTL to use when persisting a hint from the given strategy.
pub fn hint_ttl_secs(strategy: StrategyKind) -> u64 {
    match strategy {
        StrategyKind::PatternMatch | StrategyKind::MegaMenuCapture => MEGA_MENU_HINT_TTL_SECS,
        _ => ADAPTIVE_HINT_TTL_SECS,
    }
}

/// A cached toggler pattern: enough to re-find and re-open one trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TogglerPattern {
    pub text: String,
    pub selector: String,
    /// Interaction that opened the panel last time, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction: Option<InteractionMode>,
}

/// Previously successful selectors for one domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toggler_patterns: Vec<TogglerPattern>,
    /// Named panel-detection strategy that worked (e.g. "mega_menu").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_strategy: Option<String>,
}

impl Hint {
    pub fn is_empty(&self) -> bool {
        self.header_selector.is_none()
            && self.toggler_patterns.is_empty()
            && self.panel_strategy.is_none()
    }
}

/// External TTL-capable key-value store.
#[async_trait]
pub trait HintStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
}

/// Serializing wrapper around a [`HintStore`].
#[derive(Clone)]
pub struct HintCache {
    store: Arc<dyn HintStore>,
}

impl HintCache {
    pub fn new(store: Arc<dyn HintStore>) -> Self {
        Self { store }
    }

    fn key(domain: &str) -> String {
        format!("{HINT_KEY_PREFIX}{domain}")
    }

    /// Load the hint for a domain. Store errors and garbage payloads are
    /// cache misses, not failures.
    pub async fn load(&self, domain: &str) -> Option<Hint> {
        let raw = match self.store.get(&Self::key(domain)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!(domain, "hint store get failed, treating as miss: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(hint) => Some(hint),
            Err(e) => {
                debug!(domain, "cached hint undecodable, treating as miss: {e}");
                None
            }
        }
    }

    /// Persist a hint. Best-effort; errors are logged and dropped.
    pub async fn store(&self, domain: &str, hint: &Hint, ttl_secs: u64) {
        let payload = match serde_json::to_string(hint) {
            Ok(p) => p,
            Err(e) => {
                debug!(domain, "hint serialization failed: {e}");
                return;
            }
        };
        if let Err(e) = self
            .store
            .set_with_expiry(&Self::key(domain), &payload, ttl_secs)
            .await
        {
            debug!(domain, "hint store set failed: {e}");
        }
    }
}

/// In-memory store with a simulated clock, for tests and single-process use.
#[derive(Default)]
pub struct InMemoryHintStore {
    state: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    now_secs: u64,
    /// key → (value, expires_at)
    entries: HashMap<String, (String, u64)>,
}

impl InMemoryHintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the simulated clock.
    pub fn advance(&self, secs: u64) {
        self.state.lock().unwrap().now_secs += secs;
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HintStore for InMemoryHintStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        let now = state.now_secs;
        let expired = match state.entries.get(key) {
            Some((_, expires_at)) => *expires_at <= now,
            None => return Ok(None),
        };
        if expired {
            state.entries.remove(key);
            return Ok(None);
        }
        Ok(state.entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let expires_at = state.now_secs + ttl_secs;
        state
            .entries
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hint() -> Hint {
        Hint {
            header_selector: Some("header > nav".into()),
            toggler_patterns: vec![TogglerPattern {
                text: "Women".into(),
                selector: "header > nav > ul > li:nth-child(1) > a".into(),
                interaction: Some(InteractionMode::Hover),
            }],
            panel_strategy: Some("mega_menu".into()),
        }
    }

    #[tokio::test]
    async fn test_hint_roundtrip() {
        let store = Arc::new(InMemoryHintStore::new());
        let cache = HintCache::new(store);

        let hint = sample_hint();
        cache.store("shop.example.com", &hint, 3600).await;

        let loaded = cache.load("shop.example.com").await.expect("hint present");
        assert_eq!(loaded, hint);
    }

    #[tokio::test]
    async fn test_hint_expires_with_simulated_clock() {
        let store = Arc::new(InMemoryHintStore::new());
        let cache = HintCache::new(Arc::clone(&store) as Arc<dyn HintStore>);

        cache.store("shop.example.com", &sample_hint(), 100).await;
        store.advance(99);
        assert!(cache.load("shop.example.com").await.is_some());

        store.advance(1);
        assert!(cache.load("shop.example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_payload_is_a_miss() {
        let store = Arc::new(InMemoryHintStore::new());
        store
            .set_with_expiry("nav_hints:bad.example", "{not json", 3600)
            .await
            .unwrap();
        let cache = HintCache::new(store);
        assert!(cache.load("bad.example").await.is_none());
    }

    #[tokio::test]
    async fn test_failing_store_is_a_miss() {
        struct BrokenStore;

        #[async_trait]
        impl HintStore for BrokenStore {
            async fn get(&self, _key: &str) -> Result<Option<String>> {
                anyhow::bail!("store unavailable")
            }
            async fn set_with_expiry(&self, _: &str, _: &str, _: u64) -> Result<()> {
                anyhow::bail!("store unavailable")
            }
        }

        let cache = HintCache::new(Arc::new(BrokenStore));
        assert!(cache.load("any.example").await.is_none());
        // Store must not panic or error outward either.
        cache.store("any.example", &sample_hint(), 60).await;
    }

    #[test]
    fn test_ttl_per_strategy() {
        assert_eq!(
            hint_ttl_secs(StrategyKind::MegaMenuCapture),
            MEGA_MENU_HINT_TTL_SECS
        );
        assert_eq!(
            hint_ttl_secs(StrategyKind::AdaptiveProbe),
            ADAPTIVE_HINT_TTL_SECS
        );
        assert_eq!(
            hint_ttl_secs(StrategyKind::MobileFallback),
            ADAPTIVE_HINT_TTL_SECS
        );
    }
}
