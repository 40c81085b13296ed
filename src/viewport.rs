//! Desktop context management.
//!
//! Mega-menus simply do not render on narrow viewports — sites swap to a
//! hamburger layout. When the caller's page is below the desktop cutoff, an
//! isolated desktop-sized context is spawned at the same URL and discovery
//! runs there. The spawned context is a scoped resource: the engine must
//! close the [`DesktopLease`] on every exit path, and tests observe the
//! close through the scripted driver's counter.
//!
//! The mobile half of the viewport story (drawer extraction, hamburger
//! activation) lives in [`crate::strategies::mobile`].

use crate::config::EngineConfig;
use crate::driver::{BrowserHandle, PageHandle};
use anyhow::Result;
use tracing::{debug, info, warn};

/// A spawned desktop page that must be closed before the run returns.
pub struct DesktopLease {
    page: Option<Box<dyn PageHandle>>,
}

impl DesktopLease {
    fn new(page: Box<dyn PageHandle>) -> Self {
        Self { page: Some(page) }
    }

    pub fn page(&self) -> &dyn PageHandle {
        self.page
            .as_deref()
            .expect("lease page is present until close()")
    }

    /// Close the spawned context. Consumes the lease; close failures are
    /// logged, not propagated — the run already has its result.
    pub async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!("failed to close desktop context: {e}");
            }
        }
    }
}

impl Drop for DesktopLease {
    fn drop(&mut self) {
        if self.page.is_some() {
            // Can't close asynchronously from Drop; flag the leak loudly.
            warn!("desktop context leaked without close()");
        }
    }
}

/// Decides whether discovery needs an isolated desktop context.
pub struct ViewportContextManager<'a> {
    config: &'a EngineConfig,
}

impl<'a> ViewportContextManager<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Spawn a desktop context when the current viewport is too narrow.
    ///
    /// Returns `None` when the page is already desktop-sized, and also when
    /// spawning fails — discovery then degrades to the original page rather
    /// than aborting.
    pub async fn ensure_desktop(
        &self,
        browser: &dyn BrowserHandle,
        page: &dyn PageHandle,
        url: &str,
    ) -> Result<Option<DesktopLease>> {
        let viewport = match page.viewport().await {
            Ok(v) => v,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                debug!("viewport unreadable, assuming desktop: {e}");
                return Ok(None);
            }
        };

        if viewport.width >= self.config.desktop_cutoff_px {
            return Ok(None);
        }

        info!(
            width = viewport.width,
            cutoff = self.config.desktop_cutoff_px,
            "viewport too narrow for mega-menus, spawning desktop context"
        );

        match browser
            .new_page(
                url,
                self.config.desktop_viewport,
                Some(&self.config.desktop_user_agent),
                self.config.navigation_timeout_ms,
            )
            .await
        {
            Ok(page) => Ok(Some(DesktopLease::new(page))),
            Err(e) => {
                warn!("desktop context creation failed, continuing on original page: {e}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::scripted::{ScriptedBrowser, ScriptedPage};
    use crate::driver::ViewportSize;

    #[tokio::test]
    async fn test_wide_page_needs_no_lease() {
        let browser = ScriptedBrowser::new();
        let page = ScriptedPage::new("https://x.com").with_viewport(ViewportSize::new(1440, 900));
        let config = EngineConfig::default();

        let lease = ViewportContextManager::new(&config)
            .ensure_desktop(&browser, &page, "https://x.com")
            .await
            .unwrap();
        assert!(lease.is_none());
        assert!(browser.page_requests().is_empty());
    }

    #[tokio::test]
    async fn test_narrow_page_spawns_desktop_context() {
        let browser = ScriptedBrowser::new();
        let desktop = ScriptedPage::new("placeholder");
        browser.enqueue(desktop.clone());

        let page = ScriptedPage::new("https://x.com").with_viewport(ViewportSize::new(390, 844));
        let config = EngineConfig::default();

        let lease = ViewportContextManager::new(&config)
            .ensure_desktop(&browser, &page, "https://x.com")
            .await
            .unwrap()
            .expect("lease expected");

        let requests = browser.page_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, ViewportSize::new(1920, 1080));
        assert_eq!(lease.page().viewport().await.unwrap().width, 1920);

        lease.close().await;
        assert_eq!(desktop.close_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure_degrades_to_original_page() {
        // Nothing queued: new_page will fail.
        let browser = ScriptedBrowser::new();
        let page = ScriptedPage::new("https://x.com").with_viewport(ViewportSize::new(390, 844));
        let config = EngineConfig::default();

        let lease = ViewportContextManager::new(&config)
            .ensure_desktop(&browser, &page, "https://x.com")
            .await
            .unwrap();
        assert!(lease.is_none());
    }
}
