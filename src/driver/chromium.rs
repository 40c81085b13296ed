//! Chromium-based driver using chromiumoxide.

use super::{BrowserHandle, DriverError, PageHandle, ViewportSize};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. NAVSCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("NAVSCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.navscout/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".navscout/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".navscout/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".navscout/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".navscout/chromium/chrome-linux64/chrome"),
                home.join(".navscout/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Headless Chromium behind the [`BrowserHandle`] seam.
pub struct ChromiumBrowser {
    browser: Browser,
}

impl ChromiumBrowser {
    /// Launch a headless Chromium instance.
    pub async fn launch() -> Result<Self, DriverError> {
        let chrome_path = find_chromium().ok_or_else(|| {
            DriverError::ContextLost(
                "Chromium not found; set NAVSCOUT_CHROMIUM_PATH or install google-chrome".into(),
            )
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(DriverError::ContextLost)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::ContextLost(format!("failed to launch Chromium: {e}")))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser })
    }

    /// Convenience: open a page at a default desktop-ish viewport.
    pub async fn open(
        &self,
        url: &str,
        user_agent: Option<&str>,
    ) -> Result<Box<dyn PageHandle>, DriverError> {
        self.new_page(url, ViewportSize::new(1366, 900), user_agent, 30_000)
            .await
    }
}

#[async_trait]
impl BrowserHandle for ChromiumBrowser {
    async fn new_page(
        &self,
        url: &str,
        viewport: ViewportSize,
        user_agent: Option<&str>,
        timeout_ms: u64,
    ) -> Result<Box<dyn PageHandle>, DriverError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::ContextLost(format!("failed to create page: {e}")))?;

        if let Some(ua) = user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| DriverError::Evaluation(format!("set_user_agent failed: {e}")))?;
        }

        let handle = ChromiumPage { page };
        handle.set_viewport(viewport).await?;

        let nav = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            handle.page.goto(url.to_string()),
        )
        .await;

        match nav {
            Ok(Ok(_)) => {
                let _ = handle.page.wait_for_navigation().await;
                Ok(Box::new(handle))
            }
            Ok(Err(e)) => {
                let _ = handle.page.close().await;
                Err(DriverError::ContextLost(format!("navigation failed: {e}")))
            }
            Err(_) => {
                let _ = handle.page.close().await;
                Err(DriverError::Timeout {
                    op: "navigate",
                    timeout_ms,
                })
            }
        }
    }
}

/// A single Chromium page.
pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn url(&self) -> Result<String, DriverError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| DriverError::ContextLost(format!("failed to get URL: {e}")))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::Evaluation(format!("{e}")))?;

        result
            .into_value()
            .map_err(|e| DriverError::Evaluation(format!("result not serializable: {e:?}")))
    }

    async fn html(&self) -> Result<String, DriverError> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| DriverError::Evaluation(format!("{e}")))?;

        result
            .into_value()
            .map_err(|e| DriverError::Evaluation(format!("HTML not a string: {e:?}")))
    }

    async fn viewport(&self) -> Result<ViewportSize, DriverError> {
        let value = self
            .evaluate("({width: window.innerWidth, height: window.innerHeight})")
            .await?;
        serde_json::from_value(value)
            .map_err(|e| DriverError::Evaluation(format!("viewport shape: {e}")))
    }

    async fn set_viewport(&self, size: ViewportSize) -> Result<(), DriverError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(size.width as i64)
            .height(size.height as i64)
            .device_scale_factor(1.0)
            .mobile(size.width < 800)
            .build()
            .map_err(DriverError::Evaluation)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| DriverError::Evaluation(format!("viewport override failed: {e}")))?;
        Ok(())
    }

    async fn move_mouse(&self, x: f64, y: f64) -> Result<(), DriverError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(x)
            .y(y)
            .build()
            .map_err(DriverError::Evaluation)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| DriverError::Evaluation(format!("mouse move failed: {e}")))?;
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), DriverError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::Evaluation(format!("no element for '{selector}': {e}")))?;

        element
            .scroll_into_view()
            .await
            .map_err(|e| DriverError::Evaluation(format!("scroll_into_view failed: {e}")))?;

        let point = element
            .clickable_point()
            .await
            .map_err(|e| DriverError::Evaluation(format!("no clickable point: {e}")))?;

        self.move_mouse(point.x, point.y).await
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::Evaluation(format!("no element for '{selector}': {e}")))?;

        element
            .click()
            .await
            .map_err(|e| DriverError::Evaluation(format!("click failed: {e}")))?;
        Ok(())
    }

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), DriverError> {
        let script = format!("window.scrollBy({dx}, {dy})");
        self.evaluate(&script).await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.page
            .close()
            .await
            .map_err(|e| DriverError::ContextLost(format!("close failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_evaluate_roundtrip() {
        let browser = ChromiumBrowser::launch().await.expect("launch failed");
        let page = browser
            .new_page(
                "data:text/html,<nav><a href='/a'>Shop</a></nav>",
                ViewportSize::new(1366, 900),
                None,
                10_000,
            )
            .await
            .expect("new_page failed");

        let count = page
            .evaluate("document.querySelectorAll('a').length")
            .await
            .expect("evaluate failed");
        assert_eq!(count.as_u64(), Some(1));

        let viewport = page.viewport().await.expect("viewport failed");
        assert_eq!(viewport.width, 1366);

        page.close().await.expect("close failed");
    }
}
