//! Render surface abstraction.
//!
//! The harvester never drives a browser directly. Everything it needs from a
//! live page goes through [`RenderSurface`]; [`webdriver::WebDriverSurface`]
//! is the production implementation.

pub mod scripts;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(feature = "webdriver")]
pub mod webdriver;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::ScrollPosition;

#[cfg(feature = "webdriver")]
pub use webdriver::WebDriverSurface;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Capability to drive and read a rendered page.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Load `url`, failing when the page does not load within `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Replace the value of the input matched by `selector`.
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Run a script body in the page and return its `return` value.
    async fn evaluate_script(&self, script: &str) -> Result<Value>;

    /// Snapshot of the rendered document markup.
    async fn current_content(&self) -> Result<String>;

    /// Whether an element matching `selector` exists right now.
    async fn scrollable_region_present(&self, selector: &str) -> Result<bool> {
        let found = self
            .evaluate_script(&scripts::element_exists(selector))
            .await?;
        Ok(found.as_bool().unwrap_or(false))
    }

    /// Release the underlying session. Must be safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// How the page is scrolled. Detected once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollMode {
    /// Scroll a sub-region matched by the selector
    Container(String),
    /// Scroll the whole document
    Document,
}

impl ScrollMode {
    /// Prefer the scroll region when the page has one.
    pub async fn detect(surface: &dyn RenderSurface, region: &str) -> Result<Self> {
        if surface.scrollable_region_present(region).await? {
            log::info!("Scrolling inside {}", region);
            Ok(ScrollMode::Container(region.to_string()))
        } else {
            log::warn!("{} not found, scrolling the document instead", region);
            Ok(ScrollMode::Document)
        }
    }

    /// Current scrollable height in pixels.
    pub async fn extent(&self, surface: &dyn RenderSurface) -> Result<ScrollPosition> {
        let script = match self {
            ScrollMode::Container(selector) => scripts::region_height(selector),
            ScrollMode::Document => scripts::document_height(),
        };
        let value = surface.evaluate_script(&script).await?;
        Ok(value
            .as_u64()
            .or_else(|| value.as_f64().map(|h| h.max(0.0) as u64))
            .unwrap_or(0))
    }

    pub async fn scroll_to(
        &self,
        surface: &dyn RenderSurface,
        position: ScrollPosition,
    ) -> Result<()> {
        let script = match self {
            ScrollMode::Container(selector) => scripts::scroll_region_to(selector, position),
            ScrollMode::Document => scripts::scroll_document_to(position),
        };
        surface.evaluate_script(&script).await?;
        Ok(())
    }
}

/// Poll until `selector` matches an element, backing off up to two seconds
/// between checks. Fails with [`AppError::Timeout`] after `timeout`.
pub async fn wait_for_selector(
    surface: &dyn RenderSurface,
    selector: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if surface.scrollable_region_present(selector).await? {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(AppError::timeout(
                format!("element {selector}"),
                timeout.as_secs(),
            ));
        }

        tokio::time::sleep(backoff.min(deadline - now)).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Run `body` against an open session and close the session afterwards,
/// whether `body` succeeded or not.
///
/// A close failure is logged and never replaces the body's own result.
pub async fn with_session<T, F>(surface: &dyn RenderSurface, body: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let result = body.await;

    log::info!("Closing render surface...");
    match surface.close().await {
        Ok(()) => log::info!("Render surface closed"),
        Err(e) => log::warn!("Failed to close render surface: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::ScriptedSurface;

    #[tokio::test]
    async fn test_detect_container_mode() {
        let surface = ScriptedSurface::new(2400);
        let mode = ScrollMode::detect(&surface, ".main_content_container")
            .await
            .unwrap();
        assert_eq!(mode, ScrollMode::Container(".main_content_container".into()));
    }

    #[tokio::test]
    async fn test_detect_document_mode() {
        let surface = ScriptedSurface::new(2400).without_region();
        let mode = ScrollMode::detect(&surface, ".main_content_container")
            .await
            .unwrap();
        assert_eq!(mode, ScrollMode::Document);
    }

    #[tokio::test]
    async fn test_scroll_and_extent() {
        let surface = ScriptedSurface::new(2400);
        let mode = ScrollMode::Document;

        assert_eq!(mode.extent(&surface).await.unwrap(), 2400);
        mode.scroll_to(&surface, 800).await.unwrap();
        assert_eq!(surface.scrolls(), vec![800]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_selector_eventually_ready() {
        let surface = ScriptedSurface::new(0).ready_after(3);
        wait_for_selector(&surface, "input", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(surface.readiness_polls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_selector_times_out() {
        let surface = ScriptedSurface::new(0).ready_after(u32::MAX);
        let err = wait_for_selector(&surface, "input", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout { secs: 5, .. }));
    }

    #[tokio::test]
    async fn test_with_session_closes_on_error() {
        let surface = ScriptedSurface::new(0);
        let result: Result<()> = with_session(&surface, async {
            Err(AppError::surface("navigate", "boom"))
        })
        .await;

        assert!(result.is_err());
        assert!(surface.is_closed());
    }

    #[tokio::test]
    async fn test_with_session_closes_on_success() {
        let surface = ScriptedSurface::new(0);
        let value = with_session(&surface, async { Ok(7) }).await.unwrap();

        assert_eq!(value, 7);
        assert!(surface.is_closed());
    }
}
