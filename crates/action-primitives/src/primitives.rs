//! Page session - the explicit context every flow operates on
//!
//! Wraps one driver handle together with the settle detector and the root the
//! detector watches. Errors from the driver are mapped into [`ActionError`]
//! without changing their category.

use std::sync::Arc;
use std::time::Instant;

use cdp_adapter::{UiDriver, Viewport, WaitUntil};
use tracing::{debug, info};

use crate::{
    errors::ActionError,
    types::{SettleReport, SettleWaitConfig},
    waiting::SettleDetector,
};

/// Root selector watched by [`PageSession::settle`] unless configured otherwise.
pub const DEFAULT_SETTLE_ROOT: &str = "body";

/// One browser page plus the settle policy used on it.
#[derive(Clone)]
pub struct PageSession {
    driver: Arc<dyn UiDriver>,
    detector: SettleDetector,
    settle_root: String,
}

impl PageSession {
    pub fn new(driver: Arc<dyn UiDriver>, settle: SettleWaitConfig) -> Self {
        Self {
            driver,
            detector: SettleDetector::new(settle),
            settle_root: DEFAULT_SETTLE_ROOT.to_string(),
        }
    }

    pub fn with_settle_root(mut self, root: impl Into<String>) -> Self {
        self.settle_root = root.into();
        self
    }

    pub async fn navigate(&self, url: &str, wait: WaitUntil) -> Result<(), ActionError> {
        let started = Instant::now();
        self.driver.navigate(url, wait).await?;
        info!(
            url,
            wait = ?wait,
            latency_ms = started.elapsed().as_millis() as u64,
            "navigation completed"
        );
        Ok(())
    }

    pub async fn set_viewport(&self, viewport: Viewport) -> Result<(), ActionError> {
        debug!(width = viewport.width, height = viewport.height, "setting viewport");
        self.driver.set_viewport(viewport).await?;
        Ok(())
    }

    pub async fn type_text(&self, selector: &str, text: &str) -> Result<(), ActionError> {
        debug!(selector, text_length = text.len(), "typing text");
        self.driver.type_text(selector, text).await?;
        Ok(())
    }

    pub async fn click(&self, selector: &str) -> Result<(), ActionError> {
        debug!(selector, "clicking");
        self.driver.click(selector).await?;
        Ok(())
    }

    pub async fn query_all_text(&self, selector: &str) -> Result<Vec<String>, ActionError> {
        let texts = self.driver.query_all_text(selector).await?;
        debug!(selector, matches = texts.len(), "queried element texts");
        Ok(texts)
    }

    pub async fn wait_for_navigation(&self) -> Result<(), ActionError> {
        self.driver.wait_for_navigation().await?;
        debug!("navigation observed");
        Ok(())
    }

    /// Wait for the configured root to stop mutating.
    pub async fn settle(&self) -> Result<SettleReport, ActionError> {
        self.detector
            .await_settle(self.driver.as_ref(), &self.settle_root)
            .await
    }

    pub async fn close(&self) -> Result<(), ActionError> {
        self.driver.close().await?;
        Ok(())
    }
}

impl std::fmt::Debug for PageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSession")
            .field("detector", &self.detector)
            .field("settle_root", &self.settle_root)
            .finish_non_exhaustive()
    }
}
