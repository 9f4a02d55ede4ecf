//! The driver trait consumed by every flow, plus the values it exchanges.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::AdapterError;
use crate::ids::ObserverId;

/// How long `navigate` waits before returning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    /// Return once the `DOMContentLoaded` event fired.
    #[default]
    DomContentLoaded,
    /// Return once the `load` event fired.
    Load,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 708)
    }
}

/// One mutation-observer callback; `records` is the batch size the page reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutationNotice {
    pub records: u32,
}

/// Live subscription to DOM mutations under one root element.
///
/// Dropping the watch stops delivery immediately and tears down the page-side
/// observer.
pub struct MutationWatch {
    id: ObserverId,
    notices: BoxStream<'static, MutationNotice>,
    _teardown: DropGuard,
}

impl MutationWatch {
    /// `teardown` is cancelled when the watch is dropped; implementations hook
    /// their page-side cleanup onto it.
    pub fn new(
        id: ObserverId,
        notices: BoxStream<'static, MutationNotice>,
        teardown: CancellationToken,
    ) -> Self {
        Self {
            id,
            notices,
            _teardown: teardown.drop_guard(),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }
}

impl Stream for MutationWatch {
    type Item = MutationNotice;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.notices.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for MutationWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationWatch").field("id", &self.id).finish()
    }
}

/// Browser page capability.
///
/// Every call targets the single page owned by the driver. Errors are returned
/// as-is to callers; the driver never retries.
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn navigate(&self, url: &str, wait: WaitUntil) -> Result<(), AdapterError>;

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), AdapterError>;

    /// Focus the first element matching `selector` and type `text` into it.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), AdapterError>;

    /// Dispatch a DOM `click()` on the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), AdapterError>;

    /// `innerText` of every element matching `selector`, in document order.
    async fn query_all_text(&self, selector: &str) -> Result<Vec<String>, AdapterError>;

    /// Wait for the next main-frame navigation, counting navigations started by
    /// the most recent `click` even if they began before this call.
    async fn wait_for_navigation(&self) -> Result<(), AdapterError>;

    /// Subscribe to attribute and child-list mutations in the subtree of the
    /// first element matching `root`.
    async fn observe_mutations(&self, root: &str) -> Result<MutationWatch, AdapterError>;

    async fn close(&self) -> Result<(), AdapterError>;
}
