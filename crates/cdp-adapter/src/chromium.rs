//! Chromium-backed [`UiDriver`] built on chromiumoxide.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventDomContentEventFired, EventFrameNavigated, EventLoadEventFired,
    EventNavigatedWithinDocument, FrameId, NavigateParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    AddBindingParams, EventBindingCalled, RemoveBindingParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::{future, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands;
use crate::config::CdpConfig;
use crate::driver::{MutationNotice, MutationWatch, UiDriver, Viewport, WaitUntil};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::ids::ObserverId;

/// Navigation listeners registered before an action that may navigate.
struct NavigationWatch {
    navigated: EventStream<EventFrameNavigated>,
    within_document: EventStream<EventNavigatedWithinDocument>,
    loaded: EventStream<EventLoadEventFired>,
}

/// One browser process with a single page.
pub struct ChromiumDriver {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
    /// Armed by `click`, consumed by `wait_for_navigation`.
    pending_navigation: parking_lot::Mutex<Option<NavigationWatch>>,
    navigation_timeout: Duration,
}

impl ChromiumDriver {
    /// Launch the browser and open a blank page.
    pub async fn launch(cfg: &CdpConfig) -> Result<Self, AdapterError> {
        let browser_cfg = Self::browser_config(cfg)?;
        let (browser, mut handler) = Browser::launch(browser_cfg)
            .await
            .map_err(|err| AdapterError::cdp_io(format!("failed to launch browser: {err}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", ?err, "browser handler reported an error");
                }
            }
            debug!(target: "cdp-adapter", "browser handler finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| AdapterError::cdp_io(format!("failed to open page: {err}")))?;

        info!(target: "cdp-adapter", headless = cfg.headless, "browser session started");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
            pending_navigation: parking_lot::Mutex::new(None),
            navigation_timeout: Duration::from_millis(cfg.request_timeout_ms),
        })
    }

    fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(cfg.request_timeout_ms))
            .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms))
            .args(cfg.args.iter().cloned());

        if !cfg.headless {
            builder = builder.with_head();
        }
        if cfg.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = cfg.resolve_executable() {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|err| AdapterError::internal(format!("browser config error: {err}")))
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: String) -> Result<T, AdapterError> {
        self.page
            .evaluate(script)
            .await
            .map_err(AdapterError::cdp_io)?
            .into_value::<T>()
            .map_err(|err| AdapterError::internal(format!("unexpected script result: {err}")))
    }

    async fn arm_navigation(&self) -> Result<NavigationWatch, AdapterError> {
        Ok(NavigationWatch {
            navigated: self
                .page
                .event_listener::<EventFrameNavigated>()
                .await
                .map_err(AdapterError::cdp_io)?,
            within_document: self
                .page
                .event_listener::<EventNavigatedWithinDocument>()
                .await
                .map_err(AdapterError::cdp_io)?,
            loaded: self
                .page
                .event_listener::<EventLoadEventFired>()
                .await
                .map_err(AdapterError::cdp_io)?,
        })
    }

    /// Resolves on the first main-frame navigation recorded by `watch`: a
    /// same-document navigation right away, a document load once it fired.
    async fn await_navigation(&self, mut watch: NavigationWatch) -> Result<(), AdapterError> {
        let main_frame = self.page.mainframe().await.map_err(AdapterError::cdp_io)?;
        let is_main = |frame_id: &FrameId| main_frame.as_ref().map_or(true, |main| main == frame_id);
        let closed = || AdapterError::navigation("main frame", "page closed while navigating");

        loop {
            tokio::select! {
                event = watch.navigated.next() => {
                    let event = event.ok_or_else(closed)?;
                    if event.frame.parent_id.is_none() {
                        debug!(target: "cdp-adapter", url = %event.frame.url, "main frame navigated");
                        break;
                    }
                }
                event = watch.within_document.next() => {
                    let event = event.ok_or_else(closed)?;
                    if is_main(&event.frame_id) {
                        debug!(target: "cdp-adapter", url = %event.url, "navigated within document");
                        return Ok(());
                    }
                }
            }
        }

        watch.loaded.next().await.ok_or_else(closed)?;
        Ok(())
    }
}

fn element_error(selector: &str, err: CdpError) -> AdapterError {
    match err {
        CdpError::NotFound => AdapterError::element_not_found(selector),
        other => AdapterError::cdp_io(other),
    }
}

#[async_trait]
impl UiDriver for ChromiumDriver {
    async fn navigate(&self, url: &str, wait: WaitUntil) -> Result<(), AdapterError> {
        debug!(target: "cdp-adapter", url, ?wait, "navigating");
        match wait {
            WaitUntil::Load => {
                self.page
                    .goto(url)
                    .await
                    .map_err(|err| AdapterError::navigation(url, err))?;
            }
            WaitUntil::DomContentLoaded => {
                let mut fired = self
                    .page
                    .event_listener::<EventDomContentEventFired>()
                    .await
                    .map_err(AdapterError::cdp_io)?;
                let response = self
                    .page
                    .execute(NavigateParams::new(url))
                    .await
                    .map_err(|err| AdapterError::navigation(url, err))?;
                if let Some(text) = response.result.error_text.as_deref() {
                    return Err(AdapterError::navigation(url, text));
                }
                if fired.next().await.is_none() {
                    return Err(AdapterError::navigation(
                        url,
                        "page closed before DOMContentLoaded",
                    ));
                }
            }
        }
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), AdapterError> {
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(viewport.width),
                i64::from(viewport.height),
                1.0,
                false,
            ))
            .await
            .map_err(AdapterError::cdp_io)?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), AdapterError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|err| element_error(selector, err))?;
        element.focus().await.map_err(AdapterError::cdp_io)?;
        element.type_str(text).await.map_err(AdapterError::cdp_io)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), AdapterError> {
        // Listen before the click so a navigation it starts cannot be missed.
        let watch = self.arm_navigation().await?;
        let clicked: bool = self.evaluate(commands::click_element(selector)).await?;
        if !clicked {
            return Err(AdapterError::element_not_found(selector));
        }
        *self.pending_navigation.lock() = Some(watch);
        Ok(())
    }

    async fn query_all_text(&self, selector: &str) -> Result<Vec<String>, AdapterError> {
        self.evaluate(commands::query_all_text(selector)).await
    }

    async fn wait_for_navigation(&self) -> Result<(), AdapterError> {
        let armed = self.pending_navigation.lock().take();
        let watch = match armed {
            Some(watch) => watch,
            None => self.arm_navigation().await?,
        };
        tokio::time::timeout(self.navigation_timeout, self.await_navigation(watch))
            .await
            .map_err(|_| {
                AdapterError::new(AdapterErrorKind::Navigation).with_hint(format!(
                    "no navigation within {}ms",
                    self.navigation_timeout.as_millis()
                ))
            })?
    }

    async fn observe_mutations(&self, root: &str) -> Result<MutationWatch, AdapterError> {
        let id = ObserverId::new();
        let binding = id.binding_name();

        self.page
            .execute(AddBindingParams::new(binding.clone()))
            .await
            .map_err(AdapterError::cdp_io)?;
        // Listener first so no callback fired right after install is missed.
        let events = self
            .page
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(AdapterError::cdp_io)?;

        let installed: bool = self
            .evaluate(commands::install_observer(&binding, root))
            .await?;
        if !installed {
            if let Err(err) = self.page.execute(RemoveBindingParams::new(binding)).await {
                debug!(target: "cdp-adapter", ?err, "binding removal failed");
            }
            return Err(AdapterError::element_not_found(root));
        }

        let name = binding.clone();
        let notices = events
            .filter_map(move |event| {
                let notice = (event.name == name).then(|| MutationNotice {
                    records: event.payload.parse().unwrap_or(1),
                });
                future::ready(notice)
            })
            .boxed();

        let teardown = CancellationToken::new();
        let cancelled = teardown.clone();
        let page = self.page.clone();
        tokio::spawn(async move {
            cancelled.cancelled().await;
            if let Err(err) = page.evaluate(commands::disconnect_observer(&binding)).await {
                debug!(target: "cdp-adapter", %binding, ?err, "observer disconnect failed");
            }
            if let Err(err) = page.execute(RemoveBindingParams::new(binding.clone())).await {
                debug!(target: "cdp-adapter", %binding, ?err, "binding removal failed");
            }
        });

        debug!(target: "cdp-adapter", observer = ?id, root, "mutation observer installed");
        Ok(MutationWatch::new(id, notices, teardown))
    }

    async fn close(&self) -> Result<(), AdapterError> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            browser.close().await.map_err(AdapterError::cdp_io)?;
            if let Err(err) = browser.wait().await {
                warn!(target: "cdp-adapter", ?err, "browser process did not exit cleanly");
            }
            info!(target: "cdp-adapter", "browser session closed");
        }
        self.handler_task.abort();
        Ok(())
    }
}
