//! In-memory [`UiDriver`] with scripted page behavior.
//!
//! Records every call, answers text queries from a fixed table, fails calls that
//! match registered rules and plays a [`MutationScript`] on every mutation
//! subscription. Time is driven by tokio, so paused-clock tests are exact.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::driver::{MutationNotice, MutationWatch, UiDriver, Viewport, WaitUntil};
use crate::error::AdapterError;
use crate::ids::ObserverId;

/// A call received by the scripted driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverCall {
    Navigate { url: String, wait: WaitUntil },
    SetViewport(Viewport),
    Type { selector: String, text: String },
    Click { selector: String },
    QueryAllText { selector: String },
    WaitForNavigation,
    ObserveMutations { root: String },
    Close,
}

impl DriverCall {
    pub fn selector(&self) -> Option<&str> {
        match self {
            DriverCall::Type { selector, .. }
            | DriverCall::Click { selector }
            | DriverCall::QueryAllText { selector } => Some(selector),
            DriverCall::ObserveMutations { root } => Some(root),
            _ => None,
        }
    }

    pub fn is_click_on(&self, target: &str) -> bool {
        matches!(self, DriverCall::Click { selector } if selector == target)
    }
}

/// Mutation activity played back on one subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationScript {
    /// The subtree never changes.
    Quiet,
    /// One notice at each offset from registration, then silence.
    Burst(Vec<Duration>),
    /// One notice every interval, forever.
    Churn(Duration),
}

impl Default for MutationScript {
    fn default() -> Self {
        MutationScript::Burst(vec![Duration::ZERO])
    }
}

type CallMatcher = Box<dyn Fn(&DriverCall, &[DriverCall]) -> bool + Send + Sync>;

struct FailureRule {
    matcher: CallMatcher,
    error: AdapterError,
}

#[derive(Default)]
struct PageState {
    calls: Vec<DriverCall>,
    texts: HashMap<String, Vec<String>>,
    rules: Vec<FailureRule>,
    scripts: VecDeque<MutationScript>,
    default_script: MutationScript,
}

#[derive(Default)]
pub struct ScriptedDriver {
    state: Mutex<PageState>,
    live_observers: Arc<AtomicUsize>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query_all_text(selector)` with `texts`.
    pub fn with_texts<I, S>(self, selector: &str, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().texts.insert(
            selector.to_string(),
            texts.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Fail every call for which `matcher(call, previous_calls)` holds.
    pub fn fail_when<F>(&self, matcher: F, error: AdapterError)
    where
        F: Fn(&DriverCall, &[DriverCall]) -> bool + Send + Sync + 'static,
    {
        self.state.lock().rules.push(FailureRule {
            matcher: Box::new(matcher),
            error,
        });
    }

    /// Fail every call that targets `selector`.
    pub fn fail_selector(&self, selector: &str, error: AdapterError) {
        let selector = selector.to_string();
        self.fail_when(
            move |call, _| call.selector() == Some(selector.as_str()),
            error,
        );
    }

    /// Fail the click on `confirm` that follows typing `text`.
    pub fn fail_submit_of(&self, confirm: &str, text: &str, error: AdapterError) {
        let confirm = confirm.to_string();
        let text = text.to_string();
        self.fail_when(
            move |call, history| {
                call.is_click_on(&confirm) && Self::last_typed(history) == Some(text.as_str())
            },
            error,
        );
    }

    /// Fail the `Type` call carrying `text`.
    pub fn fail_typing_of(&self, text: &str, error: AdapterError) {
        let text = text.to_string();
        self.fail_when(
            move |call, _| matches!(call, DriverCall::Type { text: typed, .. } if *typed == text),
            error,
        );
    }

    /// Script for the next subscription; subscriptions beyond the queue use the
    /// default script.
    pub fn queue_mutations(&self, script: MutationScript) {
        self.state.lock().scripts.push_back(script);
    }

    pub fn set_default_mutations(&self, script: MutationScript) {
        self.state.lock().default_script = script;
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&DriverCall) -> bool,
    {
        self.state.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Subscriptions whose watch has not been dropped yet.
    pub fn live_observers(&self) -> usize {
        self.live_observers.load(Ordering::SeqCst)
    }

    pub fn last_typed(history: &[DriverCall]) -> Option<&str> {
        history.iter().rev().find_map(|call| match call {
            DriverCall::Type { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    fn record(&self, call: DriverCall) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let failure = state
            .rules
            .iter()
            .find(|rule| (rule.matcher)(&call, &state.calls))
            .map(|rule| rule.error.clone());
        state.calls.push(call);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_script(&self) -> MutationScript {
        let mut state = self.state.lock();
        match state.scripts.pop_front() {
            Some(script) => script,
            None => state.default_script.clone(),
        }
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn register(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Notice feed that releases its live-observer slot when dropped.
struct ScriptedFeed {
    rx: UnboundedReceiver<MutationNotice>,
    _live: LiveGuard,
}

impl Stream for ScriptedFeed {
    type Item = MutationNotice;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}

async fn play(script: MutationScript, start: Instant, tx: UnboundedSender<MutationNotice>) {
    let notice = MutationNotice { records: 1 };
    match script {
        MutationScript::Quiet => {}
        MutationScript::Burst(offsets) => {
            for offset in offsets {
                sleep_until(start + offset).await;
                if tx.unbounded_send(notice).is_err() {
                    return;
                }
            }
        }
        MutationScript::Churn(interval) => loop {
            sleep(interval).await;
            if tx.unbounded_send(notice).is_err() {
                return;
            }
        },
    }
    // Keep the feed open until the subscriber goes away.
    futures::future::pending::<()>().await;
}

#[async_trait]
impl UiDriver for ScriptedDriver {
    async fn navigate(&self, url: &str, wait: WaitUntil) -> Result<(), AdapterError> {
        self.record(DriverCall::Navigate {
            url: url.to_string(),
            wait,
        })
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), AdapterError> {
        self.record(DriverCall::SetViewport(viewport))
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), AdapterError> {
        self.record(DriverCall::Type {
            selector: selector.to_string(),
            text: text.to_string(),
        })
    }

    async fn click(&self, selector: &str) -> Result<(), AdapterError> {
        self.record(DriverCall::Click {
            selector: selector.to_string(),
        })
    }

    async fn query_all_text(&self, selector: &str) -> Result<Vec<String>, AdapterError> {
        self.record(DriverCall::QueryAllText {
            selector: selector.to_string(),
        })?;
        Ok(self
            .state
            .lock()
            .texts
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn wait_for_navigation(&self) -> Result<(), AdapterError> {
        self.record(DriverCall::WaitForNavigation)
    }

    async fn observe_mutations(&self, root: &str) -> Result<MutationWatch, AdapterError> {
        self.record(DriverCall::ObserveMutations {
            root: root.to_string(),
        })?;

        let script = self.next_script();
        let start = Instant::now();
        let (tx, rx) = mpsc::unbounded();
        let feed = ScriptedFeed {
            rx,
            _live: LiveGuard::register(&self.live_observers),
        };

        let teardown = CancellationToken::new();
        let cancelled = teardown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = play(script, start, tx) => {}
            }
        });

        Ok(MutationWatch::new(ObserverId::new(), feed.boxed(), teardown))
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.record(DriverCall::Close)
    }
}
