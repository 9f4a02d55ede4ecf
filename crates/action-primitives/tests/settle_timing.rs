//! Timing behavior of the settle detector against a scripted page.
//!
//! All tests run on a paused tokio clock, so elapsed times are exact.

use std::sync::Arc;
use std::time::Duration;

use action_primitives::{
    ActionError, PageSession, QuietStart, SettleDetector, SettleWaitConfig,
};
use cdp_adapter::{DriverCall, MutationScript, ScriptedDriver};
use tokio::time::Instant;

const DEADLINE_MS: u64 = 30_000;
const QUIET_MS: u64 = 1_000;

fn config() -> SettleWaitConfig {
    SettleWaitConfig::from_millis(DEADLINE_MS, QUIET_MS).unwrap()
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[tokio::test(start_paused = true)]
async fn settles_one_quiet_window_after_activity_stops() {
    let driver = ScriptedDriver::new();
    // Activity every 200ms until 1800ms.
    let offsets = (0..10).map(|i| millis(i * 200)).collect();
    driver.queue_mutations(MutationScript::Burst(offsets));

    let started = Instant::now();
    let report = SettleDetector::new(config())
        .await_settle(&driver, "body")
        .await
        .unwrap();

    assert_eq!(started.elapsed(), millis(1_800 + QUIET_MS));
    assert_eq!(report.elapsed, millis(1_800 + QUIET_MS));
    assert_eq!(report.mutations, 10);
    assert_eq!(driver.live_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn never_settles_on_continuous_activity() {
    let driver = ScriptedDriver::new();
    driver.queue_mutations(MutationScript::Churn(millis(100)));

    let started = Instant::now();
    let err = SettleDetector::new(config())
        .await_settle(&driver, "body")
        .await
        .unwrap_err();

    assert_eq!(started.elapsed(), millis(DEADLINE_MS));
    match err {
        ActionError::TimedOut {
            deadline_ms,
            mutations,
        } => {
            assert_eq!(deadline_ms, DEADLINE_MS);
            assert!(mutations >= 299, "observed {} mutations", mutations);
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    // The subscription is gone the moment the wait returns.
    assert_eq!(driver.live_observers(), 0);
    tokio::time::sleep(millis(5_000)).await;
    assert_eq!(driver.live_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn idle_page_waits_for_full_deadline_by_default() {
    let driver = ScriptedDriver::new();
    driver.queue_mutations(MutationScript::Quiet);

    let started = Instant::now();
    let err = SettleDetector::new(config())
        .await_settle(&driver, "body")
        .await
        .unwrap_err();

    assert_eq!(started.elapsed(), millis(DEADLINE_MS));
    assert_eq!(
        err,
        ActionError::TimedOut {
            deadline_ms: DEADLINE_MS,
            mutations: 0
        }
    );
}

#[tokio::test(start_paused = true)]
async fn idle_page_settles_quickly_with_immediate_quiet_start() {
    let driver = ScriptedDriver::new();
    driver.queue_mutations(MutationScript::Quiet);
    let detector = SettleDetector::new(config().with_quiet_start(QuietStart::Immediate));

    let started = Instant::now();
    let report = detector.await_settle(&driver, "body").await.unwrap();

    assert_eq!(started.elapsed(), millis(QUIET_MS));
    assert_eq!(report.mutations, 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_wins_when_both_timers_expire_together() {
    let driver = ScriptedDriver::new();
    driver.queue_mutations(MutationScript::Burst(vec![millis(DEADLINE_MS - QUIET_MS)]));

    let err = SettleDetector::new(config())
        .await_settle(&driver, "body")
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::TimedOut { mutations: 1, .. }));
}

#[tokio::test(start_paused = true)]
async fn each_wait_registers_a_fresh_subscription() {
    let driver = Arc::new(ScriptedDriver::new());
    let session = PageSession::new(driver.clone(), config());

    session.settle().await.unwrap();
    session.settle().await.unwrap();

    let observes = driver.count(|call| matches!(call, DriverCall::ObserveMutations { .. }));
    assert_eq!(observes, 2);
    assert_eq!(driver.live_observers(), 0);
}

#[tokio::test]
async fn missing_root_fails_before_any_timer_starts() {
    let driver = ScriptedDriver::new();
    driver.fail_selector(
        "#gone",
        cdp_adapter::AdapterError::element_not_found("#gone"),
    );

    let err = SettleDetector::new(config())
        .await_settle(&driver, "#gone")
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::ElementNotFound(_)));
    assert_eq!(driver.live_observers(), 0);
}
