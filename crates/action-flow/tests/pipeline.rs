//! Pipeline behavior against a scripted destination page.

use std::sync::Arc;
use std::time::Duration;

use action_flow::{
    CreationWidget, FailureDecision, FailureHandler, FailureStrategy, FlowError, Item, ItemPhase,
    MigrationOutcome, MigrationPipeline, PipelineEvent, ProgressSink,
};
use action_primitives::{ActionError, ErrorKind, PageSession, SettleWaitConfig};
use cdp_adapter::{AdapterError, DriverCall, MutationScript, ScriptedDriver};
use parking_lot::Mutex;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().push(event);
    }
}

/// Keeps going past missing elements but stops once the page stops settling.
#[derive(Default)]
struct AbortOnTimeout {
    seen: Mutex<Vec<(usize, ItemPhase, ErrorKind)>>,
}

impl FailureHandler for AbortOnTimeout {
    fn handle_failure(
        &self,
        position: usize,
        _item: &Item,
        phase: ItemPhase,
        error: &ActionError,
        _strategy: FailureStrategy,
    ) -> FailureDecision {
        self.seen.lock().push((position, phase, error.kind()));
        match error.kind() {
            ErrorKind::TimedOut => FailureDecision::Abort,
            _ => FailureDecision::Continue,
        }
    }
}

fn widget() -> CreationWidget {
    CreationWidget::default()
}

fn setup() -> (Arc<ScriptedDriver>, PageSession) {
    let driver = Arc::new(ScriptedDriver::new());
    let settle = SettleWaitConfig::from_millis(30_000, 1_000).unwrap();
    let session = PageSession::new(driver.clone(), settle);
    (driver, session)
}

fn items(texts: &[&str]) -> Vec<Item> {
    texts.iter().copied().map(Item::from).collect()
}

fn opened(driver: &ScriptedDriver) -> usize {
    driver.count(|call| call.is_click_on(&widget().trigger))
}

fn closed(driver: &ScriptedDriver) -> usize {
    driver.count(|call| call.is_click_on(&widget().cancel))
}

fn typed(driver: &ScriptedDriver) -> Vec<String> {
    driver
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            DriverCall::Type { text, .. } => Some(text),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn scenario_all_items_succeed() {
    let (driver, session) = setup();
    let pipeline = MigrationPipeline::new(widget()).with_cap(5);

    let run = pipeline
        .migrate(&session, &items(&["Buy milk", "Call Bob", "Fix roof"]))
        .await
        .unwrap();

    assert_eq!(
        run.outcomes().cloned().collect::<Vec<_>>(),
        vec![MigrationOutcome::Success; 3]
    );
    assert_eq!(run.not_attempted, 0);
    assert_eq!(opened(&driver), 1);
    assert_eq!(closed(&driver), 1);
    assert_eq!(typed(&driver), vec!["Buy milk", "Call Bob", "Fix roof"]);
    assert_eq!(driver.live_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_submission_failure_is_isolated() {
    let (driver, session) = setup();
    driver.fail_submit_of(
        &widget().confirm,
        "B",
        AdapterError::element_not_found(&widget().confirm),
    );

    let run = MigrationPipeline::new(widget())
        .migrate(&session, &items(&["A", "B"]))
        .await
        .unwrap();

    assert_eq!(run.records[0].item, Item::from("A"));
    assert_eq!(run.records[0].outcome, MigrationOutcome::Success);
    assert_eq!(run.records[1].item, Item::from("B"));
    match &run.records[1].outcome {
        MigrationOutcome::Failed {
            reason,
            kind,
            phase,
        } => {
            assert_eq!(*kind, ErrorKind::ElementNotFound);
            assert_eq!(*phase, ItemPhase::Submitting);
            assert!(reason.starts_with("Element not found"), "reason: {reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(closed(&driver), 1);
}

#[tokio::test]
async fn empty_input_never_opens_widget() {
    let (driver, session) = setup();

    let run = MigrationPipeline::new(widget())
        .migrate(&session, &[])
        .await
        .unwrap();

    assert!(run.is_empty());
    assert_eq!(run.not_attempted, 0);
    assert!(driver.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cap_limits_attempts_and_widget_cycles_once() {
    let (driver, session) = setup();
    let input = items(&["1", "2", "3", "4", "5", "6", "7", "8"]);

    let run = MigrationPipeline::new(widget())
        .with_cap(5)
        .migrate(&session, &input)
        .await
        .unwrap();

    assert_eq!(run.attempted(), 5);
    assert_eq!(run.not_attempted, 3);
    assert_eq!(
        run.records.iter().map(|r| r.item.text()).collect::<Vec<_>>(),
        vec!["1", "2", "3", "4", "5"]
    );
    assert_eq!(typed(&driver), vec!["1", "2", "3", "4", "5"]);
    assert_eq!(opened(&driver), 1);
    assert_eq!(closed(&driver), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_cap_still_cycles_widget_once() {
    let (driver, session) = setup();

    let run = MigrationPipeline::new(widget())
        .with_cap(0)
        .migrate(&session, &items(&["A", "B"]))
        .await
        .unwrap();

    assert!(run.is_empty());
    assert_eq!(run.not_attempted, 2);
    assert_eq!(opened(&driver), 1);
    assert_eq!(closed(&driver), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_subset_keeps_order_and_totality() {
    let (driver, session) = setup();
    let input = items(&["a", "b", "c", "d", "e", "f", "g"]);
    let failing = ["b", "e", "g"];
    for text in failing {
        driver.fail_typing_of(text, AdapterError::element_not_found(&widget().input));
    }

    let run = MigrationPipeline::new(widget())
        .with_cap(5)
        .migrate(&session, &input)
        .await
        .unwrap();

    assert_eq!(run.attempted(), 5);
    for (record, expected) in run.records.iter().zip(&input) {
        assert_eq!(&record.item, expected);
        let should_fail = failing.contains(&record.item.text());
        assert_eq!(!record.outcome.is_success(), should_fail, "item {}", record.item);
    }
    assert_eq!(run.failed(), 2);
    assert_eq!(run.succeeded(), 3);
    // Items after a failure were still typed.
    assert_eq!(typed(&driver), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test(start_paused = true)]
async fn settle_timeout_fails_only_that_item() {
    let (driver, session) = setup();
    driver.queue_mutations(MutationScript::default());
    driver.queue_mutations(MutationScript::Churn(Duration::from_millis(250)));

    let run = MigrationPipeline::new(widget())
        .migrate(&session, &items(&["first", "second", "third"]))
        .await
        .unwrap();

    let outcomes: Vec<_> = run.outcomes().cloned().collect();
    assert!(outcomes[0].is_success());
    assert!(matches!(
        outcomes[1],
        MigrationOutcome::Failed {
            kind: ErrorKind::TimedOut,
            phase: ItemPhase::SettleWait,
            ..
        }
    ));
    assert!(outcomes[2].is_success());
    assert_eq!(driver.live_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn every_item_failing_still_closes_widget() {
    let (driver, session) = setup();
    driver.fail_selector(&widget().confirm, AdapterError::element_not_found(&widget().confirm));

    let run = MigrationPipeline::new(widget())
        .migrate(&session, &items(&["x", "y", "z"]))
        .await
        .unwrap();

    assert_eq!(run.failed(), 3);
    assert_eq!(opened(&driver), 1);
    assert_eq!(closed(&driver), 1);
}

#[tokio::test(start_paused = true)]
async fn abort_strategy_stops_after_first_failure() {
    let (driver, session) = setup();
    driver.fail_typing_of("b", AdapterError::element_not_found(&widget().input));

    let run = MigrationPipeline::new(widget())
        .with_strategy(FailureStrategy::Abort)
        .migrate(&session, &items(&["a", "b", "c", "d"]))
        .await
        .unwrap();

    assert_eq!(run.attempted(), 2);
    assert_eq!(run.not_attempted, 2);
    assert_eq!(typed(&driver), vec!["a", "b"]);
    assert_eq!(closed(&driver), 1);
}

#[tokio::test]
async fn widget_open_failure_is_fatal() {
    let (driver, session) = setup();
    driver.fail_selector(&widget().trigger, AdapterError::element_not_found(&widget().trigger));

    let err = MigrationPipeline::new(widget())
        .migrate(&session, &items(&["a"]))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::WidgetOpen(_)));
    assert!(err.partial_run().is_none());
    assert!(typed(&driver).is_empty());
}

#[tokio::test(start_paused = true)]
async fn widget_close_failure_carries_recorded_outcomes() {
    let (driver, session) = setup();
    driver.fail_selector(&widget().cancel, AdapterError::element_not_found(&widget().cancel));

    let err = MigrationPipeline::new(widget())
        .migrate(&session, &items(&["a", "b"]))
        .await
        .unwrap_err();

    let run = err.partial_run().expect("outcomes recorded before close");
    assert_eq!(run.succeeded(), 2);
    assert!(err.to_string().contains("after 2 attempted items"));
    assert_eq!(closed(&driver), 1);
}

#[tokio::test(start_paused = true)]
async fn progress_events_follow_item_order() {
    let (driver, session) = setup();
    driver.fail_typing_of("B", AdapterError::element_not_found(&widget().input));
    let sink = Arc::new(RecordingSink::default());

    MigrationPipeline::new(widget())
        .with_progress(sink.clone())
        .migrate(&session, &items(&["A", "B"]))
        .await
        .unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 4);
    assert_eq!(
        events[0],
        PipelineEvent::ItemStarted {
            position: 0,
            item: Item::from("A")
        }
    );
    assert_eq!(
        events[1],
        PipelineEvent::ItemSucceeded {
            position: 0,
            item: Item::from("A")
        }
    );
    assert!(matches!(
        &events[3],
        PipelineEvent::ItemFailed { position: 1, phase: ItemPhase::Typing, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn custom_failure_handler_decides_per_error() {
    let (driver, session) = setup();
    driver.fail_typing_of("a", AdapterError::element_not_found(&widget().input));
    driver.queue_mutations(MutationScript::Churn(Duration::from_millis(250)));
    let handler = Arc::new(AbortOnTimeout::default());

    let run = MigrationPipeline::new(widget())
        .with_failure_handler(handler.clone())
        .migrate(&session, &items(&["a", "b", "c", "d"]))
        .await
        .unwrap();

    assert_eq!(
        *handler.seen.lock(),
        vec![
            (0, ItemPhase::Typing, ErrorKind::ElementNotFound),
            (1, ItemPhase::SettleWait, ErrorKind::TimedOut),
        ]
    );
    assert_eq!(run.attempted(), 2);
    assert_eq!(run.not_attempted, 2);
    assert_eq!(typed(&driver), vec!["a", "b"]);
    assert_eq!(closed(&driver), 1);
}
