mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{fixture, FakeTaskExecutor};
use packetflow_core::api::{ExecutionEngine, ResumePolicy, TrackError};

#[tokio::test]
async fn runs_rounds_in_dependency_order() {
    let fx = fixture(
        &[("A", &[], 1), ("B", &["A"], 1), ("C", &["A"], 1), ("D", &["B", "C"], 1)],
        &[],
    );
    let tasks = Arc::new(FakeTaskExecutor::default());
    let engine = ExecutionEngine::new(fx.executor(tasks.clone(), ResumePolicy::Resume), fx.registry())
        .with_max_parallel(2);

    let summary = engine.run_all().await.unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.rounds.len(), 3);

    let calls = tasks.calls();
    let pos = |k: &str| calls.iter().position(|c| c == k).unwrap();
    assert!(pos("A/1") < pos("B/1") && pos("A/1") < pos("C/1"));
    assert!(pos("B/1") < pos("D/1") && pos("C/1") < pos("D/1"));

    let done = fx.registry().completed_ids().unwrap();
    assert_eq!(done.len(), 4);
}

#[tokio::test]
async fn failed_round_stops_later_rounds_but_not_siblings() {
    let fx = fixture(
        &[("A", &[], 1), ("B", &[], 1), ("C", &["A", "B"], 1)],
        &[],
    );
    let tasks = Arc::new(FakeTaskExecutor::rejecting(&["A/1"]));
    let engine = ExecutionEngine::new(fx.executor(tasks.clone(), ResumePolicy::Resume), fx.registry())
        .with_max_parallel(2);

    let summary = engine.run_all().await.unwrap();
    assert!(!summary.is_success());
    assert_eq!(summary.halted_after, Some(1));
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].track_id, "A");
    assert!(matches!(
        summary.failed[0].error,
        TrackError::TaskAcceptanceFailure { .. }
    ));

    assert!(fx.registry().is_complete("B").unwrap());
    assert!(!tasks.calls().iter().any(|c| c.starts_with("C/")));
}

#[tokio::test]
async fn rerun_skips_completed_tracks() {
    let fx = fixture(&[("A", &[], 1), ("B", &["A"], 1)], &[]);
    let tasks = Arc::new(FakeTaskExecutor::rejecting(&["B/1"]));
    let executor = fx.executor(tasks.clone(), ResumePolicy::Resume);

    let first = ExecutionEngine::new(executor.clone(), fx.registry())
        .run_all()
        .await
        .unwrap();
    assert_eq!(first.failed.len(), 1);

    tasks.reject.lock().unwrap().clear();
    let second = ExecutionEngine::new(executor, fx.registry())
        .run_all()
        .await
        .unwrap();
    assert!(second.is_success());
    assert_eq!(second.rounds.len(), 1);
    assert_eq!(second.rounds[0].tracks, vec!["B"]);
    assert_eq!(
        tasks.calls().iter().filter(|c| c.as_str() == "A/1").count(),
        1
    );
}
