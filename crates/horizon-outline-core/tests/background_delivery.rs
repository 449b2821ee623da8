//! Integration tests for background work delivered through the UI queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use horizon_outline_core::{
    BackgroundConfig, BackgroundRuntime, DeliveryOutcome, Signal, UiQueue, ViewGuard,
};

#[derive(Default)]
struct Panel {
    results: Vec<String>,
    updated: Signal<usize>,
}

fn setup() -> BackgroundRuntime {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("horizon_outline_core=debug")
        .with_test_writer()
        .try_init();
    BackgroundRuntime::new(
        BackgroundConfig::default()
            .with_worker_threads(2)
            .with_default_timeout(Duration::from_millis(500)),
    )
    .unwrap()
}

#[test]
fn test_results_apply_in_posting_order() {
    let runtime = setup();
    let queue = UiQueue::<Panel>::new();
    let view = ViewGuard::new();

    for name in ["first", "second", "third"] {
        let handle = runtime.deliver_default(
            queue.poster(),
            view.token(),
            async move { name.to_uppercase() },
            |panel: &mut Panel, value: String| {
                panel.results.push(value);
                let count = panel.results.len();
                panel.updated.emit(count);
            },
        );
        assert_eq!(runtime.block_on(handle).unwrap(), DeliveryOutcome::Posted);
    }

    let mut panel = Panel::default();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    panel.updated.connect(move |count| {
        counter.store(*count, Ordering::SeqCst);
    });

    assert_eq!(queue.drain(&mut panel), 3);
    assert_eq!(panel.results, ["FIRST", "SECOND", "THIRD"]);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert_eq!(runtime.active_tasks(), 0);
}

#[test]
fn test_view_closed_between_post_and_drain() {
    let runtime = setup();
    let queue = UiQueue::<Panel>::new();
    let view = ViewGuard::new();

    let handle = runtime.deliver_default(
        queue.poster(),
        view.token(),
        async { String::from("late") },
        |panel: &mut Panel, value: String| panel.results.push(value),
    );
    assert_eq!(runtime.block_on(handle).unwrap(), DeliveryOutcome::Posted);
    assert_eq!(queue.pending_count(), 1);

    drop(view);
    let mut panel = Panel::default();
    assert_eq!(queue.drain(&mut panel), 0);
    assert!(panel.results.is_empty());
}

#[test]
fn test_slow_check_times_out() {
    let runtime = setup();
    let queue = UiQueue::<Panel>::new();
    let view = ViewGuard::new();

    let handle = runtime.deliver(
        queue.poster(),
        view.token(),
        Duration::from_millis(20),
        async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            String::from("never")
        },
        |panel: &mut Panel, value: String| panel.results.push(value),
    );
    assert_eq!(runtime.block_on(handle).unwrap(), DeliveryOutcome::TimedOut);
    assert_eq!(queue.pending_count(), 0);
}

#[test]
fn test_queue_dropped_before_delivery() {
    let runtime = setup();
    let queue = UiQueue::<Panel>::new();
    let poster = queue.poster();
    let view = ViewGuard::new();
    drop(queue);

    let handle = runtime.deliver_default(
        poster,
        view.token(),
        async { String::from("orphan") },
        |panel: &mut Panel, value: String| panel.results.push(value),
    );
    assert_eq!(
        runtime.block_on(handle).unwrap(),
        DeliveryOutcome::QueueClosed
    );
}
