use std::sync::Arc;
use std::time::Duration;

use chatlist::test_utils::{MockSource, Row, page_of};
use chatlist::{
    ControllerConfig, ControllerEvent, CursorToken, FetchError, LoadPhase, QueryContext,
    SearchFilter, SourceUpdate, spawn,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_config() -> ControllerConfig {
    ControllerConfig {
        page_size: 10,
        batch_pages: 1,
        max_filter_retries: 3,
        query_debounce: Duration::from_millis(50),
        retry_jitter_ms: 1..=2,
    }
}

fn title_filter() -> SearchFilter<Row> {
    Arc::new(|row: &Row, query: &str| row.title.contains(query))
}

async fn next_event(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<ControllerEvent>,
) -> ControllerEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for controller event")
        .expect("controller event channel closed")
}

#[tokio::test(start_paused = true)]
async fn initial_load_then_scroll_pagination() {
    init_logs();
    let source = Arc::new(MockSource::new());
    source.push_page(QueryContext::Base, page_of(1, 3, 1, true));
    source.push_page(QueryContext::Base, page_of(4, 2, 2, false));

    let (handle, mut events) = spawn(source.clone(), test_config(), title_filter());

    assert!(matches!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Loading { .. })
    ));
    assert_eq!(next_event(&mut events).await, ControllerEvent::FullReplace);
    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Idle { has_more: true })
    );

    handle.on_scroll_near();
    assert!(matches!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Loading { .. })
    ));
    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::RangeInserted { start: 3, count: 2 }
    );
    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Idle { has_more: false })
    );

    // The second fetch continued from the supplied cursor.
    let fetches = source.fetches();
    assert_eq!(fetches.len(), 2);
    assert_eq!(fetches[0].1, None);
    assert!(matches!(fetches[1].1, Some(CursorToken::Opaque(_))));

    // Exhausted: further scroll proximity issues no fetch.
    handle.on_scroll_near();
    let snapshot = handle.snapshot().await.expect("controller alive");
    assert_eq!(
        snapshot.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(source.fetches().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn refresh_reloads_from_the_top() {
    init_logs();
    let source = Arc::new(MockSource::new());
    source.push_page(QueryContext::Base, page_of(1, 2, 1, false));
    source.push_page(QueryContext::Base, page_of(10, 3, 1, false));

    let (handle, mut events) = spawn(source.clone(), test_config(), title_filter());
    for _ in 0..3 {
        next_event(&mut events).await;
    }

    handle.on_refresh();
    assert!(matches!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Loading { .. })
    ));
    assert_eq!(next_event(&mut events).await, ControllerEvent::FullReplace);
    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Idle { has_more: false })
    );

    let fetches = source.fetches();
    assert_eq!(fetches.len(), 2);
    // Refresh restarts pagination instead of continuing a cursor.
    assert_eq!(fetches[1].1, None);

    let snapshot = handle.snapshot().await.expect("controller alive");
    assert_eq!(
        snapshot.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![10, 11, 12]
    );
}

#[tokio::test(start_paused = true)]
async fn push_update_reconciles_incrementally() {
    init_logs();
    let source = Arc::new(MockSource::new());
    source.push_page(QueryContext::Base, page_of(1, 3, 1, false));

    let (handle, mut events) = spawn(source.clone(), test_config(), title_filter());
    for _ in 0..3 {
        next_event(&mut events).await;
    }

    // The collaborator pushes a reordering of the same three items.
    source.emit(SourceUpdate::Snapshot(vec![
        Row::new(3, 1, "row 3"),
        Row::new(1, 1, "row 1"),
        Row::new(2, 1, "row 2"),
    ]));

    let event = next_event(&mut events).await;
    assert!(
        matches!(event, ControllerEvent::RangeMoved { .. }),
        "expected an incremental move, got {event:?}"
    );

    let snapshot = handle.snapshot().await.expect("controller alive");
    assert_eq!(
        snapshot.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![3, 1, 2]
    );
}

#[tokio::test(start_paused = true)]
async fn section_queries_resolve_through_the_model() {
    init_logs();
    let source = Arc::new(MockSource::new());
    source.push_page(QueryContext::Base, page_of(1, 3, 1, true));
    source.push_page(QueryContext::Base, page_of(4, 2, 2, false));

    let (handle, mut events) = spawn(source.clone(), test_config(), title_filter());
    for _ in 0..3 {
        next_event(&mut events).await;
    }
    handle.on_scroll_near();
    for _ in 0..3 {
        next_event(&mut events).await;
    }

    let section = handle
        .section_of(4)
        .await
        .expect("controller alive")
        .expect("position 4 is populated");
    assert_eq!(section.key, 2);
    assert_eq!(section.start, 3);
    assert_eq!(section.len, 2);
    assert!(handle.section_of(99).await.expect("controller alive").is_none());
}

#[tokio::test(start_paused = true)]
async fn transient_failure_reverts_phase_and_allows_retry() {
    init_logs();
    let source = Arc::new(MockSource::new());
    source.push_error(
        QueryContext::Base,
        FetchError::Transient {
            message: "server unreachable".into(),
        },
    );
    source.push_page(QueryContext::Base, page_of(1, 2, 1, false));

    let (handle, mut events) = spawn(source.clone(), test_config(), title_filter());

    assert!(matches!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Loading { .. })
    ));
    let failed = next_event(&mut events).await;
    assert!(
        matches!(failed, ControllerEvent::LoadFailed { .. }),
        "expected a one-line failure notice, got {failed:?}"
    );
    // The phase reverts to "more available" so the normal trigger retries.
    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Idle { has_more: true })
    );

    handle.on_scroll_near();
    assert!(matches!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Loading { .. })
    ));
    assert_eq!(next_event(&mut events).await, ControllerEvent::FullReplace);
    assert_eq!(
        next_event(&mut events).await,
        ControllerEvent::LoadingChanged(LoadPhase::Idle { has_more: false })
    );
    let snapshot = handle.snapshot().await.expect("controller alive");
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn destroy_releases_the_subscription() {
    init_logs();
    let source = Arc::new(MockSource::new());
    source.push_page(QueryContext::Base, page_of(1, 1, 1, false));

    let (handle, mut events) = spawn(source.clone(), test_config(), title_filter());
    assert_eq!(source.subscriber_count(), 1);

    handle.on_destroy();
    // Drain until the task drops its event sender; teardown has completed
    // by then.
    while events.recv().await.is_some() {}
    assert_eq!(source.subscriber_count(), 0);
    assert!(!handle.is_alive());
}
