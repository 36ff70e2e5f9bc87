// tests/sync_pagination.rs
//
// Backward pagination: exhaustion, non-reentrancy and overlap with polling.

mod support;

use std::sync::Arc;
use std::time::Duration;

use market_mind_feed::gateway::fixture::FixtureGateway;
use market_mind_feed::{PageOutcome, PollOutcome, Synchronizer};
use support::ids;

#[tokio::test]
async fn empty_page_marks_history_exhausted_until_reset() {
    let gw = Arc::new(FixtureGateway::with_range(5).with_limits(3, 2));
    let sync = Synchronizer::new(gw.clone());
    sync.poll_latest().await.unwrap();

    assert_eq!(
        sync.load_older().await.unwrap(),
        PageOutcome::Appended { added: 2 }
    );
    assert_eq!(ids(&sync.events()), vec![5, 4, 3, 2, 1]);
    assert_eq!(sync.load_older().await.unwrap(), PageOutcome::Exhausted);
    assert!(!sync.pagination().has_more);

    // Exhausted: nothing further is dispatched.
    assert_eq!(sync.load_older().await.unwrap(), PageOutcome::NoMoreData);
    assert_eq!(gw.calls().before, 2);

    sync.reset();
    assert!(sync.is_empty());
    assert!(sync.pagination().has_more);
}

#[tokio::test]
async fn exhaustion_is_kept_across_polls() {
    let gw = Arc::new(FixtureGateway::with_range(2).with_limits(2, 2));
    let sync = Synchronizer::new(gw.clone());
    sync.poll_latest().await.unwrap();
    assert_eq!(sync.load_older().await.unwrap(), PageOutcome::Exhausted);

    gw.push_event(market_mind_feed::Event::with_id(3));
    sync.poll_latest().await.unwrap();

    assert_eq!(ids(&sync.events()), vec![3, 2, 1]);
    assert!(!sync.pagination().has_more);
}

#[tokio::test(start_paused = true)]
async fn concurrent_load_older_dispatches_once() {
    let gw = Arc::new(
        FixtureGateway::with_range(10)
            .with_limits(3, 3)
            .with_latency(Duration::from_millis(100)),
    );
    let sync = Synchronizer::new(gw.clone());
    sync.poll_latest().await.unwrap();

    let (a, b) = tokio::join!(sync.load_older(), sync.load_older());
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, PageOutcome::InFlight));

    assert_eq!(
        outcomes,
        vec![PageOutcome::Appended { added: 3 }, PageOutcome::InFlight]
    );
    assert_eq!(gw.calls().before, 1);
    assert_eq!(ids(&sync.events()), vec![10, 9, 8, 7, 6, 5]);
}

#[tokio::test(start_paused = true)]
async fn loading_more_flag_tracks_outstanding_page() {
    let gw = Arc::new(
        FixtureGateway::with_range(10)
            .with_limits(3, 3)
            .with_latency(Duration::from_millis(100)),
    );
    let sync = Arc::new(Synchronizer::new(gw));
    sync.poll_latest().await.unwrap();
    assert!(!sync.pagination().loading_more);

    let task = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.load_older().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(sync.pagination().loading_more);

    task.await.unwrap().unwrap();
    assert!(!sync.pagination().loading_more);
}

#[tokio::test(start_paused = true)]
async fn poll_and_page_overlap_without_losing_either_merge() {
    let gw = Arc::new(
        FixtureGateway::with_range(10)
            .with_limits(3, 3)
            .with_latency(Duration::from_millis(50)),
    );
    let sync = Synchronizer::new(gw.clone());
    sync.poll_latest().await.unwrap();
    gw.push_event(market_mind_feed::Event::with_id(11));
    gw.push_event(market_mind_feed::Event::with_id(12));

    let (poll, page) = tokio::join!(sync.poll_latest(), sync.load_older());

    assert_eq!(poll.unwrap(), PollOutcome::Merged { added: 2 });
    assert_eq!(page.unwrap(), PageOutcome::Appended { added: 3 });
    assert_eq!(ids(&sync.events()), vec![12, 11, 10, 9, 8, 7, 6, 5]);
}
