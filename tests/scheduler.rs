// tests/scheduler.rs
//
// Refresh scheduler driven on tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;

use market_mind_feed::gateway::fixture::FixtureGateway;
use market_mind_feed::{FeedEngine, FeedScheduler};

const INTERVAL: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn ticks_immediately_and_then_every_interval() {
    let gw = Arc::new(FixtureGateway::with_range(3));
    let engine = Arc::new(FeedEngine::new(gw.clone()));
    let mut scheduler = FeedScheduler::new(Arc::clone(&engine), INTERVAL);
    assert!(!scheduler.is_running());

    scheduler.start();
    assert!(scheduler.is_running());
    tokio::time::sleep(Duration::from_secs(12)).await;

    assert_eq!(gw.calls().latest, 3);
    assert_eq!(gw.calls().signals, 3);
    assert_eq!(engine.events().len(), 3);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn slow_gateway_never_overlaps_polls() {
    let gw = Arc::new(FixtureGateway::with_range(3).with_latency(Duration::from_secs(12)));
    let engine = Arc::new(FeedEngine::new(gw.clone()));
    let mut scheduler = FeedScheduler::new(engine, INTERVAL);

    scheduler.start();
    tokio::time::sleep(Duration::from_secs(31)).await;
    scheduler.stop();

    // Dispatched at 0s, 15s and 30s; the ticks in between found a poll in flight.
    assert_eq!(gw.calls().latest, 3);
    assert_eq!(gw.max_polls_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_halts_further_ticks() {
    let gw = Arc::new(FixtureGateway::with_range(3));
    let engine = Arc::new(FeedEngine::new(gw.clone()));
    let mut scheduler = FeedScheduler::new(engine, INTERVAL);

    scheduler.start();
    tokio::time::sleep(Duration::from_secs(6)).await;
    scheduler.stop();
    assert!(!scheduler.is_running());
    let calls = gw.calls().latest;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(gw.calls().latest, calls);
}

#[tokio::test(start_paused = true)]
async fn torn_down_engine_stops_dispatching() {
    let gw = Arc::new(FixtureGateway::with_range(3));
    let engine = Arc::new(FeedEngine::new(gw.clone()));
    let mut scheduler = FeedScheduler::new(Arc::clone(&engine), INTERVAL);

    scheduler.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    engine.shutdown();
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(gw.calls().latest, 1);
    assert_eq!(gw.calls().signals, 1);
    scheduler.stop();
}
