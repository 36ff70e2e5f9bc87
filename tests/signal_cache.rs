// tests/signal_cache.rs
//
// Signal Cache refresh semantics against the fixture gateway.

use std::sync::Arc;
use std::time::Duration;

use market_mind_feed::gateway::fixture::FixtureGateway;
use market_mind_feed::signals::SignalCache;
use market_mind_feed::{FeedError, Signal};

fn sig(ticker: &str, price: f64) -> Signal {
    Signal {
        ticker: ticker.into(),
        price: Some(price),
        ..Default::default()
    }
}

#[tokio::test]
async fn refresh_replaces_the_whole_snapshot() {
    let gw = FixtureGateway::with_range(0).with_signals(vec![sig("SPY", 500.0), sig("QQQ", 430.0)]);
    let cache = SignalCache::new();
    assert!(cache.snapshot().is_none());

    assert_eq!(cache.refresh(&gw).await.unwrap(), Some(2));
    gw.set_signals(vec![sig("IWM", 200.0)]);
    assert_eq!(cache.refresh(&gw).await.unwrap(), Some(1));

    let tickers: Vec<String> = cache.signals().iter().map(|s| s.ticker.clone()).collect();
    assert_eq!(tickers, vec!["IWM".to_string()]);
    assert!(cache.since_last_refresh().is_some());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let gw = FixtureGateway::with_range(0).with_signals(vec![sig("SPY", 500.0)]);
    let cache = SignalCache::new();
    cache.refresh(&gw).await.unwrap();
    let before = cache.snapshot().unwrap();

    gw.fail_with(FeedError::network("503"));
    assert!(cache.refresh(&gw).await.is_err());

    let after = cache.snapshot().unwrap();
    assert!(Arc::ptr_eq(&before.signals, &after.signals));
    assert_eq!(before.refreshed_at, after.refreshed_at);
}

#[tokio::test(start_paused = true)]
async fn overlapping_refresh_is_skipped() {
    let gw = FixtureGateway::with_range(0)
        .with_signals(vec![sig("SPY", 500.0)])
        .with_latency(Duration::from_millis(100));
    let cache = SignalCache::new();

    let (a, b) = tokio::join!(cache.refresh(&gw), cache.refresh(&gw));

    let mut got = vec![a.unwrap(), b.unwrap()];
    got.sort();
    assert_eq!(got, vec![None, Some(1)]);
    assert_eq!(gw.calls().signals, 1);
}

#[tokio::test]
async fn closed_cache_ignores_refreshes() {
    let gw = FixtureGateway::with_range(0).with_signals(vec![sig("SPY", 500.0)]);
    let cache = SignalCache::new();
    cache.close();

    assert_eq!(cache.refresh(&gw).await.unwrap(), None);
    assert!(cache.signals().is_empty());
    assert_eq!(gw.calls().signals, 0);
}
