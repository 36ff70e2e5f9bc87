//! Market Mind feed engine binary.
//! Boots the refresh scheduler and the Axum read API in front of it.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_mind_feed::gateway::fixture::FixtureGateway;
use market_mind_feed::gateway::http::HttpGateway;
use market_mind_feed::metrics::Metrics;
use market_mind_feed::model::{Event, MlContext, Sentiment, Signal};
use market_mind_feed::{create_router, AppState, FeedConfig, FeedEngine, FeedGateway, FeedScheduler};

/// Tracing setup: `RUST_LOG` wins; `FEED_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("market_mind_feed=info,feed=info,warn"));

    let json = std::env::var("FEED_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

/// Small offline dataset for `--fixture` runs.
fn demo_gateway() -> FixtureGateway {
    let sources = ["Bloomberg", "Reuters", "X"];
    let tickers = ["NVDA", "AAPL", "SPY", "TSLA"];
    let sessions = ["PRE_MARKET", "MARKET_OPEN", "POWER_HOUR"];
    let events = (1..=120)
        .map(|id: i64| {
            let i = id as usize;
            let mut ev = Event::with_id(id);
            ev.title = Some(format!("{} update #{id}", tickers[i % tickers.len()]));
            ev.summary = Some("Demo intelligence event".to_string());
            ev.source = Some(sources[i % sources.len()].to_string());
            ev.tags = vec![tickers[i % tickers.len()].to_string()];
            ev.sentiment = match i % 3 {
                0 => Sentiment::Bullish,
                1 => Sentiment::Bearish,
                _ => Sentiment::Neutral,
            };
            ev.relevance_score = Some((i % 11) as f64);
            ev.novelty_score = Some((i % 7) as f64);
            ev.ml_context = Some(MlContext {
                confidence: Some((i % 10) as f64),
                session: Some(sessions[i % sessions.len()].to_string()),
                ..Default::default()
            });
            ev
        })
        .collect();
    let signals = tickers
        .iter()
        .map(|t| Signal {
            ticker: t.to_string(),
            price: Some(100.0),
            ..Default::default()
        })
        .collect();
    FixtureGateway::new(events)
        .with_limits(20, 20)
        .with_signals(signals)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = FeedConfig::load().context("loading feed config")?;
    let metrics = Metrics::init(cfg.poll_interval)?;

    let fixture_mode = std::env::args().any(|a| a == "--fixture");
    let gateway: Arc<dyn FeedGateway> = if fixture_mode {
        warn!("running against in-process fixture data");
        Arc::new(demo_gateway())
    } else {
        Arc::new(HttpGateway::new(&cfg).context("building http gateway")?)
    };

    let engine = Arc::new(FeedEngine::new(gateway));
    let mut scheduler = FeedScheduler::new(Arc::clone(&engine), cfg.poll_interval);
    scheduler.start();

    let app = create_router(AppState {
        engine: Arc::clone(&engine),
    })
    .merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    info!(addr = %cfg.listen_addr, api_base = %cfg.api_base, "feed engine listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serving api")?;

    scheduler.stop();
    engine.shutdown();
    info!("feed engine stopped");
    Ok(())
}
