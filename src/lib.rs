// src/lib.rs
// Public library surface for integration tests (and the binary).

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod facets;
pub mod filter;
pub mod gateway;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod signals;
pub mod sync;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::FeedConfig;
pub use crate::engine::{FeedEngine, FeedView, TickReport};
pub use crate::error::FeedError;
pub use crate::filter::{Choice, FilterConfig};
pub use crate::gateway::FeedGateway;
pub use crate::model::{Event, Signal};
pub use crate::scheduler::FeedScheduler;
pub use crate::sync::{PageOutcome, PollOutcome, Synchronizer};
