//! Aggregates an exported music streaming history into the ranked, per-day
//! summaries that the sphere scene and the race chart are drawn from.

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod error;
pub mod history;
pub mod loader;
pub mod logging;
pub mod tally;

pub use aggregate::{AggregateResult, AggregateSettings, Aggregator};
pub use error::{Error, Result};
pub use history::PlayEvent;
pub use loader::{HistorySource, PendingLoad, load, spawn_load};
pub use tally::EntityKind;
