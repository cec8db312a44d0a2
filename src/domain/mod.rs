//! Core domain types and logic.

pub mod backoff;
pub mod candle;
pub mod candle_store;
pub mod chart;
pub mod config;
pub mod error;
pub mod ledger;
pub mod navigation;
pub mod plot_cache;
pub mod snapshot;
pub mod symbol;
pub mod ticker;
