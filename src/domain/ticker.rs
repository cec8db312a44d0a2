//! Latest market snapshots shared between the price poller and the UI loop.
//!
//! Each ticker is published as an `Arc<Ticker>`: readers clone the pointer
//! under a short read lock and never see a half-written record, and the
//! writer only holds the lock long enough to swap the pointer.

use chrono::Local;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub last: Option<f64>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    /// Exchange timestamp, epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Default)]
struct BoardInner {
    tickers: RwLock<HashMap<String, Arc<Ticker>>>,
    last_update: RwLock<Option<String>>,
    status: RwLock<String>,
    watched: RwLock<Arc<Vec<String>>>,
}

/// Cloneable handle to the shared ticker state.
#[derive(Debug, Clone, Default)]
pub struct TickerBoard {
    inner: Arc<BoardInner>,
}

pub fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

impl TickerBoard {
    pub fn new() -> Self {
        let board = Self::default();
        board.set_status("Ready...");
        board
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<Ticker>> {
        self.inner.tickers.read().get(symbol).cloned()
    }

    /// Store a fresh ticker and stamp the last-update time.
    pub fn publish(&self, symbol: &str, ticker: Ticker) {
        let ticker = Arc::new(ticker);
        self.inner.tickers.write().insert(symbol.to_string(), ticker);
        *self.inner.last_update.write() = Some(now_stamp());
    }

    /// Seed tickers loaded from a snapshot without touching the timestamp.
    pub fn restore(&self, tickers: HashMap<String, Ticker>, last_update: Option<String>) {
        let restored: HashMap<String, Arc<Ticker>> = tickers
            .into_iter()
            .map(|(symbol, ticker)| (symbol, Arc::new(ticker)))
            .collect();
        *self.inner.tickers.write() = restored;
        *self.inner.last_update.write() = last_update;
    }

    /// Owned copy of every ticker, for persistence.
    pub fn snapshot(&self) -> HashMap<String, Ticker> {
        self.inner
            .tickers
            .read()
            .iter()
            .map(|(symbol, ticker)| (symbol.clone(), Ticker::clone(ticker)))
            .collect()
    }

    pub fn last_update(&self) -> Option<String> {
        self.inner.last_update.read().clone()
    }

    pub fn status(&self) -> String {
        self.inner.status.read().clone()
    }

    pub fn set_status(&self, status: impl Into<String>) {
        *self.inner.status.write() = status.into();
    }

    /// Symbols the poller should refresh on its next pass.
    pub fn watched(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.inner.watched.read())
    }

    pub fn watch(&self, symbols: &[String]) {
        *self.inner.watched.write() = Arc::new(symbols.to_vec());
    }
}
