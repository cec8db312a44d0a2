//! Per-symbol rolling candle windows with a durable fallback.

use std::collections::{HashMap, HashSet};

use super::candle::{last_close, trim_window, Candle, MIN_WINDOW};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::SnapshotStore;

pub const DEFAULT_TIMEFRAME: &str = "15m";

/// Result of one `refresh` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A fresh window replaced the old one. `close_changed` asks the caller to
    /// invalidate cached charts for the symbol.
    Updated {
        close_changed: bool,
        persist_error: Option<String>,
    },
    /// The fetch failed or came back empty; the previous window is untouched.
    Failed(String),
}

impl RefreshOutcome {
    pub fn close_changed(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { close_changed: true, .. })
    }
}

#[derive(Debug)]
pub struct CandleStore {
    windows: HashMap<String, Vec<Candle>>,
    /// Symbols whose persisted window was absent or unreadable. The store is
    /// not consulted again for them until the next `refresh`.
    unavailable: HashSet<String>,
    depth: usize,
    timeframe: String,
}

impl Default for CandleStore {
    fn default() -> Self {
        Self::new(MIN_WINDOW, DEFAULT_TIMEFRAME)
    }
}

impl CandleStore {
    pub fn new(depth: usize, timeframe: &str) -> Self {
        CandleStore {
            windows: HashMap::new(),
            unavailable: HashSet::new(),
            depth,
            timeframe: timeframe.to_string(),
        }
    }

    /// Number of candles requested and kept per symbol.
    pub fn window_len(&self) -> usize {
        self.depth.max(MIN_WINDOW)
    }

    /// Current window for `symbol`: the last good fetch, else whatever the
    /// store has persisted, else empty.
    pub fn get(&mut self, symbol: &str, store: &dyn SnapshotStore) -> &[Candle] {
        if !self.windows.contains_key(symbol) && !self.unavailable.contains(symbol) {
            match store.load_candles(symbol) {
                Ok(Some(persisted)) if !persisted.is_empty() => {
                    let window = trim_window(persisted, self.window_len());
                    self.windows.insert(symbol.to_string(), window);
                }
                Ok(_) => {
                    self.unavailable.insert(symbol.to_string());
                }
                Err(e) => {
                    tracing::warn!(symbol, error = %e, "failed to load persisted candles");
                    self.unavailable.insert(symbol.to_string());
                }
            }
        }
        self.windows.get(symbol).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn refresh(
        &mut self,
        symbol: &str,
        gateway: &dyn MarketDataPort,
        store: &dyn SnapshotStore,
    ) -> RefreshOutcome {
        let len = self.window_len();
        self.unavailable.remove(symbol);
        let fetched = match gateway.fetch_candles(symbol, &self.timeframe, len) {
            Ok(candles) if candles.is_empty() => {
                tracing::warn!(symbol, "empty candle response");
                return RefreshOutcome::Failed(format!("No candles for {symbol}"));
            }
            Ok(candles) => candles,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "candle fetch failed");
                return RefreshOutcome::Failed(e.to_string());
            }
        };

        let previous_close = last_close(self.get(symbol, store));
        let window = trim_window(fetched, len);
        let close_changed = last_close(&window) != previous_close;

        let persist_error = match store.save_candles(symbol, &window) {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(symbol, error = %e, "failed to persist candles");
                Some(e.to_string())
            }
        };
        self.windows.insert(symbol.to_string(), window);

        RefreshOutcome::Updated {
            close_changed,
            persist_error,
        }
    }
}
