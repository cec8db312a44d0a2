//! Time-windowed memoization of rendered chart grids.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::candle::{last_close, Candle};
use super::chart::{ChartMode, ChartRenderer};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlotKey {
    pub symbol: String,
    pub mode: ChartMode,
    pub height: usize,
    pub width: usize,
}

#[derive(Debug, Clone)]
pub struct PlotCacheEntry {
    pub rows: Vec<String>,
    pub built_at: Instant,
    pub last_close: Option<f64>,
}

#[derive(Debug)]
pub struct PlotCache {
    entries: HashMap<PlotKey, PlotCacheEntry>,
    refresh_interval: Duration,
}

impl Default for PlotCache {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

impl PlotCache {
    pub fn new(refresh_interval: Duration) -> Self {
        PlotCache {
            entries: HashMap::new(),
            refresh_interval,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &PlotKey) -> Option<&PlotCacheEntry> {
        self.entries.get(key)
    }

    /// Return the cached rows for the key while they are younger than the
    /// refresh interval, otherwise render synchronously and store the result.
    /// Every expired entry is dropped on a rebuild, so viewports left behind
    /// by a resize do not accumulate.
    #[allow(clippy::too_many_arguments)]
    pub fn get_or_build_at(
        &mut self,
        symbol: &str,
        mode: ChartMode,
        height: usize,
        width: usize,
        candles: &[Candle],
        renderer: &ChartRenderer,
        now: Instant,
    ) -> &[String] {
        let key = PlotKey {
            symbol: symbol.to_string(),
            mode,
            height,
            width,
        };
        let fresh = self
            .entries
            .get(&key)
            .is_some_and(|e| now.saturating_duration_since(e.built_at) < self.refresh_interval);

        if !fresh {
            tracing::debug!(symbol, ?mode, height, width, "rebuilding chart");
            let rows = renderer.render(candles, height, width, mode);
            let interval = self.refresh_interval;
            self.entries.retain(|_, e| now.saturating_duration_since(e.built_at) < interval);
            self.entries.insert(
                key.clone(),
                PlotCacheEntry {
                    rows,
                    built_at: now,
                    last_close: last_close(candles),
                },
            );
        }

        self.entries
            .get(&key)
            .map(|e| e.rows.as_slice())
            .unwrap_or_default()
    }

    /// Drop every entry for `symbol`, whatever its mode and size.
    pub fn invalidate(&mut self, symbol: &str) {
        self.entries.retain(|key, _| key.symbol != symbol);
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }
}
