#![allow(dead_code)]

use parking_lot::Mutex;
use spotsim::app::AppContext;
use spotsim::domain::candle::Candle;
use spotsim::domain::chart::ChartRenderer;
use spotsim::domain::config::AppConfig;
use spotsim::domain::error::SpotsimError;
use spotsim::domain::snapshot::Snapshot;
use spotsim::domain::ticker::Ticker;
use spotsim::ports::market_data_port::MarketDataPort;
use spotsim::ports::rasterizer_port::{PlotRequest, Rasterizer};
use spotsim::ports::store_port::SnapshotStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const BASE_TS: i64 = 1_700_000_000_000;
pub const FIFTEEN_MINUTES: i64 = 15 * 60 * 1000;
/// Segments the chart renderer emits per candle.
pub const CANDLE_SEGMENTS: usize = 6;

pub fn make_candle(index: usize, close: f64) -> Candle {
    Candle {
        timestamp: BASE_TS + index as i64 * FIFTEEN_MINUTES,
        open: close - 1.0,
        high: close + 2.0,
        low: close - 3.0,
        close,
        volume: 10.0,
    }
}

/// `count` ascending candles whose closes start at `first_close`.
pub fn make_window(count: usize, first_close: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| make_candle(i, first_close + i as f64))
        .collect()
}

/// Scriptable market data source with call counters.
#[derive(Default)]
pub struct MockMarketData {
    pub tickers: Mutex<HashMap<String, Ticker>>,
    pub candles: Mutex<HashMap<String, Vec<Candle>>>,
    pub fail_tickers: AtomicBool,
    pub fail_candles: AtomicBool,
    pub ticker_calls: AtomicUsize,
    pub candle_calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticker(self, symbol: &str, last: f64) -> Self {
        self.set_ticker(symbol, last);
        self
    }

    pub fn with_candles(self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.set_candles(symbol, candles);
        self
    }

    pub fn set_ticker(&self, symbol: &str, last: f64) {
        self.tickers.lock().insert(
            symbol.to_string(),
            Ticker {
                symbol: symbol.to_string(),
                last: Some(last),
                percentage: Some(1.5),
                ..Ticker::default()
            },
        );
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles.lock().insert(symbol.to_string(), candles);
    }

    pub fn fail_candles(&self, fail: bool) {
        self.fail_candles.store(fail, Ordering::SeqCst);
    }

    pub fn candle_calls(&self) -> usize {
        self.candle_calls.load(Ordering::SeqCst)
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, SpotsimError> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tickers.load(Ordering::SeqCst) {
            return Err(SpotsimError::gateway(symbol, "connection refused"));
        }
        self.tickers
            .lock()
            .get(symbol)
            .cloned()
            .ok_or_else(|| SpotsimError::gateway(symbol, "unknown symbol"))
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, SpotsimError> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_candles.load(Ordering::SeqCst) {
            return Err(SpotsimError::gateway(symbol, "timeout"));
        }
        let candles = self.candles.lock().get(symbol).cloned().unwrap_or_default();
        let skip = candles.len().saturating_sub(limit);
        Ok(candles.into_iter().skip(skip).collect())
    }
}

#[derive(Default)]
pub struct MemoryState {
    pub snapshot: Option<Snapshot>,
    pub candles: HashMap<String, Vec<Candle>>,
    pub fail_saves: bool,
    pub snapshot_saves: usize,
    pub candle_loads: usize,
}

/// In-memory store. Clones share state so a test can keep a handle after
/// boxing one into the context.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.state.lock().candles.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        self.state.lock().snapshot = Some(snapshot);
        self
    }

    pub fn fail_saves(&self, fail: bool) {
        self.state.lock().fail_saves = fail;
    }

    pub fn saved_snapshot(&self) -> Option<Snapshot> {
        self.state.lock().snapshot.clone()
    }

    pub fn snapshot_saves(&self) -> usize {
        self.state.lock().snapshot_saves
    }

    pub fn candle_loads(&self) -> usize {
        self.state.lock().candle_loads
    }
}

impl SnapshotStore for MemoryStore {
    fn load_snapshot(&self) -> Result<Option<Snapshot>, SpotsimError> {
        Ok(self.state.lock().snapshot.clone())
    }

    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), SpotsimError> {
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err(SpotsimError::persistence("disk full"));
        }
        state.snapshot = Some(snapshot.clone());
        state.snapshot_saves += 1;
        Ok(())
    }

    fn load_candles(&self, symbol: &str) -> Result<Option<Vec<Candle>>, SpotsimError> {
        let mut state = self.state.lock();
        state.candle_loads += 1;
        Ok(state.candles.get(symbol).cloned())
    }

    fn save_candles(&self, symbol: &str, candles: &[Candle]) -> Result<(), SpotsimError> {
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err(SpotsimError::persistence("disk full"));
        }
        state.candles.insert(symbol.to_string(), candles.to_vec());
        Ok(())
    }
}

/// Draws a fixed-size blank plot and records how many candles each request
/// carried.
pub struct CountingRasterizer {
    pub drawn: Arc<Mutex<Vec<usize>>>,
}

impl CountingRasterizer {
    pub fn new() -> (Self, Arc<Mutex<Vec<usize>>>) {
        let drawn = Arc::new(Mutex::new(Vec::new()));
        (
            CountingRasterizer {
                drawn: Arc::clone(&drawn),
            },
            drawn,
        )
    }
}

impl Rasterizer for CountingRasterizer {
    fn rasterize(&self, request: &PlotRequest) -> Result<Vec<String>, SpotsimError> {
        self.drawn.lock().push(request.segments.len() / CANDLE_SEGMENTS);
        let rows = request.height.saturating_sub(1);
        Ok((0..rows).map(|_| "#".repeat(request.width)).collect())
    }
}

pub fn test_config(symbols: &[&str]) -> AppConfig {
    AppConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        ..AppConfig::default()
    }
}

/// A context over mocks, plus handles to inspect them afterwards.
pub struct Harness {
    pub ctx: AppContext,
    pub gateway: Arc<MockMarketData>,
    pub store: MemoryStore,
    pub drawn: Arc<Mutex<Vec<usize>>>,
}

impl Harness {
    pub fn new(symbols: &[&str], gateway: MockMarketData, store: MemoryStore) -> Self {
        Self::with_config(test_config(symbols), gateway, store)
    }

    pub fn with_config(config: AppConfig, gateway: MockMarketData, store: MemoryStore) -> Self {
        let gateway = Arc::new(gateway);
        let (rasterizer, drawn) = CountingRasterizer::new();
        let ctx = AppContext::new(
            config,
            gateway.clone(),
            Box::new(store.clone()),
            ChartRenderer::new(Box::new(rasterizer)),
        );
        Harness {
            ctx,
            gateway,
            store,
            drawn,
        }
    }

    pub fn renders(&self) -> usize {
        self.drawn.lock().len()
    }

    /// Candle count of the most recent render.
    pub fn last_drawn(&self) -> Option<usize> {
        self.drawn.lock().last().copied()
    }
}
