//! Application context: the single owner of every piece of session state.
//!
//! The navigator turns keys into [`Command`]s; the context applies them to
//! the ledger, persists the snapshot, and invalidates cached charts for
//! whatever symbol the command touched.

use std::sync::Arc;
use std::time::Instant;

use crate::app::poller::{PollerHandle, PricePoller};
use crate::domain::candle::{Candle, MIN_WINDOW};
use crate::domain::candle_store::{CandleStore, RefreshOutcome};
use crate::domain::chart::{ChartMode, ChartRenderer};
use crate::domain::config::AppConfig;
use crate::domain::error::SpotsimError;
use crate::domain::ledger::Ledger;
use crate::domain::navigation::{Command, Key, Navigator, Screen};
use crate::domain::plot_cache::PlotCache;
use crate::domain::snapshot::Snapshot;
use crate::domain::symbol::normalize_symbol;
use crate::domain::ticker::{Ticker, TickerBoard};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::SnapshotStore;

pub struct AppContext {
    config: AppConfig,
    ledger: Ledger,
    candles: CandleStore,
    plots: PlotCache,
    renderer: ChartRenderer,
    board: TickerBoard,
    nav: Navigator,
    gateway: Arc<dyn MarketDataPort>,
    store: Box<dyn SnapshotStore>,
    poller: Option<PollerHandle>,
    last_candle_fetch: Option<Instant>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        gateway: Arc<dyn MarketDataPort>,
        store: Box<dyn SnapshotStore>,
        renderer: ChartRenderer,
    ) -> Self {
        let ledger = Ledger::new(config.symbols.clone(), config.quote_balance);
        let board = TickerBoard::new();
        board.watch(&ledger.symbols);
        Self {
            candles: CandleStore::new(config.chart.fullscreen_candles, &config.chart.timeframe),
            plots: PlotCache::new(config.chart.refresh_interval),
            config,
            ledger,
            renderer,
            board,
            nav: Navigator::new(),
            gateway,
            store,
            poller: None,
            last_candle_fetch: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn board(&self) -> &TickerBoard {
        &self.board
    }

    pub fn nav(&self) -> &Navigator {
        &self.nav
    }

    pub fn plots(&self) -> &PlotCache {
        &self.plots
    }

    pub fn status(&self) -> String {
        self.board.status()
    }

    pub fn active_symbol(&self) -> Option<&str> {
        self.nav.active_symbol(&self.ledger)
    }

    pub fn active_ticker(&self) -> Option<Arc<Ticker>> {
        self.active_symbol().and_then(|s| self.board.get(s))
    }

    pub fn should_exit(&self) -> bool {
        self.nav.screen() == Screen::Exit
    }

    /// Overlay the persisted snapshot, if any, onto the configured defaults.
    /// A missing or unreadable snapshot only changes the status line.
    pub fn load(&mut self) {
        match self.store.load_snapshot() {
            Ok(Some(snapshot)) => {
                snapshot.apply_to(&mut self.ledger);
                self.board.restore(snapshot.tickers, snapshot.last_update);
                self.board.set_status("Ok load data");
                tracing::info!(
                    symbols = self.ledger.symbols.len(),
                    orders = self.ledger.order_count(),
                    "loaded snapshot"
                );
            }
            Ok(None) => self.board.set_status("No saved data"),
            Err(e) => {
                tracing::error!(error = %e, "failed to load snapshot");
                self.board.set_status(format!("Error load data: {e}"));
            }
        }
        self.board.watch(&self.ledger.symbols);
        self.nav.clamp(&self.ledger);
    }

    pub fn start_poller(&mut self) -> Result<(), SpotsimError> {
        let poller = PricePoller::new(
            Arc::clone(&self.gateway),
            self.board.clone(),
            self.config.poller.clone(),
        );
        self.poller = Some(poller.spawn()?);
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key, now: Instant) {
        for command in self.nav.handle_key(key, &self.ledger) {
            self.apply(command, now);
        }
    }

    pub fn apply(&mut self, command: Command, now: Instant) {
        tracing::debug!(?command, "applying command");
        match command {
            Command::PlaceOrder(order) => {
                let symbol = order.symbol.clone();
                let side = order.side.key();
                match self.ledger.submit(order) {
                    Ok(()) => {
                        self.board
                            .set_status(format!("{side} order for {symbol} added successfully"));
                        self.after_ledger_change(&[symbol.as_str()]);
                    }
                    Err(e) => self.board.set_status(format!("Failed: {e}")),
                }
            }
            Command::EditOrder { index, order } => {
                let symbol = order.symbol.clone();
                let side = order.side.key();
                match self.ledger.edit_order(index, order) {
                    Ok(old) => {
                        self.board
                            .set_status(format!("{side} order for {symbol} edited successfully"));
                        self.after_ledger_change(&[old.symbol.as_str(), symbol.as_str()]);
                    }
                    Err(e) => self.board.set_status(format!("Failed to edit order: {e}")),
                }
            }
            Command::DeleteOrder(index) => match self.ledger.delete_order(index) {
                Ok(old) => {
                    self.board
                        .set_status(format!("Deleted order {} for {}", index + 1, old.symbol));
                    self.after_ledger_change(&[old.symbol.as_str()]);
                }
                Err(e) => self.board.set_status(format!("Failed: {e}")),
            },
            Command::DeleteAllOrders => {
                let removed = self.ledger.delete_all();
                self.board.set_status(format!("Deleted {} open orders", removed.len()));
                let symbols: Vec<&str> = removed.iter().map(|o| o.symbol.as_str()).collect();
                self.after_ledger_change(&symbols);
            }
            Command::AddSymbol(input) => self.add_symbol(&input),
            Command::RemoveSymbol(symbol) => {
                if self.ledger.remove_symbol(&symbol) {
                    self.board.set_status(format!("Removed {symbol}"));
                    self.board.watch(&self.ledger.symbols);
                    // The active symbol may have shifted.
                    self.plots.invalidate_all();
                    self.after_ledger_change(&[symbol.as_str()]);
                }
            }
            Command::SymbolChanged(_) => self.plots.invalidate_all(),
            Command::EnterTrading(symbol) => {
                self.plots.invalidate(&symbol);
                self.refresh_candles(&symbol, now);
            }
            Command::OpenFullscreen(symbol) => {
                self.refresh_candles(&symbol, now);
                self.plots.invalidate(&symbol);
            }
            Command::CloseFullscreen(symbol) => self.plots.invalidate(&symbol),
            Command::RefreshTickers => match &self.poller {
                Some(poller) => poller.wake(),
                None => self.board.set_status("Price poller is not running"),
            },
            Command::SetStatus(status) => self.board.set_status(status),
            Command::Quit => self.persist(),
        }
    }

    fn add_symbol(&mut self, input: &str) {
        let symbol = match normalize_symbol(input) {
            Ok(symbol) => symbol,
            Err(e) => {
                self.board.set_status(format!("Error add symbol: {e}"));
                return;
            }
        };
        match self.ledger.add_symbol(&symbol) {
            Ok(true) => {
                self.board.set_status(format!("Added {symbol}"));
                self.board.watch(&self.ledger.symbols);
                self.after_ledger_change(&[symbol.as_str()]);
            }
            Ok(false) => self.board.set_status(format!("{symbol} is already tracked")),
            Err(e) => self.board.set_status(format!("Error add symbol: {e}")),
        }
    }

    fn after_ledger_change(&mut self, symbols: &[&str]) {
        for symbol in symbols {
            self.plots.invalidate(symbol);
        }
        self.nav.clamp(&self.ledger);
        self.persist();
    }

    /// Write the whole snapshot. Failure is reported, never raised.
    pub fn persist(&mut self) {
        let snapshot = Snapshot::capture(
            &self.ledger,
            self.board.snapshot(),
            self.board.last_update(),
        );
        match self.store.save_snapshot(&snapshot) {
            Ok(()) => tracing::debug!("snapshot saved"),
            Err(e) => {
                tracing::error!(error = %e, "failed to save snapshot");
                self.board.set_status(format!("Error save data: {e}"));
            }
        }
    }

    pub fn refresh_candles(&mut self, symbol: &str, now: Instant) {
        self.last_candle_fetch = Some(now);
        let outcome = self
            .candles
            .refresh(symbol, self.gateway.as_ref(), self.store.as_ref());
        match outcome {
            RefreshOutcome::Updated {
                close_changed,
                persist_error,
            } => {
                if close_changed {
                    self.plots.invalidate(symbol);
                }
                match persist_error {
                    Some(e) => self.board.set_status(format!("Error save candles: {e}")),
                    None => self.board.set_status(format!("Ok candles {symbol}")),
                }
            }
            RefreshOutcome::Failed(reason) => {
                self.board.set_status(format!("Error fetch candles: {reason}"));
            }
        }
    }

    /// Periodic work between key presses: refresh the visible symbol's
    /// candles once the fetch interval has passed.
    pub fn tick(&mut self, now: Instant) {
        if !matches!(self.nav.screen(), Screen::Trading | Screen::Fullscreen { .. }) {
            return;
        }
        let due = self.last_candle_fetch.is_none_or(|last| {
            now.saturating_duration_since(last) >= self.config.chart.candle_fetch_interval
        });
        if let (true, Some(symbol)) = (due, self.active_symbol().map(str::to_string)) {
            self.refresh_candles(&symbol, now);
        }
    }

    pub fn candles(&mut self, symbol: &str) -> &[Candle] {
        self.candles.get(symbol, self.store.as_ref())
    }

    /// Cached chart rows for the active symbol at the given viewport.
    pub fn chart_rows(&mut self, mode: ChartMode, height: usize, width: usize) -> Vec<String> {
        self.chart_rows_at(mode, height, width, Instant::now())
    }

    pub fn chart_rows_at(
        &mut self,
        mode: ChartMode,
        height: usize,
        width: usize,
        now: Instant,
    ) -> Vec<String> {
        let Some(symbol) = self.active_symbol().map(str::to_string) else {
            return Vec::new();
        };
        let window = self.candles.get(&symbol, self.store.as_ref());
        let shown = match mode {
            ChartMode::Fullscreen => self.config.chart.fullscreen_candles,
            ChartMode::Mini => MIN_WINDOW,
        };
        let candles = &window[window.len().saturating_sub(shown)..];
        self.plots
            .get_or_build_at(&symbol, mode, height, width, candles, &self.renderer, now)
            .to_vec()
    }

    /// Stop the poller. The thread exits once it notices the closed channel.
    pub fn shutdown(&mut self) {
        self.poller.take();
    }
}
