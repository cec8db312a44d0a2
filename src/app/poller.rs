//! Background ticker refresh for every watched symbol.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::domain::backoff::Backoff;
use crate::domain::config::PollerConfig;
use crate::domain::ticker::TickerBoard;
use crate::ports::market_data_port::MarketDataPort;

/// Outcome of one pass over the watch list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
}

pub struct PricePoller {
    gateway: Arc<dyn MarketDataPort>,
    board: TickerBoard,
    config: PollerConfig,
}

/// Owned by the UI loop. Dropping it disconnects the wake channel, which
/// ends the poller thread after its current pass.
pub struct PollerHandle {
    wake: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Ask for an immediate pass. Never blocks.
    pub fn wake(&self) {
        if self.wake.send(()).is_err() {
            tracing::warn!("price poller is no longer running");
        }
    }
}

impl PricePoller {
    pub fn new(
        gateway: Arc<dyn MarketDataPort>,
        board: TickerBoard,
        config: PollerConfig,
    ) -> Self {
        Self {
            gateway,
            board,
            config,
        }
    }

    /// Fetch every watched symbol once, retrying each with backoff. `sleep`
    /// is called between attempts so tests can run without waiting.
    pub fn run_pass(
        &self,
        backoff: &mut Backoff,
        sleep: &mut dyn FnMut(Duration),
    ) -> PassReport {
        let mut report = PassReport::default();
        let watched = self.board.watched();

        for symbol in watched.iter() {
            self.board.set_status(format!("Getting ticker {symbol}..."));
            let mut attempt = 0;
            loop {
                attempt += 1;
                match self.gateway.fetch_ticker(symbol) {
                    Ok(ticker) => {
                        backoff.reset();
                        self.board.publish(symbol, ticker);
                        self.board.set_status(format!("Ok get ticker {symbol}"));
                        report.updated.push(symbol.clone());
                        break;
                    }
                    Err(e) if attempt >= self.config.max_attempts => {
                        tracing::warn!(
                            %symbol,
                            attempts = attempt,
                            error = %e,
                            "giving up on ticker"
                        );
                        self.board.set_status(format!("Error get ticker {symbol}: {e}"));
                        report.failed.push(symbol.clone());
                        break;
                    }
                    Err(e) => {
                        let delay = backoff.next_delay();
                        tracing::debug!(
                            %symbol,
                            attempt,
                            ?delay,
                            error = %e,
                            "ticker fetch failed, retrying"
                        );
                        sleep(delay);
                    }
                }
            }
        }

        tracing::debug!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "ticker pass complete"
        );
        report
    }

    fn run(self, wake: Receiver<()>) {
        let mut backoff = Backoff::new(self.config.backoff_base, self.config.backoff_cap);
        tracing::info!(interval = ?self.config.pass_interval, "price poller started");
        loop {
            self.run_pass(&mut backoff, &mut thread::sleep);
            match wake.recv_timeout(self.config.pass_interval) {
                Ok(()) => {
                    // Collapse repeated wake requests into one pass.
                    while wake.try_recv().is_ok() {}
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::info!("price poller stopped");
    }

    pub fn spawn(self) -> std::io::Result<PollerHandle> {
        let (wake, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("price-poller".into())
            .spawn(move || self.run(rx))?;
        Ok(PollerHandle {
            wake,
            thread: Some(thread),
        })
    }
}
