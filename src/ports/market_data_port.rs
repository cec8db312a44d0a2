//! Market data access port trait.

use crate::domain::candle::Candle;
use crate::domain::error::SpotsimError;
use crate::domain::ticker::Ticker;

/// Remote source of tickers and candles. Latency is unbounded; callers must
/// not assume a timely response.
pub trait MarketDataPort: Send + Sync {
    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, SpotsimError>;

    /// Candles in ascending timestamp order, at most `limit` of them.
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, SpotsimError>;
}
