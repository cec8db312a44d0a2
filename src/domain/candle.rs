//! OHLCV candle representation.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Smallest window the store ever keeps per symbol.
pub const MIN_WINDOW: usize = 16;

/// Timestamps below this are epoch seconds, above it epoch milliseconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time, epoch milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn is_bearish(&self) -> bool {
        self.open > self.close
    }

    /// `HH:MM` of the bucket open in local time.
    pub fn time_label(&self) -> String {
        format_time_label(self.timestamp)
    }
}

/// Format an epoch timestamp (seconds or milliseconds) as local `HH:MM`.
pub fn format_time_label(timestamp: i64) -> String {
    let millis = if timestamp.abs() < MILLIS_THRESHOLD {
        timestamp.saturating_mul(1000)
    } else {
        timestamp
    };
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => timestamp.to_string(),
    }
}

/// Close of the newest candle in an ascending window.
pub fn last_close(candles: &[Candle]) -> Option<f64> {
    candles.last().map(|c| c.close)
}

/// Sort ascending by timestamp and keep only the newest `len` candles.
pub fn trim_window(mut candles: Vec<Candle>, len: usize) -> Vec<Candle> {
    candles.sort_by_key(|c| c.timestamp);
    if candles.len() > len {
        candles.drain(..candles.len() - len);
    }
    candles
}

/// Tight vertical bounds: `(min(low), max(high))` over the window.
pub fn price_bounds(candles: &[Candle]) -> Option<(f64, f64)> {
    if candles.is_empty() {
        return None;
    }
    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);
    Some((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: ts,
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn bearish_when_open_above_close() {
        assert!(candle(0, 10.0, 12.0, 8.0, 9.0).is_bearish());
        assert!(!candle(0, 10.0, 12.0, 8.0, 10.0).is_bearish());
        assert!(!candle(0, 9.0, 12.0, 8.0, 10.0).is_bearish());
    }

    #[test]
    fn trim_window_keeps_newest_in_order() {
        let candles = vec![
            candle(3, 1.0, 1.0, 1.0, 3.0),
            candle(1, 1.0, 1.0, 1.0, 1.0),
            candle(4, 1.0, 1.0, 1.0, 4.0),
            candle(2, 1.0, 1.0, 1.0, 2.0),
        ];
        let trimmed = trim_window(candles, 2);
        let stamps: Vec<i64> = trimmed.iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![3, 4]);
    }

    #[test]
    fn trim_window_shorter_than_limit_is_untouched() {
        let trimmed = trim_window(vec![candle(1, 1.0, 1.0, 1.0, 1.0)], 16);
        assert_eq!(trimmed.len(), 1);
    }

    #[test]
    fn price_bounds_are_tight() {
        let candles = vec![
            candle(1, 10.0, 15.0, 9.0, 11.0),
            candle(2, 11.0, 13.0, 7.5, 12.0),
        ];
        assert_eq!(price_bounds(&candles), Some((7.5, 15.0)));
        assert_eq!(price_bounds(&[]), None);
    }

    #[test]
    fn last_close_of_empty_window_is_none() {
        assert_eq!(last_close(&[]), None);
        assert_eq!(last_close(&[candle(1, 1.0, 2.0, 0.5, 1.5)]), Some(1.5));
    }

    #[test]
    fn seconds_and_millis_give_same_label() {
        assert_eq!(
            format_time_label(1_700_000_000),
            format_time_label(1_700_000_000_000)
        );
        assert_eq!(format_time_label(1_700_000_000_000).len(), 5);
    }
}
