//! Binance public REST market data over blocking HTTP.

use crate::domain::candle::Candle;
use crate::domain::config::GatewayConfig;
use crate::domain::error::SpotsimError;
use crate::domain::symbol::split_symbol;
use crate::domain::ticker::Ticker;
use crate::ports::market_data_port::MarketDataPort;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

/// `/api/v3/ticker/24hr` response; Binance sends numbers as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker {
    last_price: String,
    price_change_percent: String,
    high_price: String,
    low_price: String,
    volume: String,
    #[serde(default)]
    close_time: Option<i64>,
}

pub struct BinanceAdapter {
    client: Client,
    base_url: String,
}

impl BinanceAdapter {
    pub fn new(config: &GatewayConfig) -> Result<Self, SpotsimError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("spotsim/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SpotsimError::gateway("*", format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(
        &self,
        symbol: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, SpotsimError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| SpotsimError::gateway(symbol, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SpotsimError::gateway(
                symbol,
                format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            ));
        }
        response
            .json::<Value>()
            .map_err(|e| SpotsimError::gateway(symbol, format!("invalid JSON: {e}")))
    }
}

/// `BTC/USDT` → `BTCUSDT`.
pub fn exchange_symbol(symbol: &str) -> Result<String, SpotsimError> {
    let (base, quote) = split_symbol(symbol)?;
    Ok(format!("{base}{quote}"))
}

fn parse_decimal(symbol: &str, field: &str, raw: &str) -> Result<f64, SpotsimError> {
    raw.parse()
        .map_err(|e| SpotsimError::gateway(symbol, format!("invalid {field} {raw:?}: {e}")))
}

pub fn parse_ticker(symbol: &str, body: Value) -> Result<Ticker, SpotsimError> {
    let raw: BinanceTicker = serde_json::from_value(body)
        .map_err(|e| SpotsimError::gateway(symbol, format!("unexpected ticker payload: {e}")))?;
    Ok(Ticker {
        symbol: symbol.to_string(),
        last: Some(parse_decimal(symbol, "lastPrice", &raw.last_price)?),
        percentage: Some(parse_decimal(
            symbol,
            "priceChangePercent",
            &raw.price_change_percent,
        )?),
        high: Some(parse_decimal(symbol, "highPrice", &raw.high_price)?),
        low: Some(parse_decimal(symbol, "lowPrice", &raw.low_price)?),
        volume: Some(parse_decimal(symbol, "volume", &raw.volume)?),
        timestamp: raw.close_time,
    })
}

fn kline_number(symbol: &str, row: &[Value], index: usize) -> Result<f64, SpotsimError> {
    match row.get(index) {
        Some(Value::String(s)) => parse_decimal(symbol, "kline value", s),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| SpotsimError::gateway(symbol, "kline value out of range")),
        _ => Err(SpotsimError::gateway(
            symbol,
            format!("kline column {index} missing"),
        )),
    }
}

/// Klines arrive as `[openTime, open, high, low, close, volume, ...]` rows.
pub fn parse_klines(symbol: &str, body: Value) -> Result<Vec<Candle>, SpotsimError> {
    let Value::Array(rows) = body else {
        return Err(SpotsimError::gateway(symbol, "klines payload is not an array"));
    };
    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Array(row) = row else {
            return Err(SpotsimError::gateway(symbol, "kline row is not an array"));
        };
        let timestamp = row
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| SpotsimError::gateway(symbol, "kline open time missing"))?;
        candles.push(Candle {
            timestamp,
            open: kline_number(symbol, &row, 1)?,
            high: kline_number(symbol, &row, 2)?,
            low: kline_number(symbol, &row, 3)?,
            close: kline_number(symbol, &row, 4)?,
            volume: kline_number(symbol, &row, 5)?,
        });
    }
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

impl MarketDataPort for BinanceAdapter {
    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, SpotsimError> {
        let pair = exchange_symbol(symbol)?;
        let body = self.get(symbol, "/api/v3/ticker/24hr", &[("symbol", pair)])?;
        parse_ticker(symbol, body)
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, SpotsimError> {
        let pair = exchange_symbol(symbol)?;
        let body = self.get(
            symbol,
            "/api/v3/klines",
            &[
                ("symbol", pair),
                ("interval", timeframe.to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        parse_klines(symbol, body)
    }
}
