//! Session configuration and its validation.
//!
//! Every key is optional. Values are read through [`ConfigPort`] and checked
//! before the session starts so a bad file fails fast with `ConfigInvalid`.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::candle::MIN_WINDOW;
use crate::domain::error::SpotsimError;
use crate::domain::symbol::parse_symbol_list;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_SYMBOLS: &str = "BTC/USDT,ETH/USDT,LTC/USDT";
const TIMEFRAMES: [&str; 8] = ["1m", "3m", "5m", "15m", "30m", "1h", "4h", "1d"];
/// Most candles a single klines request returns.
pub const MAX_CANDLES: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub refresh_interval: Duration,
    pub candle_fetch_interval: Duration,
    pub fullscreen_candles: usize,
    pub mini_chart_height: usize,
    pub timeframe: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub pass_interval: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Relative paths resolve inside the data directory.
    pub file: PathBuf,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub quote_balance: f64,
    pub symbols: Vec<String>,
    pub chart: ChartConfig,
    pub poller: PollerConfig,
    pub tick: Duration,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: PathBuf::from("data"),
            quote_balance: 1000.0,
            symbols: DEFAULT_SYMBOLS.split(',').map(str::to_string).collect(),
            chart: ChartConfig {
                refresh_interval: Duration::from_secs(30),
                candle_fetch_interval: Duration::from_secs(30),
                fullscreen_candles: MIN_WINDOW,
                mini_chart_height: 30,
                timeframe: "15m".to_string(),
            },
            poller: PollerConfig {
                pass_interval: Duration::from_secs(10),
                backoff_base: Duration::from_millis(100),
                backoff_cap: Duration::from_secs(3),
                max_attempts: 5,
            },
            tick: Duration::from_millis(300),
            gateway: GatewayConfig {
                base_url: "https://api.binance.com".to_string(),
                timeout: Duration::from_secs(15),
            },
            logging: LoggingConfig {
                file: PathBuf::from("spotsim.log"),
                level: "info".to_string(),
            },
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SpotsimError {
    SpotsimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: u64,
) -> Result<u64, SpotsimError> {
    let value = config.get_int(section, key, default as i64);
    if value <= 0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value as u64)
}

fn non_empty_string(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl AppConfig {
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, SpotsimError> {
        let defaults = AppConfig::default();

        let data_dir = non_empty_string(config, "app", "data_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let quote_balance = config.get_double("app", "quote_balance", defaults.quote_balance);
        if !quote_balance.is_finite() || quote_balance < 0.0 {
            return Err(invalid(
                "app",
                "quote_balance",
                "quote_balance must be a non-negative number",
            ));
        }

        let symbols = match non_empty_string(config, "app", "symbols") {
            Some(list) => parse_symbol_list(&list)
                .map_err(|e| invalid("app", "symbols", e.to_string()))?,
            None => defaults.symbols,
        };

        Ok(AppConfig {
            data_dir,
            quote_balance,
            symbols,
            chart: chart_config(config)?,
            poller: poller_config(config)?,
            tick: Duration::from_millis(positive_int(config, "ui", "tick_ms", 300)?),
            gateway: gateway_config(config)?,
            logging: logging_config(config)?,
        })
    }

    /// Log file location with relative paths anchored at the data directory.
    pub fn log_path(&self) -> PathBuf {
        if self.logging.file.is_absolute() {
            self.logging.file.clone()
        } else {
            self.data_dir.join(&self.logging.file)
        }
    }
}

fn chart_config(config: &dyn ConfigPort) -> Result<ChartConfig, SpotsimError> {
    let timeframe = non_empty_string(config, "chart", "timeframe").unwrap_or_else(|| "15m".into());
    if !TIMEFRAMES.contains(&timeframe.as_str()) {
        return Err(invalid(
            "chart",
            "timeframe",
            format!("unsupported timeframe {timeframe:?}"),
        ));
    }

    let mini_chart_height = positive_int(config, "chart", "mini_chart_height", 30)?;
    if mini_chart_height < 2 {
        return Err(invalid(
            "chart",
            "mini_chart_height",
            "mini_chart_height must be at least 2",
        ));
    }

    let fullscreen_candles =
        positive_int(config, "chart", "fullscreen_candles", MIN_WINDOW as u64)?;
    if fullscreen_candles > MAX_CANDLES {
        return Err(invalid(
            "chart",
            "fullscreen_candles",
            format!("fullscreen_candles must be at most {MAX_CANDLES}"),
        ));
    }

    Ok(ChartConfig {
        refresh_interval: Duration::from_secs(positive_int(
            config,
            "chart",
            "refresh_interval_secs",
            30,
        )?),
        candle_fetch_interval: Duration::from_secs(positive_int(
            config,
            "chart",
            "candle_fetch_interval_secs",
            30,
        )?),
        fullscreen_candles: fullscreen_candles as usize,
        mini_chart_height: mini_chart_height as usize,
        timeframe,
    })
}

fn poller_config(config: &dyn ConfigPort) -> Result<PollerConfig, SpotsimError> {
    let backoff_base = positive_int(config, "poller", "backoff_base_ms", 100)?;
    let backoff_cap = positive_int(config, "poller", "backoff_cap_ms", 3000)?;
    if backoff_cap < backoff_base {
        return Err(invalid(
            "poller",
            "backoff_cap_ms",
            "backoff_cap_ms must not be below backoff_base_ms",
        ));
    }
    let max_attempts = positive_int(config, "poller", "max_attempts", 5)?;
    Ok(PollerConfig {
        pass_interval: Duration::from_secs(positive_int(
            config,
            "poller",
            "pass_interval_secs",
            10,
        )?),
        backoff_base: Duration::from_millis(backoff_base),
        backoff_cap: Duration::from_millis(backoff_cap),
        max_attempts: u32::try_from(max_attempts)
            .map_err(|_| invalid("poller", "max_attempts", "max_attempts is too large"))?,
    })
}

fn gateway_config(config: &dyn ConfigPort) -> Result<GatewayConfig, SpotsimError> {
    let base_url = non_empty_string(config, "gateway", "base_url")
        .unwrap_or_else(|| "https://api.binance.com".into());
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(
            "gateway",
            "base_url",
            "base_url must start with http:// or https://",
        ));
    }
    Ok(GatewayConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        timeout: Duration::from_secs(positive_int(config, "gateway", "timeout_secs", 15)?),
    })
}

fn logging_config(config: &dyn ConfigPort) -> Result<LoggingConfig, SpotsimError> {
    let level = non_empty_string(config, "logging", "level")
        .unwrap_or_else(|| "info".into())
        .to_lowercase();
    if !["trace", "debug", "info", "warn", "error", "off"].contains(&level.as_str()) {
        return Err(invalid(
            "logging",
            "level",
            format!("unknown log level {level:?}"),
        ));
    }
    Ok(LoggingConfig {
        file: non_empty_string(config, "logging", "file")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("spotsim.log")),
        level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            MapConfig(
                entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            )
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }

        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    fn assert_invalid(result: Result<AppConfig, SpotsimError>, expected_key: &str) {
        match result {
            Err(SpotsimError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_yields_defaults() {
        let config = AppConfig::from_port(&MapConfig::new(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.symbols.len(), 3);
        assert_eq!(config.log_path(), PathBuf::from("data/spotsim.log"));
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_port(&MapConfig::new(&[
            ("app", "data_dir", "/tmp/spot"),
            ("app", "symbols", "sol/usdt, btc/usdt,SOL/USDT"),
            ("app", "quote_balance", "250.5"),
            ("chart", "fullscreen_candles", "40"),
            ("chart", "timeframe", "1h"),
            ("poller", "max_attempts", "3"),
            ("gateway", "base_url", "http://localhost:9000/"),
            ("logging", "level", "DEBUG"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/spot"));
        assert_eq!(config.symbols, vec!["SOL/USDT", "BTC/USDT"]);
        assert_eq!(config.quote_balance, 250.5);
        assert_eq!(config.chart.fullscreen_candles, 40);
        assert_eq!(config.chart.timeframe, "1h");
        assert_eq!(config.poller.max_attempts, 3);
        assert_eq!(config.gateway.base_url, "http://localhost:9000");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn rejects_bad_symbol_list() {
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[("app", "symbols", "BTCUSDT")])),
            "symbols",
        );
    }

    #[test]
    fn rejects_non_positive_intervals() {
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[("poller", "pass_interval_secs", "0")])),
            "pass_interval_secs",
        );
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[("ui", "tick_ms", "-5")])),
            "tick_ms",
        );
    }

    #[test]
    fn fullscreen_candles_is_capped_at_one_request() {
        let config =
            AppConfig::from_port(&MapConfig::new(&[("chart", "fullscreen_candles", "1000")]))
                .unwrap();
        assert_eq!(config.chart.fullscreen_candles, 1000);
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[("chart", "fullscreen_candles", "1001")])),
            "fullscreen_candles",
        );
    }

    #[test]
    fn rejects_cap_below_base() {
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[
                ("poller", "backoff_base_ms", "500"),
                ("poller", "backoff_cap_ms", "100"),
            ])),
            "backoff_cap_ms",
        );
    }

    #[test]
    fn rejects_unknown_timeframe_and_level() {
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[("chart", "timeframe", "7m")])),
            "timeframe",
        );
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[("logging", "level", "loud")])),
            "level",
        );
    }

    #[test]
    fn rejects_negative_balance_and_bad_url() {
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[("app", "quote_balance", "-1")])),
            "quote_balance",
        );
        assert_invalid(
            AppConfig::from_port(&MapConfig::new(&[("gateway", "base_url", "ftp://x")])),
            "base_url",
        );
    }

    #[test]
    fn absolute_log_path_is_kept() {
        let config = AppConfig::from_port(&MapConfig::new(&[(
            "logging",
            "file",
            "/var/log/spotsim.log",
        )]))
        .unwrap();
        assert_eq!(config.log_path(), PathBuf::from("/var/log/spotsim.log"));
    }
}
