//! Whole-document persisted state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::ledger::{Ledger, Order};
use super::ticker::Ticker;

/// Every key is optional on load; absent keys fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    #[serde(default, rename = "balance", skip_serializing_if = "BTreeMap::is_empty")]
    pub balances: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_orders: Vec<Order>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tickers: HashMap<String, Ticker>,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
}

impl Snapshot {
    pub fn capture(
        ledger: &Ledger,
        tickers: HashMap<String, Ticker>,
        last_update: Option<String>,
    ) -> Self {
        Snapshot {
            symbols: ledger.symbols.clone(),
            balances: ledger.balances.clone(),
            open_orders: ledger.open_orders.clone(),
            tickers,
            pnl: ledger.pnl,
            last_update,
        }
    }

    /// Overlay the persisted ledger parts onto `defaults`. Empty collections
    /// in the snapshot leave the defaults in place.
    pub fn apply_to(&self, defaults: &mut Ledger) {
        if !self.symbols.is_empty() {
            defaults.symbols = self.symbols.clone();
        }
        if !self.balances.is_empty() {
            defaults.balances = self.balances.clone();
        }
        defaults.open_orders = self.open_orders.clone();
        defaults.pnl = self.pnl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::Side;

    #[test]
    fn legacy_document_loads() {
        let json = r#"{
            "symbols": ["BTC/USDT"],
            "balance": {"USDT": 850.0, "BTC": 1.5},
            "open_orders": [{"side": "s", "amount": 1.0, "price": 2.0, "symbol": "BTC/USDT"}],
            "tickers": {"BTC/USDT": {"last": 42000.0, "percentage": -1.2, "info": {}}},
            "pnl": 0,
            "last_update": "2025-01-01 10:00:00"
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.symbols, vec!["BTC/USDT"]);
        assert_eq!(snapshot.balances.get("USDT"), Some(&850.0));
        assert_eq!(snapshot.open_orders[0].side, Side::Sell);
        assert_eq!(snapshot.tickers["BTC/USDT"].last, Some(42000.0));
        assert_eq!(snapshot.last_update.as_deref(), Some("2025-01-01 10:00:00"));
    }

    #[test]
    fn empty_document_is_default() {
        let snapshot: Snapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn apply_keeps_defaults_for_missing_parts() {
        let mut ledger = Ledger::new(vec!["BTC/USDT".into()], 1000.0);
        let snapshot = Snapshot {
            pnl: 12.5,
            ..Snapshot::default()
        };
        snapshot.apply_to(&mut ledger);
        assert_eq!(ledger.symbols, vec!["BTC/USDT"]);
        assert_eq!(ledger.balance("USDT"), 1000.0);
        assert_eq!(ledger.pnl, 12.5);
    }

    #[test]
    fn capture_copies_ledger() {
        let mut ledger = Ledger::new(vec!["BTC/USDT".into()], 1000.0);
        ledger.place_order(Side::Buy, 1.0, 10.0, "BTC/USDT").unwrap();
        let snapshot = Snapshot::capture(&ledger, HashMap::new(), None);
        assert_eq!(snapshot.open_orders.len(), 1);
        assert_eq!(snapshot.balances.get("USDT"), Some(&990.0));

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"balance\""));
        assert!(json.contains("\"side\":\"buy\""));
    }
}
