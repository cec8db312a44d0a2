//! Simulated balances, open orders and the tracked symbol list.
//!
//! Placing an order applies its balance delta immediately. Removing an order
//! (edit, delete, delete all) never reverses that delta: balances reflect the
//! cumulative effect of every order ever placed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::SpotsimError;
use super::symbol::split_symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "b")]
    Buy,
    #[serde(alias = "s")]
    Sell,
}

impl Side {
    /// Parse the one-letter form typed into the order form.
    pub fn from_key(key: &str) -> Option<Side> {
        match key {
            "b" | "B" => Some(Side::Buy),
            "s" | "S" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Side::Buy => "b",
            Side::Sell => "s",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub side: Side,
    pub amount: f64,
    pub price: f64,
    pub symbol: String,
    #[serde(default, alias = "tp", skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default, alias = "sl", skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
}

impl Order {
    pub fn limit(side: Side, amount: f64, price: f64, symbol: &str) -> Self {
        Order {
            side,
            amount,
            price,
            symbol: symbol.to_string(),
            take_profit: None,
            stop_loss: None,
        }
    }

    pub fn notional(&self) -> f64 {
        self.amount * self.price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub symbols: Vec<String>,
    pub balances: BTreeMap<String, f64>,
    pub open_orders: Vec<Order>,
    pub pnl: f64,
}

impl Ledger {
    /// A fresh ledger holding `quote_balance` of the quote currency of the
    /// first symbol and a zero entry for every base currency.
    pub fn new(symbols: Vec<String>, quote_balance: f64) -> Self {
        let mut balances = BTreeMap::new();
        for symbol in &symbols {
            if let Ok((base, quote)) = split_symbol(symbol) {
                balances.entry(quote.to_string()).or_insert(0.0);
                balances.entry(base.to_string()).or_insert(0.0);
            }
        }
        if let Some(quote) = symbols
            .first()
            .and_then(|s| split_symbol(s).ok())
            .map(|(_, q)| q.to_string())
        {
            balances.insert(quote, quote_balance);
        }
        Ledger {
            symbols,
            balances,
            open_orders: Vec::new(),
            pnl: 0.0,
        }
    }

    pub fn balance(&self, currency: &str) -> f64 {
        self.balances.get(currency).copied().unwrap_or(0.0)
    }

    pub fn order_count(&self) -> usize {
        self.open_orders.len()
    }

    pub fn place_order(
        &mut self,
        side: Side,
        amount: f64,
        price: f64,
        symbol: &str,
    ) -> Result<(), SpotsimError> {
        self.submit(Order::limit(side, amount, price, symbol))
    }

    /// Append an order and apply its simulated balance delta. Balances are
    /// allowed to go negative.
    pub fn submit(&mut self, order: Order) -> Result<(), SpotsimError> {
        if !order.amount.is_finite() || !order.price.is_finite() {
            return Err(SpotsimError::InvalidOrder {
                reason: "amount and price must be finite".into(),
            });
        }
        let (base, quote) = split_symbol(&order.symbol)?;
        let notional = order.notional();
        let (quote_delta, base_delta) = match order.side {
            Side::Buy => (-notional, order.amount),
            Side::Sell => (notional, -order.amount),
        };
        *self.balances.entry(quote.to_string()).or_insert(0.0) += quote_delta;
        *self.balances.entry(base.to_string()).or_insert(0.0) += base_delta;
        self.open_orders.push(order);
        Ok(())
    }

    /// Replace the order at `index`. The replaced order's balance effect stays.
    pub fn edit_order(&mut self, index: usize, replacement: Order) -> Result<Order, SpotsimError> {
        split_symbol(&replacement.symbol)?;
        let old = self.delete_order(index)?;
        if let Err(e) = self.submit(replacement) {
            self.open_orders.insert(index, old);
            return Err(e);
        }
        Ok(old)
    }

    pub fn delete_order(&mut self, index: usize) -> Result<Order, SpotsimError> {
        if index >= self.open_orders.len() {
            return Err(SpotsimError::OrderNotFound { index });
        }
        Ok(self.open_orders.remove(index))
    }

    pub fn delete_all(&mut self) -> Vec<Order> {
        std::mem::take(&mut self.open_orders)
    }

    /// Track a new symbol. Returns `false` when it is already tracked.
    pub fn add_symbol(&mut self, symbol: &str) -> Result<bool, SpotsimError> {
        let (base, _) = split_symbol(symbol)?;
        self.balances.entry(base.to_string()).or_insert(0.0);
        if self.symbols.iter().any(|s| s == symbol) {
            return Ok(false);
        }
        self.symbols.push(symbol.to_string());
        Ok(true)
    }

    /// Stop tracking a symbol. Its balance entry is kept.
    pub fn remove_symbol(&mut self, symbol: &str) -> bool {
        match self.symbols.iter().position(|s| s == symbol) {
            Some(pos) => {
                self.symbols.remove(pos);
                true
            }
            None => false,
        }
    }
}
