//! Trading pair symbols of the form `BASE/QUOTE`.

use crate::domain::error::SpotsimError;
use std::collections::HashSet;

/// Split `"BTC/USDT"` into `("BTC", "USDT")`.
pub fn split_symbol(symbol: &str) -> Result<(&str, &str), SpotsimError> {
    let invalid = || SpotsimError::InvalidSymbol {
        symbol: symbol.to_string(),
    };
    let (base, quote) = symbol.split_once('/').ok_or_else(invalid)?;
    if base.is_empty() || quote.is_empty() || quote.contains('/') {
        return Err(invalid());
    }
    Ok((base, quote))
}

pub fn base_currency(symbol: &str) -> Option<&str> {
    split_symbol(symbol).ok().map(|(base, _)| base)
}

/// Normalize operator input: trimmed and upper-cased, then validated.
pub fn normalize_symbol(input: &str) -> Result<String, SpotsimError> {
    let symbol = input.trim().to_uppercase();
    split_symbol(&symbol)?;
    Ok(symbol)
}

/// Parse a comma separated symbol list, dropping duplicates.
pub fn parse_symbol_list(input: &str) -> Result<Vec<String>, SpotsimError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        if token.trim().is_empty() {
            continue;
        }
        let symbol = normalize_symbol(token)?;
        if seen.insert(symbol.clone()) {
            symbols.push(symbol);
        }
    }

    Ok(symbols)
}

/// File-system friendly form: `BTC/USDT` → `BTC_USDT`.
pub fn file_stem(symbol: &str) -> String {
    symbol.replace('/', "_")
}
