//! Valuation of vault holdings in the common currency.
//!
//! The safe asset is the unit of account (price fixed at 1.0); every other
//! token is valued at `quantity × price`.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::registry::AssetRegistry;
use crate::symbol::Symbol;

/// Quantity held per symbol, in native (human-readable) units.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Holdings {
    entries: Vec<(Symbol, f64)>,
}

impl Holdings {
    /// Build holdings from `(symbol, quantity)` pairs.
    ///
    /// Quantities must be finite and non-negative; symbols must be known to
    /// the registry and appear at most once.
    pub fn new(registry: &AssetRegistry, entries: Vec<(Symbol, f64)>) -> Result<Self> {
        for (i, &(symbol, quantity)) in entries.iter().enumerate() {
            registry.check(symbol)?;
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(Error::InvalidQuantity { symbol, quantity });
            }
            if entries[..i].iter().any(|&(other, _)| other == symbol) {
                return Err(Error::DuplicateSymbol(symbol));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, symbol: Symbol) -> Option<f64> {
        self.entries
            .iter()
            .find(|&&(sym, _)| sym == symbol)
            .map(|&(_, qty)| qty)
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.get(symbol).is_some()
    }

    /// `(symbol, quantity)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `delta` to the quantity of `symbol`, inserting it if absent.
    /// Results below zero are clamped to zero.
    pub(crate) fn adjust(&mut self, symbol: Symbol, delta: f64) {
        match self.entries.iter_mut().find(|(sym, _)| *sym == symbol) {
            Some((_, qty)) => *qty = (*qty + delta).max(0.0),
            None => self.entries.push((symbol, delta.max(0.0))),
        }
    }
}

/// Unit price per symbol in the common currency.
///
/// The safe asset always prices at 1.0; an explicit safe-asset entry is
/// ignored.
#[derive(Debug, Clone)]
pub struct PriceTable {
    safe: Symbol,
    prices: FxHashMap<Symbol, f64>,
}

impl PriceTable {
    /// Build a price table from `(symbol, price)` pairs.
    pub fn new(registry: &AssetRegistry, prices: Vec<(Symbol, f64)>) -> Result<Self> {
        let safe = registry.safe();
        let mut map = FxHashMap::default();
        for (symbol, price) in prices {
            registry.check(symbol)?;
            if symbol == safe {
                continue;
            }
            if !price.is_finite() || price <= 0.0 {
                return Err(Error::InvalidPrice { symbol, price });
            }
            if map.insert(symbol, price).is_some() {
                return Err(Error::DuplicateSymbol(symbol));
            }
        }
        Ok(Self { safe, prices: map })
    }

    /// Unit price of `symbol`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingPrice`] if `symbol` is not the safe asset and has no entry.
    pub fn price(&self, symbol: Symbol) -> Result<f64> {
        if symbol == self.safe {
            return Ok(1.0);
        }
        self.prices
            .get(&symbol)
            .copied()
            .ok_or(Error::MissingPrice(symbol))
    }

    pub fn safe(&self) -> Symbol {
        self.safe
    }
}

/// Per-token common-currency values and their total.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Valuation {
    pub per_token: Vec<(Symbol, f64)>,
    pub total: f64,
}

impl Valuation {
    /// Currency value of `symbol`, if held.
    pub fn get(&self, symbol: Symbol) -> Option<f64> {
        self.per_token
            .iter()
            .find(|&&(sym, _)| sym == symbol)
            .map(|&(_, v)| v)
    }

    /// Current share of each holding as a percentage (0–100).
    ///
    /// Every share is 0 for an empty (zero-value) vault.
    pub fn weights(&self) -> Vec<(Symbol, f64)> {
        self.per_token
            .iter()
            .map(|&(sym, value)| {
                let pct = if self.total > 0.0 {
                    value / self.total * 100.0
                } else {
                    0.0
                };
                (sym, pct)
            })
            .collect()
    }
}

/// Value every holding in the common currency.
///
/// # Errors
///
/// [`Error::MissingPrice`] for the first non-safe holding without a price.
pub fn value_in_common_currency(holdings: &Holdings, prices: &PriceTable) -> Result<Valuation> {
    let mut per_token = Vec::with_capacity(holdings.len());
    let mut total = 0.0;

    for (symbol, quantity) in holdings.iter() {
        let value = quantity * prices.price(symbol)?;
        per_token.push((symbol, value));
        total += value;
    }

    Ok(Valuation { per_token, total })
}
