//! Vault snapshot (snapshot.json): balances and prices captured upstream.
//!
//! The balance reader and price oracle run outside the rebalancer; their
//! output for one cycle is handed over as a single snapshot document.

use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use vaultbook::{AssetRegistry, Holdings, PriceTable};

use crate::error::{Error, Result};

/// Balances and prices of one vault at one point in time.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultSnapshot {
    pub timestamp: DateTime<Utc>,
    pub balances: Vec<Balance>,
    #[serde(default)]
    pub prices: Vec<Quote>,
}

/// A token balance, either in native units or as a raw base-unit integer.
#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    pub symbol: String,
    #[serde(default)]
    pub amount: Option<f64>,
    /// Raw `balanceOf` result as a decimal string (may exceed `u64`).
    #[serde(default)]
    pub raw_amount: Option<String>,
}

/// Unit price of a token in the common currency.
#[derive(Debug, Clone, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
}

impl VaultSnapshot {
    /// Load a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::SnapshotRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: VaultSnapshot = serde_json::from_str(json)?;
        if snapshot.balances.is_empty() {
            return Err(Error::Snapshot("balances list is empty".into()));
        }
        Ok(snapshot)
    }

    /// Holdings in native units, raw balances scaled by the registry decimals.
    ///
    /// Every registry asset gets an entry; assets missing from `balances`
    /// are held at zero.
    pub fn holdings(&self, registry: &AssetRegistry) -> Result<Holdings> {
        let mut entries = Vec::with_capacity(self.balances.len());
        for b in &self.balances {
            let symbol = registry.resolve(&b.symbol)?;
            let quantity = match (b.amount, &b.raw_amount) {
                (Some(amount), None) => amount,
                (None, Some(raw)) => {
                    let raw: u128 = raw.trim().parse().map_err(|_| {
                        Error::Snapshot(format!("raw_amount {raw:?} for {} is not an integer", b.symbol))
                    })?;
                    registry.from_base_units(symbol, raw)?
                }
                _ => {
                    return Err(Error::Snapshot(format!(
                        "balance for {} needs exactly one of amount or raw_amount",
                        b.symbol
                    )));
                }
            };
            entries.push((symbol, quantity));
        }
        for symbol in registry.symbols() {
            if !entries.iter().any(|&(sym, _)| sym == symbol) {
                debug!("no balance reported for {symbol}, assuming 0");
                entries.push((symbol, 0.0));
            }
        }
        Ok(Holdings::new(registry, entries)?)
    }

    /// Price table for the registry's tokens.
    pub fn prices(&self, registry: &AssetRegistry) -> Result<PriceTable> {
        let mut quotes = Vec::with_capacity(self.prices.len());
        for q in &self.prices {
            quotes.push((registry.resolve(&q.symbol)?, q.price));
        }
        Ok(PriceTable::new(registry, quotes)?)
    }
}
