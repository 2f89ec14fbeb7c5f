//! The configured asset set: safe asset, tracked tokens, and decimals.
//!
//! Every symbol entering the calculator (grades, holdings, prices, targets)
//! is resolved through an [`AssetRegistry`], so a typo in a ticker fails at
//! construction time instead of silently producing an empty allocation.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::symbol::Symbol;

/// The fixed key set of one vault.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    safe: Symbol,
    tracked: Vec<Symbol>,
    decimals: FxHashMap<Symbol, u8>,
}

impl AssetRegistry {
    /// Create a registry with only the safe asset and no decimals configured.
    pub fn new(safe: Symbol) -> Self {
        Self {
            safe,
            tracked: Vec::new(),
            decimals: FxHashMap::default(),
        }
    }

    /// Add a tracked (risky) token.
    pub fn track(&mut self, symbol: Symbol) -> Result<()> {
        if symbol == self.safe || self.tracked.contains(&symbol) {
            return Err(Error::DuplicateSymbol(symbol));
        }
        self.tracked.push(symbol);
        Ok(())
    }

    /// Configure the base-unit decimal count of a known symbol.
    pub fn set_decimals(&mut self, symbol: Symbol, decimals: u8) -> Result<()> {
        self.check(symbol)?;
        self.decimals.insert(symbol, decimals);
        Ok(())
    }

    /// Builder form of [`track`](Self::track) + [`set_decimals`](Self::set_decimals).
    pub fn with_asset(mut self, symbol: Symbol, decimals: u8) -> Result<Self> {
        self.track(symbol)?;
        self.set_decimals(symbol, decimals)?;
        Ok(self)
    }

    /// The safe (quote) asset.
    pub fn safe(&self) -> Symbol {
        self.safe
    }

    pub fn is_safe(&self, symbol: Symbol) -> bool {
        symbol == self.safe
    }

    /// Tracked tokens in configuration order (safe asset excluded).
    pub fn tracked(&self) -> &[Symbol] {
        &self.tracked
    }

    /// All symbols: tracked tokens first, safe asset last.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.tracked.iter().copied().chain(std::iter::once(self.safe))
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.is_safe(symbol) || self.tracked.contains(&symbol)
    }

    /// Return `symbol` if it belongs to the registry.
    pub fn check(&self, symbol: Symbol) -> Result<Symbol> {
        if self.contains(symbol) {
            Ok(symbol)
        } else {
            Err(Error::UnknownSymbol(symbol.as_str().to_string()))
        }
    }

    /// Parse and validate a ticker string.
    pub fn resolve(&self, s: &str) -> Result<Symbol> {
        let symbol = Symbol::try_new(s).ok_or_else(|| Error::InvalidSymbol(s.to_string()))?;
        if self.contains(symbol) {
            Ok(symbol)
        } else {
            Err(Error::UnknownSymbol(s.to_string()))
        }
    }

    /// Decimal count for `symbol`.
    pub fn decimals(&self, symbol: Symbol) -> Result<u8> {
        self.decimals
            .get(&symbol)
            .copied()
            .ok_or(Error::UnknownDecimals(symbol))
    }

    /// Convert a raw base-unit balance into native units (`raw / 10^decimals`).
    pub fn from_base_units(&self, symbol: Symbol, raw: u128) -> Result<f64> {
        let decimals = self.decimals(symbol)?;
        Ok(raw as f64 / 10f64.powi(i32::from(decimals)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AssetRegistry {
        let mut reg = AssetRegistry::new(Symbol::new("USDC"));
        reg.set_decimals(Symbol::new("USDC"), 6).unwrap();
        reg.with_asset(Symbol::new("WETH"), 18)
            .unwrap()
            .with_asset(Symbol::new("WBTC"), 8)
            .unwrap()
    }

    #[test]
    fn symbols_safe_last() {
        let syms: Vec<_> = registry().symbols().map(|s| s.to_string()).collect();
        assert_eq!(syms, ["WETH", "WBTC", "USDC"]);
    }

    #[test]
    fn resolve_catches_typos() {
        let reg = registry();
        assert_eq!(reg.resolve("WETH").unwrap(), Symbol::new("WETH"));
        assert_eq!(
            reg.resolve("WEHT"),
            Err(Error::UnknownSymbol("WEHT".into()))
        );
        assert!(matches!(
            reg.resolve("WRAPPEDETHER"),
            Err(Error::InvalidSymbol(_))
        ));
    }

    #[test]
    fn duplicate_tracking_rejected() {
        let mut reg = registry();
        assert!(reg.track(Symbol::new("WETH")).is_err());
        assert!(reg.track(Symbol::new("USDC")).is_err());
    }

    #[test]
    fn decimals_lookup() {
        let reg = registry();
        assert_eq!(reg.decimals(Symbol::new("WBTC")).unwrap(), 8);
        let bare = AssetRegistry::new(Symbol::new("USDC"));
        assert_eq!(
            bare.decimals(Symbol::new("USDC")),
            Err(Error::UnknownDecimals(Symbol::new("USDC")))
        );
    }

    #[test]
    fn decimals_for_unknown_symbol_rejected() {
        let mut reg = registry();
        assert!(reg.set_decimals(Symbol::new("DOGE"), 8).is_err());
    }

    #[test]
    fn base_units_to_native() {
        let reg = registry();
        let usdc = reg.from_base_units(Symbol::new("USDC"), 1_500_000).unwrap();
        assert!((usdc - 1.5).abs() < 1e-12);
        let weth = reg
            .from_base_units(Symbol::new("WETH"), 2_000_000_000_000_000_000)
            .unwrap();
        assert!((weth - 2.0).abs() < 1e-12);
    }
}
