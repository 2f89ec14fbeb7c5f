//! Order building: currency adjustments → integer base-unit swap orders.
//!
//! Every order swaps a tracked token against the safe asset. A sell spends
//! the token, so its amount is expressed in the token's base units; a buy
//! spends the safe asset, so its amount is expressed in the safe asset's
//! base units.

use crate::error::{Error, Result};
use crate::plan::{Adjustment, Direction};
use crate::registry::AssetRegistry;
use crate::symbol::Symbol;

/// Smallest amount ever emitted, in base units.
pub const MIN_BASE_UNITS: u128 = 1;

/// An executable swap instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Order {
    /// The tracked token being bought or sold.
    pub symbol: Symbol,
    pub direction: Direction,
    /// Human-readable amount, in units of `denomination`.
    pub amount: f64,
    /// Integer amount in base units of `denomination`; never zero.
    pub base_units: u128,
    /// Token that `amount` and `base_units` are expressed in.
    pub denomination: Symbol,
}

/// Scale `amount` of `symbol` by `10^decimals` and truncate toward zero.
///
/// A result of zero is lifted to [`MIN_BASE_UNITS`] so every emitted order
/// is a real on-chain instruction.
pub fn to_base_units(symbol: Symbol, amount: f64, decimals: u8) -> Result<u128> {
    let scaled = amount * 10f64.powi(i32::from(decimals));
    if !scaled.is_finite() || scaled < 0.0 || scaled >= u128::MAX as f64 {
        return Err(Error::AmountOverflow(symbol));
    }
    let units = scaled.trunc() as u128;
    Ok(units.max(MIN_BASE_UNITS))
}

/// Convert adjustments into orders.
///
/// Safe-asset adjustments are dropped: the safe asset is the quote side of
/// every swap, never a tradable leg of its own.
///
/// # Errors
///
/// - [`Error::UnknownDecimals`] if decimals are missing for the token being
///   sold or for the safe asset when buying
/// - [`Error::AmountOverflow`] for amounts that cannot be represented
pub fn build_orders(registry: &AssetRegistry, adjustments: &[Adjustment]) -> Result<Vec<Order>> {
    let safe = registry.safe();
    let mut orders = Vec::with_capacity(adjustments.len());

    for adj in adjustments {
        if adj.symbol == safe {
            continue;
        }

        let (denomination, amount) = match adj.direction {
            Direction::Sell => (adj.symbol, adj.amount_native),
            Direction::Buy => (safe, adj.amount_currency),
        };
        let decimals = registry.decimals(denomination)?;
        let base_units = to_base_units(denomination, amount, decimals)?;

        orders.push(Order {
            symbol: adj.symbol,
            direction: adj.direction,
            amount,
            base_units,
            denomination,
        });
    }

    Ok(orders)
}
