//! Errors raised by the allocation and rebalancing calculator.

use crate::symbol::Symbol;

/// All errors the calculator can signal.
///
/// Every operation is pure and fails fast: on error nothing has been
/// mutated, so the caller can retry the whole computation with corrected
/// inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No grades were supplied for any tracked token.
    #[error("no grades supplied")]
    EmptyInput,

    /// A grade is NaN or outside the [0, 100] rating scale.
    #[error("grade for {symbol} is {grade}, expected a value in [0, 100]")]
    GradeOutOfRange { symbol: Symbol, grade: f64 },

    /// A non-safe symbol has no entry in the price table.
    #[error("price for {0} is not provided")]
    MissingPrice(Symbol),

    /// A price is not finite or not strictly positive.
    #[error("price for {symbol} is {price}, expected a finite value > 0")]
    InvalidPrice { symbol: Symbol, price: f64 },

    /// A holding quantity is negative or not finite.
    #[error("quantity for {symbol} is {quantity}, expected a finite value >= 0")]
    InvalidQuantity { symbol: Symbol, quantity: f64 },

    /// Decimals are not configured for a symbol that needs base-unit conversion.
    #[error("decimals are not configured for {0}")]
    UnknownDecimals(Symbol),

    /// Target percentages do not sum to 100 or lack the safe asset.
    #[error("invalid target allocation: {0}")]
    InvalidAllocation(String),

    /// A symbol is not part of the configured asset set.
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    /// A symbol string cannot be represented (empty, too long, non-ASCII).
    #[error("invalid symbol {0:?}: must be 1-8 ASCII bytes")]
    InvalidSymbol(String),

    /// The same symbol was given twice in one input.
    #[error("duplicate symbol {0}")]
    DuplicateSymbol(Symbol),

    /// A base-unit amount does not fit in `u128` or is not finite.
    #[error("amount for {0} cannot be represented in base units")]
    AmountOverflow(Symbol),
}

/// Result alias for calculator operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            Error::MissingPrice(Symbol::new("WETH")).to_string(),
            "price for WETH is not provided"
        );
        assert_eq!(
            Error::UnknownDecimals(Symbol::new("WBTC")).to_string(),
            "decimals are not configured for WBTC"
        );
        assert_eq!(Error::EmptyInput.to_string(), "no grades supplied");
    }

    #[test]
    fn is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::EmptyInput);
        assert!(err.to_string().contains("grades"));
    }
}
