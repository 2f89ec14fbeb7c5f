//! # vaultbook
//!
//! Grade-weighted target allocation and rebalancing calculator for a
//! multi-asset DeFi vault quoted in a USD-pegged safe asset.
//!
//! ## Pipeline
//!
//! | Stage | Function | Output |
//! |-------|----------|--------|
//! | Grades → target | [`compute_target_allocation`] | [`TargetAllocation`] |
//! | Holdings → value | [`value_in_common_currency`] | [`Valuation`] |
//! | Current vs target | [`plan_rebalance`] | [`Adjustment`]s |
//! | Adjustments → swaps | [`build_orders`] | [`Order`]s |
//!
//! Everything here is pure and synchronous: inputs are fetched by the
//! caller (rating feed, price oracle, balance reader) and the resulting
//! orders are handed to an external submitter.
//!
//! ## Quick Start
//!
//! ```
//! use vaultbook::{
//!     AssetRegistry, Direction, Holdings, PriceTable, Symbol, TokenGrade,
//!     build_orders, compute_target_allocation, plan_rebalance,
//! };
//!
//! let usdc = Symbol::new("USDC");
//! let weth = Symbol::new("WETH");
//!
//! let mut registry = AssetRegistry::new(usdc);
//! registry.set_decimals(usdc, 6).unwrap();
//! let registry = registry.with_asset(weth, 18).unwrap();
//!
//! // An average grade of 50 puts half the vault at risk.
//! let target = compute_target_allocation(&registry, &[TokenGrade::new(weth, 50.0)]).unwrap();
//!
//! let holdings = Holdings::new(&registry, vec![(weth, 0.0), (usdc, 1_000.0)]).unwrap();
//! let prices = PriceTable::new(&registry, vec![(weth, 2_500.0)]).unwrap();
//!
//! let adjustments = plan_rebalance(&holdings, &target, &prices).unwrap();
//! let orders = build_orders(&registry, &adjustments).unwrap();
//!
//! assert_eq!(orders.len(), 1);
//! assert_eq!(orders[0].direction, Direction::Buy);
//! assert_eq!(orders[0].denomination, usdc);
//! assert_eq!(orders[0].base_units, 500_000_000); // 500 USDC
//! ```
//!
//! ## Units
//!
//! - Percentages are 0–100 ([`TargetAllocation`], [`Valuation::weights`]).
//! - Holdings are native, human-readable token units (1.5 WETH).
//! - Order amounts are integer base units (`amount × 10^decimals`), truncated
//!   toward zero and never below one unit.

pub mod error;
pub mod grade;
pub mod orders;
pub mod plan;
pub mod registry;
pub mod symbol;
pub mod valuation;

pub use error::{Error, Result};
pub use grade::{ALLOCATION_TOLERANCE, TargetAllocation, TokenGrade, compute_target_allocation};
pub use orders::{MIN_BASE_UNITS, Order, build_orders, to_base_units};
pub use plan::{
    Adjustment, DUST_AMOUNT, Direction, EPSILON_FRACTION, apply_adjustments, plan_rebalance,
    plan_rebalance_with_threshold,
};
pub use registry::AssetRegistry;
pub use symbol::Symbol;
pub use valuation::{Holdings, PriceTable, Valuation, value_in_common_currency};
