//! CURRENT→TARGET planner.
//!
//! Values the current holdings, scales the target percentages to the same
//! total, and emits one signed adjustment per symbol whose gap is larger
//! than the noise threshold.

use crate::error::Result;
use crate::grade::TargetAllocation;
use crate::valuation::{Holdings, PriceTable, value_in_common_currency};
use crate::symbol::Symbol;

/// Gaps smaller than this fraction of the vault total are not traded.
pub const EPSILON_FRACTION: f64 = 0.0001;

/// Native amounts at or below this are treated as zero.
pub const DUST_AMOUNT: f64 = 1e-15;

/// Trade direction relative to the safe asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Action flag understood by the vault contract (`1` buy, `0` sell).
    pub fn as_flag(self) -> u8 {
        match self {
            Direction::Buy => 1,
            Direction::Sell => 0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => f.pad("BUY"),
            Direction::Sell => f.pad("SELL"),
        }
    }
}

/// A signed per-token gap between current and target value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Adjustment {
    pub symbol: Symbol,
    pub direction: Direction,
    /// Size of the gap in the common currency (always positive).
    pub amount_currency: f64,
    /// Size of the gap in the token's native units (always positive).
    pub amount_native: f64,
}

/// Compute adjustments with the default [`EPSILON_FRACTION`] threshold.
pub fn plan_rebalance(
    current: &Holdings,
    target: &TargetAllocation,
    prices: &PriceTable,
) -> Result<Vec<Adjustment>> {
    plan_rebalance_with_threshold(current, target, prices, EPSILON_FRACTION)
}

/// Compute the adjustments that move `current` to `target`.
///
/// Only symbols present in both `current` and `target` are diffed; holdings
/// without a target are left alone. Output follows the order of `current`.
///
/// # Errors
///
/// - [`Error::InvalidAllocation`](crate::Error::InvalidAllocation) if `target`
///   does not sum to 100
/// - [`Error::MissingPrice`](crate::Error::MissingPrice) if a held token has no price
pub fn plan_rebalance_with_threshold(
    current: &Holdings,
    target: &TargetAllocation,
    prices: &PriceTable,
    epsilon_fraction: f64,
) -> Result<Vec<Adjustment>> {
    target.validate()?;

    let valuation = value_in_common_currency(current, prices)?;
    let total = valuation.total;
    let threshold = total * epsilon_fraction;
    let safe = target.safe();

    let mut adjustments = Vec::new();

    for &(symbol, current_value) in &valuation.per_token {
        let Some(pct) = target.get(symbol) else {
            continue;
        };
        let target_value = pct / 100.0 * total;
        let delta = target_value - current_value;

        if delta.abs() < threshold {
            continue;
        }

        let direction = if delta > 0.0 {
            Direction::Buy
        } else {
            Direction::Sell
        };

        let amount_currency = delta.abs();
        let amount_native = if symbol == safe {
            amount_currency
        } else {
            amount_currency / prices.price(symbol)?
        };

        if amount_native <= DUST_AMOUNT {
            continue;
        }

        adjustments.push(Adjustment {
            symbol,
            direction,
            amount_currency,
            amount_native,
        });
    }

    Ok(adjustments)
}

/// Holdings after every risky adjustment has been filled at `prices`.
///
/// Each risky leg settles against the safe asset (buys spend it, sells
/// credit it); safe-asset adjustments are implied by those legs and are not
/// applied twice. Net changes are applied at once and final quantities
/// never go below zero.
pub fn apply_adjustments(
    current: &Holdings,
    adjustments: &[Adjustment],
    prices: &PriceTable,
) -> Holdings {
    let safe = prices.safe();
    let mut safe_delta = 0.0;
    let mut next = current.clone();

    for adj in adjustments {
        if adj.symbol == safe {
            continue;
        }
        let sign = match adj.direction {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        };
        next.adjust(adj.symbol, sign * adj.amount_native);
        safe_delta -= sign * adj.amount_currency;
    }
    if safe_delta != 0.0 {
        next.adjust(safe, safe_delta);
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::registry::AssetRegistry;

    fn usdc() -> Symbol {
        Symbol::new("USDC")
    }
    fn weth() -> Symbol {
        Symbol::new("WETH")
    }
    fn wbtc() -> Symbol {
        Symbol::new("WBTC")
    }

    fn registry() -> AssetRegistry {
        let mut reg = AssetRegistry::new(usdc());
        reg.track(weth()).unwrap();
        reg.track(wbtc()).unwrap();
        reg
    }

    fn find(adjs: &[Adjustment], sym: Symbol) -> Option<&Adjustment> {
        adjs.iter().find(|a| a.symbol == sym)
    }

    #[test]
    fn worked_example_buy() {
        let reg = registry();
        let current = Holdings::new(&reg, vec![(weth(), 10.0), (usdc(), 100.0)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 50.0), (usdc(), 50.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 2.0)]).unwrap();

        let adjs = plan_rebalance(&current, &target, &prices).unwrap();
        assert_eq!(adjs.len(), 2);

        let buy = find(&adjs, weth()).unwrap();
        assert_eq!(buy.direction, Direction::Buy);
        assert!((buy.amount_currency - 40.0).abs() < 1e-9);
        assert!((buy.amount_native - 20.0).abs() < 1e-9);

        let sell = find(&adjs, usdc()).unwrap();
        assert_eq!(sell.direction, Direction::Sell);
        assert!((sell.amount_native - 40.0).abs() < 1e-9);
    }

    #[test]
    fn sell_converts_to_native_units() {
        let reg = registry();
        let current = Holdings::new(&reg, vec![(weth(), 2.0), (usdc(), 0.0)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 25.0), (usdc(), 75.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 2000.0)]).unwrap();

        let adjs = plan_rebalance(&current, &target, &prices).unwrap();
        let sell = find(&adjs, weth()).unwrap();
        assert_eq!(sell.direction, Direction::Sell);
        assert!((sell.amount_currency - 3000.0).abs() < 1e-9);
        assert!((sell.amount_native - 1.5).abs() < 1e-12);
    }

    #[test]
    fn gap_below_threshold_is_suppressed() {
        let reg = registry();
        // total = 10_000; threshold = 1.0; WETH gap = 0.5
        let current = Holdings::new(&reg, vec![(weth(), 4999.5), (usdc(), 5000.5)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 50.0), (usdc(), 50.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 1.0)]).unwrap();

        let adjs = plan_rebalance(&current, &target, &prices).unwrap();
        assert!(adjs.is_empty());
    }

    #[test]
    fn gap_above_threshold_is_traded() {
        let reg = registry();
        // total = 10_000; threshold = 1.0; WETH gap = 2.0
        let current = Holdings::new(&reg, vec![(weth(), 4998.0), (usdc(), 5002.0)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 50.0), (usdc(), 50.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 1.0)]).unwrap();

        let adjs = plan_rebalance(&current, &target, &prices).unwrap();
        assert_eq!(adjs.len(), 2);
    }

    #[test]
    fn custom_threshold() {
        let reg = registry();
        let current = Holdings::new(&reg, vec![(weth(), 4900.0), (usdc(), 5100.0)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 50.0), (usdc(), 50.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 1.0)]).unwrap();

        // Gap is 100: traded at a 50 threshold, suppressed at 200.
        let adjs = plan_rebalance_with_threshold(&current, &target, &prices, 0.005).unwrap();
        assert_eq!(adjs.len(), 2);
        let adjs = plan_rebalance_with_threshold(&current, &target, &prices, 0.02).unwrap();
        assert!(adjs.is_empty());
    }

    #[test]
    fn untargeted_holdings_are_ignored() {
        let reg = registry();
        let current =
            Holdings::new(&reg, vec![(weth(), 1.0), (wbtc(), 1.0), (usdc(), 1000.0)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 50.0), (usdc(), 50.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 1000.0), (wbtc(), 1000.0)]).unwrap();

        let adjs = plan_rebalance(&current, &target, &prices).unwrap();
        assert!(find(&adjs, wbtc()).is_none());
        // total = 3000 → WETH target 1500, current 1000
        let buy = find(&adjs, weth()).unwrap();
        assert!((buy.amount_currency - 500.0).abs() < 1e-9);
    }

    #[test]
    fn targets_without_holdings_are_not_opened() {
        let reg = registry();
        let current = Holdings::new(&reg, vec![(usdc(), 1000.0)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 50.0), (usdc(), 50.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 1000.0)]).unwrap();

        let adjs = plan_rebalance(&current, &target, &prices).unwrap();
        assert!(find(&adjs, weth()).is_none());
        assert_eq!(find(&adjs, usdc()).unwrap().direction, Direction::Sell);
    }

    #[test]
    fn missing_price_propagates() {
        let reg = registry();
        let current = Holdings::new(&reg, vec![(weth(), 1.0), (usdc(), 1.0)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 50.0), (usdc(), 50.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![]).unwrap();
        assert_eq!(
            plan_rebalance(&current, &target, &prices),
            Err(Error::MissingPrice(weth()))
        );
    }

    #[test]
    fn empty_vault_plans_nothing() {
        let reg = registry();
        let current = Holdings::new(&reg, vec![(weth(), 0.0), (usdc(), 0.0)]).unwrap();
        let target = TargetAllocation::new(&reg, vec![(weth(), 50.0), (usdc(), 50.0)]).unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 1000.0)]).unwrap();
        assert!(plan_rebalance(&current, &target, &prices).unwrap().is_empty());
    }

    #[test]
    fn applying_adjustments_converges() {
        let reg = registry();
        let current =
            Holdings::new(&reg, vec![(weth(), 3.0), (wbtc(), 0.01), (usdc(), 2500.0)]).unwrap();
        let target = TargetAllocation::new(
            &reg,
            vec![(weth(), 40.0), (wbtc(), 30.0), (usdc(), 30.0)],
        )
        .unwrap();
        let prices = PriceTable::new(&reg, vec![(weth(), 2500.0), (wbtc(), 60000.0)]).unwrap();

        let adjs = plan_rebalance(&current, &target, &prices).unwrap();
        let after = apply_adjustments(&current, &adjs, &prices);
        let valuation = value_in_common_currency(&after, &prices).unwrap();

        // total is preserved: 7500 + 600 + 2500
        assert!((valuation.total - 10_600.0).abs() < 1e-6);
        for (sym, pct) in target.iter() {
            let expected = pct / 100.0 * valuation.total;
            assert!((valuation.get(sym).unwrap() - expected).abs() < 1e-6);
        }
        assert!(plan_rebalance(&after, &target, &prices).unwrap().is_empty());
    }

    #[test]
    fn direction_display_and_flag() {
        assert_eq!(Direction::Buy.to_string(), "BUY");
        assert_eq!(Direction::Sell.to_string(), "SELL");
        assert_eq!(Direction::Buy.as_flag(), 1);
        assert_eq!(Direction::Sell.as_flag(), 0);
    }
}
