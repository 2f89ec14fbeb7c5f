//! Grade normalization: external investor grades → target allocation.
//!
//! The average grade of the tracked tokens decides how much of the vault is
//! at risk; each token's share of that risky slice is proportional to its own
//! grade, and the safe asset absorbs the residual.
//!
//! ```
//! use vaultbook::{AssetRegistry, Symbol, TokenGrade, compute_target_allocation};
//!
//! let mut registry = AssetRegistry::new(Symbol::new("USDC"));
//! registry.track(Symbol::new("WETH")).unwrap();
//! registry.track(Symbol::new("WBTC")).unwrap();
//!
//! let grades = [
//!     TokenGrade::new(Symbol::new("WETH"), 80.0),
//!     TokenGrade::new(Symbol::new("WBTC"), 60.0),
//! ];
//! let target = compute_target_allocation(&registry, &grades).unwrap();
//! assert!((target.get(Symbol::new("WETH")).unwrap() - 40.0).abs() < 1e-9);
//! assert!((target.get(Symbol::new("WBTC")).unwrap() - 30.0).abs() < 1e-9);
//! assert!((target.safe_pct() - 30.0).abs() < 1e-9);
//! ```

use crate::error::{Error, Result};
use crate::registry::AssetRegistry;
use crate::symbol::Symbol;

/// Absolute tolerance on the sum of target percentages.
pub const ALLOCATION_TOLERANCE: f64 = 1e-6;

/// Highest grade on the external rating scale.
pub const MAX_GRADE: f64 = 100.0;

/// One token's external rating (0–100).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenGrade {
    pub symbol: Symbol,
    pub grade: f64,
}

impl TokenGrade {
    pub fn new(symbol: Symbol, grade: f64) -> Self {
        Self { symbol, grade }
    }
}

/// Target percentage (0–100) per symbol, summing to 100.
///
/// Always contains an entry for the safe asset. Construction validates the
/// sum-to-100 invariant, so a `TargetAllocation` in hand is safe to plan
/// against.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TargetAllocation {
    safe: Symbol,
    entries: Vec<(Symbol, f64)>,
}

impl TargetAllocation {
    /// Build a target from explicit `(symbol, percentage)` pairs.
    pub fn new(registry: &AssetRegistry, entries: Vec<(Symbol, f64)>) -> Result<Self> {
        for (i, &(sym, _)) in entries.iter().enumerate() {
            registry.check(sym)?;
            if entries[..i].iter().any(|&(other, _)| other == sym) {
                return Err(Error::DuplicateSymbol(sym));
            }
        }
        let target = Self {
            safe: registry.safe(),
            entries,
        };
        target.validate()?;
        Ok(target)
    }

    /// Check the sum-to-100 invariant and the presence of the safe asset.
    pub fn validate(&self) -> Result<()> {
        if !self.entries.iter().any(|&(sym, _)| sym == self.safe) {
            return Err(Error::InvalidAllocation(format!(
                "missing safe asset {}",
                self.safe
            )));
        }
        for &(sym, pct) in &self.entries {
            if !pct.is_finite()
                || pct < -ALLOCATION_TOLERANCE
                || pct > 100.0 + ALLOCATION_TOLERANCE
            {
                return Err(Error::InvalidAllocation(format!(
                    "{sym} has percentage {pct}"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 100.0).abs() > ALLOCATION_TOLERANCE {
            return Err(Error::InvalidAllocation(format!(
                "percentages sum to {sum}, expected 100"
            )));
        }
        Ok(())
    }

    /// Target percentage for `symbol`, if present.
    pub fn get(&self, symbol: Symbol) -> Option<f64> {
        self.entries
            .iter()
            .find(|&&(sym, _)| sym == symbol)
            .map(|&(_, pct)| pct)
    }

    /// Percentage assigned to the safe asset.
    pub fn safe_pct(&self) -> f64 {
        self.get(self.safe).unwrap_or(0.0)
    }

    pub fn safe(&self) -> Symbol {
        self.safe
    }

    /// `(symbol, percentage)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all percentages.
    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|&(_, pct)| pct).sum()
    }

    /// Target weights as fractions (0–1) rather than percentages.
    pub fn as_weights(&self) -> Vec<(Symbol, f64)> {
        self.entries
            .iter()
            .map(|&(sym, pct)| (sym, pct / 100.0))
            .collect()
    }
}

/// Convert per-token grades into a target allocation.
///
/// Grades reported for the safe asset are skipped: it always receives the
/// residual. Grades must lie in `[0, 100]`; anything else is rejected rather
/// than silently breaking the sum-to-100 invariant.
///
/// # Errors
///
/// - [`Error::EmptyInput`] if no tracked-token grades remain
/// - [`Error::GradeOutOfRange`] for NaN or out-of-scale grades
/// - [`Error::UnknownSymbol`] / [`Error::DuplicateSymbol`] for bad keys
pub fn compute_target_allocation(
    registry: &AssetRegistry,
    grades: &[TokenGrade],
) -> Result<TargetAllocation> {
    let safe = registry.safe();
    let mut risky: Vec<TokenGrade> = Vec::with_capacity(grades.len());

    for g in grades {
        registry.check(g.symbol)?;
        if g.symbol == safe {
            continue;
        }
        if !g.grade.is_finite() || !(0.0..=MAX_GRADE).contains(&g.grade) {
            return Err(Error::GradeOutOfRange {
                symbol: g.symbol,
                grade: g.grade,
            });
        }
        if risky.iter().any(|r| r.symbol == g.symbol) {
            return Err(Error::DuplicateSymbol(g.symbol));
        }
        risky.push(*g);
    }

    if risky.is_empty() {
        return Err(Error::EmptyInput);
    }

    let total_grade: f64 = risky.iter().map(|g| g.grade).sum();
    let average_grade = total_grade / risky.len() as f64;
    let risky_fraction = average_grade / MAX_GRADE;

    let mut entries: Vec<(Symbol, f64)> = Vec::with_capacity(risky.len() + 1);
    for g in &risky {
        // All-zero grades: nothing at risk, no share to divide.
        let proportion = if total_grade > 0.0 {
            g.grade / total_grade
        } else {
            0.0
        };
        entries.push((g.symbol, risky_fraction * proportion * 100.0));
    }
    entries.push((safe, (1.0 - risky_fraction) * 100.0));

    let target = TargetAllocation { safe, entries };
    target.validate()?;
    Ok(target)
}
