//! Distribution check: compare the vault's current weights against target.

use vaultbook::{Symbol, TargetAllocation, Valuation};

/// Reconciliation report comparing actual vs target.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub entries: Vec<ReconcileEntry>,
    pub total_usd: f64,
    pub tracking_error_pct: f64,
}

/// One symbol's reconciliation entry. Percentages are 0–100.
#[derive(Debug, Clone)]
pub struct ReconcileEntry {
    pub symbol: String,
    pub target_pct: f64,
    pub actual_pct: f64,
    pub diff_pct: f64,
    pub target_usd: f64,
    pub actual_usd: f64,
}

/// Compare current valuation against a target allocation.
///
/// Symbols held but not targeted appear with a 0% target; targeted symbols
/// not held appear with a 0% actual weight. Tracking error is the RMS of
/// the per-symbol percentage gaps.
pub fn reconcile(valuation: &Valuation, target: &TargetAllocation) -> ReconcileReport {
    let weights = valuation.weights();
    let total = valuation.total;

    let mut symbols: Vec<Symbol> = target.iter().map(|(sym, _)| sym).collect();
    for &(sym, _) in &valuation.per_token {
        if !symbols.contains(&sym) {
            symbols.push(sym);
        }
    }

    let mut entries = Vec::with_capacity(symbols.len());
    let mut sum_sq_diff = 0.0_f64;

    for sym in &symbols {
        let target_pct = target.get(*sym).unwrap_or(0.0);
        let actual_pct = weights
            .iter()
            .find(|(s, _)| s == sym)
            .map(|&(_, pct)| pct)
            .unwrap_or(0.0);
        let diff_pct = actual_pct - target_pct;
        sum_sq_diff += diff_pct * diff_pct;

        entries.push(ReconcileEntry {
            symbol: sym.as_str().to_string(),
            target_pct,
            actual_pct,
            diff_pct,
            target_usd: target_pct / 100.0 * total,
            actual_usd: valuation.get(*sym).unwrap_or(0.0),
        });
    }

    let tracking_error_pct = (sum_sq_diff / symbols.len().max(1) as f64).sqrt();

    ReconcileReport {
        entries,
        total_usd: total,
        tracking_error_pct,
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DISTRIBUTION (total ${:.2}):", self.total_usd)?;
        writeln!(
            f,
            "  {:8} {:>10} {:>10} {:>10} {:>14} {:>14}",
            "Symbol", "Target%", "Actual%", "Diff%", "TargetUSD", "ActualUSD"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:8} {:>9.2}% {:>9.2}% {:>+9.2}% {:>14.2} {:>14.2}",
                e.symbol, e.target_pct, e.actual_pct, e.diff_pct, e.target_usd, e.actual_usd,
            )?;
        }
        writeln!(f, "\n  Tracking error: {:.3}%", self.tracking_error_pct)?;
        Ok(())
    }
}
