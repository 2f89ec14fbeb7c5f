//! Execution orchestrator: grades → target → plan → confirm → submit.
//!
//! This is the main workflow that ties together all components.

use std::time::Duration;

use log::{error, info, warn};
use vaultbook::{
    Adjustment, AssetRegistry, Order, TargetAllocation, TokenGrade, Valuation, build_orders,
    compute_target_allocation, plan_rebalance_with_threshold, value_in_common_currency,
};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::GradeFeed;
use crate::reconcile;
use crate::snapshot::VaultSnapshot;
use crate::submitter::{OrderSubmitter, OutboxSubmitter};

/// Options for a rebalance run.
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    pub run_id: String,
}

/// Everything computed for one rebalance cycle.
#[derive(Debug, Clone)]
pub struct RebalancePlan {
    pub grades: Vec<TokenGrade>,
    pub target: TargetAllocation,
    pub valuation: Valuation,
    pub adjustments: Vec<Adjustment>,
    pub orders: Vec<Order>,
}

/// Submission counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub accepted: usize,
    pub failed: usize,
}

/// Run the whole calculator pipeline over one feed + snapshot.
pub fn compute_plan(
    config: &Config,
    registry: &AssetRegistry,
    feed: &GradeFeed,
    snapshot: &VaultSnapshot,
) -> Result<RebalancePlan> {
    let grades = feed.latest_grades(registry, &config.token_ids()?)?;
    let target = compute_target_allocation(registry, &grades)?;

    let holdings = snapshot.holdings(registry)?;
    let prices = snapshot.prices(registry)?;
    let valuation = value_in_common_currency(&holdings, &prices)?;

    let adjustments = plan_rebalance_with_threshold(
        &holdings,
        &target,
        &prices,
        config.rebalance.epsilon_fraction,
    )?;
    let orders = build_orders(registry, &adjustments)?;

    Ok(RebalancePlan {
        grades,
        target,
        valuation,
        adjustments,
        orders,
    })
}

/// Refuse runs that would emit more orders than configured.
pub fn enforce_max_orders_per_run(orders: &[Order], max_orders: usize) -> Result<()> {
    if orders.len() > max_orders {
        return Err(Error::Aborted(format!(
            "{} orders exceed max_orders_per_run = {max_orders}",
            orders.len()
        )));
    }
    Ok(())
}

/// Hand every order to `submitter`, auditing each receipt.
///
/// A failing order is logged and counted; the remaining orders are still
/// submitted.
pub fn submit_orders(
    orders: &[Order],
    submitter: &mut dyn OrderSubmitter,
    audit: &mut AuditLog,
    interval_ms: u64,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for (i, order) in orders.iter().enumerate() {
        print!(
            "[{}/{}] {} {} ({} {}) ... ",
            i + 1,
            orders.len(),
            order.direction,
            order.symbol,
            order.base_units,
            order.denomination,
        );
        summary.submitted += 1;

        match submitter.submit(order) {
            Ok(receipt) => {
                audit::log_order_submitted(audit, order, &receipt)?;
                if receipt.accepted {
                    println!("QUEUED {}", receipt.order_ref);
                    summary.accepted += 1;
                } else {
                    println!("REJECTED {}", receipt.order_ref);
                    warn!("Order {} for {} rejected", receipt.order_ref, order.symbol);
                    summary.failed += 1;
                }
            }
            Err(e) => {
                println!("ERROR: {e}");
                error!("Order submission failed for {}: {e}", order.symbol);
                summary.failed += 1;
            }
        }

        if interval_ms > 0 && i + 1 < orders.len() {
            std::thread::sleep(Duration::from_millis(interval_ms));
        }
    }

    Ok(summary)
}

/// Execute a full rebalance run.
pub fn run(
    config: &Config,
    feed: &GradeFeed,
    snapshot: &VaultSnapshot,
    opts: &RunOptions,
) -> Result<()> {
    let registry = config.registry()?;

    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, &opts.run_id, &config.vault.name)?;

    let plan = compute_plan(config, &registry, feed, snapshot)?;
    audit::log_grades(&mut audit, &plan.grades)?;
    audit::log_target(&mut audit, &plan.target)?;
    audit::log_valuation(&mut audit, &plan.valuation)?;

    display_plan(&plan);

    if plan.orders.is_empty() {
        println!("\nNo rebalancing needed, vault matches target.");
        audit.log_simple("no_rebalance_needed")?;
        return Ok(());
    }

    audit::log_adjustments(&mut audit, &plan.adjustments)?;
    audit::log_orders(&mut audit, &plan.orders)?;

    enforce_max_orders_per_run(&plan.orders, config.execution.max_orders_per_run)?;

    if opts.dry_run {
        println!("\n[DRY RUN] No orders submitted.");
        return Ok(());
    }

    if !opts.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Submit orders?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        if !confirmed {
            println!("Aborted.");
            audit.log("user_confirmed", serde_json::json!({"approved": false}))?;
            return Ok(());
        }

        audit.log("user_confirmed", serde_json::json!({"approved": true}))?;
    }

    let outbox_path = std::path::Path::new(&config.execution.outbox);
    let mut outbox = OutboxSubmitter::open(outbox_path, &config.vault.name, &opts.run_id)?;
    info!("Submitting {} orders to {}", plan.orders.len(), outbox.path().display());

    let summary = submit_orders(
        &plan.orders,
        &mut outbox,
        &mut audit,
        config.execution.order_interval_ms,
    )?;

    audit::log_run_completed(&mut audit, summary.submitted, summary.accepted, summary.failed)?;
    println!(
        "\n{} submitted, {} queued, {} failed. Audit logged to {}",
        summary.submitted,
        summary.accepted,
        summary.failed,
        config.audit_path().display()
    );

    Ok(())
}

/// Print the target allocation for a feed.
pub fn show_allocation(config: &Config, feed: &GradeFeed) -> Result<()> {
    let registry = config.registry()?;
    let grades = feed.latest_grades(&registry, &config.token_ids()?)?;
    let target = compute_target_allocation(&registry, &grades)?;

    display_grades(&grades);
    display_target(&target);
    Ok(())
}

/// Print the plan without touching the audit log or outbox.
pub fn show_plan(config: &Config, feed: &GradeFeed, snapshot: &VaultSnapshot) -> Result<()> {
    let registry = config.registry()?;
    let plan = compute_plan(config, &registry, feed, snapshot)?;
    display_plan(&plan);
    Ok(())
}

/// Print the vault's current distribution.
pub fn show_distribution(config: &Config, snapshot: &VaultSnapshot) -> Result<()> {
    let registry = config.registry()?;
    let holdings = snapshot.holdings(&registry)?;
    let prices = snapshot.prices(&registry)?;
    let valuation = value_in_common_currency(&holdings, &prices)?;

    println!(
        "Vault {} at {}:",
        config.vault.name,
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    display_valuation(&valuation);
    Ok(())
}

/// Compare current distribution against the target from the feed.
pub fn run_reconcile(config: &Config, feed: &GradeFeed, snapshot: &VaultSnapshot) -> Result<()> {
    let registry = config.registry()?;
    let plan = compute_plan(config, &registry, feed, snapshot)?;
    let report = reconcile::reconcile(&plan.valuation, &plan.target);
    print!("{report}");
    Ok(())
}

// === Helpers ===

fn display_grades(grades: &[TokenGrade]) {
    println!("GRADES:");
    for g in grades {
        println!("  {:8} {:>6.2}", g.symbol, g.grade);
    }
}

fn display_target(target: &TargetAllocation) {
    println!("\nTARGET ALLOCATION:");
    for (sym, pct) in target.iter() {
        println!("  {:8} {:>7.2}%", sym, pct);
    }
}

fn display_valuation(valuation: &Valuation) {
    println!("\nCURRENT VAULT:");
    for ((sym, usd), (_, pct)) in valuation.per_token.iter().zip(valuation.weights()) {
        println!("  {:8} ${:>14.2}  ({:.1}%)", sym, usd, pct);
    }
    println!("  {:8} ${:>14.2}", "TOTAL", valuation.total);
}

fn display_plan(plan: &RebalancePlan) {
    display_grades(&plan.grades);
    display_target(&plan.target);
    display_valuation(&plan.valuation);

    if plan.adjustments.is_empty() {
        return;
    }

    println!("\nADJUSTMENTS:");
    println!("  {:>3}  {:5} {:8} {:>14} {:>18}", "#", "Side", "Symbol", "USD", "Native");
    for (i, adj) in plan.adjustments.iter().enumerate() {
        println!(
            "  {:>3}  {:5} {:8} ${:>13.2} {:>18.8}",
            i + 1,
            adj.direction,
            adj.symbol,
            adj.amount_currency,
            adj.amount_native,
        );
    }

    println!("\nORDERS:");
    for (i, order) in plan.orders.iter().enumerate() {
        println!(
            "  {:>3}  {:5} {:8} {:>28} {} base units",
            i + 1,
            order.direction,
            order.symbol,
            order.base_units,
            order.denomination,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultbook::{Direction, Symbol};

    #[test]
    fn max_orders_enforced() {
        let order = Order {
            symbol: Symbol::new("WETH"),
            direction: Direction::Buy,
            amount: 1.0,
            base_units: 1_000_000,
            denomination: Symbol::new("USDC"),
        };
        assert!(enforce_max_orders_per_run(&[order, order], 2).is_ok());
        assert!(matches!(
            enforce_max_orders_per_run(&[order, order, order], 2),
            Err(Error::Aborted(_))
        ));
    }
}
