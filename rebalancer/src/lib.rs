//! vaultbook-rebalancer: grade-driven rebalancer for a multi-asset vault.
//!
//! Reads investor grades from a rating-feed document and balances/prices
//! from a vault snapshot, computes the target allocation and the swap
//! orders that reach it, and hands the orders to an outbox for signing,
//! with an audit trail of every step.

pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod feed;
pub mod reconcile;
pub mod snapshot;
pub mod submitter;
