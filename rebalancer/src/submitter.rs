//! Order submitter abstraction used by rebalancer execution.
//!
//! Signing and broadcasting swaps happens outside the rebalancer. The
//! default [`OutboxSubmitter`] hands orders to that signer by appending
//! them to a JSONL outbox file.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use vaultbook::Order;

use crate::error::{Error, Result};

/// Outcome of handing one order to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    /// Submitter-assigned reference (outbox id, transaction hash, ...).
    pub order_ref: String,
    pub accepted: bool,
}

/// Minimal submission API needed by the rebalancer runtime.
pub trait OrderSubmitter {
    fn submit(&mut self, order: &Order) -> Result<SubmitReceipt>;
}

/// One outbox line.
#[derive(Debug, Serialize)]
struct OutboxEntry<'a> {
    order_ref: &'a str,
    vault: &'a str,
    symbol: &'a str,
    direction: String,
    /// Vault contract action flag: 1 buy, 0 sell.
    action: u8,
    amount: f64,
    /// Decimal string; base units routinely exceed 2^53.
    base_units: String,
    denomination: &'a str,
    ts: String,
}

/// Appends orders to a JSONL file for an external signer.
pub struct OutboxSubmitter {
    path: PathBuf,
    vault: String,
    run_id: String,
    seq: usize,
    writer: BufWriter<fs::File>,
}

impl OutboxSubmitter {
    /// Open (or create) the outbox for appending.
    pub fn open(path: &Path, vault: &str, run_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            vault: vault.to_string(),
            run_id: run_id.to_string(),
            seq: 0,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OrderSubmitter for OutboxSubmitter {
    fn submit(&mut self, order: &Order) -> Result<SubmitReceipt> {
        self.seq += 1;
        let order_ref = format!("{}-{}", self.run_id, self.seq);
        let entry = OutboxEntry {
            order_ref: &order_ref,
            vault: &self.vault,
            symbol: order.symbol.as_str(),
            direction: order.direction.to_string(),
            action: order.direction.as_flag(),
            amount: order.amount,
            base_units: order.base_units.to_string(),
            denomination: order.denomination.as_str(),
            ts: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| Error::Submit(format!("cannot encode order {order_ref}: {e}")))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(SubmitReceipt {
            order_ref,
            accepted: true,
        })
    }
}
