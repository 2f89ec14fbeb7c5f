//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vaultbook::{Adjustment, Order, TargetAllocation, TokenGrade, Valuation};

use crate::error::Result;
use crate::submitter::SubmitReceipt;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

pub fn log_run_started(audit: &mut AuditLog, run_id: &str, vault: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "run_id": run_id,
            "vault": vault,
        }),
    )
}

pub fn log_grades(audit: &mut AuditLog, grades: &[TokenGrade]) -> Result<()> {
    let data = serde_json::to_value(grades)?;
    audit.log("grades_loaded", serde_json::json!({ "grades": data }))
}

pub fn log_target(audit: &mut AuditLog, target: &TargetAllocation) -> Result<()> {
    let data: Vec<_> = target
        .iter()
        .map(|(sym, pct)| serde_json::json!({ "symbol": sym.as_str(), "pct": pct }))
        .collect();
    audit.log("target_computed", serde_json::json!({ "target": data }))
}

pub fn log_valuation(audit: &mut AuditLog, valuation: &Valuation) -> Result<()> {
    let data: Vec<_> = valuation
        .per_token
        .iter()
        .map(|(sym, usd)| serde_json::json!({ "symbol": sym.as_str(), "usd": usd }))
        .collect();
    audit.log(
        "valuation",
        serde_json::json!({ "holdings": data, "total_usd": valuation.total }),
    )
}

pub fn log_adjustments(audit: &mut AuditLog, adjustments: &[Adjustment]) -> Result<()> {
    let data = serde_json::to_value(adjustments)?;
    audit.log("adjustments_planned", serde_json::json!({ "adjustments": data }))
}

pub fn log_orders(audit: &mut AuditLog, orders: &[Order]) -> Result<()> {
    let data: Vec<_> = orders.iter().map(order_json).collect();
    audit.log("orders_built", serde_json::json!({ "orders": data }))
}

pub fn log_order_submitted(
    audit: &mut AuditLog,
    order: &Order,
    receipt: &SubmitReceipt,
) -> Result<()> {
    let mut data = order_json(order);
    data["order_ref"] = serde_json::json!(receipt.order_ref);
    data["accepted"] = serde_json::json!(receipt.accepted);
    audit.log("order_submitted", data)
}

pub fn log_run_completed(
    audit: &mut AuditLog,
    submitted: usize,
    accepted: usize,
    failed: usize,
) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "submitted": submitted,
            "accepted": accepted,
            "failed": failed,
        }),
    )
}

fn order_json(o: &Order) -> serde_json::Value {
    serde_json::json!({
        "symbol": o.symbol.as_str(),
        "direction": o.direction.to_string(),
        "amount": o.amount,
        "base_units": o.base_units.to_string(),
        "denomination": o.denomination.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultbook::{Direction, Symbol};

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("test_event").unwrap();
            log.log("test_data", serde_json::json!({"key": "value"}))
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }

        assert!(lines[0].contains("\"event\":\"test_event\""));
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log_simple("test").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn grades_and_adjustments_serialize_core_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let grades = [TokenGrade::new(Symbol::new("WETH"), 80.0)];
        let adjustments = [Adjustment {
            symbol: Symbol::new("WETH"),
            direction: Direction::Sell,
            amount_currency: 500.0,
            amount_native: 0.25,
        }];

        {
            let mut log = AuditLog::open(&path).unwrap();
            log_grades(&mut log, &grades).unwrap();
            log_adjustments(&mut log, &adjustments).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["grades"][0]["symbol"], "WETH");
        assert_eq!(lines[0]["grades"][0]["grade"], 80.0);
        assert_eq!(lines[1]["adjustments"][0]["symbol"], "WETH");
        assert_eq!(lines[1]["adjustments"][0]["amount_native"], 0.25);
    }

    #[test]
    fn submitted_order_carries_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let order = Order {
            symbol: Symbol::new("WBTC"),
            direction: Direction::Buy,
            amount: 12.5,
            base_units: 12_500_000,
            denomination: Symbol::new("USDC"),
        };
        let receipt = SubmitReceipt {
            order_ref: "r-1".into(),
            accepted: true,
        };

        {
            let mut log = AuditLog::open(&path).unwrap();
            log_order_submitted(&mut log, &order, &receipt).unwrap();
        }

        let line = std::fs::read_to_string(&path).unwrap();
        let v: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(v["event"], "order_submitted");
        assert_eq!(v["order_ref"], "r-1");
        assert_eq!(v["denomination"], "USDC");
        assert_eq!(v["base_units"], "12500000");
    }
}
