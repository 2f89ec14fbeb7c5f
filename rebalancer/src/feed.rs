//! Investor-grade feed documents (grades.json) loading and aggregation.
//!
//! The rating feed returns one row per token per day over a date range.
//! The rebalancer only needs the most recent grade of each tracked token.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use vaultbook::{AssetRegistry, Symbol, TokenGrade};

use crate::error::{Error, Result};

/// A rating-feed response.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeFeed {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Vec<GradeRow>,
}

fn default_success() -> bool {
    true
}

/// One token's grades on one date.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeRow {
    #[serde(rename = "TOKEN_ID", default)]
    pub token_id: Option<u64>,
    #[serde(rename = "TOKEN_SYMBOL")]
    pub token_symbol: String,
    #[serde(rename = "DATE")]
    pub date: String,
    #[serde(rename = "TM_INVESTOR_GRADE")]
    pub investor_grade: Option<f64>,
}

impl GradeFeed {
    /// Load and validate a feed file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::FeedRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let feed: GradeFeed = serde_json::from_str(json)?;
        if !feed.success {
            return Err(Error::Feed(format!("feed reported failure: {}", feed.message)));
        }
        Ok(feed)
    }

    /// Most recent grade of every tracked token, in registry order.
    ///
    /// Rows without a grade, for the safe asset, or for symbols outside the
    /// registry are dropped. When `token_ids` pins a feed id for a symbol,
    /// rows carrying a different `TOKEN_ID` belong to another token with the
    /// same ticker and are dropped too. Tracked tokens without any graded row
    /// are reported as a warning and left out.
    pub fn latest_grades(
        &self,
        registry: &AssetRegistry,
        token_ids: &FxHashMap<Symbol, u64>,
    ) -> Result<Vec<TokenGrade>> {
        let mut latest: FxHashMap<Symbol, (NaiveDateTime, f64)> = FxHashMap::default();

        for row in &self.data {
            let Some(grade) = row.investor_grade else {
                debug!("skipping {} on {}: no grade", row.token_symbol, row.date);
                continue;
            };
            let symbol = match registry.resolve(&row.token_symbol) {
                Ok(sym) if !registry.is_safe(sym) => sym,
                Ok(_) => continue,
                Err(_) => {
                    warn!("ignoring grade for untracked token {}", row.token_symbol);
                    continue;
                }
            };
            if let (Some(&pinned), Some(id)) = (token_ids.get(&symbol), row.token_id) {
                if pinned != id {
                    warn!(
                        "ignoring {} row with TOKEN_ID {id}, configured id is {pinned}",
                        row.token_symbol
                    );
                    continue;
                }
            }
            let date = parse_date(&row.date).ok_or_else(|| {
                Error::Feed(format!("bad DATE {:?} for {}", row.date, row.token_symbol))
            })?;

            match latest.get(&symbol) {
                Some(&(seen, _)) if seen >= date => {}
                _ => {
                    latest.insert(symbol, (date, grade));
                }
            }
        }

        let mut grades = Vec::with_capacity(registry.tracked().len());
        for &symbol in registry.tracked() {
            match latest.get(&symbol) {
                Some(&(_, grade)) => grades.push(TokenGrade::new(symbol, grade)),
                None => warn!("no grade available for {symbol}"),
            }
        }
        Ok(grades)
    }
}

/// Accept RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
fn parse_date(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
