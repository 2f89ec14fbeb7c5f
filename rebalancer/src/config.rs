//! TOML configuration loading and validation.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use vaultbook::{AssetRegistry, Symbol};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub vault: VaultConfig,
    pub assets: Vec<AssetConfig>,
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_vault_name")]
    pub name: String,
    #[serde(default = "default_safe_asset")]
    pub safe_asset: String,
    #[serde(default = "default_safe_decimals")]
    pub safe_decimals: u8,
}

fn default_vault_name() -> String {
    "vault".into()
}
fn default_safe_asset() -> String {
    "USDC".into()
}
fn default_safe_decimals() -> u8 {
    6
}

/// One tracked (graded) token.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
    pub decimals: u8,
    /// Identifier of the token in the rating feed. When set, feed rows
    /// for this symbol with a different `TOKEN_ID` are ignored.
    #[serde(default)]
    pub token_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceConfig {
    #[serde(default = "default_epsilon")]
    pub epsilon_fraction: f64,
}

fn default_epsilon() -> f64 {
    vaultbook::EPSILON_FRACTION
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            epsilon_fraction: default_epsilon(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_interval")]
    pub order_interval_ms: u64,
    #[serde(default = "default_max_orders")]
    pub max_orders_per_run: usize,
    #[serde(default = "default_outbox")]
    pub outbox: String,
}

fn default_interval() -> u64 {
    100
}
fn default_max_orders() -> usize {
    20
}
fn default_outbox() -> String {
    "./orders/outbox.jsonl".into()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            order_interval_ms: default_interval(),
            max_orders_per_run: default_max_orders(),
            outbox: default_outbox(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            return Err(Error::Config("at least one [[assets]] entry is required".into()));
        }
        if !self.rebalance.epsilon_fraction.is_finite()
            || self.rebalance.epsilon_fraction < 0.0
            || self.rebalance.epsilon_fraction >= 1.0
        {
            return Err(Error::Config(
                "epsilon_fraction must be in [0.0, 1.0)".into(),
            ));
        }
        if self.execution.max_orders_per_run == 0 {
            return Err(Error::Config("max_orders_per_run must be > 0".into()));
        }
        // Decimals beyond 38 overflow u128 base units for a single token.
        for decimals in self
            .assets
            .iter()
            .map(|a| a.decimals)
            .chain(std::iter::once(self.vault.safe_decimals))
        {
            if decimals > 38 {
                return Err(Error::Config(format!(
                    "decimals must be <= 38, got {decimals}"
                )));
            }
        }
        self.registry()?;
        Ok(())
    }

    /// Build the asset registry: safe asset plus every tracked token.
    pub fn registry(&self) -> Result<AssetRegistry> {
        let safe = parse_symbol(&self.vault.safe_asset)?;
        let mut registry = AssetRegistry::new(safe);
        registry.set_decimals(safe, self.vault.safe_decimals)?;
        for asset in &self.assets {
            let symbol = parse_symbol(&asset.symbol)?;
            registry.track(symbol)?;
            registry.set_decimals(symbol, asset.decimals)?;
        }
        Ok(registry)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> std::path::PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Feed token ids pinned per symbol, for assets that configure one.
    pub fn token_ids(&self) -> Result<FxHashMap<Symbol, u64>> {
        let mut ids = FxHashMap::default();
        for asset in &self.assets {
            if let Some(id) = asset.token_id {
                ids.insert(parse_symbol(&asset.symbol)?, id);
            }
        }
        Ok(ids)
    }
}

fn parse_symbol(s: &str) -> Result<Symbol> {
    Symbol::try_new(s).ok_or_else(|| Error::Config(format!("invalid symbol {s:?}")))
}
