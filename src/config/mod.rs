//! Configuration for the trade arena agent
//!
//! One explicit [`Config`] value is built at startup (defaults, then an
//! optional JSON file, then `ARENA_*` environment overrides) and handed to
//! every component constructor. Nothing reads identifiers from globals.

pub mod rpc;

use crate::paper_trading::PaperModeConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use rpc::RpcConfig;

/// Environment variable names for deployment overrides
pub mod env_vars {
    pub const NETWORK: &str = "ARENA_NETWORK";
    pub const PACKAGE_ID: &str = "ARENA_PACKAGE_ID";
    pub const SEASON_GLOBAL_ID: &str = "ARENA_SEASON_GLOBAL_ID";
    pub const DEX_GLOBAL_ID: &str = "ARENA_DEX_GLOBAL_ID";
    pub const POOL_ID: &str = "ARENA_POOL_ID";
    pub const USDC_TYPE: &str = "ARENA_USDC_TYPE";
    pub const BTC_TYPE: &str = "ARENA_BTC_TYPE";
    pub const AGENT_ID: &str = "ARENA_AGENT_ID";
    pub const SIGNER_ADDRESS: &str = "SUI_SIGNER_ADDRESS";
}

/// Sui networks the arena is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Devnet,
    Localnet,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Localnet => "localnet",
        }
    }

    /// Public full node endpoint (rate limited)
    pub fn public_fullnode(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443",
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
            Network::Devnet => "https://fullnode.devnet.sui.io:443",
            Network::Localnet => "http://127.0.0.1:9000",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "localnet" | "local" => Ok(Network::Localnet),
            other => Err(Error::Config(format!("Unknown network: {}", other))),
        }
    }
}

/// Published arena deployment on testnet
pub mod testnet {
    pub const PACKAGE_ID: &str =
        "0xa51f1f51ae2e6aa8cc88a1221c4e9da644faccdcd87dde9d2858e042634d285f";
    pub const SEASON_GLOBAL_ID: &str =
        "0x323afc98c387c70f9bc8528d7355aa7e520c352778c2406f15962f6e064bb9da";
    pub const DEX_GLOBAL_ID: &str =
        "0xe01a60f171b371a10141476fe421c566bb21d52f1924797fcd44a07d9e9d355b";
    pub const POOL_ID: &str =
        "0x245c85c4496f6278d0a0d4622265b64ff3c43a25491c6dd49410276b0aa6af04";
}

/// Ledger identifiers the components need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaObjects {
    /// Published Move package
    pub package_id: String,
    /// Shared object holding every season and its vaults
    pub season_global_id: String,
    /// Shared DEX object passed to trade calls
    pub dex_global_id: String,
    /// USDC/BTC liquidity pool object
    pub pool_id: String,
    /// Coin type of the stable asset
    pub usdc_type: String,
    /// Coin type of the volatile asset
    pub btc_type: String,
}

impl Default for ArenaObjects {
    fn default() -> Self {
        Self {
            package_id: testnet::PACKAGE_ID.to_string(),
            season_global_id: testnet::SEASON_GLOBAL_ID.to_string(),
            dex_global_id: testnet::DEX_GLOBAL_ID.to_string(),
            pool_id: testnet::POOL_ID.to_string(),
            usdc_type: format!("{}::mock_usdc::MOCK_USDC", testnet::PACKAGE_ID),
            btc_type: format!("{}::mock_btc::MOCK_BTC", testnet::PACKAGE_ID),
        }
    }
}

impl ArenaObjects {
    /// Type arguments for trade calls, stable asset first
    pub fn type_arguments(&self) -> Vec<String> {
        vec![self.usdc_type.clone(), self.btc_type.clone()]
    }

    fn apply_env(&mut self) {
        let overrides = [
            (env_vars::PACKAGE_ID, &mut self.package_id),
            (env_vars::SEASON_GLOBAL_ID, &mut self.season_global_id),
            (env_vars::DEX_GLOBAL_ID, &mut self.dex_global_id),
            (env_vars::POOL_ID, &mut self.pool_id),
            (env_vars::USDC_TYPE, &mut self.usdc_type),
            (env_vars::BTC_TYPE, &mut self.btc_type),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) {
                tracing::debug!(var, "Using environment override");
                *slot = value;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let ids = [
            ("objects.package_id", &self.package_id),
            ("objects.season_global_id", &self.season_global_id),
            ("objects.dex_global_id", &self.dex_global_id),
            ("objects.pool_id", &self.pool_id),
        ];
        for (name, id) in ids {
            validate_object_id(name, id)?;
        }
        for (name, coin_type) in [
            ("objects.usdc_type", &self.usdc_type),
            ("objects.btc_type", &self.btc_type),
        ] {
            if coin_type.trim().is_empty() {
                return Err(Error::Config(format!("{} is required", name)));
            }
            if coin_type.split("::").count() != 3 {
                return Err(Error::Config(format!(
                    "{} must look like <package>::<module>::<NAME>, got {}",
                    name, coin_type
                )));
            }
        }
        if self.usdc_type == self.btc_type {
            return Err(Error::Config(
                "objects.usdc_type and objects.btc_type must differ".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_object_id(name: &str, id: &str) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::Config(format!("{} is required", name)));
    }
    let digits = id
        .strip_prefix("0x")
        .ok_or_else(|| Error::Config(format!("{} must start with 0x", name)))?;
    if digits.is_empty() || digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Config(format!("{} is not a valid object id: {}", name, id)));
    }
    Ok(())
}

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum quoted price impact (e.g., 5.0 for 5%)
    pub max_price_impact_percent: f64,
    /// Minimum seconds between accepted trades per agent
    pub cooldown_seconds: u64,
    /// Slippage tolerance used for minimum-output hints (basis points)
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u64,
}

fn default_slippage_bps() -> u64 {
    50
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_price_impact_percent: 5.0,
            cooldown_seconds: 60,
            slippage_bps: default_slippage_bps(),
        }
    }
}

/// How trade transactions get signed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Sender address; the keystore must hold its key
    pub address: Option<String>,
    /// `sui` binary used for `keytool sign`
    pub sui_binary: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            address: None,
            sui_binary: "sui".to_string(),
        }
    }
}

/// Every arena vault starts with 3,000 USDC
fn default_initial_deposit_usdc() -> Option<u64> {
    Some(3_000_000_000)
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: Network,
    pub objects: ArenaObjects,
    pub risk: RiskConfig,
    /// Agent this process trades for (the vault key in the season)
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub paper: PaperModeConfig,
    /// Gas budget in MIST for trade transactions
    pub gas_budget: u64,
    /// Starting deposit (USDC smallest units) PnL is measured against when a
    /// vault object does not record its own; `null` leaves PnL unset
    #[serde(default = "default_initial_deposit_usdc")]
    pub initial_deposit_usdc: Option<u64>,
    /// Path to the submission journal (JSONL)
    pub audit_log_path: Option<String>,
    /// Directory of the local rationale store; one `<pointer-hex>.json`
    /// file per stored rationale
    #[serde(default)]
    pub audit_store_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            objects: ArenaObjects::default(),
            risk: RiskConfig::default(),
            agent_id: None,
            signer: SignerConfig::default(),
            paper: PaperModeConfig::default(),
            gas_budget: 50_000_000,
            initial_deposit_usdc: default_initial_deposit_usdc(),
            audit_log_path: Some("audit.jsonl".to_string()),
            audit_store_path: Some("rationales".to_string()),
        }
    }
}

impl Config {
    /// Load defaults or a JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                serde_json::from_str(&content)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
            }
            None => Config::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(network) = std::env::var(env_vars::NETWORK) {
            self.network = Network::parse(&network)?;
        }
        if let Ok(agent) = std::env::var(env_vars::AGENT_ID) {
            self.agent_id = Some(agent);
        }
        if let Ok(address) = std::env::var(env_vars::SIGNER_ADDRESS) {
            self.signer.address = Some(address);
        }
        self.objects.apply_env();
        Ok(())
    }

    /// Reject configurations missing any identifier a component needs.
    pub fn validate(&self) -> Result<()> {
        self.objects.validate()?;
        if let Some(agent) = &self.agent_id {
            if agent.trim().is_empty() {
                return Err(Error::Config("agent_id must not be blank".to_string()));
            }
        }
        if !(self.risk.max_price_impact_percent > 0.0) {
            return Err(Error::Config(
                "risk.max_price_impact_percent must be positive".to_string(),
            ));
        }
        if self.risk.slippage_bps >= 10_000 {
            return Err(Error::Config("risk.slippage_bps must be below 10000".to_string()));
        }
        Ok(())
    }

    /// Configured agent, or a configuration error naming the field.
    pub fn require_agent(&self) -> Result<&str> {
        self.agent_id
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("agent_id is required (set {})", env_vars::AGENT_ID)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert!(config.objects.usdc_type.ends_with("::mock_usdc::MOCK_USDC"));
    }

    #[test]
    fn test_missing_pool_id_names_field() {
        let mut config = Config::default();
        config.objects.pool_id = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("objects.pool_id"));
    }

    #[test]
    fn test_malformed_object_id_rejected() {
        let mut config = Config::default();
        config.objects.season_global_id = "0xnothex".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("objects.season_global_id"));
    }

    #[test]
    fn test_deserialize_fills_optional_sections() {
        let value = serde_json::json!({
            "network": "devnet",
            "objects": {
                "package_id": "0x1",
                "season_global_id": "0x2",
                "dex_global_id": "0x3",
                "pool_id": "0x4",
                "usdc_type": "0x1::usdc::USDC",
                "btc_type": "0x1::btc::BTC"
            },
            "risk": {
                "max_price_impact_percent": 2.5,
                "cooldown_seconds": 10
            },
            "gas_budget": 10000000,
            "audit_log_path": null
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.network, Network::Devnet);
        assert_eq!(parsed.risk.slippage_bps, 50);
        assert!(!parsed.paper.enabled);
        assert_eq!(parsed.signer.sui_binary, "sui");
        assert_eq!(parsed.initial_deposit_usdc, Some(3_000_000_000));
        parsed.validate().unwrap();

        let mut value = serde_json::to_value(&parsed).unwrap();
        value["initial_deposit_usdc"] = serde_json::Value::Null;
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.initial_deposit_usdc, None);
    }

    #[test]
    fn test_require_agent() {
        let mut config = Config::default();
        assert!(matches!(config.require_agent(), Err(Error::Config(_))));
        config.agent_id = Some("deepseek".to_string());
        assert_eq!(config.require_agent().unwrap(), "deepseek");
    }

    #[test]
    fn test_network_parse() {
        assert_eq!(Network::parse("Mainnet").unwrap(), Network::Mainnet);
        assert!(Network::parse("ethereum").is_err());
    }
}
