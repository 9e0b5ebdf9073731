//! Arena runtime
//!
//! Builds every component from one [`Config`] and one ledger. Nothing is
//! global: two runtimes over two ledgers never share state.

use crate::audit::{AuditPointer, AuditStore, LocalAuditStore, TradeRationale};
use crate::config::{Config, RpcConfig};
use crate::history::HistoryReader;
use crate::interceptors::{AuditLogInterceptor, CooldownInterceptor, SlippageGuardInterceptor};
use crate::ledger::{KeytoolSigner, Ledger, SuiRpcLedger};
use crate::oracle::{PoolPriceOracle, PriceOracle};
use crate::paper_trading::PaperLedger;
use crate::pool::{LiquidityPool, PoolStateReader};
use crate::season::{Season, SeasonReader};
use crate::tokens::TokenRegistry;
use crate::trade::TradeExecutor;
use crate::vault::VaultAccountant;
use crate::Result;
use std::sync::Arc;

/// All arena components over one ledger
pub struct ArenaRuntime {
    config: Config,
    ledger: Arc<dyn Ledger>,
    tokens: TokenRegistry,
    pools: PoolStateReader,
    seasons: SeasonReader,
    accountant: VaultAccountant,
    history: HistoryReader,
    oracle: Arc<dyn PriceOracle>,
    executor: TradeExecutor,
    audit_store: Option<Arc<dyn AuditStore>>,
}

impl ArenaRuntime {
    /// Wire components over an existing ledger
    pub fn build(config: Config, ledger: Arc<dyn Ledger>) -> Result<Self> {
        config.validate()?;
        let objects = &config.objects;

        let pools = PoolStateReader::new(ledger.clone(), objects);
        let seasons = SeasonReader::new(ledger.clone(), objects.season_global_id.clone());
        let oracle: Arc<dyn PriceOracle> = Arc::new(PoolPriceOracle::new(
            pools.clone(),
            objects.usdc_type.clone(),
            objects.btc_type.clone(),
        ));

        let mut executor = TradeExecutor::new(ledger.clone(), objects.clone())
            .with_slippage_bps(config.risk.slippage_bps)
            .with_interceptor(Arc::new(SlippageGuardInterceptor::new(
                config.risk.max_price_impact_percent,
            )));
        if config.risk.cooldown_seconds > 0 {
            executor = executor.with_interceptor(Arc::new(CooldownInterceptor::new(
                config.risk.cooldown_seconds,
            )));
        }
        if let Some(path) = &config.audit_log_path {
            executor = executor.with_interceptor(Arc::new(AuditLogInterceptor::new(path)));
        }

        let audit_store = config
            .audit_store_path
            .as_ref()
            .map(|dir| Arc::new(LocalAuditStore::new(dir)) as Arc<dyn AuditStore>);

        tracing::info!(
            ledger = ledger.name(),
            network = config.network.name(),
            pool = %objects.pool_id,
            audit_log = ?config.audit_log_path,
            "Arena runtime ready"
        );

        Ok(Self {
            tokens: TokenRegistry::new(objects),
            accountant: VaultAccountant::new(seasons.clone())
                .with_default_initial_deposit(config.initial_deposit_usdc),
            history: HistoryReader::new(seasons.clone()),
            pools,
            seasons,
            oracle,
            executor,
            audit_store,
            ledger,
            config,
        })
    }

    /// Paper ledger when `paper.enabled`, otherwise the configured full node.
    pub async fn connect(config: Config) -> Result<Self> {
        let ledger: Arc<dyn Ledger> = if config.paper.enabled {
            tracing::info!(state_file = ?config.paper.state_file, "Paper trading mode");
            Arc::new(PaperLedger::load_or_create(&config.paper, &config.objects).await?)
        } else {
            let rpc = RpcConfig::from_env(config.network)?;
            let mut ledger = SuiRpcLedger::new(rpc, config.gas_budget);
            if let Some(address) = &config.signer.address {
                ledger = ledger.with_signer(Arc::new(KeytoolSigner::new(
                    address.clone(),
                    config.signer.sui_binary.clone(),
                )));
            }
            Arc::new(ledger)
        };
        Self::build(config, ledger)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn pools(&self) -> &PoolStateReader {
        &self.pools
    }

    pub fn seasons(&self) -> &SeasonReader {
        &self.seasons
    }

    pub fn accountant(&self) -> &VaultAccountant {
        &self.accountant
    }

    pub fn history(&self) -> &HistoryReader {
        &self.history
    }

    pub fn oracle(&self) -> &Arc<dyn PriceOracle> {
        &self.oracle
    }

    pub fn executor(&self) -> &TradeExecutor {
        &self.executor
    }

    /// Pool and current season read concurrently
    pub async fn market_snapshot(&self) -> Result<(LiquidityPool, Season)> {
        futures::try_join!(self.pools.get_default_pool(), self.seasons.current_season())
    }

    /// Store a rationale and return the pointer to embed in its trade. Without
    /// a configured store the pointer is still the payload digest.
    pub async fn record_rationale(&self, rationale: &TradeRationale) -> Result<AuditPointer> {
        match &self.audit_store {
            Some(store) => rationale.store(store.as_ref()).await,
            None => {
                tracing::warn!(agent = %rationale.agent_id, "No audit store configured, rationale not persisted");
                Ok(AuditPointer::digest(&serde_json::to_vec(rationale)?))
            }
        }
    }

    pub async fn load_rationale(&self, pointer: &AuditPointer) -> Result<Option<TradeRationale>> {
        match &self.audit_store {
            Some(store) => TradeRationale::load(store.as_ref(), pointer).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper_trading::PaperModeConfig;
    use crate::trade::{TradeAction, TradeOutcome, TradeRequest};
    use crate::Error;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        Config {
            audit_log_path: Some(dir.path().join("audit.jsonl").to_string_lossy().to_string()),
            audit_store_path: Some(dir.path().join("rationales").to_string_lossy().to_string()),
            paper: PaperModeConfig {
                enabled: true,
                ..PaperModeConfig::default()
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_market_snapshot() {
        let dir = TempDir::new().unwrap();
        let runtime = ArenaRuntime::connect(config(&dir)).await.unwrap();
        let (pool, season) = runtime.market_snapshot().await.unwrap();
        assert_eq!(pool.reserve_x, 1_000_000_000_000);
        assert!(season.is_active());
        assert_eq!(season.vaults.len(), 4);
    }

    #[tokio::test]
    async fn test_rationale_to_trade_to_history() {
        let dir = TempDir::new().unwrap();
        let runtime = ArenaRuntime::connect(config(&dir)).await.unwrap();

        let rationale = TradeRationale {
            agent_id: "claude".to_string(),
            action: TradeAction::Long,
            season_number: 1,
            reasoning: "Funding flipped negative while spot held; expecting squeeze".to_string(),
            confidence: 66,
            market_context: json!({ "rsi": 41 }),
            created_at: Utc::now(),
        };
        let pointer = runtime.record_rationale(&rationale).await.unwrap();

        let outcome = runtime
            .executor()
            .execute(TradeRequest {
                season_number: 1,
                agent_id: "claude".to_string(),
                action: TradeAction::Long,
                amount: 250_000_000,
                reasoning: crate::trade::truncate_reasoning(&rationale.reasoning),
                confidence: 66,
                audit_pointer: pointer.to_hex(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, TradeOutcome::Confirmed(_)));

        let history = runtime
            .history()
            .vault_history(&crate::season::VaultRef::new(1, "claude"))
            .await
            .unwrap();
        assert_eq!(history.records.len(), 1);
        let stored = runtime
            .load_rationale(&history.records[0].audit_pointer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, rationale);

        let journal = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
        assert_eq!(journal.lines().count(), 2);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = Config::default();
        config.objects.pool_id = String::new();
        let ledger: Arc<dyn Ledger> = Arc::new(PaperLedger::new(
            &PaperModeConfig::default(),
            &config.objects,
        ));
        assert!(matches!(ArenaRuntime::build(config, ledger), Err(Error::Config(_))));
    }
}
