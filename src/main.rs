//! Trade Arena agent CLI
//!
//! Command-line interface for reading arena state and submitting agent trades.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use trade_arena_agent::tools::{AgentTool, ArenaTool, ArenaToolInput, TradeArgs};
use trade_arena_agent::tokens::{parse_units, Asset};
use trade_arena_agent::{ArenaRuntime, Config, ReferencePrice, Result, SwapQuoteEngine, VaultRef};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Paper state file used when `--paper` is given without one configured
const DEFAULT_PAPER_STATE: &str = "paper_arena.json";

#[derive(Parser)]
#[command(name = "arena-agent")]
#[command(about = "AI trading agent for the on-chain trade arena")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use the simulated paper arena instead of a full node
    #[arg(long, global = true)]
    paper: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show pool reserves, fee and pause state
    Pool {
        /// Pool object id (defaults to the configured pool)
        #[arg(long)]
        pool: Option<String>,
    },

    /// Quote a swap against the current pool state
    Quote {
        /// Input token (USDC, BTC or a coin type)
        #[arg(long)]
        from: String,

        /// Output token (USDC, BTC or a coin type)
        #[arg(long)]
        to: String,

        /// Amount in whole units, e.g. 1000.5
        #[arg(long)]
        amount: String,
    },

    /// Show a season and its agents (defaults to the current season)
    Season {
        #[arg(long)]
        season: Option<u64>,
    },

    /// Value one agent's vault
    Position {
        #[arg(long)]
        season: Option<u64>,

        /// Agent id (defaults to ARENA_AGENT_ID)
        #[arg(long)]
        agent: Option<String>,

        /// USDC per BTC (defaults to the pool mid price)
        #[arg(long)]
        price: Option<String>,
    },

    /// Rank every vault in a season by current value
    Leaderboard {
        #[arg(long)]
        season: Option<u64>,

        #[arg(long)]
        price: Option<String>,
    },

    /// Show decoded trade history, newest first
    History {
        #[arg(long)]
        season: Option<u64>,

        #[arg(long)]
        agent: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Spend USDC for BTC
    Long(TradeCommand),

    /// Spend BTC for USDC
    Short(TradeCommand),

    /// Show current configuration
    Config,

    /// Print the agent tool schema
    Schema,
}

#[derive(clap::Args)]
struct TradeCommand {
    /// Amount to spend in whole units, e.g. 250 USDC or 0.01 BTC
    #[arg(long)]
    amount: String,

    /// Rationale; stored in full off-ledger, truncated to 100 characters on-ledger
    #[arg(long)]
    reasoning: String,

    /// Confidence from 0 to 100
    #[arg(long)]
    confidence: u32,

    /// Hex pointer to an already stored rationale
    #[arg(long)]
    audit_pointer: Option<String>,

    #[arg(long)]
    season: Option<u64>,

    #[arg(long)]
    agent: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let fmt_layer = if cli.json_logs {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.paper {
        config.paper.enabled = true;
        if config.paper.state_file.is_none() {
            config.paper.state_file = Some(DEFAULT_PAPER_STATE.to_string());
        }
    }

    if let Commands::Config = cli.command {
        return print_json(&config);
    }

    let runtime = Arc::new(ArenaRuntime::connect(config).await?);

    match cli.command {
        Commands::Pool { pool } => {
            let pools = runtime.pools();
            let pool_ref = pool.unwrap_or_else(|| pools.default_pool_ref().to_string());
            print_json(&pools.get_pool_state(&pool_ref).await?)?;
        }
        Commands::Quote { from, to, amount } => {
            let tokens = runtime.tokens();
            let input = tokens.resolve_or_err(&from, "from")?;
            let output = tokens.resolve_or_err(&to, "to")?;
            let amount_in = parse_units(&amount, input.decimals())?;
            let pool = runtime.pools().get_default_pool().await?;
            let quote = SwapQuoteEngine::quote(&input.coin_type, &output.coin_type, amount_in, &pool)?;
            print_json(&quote)?;
        }
        Commands::Season { season } => {
            let seasons = runtime.seasons();
            let season = match season {
                Some(n) => seasons.get_season(n).await?,
                None => seasons.current_season().await?,
            };
            print_json(&season)?;
        }
        Commands::Position {
            season,
            agent,
            price,
        } => {
            let agent = match agent {
                Some(agent) => agent,
                None => runtime.config().require_agent()?.to_string(),
            };
            let season = resolve_season(&runtime, season).await?;
            let price = resolve_price(&runtime, price).await?;
            let position = runtime
                .accountant()
                .get_position(&VaultRef::new(season, agent), price)
                .await?;
            print_json(&position)?;
        }
        Commands::Leaderboard { season, price } => {
            let season = resolve_season(&runtime, season).await?;
            let price = resolve_price(&runtime, price).await?;
            print_json(&runtime.accountant().get_positions(season, price).await?)?;
        }
        Commands::History {
            season,
            agent,
            limit,
        } => {
            let tool = ArenaTool::new(runtime.clone());
            let result = tool
                .execute(ArenaToolInput::GetTradeHistory {
                    season_number: season,
                    agent_id: agent,
                    limit,
                })
                .await?;
            print_json(&result)?;
        }
        Commands::Long(trade) => {
            let args = trade_args(trade, Asset::Usdc)?;
            let tool = ArenaTool::new(runtime.clone());
            print_json(&tool.execute(ArenaToolInput::ExecuteLong(args)).await?)?;
        }
        Commands::Short(trade) => {
            let args = trade_args(trade, Asset::Btc)?;
            let tool = ArenaTool::new(runtime.clone());
            print_json(&tool.execute(ArenaToolInput::ExecuteShort(args)).await?)?;
        }
        Commands::Schema => {
            let tool = ArenaTool::new(runtime.clone());
            print_json(&tool.spec())?;
        }
        Commands::Config => {}
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn resolve_season(runtime: &ArenaRuntime, season: Option<u64>) -> Result<u64> {
    match season {
        Some(n) => Ok(n),
        None => Ok(runtime.seasons().current_season().await?.season_number),
    }
}

async fn resolve_price(runtime: &ArenaRuntime, price: Option<String>) -> Result<ReferencePrice> {
    match price {
        Some(text) => ReferencePrice::from_decimal_str(&text),
        None => runtime.oracle().reference_price().await,
    }
}

fn trade_args(trade: TradeCommand, spent: Asset) -> Result<TradeArgs> {
    Ok(TradeArgs {
        amount: parse_units(&trade.amount, spent.decimals())?,
        reasoning: trade.reasoning,
        confidence: trade.confidence,
        audit_pointer: trade.audit_pointer,
        season_number: trade.season,
        agent_id: trade.agent,
        market_context: None,
    })
}
