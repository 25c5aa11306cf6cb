use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ Parser, Subcommand };
use sea_orm::{ ConnectOptions, Database, DatabaseConnection };
use tokio::sync::watch;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

use migration::{ Migrator, MigratorTrait };
use token_monitor::chains::solana::SolanaRpcClient;
use token_monitor::db::{ OwnershipLedger, TokenCatalog };
use token_monitor::dex::DexscreenerClient;
use token_monitor::scheduler::Scheduler;
use token_monitor::services::{ ReconciliationPipeline, SyncReport };
use token_monitor::{ AppError, Config };

#[derive(Parser)]
#[command(author, version, about = "Solana wallet token holdings monitor")]
struct Cli {
    /// Key/value file loaded into the environment before reading configuration
    #[arg(short, long, global = true, default_value = ".env")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single sync pass
    Sync {
        /// Poll only this wallet instead of the wallet registry
        #[arg(short, long)]
        wallet: Option<String>,
    },
    /// Run sync passes on a fixed interval until interrupted
    Schedule {
        #[arg(short, long)]
        wallet: Option<String>,
        /// Minutes between passes
        #[arg(short, long)]
        interval: Option<u64>,
        /// Run a pass immediately instead of waiting one interval
        #[arg(long, default_value_t = false)]
        run_now: bool,
    },
    /// List the token catalog
    Tokens,
    /// List recorded holdings of a wallet
    Holdings {
        #[arg(short, long)]
        wallet: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "token_monitor=info".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(critical = true, "{:#}", e);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config).context("Failed to load configuration")?;

    let db = connect(&config).await?;

    match cli.command {
        Commands::Sync { wallet } => sync_once(&config, db, wallet).await?,
        Commands::Schedule { wallet, interval, run_now } => {
            schedule(&config, db, wallet, interval, run_now).await?
        }
        Commands::Tokens => list_tokens(db).await?,
        Commands::Holdings { wallet } => list_holdings(db, &wallet).await?,
    }

    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database.url.clone());
    options.max_connections(config.database.max_connections).sqlx_logging(false);

    let db = Database::connect(options).await.context("Failed to connect to database")?;
    tracing::info!("Database connected successfully");

    Migrator::up(&db, None).await.context("Failed to create tables")?;
    tracing::info!("Migrations completed successfully");

    Ok(db)
}

fn build_pipeline(
    config: &Config,
    db: DatabaseConnection,
    wallet: Option<String>
) -> anyhow::Result<ReconciliationPipeline> {
    let chain = Arc::new(SolanaRpcClient::from_config(&config.solana, config.include_native)?);
    let market = Arc::new(DexscreenerClient::from_config(&config.market_data)?);

    Ok(
        ReconciliationPipeline::new(chain, market, db)
            .with_wallet(wallet.or_else(|| config.wallet_address.clone()))
            .with_wallet_delay(config.wallet_delay)
    )
}

/// Shutdown channel flipped by Ctrl-C.
fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Shutdown signal received");
            let _ = tx.send(true);
        }
    });
    rx
}

async fn sync_once(
    config: &Config,
    db: DatabaseConnection,
    wallet: Option<String>
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, db, wallet)?;
    let shutdown = shutdown_on_ctrl_c();

    if let Some(report) = finish_sync(pipeline.run(&shutdown).await) {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Log a failed pass instead of surfacing it as a process error.
fn finish_sync(result: token_monitor::Result<SyncReport>) -> Option<SyncReport> {
    match result {
        Ok(report) => Some(report),
        Err(AppError::NoWallets) => {
            tracing::error!(
                critical = true,
                "No wallet address provided and the wallet registry is empty"
            );
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Sync pass aborted");
            None
        }
    }
}

async fn schedule(
    config: &Config,
    db: DatabaseConnection,
    wallet: Option<String>,
    interval: Option<u64>,
    run_now: bool
) -> anyhow::Result<()> {
    let interval = match interval {
        Some(0) => anyhow::bail!("--interval must be positive"),
        Some(minutes) => std::time::Duration::from_secs(minutes * 60),
        None => config.scheduler.interval,
    };

    let pipeline = build_pipeline(config, db, wallet)?;
    let scheduler = Scheduler::new(pipeline, interval, run_now || config.scheduler.run_now);
    scheduler.start(shutdown_on_ctrl_c()).await;
    Ok(())
}

async fn list_tokens(db: DatabaseConnection) -> anyhow::Result<()> {
    let tokens = TokenCatalog::new(db).list_all().await?;

    if tokens.is_empty() {
        println!("Token catalog is empty");
        return Ok(());
    }

    println!("{:<45} {:<24} {:<10} {:>16} {:>10}", "MINT", "NAME", "SYMBOL", "PRICE (USD)", "24H %");
    for token in tokens {
        println!(
            "{:<45} {:<24} {:<10} {:>16.8} {:>10.2}",
            token.token_id,
            token.name,
            token.symbol,
            token.price,
            token.price_24h_change
        );
    }
    Ok(())
}

async fn list_holdings(db: DatabaseConnection, wallet: &str) -> anyhow::Result<()> {
    let holdings = OwnershipLedger::new(db).list_by_wallet(wallet).await?;

    if holdings.is_empty() {
        println!("No holdings recorded for {}", wallet);
        return Ok(());
    }

    println!("{:<45} {:<24} {:>20} {:>16} {:>14}", "MINT", "TOKEN", "AMOUNT", "PRICE (USD)", "VALUE (USD)");
    let mut total = 0.0;
    for view in &holdings {
        total += view.usd_value();
        println!(
            "{:<45} {:<24} {:>20} {:>16.8} {:>14.2}",
            view.record.token_mint,
            view.token_name.as_deref().unwrap_or(&view.record.symbol),
            view.ui_amount(),
            view.token_price,
            view.usd_value()
        );
    }
    println!("Total: ${:.2}", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_sync_swallows_failures() {
        let db_down = AppError::Database(sea_orm::DbErr::Custom("connection refused".to_string()));
        assert!(finish_sync(Err(db_down)).is_none());
        assert!(finish_sync(Err(AppError::NoWallets)).is_none());
    }

    #[test]
    fn test_finish_sync_returns_report() {
        let report = SyncReport {
            wallets_total: 1,
            wallets_synced: 1,
            ..Default::default()
        };
        assert_eq!(finish_sync(Ok(report.clone())), Some(report));
    }

    #[test]
    fn test_cli_parses_schedule_flags() {
        let cli = Cli::try_parse_from([
            "token-monitor",
            "--config",
            "prod.env",
            "schedule",
            "--interval",
            "15",
            "--run-now",
        ]).unwrap();

        assert_eq!(cli.config, PathBuf::from("prod.env"));
        match cli.command {
            Commands::Schedule { wallet, interval, run_now } => {
                assert!(wallet.is_none());
                assert_eq!(interval, Some(15));
                assert!(run_now);
            }
            _ => panic!("expected schedule"),
        }
    }
}
