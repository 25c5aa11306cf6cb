use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::sync::watch;

use crate::db::{ OwnershipLedger, TokenCatalog, Upserted, WalletRegistry };
use crate::error::{ AppError, Result };
use crate::providers::{ ChainClient, MarketDataClient, TokenHolding, TokenLookup };

/// Counters for one pipeline pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub wallets_total: usize,
    pub wallets_synced: usize,
    /// Wallets whose poll came back empty; nothing was written or deleted for them.
    pub wallets_empty: usize,
    pub wallets_failed: usize,
    pub tokens_fetched: usize,
    pub tokens_not_listed: usize,
    pub tokens_unavailable: usize,
    pub holdings_created: usize,
    pub holdings_updated: usize,
    pub holdings_skipped: usize,
    pub holdings_removed: u64,
    pub interrupted: bool,
}

impl SyncReport {
    fn log(&self) {
        tracing::info!(
            wallets = self.wallets_total,
            synced = self.wallets_synced,
            empty = self.wallets_empty,
            failed = self.wallets_failed,
            fetched = self.tokens_fetched,
            not_listed = self.tokens_not_listed,
            unavailable = self.tokens_unavailable,
            created = self.holdings_created,
            updated = self.holdings_updated,
            skipped = self.holdings_skipped,
            removed = self.holdings_removed,
            interrupted = self.interrupted,
            "Sync pass finished"
        );
    }
}

/// Polls each wallet's holdings and brings the catalog and ledger in line with them.
pub struct ReconciliationPipeline {
    chain: Arc<dyn ChainClient>,
    market: Arc<dyn MarketDataClient>,
    catalog: TokenCatalog,
    ledger: OwnershipLedger,
    registry: WalletRegistry,
    wallet_override: Option<String>,
    wallet_delay: Duration,
}

impl ReconciliationPipeline {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        market: Arc<dyn MarketDataClient>,
        db: DatabaseConnection
    ) -> Self {
        Self {
            chain,
            market,
            catalog: TokenCatalog::new(db.clone()),
            ledger: OwnershipLedger::new(db.clone()),
            registry: WalletRegistry::new(db),
            wallet_override: None,
            wallet_delay: Duration::from_secs(1),
        }
    }

    /// Poll only this wallet instead of the registry.
    pub fn with_wallet(mut self, wallet_address: Option<String>) -> Self {
        self.wallet_override = wallet_address;
        self
    }

    pub fn with_wallet_delay(mut self, delay: Duration) -> Self {
        self.wallet_delay = delay;
        self
    }

    /// One full pass over every wallet.
    ///
    /// A failing wallet is logged and counted; it never stops the pass. `shutdown`
    /// is checked between wallets.
    pub async fn run(&self, shutdown: &watch::Receiver<bool>) -> Result<SyncReport> {
        let wallets = self.resolve_wallets().await?;
        let mut report = SyncReport {
            wallets_total: wallets.len(),
            ..Default::default()
        };

        tracing::info!(wallets = wallets.len(), "Starting sync pass");

        for (index, wallet) in wallets.iter().enumerate() {
            if *shutdown.borrow() {
                tracing::warn!(remaining = wallets.len() - index, "Shutdown requested, stopping");
                report.interrupted = true;
                break;
            }

            if let Err(e) = self.sync_wallet(wallet, &mut report).await {
                report.wallets_failed += 1;
                tracing::error!(wallet = %wallet, error = %e, "Wallet sync failed");
            }

            if index + 1 < wallets.len() && !self.wallet_delay.is_zero() {
                let mut shutdown = shutdown.clone();
                tokio::select! {
                    _ = tokio::time::sleep(self.wallet_delay) => {}
                    _ = wait_for_shutdown(&mut shutdown) => {}
                }
            }
        }

        report.log();
        Ok(report)
    }

    async fn resolve_wallets(&self) -> Result<Vec<String>> {
        if let Some(wallet) = &self.wallet_override {
            return Ok(vec![wallet.clone()]);
        }

        let wallets = self.registry.list_wallets().await?;
        if wallets.is_empty() {
            return Err(AppError::NoWallets);
        }
        Ok(wallets)
    }

    async fn sync_wallet(&self, wallet: &str, report: &mut SyncReport) -> Result<()> {
        let holdings = self.chain.get_holdings(wallet).await;
        if holdings.is_empty() {
            tracing::warn!(wallet = %wallet, "No holdings returned, leaving ledger untouched");
            report.wallets_empty += 1;
            return Ok(());
        }

        tracing::info!(wallet = %wallet, holdings = holdings.len(), "Processing holdings");

        let mut seen = Vec::with_capacity(holdings.len());
        for holding in &holdings {
            seen.push(holding.token_id.clone());

            match self.sync_holding(wallet, holding, report).await {
                Ok(()) => {}
                Err(e) if e.is_validation() => {
                    report.holdings_skipped += 1;
                    tracing::error!(
                        wallet = %wallet,
                        token = %holding.token_id,
                        error = %e,
                        "Skipping invalid holding"
                    );
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }

        report.holdings_removed += self.ledger.reconcile(wallet, &seen).await?;
        report.wallets_synced += 1;
        Ok(())
    }

    async fn sync_holding(
        &self,
        wallet: &str,
        holding: &TokenHolding,
        report: &mut SyncReport
    ) -> Result<()> {
        let token_id = holding.token_id.as_str();
        let raw_balance = holding
            .raw_balance()
            .ok_or_else(||
                AppError::InvalidInput(format!("Amount {} cannot be scaled", holding.ui_amount))
            )?;

        let symbol = if self.catalog.exists(token_id).await? {
            match self.catalog.get(token_id).await {
                Ok(Some(record)) => record.symbol,
                Ok(None) => {
                    tracing::warn!(token = %token_id, "Catalog record vanished, skipping");
                    report.holdings_skipped += 1;
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(token = %token_id, error = %e, "Catalog read failed, skipping");
                    report.holdings_skipped += 1;
                    return Ok(());
                }
            }
        } else {
            match self.market.get_token_data(token_id).await {
                TokenLookup::Found(data) => {
                    self.catalog.upsert(&data).await?;
                    report.tokens_fetched += 1;
                    data.symbol
                }
                TokenLookup::NotListed => {
                    tracing::warn!(token = %token_id, "Token not listed, ownership not recorded");
                    report.tokens_not_listed += 1;
                    report.holdings_skipped += 1;
                    return Ok(());
                }
                TokenLookup::Unavailable => {
                    tracing::warn!(token = %token_id, "Market data unavailable, ownership not recorded");
                    report.tokens_unavailable += 1;
                    report.holdings_skipped += 1;
                    return Ok(());
                }
            }
        };

        let outcome = self.ledger.upsert(
            wallet,
            token_id,
            raw_balance,
            &symbol,
            holding.decimals
        ).await?;

        match outcome {
            Upserted::Created => {
                report.holdings_created += 1;
            }
            Upserted::Updated => {
                report.holdings_updated += 1;
            }
        }

        tracing::debug!(
            wallet = %wallet,
            token = %token_id,
            balance = %raw_balance,
            symbol = %symbol,
            "Ownership recorded"
        );
        Ok(())
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
