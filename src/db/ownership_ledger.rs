use std::collections::HashMap;

use chrono::Utc;
use sea_orm::prelude::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue,
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::db::entity::{ token_account, token_entity };
use crate::error::{ AppError, Result };

/// Whether an upsert created the row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

/// An ownership row joined with what the catalog knows about its token.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnershipView {
    pub record: token_account::Model,
    pub token_name: Option<String>,
    pub token_price: f64,
}

impl OwnershipView {
    pub fn ui_amount(&self) -> f64 {
        let raw = f64::try_from(self.record.balance).unwrap_or(0.0);
        raw / (10f64).powi(self.record.decimals.into())
    }

    pub fn usd_value(&self) -> f64 {
        self.ui_amount() * self.token_price
    }
}

/// Wallet-to-token balances, one row per (wallet, mint).
#[derive(Clone)]
pub struct OwnershipLedger {
    db: DatabaseConnection,
}

impl OwnershipLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn exists(&self, wallet_address: &str, token_mint: &str) -> Result<bool> {
        let count = token_account::Entity
            ::find()
            .filter(token_account::Column::WalletAddress.eq(wallet_address))
            .filter(token_account::Column::TokenMint.eq(token_mint))
            .count(&self.db).await?;
        Ok(count > 0)
    }

    pub async fn upsert(
        &self,
        wallet_address: &str,
        token_mint: &str,
        balance: Decimal,
        symbol: &str,
        decimals: u8
    ) -> Result<Upserted> {
        if wallet_address.trim().is_empty() || token_mint.trim().is_empty() {
            return Err(AppError::InvalidInput("Ownership record needs a wallet and a mint".into()));
        }
        if balance.is_sign_negative() && !balance.is_zero() {
            return Err(
                AppError::InvalidInput(format!("Negative balance {} for {}", balance, token_mint))
            );
        }
        let balance = balance.trunc();

        let outcome = if self.exists(wallet_address, token_mint).await? {
            Upserted::Updated
        } else {
            Upserted::Created
        };

        let now = Utc::now();
        let model = token_account::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            wallet_address: ActiveValue::Set(wallet_address.to_string()),
            token_mint: ActiveValue::Set(token_mint.to_string()),
            balance: ActiveValue::Set(balance),
            symbol: ActiveValue::Set(symbol.to_string()),
            decimals: ActiveValue::Set(decimals.into()),
            created_at: ActiveValue::Set(now),
            last_updated: ActiveValue::Set(now),
        };

        token_account::Entity
            ::insert(model)
            .on_conflict(
                OnConflict::columns([
                    token_account::Column::WalletAddress,
                    token_account::Column::TokenMint,
                ])
                    .update_columns([
                        token_account::Column::Balance,
                        token_account::Column::Symbol,
                        token_account::Column::Decimals,
                        token_account::Column::LastUpdated,
                    ])
                    .to_owned()
            )
            .exec_without_returning(&self.db).await?;

        Ok(outcome)
    }

    /// Delete rows for `wallet_address` whose mint is not in `current_mints`.
    ///
    /// An empty `current_mints` deletes nothing: an empty holding set cannot be told
    /// apart from a failed poll.
    pub async fn reconcile(&self, wallet_address: &str, current_mints: &[String]) -> Result<u64> {
        if current_mints.is_empty() {
            tracing::warn!(wallet = %wallet_address, "Empty holding set, skipping reconcile");
            return Ok(0);
        }

        let result = token_account::Entity
            ::delete_many()
            .filter(token_account::Column::WalletAddress.eq(wallet_address))
            .filter(token_account::Column::TokenMint.is_not_in(current_mints.iter().cloned()))
            .exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::info!(
                wallet = %wallet_address,
                removed = result.rows_affected,
                "Removed stale ownership records"
            );
        }
        Ok(result.rows_affected)
    }

    pub async fn list_by_wallet(&self, wallet_address: &str) -> Result<Vec<OwnershipView>> {
        let records = token_account::Entity
            ::find()
            .filter(token_account::Column::WalletAddress.eq(wallet_address))
            .order_by_asc(token_account::Column::CreatedAt)
            .order_by_asc(token_account::Column::TokenMint)
            .all(&self.db).await?;

        let mints: Vec<String> = records
            .iter()
            .map(|r| r.token_mint.clone())
            .collect();
        let tokens: HashMap<String, token_entity::Model> = token_entity::Entity
            ::find()
            .filter(token_entity::Column::TokenId.is_in(mints))
            .all(&self.db).await?
            .into_iter()
            .map(|t| (t.token_id.clone(), t))
            .collect();

        Ok(
            records
                .into_iter()
                .map(|record| {
                    let token = tokens.get(&record.token_mint);
                    OwnershipView {
                        token_name: token.map(|t| t.name.clone()),
                        token_price: token.map(|t| t.price).unwrap_or(0.0),
                        record,
                    }
                })
                .collect()
        )
    }
}
