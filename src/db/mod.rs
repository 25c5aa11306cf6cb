use sea_orm::{ DatabaseConnection, EntityTrait, QueryOrder };

use crate::error::Result;

pub mod entity;

mod token_catalog;
pub use token_catalog::TokenCatalog;

mod ownership_ledger;
pub use ownership_ledger::{ OwnershipLedger, OwnershipView, Upserted };

pub type TokenRecord = entity::token_entity::Model;
pub type OwnershipRecord = entity::token_account::Model;

/// Wallets the pipeline polls when no single wallet is configured.
#[derive(Clone)]
pub struct WalletRegistry {
    db: DatabaseConnection,
}

impl WalletRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_wallets(&self) -> Result<Vec<String>> {
        let wallets = entity::wallet_to_monitor::Entity
            ::find()
            .order_by_asc(entity::wallet_to_monitor::Column::AddedAt)
            .order_by_asc(entity::wallet_to_monitor::Column::Id)
            .all(&self.db).await?;

        Ok(
            wallets
                .into_iter()
                .map(|w| w.wallet_address)
                .collect()
        )
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{ Duration, Utc };
    use migration::{ Migrator, MigratorTrait };
    use sea_orm::{ ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set };
    use uuid::Uuid;

    use super::entity::wallet_to_monitor;

    /// Fresh in-memory SQLite database with the schema applied.
    pub async fn memory_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);

        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    /// Register wallets with strictly increasing `added_at`.
    pub async fn register_wallets(db: &DatabaseConnection, addresses: &[&str]) {
        let start = Utc::now() - Duration::hours(1);
        for (i, address) in addresses.iter().enumerate() {
            (wallet_to_monitor::ActiveModel {
                id: Set(Uuid::new_v4()),
                wallet_address: Set(address.to_string()),
                added_at: Set(start + Duration::seconds(i as i64)),
            })
                .insert(db).await
                .unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::{ memory_db, register_wallets };

    #[tokio::test]
    async fn test_list_wallets_in_registration_order() {
        let db = memory_db().await;
        register_wallets(&db, &["Second", "First", "Third"]).await;

        let wallets = WalletRegistry::new(db).list_wallets().await.unwrap();
        assert_eq!(wallets, vec!["Second", "First", "Third"]);
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let wallets = WalletRegistry::new(memory_db().await).list_wallets().await.unwrap();
        assert!(wallets.is_empty());
    }
}
