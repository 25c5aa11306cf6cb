use chrono::Utc;
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

use crate::db::entity::token_entity;
use crate::error::{ AppError, Result };
use crate::providers::TokenData;

/// Token metadata cache keyed by mint address.
#[derive(Clone)]
pub struct TokenCatalog {
    db: DatabaseConnection,
}

impl TokenCatalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn exists(&self, token_id: &str) -> Result<bool> {
        let count = token_entity::Entity
            ::find()
            .filter(token_entity::Column::TokenId.eq(token_id))
            .count(&self.db).await?;
        Ok(count > 0)
    }

    /// Insert or overwrite the record for `token.token_id`; `updated_at` is always bumped.
    pub async fn upsert(&self, token: &TokenData) -> Result<()> {
        validate(token)?;

        let model = token_entity::ActiveModel {
            token_id: ActiveValue::Set(token.token_id.clone()),
            name: ActiveValue::Set(token.name.clone()),
            symbol: ActiveValue::Set(token.symbol.clone()),
            price: ActiveValue::Set(token.price),
            price_24h_change: ActiveValue::Set(
                if token.price_24h_change.is_finite() { token.price_24h_change } else { 0.0 }
            ),
            image_url: ActiveValue::Set(token.image_url.clone()),
            updated_at: ActiveValue::Set(Utc::now()),
        };

        token_entity::Entity
            ::insert(model)
            .on_conflict(
                OnConflict::column(token_entity::Column::TokenId)
                    .update_columns([
                        token_entity::Column::Name,
                        token_entity::Column::Symbol,
                        token_entity::Column::Price,
                        token_entity::Column::Price24hChange,
                        token_entity::Column::ImageUrl,
                        token_entity::Column::UpdatedAt,
                    ])
                    .to_owned()
            )
            .exec_without_returning(&self.db).await?;

        tracing::debug!(token = %token.token_id, symbol = %token.symbol, "Token metadata stored");
        Ok(())
    }

    pub async fn get(&self, token_id: &str) -> Result<Option<token_entity::Model>> {
        let record = token_entity::Entity::find_by_id(token_id.to_string()).one(&self.db).await?;
        Ok(record)
    }

    pub async fn list_all(&self) -> Result<Vec<token_entity::Model>> {
        let records = token_entity::Entity
            ::find()
            .order_by_asc(token_entity::Column::Name)
            .order_by_asc(token_entity::Column::TokenId)
            .all(&self.db).await?;
        Ok(records)
    }
}

fn validate(token: &TokenData) -> Result<()> {
    let missing = [
        ("token_id", token.token_id.trim().is_empty()),
        ("name", token.name.trim().is_empty()),
        ("symbol", token.symbol.trim().is_empty()),
        ("price", !token.price.is_finite()),
    ];

    match missing.iter().find(|(_, is_missing)| *is_missing) {
        Some((field, _)) =>
            Err(
                AppError::InvalidInput(
                    format!("Token record for '{}' is missing {}", token.token_id, field)
                )
            ),
        None => Ok(()),
    }
}
