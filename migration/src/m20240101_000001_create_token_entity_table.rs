use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TokenEntity::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TokenEntity::TokenId).string_len(255).not_null().primary_key())
                    .col(ColumnDef::new(TokenEntity::Name).string_len(255).not_null())
                    .col(ColumnDef::new(TokenEntity::Symbol).string_len(50).not_null())
                    .col(ColumnDef::new(TokenEntity::Price).double().not_null())
                    .col(
                        ColumnDef::new(TokenEntity::Price24hChange)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(TokenEntity::ImageUrl).string().null())
                    .col(
                        ColumnDef::new(TokenEntity::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Catalog listings are ordered by name
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_token_entity_name")
                    .table(TokenEntity::Table)
                    .col(TokenEntity::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TokenEntity::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TokenEntity {
    Table,
    TokenId,
    Name,
    Symbol,
    Price,
    #[sea_orm(iden = "price_24h_change")]
    Price24hChange,
    ImageUrl,
    UpdatedAt,
}
