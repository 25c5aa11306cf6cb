use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut balance = ColumnDef::new(TokenAccounts::Balance);
        match manager.get_database_backend() {
            // SQLite hands decimals back through f64 and rejects INTEGER-typed cells
            sea_orm::DbBackend::Sqlite => balance.double(),
            _ => balance.decimal_len(38, 0),
        };

        manager.create_table(
            Table::create()
                .table(TokenAccounts::Table)
                .if_not_exists()
                .col(ColumnDef::new(TokenAccounts::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(TokenAccounts::WalletAddress).string().not_null())
                .col(ColumnDef::new(TokenAccounts::TokenMint).string_len(255).not_null())
                .col(balance.not_null())
                .col(ColumnDef::new(TokenAccounts::Symbol).string().not_null())
                .col(ColumnDef::new(TokenAccounts::Decimals).small_integer().not_null())
                .col(
                    ColumnDef::new(TokenAccounts::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .col(
                    ColumnDef::new(TokenAccounts::LastUpdated)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .to_owned()
        ).await?;

        // One row per (wallet, mint); upserts conflict on this index
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_token_accounts_wallet_mint")
                .table(TokenAccounts::Table)
                .col(TokenAccounts::WalletAddress)
                .col(TokenAccounts::TokenMint)
                .unique()
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TokenAccounts::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TokenAccounts {
    Table,
    Id,
    WalletAddress,
    TokenMint,
    Balance,
    Symbol,
    Decimals,
    CreatedAt,
    LastUpdated,
}
