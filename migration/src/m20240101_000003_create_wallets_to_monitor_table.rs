use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(WalletsToMonitor::Table)
                .if_not_exists()
                .col(ColumnDef::new(WalletsToMonitor::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(WalletsToMonitor::WalletAddress).string().not_null())
                .col(
                    ColumnDef::new(WalletsToMonitor::AddedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_wallets_to_monitor_address")
                .table(WalletsToMonitor::Table)
                .col(WalletsToMonitor::WalletAddress)
                .unique()
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WalletsToMonitor::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum WalletsToMonitor {
    Table,
    Id,
    WalletAddress,
    AddedAt,
}
