pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_token_entity_table;
mod m20240101_000002_create_token_accounts_table;
mod m20240101_000003_create_wallets_to_monitor_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_token_entity_table::Migration),
            Box::new(m20240101_000002_create_token_accounts_table::Migration),
            Box::new(m20240101_000003_create_wallets_to_monitor_table::Migration)
        ]
    }
}
