pub mod token_entity;
pub mod token_account;
pub mod wallet_to_monitor;
