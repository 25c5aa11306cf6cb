pub mod chain_provider;
pub mod market_data_provider;

pub use chain_provider::{ ChainClient, TokenHolding };
pub use market_data_provider::{ MarketDataClient, TokenData, TokenLookup };
