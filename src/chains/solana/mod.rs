mod provider;
pub mod tokens;

pub use provider::SolanaRpcClient;
