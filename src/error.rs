use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")] Database(#[from] sea_orm::DbErr),

    /// Error payload returned by the chain's JSON-RPC endpoint.
    #[error("RPC error: {0}")] Rpc(String),

    /// Transport failure or non-2xx response from an external HTTP API.
    #[error("External API error: {0}")] External(String),

    #[error("Parse error: {0}")] Parse(String),

    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("No wallet configured and the wallet registry is empty")]
    NoWallets,

    #[error("Configuration error: {0}")] Config(String),
}

impl AppError {
    /// Errors worth another attempt after a delay.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Rpc(_) | AppError::External(_))
    }

    /// Boundary validation failures; the offending item is skipped.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
