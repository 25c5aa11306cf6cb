use async_trait::async_trait;
use serde::{ Deserialize, Serialize };

/// Token metadata and pricing as returned by the market-data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub price_24h_change: f64,
    pub image_url: Option<String>,
}

/// Result of a market-data lookup.
///
/// `NotListed` and `Unavailable` both mean "no metadata this poll"; they are kept
/// apart so logs show whether the API answered or could not be reached.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenLookup {
    Found(TokenData),
    /// The API answered and no trading pair references the token.
    NotListed,
    /// Retries were exhausted or the response could not be parsed.
    Unavailable,
}

impl TokenLookup {
    pub fn into_found(self) -> Option<TokenData> {
        match self {
            TokenLookup::Found(data) => Some(data),
            _ => None,
        }
    }
}

#[async_trait]
pub trait MarketDataClient: Send + Sync {
    async fn get_token_data(&self, token_id: &str) -> TokenLookup;
}
