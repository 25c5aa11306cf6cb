use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::chains::solana::tokens::{ is_wrapped_native, native_token_data };
use crate::config::EndpointConfig;
use crate::error::{ AppError, Result };
use crate::providers::{ MarketDataClient, TokenData, TokenLookup };
use crate::rpc::{ with_retry, RetryPolicy };

const CHAIN_ID: &str = "solana";
const UNKNOWN_NAME: &str = "Unknown";
const UNKNOWN_SYMBOL: &str = "UNKNOWN";

// Dexscreener API response structures

/// `/tokens/v1/...` answers with a bare array; the older search endpoints wrap it.
/// `pairs` must be present (possibly null): any other object is an error body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PairsResponse {
    List(Vec<DexPair>),
    Wrapped {
        #[serde(deserialize_with = "Option::deserialize")]
        pairs: Option<Vec<DexPair>>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DexPair {
    base_token: Option<PairToken>,
    quote_token: Option<PairToken>,
    price_usd: Option<Value>,
    price_change: Option<PriceChange>,
    info: Option<PairInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PairToken {
    address: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriceChange {
    h24: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PairInfo {
    image_url: Option<String>,
}

impl PairToken {
    fn matches(&self, token_id: &str) -> bool {
        self.address.as_deref() == Some(token_id)
    }

    fn to_token_data(&self, token_id: &str, price: f64, price_24h_change: f64) -> TokenData {
        TokenData {
            token_id: token_id.to_string(),
            name: self.name.clone().unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            symbol: self.symbol.clone().unwrap_or_else(|| UNKNOWN_SYMBOL.to_string()),
            price,
            price_24h_change,
            image_url: None,
        }
    }
}

/// Lenient numeric field: Dexscreener sends prices as strings and changes as numbers.
fn number_field(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub struct DexscreenerClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl DexscreenerClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client
            ::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Dexscreener client: {}", e)))?;

        tracing::info!("Initialized Dexscreener API client");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Self::new(&config.url, config.timeout, config.retry)
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client
            .get(url)
            .send().await
            .map_err(|e| AppError::External(format!("Dexscreener request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(
                AppError::External(format!("Dexscreener returned status: {}", response.status()))
            );
        }

        response
            .text().await
            .map_err(|e| AppError::External(format!("Dexscreener body read failed: {}", e)))
    }

    /// First pair (in response order) that references `token_id` on either side.
    fn select_token(pairs: &[DexPair], token_id: &str) -> Option<TokenData> {
        pairs.iter().find_map(|pair| {
            let price_usd = number_field(pair.price_usd.as_ref());

            if let Some(base) = pair.base_token.as_ref().filter(|t| t.matches(token_id)) {
                let change = number_field(
                    pair.price_change.as_ref().and_then(|c| c.h24.as_ref())
                );
                let mut data = base.to_token_data(token_id, price_usd, change);
                data.image_url = pair.info.as_ref().and_then(|i| i.image_url.clone());
                return Some(data);
            }

            if let Some(quote) = pair.quote_token.as_ref().filter(|t| t.matches(token_id)) {
                return Some(quote.to_token_data(token_id, price_usd, 0.0));
            }

            None
        })
    }

    fn parse_lookup(body: &str, token_id: &str) -> Result<Option<TokenData>> {
        let response: PairsResponse = serde_json
            ::from_str(body)
            .map_err(|e| AppError::Parse(format!("Failed to parse Dexscreener response: {}", e)))?;

        let pairs = match response {
            PairsResponse::List(pairs) => pairs,
            PairsResponse::Wrapped { pairs } => pairs.unwrap_or_default(),
        };

        Ok(Self::select_token(&pairs, token_id))
    }
}

#[async_trait]
impl MarketDataClient for DexscreenerClient {
    async fn get_token_data(&self, token_id: &str) -> TokenLookup {
        let url = format!(
            "{}/tokens/v1/{}/{}",
            self.base_url,
            CHAIN_ID,
            urlencoding::encode(token_id)
        );

        let lookup = match with_retry(self.retry, "Dexscreener lookup", || self.fetch(&url)).await {
            Ok(body) =>
                match Self::parse_lookup(&body, token_id) {
                    Ok(Some(data)) => {
                        tracing::info!(
                            token = %token_id,
                            "Retrieved data for token {} ({})",
                            data.name,
                            data.symbol
                        );
                        TokenLookup::Found(data)
                    }
                    Ok(None) => {
                        tracing::warn!(token = %token_id, "No Dexscreener pair references token");
                        TokenLookup::NotListed
                    }
                    Err(e) => {
                        tracing::error!(token = %token_id, error = %e, "Unusable Dexscreener response");
                        TokenLookup::Unavailable
                    }
                }
            Err(e) => {
                tracing::warn!(token = %token_id, error = %e, "Dexscreener unavailable");
                TokenLookup::Unavailable
            }
        };

        match lookup {
            TokenLookup::Found(_) => lookup,
            _ if is_wrapped_native(token_id) => {
                tracing::info!("Using built-in metadata for native SOL");
                TokenLookup::Found(native_token_data())
            }
            other => other,
        }
    }
}
