use async_trait::async_trait;
use sea_orm::prelude::Decimal;
use serde::Deserialize;
use serde_json::Value;
use solana_client::client_error::{ ClientError, ClientErrorKind };
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::{ RpcError, TokenAccountsFilter };
use solana_client::rpc_response::RpcKeyedAccount;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

use crate::chains::solana::tokens::{ is_wrapped_native, NATIVE_DECIMALS, WRAPPED_SOL_MINT };
use crate::config::EndpointConfig;
use crate::error::{ AppError, Result };
use crate::providers::{ ChainClient, TokenHolding };
use crate::rpc::{ with_retry, RetryPolicy };

/// Reads wallet holdings through the Solana JSON-RPC API.
pub struct SolanaRpcClient {
    client: RpcClient,
    retry: RetryPolicy,
    include_native: bool,
}

// `parsed.info` of a jsonParsed SPL token account, trimmed to what we read
#[derive(Debug, Deserialize)]
struct ParsedTokenData {
    parsed: ParsedTokenAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedTokenAccount {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: Option<String>,
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAmount {
    ui_amount: Option<f64>,
    ui_amount_string: Option<String>,
    decimals: u8,
}

/// Transport failures and node-reported errors are worth retrying; a body that
/// does not decode is not.
fn classify(method: &str, error: ClientError) -> AppError {
    match error.kind() {
        ClientErrorKind::Reqwest(e) if e.is_decode() => {
            AppError::Parse(format!("{} returned an undecodable body: {}", method, e))
        }
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
            AppError::External(format!("{} request failed: {}", method, error))
        }
        ClientErrorKind::SerdeJson(_) | ClientErrorKind::RpcError(RpcError::ParseError(_)) => {
            AppError::Parse(format!("Failed to parse {} response: {}", method, error))
        }
        ClientErrorKind::RpcError(_) => AppError::Rpc(format!("{}: {}", method, error)),
        _ => AppError::External(format!("{} failed: {}", method, error)),
    }
}

impl SolanaRpcClient {
    pub fn new(
        rpc_url: &str,
        timeout: Duration,
        retry: RetryPolicy,
        include_native: bool
    ) -> Result<Self> {
        let client = RpcClient::new_with_timeout_and_commitment(
            rpc_url.to_string(),
            timeout,
            CommitmentConfig::confirmed()
        );

        tracing::info!("Initialized Solana RPC client with URL: {}", rpc_url);

        Ok(Self {
            client,
            retry,
            include_native,
        })
    }

    pub fn from_config(config: &EndpointConfig, include_native: bool) -> Result<Self> {
        Self::new(&config.url, config.timeout, config.retry, include_native)
    }

    async fn fetch_token_accounts(&self, owner: &Pubkey) -> Result<Vec<RpcKeyedAccount>> {
        self.client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id())).await
            .map_err(|e| classify("getTokenAccountsByOwner", e))
    }

    async fn fetch_native_balance(&self, owner: &Pubkey) -> Result<u64> {
        self.client.get_balance(owner).await.map_err(|e| classify("getBalance", e))
    }

    /// Parse one keyed token account. `Ok(None)` means "not a holding".
    fn parse_token_account(keyed: &RpcKeyedAccount) -> Result<Option<TokenHolding>> {
        let data = serde_json
            ::to_value(&keyed.account.data)
            .map_err(|e| AppError::Parse(format!("Unreadable account data: {}", e)))?;

        Self::parse_token_data(&keyed.pubkey, &data)
    }

    fn parse_token_data(account: &str, data: &Value) -> Result<Option<TokenHolding>> {
        let info = ParsedTokenData::deserialize(data).map_err(|e|
            AppError::Parse(format!("Token account {} is not jsonParsed: {}", account, e))
        )?.parsed.info;

        let mint = match info.mint {
            Some(mint) if Pubkey::from_str(&mint).is_ok() => mint,
            other => {
                tracing::debug!(
                    account = %account,
                    mint = ?other,
                    "Ignoring token account without a valid mint"
                );
                return Ok(None);
            }
        };

        let amount = info.token_amount;
        let ui_amount = match (amount.ui_amount_string, amount.ui_amount) {
            (Some(s), _) =>
                Decimal::from_str(&s).map_err(|e|
                    AppError::Parse(format!("Invalid uiAmountString {:?}: {}", s, e))
                )?,
            (None, Some(f)) =>
                Decimal::try_from(f).map_err(|e|
                    AppError::Parse(format!("Invalid uiAmount {}: {}", f, e))
                )?,
            (None, None) => Decimal::ZERO,
        };

        if ui_amount <= Decimal::ZERO {
            return Ok(None);
        }

        Ok(Some(TokenHolding::new(mint, ui_amount, amount.decimals)))
    }

    fn native_holding(lamports: u64) -> Option<TokenHolding> {
        if lamports == 0 {
            return None;
        }

        Some(TokenHolding {
            token_id: WRAPPED_SOL_MINT.to_string(),
            ui_amount: Decimal::from_i128_with_scale(lamports as i128, NATIVE_DECIMALS as u32),
            decimals: NATIVE_DECIMALS,
            is_native: true,
        })
    }

    /// Merge the native holding and the parsed token accounts into one holding set.
    fn assemble_holdings(
        wallet_address: &str,
        native: Option<TokenHolding>,
        accounts: &[RpcKeyedAccount]
    ) -> Vec<TokenHolding> {
        let native_added = native.is_some();
        let mut holdings: Vec<TokenHolding> = native.into_iter().collect();

        for keyed in accounts {
            let holding = match Self::parse_token_account(keyed) {
                Ok(Some(holding)) => holding,
                Ok(None) => {
                    continue;
                }
                Err(e) => {
                    tracing::warn!(wallet = %wallet_address, error = %e, "Skipping token account");
                    continue;
                }
            };

            // Native balance already covers wrapped SOL
            if native_added && is_wrapped_native(&holding.token_id) {
                tracing::debug!(wallet = %wallet_address, "Suppressing wrapped SOL token account");
                continue;
            }

            // A wallet may own several token accounts for the same mint
            if let Some(existing) = holdings.iter_mut().find(|h| h.token_id == holding.token_id) {
                match existing.ui_amount.checked_add(holding.ui_amount) {
                    Some(sum) => {
                        existing.ui_amount = sum;
                    }
                    None => {
                        tracing::warn!(
                            wallet = %wallet_address,
                            token = %holding.token_id,
                            "Token amount overflow while merging accounts"
                        );
                    }
                }
                continue;
            }

            holdings.push(holding);
        }

        holdings
    }
}

#[async_trait]
impl ChainClient for SolanaRpcClient {
    async fn get_holdings(&self, wallet_address: &str) -> Vec<TokenHolding> {
        let owner = match Pubkey::from_str(wallet_address) {
            Ok(owner) => owner,
            Err(_) => {
                tracing::error!(wallet = %wallet_address, "Invalid wallet address");
                return Vec::new();
            }
        };

        let native = if self.include_native {
            let balance = with_retry(self.retry, "getBalance", || {
                self.fetch_native_balance(&owner)
            }).await;

            match balance {
                Ok(lamports) => Self::native_holding(lamports),
                Err(e) => {
                    tracing::error!(wallet = %wallet_address, error = %e, "Could not read SOL balance");
                    return Vec::new();
                }
            }
        } else {
            None
        };

        let accounts = with_retry(self.retry, "getTokenAccountsByOwner", || {
            self.fetch_token_accounts(&owner)
        }).await;

        let accounts = match accounts {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!(wallet = %wallet_address, error = %e, "Could not list token accounts");
                return Vec::new();
            }
        };

        tracing::info!(
            wallet = %wallet_address,
            "Found {} token accounts",
            accounts.len()
        );

        Self::assemble_holdings(wallet_address, native, &accounts)
    }
}
