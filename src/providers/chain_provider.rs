use async_trait::async_trait;
use sea_orm::prelude::Decimal;
use serde::{ Deserialize, Serialize };

/// One token position of a wallet, as observed in a single poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    /// Mint address of the token.
    pub token_id: String,
    /// Human-scaled amount (already divided by 10^decimals).
    pub ui_amount: Decimal,
    pub decimals: u8,
    /// Synthesized from the native balance rather than a token account.
    pub is_native: bool,
}

impl TokenHolding {
    pub fn new(token_id: impl Into<String>, ui_amount: Decimal, decimals: u8) -> Self {
        Self {
            token_id: token_id.into(),
            ui_amount,
            decimals,
            is_native: false,
        }
    }

    /// Integer base-unit balance: `ui_amount * 10^decimals`, rounded toward zero.
    ///
    /// Returns `None` for negative amounts or when the scaled value overflows.
    pub fn raw_balance(&self) -> Option<Decimal> {
        if self.ui_amount.is_sign_negative() && !self.ui_amount.is_zero() {
            return None;
        }

        let mut scaled = self.ui_amount;
        for _ in 0..self.decimals {
            scaled = scaled.checked_mul(Decimal::TEN)?;
        }

        Some(scaled.trunc())
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current non-zero token holdings of `wallet_address`.
    ///
    /// Never fails: once retries are exhausted the result is empty, which callers
    /// must not read as "the wallet holds nothing".
    async fn get_holdings(&self, wallet_address: &str) -> Vec<TokenHolding>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn holding(amount: &str, decimals: u8) -> TokenHolding {
        TokenHolding::new("mint", Decimal::from_str(amount).unwrap(), decimals)
    }

    #[test]
    fn test_raw_balance_scales_by_decimals() {
        assert_eq!(holding("2.5", 6).raw_balance(), Some(Decimal::from(2_500_000)));
        assert_eq!(holding("1", 9).raw_balance(), Some(Decimal::from(1_000_000_000i64)));
        assert_eq!(holding("42", 0).raw_balance(), Some(Decimal::from(42)));
    }

    #[test]
    fn test_raw_balance_rounds_toward_zero() {
        assert_eq!(holding("0.0000019", 6).raw_balance(), Some(Decimal::from(1)));
        assert_eq!(holding("3.999999999", 2).raw_balance(), Some(Decimal::from(399)));
        assert_eq!(holding("0.0000001", 6).raw_balance(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_raw_balance_is_never_negative() {
        for (amount, decimals) in [("0", 9), ("0.5", 1), ("123456.789", 9), ("7.25", 3)] {
            let raw = holding(amount, decimals).raw_balance().unwrap();
            assert!(!raw.is_sign_negative() || raw.is_zero());
            assert_eq!(raw, raw.trunc());
        }
        assert_eq!(holding("-1", 6).raw_balance(), None);
    }

    #[test]
    fn test_raw_balance_overflow() {
        assert_eq!(holding("79228162514264337593543950335", 1).raw_balance(), None);
    }
}
