use crate::providers::TokenData;

/// Token-program mint that represents native SOL.
pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub const NATIVE_DECIMALS: u8 = 9;

const NATIVE_NAME: &str = "Wrapped SOL";
const NATIVE_SYMBOL: &str = "SOL";

pub fn is_wrapped_native(mint_address: &str) -> bool {
    mint_address == WRAPPED_SOL_MINT
}

/// Catalog record used for native SOL when the market-data API has no pair for it.
pub fn native_token_data() -> TokenData {
    TokenData {
        token_id: WRAPPED_SOL_MINT.to_string(),
        name: NATIVE_NAME.to_string(),
        symbol: NATIVE_SYMBOL.to_string(),
        price: 0.0,
        price_24h_change: 0.0,
        image_url: None,
    }
}
