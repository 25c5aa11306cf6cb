pub mod dexscreener;

pub use dexscreener::DexscreenerClient;
