pub mod config;
pub mod error;
pub mod db;
pub mod providers;
pub mod chains;
pub mod rpc;
pub mod services;
pub mod scheduler;
pub mod dex;

pub use config::Config;
pub use error::{ AppError, Result };
