mod retry;

pub use retry::{ RetryPolicy, with_retry };
