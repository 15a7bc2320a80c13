//! Retry handling for outbound calls of the SAV claim pipeline
//!
//! - `RetryExecutor` / `with_retry`: run an async operation until it succeeds,
//!   fails terminally or exhausts its attempt budget
//! - `Retryable`: how an error tells the executor whether another attempt may help
//! - `ExponentialBackoff`: the doubling delay schedule between attempts

pub mod backoff;
pub mod retry;

pub use backoff::ExponentialBackoff;
pub use retry::{is_client_error, with_retry, RetryExecutor, RetryPolicy, Retryable};
