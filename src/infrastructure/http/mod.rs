//! HTTP adapters for the race engine
//!
//! All adapters share one `reqwest::Client` (connection pool, cookie jar,
//! proxy, credential) built by [`build_http_client`].

pub mod client;
pub mod csrf;
pub mod errors;
pub mod extractor;
pub mod probe;
pub mod transaction;

pub use client::{build_http_client, HttpClientConfig};
pub use csrf::HttpTokenSource;
pub use errors::{classify_reqwest_error, HttpSetupError};
pub use extractor::BalanceExtractor;
pub use probe::HttpStateProbe;
pub use transaction::HttpTransactionTransport;
