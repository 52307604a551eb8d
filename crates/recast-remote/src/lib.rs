//! HTTP transport for recast chain resolution.
//!
//! [`HttpFetcher`] implements the chain resolver's
//! [`RecipeFetcher`](recast_chain::RecipeFetcher) over plain HTTP GETs, with
//! branch fallback, a global timeout, a body size cap and optional bearer
//! authentication. Its settings come from [`FetchConfig`], stored as JSON
//! under `~/.config/recast/fetch.json`.

pub mod config;
pub mod http;

pub use config::FetchConfig;
pub use http::HttpFetcher;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("fetch config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("fetch config error: {0}")]
    Config(String),
}
