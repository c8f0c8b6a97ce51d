//! Error types for the reqwest-proxy-rotation crate.

use crate::proxy::SchemeVariant;
use std::path::PathBuf;
use thiserror::Error;

/// Error returned when a [`ProxyRequester`](crate::ProxyRequester) cannot be constructed.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No proxy list or proxy file was supplied.
    #[error("Proxy list is missing")]
    MissingProxyList,
    /// The proxy list has no entries.
    #[error("Proxy list empty or has invalid format")]
    EmptyProxyList,
    /// An entry of the proxy list is empty after trimming.
    #[error("Proxy list entry {index} is blank")]
    BlankProxyEntry { index: usize },
    /// The proxy file could not be read.
    #[error("Failed to read proxy list from {}: {source}", .path.display())]
    ProxyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error returned when a connection pool cannot be built for a proxy server.
#[derive(Debug, Error)]
pub enum PoolCreationError {
    #[error("Invalid proxy address {proxy}: {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Proxy scheme `{scheme}` of {proxy} is not supported by the {backend} backend")]
    UnsupportedScheme {
        proxy: String,
        scheme: String,
        backend: &'static str,
    },
    #[error("No pool backend available for {variant} proxies")]
    BackendUnavailable { variant: SchemeVariant },
    #[error("Failed to build connection pool for {proxy}: {source}")]
    Client {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Fatal error while issuing a request.
///
/// Transient failures (exhausted retries, read timeouts) are not errors; they
/// come back as [`RequestOutcome::Recovered`](crate::RequestOutcome::Recovered).
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid request url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Pool(#[from] PoolCreationError),
    #[error("Request object is not cloneable. Are you passing a streaming body?")]
    UncloneableRequest,
    #[error("Connection budget was closed")]
    BudgetClosed,
    #[error("Request through proxy {proxy} failed: {source}")]
    Transport {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}
