//! # reqwest-proxy-rotation
//!
//! Per-request proxy rotation for reqwest.
//!
//! Every request goes out through a proxy drawn at random from a fixed list of
//! HTTP, HTTPS or SOCKS proxies, with a fresh connection pool bound to that
//! proxy. Transient failures (exhausted retries, read timeouts) are reported
//! as events and come back as a recovered outcome, so a long scan keeps going
//! past dead proxies.

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod headers;
pub mod middleware;
pub mod pool;
pub mod proxy;
pub mod requester;
pub mod selector;
mod utils;

pub use backend::{BackendRegistry, HttpProxyBackend, PoolBackend};
#[cfg(feature = "socks")]
pub use backend::SocksProxyBackend;
pub use config::{RequestConfig, RequestConfigBuilder};
pub use error::{ConfigurationError, PoolCreationError, RequestError};
pub use events::{EventSink, LogSink, MemorySink, ProxyEvent};
pub use executor::{FailureKind, RecoveredFailure, RequestOutcome};
pub use headers::{HeaderProvider, UserAgentRotation};
pub use middleware::ProxyRotationMiddleware;
pub use pool::{ConnectionPool, PoolFactory, PoolLimits};
pub use proxy::{ProxyList, ProxyServer, SchemeVariant};
pub use requester::{ProxyRequester, ProxyRequesterBuilder};
pub use selector::{ProxySelector, RandomSelector};
