//! Per-request connection pools bound to one proxy server.

use crate::backend::BackendRegistry;
use crate::error::PoolCreationError;
use crate::proxy::{ProxyServer, SchemeVariant};

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};
use url::Url;

/// Sizing shared by every pool a requester builds.
#[derive(Debug, Clone)]
pub struct PoolLimits {
    /// Maximum number of requests in flight; also the idle connections kept per host.
    pub concurrency: usize,
    /// Connect timeout of a single attempt. The whole attempt may take twice as long.
    pub timeout: Duration,
    /// Permits for in-flight requests, shared across pools.
    budget: Arc<Semaphore>,
}

impl PoolLimits {
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            concurrency,
            timeout,
            budget: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Number of requests that can start right now without waiting.
    pub fn available_permits(&self) -> usize {
        self.budget.available_permits()
    }
}

/// A client bound to one proxy server, used for a single request.
#[derive(Debug)]
pub struct ConnectionPool {
    server: ProxyServer,
    variant: SchemeVariant,
    client: reqwest::Client,
    budget: Arc<Semaphore>,
}

impl ConnectionPool {
    pub fn server(&self) -> &ProxyServer {
        &self.server
    }

    pub fn variant(&self) -> SchemeVariant {
        self.variant
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Wait for room in the connection budget.
    pub(crate) async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.budget.acquire().await
    }
}

/// Builds a fresh connection pool for every request.
#[derive(Debug, Default)]
pub struct PoolFactory {
    registry: BackendRegistry,
}

impl PoolFactory {
    pub fn new(registry: BackendRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Build a pool for `server` with the backend registered for `variant`.
    pub fn build(
        &self,
        variant: SchemeVariant,
        server: &ProxyServer,
        limits: &PoolLimits,
    ) -> Result<ConnectionPool, PoolCreationError> {
        let backend = self.registry.backend(variant)?;
        let proxy_url = proxy_url(server)?;

        if !backend.supports_scheme(proxy_url.scheme()) {
            return Err(PoolCreationError::UnsupportedScheme {
                proxy: server.to_string(),
                scheme: proxy_url.scheme().to_string(),
                backend: backend.name(),
            });
        }

        let client = backend
            .build_client(&proxy_url, limits)
            .map_err(|source| PoolCreationError::Client {
                proxy: server.to_string(),
                source,
            })?;

        debug!(
            "Built {} pool for proxy {} (concurrency {}, timeout {:?})",
            backend.name(),
            server,
            limits.concurrency,
            limits.timeout
        );

        Ok(ConnectionPool {
            server: server.clone(),
            variant,
            client,
            budget: Arc::clone(&limits.budget),
        })
    }
}

/// Parse a proxy address; a bare `host:port` is an HTTP proxy.
fn proxy_url(server: &ProxyServer) -> Result<Url, PoolCreationError> {
    let raw = server.as_str();
    let parsed = if raw.contains("://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("http://{}", raw))
    };

    parsed.map_err(|source| PoolCreationError::InvalidProxy {
        proxy: raw.to_string(),
        source,
    })
}
