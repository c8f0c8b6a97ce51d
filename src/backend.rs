//! Connection pool backends, one per scheme variant.
//!
//! Plain and TLS-terminating proxies share the HTTP backend. The SOCKS
//! backend is optional: it exists when the `socks` feature is compiled in,
//! and it is resolved on first use only.

use crate::error::PoolCreationError;
use crate::pool::PoolLimits;
use crate::proxy::SchemeVariant;

use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, OnceLock};
use url::Url;

/// Builds proxy-bound clients for a family of proxy schemes.
pub trait PoolBackend: Send + Sync {
    /// Backend name, used in errors and logs.
    fn name(&self) -> &'static str;

    /// Whether a proxy URL scheme can be served by this backend.
    fn supports_scheme(&self, scheme: &str) -> bool;

    /// Build a client that sends every request through `proxy`.
    fn build_client(&self, proxy: &Url, limits: &PoolLimits) -> Result<reqwest::Client, reqwest::Error>;
}

/// Client settings shared by all backends.
///
/// The total timeout covers a full connect plus a full response wait, so a
/// proxy that never accepts the connection fails on the connect timer and
/// reports as a connect error, not as a read timeout.
fn client_builder(limits: &PoolLimits) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(limits.timeout)
        .timeout(limits.timeout.saturating_add(limits.timeout))
        .pool_max_idle_per_host(limits.concurrency)
        .redirect(reqwest::redirect::Policy::none())
}

/// Backend for `http://` and `https://` proxies.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpProxyBackend;

impl PoolBackend for HttpProxyBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        matches!(scheme, "http" | "https")
    }

    fn build_client(&self, proxy: &Url, limits: &PoolLimits) -> Result<reqwest::Client, reqwest::Error> {
        client_builder(limits)
            .proxy(reqwest::Proxy::all(proxy.as_str())?)
            .build()
    }
}

/// Backend for `socks4://`, `socks4a://`, `socks5://` and `socks5h://` proxies.
#[cfg(feature = "socks")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SocksProxyBackend;

#[cfg(feature = "socks")]
impl PoolBackend for SocksProxyBackend {
    fn name(&self) -> &'static str {
        "socks"
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        matches!(scheme, "socks4" | "socks4a" | "socks5" | "socks5h")
    }

    fn build_client(&self, proxy: &Url, limits: &PoolLimits) -> Result<reqwest::Client, reqwest::Error> {
        client_builder(limits)
            .proxy(reqwest::Proxy::all(proxy.as_str())?)
            .build()
    }
}

type BackendLoader = Box<dyn Fn() -> Option<Arc<dyn PoolBackend>> + Send + Sync>;

fn load_socks_backend() -> Option<Arc<dyn PoolBackend>> {
    #[cfg(feature = "socks")]
    {
        Some(Arc::new(SocksProxyBackend))
    }
    #[cfg(not(feature = "socks"))]
    {
        None
    }
}

/// Maps each scheme variant to its backend.
pub struct BackendRegistry {
    http: Arc<dyn PoolBackend>,
    socks: OnceLock<Option<Arc<dyn PoolBackend>>>,
    socks_loader: BackendLoader,
}

impl BackendRegistry {
    /// Registry with the HTTP backend and, if compiled in, the SOCKS backend.
    pub fn new() -> Self {
        Self::with_socks_loader(load_socks_backend)
    }

    /// Registry whose SOCKS backend comes from `loader`.
    ///
    /// The loader runs at most once, on the first SOCKS request. Returning
    /// `None` makes every SOCKS request fail with
    /// [`PoolCreationError::BackendUnavailable`].
    pub fn with_socks_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn PoolBackend>> + Send + Sync + 'static,
    {
        Self {
            http: Arc::new(HttpProxyBackend),
            socks: OnceLock::new(),
            socks_loader: Box::new(loader),
        }
    }

    /// Registry without SOCKS support.
    pub fn without_socks() -> Self {
        Self::with_socks_loader(|| None)
    }

    /// Replace the backend used for plain and TLS-terminating proxies.
    pub fn with_http_backend(mut self, backend: Arc<dyn PoolBackend>) -> Self {
        self.http = backend;
        self
    }

    /// The backend for `variant`.
    pub fn backend(&self, variant: SchemeVariant) -> Result<Arc<dyn PoolBackend>, PoolCreationError> {
        match variant {
            SchemeVariant::Plain | SchemeVariant::TlsTerminating => Ok(Arc::clone(&self.http)),
            SchemeVariant::Socks => self
                .socks
                .get_or_init(|| {
                    let backend = (self.socks_loader)();
                    match &backend {
                        Some(b) => debug!("Loaded {} pool backend", b.name()),
                        None => warn!("SOCKS pool backend is not available"),
                    }
                    backend
                })
                .clone()
                .ok_or(PoolCreationError::BackendUnavailable { variant }),
        }
    }

    /// Whether the SOCKS slot has been resolved yet.
    pub fn socks_resolved(&self) -> bool {
        self.socks.get().is_some()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("http", &self.http.name())
            .field("socks", &self.socks.get().map(|b| b.as_ref().map(|b| b.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_http_backend_schemes() {
        assert!(HttpProxyBackend.supports_scheme("http"));
        assert!(HttpProxyBackend.supports_scheme("https"));
        assert!(!HttpProxyBackend.supports_scheme("socks5"));
        assert!(!HttpProxyBackend.supports_scheme("ftp"));
    }

    #[test]
    fn test_plain_and_tls_share_backend() {
        let registry = BackendRegistry::without_socks();
        assert_eq!(registry.backend(SchemeVariant::Plain).unwrap().name(), "http");
        assert_eq!(registry.backend(SchemeVariant::TlsTerminating).unwrap().name(), "http");
        assert!(!registry.socks_resolved());
    }

    #[test]
    fn test_missing_socks_backend() {
        let registry = BackendRegistry::without_socks();
        let result = registry.backend(SchemeVariant::Socks);
        assert!(matches!(
            result,
            Err(PoolCreationError::BackendUnavailable { variant: SchemeVariant::Socks })
        ));
        assert!(registry.socks_resolved());
    }

    #[test]
    fn test_socks_loader_runs_once_under_concurrent_use() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let registry = BackendRegistry::with_socks_loader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Some(Arc::new(HttpProxyBackend) as Arc<dyn PoolBackend>)
        });

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert!(registry.backend(SchemeVariant::Socks).is_ok());
                });
            }
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[cfg(feature = "socks")]
    #[test]
    fn test_default_registry_has_socks() {
        let registry = BackendRegistry::new();
        let backend = registry.backend(SchemeVariant::Socks).unwrap();
        assert_eq!(backend.name(), "socks");
        assert!(backend.supports_scheme("socks5"));
        assert!(backend.supports_scheme("socks4"));
        assert!(!backend.supports_scheme("http"));
    }
}
