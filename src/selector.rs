//! Proxy selection strategies.

use crate::proxy::{ProxyList, ProxyServer};
use url::Url;

/// Picks the proxy server for one request.
///
/// Implementations are called once per request and must not keep the
/// selected server around; the caller threads it through the request.
pub trait ProxySelector: Send + Sync {
    /// Select a server from a non-empty list for a request to `target`.
    fn select(&self, proxies: &ProxyList, target: &Url) -> ProxyServer;

    /// Get the strategy name
    fn strategy_name(&self) -> &'static str;
}

/// Select a random proxy, independently for every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl ProxySelector for RandomSelector {
    fn select(&self, proxies: &ProxyList, _target: &Url) -> ProxyServer {
        let mut rng = rand::rng();
        proxies.choose(&mut rng)
    }

    fn strategy_name(&self) -> &'static str {
        "random"
    }
}
