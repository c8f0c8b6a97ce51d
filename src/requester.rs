//! The proxy-routed requester.

use crate::backend::BackendRegistry;
use crate::config::RequestConfig;
use crate::error::{ConfigurationError, RequestError};
use crate::events::{EventSink, LogSink, ProxyEvent};
use crate::executor::{self, RequestOutcome};
use crate::headers::{HeaderProvider, UserAgentRotation};
use crate::pool::{PoolFactory, PoolLimits};
use crate::proxy::{ProxyList, SchemeVariant};
use crate::selector::{ProxySelector, RandomSelector};

use futures::stream::{self, Stream, StreamExt};
use log::{debug, info};
use reqwest::Request;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Issues requests, each through a proxy drawn from the list.
///
/// A requester is shared by all scan tasks. Nothing about a single request
/// is stored on it: the selected proxy and its pool live on the call stack.
pub struct ProxyRequester {
    config: RequestConfig,
    proxies: ProxyList,
    selector: Arc<dyn ProxySelector>,
    factory: PoolFactory,
    limits: PoolLimits,
    headers: Arc<dyn HeaderProvider>,
    events: Arc<dyn EventSink>,
}

impl ProxyRequester {
    /// Create a new requester builder.
    pub fn builder() -> ProxyRequesterBuilder {
        ProxyRequesterBuilder::new()
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn proxies(&self) -> &ProxyList {
        &self.proxies
    }

    pub fn limits(&self) -> &PoolLimits {
        &self.limits
    }

    /// Request `url` with the configured method through a random proxy.
    ///
    /// Returns [`RequestOutcome::Recovered`] when retries ran out or the read
    /// timed out; everything else that goes wrong is an error.
    pub async fn request(&self, url: &str) -> Result<RequestOutcome, RequestError> {
        let target = Url::parse(url).map_err(|source| RequestError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut request = Request::new(self.config.method.clone(), target);
        *request.headers_mut() = self.headers.headers();

        self.dispatch(request).await
    }

    /// Send a prepared request through a random proxy.
    ///
    /// Provider headers are added where the request has none of its own.
    pub async fn send(&self, mut request: Request) -> Result<RequestOutcome, RequestError> {
        let provided = self.headers.headers();
        let headers = request.headers_mut();
        for (name, value) in provided.iter() {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }

        self.dispatch(request).await
    }

    /// Request every url, at most `threads` at a time.
    ///
    /// Results are yielded in completion order, paired with their url.
    pub fn request_all<'a, I>(
        &'a self,
        urls: I,
    ) -> impl Stream<Item = (String, Result<RequestOutcome, RequestError>)> + 'a
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'a,
    {
        stream::iter(urls)
            .map(move |url| async move {
                let outcome = self.request(&url).await;
                (url, outcome)
            })
            .buffer_unordered(self.config.threads)
    }

    async fn dispatch(&self, request: Request) -> Result<RequestOutcome, RequestError> {
        let server = self.selector.select(&self.proxies, request.url());
        let variant = SchemeVariant::classify(server.as_str());
        debug!("Using {} proxy {} for {}", variant, server, request.url());

        let pool = self.factory.build(variant, &server, &self.limits)?;
        executor::execute(&pool, request, self.config.retries, self.events.as_ref()).await
    }
}

enum ProxySource {
    Entries(Vec<String>),
    File(PathBuf),
}

/// Builder for `ProxyRequester`.
pub struct ProxyRequesterBuilder {
    config: Option<RequestConfig>,
    debug: u8,
    proxies: Option<ProxySource>,
    selector: Option<Arc<dyn ProxySelector>>,
    backends: Option<BackendRegistry>,
    headers: Option<Arc<dyn HeaderProvider>>,
    events: Option<Arc<dyn EventSink>>,
}

impl ProxyRequesterBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: None,
            debug: 0,
            proxies: None,
            selector: None,
            backends: None,
            headers: None,
            events: None,
        }
    }

    /// Set the request configuration.
    pub fn config(mut self, config: RequestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the debug level; 2 and up announces the pool at construction.
    pub fn debug(mut self, level: u8) -> Self {
        self.debug = level;
        self
    }

    /// Set the proxy addresses to rotate through.
    pub fn proxy_list(mut self, proxies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.proxies = Some(ProxySource::Entries(
            proxies.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Read the proxy addresses from a file, one per line.
    pub fn proxy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.proxies = Some(ProxySource::File(path.into()));
        self
    }

    /// Set the proxy selection strategy.
    pub fn selector(mut self, selector: impl ProxySelector + 'static) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    /// Set the pool backends.
    pub fn backends(mut self, registry: BackendRegistry) -> Self {
        self.backends = Some(registry);
        self
    }

    /// Set the provider of per-request headers.
    pub fn headers(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.headers = Some(Arc::new(provider));
        self
    }

    /// Set the receiver of events.
    pub fn events(mut self, sink: impl EventSink + 'static) -> Self {
        self.events = Some(Arc::new(sink));
        self
    }

    /// Build the requester, validating the proxy list.
    pub fn build(self) -> Result<ProxyRequester, ConfigurationError> {
        let proxies = match self.proxies {
            Some(ProxySource::Entries(entries)) => ProxyList::new(entries)?,
            Some(ProxySource::File(path)) => ProxyList::from_file(path)?,
            None => return Err(ConfigurationError::MissingProxyList),
        };

        let config = self.config.unwrap_or_default();
        let limits = PoolLimits::new(config.threads, config.timeout);
        let selector = self.selector.unwrap_or_else(|| Arc::new(RandomSelector));
        let events = self.events.unwrap_or_else(|| Arc::new(LogSink));

        info!(
            "Proxy requester ready: {} proxies, {} selection, {} threads",
            proxies.len(),
            selector.strategy_name(),
            config.threads
        );

        if self.debug >= 2 {
            events.emit(ProxyEvent::PoolStart {
                proxies: proxies.len(),
            });
        }

        Ok(ProxyRequester {
            config,
            proxies,
            selector,
            factory: PoolFactory::new(self.backends.unwrap_or_default()),
            limits,
            headers: self
                .headers
                .unwrap_or_else(|| Arc::new(UserAgentRotation::default())),
            events,
        })
    }
}

impl Default for ProxyRequesterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;

    #[test]
    fn test_missing_proxy_list() {
        let result = ProxyRequester::builder().build();
        assert!(matches!(result, Err(ConfigurationError::MissingProxyList)));
    }

    #[test]
    fn test_empty_proxy_list() {
        let result = ProxyRequester::builder().proxy_list(Vec::<String>::new()).build();
        assert!(matches!(result, Err(ConfigurationError::EmptyProxyList)));
    }

    #[test]
    fn test_blank_proxy_entry() {
        let result = ProxyRequester::builder()
            .proxy_list(["http://10.0.0.1:3128", "\t"])
            .build();
        assert!(matches!(result, Err(ConfigurationError::BlankProxyEntry { index: 1 })));
    }

    #[test]
    fn test_unreadable_proxy_file() {
        let result = ProxyRequester::builder()
            .proxy_file("/nonexistent/proxies.txt")
            .build();
        assert!(matches!(result, Err(ConfigurationError::ProxyFile { .. })));
    }

    #[test]
    fn test_pool_start_event_needs_debug_level_two() {
        let sink = Arc::new(MemorySink::new());
        ProxyRequester::builder()
            .proxy_list(["http://10.0.0.1:3128"])
            .debug(1)
            .events(Arc::clone(&sink))
            .build()
            .unwrap();
        assert!(sink.is_empty());

        ProxyRequester::builder()
            .proxy_list(["http://10.0.0.1:3128", "http://10.0.0.2:3128"])
            .debug(2)
            .events(Arc::clone(&sink))
            .build()
            .unwrap();
        assert_eq!(sink.events(), vec![ProxyEvent::PoolStart { proxies: 2 }]);
    }

    #[test]
    fn test_limits_follow_config() {
        let requester = ProxyRequester::builder()
            .proxy_list(["http://10.0.0.1:3128"])
            .config(RequestConfig::builder().threads(6).build())
            .build()
            .unwrap();
        assert_eq!(requester.limits().concurrency, 6);
        assert_eq!(requester.limits().available_permits(), 6);
        assert_eq!(requester.proxies().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal() {
        let sink = Arc::new(MemorySink::new());
        let requester = ProxyRequester::builder()
            .proxy_list(["http://10.0.0.1:3128"])
            .events(Arc::clone(&sink))
            .build()
            .unwrap();

        let result = requester.request("not a url").await;
        assert!(matches!(result, Err(RequestError::InvalidUrl { .. })));
        assert!(sink.is_empty());
    }
}
