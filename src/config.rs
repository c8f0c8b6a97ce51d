//! Request configuration.

use reqwest::Method;
use std::time::Duration;

/// Configuration shared by every request a requester issues.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// HTTP method used for `request(url)`.
    pub method: Method,
    /// Connect and total timeout of a single attempt.
    pub timeout: Duration,
    /// Number of retries after the first attempt.
    pub retries: usize,
    /// Number of concurrent requests; also sizes each connection pool.
    pub threads: usize,
}

impl RequestConfig {
    /// Create a new configuration builder.
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::new()
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfigBuilder::new().build()
    }
}

/// Builder for `RequestConfig`.
pub struct RequestConfigBuilder {
    method: Option<Method>,
    timeout: Option<Duration>,
    retries: Option<usize>,
    threads: Option<usize>,
}

impl RequestConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            method: None,
            timeout: None,
            retries: None,
            threads: None,
        }
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the number of retries after the first attempt.
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Set the number of concurrent requests.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RequestConfig {
        RequestConfig {
            method: self.method.unwrap_or(Method::GET),
            timeout: self.timeout.unwrap_or(Duration::from_secs(10)),
            retries: self.retries.unwrap_or(3),
            threads: self.threads.unwrap_or(1).max(1),
        }
    }
}

impl Default for RequestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
