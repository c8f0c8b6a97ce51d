//! Proxy servers, proxy lists and scheme classification.

use crate::error::ConfigurationError;
use crate::utils;

use rand::Rng;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// How a proxy server is handled when its connection pool is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeVariant {
    /// Plain HTTP proxy.
    Plain,
    /// HTTPS proxy, the connection to the proxy itself is TLS.
    TlsTerminating,
    /// SOCKS4/SOCKS5 proxy.
    Socks,
}

impl SchemeVariant {
    /// Classify a proxy address.
    ///
    /// This is a substring match over the whole string, not a parse of the
    /// scheme prefix: `socks` wins over `https`, and anything else is plain.
    /// A plain proxy whose host contains `https` or `socks` is misclassified.
    pub fn classify(server: &str) -> Self {
        if server.contains("socks") {
            Self::Socks
        } else if server.contains("https") {
            Self::TlsTerminating
        } else {
            Self::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::TlsTerminating => "tls",
            Self::Socks => "socks",
        }
    }
}

impl fmt::Display for SchemeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single proxy server address (e.g. "socks5://127.0.0.1:1080").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyServer(String);

impl ProxyServer {
    /// Create a proxy server from an address, trimming surrounding whitespace.
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The scheme variant this server is handled as.
    pub fn variant(&self) -> SchemeVariant {
        SchemeVariant::classify(&self.0)
    }
}

impl fmt::Display for ProxyServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProxyServer {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An immutable, non-empty list of proxy addresses.
///
/// Cloning is cheap, the entries are shared.
#[derive(Debug, Clone)]
pub struct ProxyList {
    entries: Arc<[String]>,
}

impl ProxyList {
    /// Create a list from raw entries.
    ///
    /// Entries are kept as given; whitespace is trimmed when a server is drawn.
    pub fn new<I, S>(entries: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries.into_iter().map(Into::into).collect();

        if entries.is_empty() {
            return Err(ConfigurationError::EmptyProxyList);
        }
        if let Some(index) = entries.iter().position(|e| e.trim().is_empty()) {
            return Err(ConfigurationError::BlankProxyEntry { index });
        }

        Ok(Self {
            entries: entries.into(),
        })
    }

    /// Parse a list from text, one proxy per line.
    pub fn parse(content: &str) -> Result<Self, ConfigurationError> {
        Self::new(utils::parse_proxy_list(content))
    }

    /// Load a list from a text file, one proxy per line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let entries = utils::read_proxy_file(path).map_err(|source| ConfigurationError::ProxyFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The server at `index`, if any.
    pub fn get(&self, index: usize) -> Option<ProxyServer> {
        self.entries.get(index).map(ProxyServer::new)
    }

    /// Draw one server uniformly at random.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> ProxyServer {
        let index = rng.random_range(0..self.entries.len());
        ProxyServer::new(&self.entries[index])
    }

    /// Iterate over all servers in list order.
    pub fn iter(&self) -> impl Iterator<Item = ProxyServer> + '_ {
        self.entries.iter().map(ProxyServer::new)
    }
}
