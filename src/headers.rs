//! Per-request header supply.

use log::warn;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

/// User agent sent when no agent list is configured.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Supplies the headers of each request.
pub trait HeaderProvider: Send + Sync {
    fn headers(&self) -> HeaderMap;
}

/// The same headers for every request.
impl HeaderProvider for HeaderMap {
    fn headers(&self) -> HeaderMap {
        self.clone()
    }
}

/// Picks a random user agent from a list for every request.
#[derive(Debug, Clone)]
pub struct UserAgentRotation {
    agents: Vec<HeaderValue>,
    base: HeaderMap,
}

impl UserAgentRotation {
    /// Create a rotation over `agents`.
    ///
    /// Agents that are not valid header values are skipped. With no usable
    /// agent, [`DEFAULT_USER_AGENT`] is sent.
    pub fn new<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for agent in agents {
            let agent = agent.as_ref().trim();
            if agent.is_empty() {
                continue;
            }
            match HeaderValue::from_str(agent) {
                Ok(value) => parsed.push(value),
                Err(e) => warn!("Skipping invalid user agent {:?}: {}", agent, e),
            }
        }
        if parsed.is_empty() {
            parsed.push(HeaderValue::from_static(DEFAULT_USER_AGENT));
        }

        let mut base = HeaderMap::new();
        base.insert(ACCEPT, HeaderValue::from_static("*/*"));

        Self { agents: parsed, base }
    }

    /// Send `headers` with every request, in addition to the user agent.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.base.extend(headers);
        self
    }

    pub fn agents(&self) -> &[HeaderValue] {
        &self.agents
    }
}

impl Default for UserAgentRotation {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl HeaderProvider for UserAgentRotation {
    fn headers(&self) -> HeaderMap {
        let mut headers = self.base.clone();
        let index = rand::rng().random_range(0..self.agents.len());
        headers.insert(USER_AGENT, self.agents[index].clone());
        headers
    }
}
