//! Middleware implementation for reqwest.

use crate::error::RequestError;
use crate::executor::RequestOutcome;
use crate::requester::ProxyRequester;

use anyhow::anyhow;
use async_trait::async_trait;
use log::warn;
use reqwest_middleware::{Error, Middleware, Next, Result};
use std::sync::Arc;

/// Middleware that sends every request through a rotating proxy.
///
/// The request does not continue down the middleware chain; it is sent by
/// the proxy-bound client of the requester.
#[derive(Clone)]
pub struct ProxyRotationMiddleware {
    requester: Arc<ProxyRequester>,
}

impl ProxyRotationMiddleware {
    pub fn new(requester: ProxyRequester) -> Self {
        Self {
            requester: Arc::new(requester),
        }
    }

    /// Use a requester that is also used directly elsewhere.
    pub fn from_shared(requester: Arc<ProxyRequester>) -> Self {
        Self { requester }
    }

    pub fn requester(&self) -> &Arc<ProxyRequester> {
        &self.requester
    }
}

#[async_trait]
impl Middleware for ProxyRotationMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        _extensions: &mut http::Extensions,
        _next: Next<'_>,
    ) -> Result<reqwest::Response> {
        match self.requester.send(req).await {
            Ok(RequestOutcome::Completed(response)) => Ok(response),
            Ok(RequestOutcome::Recovered(failure)) => Err(Error::Middleware(anyhow!(failure))),
            Err(RequestError::Transport { proxy, source }) => {
                warn!("Request via proxy {} failed: {}", proxy, source);
                Err(Error::Reqwest(source))
            }
            Err(err) => Err(Error::Middleware(anyhow!(err))),
        }
    }
}
