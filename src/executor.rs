//! Request execution through a connection pool.

use crate::error::RequestError;
use crate::events::{EventSink, ProxyEvent};
use crate::pool::ConnectionPool;
use crate::proxy::ProxyServer;

use log::debug;
use reqwest::{Request, Response};
use std::fmt;
use thiserror::Error;

/// Kind of a transient failure that was recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Every attempt failed to connect or to complete the exchange.
    RetryExhausted,
    /// The last attempt timed out waiting for the response.
    ReadTimeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryExhausted => f.write_str("max retries exceeded"),
            Self::ReadTimeout => f.write_str("read timeout"),
        }
    }
}

/// A transient failure, reported through an event instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} for {path} via proxy {proxy} after {attempts} attempts")]
pub struct RecoveredFailure {
    pub kind: FailureKind,
    /// Path component of the request url.
    pub path: String,
    pub proxy: ProxyServer,
    pub attempts: usize,
}

impl RecoveredFailure {
    /// The event announcing this failure.
    pub fn event(&self) -> ProxyEvent {
        match self.kind {
            FailureKind::RetryExhausted => ProxyEvent::MaxRetryError {
                path: self.path.clone(),
                proxy: self.proxy.clone(),
            },
            FailureKind::ReadTimeout => ProxyEvent::ReadTimeoutError {
                path: self.path.clone(),
            },
        }
    }
}

/// Result of a request that did not fail fatally.
#[derive(Debug)]
pub enum RequestOutcome {
    /// A response was received, whatever its status.
    ///
    /// The connection budget permit is released once the headers arrive;
    /// reading the body does not count against `threads`.
    Completed(Response),
    /// The request was given up after a transient failure.
    Recovered(RecoveredFailure),
}

impl RequestOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Completed(response) => Some(response),
            Self::Recovered(_) => None,
        }
    }

    /// The response, or `None` when the request was skipped.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Completed(response) => Some(response),
            Self::Recovered(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RecoveredFailure> {
        match self {
            Self::Completed(_) => None,
            Self::Recovered(failure) => Some(failure),
        }
    }
}

/// Classify a transport error; `None` means the error is fatal.
fn transient_kind(err: &reqwest::Error) -> Option<FailureKind> {
    if err.is_timeout() && !err.is_connect() {
        Some(FailureKind::ReadTimeout)
    } else if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        Some(FailureKind::RetryExhausted)
    } else {
        None
    }
}

/// Send `request` through `pool`, retrying transient failures `retries` times.
///
/// Redirects are returned as is. When the attempts run out, one event is
/// emitted to `events` and the failure is returned as
/// [`RequestOutcome::Recovered`]. Other errors are returned without retrying.
pub(crate) async fn execute(
    pool: &ConnectionPool,
    request: Request,
    retries: usize,
    events: &dyn EventSink,
) -> Result<RequestOutcome, RequestError> {
    let path = request.url().path().to_string();
    let attempts = retries + 1;

    let _permit = pool.acquire().await.map_err(|_| RequestError::BudgetClosed)?;

    let mut request = Some(request);
    let mut attempt = 0;

    loop {
        attempt += 1;

        // The last attempt consumes the original request.
        let current = if attempt < attempts {
            request.as_ref().and_then(Request::try_clone)
        } else {
            request.take()
        };
        let current = current.ok_or(RequestError::UncloneableRequest)?;

        match pool.client().execute(current).await {
            Ok(response) => {
                debug!(
                    "{} {} via proxy {} (attempt {})",
                    response.status(),
                    path,
                    pool.server(),
                    attempt
                );
                return Ok(RequestOutcome::Completed(response));
            }
            Err(err) => {
                let Some(kind) = transient_kind(&err) else {
                    return Err(RequestError::Transport {
                        proxy: pool.server().to_string(),
                        source: err,
                    });
                };

                if attempt < attempts {
                    debug!(
                        "Request {} failed via proxy {} (attempt {}/{}): {}",
                        path,
                        pool.server(),
                        attempt,
                        attempts,
                        err
                    );
                    continue;
                }

                debug!("Giving up on {} via proxy {}: {}", path, pool.server(), err);
                let failure = RecoveredFailure {
                    kind,
                    path,
                    proxy: pool.server().clone(),
                    attempts,
                };
                events.emit(failure.event());
                return Ok(RequestOutcome::Recovered(failure));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::pool::{PoolFactory, PoolLimits};
    use crate::proxy::SchemeVariant;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts warnings and errors logged from this module.
    struct WarnCounter(AtomicUsize);

    impl log::Log for WarnCounter {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if record.level() <= log::Level::Warn
                && record.target().starts_with("reqwest_proxy_rotation::executor")
            {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn flush(&self) {}
    }

    static EXECUTOR_WARNINGS: WarnCounter = WarnCounter(AtomicUsize::new(0));

    fn failure(kind: FailureKind) -> RecoveredFailure {
        RecoveredFailure {
            kind,
            path: "/backup.zip".to_string(),
            proxy: ProxyServer::new("http://10.0.0.1:3128"),
            attempts: 4,
        }
    }

    #[test]
    fn test_failure_events() {
        assert_eq!(
            failure(FailureKind::RetryExhausted).event(),
            ProxyEvent::MaxRetryError {
                path: "/backup.zip".to_string(),
                proxy: ProxyServer::new("http://10.0.0.1:3128"),
            }
        );
        assert_eq!(
            failure(FailureKind::ReadTimeout).event(),
            ProxyEvent::ReadTimeoutError { path: "/backup.zip".to_string() }
        );
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(
            failure(FailureKind::ReadTimeout).to_string(),
            "read timeout for /backup.zip via proxy http://10.0.0.1:3128 after 4 attempts"
        );
    }

    #[test]
    fn test_recovered_outcome_has_no_response() {
        let outcome = RequestOutcome::Recovered(failure(FailureKind::RetryExhausted));
        assert!(!outcome.is_completed());
        assert!(outcome.response().is_none());
        assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::RetryExhausted));
        assert!(outcome.into_response().is_none());
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_reported_by_event_only() {
        let _ = log::set_logger(&EXECUTOR_WARNINGS);
        log::set_max_level(log::LevelFilter::Trace);

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let server = ProxyServer::new(&format!("http://{}", listener.local_addr().unwrap()));
        drop(listener);

        let limits = PoolLimits::new(1, Duration::from_secs(2));
        let pool = PoolFactory::default()
            .build(SchemeVariant::Plain, &server, &limits)
            .unwrap();
        let request = pool
            .client()
            .get("http://scan-target.test/backup.zip")
            .build()
            .unwrap();
        let sink = MemorySink::new();

        let outcome = execute(&pool, request, 1, &sink).await.unwrap();
        assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::RetryExhausted));
        assert_eq!(sink.len(), 1);
        assert_eq!(EXECUTOR_WARNINGS.0.load(Ordering::SeqCst), 0);
    }
}
