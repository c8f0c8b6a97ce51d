//! Structured events emitted by the requester.

use crate::proxy::ProxyServer;

use log::Level;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// An event emitted while constructing or using a requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    /// The requester was constructed (only emitted at debug level 2 and up).
    PoolStart { proxies: usize },
    /// Every attempt through `proxy` failed.
    MaxRetryError { path: String, proxy: ProxyServer },
    /// The last attempt timed out while reading the response.
    ReadTimeoutError { path: String },
}

impl ProxyEvent {
    /// Stable key identifying the kind of event.
    pub fn key(&self) -> &'static str {
        match self {
            Self::PoolStart { .. } => "proxy_pool_start",
            Self::MaxRetryError { .. } => "proxy_max_retry_error",
            Self::ReadTimeoutError { .. } => "read_timeout_error",
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Self::PoolStart { .. } => Level::Debug,
            Self::MaxRetryError { .. } | Self::ReadTimeoutError { .. } => Level::Warn,
        }
    }
}

impl fmt::Display for ProxyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolStart { proxies } => {
                write!(f, "Proxy pool started with {} proxies", proxies)
            }
            Self::MaxRetryError { path, proxy } => {
                write!(f, "Max retries exceeded for {} via proxy {}", path, proxy)
            }
            Self::ReadTimeoutError { path } => write!(f, "Read timeout for {}", path),
        }
    }
}

/// Receives events from a requester.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProxyEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: ProxyEvent) {
        (**self).emit(event)
    }
}

/// Forwards events to the `log` facade at the event's level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: ProxyEvent) {
        log::log!(target: "reqwest_proxy_rotation::events", event.level(), "[{}] {}", event.key(), event);
    }
}

/// Keeps events in memory, e.g. to report skipped URLs after a scan.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProxyEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of all events received so far.
    pub fn events(&self) -> Vec<ProxyEvent> {
        self.events.lock().clone()
    }

    /// Take all events received so far.
    pub fn drain(&self) -> Vec<ProxyEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ProxyEvent) {
        self.events.lock().push(event);
    }
}
