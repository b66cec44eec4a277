//! External URI resources and their lazy, cooldown-gated fetching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::clock::Clock;
use crate::{FeatureResource, FetchError};

/// Retrieves the body of an external URI.
pub trait UriFetcher: Send + Sync {
    /// Fetch `uri` as text.
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` on transport or I/O failure.
    fn fetch(&self, uri: &Url) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    /// Fetcher giving up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl UriFetcher for HttpFetcher {
    fn fetch(&self, uri: &Url) -> Result<String, FetchError> {
        info!("Fetching {}", uri);
        let response = ureq::get(uri.as_str())
            .timeout(self.timeout)
            .call()
            .map_err(|e| FetchError::Http(format!("Failed to fetch {uri}: {e}")))?;
        Ok(response.into_string()?)
    }
}

/// Lazy fetch state of one external resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// No attempt made yet
    Unfetched,
    /// Content retrieved; never refetched
    Fetched(Arc<str>),
    /// Last attempt failed at this instant
    FailedRecently(std::time::Instant),
}

/// Content retrieved on first access, retried after a cooldown on failure.
///
/// The fetch itself runs without holding the state lock, so concurrent
/// readers may fetch the same content twice; the first success sticks.
#[derive(Debug)]
pub struct LazyContent {
    state: Mutex<FetchState>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl LazyContent {
    /// Unfetched content retried no sooner than `cooldown` after a failure.
    pub fn new(clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(FetchState::Unfetched),
            clock,
            cooldown,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FetchState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current content, fetching it with `fetch` if allowed.
    pub fn get<F>(&self, fetch: F) -> Option<Arc<str>>
    where
        F: FnOnce() -> Result<String, FetchError>,
    {
        let now = self.clock.now();
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            FetchState::Fetched(content) => return Some(content.clone()),
            FetchState::FailedRecently(at) if now.saturating_duration_since(*at) <= self.cooldown => {
                return None;
            }
            _ => {}
        }

        let outcome = fetch();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(body) => {
                let body: Arc<str> = body.into();
                *state = FetchState::Fetched(body.clone());
                Some(body)
            }
            Err(e) => {
                warn!("Lazy fetch failed, retrying after {:?}: {}", self.cooldown, e);
                // A concurrent success wins over this failure.
                if let FetchState::Fetched(content) = &*state {
                    return Some(content.clone());
                }
                *state = FetchState::FailedRecently(now);
                None
            }
        }
    }

    fn is_fetched(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            FetchState::Fetched(_)
        )
    }
}

/// Resource backed by an external URI.
///
/// Non-inline resources are references: their content is the URI itself.
/// Inline resources fetch their content on first access.
pub struct UriResource {
    uri: Url,
    name: String,
    attributes: HashMap<String, String>,
    body: Option<(LazyContent, Arc<dyn UriFetcher>)>,
}

impl std::fmt::Debug for UriResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriResource")
            .field("uri", &self.uri.as_str())
            .field("inline", &self.body.is_some())
            .field("state", &self.body.as_ref().map(|(lazy, _)| lazy.state()))
            .finish_non_exhaustive()
    }
}

impl UriResource {
    /// Reference to an external script, emitted as its URL.
    pub fn reference(uri: Url, attributes: HashMap<String, String>) -> Self {
        Self {
            name: uri.to_string(),
            uri,
            attributes,
            body: None,
        }
    }

    /// External script whose content is fetched lazily.
    pub fn inline(
        uri: Url,
        attributes: HashMap<String, String>,
        fetcher: Arc<dyn UriFetcher>,
        lazy: LazyContent,
    ) -> Self {
        debug!("Deferring fetch of {} until first access", uri);
        Self {
            name: uri.to_string(),
            uri,
            attributes,
            body: Some((lazy, fetcher)),
        }
    }

    /// The external URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }
}

impl FeatureResource for UriResource {
    fn content(&self) -> Option<Arc<str>> {
        match &self.body {
            None => Some(Arc::from(self.uri.as_str())),
            Some((lazy, fetcher)) => lazy.get(|| fetcher.fetch(&self.uri)),
        }
    }

    fn debug_content(&self) -> Option<Arc<str>> {
        self.content()
    }

    fn is_external(&self) -> bool {
        self.body.is_none()
    }

    fn is_proxy_cacheable(&self) -> bool {
        match &self.body {
            None => true,
            Some((lazy, _)) => lazy.is_fetched(),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }
}
