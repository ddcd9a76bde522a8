//! In-memory [`Network`] for exercising strategies without sockets.
//!
//! Routes are matched on the full URL string (fragment stripped). Unknown
//! URLs answer `404`; a network switched offline fails every call.

use crate::fetch::{CacheMode, Network};
use async_trait::async_trait;
use mapcache_core::{Error, Request, Response};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Route {
    Respond(Response),
    Delay(Duration, Response),
    Fail,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub url: String,
    pub cache: CacheMode,
}

/// Scripted network double.
#[derive(Debug)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<Call>>,
    online: AtomicBool,
    preload: bool,
}

impl Default for ScriptedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
            preload: false,
        }
    }

    /// Advertise navigation preload support.
    pub fn with_preload(mut self) -> Self {
        self.preload = true;
        self
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.route(url, Route::Respond(response));
    }

    /// Answer after `delay`; dropping the fetch future cancels the wait.
    pub fn delay(&self, url: &str, delay: Duration, response: Response) {
        self.route(url, Route::Delay(delay, response));
    }

    /// Fail `url` with a network error.
    pub fn fail(&self, url: &str) {
        self.route(url, Route::Fail);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of fetches issued for `url`.
    pub fn calls_for(&self, url: &str) -> usize {
        let url = normalize(url);
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).iter().filter(|c| c.url == url).count()
    }

    pub fn last_cache_mode(&self, url: &str) -> Option<CacheMode> {
        let url = normalize(url);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|c| c.url == url)
            .map(|c| c.cache)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn route(&self, url: &str, route: Route) {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).insert(normalize(url), route);
    }
}

fn normalize(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request, cache: CacheMode) -> Result<Response, Error> {
        let url = normalize(request.url.as_str());
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(Call { url: url.clone(), cache });

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {url}")));
        }

        let route = self.routes.lock().unwrap_or_else(PoisonError::into_inner).get(&url).cloned();
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Delay(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Route::Fail) => Err(Error::Network(format!("connection reset: {url}"))),
            None => Ok(Response::new(404, Vec::new())),
        }
    }

    fn supports_navigation_preload(&self) -> bool {
        self.preload
    }
}
