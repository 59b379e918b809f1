//! Grounding redirect resolution.
//!
//! Grounding chunks point at opaque `grounding-api-redirect` URLs. Clients want
//! the landing page, so the chain is walked by hand (HEAD, falling back to
//! GET) and every outcome cached for the process lifetime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ag2api_types::RedirectConfig;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use reqwest::header::{ACCEPT, LOCATION, USER_AGENT};
use reqwest::Method;
use tokio::time::Instant;
use url::Url;

use crate::proxy::common::build_http_client;

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Turns a redirect URL into its landing URL. Never fails: on any problem
/// the input comes back unchanged.
#[async_trait]
pub trait RedirectResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> String;
}

/// Resolver that leaves every URL alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRedirectResolver;

#[async_trait]
impl RedirectResolver for NoopRedirectResolver {
    async fn resolve(&self, url: &str) -> String {
        url.to_string()
    }
}

/// HTTP resolver with a bounded process-wide cache.
///
/// Concurrent lookups of the same URL share one chain walk.
pub struct HttpRedirectResolver {
    walker: Arc<ChainWalker>,
    redirect_prefix: String,
    cache_capacity: usize,
    cache: RwLock<HashMap<String, String>>,
    in_flight: Mutex<HashMap<String, Shared<BoxFuture<'static, String>>>>,
}

struct ChainWalker {
    client: reqwest::Client,
    max_hops: u32,
    chain_timeout: Duration,
}

impl HttpRedirectResolver {
    pub fn new(config: &RedirectConfig) -> Result<Self, String> {
        Ok(Self {
            walker: Arc::new(ChainWalker {
                client: build_http_client(config)?,
                max_hops: config.max_hops,
                chain_timeout: Duration::from_secs(config.timeout_secs),
            }),
            redirect_prefix: config.redirect_prefix.clone(),
            cache_capacity: config.cache_capacity,
            cache: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_redirect_url(&self, url: &str) -> bool {
        !self.redirect_prefix.is_empty() && url.starts_with(&self.redirect_prefix)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    fn remember(&self, url: &str, resolved: &str) {
        let mut cache = self.cache.write();
        if cache.get(url).is_some_and(|hit| hit == resolved) {
            return;
        }
        cache.insert(url.to_string(), resolved.to_string());
        if cache.len() > self.cache_capacity {
            tracing::debug!("[Grounding] Redirect cache exceeded {} entries, clearing", self.cache_capacity);
            cache.clear();
        }
    }
}

impl ChainWalker {
    /// Walk the chain until a non-redirect answer, the hop limit, or the
    /// shared deadline. Returns the furthest URL reached.
    async fn follow_chain(&self, url: &str) -> String {
        let deadline = Instant::now() + self.chain_timeout;
        let mut current = url.to_string();

        for _ in 0..self.max_hops {
            let next = match self.next_location(&current, Method::HEAD, deadline).await {
                Some(next) => Some(next),
                None => self.next_location(&current, Method::GET, deadline).await,
            };
            match next {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }

        current
    }

    async fn next_location(&self, current: &str, method: Method, deadline: Instant) -> Option<String> {
        let request = self
            .client
            .request(method.clone(), current)
            .header(ACCEPT, BROWSER_ACCEPT)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send();

        let response = match tokio::time::timeout_at(deadline, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::debug!("[Grounding] {} {} failed: {}", method, current, e);
                return None;
            }
            Err(_) => {
                tracing::debug!("[Grounding] Redirect chain timed out at {}", current);
                return None;
            }
        };

        if !response.status().is_redirection() {
            return None;
        }

        let location = response.headers().get(LOCATION)?.to_str().ok()?.trim();
        if location.is_empty() {
            return None;
        }

        let resolved = Url::parse(current).ok()?.join(location).ok()?;
        Some(unwrap_google_redirect(resolved.as_str()))
    }
}

#[async_trait]
impl RedirectResolver for HttpRedirectResolver {
    async fn resolve(&self, url: &str) -> String {
        if !self.is_redirect_url(url) {
            return url.to_string();
        }

        let flight = {
            let mut in_flight = self.in_flight.lock();
            if let Some(hit) = self.cache.read().get(url).cloned() {
                return hit;
            }
            in_flight
                .entry(url.to_string())
                .or_insert_with(|| {
                    let walker = Arc::clone(&self.walker);
                    let start = url.to_string();
                    async move { walker.follow_chain(&start).await }.boxed().shared()
                })
                .clone()
        };

        let resolved = flight.await;
        if resolved != url {
            tracing::debug!("[Grounding] Resolved redirect {} -> {}", url, resolved);
        }
        self.remember(url, &resolved);
        self.in_flight.lock().remove(url);
        resolved
    }
}

/// Unwrap `https://*.google.com/url?q=<target>` (or `url=`) to the target.
pub fn unwrap_google_redirect(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return url.to_string();
    }
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    if !(host == "google.com" || host.ends_with(".google.com")) || !parsed.path().ends_with("/url") {
        return url.to_string();
    }

    let pick = |key: &str| {
        parsed.query_pairs().find(|(k, v)| k == key && !v.is_empty()).map(|(_, v)| v.into_owned())
    };
    pick("q").or_else(|| pick("url")).unwrap_or_else(|| url.to_string())
}
