//! Response cache middleware.
//!
//! Wraps idempotent read handlers: serves stored payloads on a hit and
//! writes successful JSON bodies back into the store on a miss. Caching is a
//! pure side channel; every failure in the caching path falls back to the
//! wrapped handler's own response.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, header},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::CacheSettings;

use super::keys::{CacheKey, derive_key};
use super::policy::CachePolicy;
use super::store::{CacheEntry, CacheStore, Lookup};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared cache state for the middleware, injected per route group.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheSettings,
    pub store: Arc<CacheStore>,
    pub policy: CachePolicy,
}

impl CacheState {
    pub fn new(config: CacheSettings, store: Arc<CacheStore>, policy: CachePolicy) -> Self {
        Self {
            config,
            store,
            policy,
        }
    }
}

/// Middleware decorating a handler with response caching.
///
/// Only GET requests are eligible; everything else is forwarded untouched.
/// Hits are synthesized from the stored payload with `X-Cache: HIT`, a weak
/// `ETag`, and a `Cache-Control` max-age from the configured TTL. Misses run
/// the handler, write back successful JSON bodies best-effort, and carry
/// `X-Cache: MISS`.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled {
        return next.run(request).await;
    }

    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = derive_key(
        request.method(),
        request.uri(),
        &cache.policy.vary_headers,
        request.headers(),
    );
    let vary_context = capture_vary_context(&cache.policy.vary_headers, request.headers());

    match cache.store.get(&key, &cache.policy.read_options()) {
        Lookup::Fresh(entry) => {
            debug!(key = %key, outcome = "hit", "serving cached response");
            hit_response(&cache.policy, &entry)
        }
        Lookup::Stale(entry) => {
            debug!(key = %key, outcome = "stale_hit", "serving stale cached response");
            hit_response(&cache.policy, &entry)
        }
        Lookup::Miss => {
            debug!(key = %key, outcome = "miss", "cache miss, executing handler");
            let response = next.run(request).await;
            store_and_annotate(&cache, key, vary_context, response).await
        }
    }
}

/// Snapshot the vary-listed header values for the entry's diagnostic context.
fn capture_vary_context(vary_headers: &[String], headers: &HeaderMap) -> HashMap<String, String> {
    vary_headers
        .iter()
        .filter_map(|name| {
            headers
                .get(name.as_str())
                .and_then(|value| value.to_str().ok())
                .map(|value| (name.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

/// Synthesize a response from a cached entry.
fn hit_response(policy: &CachePolicy, entry: &CacheEntry) -> Response {
    let mut response = Response::new(Body::from(entry.payload().clone()));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("max-age={}", policy.ttl.as_secs())) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("W/\"{}\"", entry.fingerprint())) {
        headers.insert(header::ETAG, value);
    }
    headers.insert(X_CACHE, HeaderValue::from_static("HIT"));
    response
}

/// Write a successful response back into the store, best-effort, and mark it
/// as a miss. The response handed back to the caller is never altered beyond
/// the `X-Cache` annotation.
async fn store_and_annotate(
    cache: &CacheState,
    key: CacheKey,
    vary_context: HashMap<String, String>,
    response: Response,
) -> Response {
    let mut response = if should_store(&response) {
        match buffer_response(response).await {
            Ok((rebuilt, bytes)) => {
                if bytes.len() > cache.config.max_body_bytes {
                    debug!(
                        key = %key,
                        bytes = bytes.len(),
                        limit = cache.config.max_body_bytes,
                        "response body exceeds cacheable size, skipping cache"
                    );
                } else if serde_json::from_slice::<serde_json::Value>(&bytes).is_err() {
                    debug!(key = %key, "response body is not structured JSON, skipping cache");
                } else {
                    cache
                        .store
                        .set(key, bytes, cache.policy.write_options(vary_context));
                }
                rebuilt
            }
            Err((rebuilt, error)) => {
                warn!(key = %key, error = %error, "failed to buffer response body, skipping cache");
                rebuilt
            }
        }
    } else {
        response
    };
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static("MISS"));
    response
}

/// Uncacheable-response guards: only successful, cookie-free, non-streaming
/// responses are stored.
fn should_store(response: &Response) -> bool {
    if !response.status().is_success() {
        return false;
    }

    if response.headers().contains_key(header::SET_COOKIE) {
        return false;
    }

    if response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"))
    {
        return false;
    }

    true
}

#[derive(Debug, Error)]
enum BufferError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Collect the response body into memory, returning a rebuilt response on
/// both arms so the caller always has something intact to hand back.
async fn buffer_response(response: Response) -> Result<(Response, Bytes), (Response, BufferError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let rebuilt = Response::from_parts(parts, Body::from(bytes.clone()));
            Ok((rebuilt, bytes))
        }
        Err(error) => {
            // The body stream already failed mid-flight; the original caller
            // could not have received it either.
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, BufferError::Buffer(error.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn should_store_accepts_plain_success() {
        let response = (StatusCode::OK, "{}").into_response();
        assert!(should_store(&response));
    }

    #[test]
    fn should_store_rejects_failures() {
        let response = StatusCode::NOT_FOUND.into_response();
        assert!(!should_store(&response));
        let response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        assert!(!should_store(&response));
    }

    #[test]
    fn should_store_rejects_set_cookie() {
        let response = (
            StatusCode::OK,
            [(header::SET_COOKIE, "session=1")],
            "{}",
        )
            .into_response();
        assert!(!should_store(&response));
    }

    #[test]
    fn should_store_rejects_event_streams() {
        let response = (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/event-stream")],
            "",
        )
            .into_response();
        assert!(!should_store(&response));
    }

    #[tokio::test]
    async fn buffer_response_preserves_status_headers_and_body() {
        let response = (
            StatusCode::CREATED,
            [(header::CONTENT_TYPE, "application/json")],
            "{\"id\":1}",
        )
            .into_response();

        let (rebuilt, bytes) = buffer_response(response).await.expect("buffered");
        assert_eq!(bytes.as_ref(), b"{\"id\":1}");
        assert_eq!(rebuilt.status(), StatusCode::CREATED);
        assert_eq!(
            rebuilt
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("application/json")
        );

        let replayed = axum::body::to_bytes(rebuilt.into_body(), usize::MAX)
            .await
            .expect("rebuilt body");
        assert_eq!(replayed.as_ref(), b"{\"id\":1}");
    }
}
