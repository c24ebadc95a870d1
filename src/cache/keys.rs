//! Cache key derivation.
//!
//! A key is a deterministic string built from the request method, path,
//! query string, and the values of any configured vary headers, in
//! configured order. Headers outside the vary list never influence the key.
//! The incoming path+query string is trusted as canonical; query parameters
//! are not re-sorted.

use std::fmt;

use axum::http::{HeaderMap, Method, Uri};

/// Lookup identifier for a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from an already-formatted string. Intended for tooling and
    /// tests; request-driven callers should use [`derive_key`].
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a request.
///
/// Two requests differing only in a header outside `vary_headers` map to the
/// same key. A configured vary header that is absent from the request
/// contributes an empty value, so presence and absence cache separately.
pub fn derive_key(
    method: &Method,
    uri: &Uri,
    vary_headers: &[String],
    headers: &HeaderMap,
) -> CacheKey {
    let mut key = format!("{method} {}", uri.path());
    if let Some(query) = uri.query() {
        key.push('?');
        key.push_str(query);
    }
    for name in vary_headers {
        let value = headers
            .get(name.as_str())
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        key.push('|');
        key.push_str(&name.to_ascii_lowercase());
        key.push('=');
        key.push_str(value);
    }
    CacheKey(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(raw: &str) -> Uri {
        raw.parse().expect("test uri")
    }

    #[test]
    fn key_includes_method_path_and_query() {
        let key = derive_key(&Method::GET, &uri("/trips?id=1"), &[], &HeaderMap::new());
        assert_eq!(key.as_str(), "GET /trips?id=1");
    }

    #[test]
    fn distinct_queries_produce_distinct_keys() {
        let first = derive_key(&Method::GET, &uri("/x?id=1"), &[], &HeaderMap::new());
        let second = derive_key(&Method::GET, &uri("/x?id=2"), &[], &HeaderMap::new());
        assert_ne!(first, second);
    }

    #[test]
    fn method_distinguishes_keys() {
        let get = derive_key(&Method::GET, &uri("/x"), &[], &HeaderMap::new());
        let post = derive_key(&Method::POST, &uri("/x"), &[], &HeaderMap::new());
        assert_ne!(get, post);
    }

    #[test]
    fn non_vary_headers_never_change_the_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "abc".parse().expect("header value"));
        let with_header = derive_key(&Method::GET, &uri("/x"), &[], &headers);
        let without = derive_key(&Method::GET, &uri("/x"), &[], &HeaderMap::new());
        assert_eq!(with_header, without);
    }

    #[test]
    fn vary_header_values_enter_the_key_in_configured_order() {
        let vary = vec!["authorization".to_string(), "accept-language".to_string()];
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer t1".parse().expect("header value"));
        headers.insert("accept-language", "fi".parse().expect("header value"));

        let key = derive_key(&Method::GET, &uri("/me"), &vary, &headers);
        assert_eq!(key.as_str(), "GET /me|authorization=Bearer t1|accept-language=fi");
    }

    #[test]
    fn differing_vary_values_produce_distinct_keys() {
        let vary = vec!["authorization".to_string()];
        let mut first_headers = HeaderMap::new();
        first_headers.insert("authorization", "Bearer t1".parse().expect("header value"));
        let mut second_headers = HeaderMap::new();
        second_headers.insert("authorization", "Bearer t2".parse().expect("header value"));

        let first = derive_key(&Method::GET, &uri("/me"), &vary, &first_headers);
        let second = derive_key(&Method::GET, &uri("/me"), &vary, &second_headers);
        assert_ne!(first, second);
    }

    #[test]
    fn missing_vary_header_contributes_empty_value() {
        let vary = vec!["authorization".to_string()];
        let key = derive_key(&Method::GET, &uri("/me"), &vary, &HeaderMap::new());
        assert_eq!(key.as_str(), "GET /me|authorization=");
    }

    #[test]
    fn derivation_is_idempotent() {
        let vary = vec!["accept-language".to_string()];
        let mut headers = HeaderMap::new();
        headers.insert("accept-language", "en".parse().expect("header value"));

        let first = derive_key(&Method::GET, &uri("/search?q=pike"), &vary, &headers);
        let second = derive_key(&Method::GET, &uri("/search?q=pike"), &vary, &headers);
        assert_eq!(first, second);
    }
}
