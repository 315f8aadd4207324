//! Per-browser identifier kept in a path-scoped cookie.
//!
//! The identifier is a random UUID generated on first contact and reused until
//! the browser drops the cookie. It is a handle, not an authenticated identity.

use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, info, warn};

use crate::config::IdentityConfig;
use crate::domain::Identifier;

#[derive(Clone, Debug)]
pub struct IdentityProvider {
    cookie_name: String,
    max_age_days: u32,
}

/// Result of resolving the identifier for one request.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub identifier: Identifier,
    /// `Set-Cookie` value to send back when the identifier was just issued.
    pub issued: Option<HeaderValue>,
}

impl IdentityProvider {
    pub fn new(cfg: &IdentityConfig) -> Self {
        Self { cookie_name: cfg.cookie_name.clone(), max_age_days: cfg.max_age_days }
    }

    /// The identifier from the request cookie, or a freshly generated one
    /// together with the cookie that persists it.
    pub fn resolve(&self, headers: &HeaderMap) -> Resolved {
        if let Some(identifier) = self.read_cookie(headers) {
            debug!(target: "identity", %identifier, "Identifier from cookie");
            return Resolved { identifier, issued: None };
        }
        let identifier = generate_identifier();
        info!(target: "identity", %identifier, "Issued new identifier");
        let issued = self.issue_cookie(&identifier);
        Resolved { identifier, issued }
    }

    fn read_cookie(&self, headers: &HeaderMap) -> Option<Identifier> {
        CookieJar::from_headers(headers)
            .get(&self.cookie_name)
            .and_then(|c| Identifier::parse(c.value()).ok())
    }

    /// Best-effort: a value that cannot be encoded as a header is silently not sent.
    fn issue_cookie(&self, identifier: &Identifier) -> Option<HeaderValue> {
        let max_age = u64::from(self.max_age_days) * 24 * 60 * 60;
        let cookie = format!(
            "{}={}; Max-Age={}; Path=/; SameSite=Lax",
            self.cookie_name, identifier, max_age
        );
        HeaderValue::from_str(&cookie).ok()
    }
}

/// 128-bit random identifier. Uses the OS random source; falls back to the
/// thread-local PRNG (weaker, logged) only when the OS source fails.
pub fn generate_identifier() -> Identifier {
    let mut bytes = [0u8; 16];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        warn!(target: "identity", error = %e, "OS random source unavailable; using weaker fallback");
        rand::thread_rng().fill_bytes(&mut bytes);
    }
    Identifier::from_uuid(uuid::Builder::from_random_bytes(bytes).into_uuid())
}

/// Attach the identity cookie (if one was just issued) to any response.
pub fn with_cookie(issued: Option<HeaderValue>, resp: impl IntoResponse) -> Response {
    let mut resp = resp.into_response();
    if let Some(cookie) = issued {
        resp.headers_mut().append(SET_COOKIE, cookie);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use uuid::Uuid;

    fn provider() -> IdentityProvider {
        IdentityProvider::new(&IdentityConfig::default())
    }

    #[test]
    fn existing_cookie_is_reused() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; uid=abc-123; other=1"));
        let r = provider().resolve(&headers);
        assert_eq!(r.identifier.as_str(), "abc-123");
        assert!(r.issued.is_none());
    }

    #[test]
    fn missing_or_blank_cookie_issues_a_new_one() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("uid=  "));
        for h in [HeaderMap::new(), headers] {
            let r = provider().resolve(&h);
            assert!(Uuid::parse_str(r.identifier.as_str()).is_ok());
            let cookie = r.issued.unwrap();
            let cookie = cookie.to_str().unwrap();
            assert!(cookie.starts_with(&format!("uid={}", r.identifier)));
            assert!(cookie.contains("Max-Age=31536000"));
            assert!(cookie.contains("Path=/"));
            assert!(cookie.contains("SameSite=Lax"));
        }
    }

    #[test]
    fn cookie_is_found_across_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("session=s1; uid=from-second-header"));
        let r = provider().resolve(&headers);
        assert_eq!(r.identifier.as_str(), "from-second-header");
        assert!(r.issued.is_none());

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("myuid=nope; uidx=nope"));
        assert!(provider().resolve(&headers).issued.is_some());
    }

    #[test]
    fn generated_identifiers_are_unique_v4_uuids() {
        let a = generate_identifier();
        let b = generate_identifier();
        assert_ne!(a, b);
        assert_eq!(Uuid::parse_str(a.as_str()).unwrap().get_version_num(), 4);
    }

    #[test]
    fn with_cookie_sets_header_only_when_issued() {
        let resp = with_cookie(None, "ok");
        assert!(resp.headers().get(SET_COOKIE).is_none());
        let resp = with_cookie(Some(HeaderValue::from_static("uid=x; Path=/")), "ok");
        assert_eq!(resp.headers()[SET_COOKIE], "uid=x; Path=/");
    }
}
