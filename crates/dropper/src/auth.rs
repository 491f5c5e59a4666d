//! HTTP Basic authentication gate.
//!
//! The gate has exactly two states, fixed at startup: open, where every
//! request proceeds, and guarded, where every request must carry a valid
//! `Authorization: Basic` header matching the configured credential. There
//! is no session state; each request is checked independently. `/_ping`
//! bypasses the gate unconditionally so probes work before credentials are
//! distributed.

use std::fmt;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Challenge header value sent with every rejected request.
const CHALLENGE: &str = r#"Basic realm="Dropper""#;

/// Paths that never require authentication.
const EXEMPT_PATHS: &[&str] = &["/_ping"];

/// A single `user:pass` credential compared byte-for-byte against decoded
/// Basic-auth payloads.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw `user:pass` value. An empty value means no credential.
    pub fn from_env_value(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    fn matches(&self, decoded: &str) -> bool {
        self.0 == decoded
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// The gate's two states.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// No gate; every request proceeds.
    Open,
    /// Every request must carry a valid Basic credential.
    Guarded(Credential),
}

impl AuthMode {
    /// Decide whether a request carrying `header` (the raw `Authorization`
    /// value, if any) may proceed.
    pub fn authorized(&self, header: Option<&str>) -> bool {
        match self {
            AuthMode::Open => true,
            AuthMode::Guarded(credential) => {
                header.is_some_and(|h| check_basic(h, credential))
            }
        }
    }

    /// True when requests require a credential.
    pub fn is_guarded(&self) -> bool {
        matches!(self, AuthMode::Guarded(_))
    }
}

/// Validate one `Authorization` header value against the credential.
///
/// The scheme must be `Basic` (case-insensitive), the payload standard
/// base64 whose decoded bytes are UTF-8 equal to the configured
/// `user:pass`. Every failure mode is just a mismatch; callers cannot
/// tell them apart.
fn check_basic(header: &str, credential: &Credential) -> bool {
    let header = header.trim();
    let (scheme, rest) = match header.split_once(|c: char| c.is_ascii_whitespace()) {
        Some(parts) => parts,
        None => return false,
    };
    if !scheme.eq_ignore_ascii_case("basic") {
        return false;
    }

    let payload = rest.trim_start();
    let decoded = match STANDARD.decode(payload) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    match String::from_utf8(decoded) {
        Ok(value) => credential.matches(&value),
        Err(_) => false,
    }
}

/// Router middleware enforcing the gate on every route except the exempt
/// health probe.
pub async fn require_auth(State(mode): State<AuthMode>, request: Request, next: Next) -> Response {
    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if mode.authorized(header) {
        next.run(request).await
    } else {
        unauthorized()
    }
}

/// The uniform 401 response carrying the realm challenge.
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE))],
        "Authentication required",
    )
        .into_response()
}
