//! Authentication middleware and trace context.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs. Longer client-provided values are
/// truncated to keep logs bounded and injection-free.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, filtered to
    /// printable ASCII and capped at [`MAX_TRACE_ID_LEN`] characters.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .take(MAX_TRACE_ID_LEN)
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    /// Get the trace ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request extension recording whether a valid write token was presented.
///
/// The middleware attaches this to every request; handlers for write
/// operations call [`Authenticated::require`].
#[derive(Clone, Copy, Debug)]
pub struct Authenticated(bool);

impl Authenticated {
    /// Require a valid write token, returning 401 otherwise.
    pub fn require(&self) -> ApiResult<()> {
        if self.0 {
            Ok(())
        } else {
            Err(ApiError::Unauthorized(
                "valid bearer token required".to_string(),
            ))
        }
    }
}

/// Extract a bearer token from the Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

/// Extract a trace ID from the X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Hash a token for comparison against the configured hash.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Middleware that sets up trace context and validates the bearer token.
///
/// Token validation happens here for every request; whether a route needs
/// a token is decided by its handler via [`Authenticated::require`], so
/// public read routes stay open.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let span = tracing::info_span!("request", trace_id = %trace_id);
    req.extensions_mut().insert(trace_id);

    let authorized = match extract_bearer_token(&req) {
        Some(token) => hash_token(token) == state.config.auth.token_hash,
        None => false,
    };
    req.extensions_mut().insert(Authenticated(authorized));

    next.run(req).instrument(span).await
}
