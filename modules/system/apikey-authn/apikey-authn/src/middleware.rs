//! Axum middleware and extractor for API key authentication.

use std::sync::Arc;

use apikey_authn_sdk::{
    ApiKeyAuthError, AuthenticationOutcome, IdentityKey, Principal, RejectReason,
};
use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::{ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, WWW_AUTHENTICATE};
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::authenticator::ApiKeyAuthenticator;
use crate::problem::Problem;

/// Requires a valid API key on every request it wraps.
///
/// Accepted requests carry the `Arc<Principal>` in their extensions (see
/// [`ApiKeyPrincipal`]). Rejected requests get a 401 problem response with a
/// `WWW-Authenticate` challenge naming the scheme.
///
/// ```ignore
/// let auth = Arc::new(ApiKeyAuthenticator::<UserIdKey<String>>::new(&provider, options));
/// let router = Router::new()
///     .route("/sample", get(handler))
///     .layer(axum::middleware::from_fn_with_state(auth, require_api_key::<UserIdKey<String>>));
/// ```
pub async fn require_api_key<K: IdentityKey>(
    State(authenticator): State<Arc<ApiKeyAuthenticator<K>>>,
    mut req: Request,
    next: Next,
) -> Response {
    // Skip CORS preflight
    if is_preflight_request(req.method(), req.headers()) {
        return next.run(req).await;
    }

    match authenticator.authenticate(req.headers()).await {
        Ok(AuthenticationOutcome::Accepted(principal)) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Ok(AuthenticationOutcome::Rejected(reason)) => {
            rejection_to_response(authenticator.scheme(), &reason)
        }
        Err(err) => authn_error_to_response(&err),
    }
}

/// The detail is generic so responses do not reveal why a key was refused.
fn rejection_to_response(scheme: &str, reason: &RejectReason) -> Response {
    tracing::debug!(scheme, %reason, "api key authentication rejected");
    let mut response = Problem::new(
        StatusCode::UNAUTHORIZED,
        "Unauthorized",
        "Missing or invalid API key",
    )
    .into_response();
    if let Ok(challenge) = HeaderValue::from_str(scheme) {
        response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
    }
    response
}

/// Convert `ApiKeyAuthError` to an RFC-9457 Problem Details response.
fn authn_error_to_response(err: &ApiKeyAuthError) -> Response {
    log_authn_error(err);
    let (status, title, detail) = match err {
        ApiKeyAuthError::ServiceUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable",
            "Authentication service unavailable",
        ),
        ApiKeyAuthError::Protection(_)
        | ApiKeyAuthError::InvalidIdentity(_)
        | ApiKeyAuthError::OutcomeBuilder(_)
        | ApiKeyAuthError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Internal authentication error",
        ),
    };
    Problem::new(status, title, detail).into_response()
}

fn log_authn_error(err: &ApiKeyAuthError) {
    match err {
        ApiKeyAuthError::ServiceUnavailable(msg) => {
            tracing::error!("API key authentication unavailable: {msg}");
        }
        other => tracing::error!("API key authentication failed: {other}"),
    }
}

fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(ORIGIN)
        && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

/// Extractor for the principal attached by [`require_api_key`].
#[derive(Debug, Clone)]
pub struct ApiKeyPrincipal(pub Arc<Principal>);

impl<S> FromRequestParts<S> for ApiKeyPrincipal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<Principal>>()
            .map(|principal| Self(Arc::clone(principal)))
            .ok_or_else(|| {
                tracing::error!("Principal not found - api key middleware not configured");
                Problem::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "Authentication context missing",
                )
                .into_response()
            })
    }
}
