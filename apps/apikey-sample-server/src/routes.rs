//! Sample routes.
//!
//! - `GET /sample` requires an API key and greets its subject
//! - `GET /sample/new-key?user_id=<id>&valid_minutes=<n>` issues a key (public)

use std::sync::Arc;
use std::time::Duration;

use apikey_authn::{
    ApiKeyAuthenticator, ApiKeyGenerator, ApiKeyOptions, ApiKeyPrincipal, Problem,
    require_api_key,
};
use apikey_authn_sdk::{
    ApiKeyAuthError, AuthenticationOutcome, DataProtectionProvider, OutcomeBuilder, Principal,
    UserIdKey,
};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Router, middleware};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;

/// Identity carried by sample keys.
pub type SampleKey = UserIdKey<String>;

const DEFAULT_USER_ID: &str = "123";

/// Longest validity a sample key can be issued with (one year).
const MAX_VALID_MINUTES: u64 = 365 * 24 * 60;

/// Accepts every key, naming the principal after the user id inside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleOutcomeBuilder;

#[async_trait]
impl OutcomeBuilder<SampleKey> for SampleOutcomeBuilder {
    async fn build_outcome(
        &self,
        scheme: &str,
        key: SampleKey,
    ) -> Result<AuthenticationOutcome, ApiKeyAuthError> {
        let user_id = key.into_user_id();
        Ok(AuthenticationOutcome::accepted(
            Principal::builder(scheme)
                .claim("name", user_id.clone())
                .subject(user_id)
                .build(),
        ))
    }
}

#[derive(Clone)]
struct IssuerState {
    generator: Arc<ApiKeyGenerator>,
}

#[derive(Debug, Deserialize)]
struct NewKeyQuery {
    user_id: Option<String>,
    valid_minutes: Option<u64>,
}

/// Build the sample router.
///
/// # Errors
///
/// Returns an error if the `auth` configuration is invalid.
pub fn build_router(
    config: &AppConfig,
    provider: &dyn DataProtectionProvider,
) -> anyhow::Result<Router> {
    let options = ApiKeyOptions::<SampleKey>::from_config(&config.auth)?
        .with_outcome_builder(SampleOutcomeBuilder);
    let authenticator = Arc::new(ApiKeyAuthenticator::new(provider, options));
    let issuer = IssuerState {
        generator: Arc::new(ApiKeyGenerator::new(provider, &config.generator)),
    };

    let protected = Router::new()
        .route("/sample", get(hello))
        .route_layer(middleware::from_fn_with_state(
            authenticator,
            require_api_key::<SampleKey>,
        ));
    let public = Router::new()
        .route("/sample/new-key", get(new_key))
        .with_state(issuer);

    Ok(protected.merge(public).layer(TraceLayer::new_for_http()))
}

async fn hello(ApiKeyPrincipal(principal): ApiKeyPrincipal) -> String {
    format!("Hello {}", principal.subject().unwrap_or("anonymous"))
}

async fn new_key(
    State(state): State<IssuerState>,
    Query(query): Query<NewKeyQuery>,
) -> Result<String, Problem> {
    let user_id = query
        .user_id
        .unwrap_or_else(|| DEFAULT_USER_ID.to_owned());
    if user_id.is_empty() {
        return Err(Problem::new(
            StatusCode::BAD_REQUEST,
            "Bad Request",
            "user_id must not be empty",
        ));
    }

    let key = SampleKey::new(user_id);
    let issued = match query.valid_minutes {
        Some(minutes) if minutes > MAX_VALID_MINUTES => {
            return Err(Problem::new(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                &format!("valid_minutes must not exceed {MAX_VALID_MINUTES}"),
            ));
        }
        Some(minutes) => state
            .generator
            .protect_key_for(&key, Duration::from_secs(minutes * 60)),
        None => state.generator.protect_key(&key),
    };

    issued.map_err(|e| {
        tracing::error!(error = %e, "failed to issue api key");
        Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Failed to issue API key",
        )
    })
}
