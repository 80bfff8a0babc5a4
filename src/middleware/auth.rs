//! Authentication middleware
//!
//! Checks the presented credential against the configured bearer secrets.
//! `X-API-Key` is consulted before `Authorization: Bearer`, and each
//! candidate is compared with the custom key before the platform token.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::{
    credentials::CredentialStore, error::AppError, routes::metrics::record_auth_decision,
    AppState,
};

/// Dedicated API key header
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header slot a credential was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSlot {
    ApiKey,
    Authorization,
}

impl HeaderSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderSlot::ApiKey => "x-api-key",
            HeaderSlot::Authorization => "authorization",
        }
    }
}

/// Configured secret a credential matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    CustomKey,
    PlatformToken,
}

impl SecretKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::CustomKey => "custom_key",
            SecretKind::PlatformToken => "platform_token",
        }
    }
}

/// How a request got through the gate
///
/// Inserted into request extensions for handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPath {
    /// No secrets configured
    OpenMode,
    Matched { slot: HeaderSlot, secret: SecretKind },
}

impl AuthPath {
    pub fn label(&self) -> String {
        match self {
            AuthPath::OpenMode => "open_mode".to_string(),
            AuthPath::Matched { slot, secret } => {
                format!("{}:{}", slot.as_str(), secret.as_str())
            }
        }
    }
}

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingCredential,
    InvalidCredential,
}

/// Authenticator outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow(AuthPath),
    Reject(RejectReason),
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow(_))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Decide whether a credential pair is acceptable
pub fn authenticate(
    api_key: Option<&str>,
    authorization: Option<&str>,
    store: &CredentialStore,
) -> AuthDecision {
    if store.is_open_mode() {
        return AuthDecision::Allow(AuthPath::OpenMode);
    }

    let candidates = [
        (HeaderSlot::ApiKey, api_key.map(str::trim).filter(|k| !k.is_empty())),
        (
            HeaderSlot::Authorization,
            authorization.and_then(extract_bearer_token),
        ),
    ];

    let mut presented = false;
    for (slot, candidate) in candidates {
        let Some(candidate) = candidate else {
            continue;
        };
        presented = true;

        if let Some(secret) = match_secret(candidate, store) {
            return AuthDecision::Allow(AuthPath::Matched { slot, secret });
        }
    }

    if presented {
        AuthDecision::Reject(RejectReason::InvalidCredential)
    } else {
        AuthDecision::Reject(RejectReason::MissingCredential)
    }
}

fn match_secret(candidate: &str, store: &CredentialStore) -> Option<SecretKind> {
    if store
        .custom_key
        .as_ref()
        .is_some_and(|key| key.matches(candidate))
    {
        return Some(SecretKind::CustomKey);
    }
    if store
        .platform_token
        .as_ref()
        .is_some_and(|token| token.matches(candidate))
    {
        return Some(SecretKind::PlatformToken);
    }
    None
}

/// Authenticate using the headers of an incoming request
pub fn authenticate_headers(headers: &HeaderMap, store: &CredentialStore) -> AuthDecision {
    let api_key = headers.get(API_KEY_HEADER).and_then(|h| h.to_str().ok());
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    authenticate(api_key, authorization, store)
}

/// Authentication middleware
///
/// Rejects with 401 before the handler runs. On success the [`AuthPath`]
/// is added to the request extensions.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let decision = authenticate_headers(request.headers(), &state.credentials);

    match decision {
        AuthDecision::Allow(path) => {
            record_auth_decision("allow", &path.label());
            match path {
                AuthPath::OpenMode => {
                    warn!(auth_mode = "open", "Authentication skipped: no API_KEY or HF_TOKEN configured");
                }
                AuthPath::Matched { slot, secret } => {
                    debug!(
                        header = slot.as_str(),
                        secret = secret.as_str(),
                        "Request authenticated"
                    );
                }
            }
            request.extensions_mut().insert(path);
            Ok(next.run(request).await)
        }
        AuthDecision::Reject(reason) => {
            let label = match reason {
                RejectReason::MissingCredential => "missing",
                RejectReason::InvalidCredential => "invalid",
            };
            record_auth_decision("reject", label);
            let headers = request.headers();
            warn!(
                reason = label,
                x_api_key = headers.contains_key(API_KEY_HEADER),
                authorization = headers.contains_key(header::AUTHORIZATION),
                "Authentication rejected"
            );
            Err(AppError::Unauthorized)
        }
    }
}
