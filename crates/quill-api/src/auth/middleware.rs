//! Access gate: request-level authentication and role checks
//!
//! Three modes over the `Authorization` header:
//!
//! - Required: no credential or a failed credential is rejected with 401
//! - Required + roles: as Required, then 403 when the role is not permitted
//! - Optional: any failure continues anonymously, logged at WARN
//!
//! The resolved identity is inserted into request extensions once and read
//! by handlers through [`CurrentUser`] / [`MaybeUser`] or `Extension`.
use super::jwt::{TokenError, TokenService};
use super::resolver::{IdentityResolver, ResolveError};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use quill_core::{RoleSet, UserAccount};
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Identity attached to one in-flight request
///
/// The account was active when resolved; it is not re-checked later in the
/// same request.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub account_id: Uuid,
    pub account: UserAccount,
}

impl From<UserAccount> for RequestIdentity {
    fn from(account: UserAccount) -> Self {
        Self {
            account_id: account.id,
            account,
        }
    }
}

/// Why a presented credential was not accepted
#[derive(Debug, Error)]
pub enum CredentialFailure {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl CredentialFailure {
    /// Reason shown to the caller
    ///
    /// Unknown and inactive accounts read the same as a bad token; the audit
    /// log keeps the distinct reason.
    pub fn public_reason(&self) -> &'static str {
        match self {
            CredentialFailure::Token(_)
            | CredentialFailure::Resolve(ResolveError::UserNotFound)
            | CredentialFailure::Resolve(ResolveError::AccountInactive) => {
                "Invalid or expired token"
            }
            CredentialFailure::Resolve(ResolveError::Store(_)) => "Authentication failed",
        }
    }
}

/// Why optional authentication continued anonymously
#[derive(Debug)]
pub enum GateFallback {
    /// No usable bearer credential on the request
    Anonymous,
    /// A credential was presented and rejected
    Rejected(CredentialFailure),
}

/// Gate rejections; the only two outward kinds are 401 and 403
#[derive(Debug, Error)]
pub enum GateRejection {
    #[error("No token provided")]
    MissingCredential,

    #[error("Authentication failed: {0}")]
    Unauthenticated(#[from] CredentialFailure),

    #[error("Insufficient permissions")]
    Forbidden,
}

impl GateRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            GateRejection::MissingCredential | GateRejection::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            GateRejection::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match &self {
            GateRejection::MissingCredential => ("Authentication required", "No token provided"),
            GateRejection::Unauthenticated(failure) => {
                ("Authentication failed", failure.public_reason())
            }
            GateRejection::Forbidden => (
                "Authorization failed",
                "You do not have permission to perform this action",
            ),
        };

        let body = serde_json::json!({
            "error": error,
            "message": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

/// Extract the token from `Authorization: Bearer <token>`
///
/// Anything else, including extra spaces or another scheme, is treated as
/// no credential.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');

    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Token service and identity resolver wired together
#[derive(Clone)]
pub struct AccessGate {
    tokens: TokenService,
    resolver: IdentityResolver,
}

impl AccessGate {
    pub fn new(tokens: TokenService, resolver: IdentityResolver) -> Self {
        Self { tokens, resolver }
    }

    /// Verify a raw token and load its live account
    pub async fn resolve_token(&self, token: &str) -> Result<RequestIdentity, CredentialFailure> {
        let claim = self.tokens.verify(token)?;
        let account = self.resolver.resolve(&claim).await?;
        Ok(RequestIdentity::from(account))
    }

    /// Required mode
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<RequestIdentity, GateRejection> {
        let token = extract_bearer(headers).ok_or(GateRejection::MissingCredential)?;

        match self.resolve_token(token).await {
            Ok(identity) => {
                debug!(user_id = %identity.account_id, "Request authenticated");
                Ok(identity)
            }
            Err(failure) => {
                if let CredentialFailure::Resolve(ResolveError::Store(e)) = &failure {
                    error!(error = %e, "Account lookup failed during authentication");
                }
                audit_log(&AuditEvent::InvalidToken {
                    ip_address: extract_ip_address(headers),
                    user_agent: extract_user_agent(headers),
                    reason: failure.to_string(),
                });
                Err(GateRejection::Unauthenticated(failure))
            }
        }
    }

    /// Required mode restricted to `allowed` roles
    ///
    /// Authentication runs first, so an anonymous caller is always told 401.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        allowed: RoleSet,
    ) -> Result<RequestIdentity, GateRejection> {
        let identity = self.authenticate(headers).await?;
        ensure_role(&identity, allowed, headers)?;
        Ok(identity)
    }

    /// Optional mode, with the fallback reason kept visible
    pub async fn try_identify(&self, headers: &HeaderMap) -> Result<RequestIdentity, GateFallback> {
        let token = extract_bearer(headers).ok_or(GateFallback::Anonymous)?;
        self.resolve_token(token)
            .await
            .map_err(GateFallback::Rejected)
    }

    /// Optional mode; never fails
    pub async fn identify(&self, headers: &HeaderMap) -> Option<RequestIdentity> {
        match self.try_identify(headers).await {
            Ok(identity) => Some(identity),
            Err(GateFallback::Anonymous) => None,
            Err(GateFallback::Rejected(reason)) => {
                warn!(reason = %reason, "Ignoring credential on optional route");
                None
            }
        }
    }
}

fn ensure_role(
    identity: &RequestIdentity,
    allowed: RoleSet,
    headers: &HeaderMap,
) -> Result<(), GateRejection> {
    if allowed.contains(identity.account.role) {
        return Ok(());
    }

    audit_log(&AuditEvent::AccessDenied {
        user_id: Some(identity.account_id),
        email: Some(identity.account.email.clone()),
        resource: format!("roles:{allowed}"),
        required_role: Some(allowed.to_string()),
        ip_address: extract_ip_address(headers),
        user_agent: extract_user_agent(headers),
    });

    Err(GateRejection::Forbidden)
}

/// Middleware requiring a valid credential
///
/// ```ignore
/// let protected = Router::new()
///     .route("/auth/me", get(me_handler))
///     .route_layer(middleware::from_fn_with_state(gate, require_auth));
/// ```
pub async fn require_auth(
    State(gate): State<AccessGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let identity = gate.authenticate(request.headers()).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Middleware attaching an identity when one can be resolved
pub async fn optional_auth(
    State(gate): State<AccessGate>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(identity) = gate.identify(request.headers()).await {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

/// Middleware requiring a valid credential whose role is in the set
///
/// ```ignore
/// let admin = Router::new()
///     .route("/admin/users/:id/status", put(set_status))
///     .route_layer(middleware::from_fn_with_state(
///         (gate, RoleSet::only(Role::Admin)),
///         require_roles,
///     ));
/// ```
pub async fn require_roles(
    State((gate, allowed)): State<(AccessGate, RoleSet)>,
    mut request: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let identity = match request.extensions().get::<RequestIdentity>() {
        Some(identity) => {
            ensure_role(identity, allowed, request.headers())?;
            identity.clone()
        }
        None => gate.authorize(request.headers(), allowed).await?,
    };
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extractor for handlers that need an authenticated caller
///
/// Reuses an identity a middleware already attached, otherwise runs the
/// gate in Required mode.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub RequestIdentity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AccessGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<RequestIdentity>() {
            return Ok(Self(identity.clone()));
        }

        let gate = AccessGate::from_ref(state);
        let identity = gate.authenticate(&parts.headers).await?;
        parts.extensions.insert(identity.clone());
        Ok(Self(identity))
    }
}

/// Extractor for handlers that serve both known and anonymous callers
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<RequestIdentity>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AccessGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<RequestIdentity>() {
            return Ok(Self(Some(identity.clone())));
        }

        let gate = AccessGate::from_ref(state);
        let identity = gate.identify(&parts.headers).await;
        if let Some(identity) = &identity {
            parts.extensions.insert(identity.clone());
        }
        Ok(Self(identity))
    }
}
