//! Authentication and authorization module
//!
//! - Password hashing with Argon2id
//! - Token issuance and verification (HS256 JWT)
//! - Identity resolution against the account store
//! - Access gate middleware and extractors
//! - Ownership policy for post mutations
//! - Authentication service for account management

pub mod jwt;
pub mod middleware;
pub mod ownership;
pub mod password;
pub mod resolver;
pub mod service;

pub use jwt::{IdentityClaim, TokenConfig, TokenError, TokenService};
pub use middleware::{
    extract_bearer, optional_auth, require_auth, require_roles, AccessGate, CredentialFailure,
    CurrentUser, GateFallback, GateRejection, MaybeUser, RequestIdentity,
};
pub use ownership::{can_mutate, Actor, Owned, DELETE_OVERRIDE, EDIT_OVERRIDE};
pub use password::{CredentialHasher, HasherConfig, PasswordError};
pub use resolver::{IdentityResolver, ResolveError};
pub use service::{
    AccountStatusRequest, AuthResponse, AuthService, ChangePasswordRequest, ClientInfo,
    LoginRequest, RegisterRequest, UpdateProfileRequest,
};
