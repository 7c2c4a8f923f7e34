//! JWT token generation and validation
//!
//! Tokens are HMAC-SHA256 signed and stateless: validity depends only on
//! the signature and the embedded expiry at verification time. Changing the
//! secret invalidates every token issued before the change.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use quill_core::{AuthConfig, Role, UserAccount, DEFAULT_JWT_SECRET, DEFAULT_TOKEN_TTL_SECS};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity carried inside a token
///
/// Fixed at issuance. Role and email may drift from the stored account
/// afterwards; only `user_id` is trusted when resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl IdentityClaim {
    /// Claim describing the account as stored right now
    pub fn for_account(account: &UserAccount) -> Self {
        Self {
            user_id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// JWT Claims structure as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// Token issuer
    iss: String,
    /// Subject - user ID
    sub: Uuid,
    /// Issued at timestamp (Unix epoch)
    iat: i64,
    /// Expiration timestamp (Unix epoch)
    exp: i64,
    username: String,
    email: String,
    role: Role,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    /// Bad signature, wrong issuer or malformed structure
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,
}

/// Token signing configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token lifetime in seconds (default: one week)
    pub ttl_secs: u64,
    /// Token issuer identifier
    pub issuer: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_JWT_SECRET.to_string(),
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            issuer: "quill".to_string(),
        }
    }
}

impl From<&AuthConfig> for TokenConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            ttl_secs: config.token_ttl_secs,
            issuer: config.jwt_issuer.clone(),
        }
    }
}

/// Issues and verifies signed bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl_secs: u64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared in `verify_at` without leeway
        validation.validate_exp = false;
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            ttl_secs: config.ttl_secs,
        }
    }

    /// Token lifetime in seconds
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Sign a claim that expires one TTL from now
    pub fn issue(&self, claim: &IdentityClaim) -> Result<String, TokenError> {
        self.issue_at(claim, Utc::now())
    }

    /// Sign a claim as if issued at `now`
    pub fn issue_at(&self, claim: &IdentityClaim, now: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: claim.user_id,
            iat,
            exp: iat.saturating_add(ttl),
            username: claim.username.clone(),
            email: claim.email.clone(),
            role: claim.role,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify signature and expiry, returning the embedded claim
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify as of `now`; a token is still valid at the exact expiry second
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaim, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::InvalidToken)?;
        let claims = data.claims;

        if now.timestamp() > claims.exp {
            return Err(TokenError::ExpiredToken);
        }

        Ok(IdentityClaim {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claim() -> IdentityClaim {
        IdentityClaim {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: Role::User,
        }
    }

    fn service_with(secret: &str, ttl_secs: u64) -> TokenService {
        TokenService::new(&TokenConfig {
            secret: secret.to_string(),
            ttl_secs,
            ..Default::default()
        })
    }

    #[test]
    fn test_issue_and_verify_token() {
        let service = TokenService::new(&TokenConfig::default());
        let claim = claim();

        let token = service.issue(&claim).expect("Failed to issue token");
        let verified = service.verify(&token).expect("Failed to verify token");

        assert_eq!(verified, claim);
    }

    #[test]
    fn test_expiry_boundary() {
        let service = service_with("secret", 60);
        let issued = Utc::now();
        let token = service.issue_at(&claim(), issued).unwrap();

        assert!(service.verify_at(&token, issued).is_ok());
        assert!(service
            .verify_at(&token, issued + Duration::seconds(60))
            .is_ok());
        assert!(matches!(
            service.verify_at(&token, issued + Duration::seconds(61)),
            Err(TokenError::ExpiredToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let service = TokenService::new(&TokenConfig::default());
        let token = service
            .issue_at(&claim(), Utc::now() - Duration::days(8))
            .unwrap();

        assert!(matches!(service.verify(&token), Err(TokenError::ExpiredToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let token = service_with("secret1", 3600).issue(&claim()).unwrap();
        let result = service_with("secret2", 3600).verify(&token);

        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret_wins_over_expiry() {
        let token = service_with("secret1", 60)
            .issue_at(&claim(), Utc::now() - Duration::hours(1))
            .unwrap();
        let result = service_with("secret2", 60).verify(&token);

        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_malformed_tokens() {
        let service = TokenService::new(&TokenConfig::default());

        for token in ["", "invalid.token.here", "not-a-jwt", "a.b"] {
            assert!(
                matches!(service.verify(token), Err(TokenError::InvalidToken)),
                "token: {token:?}"
            );
        }
    }

    #[test]
    fn test_tampered_payload() {
        let service = TokenService::new(&TokenConfig::default());
        let token = service.issue(&claim()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let other = service
            .issue(&IdentityClaim {
                role: Role::Admin,
                ..claim()
            })
            .unwrap();
        parts[1] = other.split('.').nth(1).unwrap().to_string();

        assert!(matches!(
            service.verify(&parts.join(".")),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let other = TokenService::new(&TokenConfig {
            issuer: "someone-else".to_string(),
            ..Default::default()
        });
        let token = other.issue(&claim()).unwrap();
        let service = TokenService::new(&TokenConfig::default());

        assert!(matches!(service.verify(&token), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_missing_expiry_is_invalid() {
        #[derive(Serialize)]
        struct NoExpiry {
            iss: String,
            sub: Uuid,
            username: String,
            email: String,
            role: Role,
        }

        let config = TokenConfig::default();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoExpiry {
                iss: config.issuer.clone(),
                sub: Uuid::new_v4(),
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                role: Role::User,
            },
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        let result = TokenService::new(&config).verify(&token);
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_claim_for_account() {
        let account = UserAccount::new(
            "carol".to_string(),
            "carol@example.com".to_string(),
            "hash".to_string(),
        )
        .with_role(Role::Moderator);

        let claim = IdentityClaim::for_account(&account);
        assert_eq!(claim.user_id, account.id);
        assert_eq!(claim.username, "carol");
        assert_eq!(claim.role, Role::Moderator);
    }
}
