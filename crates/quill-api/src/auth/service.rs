//! Authentication service layer
//!
//! Business logic for registration, login, profile updates, password
//! changes and administrative account status. Handlers stay thin and call
//! into this type; it talks to storage only through [`UserStore`].

use super::jwt::{IdentityClaim, TokenService};
use super::middleware::RequestIdentity;
use super::password::CredentialHasher;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use axum::http::HeaderMap;
use quill_core::validation::{is_valid_username, sanitize_string, validate_password};
use quill_core::{Profile, StoreError, UserAccount, UserPublic, UserStore, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"))]
    pub username: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Profile replacement request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub profile: Profile,
}

/// Password change request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

/// Account status change request (admin only)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountStatusRequest {
    pub is_active: bool,
}

/// Authentication response with token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: UserPublic,
}

/// Caller details recorded in audit events
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: CredentialHasher, tokens: TokenService) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// Register a new account with the default role and sign it in
    pub async fn register(
        &self,
        mut request: RegisterRequest,
        client: &ClientInfo,
    ) -> Result<AuthResponse, AppError> {
        request.username = request.username.trim().to_string();
        request.email = request.email.trim().to_lowercase();

        let mut errors = match request.validate() {
            Ok(()) => Vec::new(),
            Err(e) => match AppError::from(e) {
                AppError::Validation(fields) => fields,
                other => return Err(other),
            },
        };
        if !is_valid_username(&request.username) && !errors.iter().any(|e| e.field == "username") {
            errors.push(ValidationError::new(
                "username",
                "Username can only contain letters, numbers, underscores, and hyphens",
            ));
        }
        if let Err(e) = validate_password("password", &request.password) {
            errors.push(e);
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        let username = request.username;
        let email = request.email;

        if let Some(existing) = self
            .users
            .find_user_by_email_or_username(&email, &username)
            .await?
        {
            let reason = if existing.email == email {
                "Email already registered"
            } else {
                "Username already taken"
            };
            audit_log(&AuditEvent::RegistrationFailure {
                email,
                reason: reason.to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
            return Err(AppError::Conflict(reason.to_string()));
        }

        let password_hash = self.hasher.hash_blocking(request.password).await?;
        let account = UserAccount::new(username, email, password_hash)
            .with_profile(clean_profile(request.profile.unwrap_or_default()));

        self.users
            .insert_user(&account)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(field) if field.contains("username") => {
                    AppError::Conflict("Username already taken".to_string())
                }
                StoreError::Conflict(_) => AppError::Conflict("Email already registered".to_string()),
                other => other.into(),
            })?;

        let token = self.tokens.issue(&IdentityClaim::for_account(&account))?;

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: account.id,
            email: account.email.clone(),
            role: account.role.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });
        info!(username = %account.username, "New user registered");

        Ok(self.auth_response("User registered successfully", token, &account))
    }

    /// Check credentials and issue a token
    pub async fn login(
        &self,
        mut request: LoginRequest,
        client: &ClientInfo,
    ) -> Result<AuthResponse, AppError> {
        request.email = request.email.trim().to_lowercase();
        request.validate()?;
        let email = request.email;

        let failure = |reason: &str| {
            audit_log(&AuditEvent::LoginFailure {
                email: email.clone(),
                reason: reason.to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
        };

        let Some(account) = self.users.find_user_by_email(&email).await? else {
            failure("Unknown email");
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        };

        if !account.is_active {
            failure("Account is inactive");
            return Err(AppError::Unauthorized("Account is inactive".to_string()));
        }

        let matched = self
            .hasher
            .verify_blocking(request.password, account.password_hash.clone())
            .await;
        if !matched {
            failure("Invalid password");
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }

        let token = self.tokens.issue(&IdentityClaim::for_account(&account))?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: account.id,
            email: account.email.clone(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });
        info!(username = %account.username, "User logged in");

        Ok(self.auth_response("Login successful", token, &account))
    }

    /// Current account as resolved by the gate
    pub fn me(&self, identity: &RequestIdentity) -> UserPublic {
        identity.account.to_public()
    }

    /// Replace the caller's profile
    pub async fn update_profile(
        &self,
        identity: &RequestIdentity,
        profile: Profile,
    ) -> Result<UserPublic, AppError> {
        let mut account = self.load(identity.account_id).await?;
        account.profile = clean_profile(profile);
        account.touch();
        self.users.update_user(&account).await?;

        info!(username = %account.username, "User profile updated");
        Ok(account.to_public())
    }

    /// Read, verify the current password, then write the new hash
    pub async fn change_password(
        &self,
        identity: &RequestIdentity,
        request: ChangePasswordRequest,
        client: &ClientInfo,
    ) -> Result<(), AppError> {
        request.validate()?;
        validate_password("new_password", &request.new_password)?;

        let mut account = self.load(identity.account_id).await?;

        let matched = self
            .hasher
            .verify_blocking(request.current_password, account.password_hash.clone())
            .await;
        if !matched {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        account.password_hash = self.hasher.hash_blocking(request.new_password).await?;
        account.touch();
        self.users.update_user(&account).await?;

        audit_log(&AuditEvent::PasswordChange {
            user_id: account.id,
            email: account.email.clone(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });
        info!(username = %account.username, "Password changed");

        Ok(())
    }

    /// Activate or deactivate an account
    ///
    /// Tokens already issued to a deactivated account stop resolving on
    /// their next use.
    pub async fn set_active(
        &self,
        admin: &RequestIdentity,
        user_id: Uuid,
        is_active: bool,
        client: &ClientInfo,
    ) -> Result<UserPublic, AppError> {
        if user_id == admin.account_id && !is_active {
            return Err(AppError::BadRequest(
                "You cannot deactivate your own account".to_string(),
            ));
        }

        let mut account = self.load(user_id).await?;
        account.is_active = is_active;
        account.touch();
        self.users.update_user(&account).await?;

        audit_log(&AuditEvent::AccountStatusChanged {
            user_id: account.id,
            email: account.email.clone(),
            is_active,
            changed_by: admin.account_id,
            ip_address: client.ip_address.clone(),
        });

        Ok(account.to_public())
    }

    async fn load(&self, user_id: Uuid) -> Result<UserAccount, AppError> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    fn auth_response(&self, message: &str, token: String, account: &UserAccount) -> AuthResponse {
        AuthResponse {
            message: message.to_string(),
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_secs(),
            user: account.to_public(),
        }
    }
}

fn clean_profile(profile: Profile) -> Profile {
    let clean = |field: Option<String>| {
        field
            .map(|value| sanitize_string(&value))
            .filter(|value| !value.is_empty())
    };

    Profile {
        first_name: clean(profile.first_name),
        last_name: clean(profile.last_name),
        bio: clean(profile.bio),
        avatar: clean(profile.avatar),
    }
}
