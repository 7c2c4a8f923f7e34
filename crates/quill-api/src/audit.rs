//! Security audit logging for authentication events
//!
//! Structured records for logins, registrations, password changes, gate
//! rejections and administrative actions.
//!
//! All audit events are logged at INFO level with the "audit" target so they
//! can be filtered and routed separately from application logs.
//!
//! ```ignore
//! use quill_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: account.id,
//!     email: account.email.clone(),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: None,
//! });
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful user login
    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful user registration
    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        role: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Password change
    PasswordChange {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Authenticated caller without a permitted role
    AccessDenied {
        user_id: Option<Uuid>,
        email: Option<String>,
        resource: String,
        required_role: Option<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Invalid, expired or unresolvable token on a protected route
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Account activated or deactivated by an administrator
    AccountStatusChanged {
        user_id: Uuid,
        email: String,
        is_active: bool,
        changed_by: Uuid,
        ip_address: Option<String>,
    },

    /// Post removed by someone other than its author
    PostDeletedByOverride {
        post_id: Uuid,
        author_id: Uuid,
        deleted_by: Uuid,
        role: String,
        ip_address: Option<String>,
    },
}

/// Log a security audit event with structured fields
///
/// The full event is also attached as JSON in the `event` field. Example:
///
/// ```json
/// {
///   "event_type": "login_success",
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "email": "user@example.com",
///   "ip_address": "192.168.1.1",
///   "user_agent": "Mozilla/5.0..."
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::RegistrationSuccess {
            user_id,
            email,
            role,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                role = %role,
                ip_address = ?ip_address,
                "Registration successful"
            );
        }
        AuditEvent::RegistrationFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "Registration failed"
            );
        }
        AuditEvent::PasswordChange {
            user_id,
            email,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "Password changed"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            email,
            resource,
            required_role,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = ?user_id,
                email = ?email,
                resource = %resource,
                required_role = ?required_role,
                ip_address = ?ip_address,
                "Access denied"
            );
        }
        AuditEvent::InvalidToken {
            ip_address, reason, ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                ip_address = ?ip_address,
                reason = %reason,
                "Invalid token"
            );
        }
        AuditEvent::AccountStatusChanged {
            user_id,
            email,
            is_active,
            changed_by,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                is_active = %is_active,
                changed_by = %changed_by,
                ip_address = ?ip_address,
                "Account status changed"
            );
        }
        AuditEvent::PostDeletedByOverride {
            post_id,
            author_id,
            deleted_by,
            role,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                post_id = %post_id,
                author_id = %author_id,
                deleted_by = %deleted_by,
                role = %role,
                ip_address = ?ip_address,
                "Post deleted by role override"
            );
        }
    }
}

/// Extract the client IP from proxy headers
///
/// Checks X-Forwarded-For (first hop), then X-Real-IP. Connection info is
/// not available here.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn test_status_change_serialization() {
        let event = AuditEvent::AccountStatusChanged {
            user_id: Uuid::new_v4(),
            email: "target@example.com".to_string(),
            is_active: false,
            changed_by: Uuid::new_v4(),
            ip_address: None,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "account_status_changed");
        assert_eq!(value["is_active"], false);
    }

    #[test]
    fn test_audit_log_every_variant() {
        let id = Uuid::new_v4();
        let events = vec![
            AuditEvent::LoginFailure {
                email: "test@example.com".to_string(),
                reason: "Invalid password".to_string(),
                ip_address: Some("192.168.1.1".to_string()),
                user_agent: None,
            },
            AuditEvent::RegistrationSuccess {
                user_id: id,
                email: "new@example.com".to_string(),
                role: "user".to_string(),
                ip_address: None,
                user_agent: None,
            },
            AuditEvent::RegistrationFailure {
                email: "dup@example.com".to_string(),
                reason: "Email already registered".to_string(),
                ip_address: None,
                user_agent: None,
            },
            AuditEvent::PasswordChange {
                user_id: id,
                email: "a@example.com".to_string(),
                ip_address: None,
                user_agent: None,
            },
            AuditEvent::AccessDenied {
                user_id: Some(id),
                email: None,
                resource: "roles:admin".to_string(),
                required_role: Some("admin".to_string()),
                ip_address: None,
                user_agent: None,
            },
            AuditEvent::InvalidToken {
                ip_address: None,
                user_agent: None,
                reason: "Token has expired".to_string(),
            },
            AuditEvent::PostDeletedByOverride {
                post_id: Uuid::new_v4(),
                author_id: Uuid::new_v4(),
                deleted_by: id,
                role: "admin".to_string(),
                ip_address: None,
            },
        ];

        for event in &events {
            audit_log(event);
        }
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();

        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}
