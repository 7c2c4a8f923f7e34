//! Input validation helpers
//!
//! Shared by the HTTP layer for registration, posts and listing parameters.

use serde::Serialize;
use thiserror::Error;

const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_SANITIZED_LENGTH: usize = 1000;
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// `local@domain.tld` with no whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// 3 to 30 characters of letters, digits, `_` or `-`
pub fn is_valid_username(username: &str) -> bool {
    (3..=30).contains(&username.chars().count())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Password strength report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    /// Meets the minimum length, the only hard requirement
    pub is_valid: bool,
    pub has_upper_case: bool,
    pub has_lower_case: bool,
    pub has_numbers: bool,
    pub has_special_char: bool,
    pub strength: StrengthLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthLevel {
    Weak,
    Medium,
    Strong,
}

/// Score a password over length, upper, lower, digit and special characters
pub fn password_strength(password: &str) -> PasswordStrength {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let has_upper_case = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower_case = password.chars().any(|c| c.is_ascii_lowercase());
    let has_numbers = password.chars().any(|c| c.is_ascii_digit());
    let has_special_char = password.chars().any(|c| SPECIAL_CHARS.contains(c));

    let score = [
        long_enough,
        has_upper_case,
        has_lower_case,
        has_numbers,
        has_special_char,
    ]
    .iter()
    .filter(|passed| **passed)
    .count();

    let strength = if score >= 4 {
        StrengthLevel::Strong
    } else if score >= 2 {
        StrengthLevel::Medium
    } else {
        StrengthLevel::Weak
    };

    PasswordStrength {
        is_valid: long_enough,
        has_upper_case,
        has_lower_case,
        has_numbers,
        has_special_char,
        strength,
    }
}

/// Reject passwords below the minimum length
pub fn validate_password(field: &str, password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new(field, "Password is required"));
    }
    if !password_strength(password).is_valid {
        return Err(ValidationError::new(
            field,
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters long"),
        ));
    }
    Ok(())
}

/// Trim, drop angle brackets and cap the length
pub fn sanitize_string(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(MAX_SANITIZED_LENGTH)
        .collect()
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Page defaults to 1; limit defaults to 10 and is clamped to 1..=100
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .filter(|l| *l != 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        Self { page, limit }
    }

    /// Number of items before this page
    pub fn skip(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    /// Page count for `total` items
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}
