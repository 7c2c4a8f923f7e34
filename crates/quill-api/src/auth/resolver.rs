//! Maps a verified token claim onto the live account record

use super::jwt::IdentityClaim;
use quill_core::{StoreError, UserAccount, UserStore};
use std::sync::Arc;
use thiserror::Error;

/// Resolution failures
///
/// The access gate folds all of these into one unauthenticated outcome.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("User not found")]
    UserNotFound,

    #[error("User account is inactive")]
    AccountInactive,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Loads the current account for a claim
///
/// One store lookup per call and no caching. The returned account reflects
/// storage now; only the identifier is taken from the claim.
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn resolve(&self, claim: &IdentityClaim) -> Result<UserAccount, ResolveError> {
        let account = self
            .users
            .find_user(claim.user_id)
            .await?
            .ok_or(ResolveError::UserNotFound)?;

        if !account.is_active {
            return Err(ResolveError::AccountInactive);
        }

        Ok(account)
    }
}
