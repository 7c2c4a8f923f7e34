//! Application state management

use crate::auth::{
    AccessGate, AuthService, CredentialHasher, HasherConfig, IdentityResolver, PasswordError,
    TokenConfig, TokenService,
};
use axum::extract::FromRef;
use quill_core::{AppConfig, MemoryStore, PostStore, UserStore};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
///
/// Everything here is built once at startup. The auth core gets its
/// configuration as values; it never reads the environment.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Account storage
    pub users: Arc<dyn UserStore>,
    /// Post storage
    pub posts: Arc<dyn PostStore>,
    pub hasher: CredentialHasher,
    pub tokens: TokenService,
    pub gate: AccessGate,
}

impl AppState {
    /// Build state with the hashing cost taken from `config`
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
    ) -> Result<Self, PasswordError> {
        let hasher = CredentialHasher::new(&HasherConfig::from(&config.auth))?;
        Ok(Self::with_hasher(config, users, posts, hasher))
    }

    /// Build state around an existing hasher
    pub fn with_hasher(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
        hasher: CredentialHasher,
    ) -> Self {
        let tokens = TokenService::new(&TokenConfig::from(&config.auth));
        let gate = AccessGate::new(tokens.clone(), IdentityResolver::new(users.clone()));

        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            users,
            posts,
            hasher,
            tokens,
            gate,
        }
    }

    /// State backed by a fresh [`MemoryStore`]
    pub fn in_memory(config: AppConfig, hasher: CredentialHasher) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_hasher(config, store.clone(), store, hasher)
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.users.clone(), self.hasher.clone(), self.tokens.clone())
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}

impl FromRef<Arc<AppState>> for AccessGate {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.gate.clone()
    }
}
