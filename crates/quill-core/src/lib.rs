//! Quill Core - Domain models, configuration, and storage contracts
//!
//! This crate defines the shared building blocks of the Quill blog backend:
//! - Account and post models, roles and role sets
//! - Configuration management
//! - Input validation helpers
//! - Storage traits with in-memory and PostgreSQL implementations

pub mod config;
pub mod models;
pub mod postgres;
pub mod store;
pub mod validation;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig,
    DEFAULT_JWT_SECRET, DEFAULT_TOKEN_TTL_SECS,
};
pub use models::{
    Comment, NewPost, Post, PostFilter, PostStatus, PostUpdate, Profile, Role, RoleSet,
    UserAccount, UserPublic,
};
pub use postgres::PgStore;
pub use store::{LikeToggle, MemoryStore, PostStore, StoreError, UserStore};
pub use validation::{Pagination, PasswordStrength, ValidationError};
