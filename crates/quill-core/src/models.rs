//! Domain models for accounts and posts
//!
//! - Role / RoleSet: the closed set of account roles
//! - UserAccount: stored account with credentials and profile
//! - Post / Comment: authored content with likes and comments
//!
//! Password hashes live on `UserAccount` but are never serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// Roles
// ============================================================================

/// Account role
///
/// - User: default for self-registered accounts
/// - Moderator: community moderation
/// - Admin: full administrative access
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Every role, in ascending order of privilege
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Returned when a stored or configured role name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

/// A fixed set of roles
///
/// Membership is decided by an exhaustive match on [`Role`], so adding a
/// role forces every role set to be reconsidered at compile time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet {
    user: bool,
    moderator: bool,
    admin: bool,
}

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet {
        user: false,
        moderator: false,
        admin: false,
    };

    pub const ALL: RoleSet = RoleSet {
        user: true,
        moderator: true,
        admin: true,
    };

    /// Set containing exactly one role
    pub const fn only(role: Role) -> Self {
        Self::EMPTY.with(role)
    }

    /// Copy of this set with `role` added
    pub const fn with(mut self, role: Role) -> Self {
        match role {
            Role::User => self.user = true,
            Role::Moderator => self.moderator = true,
            Role::Admin => self.admin = true,
        }
        self
    }

    pub const fn contains(&self, role: Role) -> bool {
        match role {
            Role::User => self.user,
            Role::Moderator => self.moderator,
            Role::Admin => self.admin,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, RoleSet::with)
    }
}

impl std::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Free-form profile data shown on author pages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,

    /// Unique handle, `[A-Za-z0-9_-]{3,30}`
    pub username: String,

    /// Unique, stored lowercase
    pub email: String,

    /// Argon2id PHC string; never leaves the server
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,

    /// Inactive accounts cannot log in and their tokens stop resolving
    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub profile: Profile,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl UserAccount {
    /// Create a new active account with the default role
    ///
    /// `password_hash` must already be hashed.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            role: Role::default(),
            is_active: true,
            profile: Profile::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Record a modification
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Convert to the public representation (no credential fields)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            is_active: self.is_active,
            profile: self.profile.clone(),
            created_at: self.created_at,
        }
    }
}

/// Account representation safe for API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Posts
// ============================================================================

/// Publication state of a post
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            other => Err(format!("Invalid status: {other}")),
        }
    }
}

/// A comment left on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Blog post
///
/// `author_id` is fixed when the post is created; updates never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: Vec<Uuid>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a post
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: Option<PostStatus>,
    pub featured_image: Option<String>,
}

/// Partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub featured_image: Option<String>,
}

impl Post {
    pub fn new(author_id: Uuid, fields: NewPost) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            content: fields.content,
            author_id,
            category: fields.category,
            tags: fields.tags,
            status: fields.status.unwrap_or_default(),
            featured_image: fields.featured_image,
            views: 0,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update
    pub fn apply(&mut self, update: PostUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(image) = update.featured_image {
            self.featured_image = Some(image);
        }
        self.updated_at = Utc::now();
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.likes.contains(&user_id)
    }

    /// Like or unlike on behalf of `user_id`
    ///
    /// Returns `true` when the post is now liked by that user.
    pub fn toggle_like(&mut self, user_id: Uuid) -> bool {
        if self.is_liked_by(user_id) {
            self.likes.retain(|id| *id != user_id);
            false
        } else {
            self.likes.push(user_id);
            true
        }
    }

    pub fn add_comment(&mut self, user_id: Uuid, content: String) -> &Comment {
        self.comments.push(Comment {
            id: Uuid::new_v4(),
            user_id,
            content,
            created_at: Utc::now(),
        });
        self.updated_at = Utc::now();
        &self.comments[self.comments.len() - 1]
    }
}

/// Listing filter; every present field must match
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category: Option<String>,
    pub author: Option<Uuid>,
    pub status: Option<PostStatus>,
    /// Case-insensitive substring of title or content
    pub search: Option<String>,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(category) = &self.category {
            if post.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(author) = self.author {
            if post.author_id != author {
                return false;
            }
        }
        if let Some(status) = self.status {
            if post.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !post.title.to_lowercase().contains(&needle)
                && !post.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post(author: Uuid) -> Post {
        Post::new(
            author,
            NewPost {
                title: "Borrow checker notes".to_string(),
                content: "Lifetimes are regions of code.".to_string(),
                category: Some("rust".to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert!("editor".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_role_set_membership() {
        let set = RoleSet::only(Role::Admin).with(Role::Moderator);
        assert!(set.contains(Role::Admin));
        assert!(set.contains(Role::Moderator));
        assert!(!set.contains(Role::User));

        assert!(RoleSet::EMPTY.is_empty());
        assert!(Role::ALL.iter().all(|r| RoleSet::ALL.contains(*r)));

        let collected: RoleSet = [Role::User, Role::Admin].into_iter().collect();
        assert_eq!(collected.to_string(), "user,admin");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let account = UserAccount::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "$argon2id$secret".to_string(),
        );

        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$argon2id$secret"));
        assert_eq!(account.role, Role::User);
        assert!(account.is_active);
    }

    #[test]
    fn test_toggle_like() {
        let mut post = sample_post(Uuid::new_v4());
        let reader = Uuid::new_v4();

        assert!(post.toggle_like(reader));
        assert!(post.is_liked_by(reader));
        assert_eq!(post.likes.len(), 1);

        assert!(!post.toggle_like(reader));
        assert!(post.likes.is_empty());
    }

    #[test]
    fn test_apply_keeps_author() {
        let author = Uuid::new_v4();
        let mut post = sample_post(author);

        post.apply(PostUpdate {
            title: Some("Updated".to_string()),
            status: Some(PostStatus::Published),
            ..Default::default()
        });

        assert_eq!(post.title, "Updated");
        assert_eq!(post.status, PostStatus::Published);
        assert_eq!(post.author_id, author);
        assert_eq!(post.category.as_deref(), Some("rust"));
    }

    #[test]
    fn test_filter_matches() {
        let author = Uuid::new_v4();
        let post = sample_post(author);

        assert!(PostFilter::default().matches(&post));
        assert!(PostFilter {
            search: Some("LIFETIMES".to_string()),
            ..Default::default()
        }
        .matches(&post));
        assert!(PostFilter {
            author: Some(author),
            category: Some("rust".to_string()),
            ..Default::default()
        }
        .matches(&post));
        assert!(!PostFilter {
            status: Some(PostStatus::Published),
            ..Default::default()
        }
        .matches(&post));
        assert!(!PostFilter {
            author: Some(Uuid::new_v4()),
            ..Default::default()
        }
        .matches(&post));
    }
}
