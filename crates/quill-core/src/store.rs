//! Storage contracts for accounts and posts
//!
//! The HTTP layer only sees these traits. [`MemoryStore`] backs tests and
//! database-less development runs; [`crate::postgres::PgStore`] is the
//! production implementation.

use crate::models::{Comment, Post, PostFilter, UserAccount};
use crate::validation::Pagination;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Duplicate value: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Account persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find an account by identifier
    async fn find_user(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError>;

    /// Find an account by (lowercase) email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Find any account holding either the email or the username
    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<UserAccount>, StoreError>;

    /// Persist a new account; duplicate email or username is a `Conflict`
    async fn insert_user(&self, account: &UserAccount) -> Result<(), StoreError>;

    /// Save every field of an existing account
    async fn update_user(&self, account: &UserAccount) -> Result<(), StoreError>;

    /// Cheap connectivity probe for readiness checks
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    /// Whether the user likes the post after the toggle
    pub liked: bool,
    /// Like count after the toggle
    pub likes: usize,
}

/// Post persistence
///
/// Views, likes and comments only change through their own atomic
/// operations, so a stale copy saved with [`PostStore::update_post`] never
/// rolls them back.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    /// Newest first; returns the page and the total matching count
    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: &Pagination,
    ) -> Result<(Vec<Post>, u64), StoreError>;

    /// Save the editable fields of an existing post
    ///
    /// Title, content, category, tags, status, featured image and
    /// `updated_at` are written. Views, likes and comments keep their stored
    /// values.
    async fn update_post(&self, post: &Post) -> Result<(), StoreError>;

    /// Returns `false` when nothing was deleted
    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Atomically bump the view counter; `None` if the post is gone
    async fn increment_views(&self, id: Uuid) -> Result<Option<u64>, StoreError>;

    /// Atomically like or unlike on behalf of `user_id`; `None` if the post is gone
    async fn toggle_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<LikeToggle>, StoreError>;

    /// Atomically append a comment; returns every comment, oldest first,
    /// or `None` if the post is gone
    async fn add_comment(
        &self,
        id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Option<Vec<Comment>>, StoreError>;
}

/// In-memory store for tests and local development
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, UserAccount>>,
    posts: RwLock<HashMap<Uuid, Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }

    async fn insert_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == account.email) {
            return Err(StoreError::Conflict("email".to_string()));
        }
        if users.values().any(|u| u.username == account.username) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        users.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&account.id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("user {}", account.id))),
        }
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        self.posts.write().await.insert(post.id, post.clone());
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: &Pagination,
    ) -> Result<(Vec<Post>, u64), StoreError> {
        let posts = self.posts.read().await;
        let mut matching: Vec<&Post> = posts.values().filter(|p| filter.matches(p)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.skip())
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn update_post(&self, post: &Post) -> Result<(), StoreError> {
        let mut posts = self.posts.write().await;
        match posts.get_mut(&post.id) {
            Some(existing) => {
                existing.title = post.title.clone();
                existing.content = post.content.clone();
                existing.category = post.category.clone();
                existing.tags = post.tags.clone();
                existing.status = post.status;
                existing.featured_image = post.featured_image.clone();
                existing.updated_at = post.updated_at;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("post {}", post.id))),
        }
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.posts.write().await.remove(&id).is_some())
    }

    async fn increment_views(&self, id: Uuid) -> Result<Option<u64>, StoreError> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&id).map(|post| {
            post.views += 1;
            post.views
        }))
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<LikeToggle>, StoreError> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&id).map(|post| LikeToggle {
            liked: post.toggle_like(user_id),
            likes: post.likes.len(),
        }))
    }

    async fn add_comment(
        &self,
        id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Option<Vec<Comment>>, StoreError> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&id).map(|post| {
            post.add_comment(user_id, content.to_string());
            post.comments.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, PostStatus};

    fn account(username: &str, email: &str) -> UserAccount {
        UserAccount::new(username.to_string(), email.to_string(), "hash".to_string())
    }

    fn post(author: Uuid, title: &str) -> Post {
        Post::new(
            author,
            NewPost {
                title: title.to_string(),
                content: "Some content for the post".to_string(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let store = MemoryStore::new();
        let alice = account("alice", "alice@example.com");
        store.insert_user(&alice).await.unwrap();

        let found = store.find_user(alice.id).await.unwrap().unwrap();
        assert_eq!(found.username, "alice");

        let by_email = store.find_user_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(alice.id));

        assert!(store.find_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_user_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_user(&account("alice", "alice@example.com"))
            .await
            .unwrap();

        let same_email = store
            .insert_user(&account("alice2", "alice@example.com"))
            .await;
        assert!(matches!(same_email, Err(StoreError::Conflict(f)) if f == "email"));

        let same_username = store
            .insert_user(&account("alice", "other@example.com"))
            .await;
        assert!(matches!(same_username, Err(StoreError::Conflict(f)) if f == "username"));

        let either = store
            .find_user_by_email_or_username("nobody@example.com", "alice")
            .await
            .unwrap();
        assert!(either.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = MemoryStore::new();
        let result = store.update_user(&account("ghost", "ghost@example.com")).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_posts_paginates_newest_first() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();

        for i in 0..15 {
            let mut p = post(author, &format!("Post number {i}"));
            p.created_at += chrono::Duration::seconds(i);
            store.insert_post(&p).await.unwrap();
        }

        let (first, total) = store
            .list_posts(&PostFilter::default(), &Pagination::new(Some(1), Some(10)))
            .await
            .unwrap();
        assert_eq!(total, 15);
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].title, "Post number 14");

        let (second, _) = store
            .list_posts(&PostFilter::default(), &Pagination::new(Some(2), Some(10)))
            .await
            .unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[4].title, "Post number 0");
    }

    #[tokio::test]
    async fn test_list_posts_filters() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let mut published = post(author, "Published post");
        published.status = PostStatus::Published;
        store.insert_post(&published).await.unwrap();
        store.insert_post(&post(Uuid::new_v4(), "Draft post")).await.unwrap();

        let filter = PostFilter {
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        let (posts, total) = store
            .list_posts(&filter, &Pagination::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].id, published.id);
    }

    #[tokio::test]
    async fn test_views_and_delete() {
        let store = MemoryStore::new();
        let p = post(Uuid::new_v4(), "Counting views");
        store.insert_post(&p).await.unwrap();

        assert_eq!(store.increment_views(p.id).await.unwrap(), Some(1));
        assert_eq!(store.increment_views(p.id).await.unwrap(), Some(2));

        assert!(store.delete_post(p.id).await.unwrap());
        assert!(!store.delete_post(p.id).await.unwrap());
        assert_eq!(store.increment_views(p.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_keeps_counters_from_stale_copy() {
        let store = MemoryStore::new();
        let p = post(Uuid::new_v4(), "Original title");
        store.insert_post(&p).await.unwrap();
        let mut stale = store.find_post(p.id).await.unwrap().unwrap();

        for _ in 0..3 {
            store.increment_views(p.id).await.unwrap();
        }
        let reader = Uuid::new_v4();
        store.toggle_like(p.id, reader).await.unwrap();
        store
            .add_comment(p.id, reader, "First comment")
            .await
            .unwrap();

        stale.title = "Edited title".to_string();
        store.update_post(&stale).await.unwrap();

        let saved = store.find_post(p.id).await.unwrap().unwrap();
        assert_eq!(saved.title, "Edited title");
        assert_eq!(saved.views, 3);
        assert_eq!(saved.likes, vec![reader]);
        assert_eq!(saved.comments.len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_like_and_add_comment() {
        let store = MemoryStore::new();
        let p = post(Uuid::new_v4(), "Likeable post");
        store.insert_post(&p).await.unwrap();
        let reader = Uuid::new_v4();

        let liked = store.toggle_like(p.id, reader).await.unwrap();
        assert_eq!(liked, Some(LikeToggle { liked: true, likes: 1 }));
        let unliked = store.toggle_like(p.id, reader).await.unwrap();
        assert_eq!(unliked, Some(LikeToggle { liked: false, likes: 0 }));

        store.add_comment(p.id, reader, "One").await.unwrap();
        let comments = store
            .add_comment(p.id, reader, "Two")
            .await
            .unwrap()
            .unwrap();
        let contents: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, ["One", "Two"]);

        let missing = Uuid::new_v4();
        assert_eq!(store.toggle_like(missing, reader).await.unwrap(), None);
        assert!(store
            .add_comment(missing, reader, "Nowhere")
            .await
            .unwrap()
            .is_none());
    }
}
