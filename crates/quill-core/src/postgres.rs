//! PostgreSQL store
//!
//! Accounts, posts and comments using SQLx and PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Comment, Post, PostFilter, PostStatus, Profile, Role, UserAccount};
use crate::store::{LikeToggle, PostStore, StoreError, UserStore};
use crate::validation::Pagination;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        profile JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        author_id UUID NOT NULL REFERENCES users(id),
        category TEXT,
        tags TEXT[] NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'draft',
        featured_image TEXT,
        views BIGINT NOT NULL DEFAULT 0,
        likes UUID[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS post_comments (
        id UUID PRIMARY KEY,
        post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users(id),
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS post_comments_post_idx ON post_comments (post_id)",
];

const POST_COLUMNS: &str = "id, title, content, author_id, category, tags, status, \
                            featured_image, views, likes, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, profile, created_at, updated_at";

/// PostgreSQL-backed account and post store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        tracing::info!("Database schema ready");
        Ok(())
    }

    async fn comments_for(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Comment>>, StoreError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT id, post_id, user_id, content, created_at FROM post_comments \
             WHERE post_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for row in rows {
            grouped.entry(row.post_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<Post>, StoreError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut comments = self.comments_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let post_comments = comments.remove(&row.id).unwrap_or_default();
                row.into_post(post_comments)
            })
            .collect())
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    profile: Json<Profile>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        let role = row.role.parse::<Role>().unwrap_or_else(|e| {
            tracing::warn!(user_id = %row.id, error = %e, "Unknown stored role, using default");
            Role::default()
        });

        UserAccount {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
            profile: row.profile.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Post row from database
#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    content: String,
    author_id: Uuid,
    category: Option<String>,
    tags: Vec<String>,
    status: String,
    featured_image: Option<String>,
    views: i64,
    likes: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self, comments: Vec<Comment>) -> Post {
        Post {
            id: self.id,
            title: self.title,
            content: self.content,
            author_id: self.author_id,
            category: self.category,
            tags: self.tags,
            status: self.status.parse().unwrap_or(PostStatus::Draft),
            featured_image: self.featured_image,
            views: self.views.max(0) as u64,
            likes: self.likes,
            comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Comment row from database
#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Escape LIKE wildcards so search text matches literally
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    builder.push(" WHERE TRUE");

    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(author) = filter.author {
        builder.push(" AND author_id = ").push_bind(author);
    }
    if let Some(status) = filter.status {
        builder
            .push(" AND status = ")
            .push_bind(status.as_str().to_string());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserAccount::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserAccount::from))
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $2 LIMIT 1"
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserAccount::from))
    }

    async fn insert_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, is_active, profile, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(Json(&account.profile))
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, role = $5,
                is_active = $6, profile = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(Json(&account.profile))
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", account.id)));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, content, author_id, category, tags, status,
                               featured_image, views, likes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.author_id)
        .bind(&post.category)
        .bind(&post.tags)
        .bind(post.status.as_str())
        .bind(&post.featured_image)
        .bind(post.views as i64)
        .bind(&post.likes)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: &Pagination,
    ) -> Result<(Vec<Post>, u64), StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {POST_COLUMNS} FROM posts"));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.skip() as i64);

        let rows = select
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((self.hydrate(rows).await?, total.max(0) as u64))
    }

    async fn update_post(&self, post: &Post) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $2, content = $3, category = $4, tags = $5, status = $6,
                featured_image = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.category)
        .bind(&post.tags)
        .bind(post.status.as_str())
        .bind(&post.featured_image)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("post {}", post.id)));
        }
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_views(&self, id: Uuid) -> Result<Option<u64>, StoreError> {
        let views: Option<i64> =
            sqlx::query_scalar("UPDATE posts SET views = views + 1 WHERE id = $1 RETURNING views")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(views.map(|v| v.max(0) as u64))
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<LikeToggle>, StoreError> {
        let row: Option<(bool, i32)> = sqlx::query_as(
            r#"
            UPDATE posts
            SET likes = CASE
                WHEN $2::uuid = ANY(likes) THEN array_remove(likes, $2::uuid)
                ELSE array_append(likes, $2::uuid)
            END
            WHERE id = $1
            RETURNING $2::uuid = ANY(likes), cardinality(likes)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(liked, likes)| LikeToggle {
            liked,
            likes: likes.max(0) as usize,
        }))
    }

    async fn add_comment(
        &self,
        id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Option<Vec<Comment>>, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Holds the post row lock until commit
        let touched = sqlx::query("UPDATE posts SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO post_comments (id, post_id, user_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(user_id)
        .bind(content)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut comments = self.comments_for(&[id]).await?;
        Ok(Some(comments.remove(&id).unwrap_or_default()))
    }
}
