use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User};

/// Name of the storage-level uniqueness constraint on `users.email`.
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("constraint violated: {}", .constraint.as_deref().unwrap_or("unknown"))]
    ConstraintViolation { constraint: Option<String> },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_email_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::ConstraintViolation { constraint: Some(c) } if c == EMAIL_UNIQUE_CONSTRAINT
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence gateway for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// All users newest first, optionally filtered by a substring of name, email or phone.
    async fn list(&self, search: Option<&str>) -> StoreResult<Vec<User>>;

    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn update(&self, id: Uuid, user: NewUser) -> StoreResult<User>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// Escapes LIKE wildcards and wraps the term for a "contains" match.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::ConstraintViolation {
                constraint: db.constraint().map(str::to_string),
            };
        }
    }
    StoreError::Database(e)
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self, search: Option<&str>) -> StoreResult<Vec<User>> {
        let rows = match search {
            Some(term) => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, name, email, phone, created_at, updated_at
                    FROM users
                    WHERE name ILIKE $1 OR email ILIKE $1 OR phone LIKE $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(contains_pattern(term))
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, name, email, phone, created_at, updated_at
                    FROM users
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.db)
                .await?
            }
        };
        Ok(rows)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let now = OffsetDateTime::now_utc();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, name, email, phone, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_error)?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, user: NewUser) -> StoreResult<User> {
        // GREATEST keeps updated_at strictly increasing even if the clock stalls.
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2,
                email = $3,
                phone = $4,
                updated_at = GREATEST(now(), updated_at + interval '1 microsecond')
            WHERE id = $1
            RETURNING id, name, email, phone, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .fetch_optional(&self.db)
        .await
        .map_err(map_write_error)?;
        user.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
