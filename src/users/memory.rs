use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::{
    repo::{StoreError, StoreResult, UserStore, EMAIL_UNIQUE_CONSTRAINT},
    repo_types::{NewUser, User},
};

/// In-process store with the same contract as the postgres gateway.
///
/// Rows are kept in insertion order; the write lock makes the email
/// uniqueness check and the write a single step.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn email_conflict() -> StoreError {
    StoreError::ConstraintViolation {
        constraint: Some(EMAIL_UNIQUE_CONSTRAINT.into()),
    }
}

fn matches(user: &User, term: &str) -> bool {
    let needle = term.to_lowercase();
    user.name.to_lowercase().contains(&needle)
        || user.email.to_lowercase().contains(&needle)
        || user.phone.contains(term)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.rows.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self, search: Option<&str>) -> StoreResult<Vec<User>> {
        let rows = self.rows.read().await;
        // Newest insert first, then a stable sort keeps that order for equal timestamps.
        let mut out: Vec<User> = rows
            .iter()
            .rev()
            .filter(|u| search.map_or(true, |term| matches(u, term)))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|u| u.email == user.email) {
            return Err(email_conflict());
        }

        let now = OffsetDateTime::now_utc();
        let stored = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            phone: user.phone,
            created_at: now,
            updated_at: now,
        };
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: Uuid, user: NewUser) -> StoreResult<User> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|u| u.id != id && u.email == user.email) {
            return Err(email_conflict());
        }

        let row = rows.iter_mut().find(|u| u.id == id).ok_or(StoreError::NotFound)?;
        row.name = user.name;
        row.email = user.email;
        row.phone = user.phone;
        row.updated_at = OffsetDateTime::now_utc().max(row.updated_at + Duration::microseconds(1));
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|u| u.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
