use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::users::{
    dto::DeleteResponse,
    repo::{StoreError, UserStore},
    repo_types::User,
    validation::{validate, UserFields},
};

pub async fn list_users(store: &dyn UserStore, search: Option<&str>) -> Result<Vec<User>> {
    store
        .list(search)
        .await
        .map_err(AppError::internal("Failed to fetch users"))
}

pub async fn get_user(store: &dyn UserStore, id: Uuid) -> Result<User> {
    store
        .find_by_id(id)
        .await
        .map_err(AppError::internal("Failed to fetch user"))?
        .ok_or(AppError::NotFound)
}

pub async fn create_user(store: &dyn UserStore, input: &(impl UserFields + Sync)) -> Result<User> {
    const CONTEXT: &str = "Failed to create user";

    let new_user = validate(input).map_err(AppError::Validation)?;

    let existing = store
        .find_by_email(&new_user.email)
        .await
        .map_err(AppError::internal(CONTEXT))?;
    if existing.is_some() {
        warn!(email = %new_user.email, "email already exists");
        return Err(AppError::DuplicateEmail);
    }

    // The pre-check above can race another create; the storage constraint decides.
    let user = store.insert(new_user).await.map_err(|e| match e {
        e if e.is_email_conflict() => {
            warn!("email taken by a concurrent create");
            AppError::DuplicateEmail
        }
        e => AppError::internal(CONTEXT)(e),
    })?;

    info!(user_id = %user.id, "user created");
    Ok(user)
}

pub async fn update_user(
    store: &dyn UserStore,
    id: Uuid,
    input: &(impl UserFields + Sync),
) -> Result<User> {
    const CONTEXT: &str = "Failed to update user";

    let changes = validate(input).map_err(AppError::Validation)?;

    let current = store
        .find_by_id(id)
        .await
        .map_err(AppError::internal(CONTEXT))?
        .ok_or(AppError::NotFound)?;

    if changes.email != current.email {
        let owner = store
            .find_by_email(&changes.email)
            .await
            .map_err(AppError::internal(CONTEXT))?;
        if owner.is_some_and(|other| other.id != id) {
            warn!(user_id = %id, email = %changes.email, "email already exists");
            return Err(AppError::DuplicateEmail);
        }
    }

    let user = store.update(id, changes).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound,
        e if e.is_email_conflict() => AppError::DuplicateEmail,
        e => AppError::internal(CONTEXT)(e),
    })?;

    info!(user_id = %user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(store: &dyn UserStore, id: Uuid) -> Result<DeleteResponse> {
    const CONTEXT: &str = "Failed to delete user";

    store
        .find_by_id(id)
        .await
        .map_err(AppError::internal(CONTEXT))?
        .ok_or(AppError::NotFound)?;

    store.delete(id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound,
        e => AppError::internal(CONTEXT)(e),
    })?;

    info!(user_id = %id, "user deleted");
    Ok(DeleteResponse::deleted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{dto::UserInput, memory::MemoryUserStore, repo::StoreResult, repo_types::NewUser};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn jane() -> UserInput {
        UserInput::new("Jane Doe", "jane@x.com", "5551234567")
    }

    /// Misses every email lookup, as if a concurrent request had not committed yet.
    struct StalePrecheck(MemoryUserStore);

    #[async_trait]
    impl UserStore for StalePrecheck {
        async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
            self.0.find_by_id(id).await
        }
        async fn find_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
            Ok(None)
        }
        async fn list(&self, search: Option<&str>) -> StoreResult<Vec<User>> {
            self.0.list(search).await
        }
        async fn insert(&self, user: NewUser) -> StoreResult<User> {
            self.0.insert(user).await
        }
        async fn update(&self, id: Uuid, user: NewUser) -> StoreResult<User> {
            self.0.update(id, user).await
        }
        async fn delete(&self, id: Uuid) -> StoreResult<()> {
            self.0.delete(id).await
        }
    }

    /// Every call fails as if the database were unreachable.
    struct BrokenStore;

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn find_by_id(&self, _id: Uuid) -> StoreResult<Option<User>> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn find_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn list(&self, _search: Option<&str>) -> StoreResult<Vec<User>> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn insert(&self, _user: NewUser) -> StoreResult<User> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn update(&self, _id: Uuid, _user: NewUser) -> StoreResult<User> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn delete(&self, _id: Uuid) -> StoreResult<()> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn invalid_input_never_touches_the_store() {
        let store = MemoryUserStore::new();
        let bad = UserInput::new("J", "jane@x.com", "5551234567");

        let err = create_user(&store, &bad).await.unwrap_err();
        assert!(matches!(&err, AppError::Validation(v) if v[0].field == "name"));
        assert!(store.is_empty().await);

        // Validation runs before the lookup, so even a missing id reports 400.
        let err = update_user(&store, Uuid::new_v4(), &bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn second_create_with_same_email_is_rejected() {
        let store = MemoryUserStore::new();
        create_user(&store, &jane()).await.unwrap();

        let err = create_user(&store, &UserInput::new("Other", "jane@x.com", "5550000000"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn constraint_violation_after_stale_precheck_is_duplicate_email() {
        let store = StalePrecheck(MemoryUserStore::new());
        create_user(&store, &jane()).await.unwrap();

        let err = create_user(&store, &jane()).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
        assert_eq!(store.0.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_email_yield_one_record() {
        let store = Arc::new(MemoryUserStore::new());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { create_user(store.as_ref(), &jane()).await })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(AppError::DuplicateEmail) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!((created, duplicates), (1, 7));
        assert_eq!(store.list(Some("jane@x.com")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_to_own_email_is_not_a_duplicate() {
        let store = MemoryUserStore::new();
        let user = create_user(&store, &jane()).await.unwrap();

        let updated = update_user(&store, user.id, &UserInput::new("Jane D.", "jane@x.com", "5551234567"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Jane D.");
        assert_eq!(updated.id, user.id);
    }

    #[tokio::test]
    async fn update_to_someone_elses_email_is_rejected() {
        let store = MemoryUserStore::new();
        create_user(&store, &jane()).await.unwrap();
        let bob = create_user(&store, &UserInput::new("Bob Lee", "bob@x.com", "5551234567"))
            .await
            .unwrap();

        let err = update_user(&store, bob.id, &UserInput::new("Bob Lee", "jane@x.com", "5551234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let store = MemoryUserStore::new();
        let err = update_user(&store, Uuid::new_v4(), &jane()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found_and_changes_nothing() {
        let store = MemoryUserStore::new();
        create_user(&store, &jane()).await.unwrap();

        let err = delete_user(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = MemoryUserStore::new();
        let user = create_user(&store, &jane()).await.unwrap();

        let res = delete_user(&store, user.id).await.unwrap();
        assert_eq!(res.message, "User deleted successfully");
        assert!(matches!(get_user(&store, user.id).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn store_failures_become_operation_specific_internal_errors() {
        let store = BrokenStore;
        let id = Uuid::new_v4();

        let context = |err: AppError| match err {
            AppError::Internal { context, .. } => context,
            other => panic!("expected internal error, got {other:?}"),
        };

        assert_eq!(context(list_users(&store, None).await.unwrap_err()), "Failed to fetch users");
        assert_eq!(context(get_user(&store, id).await.unwrap_err()), "Failed to fetch user");
        assert_eq!(context(create_user(&store, &jane()).await.unwrap_err()), "Failed to create user");
        assert_eq!(context(update_user(&store, id, &jane()).await.unwrap_err()), "Failed to update user");
        assert_eq!(context(delete_user(&store, id).await.unwrap_err()), "Failed to delete user");
    }
}
