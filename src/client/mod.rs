//! Typed HTTP client for the users API.
//!
//! List results are cached per search term and dropped whenever this client
//! performs a successful write, so the next read goes back to the server.

pub mod cache;
pub mod debounce;
pub mod search;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ErrorBody;
use crate::users::{
    dto::{DeleteResponse, UserInput},
    validation::Violation,
    User,
};

pub use cache::QueryCache;
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use search::{LiveSearch, SearchResult};

/// Cache tag shared by every list query; writes invalidate it.
pub const USERS_TAG: &str = "users";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        details: Vec<Violation>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

pub struct UsersClient {
    http: Client,
    base_url: String,
    cache: QueryCache<Vec<User>>,
}

impl UsersClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: QueryCache::new(),
        }
    }

    pub fn cache(&self) -> &QueryCache<Vec<User>> {
        &self.cache
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /users[?search=term]`, served from cache when possible.
    pub async fn list(&self, search: Option<&str>) -> ClientResult<Vec<User>> {
        let key = search.unwrap_or_default();
        if let Some(users) = self.cache.get(USERS_TAG, key) {
            tracing::debug!(search = key, "users list served from cache");
            return Ok(users);
        }

        // A write finishing while this request is in flight voids its result.
        let generation = self.cache.generation(USERS_TAG);
        let mut req = self.http.get(self.url("/users"));
        if let Some(term) = search {
            req = req.query(&[("search", term)]);
        }
        let users: Vec<User> = read(req.send().await?, "Failed to fetch users").await?;

        if !self.cache.insert_at(USERS_TAG, generation, key, users.clone()) {
            tracing::debug!(search = key, "users list went stale in flight; not cached");
        }
        Ok(users)
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<User> {
        let res = self.http.get(self.url(&format!("/users/{id}"))).send().await?;
        read(res, "Failed to fetch user").await
    }

    pub async fn create(&self, input: &UserInput) -> ClientResult<User> {
        let res = self.http.post(self.url("/users")).json(input).send().await?;
        let user = read(res, "Failed to create user").await?;
        self.invalidate();
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, input: &UserInput) -> ClientResult<User> {
        let res = self
            .http
            .put(self.url(&format!("/users/{id}")))
            .json(input)
            .send()
            .await?;
        let user = read(res, "Failed to update user").await?;
        self.invalidate();
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<DeleteResponse> {
        let res = self.http.delete(self.url(&format!("/users/{id}"))).send().await?;
        let confirmation = read(res, "Failed to delete user").await?;
        self.invalidate();
        Ok(confirmation)
    }

    fn invalidate(&self) {
        let generation = self.cache.invalidate_tag(USERS_TAG);
        tracing::debug!(generation, "users cache invalidated");
    }
}

/// Decodes a 2xx body, or turns anything else into [`ClientError::Api`].
async fn read<T: DeserializeOwned>(res: Response, fallback: &str) -> ClientResult<T> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }

    let body = res.json::<ErrorBody>().await.ok();
    let (message, details) = match body {
        Some(ErrorBody { error, details }) if !error.is_empty() => (error, details.unwrap_or_default()),
        _ => (fallback.to_string(), Vec::new()),
    };
    tracing::debug!(%status, %message, "users api returned an error");
    Err(ClientError::Api {
        status,
        message,
        details,
    })
}
