pub mod dto;
pub mod handlers;
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

use crate::state::AppState;
use axum::Router;

pub use memory::MemoryUserStore;
pub use repo::{PgUserStore, StoreError, UserStore};
pub use repo_types::{NewUser, User};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
