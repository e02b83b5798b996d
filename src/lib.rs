//! User directory: a validated CRUD service for user records over HTTP,
//! plus a typed client for it.

pub mod app;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod telemetry;
pub mod users;

pub use app::build_app;
pub use state::AppState;
