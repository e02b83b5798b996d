use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    state::AppState,
    users::{
        dto::{DeleteResponse, SearchQuery, UserBody},
        repo_types::User,
        services,
        validation::validate,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
}

/// Ids that are not UUIDs cannot name a stored record.
fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        debug!(id = %raw, "malformed user id");
        AppError::NotFound
    })
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<User>>> {
    let users = services::list_users(state.store.as_ref(), query.term()).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<User>> {
    let id = parse_id(&id)?;
    let user = services::get_user(state.store.as_ref(), id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UserBody>, JsonRejection>,
) -> Result<(StatusCode, Json<User>)> {
    let Json(input) = payload?;
    let user = services::create_user(state.store.as_ref(), &input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UserBody>, JsonRejection>,
) -> Result<Json<User>> {
    let Json(input) = payload?;
    let Ok(id) = Uuid::parse_str(&id) else {
        // Body errors are reported ahead of the unknown id.
        validate(&input).map_err(AppError::Validation)?;
        debug!(id = %id, "malformed user id");
        return Err(AppError::NotFound);
    };
    let user = services::update_user(state.store.as_ref(), id, &input).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let id = parse_id(&id)?;
    let res = services::delete_user(state.store.as_ref(), id).await?;
    Ok(Json(res))
}
