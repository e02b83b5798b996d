//! Error taxonomy for the HTTP surface and its JSON shape.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::users::{repo::StoreError, validation::Violation};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    Validation(Vec<Violation>),

    #[error("Invalid request body")]
    MalformedBody(#[from] JsonRejection),

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("User not found")]
    NotFound,

    /// `context` is the only text the caller sees; `source` goes to the logs.
    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    /// Wraps an unexpected store failure under a caller-facing message.
    pub fn internal(context: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Internal { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MalformedBody(_) | AppError::DuplicateEmail => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Violation>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();

        let details = match self {
            AppError::Validation(violations) => {
                tracing::warn!(?violations, "validation failed");
                Some(violations)
            }
            AppError::MalformedBody(rejection) => {
                tracing::warn!(error = %rejection.body_text(), "malformed request body");
                None
            }
            AppError::Internal { context, source } => {
                tracing::error!(error = %source, context, "request failed");
                None
            }
            AppError::DuplicateEmail | AppError::NotFound => None,
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}
