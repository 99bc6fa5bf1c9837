use axum::http::StatusCode;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use groupbridge_core::ResolverError;
use thiserror::Error;

#[derive(Clone, Error, Debug, utoipa::ToResponse, utoipa::ToSchema)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    fn get_error_msg(&self) -> (StatusCode, String) {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string())
    }
}

impl From<ResolverError> for AppError {
    fn from(e: ResolverError) -> Self {
        match e {
            ResolverError::ImmutableEntity(_) => AppError::Forbidden(e.to_string()),
            ResolverError::NameCollision(_) | ResolverError::DuplicateName(_) => {
                AppError::Conflict(e.to_string())
            }
            ResolverError::InvalidMembership(_) => AppError::InvalidInput(e.to_string()),
            ResolverError::NotFound(what) => AppError::NotFound(what),
            ResolverError::DirectoryUnavailable(_) | ResolverError::Storage(_) => {
                AppError::InternalServerError(e.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(app_error) = e.downcast_ref::<AppError>() {
            return app_error.clone();
        }
        match e.downcast::<ResolverError>() {
            Ok(resolver_error) => resolver_error.into(),
            Err(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.get_error_msg();
        let body = serde_json::json!({ "error": true, "message": body });
        (status, Json(body)).into_response()
    }
}
