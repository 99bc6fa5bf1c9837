use axum::{debug_handler, extract::State, response::IntoResponse, Extension, Json};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::api::bearer_auth::CurrentUser;
use crate::api::error::AppError;
use crate::app_state::SharedAppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProvisionResult {
    /// Account names created for directory users
    pub created: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/authenticated/users/provision",
    responses(
    (status = 200, description = "Created accounts", body = ProvisionResult),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn provision_users_handler(
    State(state): State<SharedAppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.resolver.provision_directory_users().await?;
    info!("{} provisioned {} directory accounts", user.name, created.len());
    Ok(Json(ProvisionResult { created }))
}
