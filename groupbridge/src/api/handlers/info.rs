use axum::{debug_handler, extract::State, response::IntoResponse, Json};
use groupbridge_core::settings::api_server::AuthMode;

use crate::app_state::SharedAppState;

#[utoipa::path(
    get,
    path = "/api/v1/info",
    responses(
    (status = 200, description = "Version, auth mode and directory state of the running server.")
    )
)]
#[debug_handler]
pub async fn info_handler(State(state): State<SharedAppState>) -> impl IntoResponse {
    let directory = state.resolver.directory_settings();
    let available = directory.enabled && state.resolver.directory_available().await;

    let json_response = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "auth_mode": match state.settings.api.auth_mode {
            AuthMode::Development => "dev",
            AuthMode::Bearer => "bearer",
        },
        "directory": {
            "enabled": directory.enabled,
            "url": directory.url.clone(),
            "group_base_dn": directory.group_base_dn.clone(),
            "available": available,
        },
    });
    Json(json_response)
}
