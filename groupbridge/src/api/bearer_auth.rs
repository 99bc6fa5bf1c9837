use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::Next,
    response::Response,
};
use groupbridge_core::settings::api_server::AuthMode;
use tracing::{debug, warn};

pub use crate::api::auth_core::CurrentUser;
use crate::api::auth_core::{authenticate_dev_user, authorize_bearer_user};
use crate::app_state::SharedAppState;

pub async fn auth(
    State(state): State<SharedAppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let current_user = match state.settings.api.auth_mode {
        AuthMode::Development => Some(authenticate_dev_user(&state)),
        AuthMode::Bearer => {
            let Some(auth_header) = req
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok())
            else {
                warn!(
                    "Missing Authorization header | {} {}",
                    req.method(),
                    req.uri()
                );
                return Err(StatusCode::UNAUTHORIZED);
            };
            authorize_bearer_user(&state, auth_header)
        }
    };

    match current_user {
        Some(user) => {
            debug!("User authenticated: {}", user.name);
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        None => {
            warn!(
                "Authentication failed for {} {} | auth_mode: {:?}",
                req.method(),
                req.uri(),
                state.settings.api.auth_mode
            );
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
