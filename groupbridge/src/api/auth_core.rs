use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::app_state::SharedAppState;

#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub name: String,
    /// Bearer token identifier, `None` in development mode.
    pub token_identifier: Option<String>,
}

/// Create a development mode user
pub fn authenticate_dev_user(state: &SharedAppState) -> CurrentUser {
    CurrentUser {
        name: state
            .settings
            .api
            .dev_user_name
            .clone()
            .unwrap_or_else(|| "Dev User".to_string()),
        token_identifier: None,
    }
}

/// Authorize a bearer token, with or without the `Bearer ` prefix.
pub fn authorize_bearer_user(state: &SharedAppState, token: &str) -> Option<CurrentUser> {
    let raw_token = token.strip_prefix("Bearer ").unwrap_or(token);

    match find_token_identifier(state, raw_token) {
        Some(identifier) => {
            debug!("Found identifier '{}' for bearer token", identifier);
            Some(CurrentUser {
                name: format!("Token User ({})", identifier),
                token_identifier: Some(identifier),
            })
        }
        None => {
            warn!(
                "Bearer token authentication failed, token not configured (token starts with: {}...)",
                raw_token.chars().take(4).collect::<String>()
            );
            None
        }
    }
}

fn find_token_identifier(state: &SharedAppState, token: &str) -> Option<String> {
    if token.is_empty() {
        return None;
    }
    for (identifier, configured_token) in &state.settings.api.bearer_tokens {
        if token.as_bytes().ct_eq(configured_token.as_bytes()).into() {
            return Some(identifier.clone());
        }
    }
    None
}
