pub mod auth_core;
pub mod bearer_auth;
pub mod error;
pub mod handlers;
pub mod router;
