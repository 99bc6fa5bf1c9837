//! groupbridge server library
//!
//! Exposes the router, settings and application state so integration tests
//! can drive the HTTP API without binding a socket.

pub mod api;
pub mod app_state;
pub mod http;
pub mod init_telemetry;
pub mod settings;
pub mod stop_flag;
