use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum AuthMode {
    #[serde(rename = "dev")]
    Development,
    #[serde(rename = "bearer")]
    #[default]
    Bearer,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct ApiServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub auth_mode: AuthMode,
    pub dev_user_name: Option<String>,
    /// Token identifier to token value.
    #[serde(default)]
    pub bearer_tokens: HashMap<String, String>,
}

fn default_bind_address() -> String {
    "0.0.0.0:21380".to_string()
}

impl Default for ApiServerSettings {
    fn default() -> Self {
        ApiServerSettings {
            bind_address: default_bind_address(),
            auth_mode: AuthMode::default(),
            dev_user_name: Some("Dev User".to_string()),
            bearer_tokens: HashMap::new(),
        }
    }
}
