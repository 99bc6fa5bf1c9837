use config::{Config, ConfigError, Environment, File};
use groupbridge_core::settings::{
    api_server::ApiServerSettings, directory::DirectorySettings, storage::StorageSettings,
};
use serde::Deserialize;
use std::{collections::HashMap, env};

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
pub struct Settings {
    #[serde(default)]
    pub debug: bool,
    pub telemetry: Option<String>,
    #[serde(default)]
    pub api: ApiServerSettings,
    pub directory: DirectorySettings,
    #[serde(default)]
    pub storage: StorageSettings,
    /// Seed accounts for the user registry, username to user id.
    #[serde(default)]
    pub users: HashMap<String, u64>,
}

impl Settings {
    pub fn get_environment() -> Environment {
        Environment::default()
            .prefix("GROUPBRIDGE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("GROUPBRIDGE_RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("api.bind_address", "0.0.0.0:21380")?
            .set_default("directory.enabled", false)?
            .set_default("directory.user_base_dn", "")?
            .set_default("directory.group_base_dn", "")?
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Self::get_environment());

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        // Special strings allow disabling telemetry via environment variables,
        // even if it is set in the default config
        settings.telemetry = settings.check_if_optional(&settings.telemetry);

        if settings.directory.enabled && settings.directory.group_base_dn.is_empty() {
            return Err(ConfigError::Message(
                "directory.group_base_dn is required when the directory is enabled".into(),
            ));
        }
        Ok(settings)
    }

    fn check_if_optional(&self, s: &Option<String>) -> Option<String> {
        match s {
            None => None,
            Some(s) => match s.to_lowercase().as_str() {
                "no" | "false" | "0" => None,
                _ => Some(s.to_string()),
            },
        }
    }
}
