use std::sync::Arc;

use groupbridge_core::users::{MemoryUserRegistry, UserRegistry};
use groupbridge_core::HybridResolver;
use tracing::info;

use crate::settings::config::Settings;
use crate::stop_flag;

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub stop_flag: stop_flag::StopFlag,
    pub resolver: Arc<HybridResolver>,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    /// Builds the resolver from the settings and installs the signal handlers.
    pub async fn new(settings: Settings) -> anyhow::Result<SharedAppState> {
        let stop_flag = stop_flag::StopFlag::new();
        stop_flag::register_signal_handler(&stop_flag);

        let users: Arc<dyn UserRegistry> =
            Arc::new(MemoryUserRegistry::from_map(settings.users.clone()));
        let resolver =
            HybridResolver::from_settings(&settings.directory, &settings.storage, users).await?;

        info!(
            "Resolver ready, directory {}",
            if settings.directory.enabled { "enabled" } else { "disabled" }
        );

        Ok(Arc::new(AppState {
            settings,
            stop_flag,
            resolver: Arc::new(resolver),
        }))
    }

    /// State around an already built resolver, without signal handlers.
    pub fn with_resolver(settings: Settings, resolver: HybridResolver) -> SharedAppState {
        Arc::new(AppState {
            settings,
            stop_flag: stop_flag::StopFlag::new(),
            resolver: Arc::new(resolver),
        })
    }
}
