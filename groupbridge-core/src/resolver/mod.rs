//! Hybrid group resolver
//!
//! Merges the local group store and the directory into one group graph.
//! Operations dispatch on the id partition: ids below
//! [`groupbridge_types::DIRECTORY_ID_OFFSET`] go to the local store, all
//! others through the directory translator. Directory groups shadow local
//! groups of the same name and can never be modified.

mod lookup;
mod membership;
mod mutation;

#[cfg(test)]
mod tests;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::directory::{DirectoryClient, LdapDirectoryClient, MemoryDirectory};
use crate::identifier::{FileIdMappingStore, IdMappingStore, IdentifierMapper, MemoryIdMappingStore};
use crate::local::{LocalGroupStore, MemoryGroupStore};
use crate::settings::directory::DirectorySettings;
use crate::settings::storage::StorageSettings;
use crate::translator::DirectoryGroupTranslator;
use crate::users::UserRegistry;

pub struct HybridResolver {
    local: Arc<dyn LocalGroupStore>,
    translator: DirectoryGroupTranslator,
    users: Arc<dyn UserRegistry>,
}

impl HybridResolver {
    pub fn new(
        local: Arc<dyn LocalGroupStore>,
        translator: DirectoryGroupTranslator,
        users: Arc<dyn UserRegistry>,
    ) -> Self {
        Self {
            local,
            translator,
            users,
        }
    }

    /// Build the resolver and its collaborators from configuration.
    ///
    /// A disabled directory is replaced by an empty in-memory directory, so
    /// the resolver serves local groups only.
    pub async fn from_settings(
        directory: &DirectorySettings,
        storage: &StorageSettings,
        users: Arc<dyn UserRegistry>,
    ) -> Result<Self> {
        let client: Arc<dyn DirectoryClient> = if directory.enabled {
            info!("Using LDAP directory at {}", directory.url);
            Arc::new(LdapDirectoryClient::new(directory.clone()))
        } else {
            info!("Directory disabled, serving local groups only");
            Arc::new(MemoryDirectory::new())
        };

        let mapping_store: Arc<dyn IdMappingStore> = match &storage.id_mapping_file {
            Some(path) => Arc::new(FileIdMappingStore::open(path).await?),
            None => Arc::new(MemoryIdMappingStore::new()),
        };

        let local: Arc<dyn LocalGroupStore> = match &storage.groups_file {
            Some(path) => Arc::new(MemoryGroupStore::open(path).await?),
            None => Arc::new(MemoryGroupStore::new()),
        };

        let translator = DirectoryGroupTranslator::new(
            client,
            directory.clone(),
            IdentifierMapper::new(mapping_store),
        );
        Ok(Self::new(local, translator, users))
    }

    pub fn directory_settings(&self) -> &DirectorySettings {
        self.translator.settings()
    }

    /// Whether the directory can currently be reached.
    pub async fn directory_available(&self) -> bool {
        self.translator.ensure_connected().await
    }
}

impl std::fmt::Debug for HybridResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridResolver")
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}
