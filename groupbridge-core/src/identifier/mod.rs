//! Stable synthetic ids for directory DNs.
//!
//! Every DN the resolver encounters is recorded once in an append-only
//! ledger. The ledger row id plus [`DIRECTORY_ID_OFFSET`] is the group id
//! the rest of the system uses for that directory group.

pub mod file;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use groupbridge_types::{GroupId, DIRECTORY_ID_OFFSET};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::directory::canonical_dn;

pub use file::FileIdMappingStore;
pub use memory::MemoryIdMappingStore;

/// One ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnMapping {
    pub row_id: u64,
    pub dn: String,
}

/// Persistence of the DN ledger.
///
/// Implementations must make `insert_or_get` atomic per DN: concurrent calls
/// for the same unseen DN all return the row created by the first of them.
#[async_trait]
pub trait IdMappingStore: Send + Sync {
    async fn find_by_dn(&self, dn: &str) -> Result<Option<u64>>;

    async fn find_by_row(&self, row_id: u64) -> Result<Option<String>>;

    async fn insert_or_get(&self, dn: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct IdentifierMapper {
    store: Arc<dyn IdMappingStore>,
}

impl IdentifierMapper {
    pub fn new(store: Arc<dyn IdMappingStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryIdMappingStore::new()))
    }

    /// Group id for a DN. Unknown DNs get a new row when `allocate` is set,
    /// otherwise `None` is returned.
    pub async fn id_for_dn(&self, dn: &str, allocate: bool) -> Result<Option<GroupId>> {
        let dn = canonical_dn(dn);
        if let Some(row_id) = self.store.find_by_dn(&dn).await? {
            return Ok(Some(GroupId::from_mapping_row(row_id)));
        }
        if !allocate {
            return Ok(None);
        }

        let row_id = self.store.insert_or_get(&dn).await?;
        debug!(dn = %dn, row_id, "Allocated group id for directory DN");
        Ok(Some(GroupId::from_mapping_row(row_id)))
    }

    /// DN recorded for a directory group id. Local ids have no DN.
    pub async fn dn_for_id(&self, id: GroupId) -> Result<Option<String>> {
        match id.mapping_row() {
            Some(row_id) => self.store.find_by_row(row_id).await,
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for IdentifierMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierMapper")
            .field("offset", &DIRECTORY_ID_OFFSET)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocation_is_idempotent_and_case_insensitive() {
        let mapper = IdentifierMapper::in_memory();

        let first = mapper
            .id_for_dn("cn=Admins,ou=groups,dc=example,dc=org", true)
            .await
            .unwrap()
            .unwrap();
        let second = mapper
            .id_for_dn("CN=admins,OU=groups,DC=example,DC=org", true)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, second);
        assert!(first.is_directory());
        assert_eq!(first, GroupId::from_mapping_row(1));
        assert_eq!(
            mapper.dn_for_id(first).await.unwrap().as_deref(),
            Some("cn=admins,ou=groups,dc=example,dc=org")
        );
    }

    #[tokio::test]
    async fn test_lookup_without_allocation() {
        let mapper = IdentifierMapper::in_memory();

        assert_eq!(
            mapper
                .id_for_dn("cn=ghost,ou=groups,dc=example,dc=org", false)
                .await
                .unwrap(),
            None
        );
        // Nothing was recorded by the lookup
        let id = mapper
            .id_for_dn("cn=real,ou=groups,dc=example,dc=org", true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(id, GroupId::from_mapping_row(1));
    }

    #[tokio::test]
    async fn test_dn_for_id_domain() {
        let mapper = IdentifierMapper::in_memory();
        mapper
            .id_for_dn("cn=a,ou=groups,dc=example,dc=org", true)
            .await
            .unwrap();

        assert_eq!(mapper.dn_for_id(GroupId(5)).await.unwrap(), None);
        assert_eq!(mapper.dn_for_id(GroupId(DIRECTORY_ID_OFFSET)).await.unwrap(), None);
        assert_eq!(
            mapper.dn_for_id(GroupId::from_mapping_row(2)).await.unwrap(),
            None
        );
        assert!(mapper
            .dn_for_id(GroupId::from_mapping_row(1))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_converges() {
        let mapper = IdentifierMapper::in_memory();

        let lookups = (0..32).map(|_| {
            let mapper = mapper.clone();
            tokio::spawn(async move {
                mapper
                    .id_for_dn("cn=racers,ou=groups,dc=example,dc=org", true)
                    .await
                    .unwrap()
                    .unwrap()
            })
        });
        let ids: Vec<GroupId> = futures_util::future::join_all(lookups)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert!(ids.iter().all(|id| *id == ids[0]));
        let other = mapper
            .id_for_dn("cn=other,ou=groups,dc=example,dc=org", true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(other, GroupId::from_mapping_row(2));
    }
}
