use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{canonical_dn, DirectoryClient, DirectoryEntry, Filter};

/// Directory tree held in memory.
///
/// Searches use subtree scope: the base entry itself and every entry whose
/// DN ends with the base DN. Taking it offline makes every search come back
/// empty, the same way an unreachable server is handled.
#[derive(Debug)]
pub struct MemoryDirectory {
    entries: RwLock<BTreeMap<String, DirectoryEntry>>,
    online: AtomicBool,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            online: AtomicBool::new(true),
        }
    }

    pub fn with_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (canonical_dn(&entry.dn), entry))
            .collect();
        Self {
            entries: RwLock::new(entries),
            online: AtomicBool::new(true),
        }
    }

    pub async fn insert(&self, entry: DirectoryEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(canonical_dn(&entry.dn), entry);
    }

    pub async fn remove(&self, dn: &str) -> Option<DirectoryEntry> {
        let mut entries = self.entries.write().await;
        entries.remove(&canonical_dn(dn))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

fn in_subtree(dn: &str, base: &str) -> bool {
    base.is_empty() || dn == base || dn.ends_with(&format!(",{}", base))
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn ensure_connected(&self) -> bool {
        self.is_online()
    }

    async fn search(&self, base: &str, filter: &Filter, attributes: &[&str]) -> Vec<DirectoryEntry> {
        if !self.ensure_connected().await {
            warn!("Directory is offline, returning no entries for search below '{}'", base);
            return vec![];
        }

        let base = canonical_dn(base);
        let entries = self.entries.read().await;
        let found: Vec<DirectoryEntry> = entries
            .iter()
            .filter(|(dn, _)| in_subtree(dn, &base))
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(_, entry)| entry.project(attributes))
            .collect();

        debug!(base = %base, filter = %filter, results = found.len(), "Directory search");
        found
    }
}
