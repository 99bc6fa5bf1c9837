//! Read-only access to the LDAP-style directory.
//!
//! The resolver only needs a generic search primitive. Implementations never
//! fail a search: an unreachable or unbound directory answers with zero
//! entries so local groups stay usable while the directory is down.

pub mod filter;
pub mod ldap;
pub mod memory;

use async_trait::async_trait;
use std::collections::HashMap;

pub use filter::Filter;
pub use ldap::LdapDirectoryClient;
pub use memory::MemoryDirectory;

/// Canonical form used to compare and store DNs.
pub fn canonical_dn(dn: &str) -> String {
    dn.trim().to_lowercase()
}

/// One search result: its DN and the returned attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_attr<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// All values of an attribute; attribute names compare case-insensitively.
    pub fn values(&self, name: &str) -> &[String] {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// Copy of this entry restricted to the requested attributes.
    /// An empty list keeps every attribute.
    pub fn project(&self, attributes: &[&str]) -> DirectoryEntry {
        if attributes.is_empty() {
            return self.clone();
        }
        let attrs = self
            .attrs
            .iter()
            .filter(|(key, _)| attributes.iter().any(|a| key.eq_ignore_ascii_case(a)))
            .map(|(key, values)| (key.clone(), values.clone()))
            .collect();
        DirectoryEntry {
            dn: self.dn.clone(),
            attrs,
        }
    }
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Establish the connection and bind once. Later calls are no-ops while
    /// the connection is held. Returns whether the directory is usable.
    async fn ensure_connected(&self) -> bool;

    /// Subtree search below `base`. An empty attribute list requests all
    /// attributes. Returns no entries when the directory can not be used.
    async fn search(&self, base: &str, filter: &Filter, attributes: &[&str]) -> Vec<DirectoryEntry>;

    /// Read a single entry by DN.
    async fn read_entry(&self, dn: &str, attributes: &[&str]) -> Option<DirectoryEntry> {
        let wanted = canonical_dn(dn);
        self.search(dn, &Filter::present("objectClass"), attributes)
            .await
            .into_iter()
            .find(|entry| canonical_dn(&entry.dn) == wanted)
    }
}
