//! User accounts known to the authorization engine.

use anyhow::Result;
use async_trait::async_trait;
use groupbridge_types::UserId;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::info;

#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn username_to_id(&self, name: &str) -> Result<Option<UserId>>;

    async fn id_to_username(&self, id: UserId) -> Result<Option<String>>;

    /// Create an account, failing when the name is taken.
    async fn create_user(&self, name: &str) -> Result<UserId>;
}

#[derive(Debug, Default)]
struct Accounts {
    by_id: BTreeMap<UserId, String>,
    by_name: HashMap<String, UserId>,
}

impl Accounts {
    fn insert(&mut self, name: String, id: UserId) {
        self.by_name.insert(name.clone(), id);
        self.by_id.insert(id, name);
    }
}

/// User registry held in memory, seeded from configuration.
#[derive(Debug, Default)]
pub struct MemoryUserRegistry {
    accounts: RwLock<Accounts>,
}

impl MemoryUserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map<I>(users: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut accounts = Accounts::default();
        for (name, id) in users {
            accounts.insert(name, UserId(id));
        }
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.by_id.is_empty()
    }
}

#[async_trait]
impl UserRegistry for MemoryUserRegistry {
    async fn username_to_id(&self, name: &str) -> Result<Option<UserId>> {
        Ok(self.accounts.read().await.by_name.get(name).copied())
    }

    async fn id_to_username(&self, id: UserId) -> Result<Option<String>> {
        Ok(self.accounts.read().await.by_id.get(&id).cloned())
    }

    async fn create_user(&self, name: &str) -> Result<UserId> {
        let mut accounts = self.accounts.write().await;
        if accounts.by_name.contains_key(name) {
            anyhow::bail!("User '{}' already exists", name);
        }

        let id = UserId(accounts.by_id.keys().last().map(|id| id.0 + 1).unwrap_or(1));
        accounts.insert(name.to_string(), id);
        info!("Created user '{}' with id {}", name, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[tokio::test]
    async fn test_seeded_lookup() {
        let registry = MemoryUserRegistry::from_map(hashmap! {
            "Alice".to_string() => 3,
            "Bob".to_string() => 9,
        });

        assert_eq!(registry.username_to_id("Alice").await.unwrap(), Some(UserId(3)));
        assert_eq!(registry.username_to_id("alice").await.unwrap(), None);
        assert_eq!(
            registry.id_to_username(UserId(9)).await.unwrap().as_deref(),
            Some("Bob")
        );
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_create_user_continues_after_highest_id() {
        let registry = MemoryUserRegistry::from_map(hashmap! { "Alice".to_string() => 3 });

        assert_eq!(registry.create_user("Carol").await.unwrap(), UserId(4));
        assert!(registry.create_user("Alice").await.is_err());

        let empty = MemoryUserRegistry::new();
        assert!(empty.is_empty().await);
        assert_eq!(empty.create_user("Dave").await.unwrap(), UserId(1));
    }
}
