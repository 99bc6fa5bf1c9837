use anyhow::{Context, Result};
use async_trait::async_trait;
use groupbridge_types::{Group, GroupId, GroupSummary, Member, DIRECTORY_ID_OFFSET};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::LocalGroupStore;
use crate::error::ResolverError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GroupsFile {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Debug, Clone, Default)]
struct GroupState {
    groups: BTreeMap<GroupId, Group>,
}

impl GroupState {
    fn next_id(&self) -> Result<GroupId> {
        let next = self.groups.keys().last().map(|id| id.0 + 1).unwrap_or(1);
        if next >= DIRECTORY_ID_OFFSET {
            anyhow::bail!("Local group id space is exhausted");
        }
        Ok(GroupId(next))
    }

    fn name_taken(&self, name: &str, except: Option<GroupId>) -> bool {
        self.groups
            .values()
            .any(|g| g.name == name && Some(g.id) != except)
    }

    /// A group can not contain itself and local children must exist.
    fn check_member(&self, group: GroupId, member: Member) -> Result<()> {
        let Member::Group(child) = member else {
            return Ok(());
        };
        if child == group {
            return Err(ResolverError::InvalidMembership(format!(
                "Group {} can not be a member of itself",
                group
            ))
            .into());
        }
        if child.is_local() && !self.groups.contains_key(&child) {
            return Err(ResolverError::not_found(format!("Local group {}", child)).into());
        }
        Ok(())
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut Group> {
        self.groups
            .get_mut(&id)
            .ok_or_else(|| ResolverError::not_found(format!("Local group {}", id)).into())
    }
}

/// Local group store held in memory, optionally persisted to a YAML file.
///
/// Every mutation works on a copy of the state; the copy replaces the live
/// state only after it has been written to disk.
#[derive(Debug, Default)]
pub struct MemoryGroupStore {
    state: RwLock<GroupState>,
    path: Option<PathBuf>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store persisted to `path`, loading existing groups from it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let groups = Self::load(&path).await?;
        info!("Loaded {} local groups from {}", groups.len(), path.display());

        Ok(Self {
            state: RwLock::new(GroupState {
                groups: groups.into_iter().map(|g| (g.id, g)).collect(),
            }),
            path: Some(path),
        })
    }

    async fn load(path: &Path) -> Result<Vec<Group>> {
        if !path.exists() {
            warn!("Group store not found at {}, starting empty", path.display());
            return Ok(vec![]);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read group store")?;
        let file: GroupsFile =
            serde_norway::from_str(&content).context("Failed to parse group store")?;

        if let Some(group) = file.groups.iter().find(|g| g.id.is_directory()) {
            anyhow::bail!(
                "Group store {} contains group '{}' with directory id {}",
                path.display(),
                group.name,
                group.id
            );
        }
        Ok(file.groups)
    }

    async fn persist(&self, state: &GroupState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = GroupsFile {
            groups: state.groups.values().cloned().collect(),
        };
        let yaml = serde_norway::to_string(&file)?;
        tokio::fs::write(path, yaml)
            .await
            .context("Failed to save group store")?;
        Ok(())
    }

    async fn mutate<T: Send>(
        &self,
        f: impl FnOnce(&mut GroupState) -> Result<T> + Send,
    ) -> Result<T> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let value = f(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(value)
    }
}

#[async_trait]
impl LocalGroupStore for MemoryGroupStore {
    async fn create(&self, name: &str) -> Result<Group> {
        let group = self
            .mutate(|state| {
                if state.name_taken(name, None) {
                    return Err(ResolverError::DuplicateName(name.to_string()).into());
                }
                let group = Group::local(state.next_id()?, name);
                state.groups.insert(group.id, group.clone());
                Ok(group)
            })
            .await?;

        info!("Created local group '{}' with id {}", group.name, group.id);
        Ok(group)
    }

    async fn save(&self, group: &Group) -> Result<Group> {
        if group.id.is_directory() {
            return Err(ResolverError::ImmutableEntity(group.id).into());
        }

        let saved = self
            .mutate(|state| {
                if state.name_taken(&group.name, Some(group.id)) {
                    return Err(ResolverError::DuplicateName(group.name.clone()).into());
                }
                for member in &group.members {
                    state.check_member(group.id, *member)?;
                }
                let stored = state.group_mut(group.id)?;
                stored.name = group.name.clone();
                stored.members = group.members.clone();
                Ok(stored.clone())
            })
            .await?;

        info!("Saved local group '{}' ({})", saved.name, saved.id);
        Ok(saved)
    }

    async fn delete(&self, id: GroupId) -> Result<bool> {
        let removed = self
            .mutate(|state| {
                let removed = state.groups.remove(&id).is_some();
                if removed {
                    for group in state.groups.values_mut() {
                        group.members.remove(&Member::Group(id));
                    }
                }
                Ok(removed)
            })
            .await?;

        if removed {
            info!("Deleted local group {}", id);
        }
        Ok(removed)
    }

    async fn get_by_id(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Group>> {
        Ok(self.state.read().await.groups.values().cloned().collect())
    }

    async fn search(&self, substring: &str) -> Result<Vec<GroupSummary>> {
        let wanted = substring.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .groups
            .values()
            .filter(|g| g.name.to_lowercase().contains(&wanted))
            .map(Group::summary)
            .collect())
    }

    async fn add_member(&self, group: GroupId, member: Member) -> Result<()> {
        self.mutate(|state| {
            state.check_member(group, member)?;
            state.group_mut(group)?.members.insert(member);
            Ok(())
        })
        .await?;

        info!("Added {} {} to local group {}", member.kind(), member.raw_id(), group);
        Ok(())
    }

    async fn remove_member(&self, group: GroupId, member: Member) -> Result<bool> {
        let removed = self
            .mutate(|state| Ok(state.group_mut(group)?.members.remove(&member)))
            .await?;

        if removed {
            info!(
                "Removed {} {} from local group {}",
                member.kind(),
                member.raw_id(),
                group
            );
        }
        Ok(removed)
    }

    async fn remove_all_members(&self, group: GroupId) -> Result<()> {
        self.mutate(|state| {
            state.group_mut(group)?.members.clear();
            Ok(())
        })
        .await?;

        info!("Removed all members from local group {}", group);
        Ok(())
    }

    async fn is_member(&self, parent: GroupId, member: Member, recursive: bool) -> Result<bool> {
        let state = self.state.read().await;
        let Some(parent_group) = state.groups.get(&parent) else {
            return Ok(false);
        };
        if parent_group.members.contains(&member) {
            return Ok(true);
        }
        if !recursive {
            return Ok(false);
        }

        let mut visited = HashSet::from([parent]);
        let mut queue: VecDeque<GroupId> = VecDeque::from([parent]);
        while let Some(current) = queue.pop_front() {
            let Some(group) = state.groups.get(&current) else {
                continue;
            };
            if group.members.contains(&member) {
                return Ok(true);
            }
            for sub in group.members.iter() {
                if let Member::Group(sub_id) = sub {
                    if sub_id.is_local() && visited.insert(*sub_id) {
                        queue.push_back(*sub_id);
                    }
                }
            }
        }
        Ok(false)
    }

    async fn groups_of_member(&self, member: Member) -> Result<Vec<GroupSummary>> {
        let state = self.state.read().await;
        Ok(state
            .groups
            .values()
            .filter(|g| g.members.contains(&member))
            .map(Group::summary)
            .collect())
    }
}
