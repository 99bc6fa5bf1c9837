use groupbridge_types::{Group, GroupId, Member, UserId};
use tracing::{info, warn};

use super::HybridResolver;
use crate::error::{ResolverError, ResolverResult};
use crate::translator::SearchMode;

impl HybridResolver {
    fn ensure_mutable(id: GroupId) -> ResolverResult<()> {
        if id.is_directory() {
            warn!("Rejected modification of directory group {}", id);
            return Err(ResolverError::ImmutableEntity(id));
        }
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str) -> ResolverResult<()> {
        if !self
            .translator
            .search_groups(name, SearchMode::ByName)
            .await
            .is_empty()
        {
            warn!("Rejected local group '{}', a directory group has that name", name);
            return Err(ResolverError::NameCollision(name.to_string()));
        }
        Ok(())
    }

    /// Directory children need `allow_directory_group_members` and a known DN.
    async fn ensure_attachable(&self, child: GroupId) -> ResolverResult<()> {
        if child.is_local() {
            return Ok(());
        }
        if !self.translator.settings().allow_directory_group_members {
            warn!("Directory group {} can not be a member of a local group", child);
            return Err(ResolverError::ImmutableEntity(child));
        }
        if self.translator.mapper().dn_for_id(child).await?.is_none() {
            return Err(ResolverError::not_found(format!("Directory group {}", child)));
        }
        Ok(())
    }

    pub async fn create_group(&self, name: &str) -> ResolverResult<Group> {
        self.ensure_name_free(name).await?;
        Ok(self.local.create(name).await?)
    }

    pub async fn save_group(&self, group: &Group) -> ResolverResult<Group> {
        Self::ensure_mutable(group.id)?;
        self.ensure_name_free(&group.name).await?;
        for member in &group.members {
            if let Member::Group(child) = member {
                self.ensure_attachable(*child).await?;
            }
        }
        Ok(self.local.save(group).await?)
    }

    pub async fn delete_group(&self, id: GroupId) -> ResolverResult<()> {
        Self::ensure_mutable(id)?;
        if !self.local.delete(id).await? {
            return Err(ResolverError::not_found(format!("Local group {}", id)));
        }
        Ok(())
    }

    pub async fn add_user_to_group(&self, group: GroupId, user: UserId) -> ResolverResult<()> {
        Self::ensure_mutable(group)?;
        if self.users.id_to_username(user).await?.is_none() {
            return Err(ResolverError::not_found(format!("User {}", user)));
        }
        Ok(self.local.add_member(group, Member::User(user)).await?)
    }

    pub async fn remove_user_from_group(&self, group: GroupId, user: UserId) -> ResolverResult<()> {
        Self::ensure_mutable(group)?;
        if !self.local.remove_member(group, Member::User(user)).await? {
            return Err(ResolverError::not_found(format!(
                "User {} in group {}",
                user, group
            )));
        }
        Ok(())
    }

    pub async fn add_group_to_group(&self, parent: GroupId, child: GroupId) -> ResolverResult<()> {
        Self::ensure_mutable(parent)?;
        self.ensure_attachable(child).await?;
        self.local.add_member(parent, Member::Group(child)).await?;

        if child.is_directory() {
            info!("Attached directory group {} to local group {}", child, parent);
        }
        Ok(())
    }

    pub async fn remove_group_from_group(&self, parent: GroupId, child: GroupId) -> ResolverResult<()> {
        Self::ensure_mutable(parent)?;
        if child.is_directory() && !self.translator.settings().allow_directory_group_members {
            return Err(ResolverError::ImmutableEntity(child));
        }
        if !self.local.remove_member(parent, Member::Group(child)).await? {
            return Err(ResolverError::not_found(format!(
                "Group {} in group {}",
                child, parent
            )));
        }
        Ok(())
    }

    pub async fn remove_all_members(&self, group: GroupId) -> ResolverResult<()> {
        Self::ensure_mutable(group)?;
        Ok(self.local.remove_all_members(group).await?)
    }
}
