//! Locally owned groups.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use groupbridge_types::{Group, GroupId, GroupSummary, Member};

pub use memory::MemoryGroupStore;

/// Store of the writable group hierarchy. Every id handled here is below
/// [`groupbridge_types::DIRECTORY_ID_OFFSET`]; members may reference
/// directory groups.
#[async_trait]
pub trait LocalGroupStore: Send + Sync {
    /// Create an empty group with a fresh id.
    async fn create(&self, name: &str) -> Result<Group>;

    /// Update name and members of an existing group.
    async fn save(&self, group: &Group) -> Result<Group>;

    /// Remove a group and every membership edge pointing at it.
    /// Returns whether the group existed.
    async fn delete(&self, id: GroupId) -> Result<bool>;

    async fn get_by_id(&self, id: GroupId) -> Result<Option<Group>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Group>>;

    async fn list(&self) -> Result<Vec<Group>>;

    /// Groups whose name contains `substring`, ignoring case.
    async fn search(&self, substring: &str) -> Result<Vec<GroupSummary>>;

    async fn add_member(&self, group: GroupId, member: Member) -> Result<()>;

    /// Returns whether the edge existed.
    async fn remove_member(&self, group: GroupId, member: Member) -> Result<bool>;

    async fn remove_all_members(&self, group: GroupId) -> Result<()>;

    /// Direct membership, or transitive through local sub-groups when
    /// `recursive` is set.
    async fn is_member(&self, parent: GroupId, member: Member, recursive: bool) -> Result<bool>;

    /// Groups listing `member` directly.
    async fn groups_of_member(&self, member: Member) -> Result<Vec<GroupSummary>>;
}
