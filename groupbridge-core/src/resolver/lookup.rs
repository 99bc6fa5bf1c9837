use groupbridge_types::{Group, GroupId, GroupSummary, Member, MemberKind, UserId};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use super::HybridResolver;
use crate::error::ResolverResult;
use crate::translator::SearchMode;

/// Account name for a directory user name: first letter upper-cased.
pub(crate) fn account_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl HybridResolver {
    /// Group with the given name. A directory group shadows a local group of
    /// the same name.
    pub async fn get_group_by_name(&self, name: &str) -> ResolverResult<Option<Group>> {
        let found = self.translator.search_groups(name, SearchMode::ByName).await;
        if let Some(group) = found.first() {
            return Ok(Some(self.translator.to_group(group).await?));
        }
        Ok(self.local.get_by_name(name).await?)
    }

    pub async fn get_group_by_id(&self, id: GroupId) -> ResolverResult<Option<Group>> {
        if id.is_local() {
            return Ok(self.local.get_by_id(id).await?);
        }

        let Some(dn) = self.translator.mapper().dn_for_id(id).await? else {
            return Ok(None);
        };
        Ok(self.translator.read_group(&dn).await?)
    }

    /// All groups: every directory group below a root group, followed by the
    /// local groups whose name is not taken by a directory group.
    pub async fn get_groups(&self) -> ResolverResult<Vec<Group>> {
        let mut groups = Vec::new();
        let mut seen = HashSet::new();

        for root in self.translator.root_group_dns().await {
            for found in self.translator.search_groups(&root, SearchMode::ByDn).await {
                let group = self.translator.to_group(&found).await?;
                if seen.insert(group.id) {
                    groups.push(group);
                }
            }
        }

        let directory_names: HashSet<String> = groups.iter().map(|g| g.name.clone()).collect();
        let local_groups = self.local.list().await?;
        let total_local = local_groups.len();
        groups.extend(
            local_groups
                .into_iter()
                .filter(|g| !directory_names.contains(&g.name)),
        );

        debug!(
            directory = directory_names.len(),
            local = total_local,
            merged = groups.len(),
            "Merged group list"
        );
        Ok(groups)
    }

    /// Whether both stores define a group with this name.
    pub async fn is_overloaded(&self, name: &str) -> ResolverResult<bool> {
        let in_directory = !self
            .translator
            .search_groups(name, SearchMode::ByName)
            .await
            .is_empty();
        if !in_directory {
            return Ok(false);
        }
        Ok(self.local.get_by_name(name).await?.is_some())
    }

    pub async fn group_name_for_id(&self, id: GroupId) -> ResolverResult<Option<String>> {
        Ok(self.get_group_by_id(id).await?.map(|g| g.name))
    }

    /// Local groups must exist in the store; directory ids only need a
    /// mapping row.
    pub async fn group_exists(&self, id: GroupId) -> ResolverResult<bool> {
        if id.is_local() {
            return Ok(self.local.get_by_id(id).await?.is_some());
        }
        Ok(self.translator.mapper().dn_for_id(id).await?.is_some())
    }

    /// Direct members of a group. Directory users without an account are
    /// left out.
    pub async fn members_of_group(&self, id: GroupId, kind: MemberKind) -> ResolverResult<Vec<Member>> {
        if id.is_local() {
            let members: Vec<Member> = match self.local.get_by_id(id).await? {
                Some(group) => group.members.into_iter().filter(|m| m.kind() == kind).collect(),
                None => vec![],
            };
            return Ok(members);
        }

        let Some(dn) = self.translator.mapper().dn_for_id(id).await? else {
            return Ok(vec![]);
        };

        let mut members = Vec::new();
        for found in self.translator.search_members(&dn, kind).await {
            match kind {
                MemberKind::Group => {
                    if let Some(group_id) = self.translator.mapper().id_for_dn(&found.dn, true).await? {
                        members.push(Member::Group(group_id));
                    }
                }
                MemberKind::User => match self.account_id(&found.name).await? {
                    Some(user_id) => members.push(Member::User(user_id)),
                    None => debug!("Directory user '{}' has no account, skipping", found.name),
                },
            }
        }
        Ok(members)
    }

    async fn account_id(&self, directory_name: &str) -> ResolverResult<Option<UserId>> {
        if let Some(id) = self.users.username_to_id(directory_name).await? {
            return Ok(Some(id));
        }
        Ok(self.users.username_to_id(&account_name(directory_name)).await?)
    }

    /// Groups listing `member` directly, sorted by name. A directory group
    /// replaces a local group of the same name.
    pub async fn groups_of_member(&self, member: Member) -> ResolverResult<Vec<GroupSummary>> {
        let mut by_name: BTreeMap<String, GroupId> = self
            .local
            .groups_of_member(member)
            .await?
            .into_iter()
            .map(|g| (g.name, g.id))
            .collect();

        if let Some(dn) = self.member_dn(member).await? {
            for found in self.translator.search_groups(&dn, SearchMode::AsMember).await {
                let group = self.translator.to_group(&found).await?;
                by_name.insert(group.name, group.id);
            }
        }

        Ok(by_name
            .into_iter()
            .map(|(name, id)| GroupSummary { id, name })
            .collect())
    }

    /// Names and ids of groups whose name contains `substring`, ignoring
    /// case. Directory groups replace local groups of the same name.
    pub async fn search_matching_groups(&self, substring: &str) -> ResolverResult<BTreeMap<String, GroupId>> {
        let mut matching: BTreeMap<String, GroupId> = self
            .local
            .search(substring)
            .await?
            .into_iter()
            .map(|g| (g.name, g.id))
            .collect();

        for found in self
            .translator
            .search_groups(substring, SearchMode::ByNameSubstring)
            .await
        {
            let group = self.translator.to_group(&found).await?;
            matching.insert(group.name, group.id);
        }
        Ok(matching)
    }

    /// Create an account for every directory user that has none yet.
    /// Returns the names of the created accounts.
    pub async fn provision_directory_users(&self) -> ResolverResult<Vec<String>> {
        let mut created = Vec::new();
        for name in self.translator.list_user_names().await {
            let name = account_name(&name);
            if name.is_empty() || self.users.username_to_id(&name).await?.is_some() {
                continue;
            }
            self.users.create_user(&name).await?;
            created.push(name);
        }

        info!("Provisioned {} accounts from the directory", created.len());
        Ok(created)
    }
}
