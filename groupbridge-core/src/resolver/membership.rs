use groupbridge_types::{GroupId, Member};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

use super::HybridResolver;
use crate::directory::canonical_dn;
use crate::error::ResolverResult;
use crate::translator::SearchMode;

impl HybridResolver {
    /// Directory DN of a member. Local groups have none.
    pub(super) async fn member_dn(&self, member: Member) -> ResolverResult<Option<String>> {
        match member {
            Member::User(user_id) => {
                let Some(mut username) = self.users.id_to_username(user_id).await? else {
                    return Ok(None);
                };
                if self.translator.settings().lowercase_usernames {
                    username = username.to_lowercase();
                }
                Ok(self.translator.user_dn(&username).await)
            }
            Member::Group(group_id) if group_id.is_local() => Ok(None),
            Member::Group(group_id) => Ok(self.translator.mapper().dn_for_id(group_id).await?),
        }
    }

    /// Whether `child` is a member of `parent`, directly or, with
    /// `recursive`, through any chain of local and directory groups.
    pub async fn is_member(&self, parent: GroupId, child: Member, recursive: bool) -> ResolverResult<bool> {
        if parent.is_local() && self.local.is_member(parent, child, recursive).await? {
            return Ok(true);
        }

        let Some(child_dn) = self.member_dn(child).await? else {
            return Ok(false);
        };

        let mut visited = HashSet::from([canonical_dn(&child_dn)]);
        let mut frontier = VecDeque::from([child_dn]);

        while let Some(dn) = frontier.pop_front() {
            for found in self.translator.search_groups(&dn, SearchMode::AsMember).await {
                let group_id = self.translator.to_group(&found).await?.id;
                if group_id == parent {
                    return Ok(true);
                }
                // A directory group may itself be nested in a local group
                if recursive
                    && parent.is_local()
                    && self
                        .local
                        .is_member(parent, Member::Group(group_id), true)
                        .await?
                {
                    return Ok(true);
                }
                if visited.insert(canonical_dn(&found.dn)) {
                    frontier.push_back(found.dn);
                }
            }

            if !recursive {
                break;
            }
        }

        debug!(
            parent = %parent,
            child = %child.raw_id(),
            visited = visited.len(),
            "Membership not found"
        );
        Ok(false)
    }
}
