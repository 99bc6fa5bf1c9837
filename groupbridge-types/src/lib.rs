/*!
 * Shared types for groupbridge
 *
 * Groups from the local store and groups read from the directory share one
 * identifier type. Ids below [`DIRECTORY_ID_OFFSET`] belong to local groups,
 * ids at or above it are synthetic ids minted for directory DNs.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// First id of the directory id space.
pub const DIRECTORY_ID_OFFSET: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl GroupId {
    /// Synthetic id for a row of the DN mapping ledger.
    pub fn from_mapping_row(row_id: u64) -> Self {
        GroupId(row_id + DIRECTORY_ID_OFFSET)
    }

    /// Row of the DN mapping ledger, `None` for local ids.
    pub fn mapping_row(&self) -> Option<u64> {
        self.0.checked_sub(DIRECTORY_ID_OFFSET)
    }

    pub fn is_directory(&self) -> bool {
        self.0 >= DIRECTORY_ID_OFFSET
    }

    pub fn is_local(&self) -> bool {
        !self.is_directory()
    }

    pub fn origin(&self) -> GroupOrigin {
        if self.is_directory() {
            GroupOrigin::Directory
        } else {
            GroupOrigin::Local
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum GroupOrigin {
    Local,
    Directory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    User,
    Group,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::User => "user",
            MemberKind::Group => "group",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<MemberKind> {
        match s.to_lowercase().as_str() {
            "user" => Some(MemberKind::User),
            "group" => Some(MemberKind::Group),
            _ => None,
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A direct member of a group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Member {
    User(UserId),
    Group(GroupId),
}

impl Member {
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::User(_) => MemberKind::User,
            Member::Group(_) => MemberKind::Group,
        }
    }

    pub fn raw_id(&self) -> u64 {
        match self {
            Member::User(id) => id.0,
            Member::Group(id) => id.0,
        }
    }

    pub fn from_parts(kind: MemberKind, id: u64) -> Self {
        match kind {
            MemberKind::User => Member::User(UserId(id)),
            MemberKind::Group => Member::Group(GroupId(id)),
        }
    }
}

/// A group from either store.
///
/// Directory groups are built transiently from search results and always
/// carry an empty member set; their members are read from the directory on
/// demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub origin: GroupOrigin,
    #[serde(default)]
    pub members: BTreeSet<Member>,
}

impl Group {
    pub fn local(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            origin: GroupOrigin::Local,
            members: BTreeSet::new(),
        }
    }

    pub fn directory(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            origin: GroupOrigin::Directory,
            members: BTreeSet::new(),
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.origin == GroupOrigin::Local
    }

    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_partition() {
        assert!(GroupId(0).is_local());
        assert!(GroupId(DIRECTORY_ID_OFFSET - 1).is_local());
        assert!(GroupId(DIRECTORY_ID_OFFSET).is_directory());
        assert_eq!(GroupId(42).mapping_row(), None);
        assert_eq!(GroupId::from_mapping_row(7).mapping_row(), Some(7));
        assert_eq!(GroupId::from_mapping_row(7).origin(), GroupOrigin::Directory);
    }

    #[test]
    fn test_member_serialization() {
        let member = Member::Group(GroupId(1_000_003));
        let json = serde_json::to_string(&member).unwrap();
        assert_eq!(json, r#"{"kind":"group","id":1000003}"#);

        let parsed: Member = serde_json::from_str(r#"{"kind":"user","id":5}"#).unwrap();
        assert_eq!(parsed, Member::User(UserId(5)));
    }

    #[test]
    fn test_directory_groups_are_immutable() {
        assert!(Group::local(GroupId(3), "editors").is_mutable());
        assert!(!Group::directory(GroupId::from_mapping_row(1), "editors").is_mutable());
    }
}
