//! Translation of directory search results into groups.

use anyhow::Result;
use groupbridge_types::{Group, MemberKind};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::directory::{canonical_dn, DirectoryClient, DirectoryEntry, Filter};
use crate::identifier::IdentifierMapper;
use crate::settings::directory::DirectorySettings;

/// Filter shape of a group search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Group name equals the probe.
    ByName,
    /// Group name contains the probe.
    ByNameSubstring,
    /// Groups whose membership attribute lists the probe DN.
    AsMember,
    /// The probe is the search base; returns the entry and its subtree.
    ByDn,
    /// Every group under the group base; the probe is ignored.
    All,
}

/// Name and DN of a directory group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroupRef {
    pub name: String,
    pub dn: String,
}

/// A resolved member of a directory group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMember {
    pub dn: String,
    pub name: String,
}

pub struct DirectoryGroupTranslator {
    client: Arc<dyn DirectoryClient>,
    settings: DirectorySettings,
    mapper: IdentifierMapper,
}

impl DirectoryGroupTranslator {
    pub fn new(
        client: Arc<dyn DirectoryClient>,
        settings: DirectorySettings,
        mapper: IdentifierMapper,
    ) -> Self {
        Self {
            client,
            settings,
            mapper,
        }
    }

    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    pub fn mapper(&self) -> &IdentifierMapper {
        &self.mapper
    }

    fn group_class(&self) -> Filter {
        Filter::object_class(&self.settings.group_object_class)
    }

    /// Named group entries, for enumeration.
    fn all_groups(&self) -> Filter {
        Filter::and(vec![
            Filter::present(&self.settings.group_name_attribute),
            self.group_class(),
        ])
    }

    fn user_class(&self) -> Filter {
        Filter::object_class(&self.settings.user_object_class)
    }

    /// Value test on `attribute`. The probe is always matched literally.
    fn value_filter(attribute: &str, probe: &str, substring: bool) -> Filter {
        if substring {
            Filter::contains(attribute, probe)
        } else {
            Filter::equals(attribute, probe)
        }
    }

    fn group_ref(&self, entry: &DirectoryEntry) -> Option<DirectoryGroupRef> {
        let name = entry.first(&self.settings.group_name_attribute)?;
        Some(DirectoryGroupRef {
            name: name.to_string(),
            dn: entry.dn.clone(),
        })
    }

    pub async fn search_groups(&self, probe: &str, mode: SearchMode) -> Vec<DirectoryGroupRef> {
        let s = &self.settings;
        let (base, filter) = match mode {
            SearchMode::AsMember => (
                s.group_base_dn.as_str(),
                Filter::and(vec![
                    Self::value_filter(&s.group_member_attribute, probe, false),
                    self.group_class(),
                ]),
            ),
            SearchMode::ByName => (
                s.group_base_dn.as_str(),
                Filter::and(vec![
                    Self::value_filter(&s.group_name_attribute, probe, false),
                    self.group_class(),
                ]),
            ),
            SearchMode::ByNameSubstring => (
                s.group_base_dn.as_str(),
                Filter::and(vec![
                    Self::value_filter(&s.group_name_attribute, probe, true),
                    self.group_class(),
                ]),
            ),
            SearchMode::ByDn => (probe, self.group_class()),
            SearchMode::All => (s.group_base_dn.as_str(), self.all_groups()),
        };

        let entries = self
            .client
            .search(base, &filter, &[s.group_name_attribute.as_str()])
            .await;
        let groups: Vec<DirectoryGroupRef> =
            entries.iter().filter_map(|e| self.group_ref(e)).collect();
        debug!(probe = %probe, mode = ?mode, found = groups.len(), "Searched directory groups");
        groups
    }

    /// Direct members of a directory group that are entries of the requested
    /// kind. Member DNs that do not resolve are skipped.
    pub async fn search_members(&self, group_dn: &str, kind: MemberKind) -> Vec<DirectoryMember> {
        let s = &self.settings;
        let Some(group) = self
            .client
            .read_entry(group_dn, &[s.group_member_attribute.as_str(), "objectClass"])
            .await
        else {
            return vec![];
        };
        if !self.group_class().matches(&group) {
            return vec![];
        }

        let (class, name_attribute) = match kind {
            MemberKind::User => (self.user_class(), s.user_name_attribute.as_str()),
            MemberKind::Group => (self.group_class(), s.group_name_attribute.as_str()),
        };

        let mut members = Vec::new();
        for member_dn in group.values(&s.group_member_attribute) {
            let Some(entry) = self
                .client
                .read_entry(member_dn, &["objectClass", name_attribute])
                .await
            else {
                continue;
            };
            if !class.matches(&entry) {
                continue;
            }
            if let Some(name) = entry.first(name_attribute) {
                members.push(DirectoryMember {
                    dn: entry.dn.clone(),
                    name: name.to_string(),
                });
            }
        }
        members
    }

    pub async fn to_group(&self, group: &DirectoryGroupRef) -> Result<Group> {
        let id = self
            .mapper
            .id_for_dn(&group.dn, true)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No id allocated for '{}'", group.dn))?;
        Ok(Group::directory(id, group.name.clone()))
    }

    /// Translate a single entry read by DN.
    pub async fn read_group(&self, dn: &str) -> Result<Option<Group>> {
        let entry = self
            .client
            .read_entry(dn, &[self.settings.group_name_attribute.as_str(), "objectClass"])
            .await;
        match entry.filter(|e| self.group_class().matches(e)).and_then(|e| self.group_ref(&e)) {
            Some(group_ref) => Ok(Some(self.to_group(&group_ref).await?)),
            None => Ok(None),
        }
    }

    /// Canonical entry DN of a user.
    pub async fn user_dn(&self, username: &str) -> Option<String> {
        let s = &self.settings;
        let filter = Filter::and(vec![
            Filter::equals(&s.user_name_attribute, username),
            self.user_class(),
        ]);
        self.client
            .search(&s.user_base_dn, &filter, &[s.user_name_attribute.as_str()])
            .await
            .into_iter()
            .next()
            .map(|entry| canonical_dn(&entry.dn))
    }

    /// Directory groups that are not a member of another directory group.
    pub async fn root_group_dns(&self) -> Vec<String> {
        let s = &self.settings;
        let entries = self
            .client
            .search(
                &s.group_base_dn,
                &self.all_groups(),
                &[s.group_member_attribute.as_str()],
            )
            .await;

        let nested: HashSet<String> = entries
            .iter()
            .flat_map(|e| e.values(&s.group_member_attribute))
            .map(|dn| canonical_dn(dn))
            .collect();

        entries
            .into_iter()
            .map(|e| e.dn)
            .filter(|dn| !nested.contains(&canonical_dn(dn)))
            .collect()
    }

    pub async fn list_user_names(&self) -> Vec<String> {
        let s = &self.settings;
        self.client
            .search(&s.user_base_dn, &self.user_class(), &[s.user_name_attribute.as_str()])
            .await
            .iter()
            .filter_map(|e| e.first(&s.user_name_attribute).map(str::to_string))
            .collect()
    }

    pub async fn ensure_connected(&self) -> bool {
        self.client.ensure_connected().await
    }
}

impl std::fmt::Debug for DirectoryGroupTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryGroupTranslator")
            .field("group_base_dn", &self.settings.group_base_dn)
            .field("user_base_dn", &self.settings.user_base_dn)
            .finish_non_exhaustive()
    }
}
