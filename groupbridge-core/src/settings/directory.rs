use serde::Deserialize;

use crate::utils::secret::MaskedSecret;

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
pub struct ProxyAgentSettings {
    pub dn: String,
    pub password: MaskedSecret,
}

/// Directory layout and connection options.
#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
pub struct DirectorySettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_url")]
    pub url: String,
    pub user_base_dn: String,
    pub group_base_dn: String,
    #[serde(default = "default_user_object_class")]
    pub user_object_class: String,
    #[serde(default = "default_group_object_class")]
    pub group_object_class: String,
    /// Attribute of a group entry listing the DNs of its direct members.
    #[serde(default = "default_group_member_attribute")]
    pub group_member_attribute: String,
    #[serde(default = "default_group_name_attribute")]
    pub group_name_attribute: String,
    #[serde(default = "default_user_name_attribute")]
    pub user_name_attribute: String,
    #[serde(default)]
    pub lowercase_usernames: bool,
    pub proxy_agent: Option<ProxyAgentSettings>,
    /// Allows directory groups to be attached as members of local groups.
    #[serde(default)]
    pub allow_directory_group_members: bool,
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_url() -> String {
    "ldap://localhost:389".to_string()
}

fn default_user_object_class() -> String {
    "inetOrgPerson".to_string()
}

fn default_group_object_class() -> String {
    "groupOfNames".to_string()
}

fn default_group_member_attribute() -> String {
    "member".to_string()
}

fn default_group_name_attribute() -> String {
    "cn".to_string()
}

fn default_user_name_attribute() -> String {
    "uid".to_string()
}

fn default_connection_timeout_secs() -> u64 {
    5
}

impl DirectorySettings {
    /// Settings for the given base DNs with all other options at their defaults.
    pub fn with_base_dns(user_base_dn: impl Into<String>, group_base_dn: impl Into<String>) -> Self {
        Self {
            enabled: default_enabled(),
            url: default_url(),
            user_base_dn: user_base_dn.into(),
            group_base_dn: group_base_dn.into(),
            user_object_class: default_user_object_class(),
            group_object_class: default_group_object_class(),
            group_member_attribute: default_group_member_attribute(),
            group_name_attribute: default_group_name_attribute(),
            user_name_attribute: default_user_name_attribute(),
            lowercase_usernames: false,
            proxy_agent: None,
            allow_directory_group_members: false,
            connection_timeout_secs: default_connection_timeout_secs(),
        }
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self::with_base_dns("ou=people,dc=example,dc=org", "ou=groups,dc=example,dc=org")
    }
}
