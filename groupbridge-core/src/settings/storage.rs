use serde::Deserialize;

/// Where local groups and the DN mapping ledger are persisted.
///
/// A missing path keeps the data in memory only.
#[derive(Debug, Deserialize, Clone, Default)]
#[allow(unused)]
pub struct StorageSettings {
    pub groups_file: Option<String>,
    pub id_mapping_file: Option<String>,
}
