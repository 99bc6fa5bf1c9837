use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::memory::Ledger;
use super::{DnMapping, IdMappingStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    mappings: Vec<DnMapping>,
}

/// DN ledger persisted to a YAML file.
///
/// A new row is written to disk before it becomes visible to readers. When
/// the write fails the row is discarded and the error is returned.
#[derive(Debug)]
pub struct FileIdMappingStore {
    path: PathBuf,
    ledger: RwLock<Ledger>,
}

impl FileIdMappingStore {
    /// Open the ledger at `path`, starting empty when the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = Self::load(&path).await?;
        info!(
            "Loaded {} DN mappings from {}",
            rows.len(),
            path.display()
        );
        Ok(Self {
            path,
            ledger: RwLock::new(Ledger::from_rows(rows)),
        })
    }

    async fn load(path: &Path) -> Result<Vec<DnMapping>> {
        if !path.exists() {
            warn!("DN mapping ledger not found at {}, starting empty", path.display());
            return Ok(vec![]);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read DN mapping ledger")?;
        let file: LedgerFile =
            serde_norway::from_str(&content).context("Failed to parse DN mapping ledger")?;

        let mut rows = file.mappings;
        rows.sort_by_key(|row| row.row_id);
        if rows.windows(2).any(|pair| pair[0].row_id == pair[1].row_id) {
            anyhow::bail!("DN mapping ledger {} contains duplicate rows", path.display());
        }
        Ok(rows)
    }

    async fn save(&self, rows: &[DnMapping]) -> Result<()> {
        let file = LedgerFile {
            mappings: rows.to_vec(),
        };
        let yaml = serde_norway::to_string(&file)?;
        tokio::fs::write(&self.path, yaml)
            .await
            .context("Failed to save DN mapping ledger")?;
        Ok(())
    }
}

#[async_trait]
impl IdMappingStore for FileIdMappingStore {
    async fn find_by_dn(&self, dn: &str) -> Result<Option<u64>> {
        Ok(self.ledger.read().await.by_dn.get(dn).copied())
    }

    async fn find_by_row(&self, row_id: u64) -> Result<Option<String>> {
        Ok(self.ledger.read().await.find_by_row(row_id))
    }

    async fn insert_or_get(&self, dn: &str) -> Result<u64> {
        let mut ledger = self.ledger.write().await;
        if let Some(row_id) = ledger.by_dn.get(dn) {
            return Ok(*row_id);
        }

        let row_id = ledger.push(dn);
        if let Err(e) = self.save(&ledger.rows).await {
            ledger.pop();
            return Err(e);
        }
        Ok(row_id)
    }
}
