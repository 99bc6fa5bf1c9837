use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{DnMapping, IdMappingStore};

#[derive(Debug, Default)]
pub(super) struct Ledger {
    pub(super) rows: Vec<DnMapping>,
    pub(super) by_dn: HashMap<String, u64>,
}

impl Ledger {
    pub(super) fn from_rows(rows: Vec<DnMapping>) -> Self {
        let by_dn = rows.iter().map(|row| (row.dn.clone(), row.row_id)).collect();
        Self { rows, by_dn }
    }

    pub(super) fn next_row_id(&self) -> u64 {
        self.rows.last().map(|row| row.row_id + 1).unwrap_or(1)
    }

    pub(super) fn find_by_row(&self, row_id: u64) -> Option<String> {
        // Rows are appended in ascending order
        self.rows
            .binary_search_by_key(&row_id, |row| row.row_id)
            .ok()
            .map(|idx| self.rows[idx].dn.clone())
    }

    pub(super) fn push(&mut self, dn: &str) -> u64 {
        let row_id = self.next_row_id();
        self.rows.push(DnMapping {
            row_id,
            dn: dn.to_string(),
        });
        self.by_dn.insert(dn.to_string(), row_id);
        row_id
    }

    pub(super) fn pop(&mut self) {
        if let Some(row) = self.rows.pop() {
            self.by_dn.remove(&row.dn);
        }
    }
}

/// Ledger kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryIdMappingStore {
    ledger: RwLock<Ledger>,
}

impl MemoryIdMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.ledger.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ledger.read().await.rows.is_empty()
    }
}

#[async_trait]
impl IdMappingStore for MemoryIdMappingStore {
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
        Ok(ledger.push(dn))
    }
}
