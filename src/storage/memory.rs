// src/storage/memory.rs
use dashmap::DashMap;
use log::info;
use std::future::Future;
use std::path::Path;

use super::ServerStore;
use crate::error::StoreError;
use crate::models::server::{ServerId, ServerRecord};

/// In-process server list, optionally seeded from a JSON file.
#[derive(Debug, Default)]
pub struct MemoryServerStore {
    servers: DashMap<ServerId, ServerRecord>,
}

impl MemoryServerStore {
    pub fn new() -> Self {
        Self {
            servers: DashMap::new(),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = ServerRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.upsert(record);
        }
        store
    }

    /// Loads a JSON array of server records.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<ServerRecord> = serde_json::from_str(&raw)?;
        info!("Loaded {} servers from {}", records.len(), path.display());
        Ok(Self::with_records(records))
    }

    pub fn upsert(&self, record: ServerRecord) {
        self.servers.insert(record.server_id, record);
    }

    pub fn remove(&self, server_id: ServerId) -> Option<ServerRecord> {
        self.servers.remove(&server_id).map(|(_, record)| record)
    }

    pub fn set_enabled(&self, server_id: ServerId, enabled: bool) -> bool {
        match self.servers.get_mut(&server_id) {
            Some(mut record) => {
                record.is_enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn enabled(&self) -> Vec<ServerRecord> {
        let mut records: Vec<ServerRecord> = self
            .servers
            .iter()
            .filter(|r| r.value().is_enabled)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.server_id);
        records
    }
}

impl ServerStore for MemoryServerStore {
    fn list_enabled_servers(&self) -> impl Future<Output = Result<Vec<ServerRecord>, StoreError>> + Send {
        let records = self.enabled();
        async move {
            if records.is_empty() {
                return Err(StoreError::NoRows);
            }
            Ok(records)
        }
    }
}
