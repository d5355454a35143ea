//! Record store abstraction for the manager directory

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One attachment of a record's photo field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
}

/// A manager record as the store returns it.
///
/// The photo field may hold several attachments; only the first is used.
/// A record with no `Name` reads as a blank name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Photo", default)]
    pub photo: Vec<Attachment>,
}

impl StoreRecord {
    pub fn new(name: impl Into<String>, photos: &[&str]) -> Self {
        Self {
            name: name.into(),
            photo: photos.iter().map(|u| Attachment { url: u.to_string() }).collect(),
        }
    }
}

/// Read-only tabular store holding manager names and photos.
pub trait RecordStore: Send + Sync {
    /// First page of `Name` values, sorted ascending by the store.
    /// Blank names and duplicates are passed through as-is.
    fn list_names(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Up to `limit` records whose name equals `query` case-insensitively or
    /// contains it case-insensitively, in store order.
    fn find_candidates<'a>(&'a self, query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<StoreRecord>>>;
}

/// Store backed by a list of records, e.g. a JSON export of the table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<StoreRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<StoreRecord>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of `{ "Name": ..., "Photo": [{ "url": ... }] }` objects.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<StoreRecord> = serde_json::from_str(json)
            .map_err(|e| crate::Error::ConfigError(format!("invalid records file: {}", e)))?;
        Ok(Self::new(records))
    }
}

impl RecordStore for MemoryStore {
    fn list_names(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        let mut names: Vec<String> = self
            .records
            .iter()
            .filter(|r| !r.name.is_empty())
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        Box::pin(async move { Ok(names) })
    }

    fn find_candidates<'a>(&'a self, query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<StoreRecord>>> {
        let needle = query.trim().to_lowercase();
        let found: Vec<StoreRecord> = self
            .records
            .iter()
            .filter(|r| !r.name.is_empty() && r.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect();
        Box::pin(async move { Ok(found) })
    }
}
