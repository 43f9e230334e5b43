use super::backend::{Record, RecordBackend};
use crate::view::tree::NodeId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;

/// Record backend over an in-memory record set
///
/// Records are grouped by parent at construction so a lookup only touches
/// the matching records. Relative order within a parent is preserved.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    by_parent: HashMap<Option<NodeId>, Vec<Record>>,
    len: usize,
}

impl InMemoryBackend {
    /// Build a backend from records
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if two records share an id.
    pub fn from_records(records: Vec<Record>) -> io::Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut by_parent: HashMap<Option<NodeId>, Vec<Record>> = HashMap::new();
        let len = records.len();

        for record in records {
            if !seen.insert(record.id) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("duplicate record id {}", record.id.0),
                ));
            }
            by_parent.entry(record.parent_id).or_default().push(record);
        }

        Ok(Self { by_parent, len })
    }

    /// Parse a JSON array of records
    pub fn from_json_str(json: &str) -> io::Result<Self> {
        let records: Vec<Record> = serde_json::from_str(json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Self::from_records(records)
    }

    /// Load a JSON array of records from disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn lookup(&self, parent: Option<NodeId>) -> Vec<Record> {
        self.by_parent.get(&parent).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RecordBackend for InMemoryBackend {
    async fn records_with_parent(&self, parent: Option<NodeId>) -> io::Result<Vec<Record>> {
        Ok(self.lookup(parent))
    }
}
