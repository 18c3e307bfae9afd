use super::payload::encode_payload;
use super::{scan_prefixes, MetadataIndex, RawIndexEntry};
use crate::config::DEFAULT_COLUMN_STATS_PARTITION;
use crate::error::{Error, Result};
use crate::key::column_stats_key;
use crate::record::ColumnStatRecord;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

type Partition = BTreeMap<String, Option<Bytes>>;

/// Metadata index held in memory, keyed by table base path and partition.
///
/// Each partition is a sorted map so prefix lookups are range scans.
#[derive(Debug, Default)]
pub struct InMemoryMetadataIndex {
    tables: RwLock<HashMap<String, HashMap<String, Partition>>>,
}

impl InMemoryMetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` in the default column stats partition and returns its key.
    pub fn put_column_stats(
        &self,
        base_path: &str,
        partition_path: &str,
        record: &ColumnStatRecord,
    ) -> Result<String> {
        self.put_column_stats_in(base_path, DEFAULT_COLUMN_STATS_PARTITION, partition_path, record)
    }

    /// Stores `record` in the index partition `partition_name`.
    pub fn put_column_stats_in(
        &self,
        base_path: &str,
        partition_name: &str,
        partition_path: &str,
        record: &ColumnStatRecord,
    ) -> Result<String> {
        let key = column_stats_key(&record.column_name, partition_path, &record.file_name);
        let payload = encode_payload(record)?;
        self.put_raw(base_path, partition_name, key.clone(), Some(Bytes::from(payload)));
        Ok(key)
    }

    /// Replaces the stats of `(column, file)` with a tombstone.
    pub fn put_tombstone(
        &self,
        base_path: &str,
        partition_path: &str,
        column_name: &str,
        file_name: &str,
    ) -> String {
        self.put_tombstone_in(
            base_path,
            DEFAULT_COLUMN_STATS_PARTITION,
            partition_path,
            column_name,
            file_name,
        )
    }

    pub fn put_tombstone_in(
        &self,
        base_path: &str,
        partition_name: &str,
        partition_path: &str,
        column_name: &str,
        file_name: &str,
    ) -> String {
        let key = column_stats_key(column_name, partition_path, file_name);
        self.put_raw(base_path, partition_name, key.clone(), None);
        key
    }

    /// Stores an already encoded entry under `key`.
    pub fn put_raw(
        &self,
        base_path: &str,
        partition_name: &str,
        key: String,
        payload: Option<Bytes>,
    ) {
        let mut tables = self.tables.write();
        tables
            .entry(base_path.to_string())
            .or_default()
            .entry(partition_name.to_string())
            .or_default()
            .insert(key, payload);
    }

    /// Number of entries in one partition, tombstones included
    pub fn len(&self, base_path: &str, partition_name: &str) -> usize {
        self.tables
            .read()
            .get(base_path)
            .and_then(|partitions| partitions.get(partition_name))
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, base_path: &str, partition_name: &str) -> bool {
        self.len(base_path, partition_name) == 0
    }
}

impl MetadataIndex for InMemoryMetadataIndex {
    fn lookup_by_key_prefixes(
        &self,
        base_path: &str,
        encoded_keys: &[String],
        partition_name: &str,
    ) -> Result<Vec<RawIndexEntry>> {
        let tables = self.tables.read();
        let partitions = tables
            .get(base_path)
            .ok_or_else(|| Error::index_unavailable(base_path, "no metadata index for table"))?;
        let partition = partitions.get(partition_name).ok_or_else(|| {
            Error::index_unavailable(
                base_path,
                format!("partition {} is not initialized", partition_name),
            )
        })?;

        let mut entries = Vec::new();
        scan_prefixes(partition, encoded_keys, |key, payload| {
            entries.push(RawIndexEntry {
                key: key.clone(),
                payload: payload.clone(),
            });
        });
        Ok(entries)
    }
}
