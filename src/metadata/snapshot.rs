//! Read-only metadata index backed by one snapshot file per partition.
//!
//! Layout: `[<root>/]<base_path>/.metadata/<partition>.snapshot`
//!
//! ```text
//! header: "CSIX" | version u8
//! frame:  len u32 LE | crc32 u32 LE | bincode SnapshotEntry
//! ```
//!
//! Frames are applied in file order, so a later frame for the same key
//! replaces an earlier one. Any framing damage makes the whole snapshot
//! unavailable: once a length prefix can't be trusted, neither can anything
//! after it.

use super::{scan_prefixes, MetadataIndex, RawIndexEntry};
use crate::error::{Error, Result};
use bincode::{Decode, Encode};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const SNAPSHOT_MAGIC: &[u8; 4] = b"CSIX";
const SNAPSHOT_VERSION: u8 = 1;
const SNAPSHOT_HEADER_LEN: usize = 5;
const FRAME_HEADER_LEN: usize = 8;

pub const DEFAULT_METADATA_DIR: &str = ".metadata";

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct SnapshotEntry {
    pub key: String,
    pub payload: Option<Vec<u8>>,
}

/// Snapshot-backed index. Without a root, table base paths are used as
/// filesystem paths as they are; with [`SnapshotMetadataIndex::open`] they
/// are resolved relative to the root.
#[derive(Debug, Clone)]
pub struct SnapshotMetadataIndex {
    root: Option<PathBuf>,
    metadata_dir: String,
}

impl Default for SnapshotMetadataIndex {
    fn default() -> Self {
        Self {
            root: None,
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
        }
    }
}

impl SnapshotMetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index over the tables stored under `root`. A base path of
    /// `/warehouse/orders` then maps to `<root>/warehouse/orders`.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Uses `metadata_dir` instead of `.metadata` under each table.
    pub fn with_metadata_dir(mut self, metadata_dir: impl Into<String>) -> Self {
        self.metadata_dir = metadata_dir.into();
        self
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn snapshot_path(&self, base_path: &str, partition_name: &str) -> PathBuf {
        let table_dir = match &self.root {
            Some(root) => root.join(base_path.trim_start_matches('/')),
            None => PathBuf::from(base_path),
        };
        table_dir
            .join(&self.metadata_dir)
            .join(format!("{}.snapshot", partition_name))
    }

    /// Writes `entries` as the snapshot of `partition_name` for the table at
    /// `base_path`, replacing any previous snapshot.
    pub fn write_snapshot(
        &self,
        base_path: &str,
        partition_name: &str,
        entries: &[SnapshotEntry],
    ) -> Result<PathBuf> {
        let path = self.snapshot_path(base_path, partition_name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut buffer = Vec::with_capacity(SNAPSHOT_HEADER_LEN);
        buffer.extend_from_slice(SNAPSHOT_MAGIC);
        buffer.push(SNAPSHOT_VERSION);

        for entry in entries {
            let frame = bincode::encode_to_vec(entry, bincode::config::standard()).map_err(|e| {
                Error::Serialization(format!("Failed to encode snapshot entry: {}", e))
            })?;
            buffer.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            buffer.extend_from_slice(&crc32fast::hash(&frame).to_le_bytes());
            buffer.extend_from_slice(&frame);
        }

        let mut file = fs::File::create(&path)?;
        file.write_all(&buffer)?;
        file.sync_all()?;
        debug!(path = %path.display(), entries = entries.len(), "Wrote metadata snapshot");
        Ok(path)
    }

    fn load(&self, base_path: &str, partition_name: &str) -> Result<BTreeMap<String, Option<Bytes>>> {
        let path = self.snapshot_path(base_path, partition_name);
        let data = fs::read(&path).map_err(|e| {
            Error::index_unavailable(base_path, format!("cannot read {}: {}", path.display(), e))
        })?;

        parse_snapshot(&data).map_err(|reason| {
            Error::index_unavailable(base_path, format!("{}: {}", path.display(), reason))
        })
    }
}

impl MetadataIndex for SnapshotMetadataIndex {
    fn lookup_by_key_prefixes(
        &self,
        base_path: &str,
        encoded_keys: &[String],
        partition_name: &str,
    ) -> Result<Vec<RawIndexEntry>> {
        let entries = self.load(base_path, partition_name)?;
        debug!(
            base_path,
            partition = partition_name,
            snapshot_entries = entries.len(),
            "Loaded metadata snapshot"
        );

        let mut matched = Vec::new();
        scan_prefixes(&entries, encoded_keys, |key, payload| {
            matched.push(RawIndexEntry {
                key: key.clone(),
                payload: payload.clone(),
            });
        });
        Ok(matched)
    }
}

fn parse_snapshot(data: &[u8]) -> std::result::Result<BTreeMap<String, Option<Bytes>>, String> {
    if data.len() < SNAPSHOT_HEADER_LEN || &data[..4] != SNAPSHOT_MAGIC {
        return Err("not a column stats snapshot".to_string());
    }
    if data[4] != SNAPSHOT_VERSION {
        return Err(format!("unsupported snapshot version {}", data[4]));
    }

    let mut entries = BTreeMap::new();
    let mut offset = SNAPSHOT_HEADER_LEN;

    while offset < data.len() {
        if offset + FRAME_HEADER_LEN > data.len() {
            return Err(format!("truncated frame header at offset {}", offset));
        }

        let len = u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;
        let expected = u32::from_le_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]);
        offset += FRAME_HEADER_LEN;

        if offset + len > data.len() {
            return Err(format!(
                "truncated frame at offset {}: expected {} bytes, found {}",
                offset,
                len,
                data.len() - offset
            ));
        }

        let frame = &data[offset..offset + len];
        let actual = crc32fast::hash(frame);
        if actual != expected {
            return Err(format!(
                "frame checksum mismatch at offset {}: expected {:08x}, found {:08x}",
                offset, expected, actual
            ));
        }

        let (entry, _): (SnapshotEntry, usize) =
            bincode::decode_from_slice(frame, bincode::config::standard())
                .map_err(|e| format!("undecodable frame at offset {}: {}", offset, e))?;
        entries.insert(entry.key, entry.payload.map(Bytes::from));
        offset += len;
    }

    Ok(entries)
}

/// Writes a snapshot under `base_path/.metadata`, see
/// [`SnapshotMetadataIndex::write_snapshot`].
pub fn write_snapshot(
    base_path: &str,
    partition_name: &str,
    entries: &[SnapshotEntry],
) -> Result<PathBuf> {
    SnapshotMetadataIndex::new().write_snapshot(base_path, partition_name, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_COLUMN_STATS_PARTITION;
    use crate::key::{column_stats_key, encode_column_prefixes};
    use tempfile::TempDir;

    fn entry(column: &str, file: &str, payload: &[u8]) -> SnapshotEntry {
        SnapshotEntry {
            key: column_stats_key(column, ".", file),
            payload: Some(payload.to_vec()),
        }
    }

    #[test]
    fn test_snapshot_lookup() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap();
        write_snapshot(
            base,
            DEFAULT_COLUMN_STATS_PARTITION,
            &[entry("a", "f1", b"one"), entry("b", "f1", b"two"), entry("a", "f2", b"three")],
        )
        .unwrap();

        let index = SnapshotMetadataIndex::new();
        let found = index
            .lookup_by_key_prefixes(base, &encode_column_prefixes(&["a"]), DEFAULT_COLUMN_STATS_PARTITION)
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.key.starts_with(&encode_column_prefixes(&["a"])[0])));
    }

    #[test]
    fn test_later_frame_wins() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap();
        let mut tombstone = entry("a", "f1", b"");
        tombstone.payload = None;
        write_snapshot(
            base,
            DEFAULT_COLUMN_STATS_PARTITION,
            &[entry("a", "f1", b"old"), tombstone],
        )
        .unwrap();

        let found = SnapshotMetadataIndex::new()
            .lookup_by_key_prefixes(base, &encode_column_prefixes(&["a"]), DEFAULT_COLUMN_STATS_PARTITION)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_tombstone());
    }

    #[test]
    fn test_missing_snapshot_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = SnapshotMetadataIndex::new()
            .lookup_by_key_prefixes(
                dir.path().to_str().unwrap(),
                &encode_column_prefixes(&["a"]),
                DEFAULT_COLUMN_STATS_PARTITION,
            )
            .unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable { .. }));
    }

    #[test]
    fn test_corrupt_snapshot_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap();
        let path = write_snapshot(base, DEFAULT_COLUMN_STATS_PARTITION, &[entry("a", "f1", b"x")]).unwrap();

        let mut data = fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0x55;
        fs::write(&path, &data).unwrap();

        let err = SnapshotMetadataIndex::new()
            .lookup_by_key_prefixes(base, &encode_column_prefixes(&["a"]), DEFAULT_COLUMN_STATS_PARTITION)
            .unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));

        fs::write(&path, &data[..data.len() - 2]).unwrap();
        let err = SnapshotMetadataIndex::new()
            .lookup_by_key_prefixes(base, &encode_column_prefixes(&["a"]), DEFAULT_COLUMN_STATS_PARTITION)
            .unwrap_err();
        assert!(err.to_string().contains("truncated frame"));
    }

    #[test]
    fn test_custom_metadata_dir_round_trip() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap();
        let index = SnapshotMetadataIndex::new().with_metadata_dir(".hoodie/metadata");
        let path = index
            .write_snapshot(base, DEFAULT_COLUMN_STATS_PARTITION, &[entry("a", "f1", b"x")])
            .unwrap();
        assert_eq!(
            path,
            dir.path().join(".hoodie/metadata").join("column_stats.snapshot")
        );

        let found = index
            .lookup_by_key_prefixes(base, &encode_column_prefixes(&["a"]), DEFAULT_COLUMN_STATS_PARTITION)
            .unwrap();
        assert_eq!(found.len(), 1);

        // The default directory holds nothing for this table
        let err = SnapshotMetadataIndex::new()
            .lookup_by_key_prefixes(base, &encode_column_prefixes(&["a"]), DEFAULT_COLUMN_STATS_PARTITION)
            .unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable { .. }));
    }

    #[test]
    fn test_open_resolves_base_path_under_root() {
        let dir = TempDir::new().unwrap();
        let index = SnapshotMetadataIndex::open(dir.path());
        assert_eq!(index.root(), Some(dir.path()));
        assert_eq!(
            index.snapshot_path("/warehouse/t1", "column_stats"),
            dir.path().join("warehouse/t1/.metadata/column_stats.snapshot")
        );

        index
            .write_snapshot("/warehouse/t1", DEFAULT_COLUMN_STATS_PARTITION, &[entry("a", "f1", b"x")])
            .unwrap();
        let found = index
            .lookup_by_key_prefixes(
                "/warehouse/t1",
                &encode_column_prefixes(&["a"]),
                DEFAULT_COLUMN_STATS_PARTITION,
            )
            .unwrap();
        assert_eq!(found.len(), 1);

        let err = index
            .lookup_by_key_prefixes(
                "/warehouse/t2",
                &encode_column_prefixes(&["a"]),
                DEFAULT_COLUMN_STATS_PARTITION,
            )
            .unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable { .. }));
    }
}
