#![allow(dead_code)]

use colstat_index::config::DEFAULT_COLUMN_STATS_PARTITION;
use colstat_index::key::{column_stats_key, NON_PARTITIONED_PATH};
use colstat_index::metadata::{
    encode_payload, write_snapshot, InMemoryMetadataIndex, SnapshotEntry, SnapshotMetadataIndex,
};
use colstat_index::{ColumnStatRecord, StatValue};
use tempfile::TempDir;

pub const TABLE: &str = "/warehouse/orders";

/// Records of the reference two-file table: f2 was indexed before column B
/// was added to the index.
pub fn scenario_a_records() -> Vec<ColumnStatRecord> {
    vec![
        ColumnStatRecord::new("f1", "A", 1i64, 10i64, 0, 100),
        ColumnStatRecord::new("f1", "B", -5i64, 5i64, 2, 100),
        ColumnStatRecord::new("f2", "A", -10i64, 0i64, 5, 50),
    ]
}

/// A mixed-type table with one fully null column in one file.
pub fn orders_records() -> Vec<ColumnStatRecord> {
    vec![
        ColumnStatRecord::new("part-0.parquet", "id", 1i64, 500i64, 0, 500),
        ColumnStatRecord::new("part-0.parquet", "region", "apac", "emea", 10, 500),
        ColumnStatRecord::new("part-0.parquet", "shipped", StatValue::Absent, StatValue::Absent, 500, 500),
        ColumnStatRecord::new("part-1.parquet", "id", 501i64, 900i64, 0, 400),
        ColumnStatRecord::new("part-1.parquet", "region", "amer", "apac", 0, 400),
        ColumnStatRecord::new(
            "part-1.parquet",
            "shipped",
            StatValue::TimestampMicros(1_700_000_000_000_000),
            StatValue::TimestampMicros(1_700_086_400_000_000),
            12,
            400,
        ),
        ColumnStatRecord::new("part-2.parquet", "id", 901i64, 1000i64, 0, 100),
    ]
}

pub fn memory_index(base_path: &str, records: &[ColumnStatRecord]) -> InMemoryMetadataIndex {
    let index = InMemoryMetadataIndex::new();
    for record in records {
        index
            .put_column_stats(base_path, NON_PARTITIONED_PATH, record)
            .expect("Failed to store column stats");
    }
    index
}

pub struct SnapshotTable {
    pub dir: TempDir,
}

pub fn snapshot_entries(records: &[ColumnStatRecord]) -> Vec<SnapshotEntry> {
    records
        .iter()
        .map(|record| SnapshotEntry {
            key: column_stats_key(&record.column_name, NON_PARTITIONED_PATH, &record.file_name),
            payload: Some(encode_payload(record).expect("Failed to encode payload")),
        })
        .collect()
}

impl SnapshotTable {
    pub fn new(records: &[ColumnStatRecord]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let entries = snapshot_entries(records);
        write_snapshot(
            dir.path().to_str().expect("Non UTF-8 temp dir"),
            DEFAULT_COLUMN_STATS_PARTITION,
            &entries,
        )
        .expect("Failed to write snapshot");
        Self { dir }
    }

    /// A table stored at `base_path` under a temp root, using `index_for` to
    /// pick the metadata directory.
    pub fn under_root(
        records: &[ColumnStatRecord],
        base_path: &str,
        index_for: impl Fn(&std::path::Path) -> SnapshotMetadataIndex,
    ) -> (Self, SnapshotMetadataIndex) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let index = index_for(dir.path());
        index
            .write_snapshot(base_path, DEFAULT_COLUMN_STATS_PARTITION, &snapshot_entries(records))
            .expect("Failed to write snapshot");
        (Self { dir }, index)
    }

    pub fn base_path(&self) -> &str {
        self.dir.path().to_str().expect("Non UTF-8 temp dir")
    }
}
