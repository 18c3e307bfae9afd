pub mod memory;
pub mod payload;
pub mod snapshot;

use crate::error::Result;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::Bound;

pub use memory::InMemoryMetadataIndex;
pub use payload::{decode_payload, encode_payload};
pub use snapshot::{write_snapshot, SnapshotEntry, SnapshotMetadataIndex};

/// One entry of a metadata index partition.
///
/// `payload` is `None` for tombstones left behind by deleted files.
#[derive(Debug, Clone, PartialEq)]
pub struct RawIndexEntry {
    pub key: String,
    pub payload: Option<Bytes>,
}

impl RawIndexEntry {
    pub fn new(key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            payload: Some(payload.into()),
        }
    }

    pub fn tombstone(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            payload: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.payload.is_none()
    }
}

/// Key-prefix lookup capability over a table's metadata index.
///
/// Implementations return every entry of `partition_name` whose key starts
/// with any of `encoded_keys`, in one round trip. A missing or unreadable
/// index is an `Error::IndexUnavailable`; an index that simply has no
/// matching entries returns an empty list.
pub trait MetadataIndex: Send + Sync {
    fn lookup_by_key_prefixes(
        &self,
        base_path: &str,
        encoded_keys: &[String],
        partition_name: &str,
    ) -> Result<Vec<RawIndexEntry>>;
}

impl<T: MetadataIndex + ?Sized> MetadataIndex for &T {
    fn lookup_by_key_prefixes(
        &self,
        base_path: &str,
        encoded_keys: &[String],
        partition_name: &str,
    ) -> Result<Vec<RawIndexEntry>> {
        (**self).lookup_by_key_prefixes(base_path, encoded_keys, partition_name)
    }
}

impl<T: MetadataIndex + ?Sized> MetadataIndex for std::sync::Arc<T> {
    fn lookup_by_key_prefixes(
        &self,
        base_path: &str,
        encoded_keys: &[String],
        partition_name: &str,
    ) -> Result<Vec<RawIndexEntry>> {
        (**self).lookup_by_key_prefixes(base_path, encoded_keys, partition_name)
    }
}

/// Visits every entry of a sorted map whose key starts with one of
/// `prefixes`, once per entry. Each surviving prefix is a single range scan.
pub(crate) fn scan_prefixes<'a, V, F>(
    entries: &'a BTreeMap<String, V>,
    prefixes: &[String],
    mut emit: F,
) where
    F: FnMut(&'a String, &'a V),
{
    let mut sorted: Vec<&str> = prefixes.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    // After sorting, a prefix covered by a shorter one directly follows it
    let mut covering: Option<&str> = None;
    for prefix in sorted {
        if covering.is_some_and(|c| prefix.starts_with(c)) {
            continue;
        }
        covering = Some(prefix);

        for (key, value) in entries.range::<str, _>((Bound::Included(prefix), Bound::Unbounded)) {
            if !key.starts_with(prefix) {
                break;
            }
            emit(key, value);
        }
    }
}
