use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use xxhash_rust::xxh3::xxh3_128;
use xxhash_rust::xxh64::xxh64;

/// Seed shared by every 64-bit id so keys stay stable across processes.
const HASH_SEED: u64 = 0xdaba_daba;

/// Partition id used for tables without partition columns.
pub const NON_PARTITIONED_PATH: &str = ".";

/// Encoded length of a 64-bit id (8 bytes, padded base64).
pub const ID64_ENCODED_LEN: usize = 12;
/// Encoded length of a 128-bit id (16 bytes, padded base64).
pub const ID128_ENCODED_LEN: usize = 24;

fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

macro_rules! id64 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            pub fn new(name: &str) -> Self {
                Self(xxh64(name.as_bytes(), HASH_SEED))
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn to_bytes(&self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            pub fn as_base64(&self) -> String {
                encode(&self.to_bytes())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.as_base64())
            }
        }
    };
}

id64!(
    /// Hashed id of a column name; the key prefix of all of its stats.
    ColumnIndexId
);

id64!(
    /// Hashed id of a partition path.
    PartitionIndexId
);

/// Hashed id of a data file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileIndexId(u128);

impl FileIndexId {
    pub fn new(file_name: &str) -> Self {
        Self(xxh3_128(file_name.as_bytes()))
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    pub fn as_base64(&self) -> String {
        encode(&self.to_bytes())
    }
}

/// Full key of a column stats entry: column id, then partition id, then
/// file id. Every component has a fixed encoded width, so the column id
/// alone is an unambiguous prefix.
pub fn column_stats_key(column_name: &str, partition_path: &str, file_name: &str) -> String {
    let mut key = String::with_capacity(2 * ID64_ENCODED_LEN + ID128_ENCODED_LEN);
    key.push_str(&ColumnIndexId::new(column_name).as_base64());
    key.push_str(&PartitionIndexId::new(partition_path).as_base64());
    key.push_str(&FileIndexId::new(file_name).as_base64());
    key
}

/// Key prefixes for a set of columns: deduplicated and sorted, so the same
/// column set always yields the same lookup regardless of argument order.
pub fn encode_column_prefixes<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
    let mut keys: Vec<String> = columns
        .iter()
        .map(|c| ColumnIndexId::new(c.as_ref()).as_base64())
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_id_is_stable() {
        let a = ColumnIndexId::new("price");
        let b = ColumnIndexId::new("price");
        assert_eq!(a, b);
        assert_eq!(a.as_base64(), b.as_base64());
        assert_ne!(a, ColumnIndexId::new("Price"));
    }

    #[test]
    fn test_encoded_widths() {
        assert_eq!(ColumnIndexId::new("a").as_base64().len(), ID64_ENCODED_LEN);
        assert_eq!(
            PartitionIndexId::new(NON_PARTITIONED_PATH).as_base64().len(),
            ID64_ENCODED_LEN
        );
        assert_eq!(
            FileIndexId::new("f1.parquet").as_base64().len(),
            ID128_ENCODED_LEN
        );
        assert_eq!(
            column_stats_key("a", "dt=2024-01-01", "f1.parquet").len(),
            2 * ID64_ENCODED_LEN + ID128_ENCODED_LEN
        );
    }

    #[test]
    fn test_full_key_starts_with_column_prefix() {
        let key = column_stats_key("amount", "dt=2024-01-01", "part-0001.parquet");
        assert!(key.starts_with(&ColumnIndexId::new("amount").as_base64()));
        assert!(!key.starts_with(&ColumnIndexId::new("amount2").as_base64()));
    }

    #[test]
    fn test_prefixes_are_order_independent() {
        let forward = encode_column_prefixes(&["a", "b", "c"]);
        let backward = encode_column_prefixes(&["c", "b", "a", "b"]);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3);
    }
}
