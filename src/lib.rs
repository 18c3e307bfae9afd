//! Column statistics index reader and transposer.
//!
//! A table's metadata index keeps one stats entry per (file, column). For
//! data skipping, a planner reads the entries of the columns its filters
//! reference and pivots them into one row per file:
//!
//! ```no_run
//! use colstat_index::{metadata::SnapshotMetadataIndex, MetadataConfig};
//!
//! # fn main() -> colstat_index::Result<()> {
//! let index = SnapshotMetadataIndex::new();
//! let config = MetadataConfig::default();
//! let table = colstat_index::load_transposed_stats(&index, "/warehouse/orders", &config, &["amount", "region"])?;
//! for row in &table.rows {
//!     println!("{} {:?}", row.file_name, table.stats_for(row, "amount"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancellation;
pub mod config;
pub mod error;
pub mod key;
pub mod logging;
pub mod metadata;
pub mod reader;
pub mod record;
pub mod transpose;
pub mod value;

pub use cancellation::CancellationToken;
pub use config::{ConfigPreset, MetadataConfig};
pub use error::{Error, Result};
pub use metadata::{MetadataIndex, RawIndexEntry};
pub use reader::{read_column_stats_index, ColumnStatsIndexReader, ReadReport};
pub use record::{ColumnStatRecord, RowField, StatTriplet, TransposedRow};
pub use transpose::{
    transpose, transpose_cancellable, transpose_column_stats_index, transpose_with, FoldPool,
    TransposeOptions, TransposedTable,
};
pub use value::StatValue;

/// Reads the stats of `target_columns` and transposes them in one go, using
/// the fold settings of `metadata_config`. A dedicated fold pool is shared
/// between calls; see [`FoldPool::dedicated`].
pub fn load_transposed_stats<M, S>(
    index: &M,
    base_path: &str,
    metadata_config: &MetadataConfig,
    target_columns: &[S],
) -> Result<TransposedTable>
where
    M: MetadataIndex + ?Sized,
    S: AsRef<str>,
{
    let records = read_column_stats_index(index, base_path, metadata_config, target_columns)?;
    Ok(transpose_with(
        &records,
        target_columns,
        &TransposeOptions::from(metadata_config),
    ))
}
