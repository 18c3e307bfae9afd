use crate::config::MetadataConfig;
use crate::error::{Error, Result};
use crate::key::encode_column_prefixes;
use crate::metadata::{decode_payload, MetadataIndex};
use crate::record::ColumnStatRecord;
use crate::transpose::{transpose_with, TransposeOptions, TransposedTable};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of one column stats read, including what was skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadReport {
    pub records: Vec<ColumnStatRecord>,
    /// Entries returned by the index before any filtering
    pub entries_matched: usize,
    /// Entries without a usable payload (tombstones or deleted stats)
    pub tombstones_skipped: usize,
    pub decode_failures: usize,
}

/// Reads per-(file, column) statistics for a set of columns out of a
/// table's metadata index.
#[derive(Debug, Clone)]
pub struct ColumnStatsIndexReader<M> {
    index: M,
    config: MetadataConfig,
    fold: TransposeOptions,
}

impl<M: MetadataIndex> ColumnStatsIndexReader<M> {
    /// Validates `config` and sets up the fold pool it asks for.
    pub fn new(index: M, config: MetadataConfig) -> Result<Self> {
        config.validate()?;
        let fold = TransposeOptions::from(&config);
        Ok(Self { index, config, fold })
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    pub fn transpose_options(&self) -> &TransposeOptions {
        &self.fold
    }

    pub fn read<S: AsRef<str>>(
        &self,
        base_path: &str,
        target_columns: &[S],
    ) -> Result<Vec<ColumnStatRecord>> {
        self.read_with_report(base_path, target_columns)
            .map(|report| report.records)
    }

    pub fn read_with_report<S: AsRef<str>>(
        &self,
        base_path: &str,
        target_columns: &[S],
    ) -> Result<ReadReport> {
        read_report(&self.index, base_path, &self.config, target_columns)
    }

    /// Reads the stats of `target_columns` and transposes them.
    pub fn load<S: AsRef<str>>(
        &self,
        base_path: &str,
        target_columns: &[S],
    ) -> Result<TransposedTable> {
        let records = self.read(base_path, target_columns)?;
        Ok(transpose_with(&records, target_columns, &self.fold))
    }
}

/// Reads the column stats of `target_columns` for the table at `base_path`.
///
/// Fails with `InvalidArgument` when no column is given: the lookup is
/// prefix based and an empty prefix set has no meaning here.
pub fn read_column_stats_index<M, S>(
    index: &M,
    base_path: &str,
    metadata_config: &MetadataConfig,
    target_columns: &[S],
) -> Result<Vec<ColumnStatRecord>>
where
    M: MetadataIndex + ?Sized,
    S: AsRef<str>,
{
    read_report(index, base_path, metadata_config, target_columns).map(|report| report.records)
}

pub(crate) fn read_report<M, S>(
    index: &M,
    base_path: &str,
    metadata_config: &MetadataConfig,
    target_columns: &[S],
) -> Result<ReadReport>
where
    M: MetadataIndex + ?Sized,
    S: AsRef<str>,
{
    if target_columns.is_empty() {
        return Err(Error::InvalidArgument(
            "column stats is only valid when filters reference columns".into(),
        ));
    }

    if !metadata_config.enabled {
        return Err(Error::index_unavailable(
            base_path,
            "metadata index is disabled for this table",
        ));
    }

    let start = Instant::now();
    let targets: HashSet<&str> = target_columns.iter().map(|c| c.as_ref()).collect();
    let encoded_keys = encode_column_prefixes(target_columns);

    let entries = index.lookup_by_key_prefixes(
        base_path,
        &encoded_keys,
        &metadata_config.column_stats_partition,
    )?;

    let mut report = ReadReport {
        entries_matched: entries.len(),
        ..ReadReport::default()
    };

    for entry in entries {
        let Some(payload) = entry.payload else {
            report.tombstones_skipped += 1;
            continue;
        };

        match decode_payload(&payload) {
            Ok(record) if record.is_deleted => report.tombstones_skipped += 1,
            Ok(record) if !targets.contains(record.column_name.as_str()) => {
                // Column id collision with an untargeted column
                debug!(key = %entry.key, column = %record.column_name, "Skipping foreign column stats");
            }
            Ok(record) => report.records.push(record),
            Err(err) => {
                warn!(key = %entry.key, error = %err, "Skipping undecodable column stats entry");
                report.decode_failures += 1;
            }
        }
    }

    debug!(
        base_path,
        columns = targets.len(),
        entries = report.entries_matched,
        records = report.records.len(),
        tombstones = report.tombstones_skipped,
        decode_failures = report.decode_failures,
        duration_us = start.elapsed().as_micros() as u64,
        "Read column stats index"
    );

    Ok(report)
}
