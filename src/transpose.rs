//! Pivots per-(file, column) stats records into one row per file.
//!
//! ```text
//!  file      column  min  max  nulls          file      A_min A_max A_nulls B_min B_max B_nulls
//!  f1.parq   A         1   10      0    =>    f1.parq       1    10       0    -5     5       2
//!  f1.parq   B        -5    5      2          f2.parq     -10     0       5  null  null      50
//!  f2.parq   A       -10    0      5
//! ```
//!
//! Files may have been indexed under different column sets, so every row is
//! padded to the same effective columns. A column missing for a file is
//! reported as all-null: `(Absent, Absent, value_count)`.

use crate::cancellation::CancellationToken;
use crate::config::MetadataConfig;
use crate::error::{Error, Result};
use crate::record::{ColumnStatRecord, StatTriplet, TransposedRow};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace, warn};

/// Where a parallel fold runs.
#[derive(Debug, Clone, Default)]
pub enum FoldPool {
    /// rayon's global pool
    #[default]
    Global,
    Dedicated(Arc<ThreadPool>),
}

impl FoldPool {
    /// Returns the shared pool of `threads` threads, building it on first use.
    ///
    /// Pools live for the rest of the process, one per distinct size.
    pub fn dedicated(threads: usize) -> Result<Self> {
        static POOLS: OnceLock<Mutex<HashMap<usize, Arc<ThreadPool>>>> = OnceLock::new();

        let mut pools = POOLS.get_or_init(Default::default).lock();
        if let Some(pool) = pools.get(&threads) {
            return Ok(FoldPool::Dedicated(Arc::clone(pool)));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("colstat-fold-{}", i))
            .build()
            .map_err(|e| Error::Config(format!("Cannot build fold pool of {} threads: {}", threads, e)))?;
        let pool = Arc::new(pool);
        pools.insert(threads, Arc::clone(&pool));
        debug!(threads, "Built fold pool");
        Ok(FoldPool::Dedicated(pool))
    }

    /// Thread count of a dedicated pool, `None` for the global one
    pub fn threads(&self) -> Option<usize> {
        match self {
            FoldPool::Global => None,
            FoldPool::Dedicated(pool) => Some(pool.current_num_threads()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransposeOptions {
    /// Minimum number of files before folding switches to rayon
    pub parallel_threshold: usize,
    pub pool: FoldPool,
}

impl Default for TransposeOptions {
    fn default() -> Self {
        Self {
            parallel_threshold: 1024,
            pool: FoldPool::Global,
        }
    }
}

impl TransposeOptions {
    /// Always folds on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel_threshold: usize::MAX,
            pool: FoldPool::Global,
        }
    }

    /// Always folds on rayon's global pool.
    pub fn parallel() -> Self {
        Self {
            parallel_threshold: 0,
            pool: FoldPool::Global,
        }
    }
}

impl From<&MetadataConfig> for TransposeOptions {
    /// Falls back to the global pool when the dedicated one cannot be built.
    fn from(config: &MetadataConfig) -> Self {
        let pool = match config.fold_threads {
            None => FoldPool::Global,
            Some(threads) => FoldPool::dedicated(threads).unwrap_or_else(|e| {
                warn!(threads, error = %e, "Folding on the global pool instead");
                FoldPool::Global
            }),
        };
        Self {
            parallel_threshold: config.parallel_fold_threshold,
            pool,
        }
    }
}

/// Column-aligned stats of every file found in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct TransposedTable {
    /// One row per file; order carries no meaning
    pub rows: Vec<TransposedRow>,
    /// Effective column order, ascending. `rows[i].stats[j]` belongs to `columns[j]`.
    pub columns: Vec<String>,
    /// Requested columns with no stats in the index, ascending
    pub unindexed_columns: Vec<String>,
}

impl TransposedTable {
    /// Position of `column` in `columns` and in every row's `stats`
    pub fn column_position(&self, column: &str) -> Option<usize> {
        self.columns
            .binary_search_by(|c| c.as_str().cmp(column))
            .ok()
    }

    pub fn stats_for<'a>(&self, row: &'a TransposedRow, column: &str) -> Option<&'a StatTriplet> {
        self.column_position(column)
            .and_then(|position| row.column_stats(position))
    }

    pub fn row_for_file(&self, file_name: &str) -> Option<&TransposedRow> {
        self.rows.iter().find(|row| row.file_name == file_name)
    }

    /// Flat field names of the folded layout, e.g.
    /// `fileName, valueCount, A_minValue, A_maxValue, A_nullCount`.
    pub fn schema(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(2 + 3 * self.columns.len());
        fields.push("fileName".to_string());
        fields.push("valueCount".to_string());
        for column in &self.columns {
            fields.push(format!("{}_minValue", column));
            fields.push(format!("{}_maxValue", column));
            fields.push(format!("{}_nullCount", column));
        }
        fields
    }

    /// Number of files with a row
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no file has stats for any effective column
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_parts(self) -> (Vec<TransposedRow>, Vec<String>) {
        (self.rows, self.columns)
    }
}

/// Transposes `records` over `query_columns`, returning the rows and the
/// effective column order they are aligned to.
pub fn transpose_column_stats_index<S: AsRef<str>>(
    records: &[ColumnStatRecord],
    query_columns: &[S],
) -> (Vec<TransposedRow>, Vec<String>) {
    transpose(records, query_columns).into_parts()
}

/// Transposes on rayon once the table has at least 1024 files.
pub fn transpose<S: AsRef<str>>(records: &[ColumnStatRecord], query_columns: &[S]) -> TransposedTable {
    transpose_with(records, query_columns, &TransposeOptions::default())
}

/// Transposes `records`, folding as `options` says.
pub fn transpose_with<S: AsRef<str>>(
    records: &[ColumnStatRecord],
    query_columns: &[S],
    options: &TransposeOptions,
) -> TransposedTable {
    let layout = Layout::plan(records, query_columns);
    let rows = fold_groups(&layout, options, None);
    layout.finish(rows.unwrap_or_default())
}

/// Like [`transpose_with`], but gives up as soon as `token` is cancelled.
/// A cancelled call yields `Error::Cancelled` and no rows at all.
pub fn transpose_cancellable<S: AsRef<str>>(
    records: &[ColumnStatRecord],
    query_columns: &[S],
    options: &TransposeOptions,
    token: &CancellationToken,
) -> Result<TransposedTable> {
    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let layout = Layout::plan(records, query_columns);
    let rows = fold_groups(&layout, options, Some(token))?;
    Ok(layout.finish(rows))
}

struct Layout<'a> {
    columns: Vec<&'a str>,
    unindexed: Vec<String>,
    /// Records per file, in order of each file's first appearance
    groups: Vec<Vec<&'a ColumnStatRecord>>,
}

impl<'a> Layout<'a> {
    fn plan<S: AsRef<str>>(records: &'a [ColumnStatRecord], query_columns: &[S]) -> Self {
        let indexed: HashSet<&str> = records.iter().map(|r| r.column_name.as_str()).collect();
        let requested: BTreeSet<&str> = query_columns.iter().map(|c| c.as_ref()).collect();

        // Borrow the effective names from the records, which outlive the layout
        let mut columns: Vec<&'a str> = Vec::with_capacity(requested.len());
        let mut unindexed = Vec::new();
        for column in requested {
            match indexed.get(column) {
                Some(&name) => columns.push(name),
                None => unindexed.push(column.to_string()),
            }
        }

        let mut file_slots: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<&ColumnStatRecord>> = Vec::new();
        for record in records {
            if columns.binary_search(&record.column_name.as_str()).is_err() {
                continue;
            }
            let slot = *file_slots.entry(record.file_name.as_str()).or_insert_with(|| {
                groups.push(Vec::with_capacity(columns.len()));
                groups.len() - 1
            });
            groups[slot].push(record);
        }

        debug!(
            records = records.len(),
            indexed_columns = indexed.len(),
            effective_columns = columns.len(),
            unindexed_columns = unindexed.len(),
            files = groups.len(),
            "Planned column stats transpose"
        );

        Self {
            columns,
            unindexed,
            groups,
        }
    }

    fn finish(self, rows: Vec<TransposedRow>) -> TransposedTable {
        TransposedTable {
            rows,
            columns: self.columns.into_iter().map(str::to_string).collect(),
            unindexed_columns: self.unindexed,
        }
    }
}

fn fold_groups(
    layout: &Layout<'_>,
    options: &TransposeOptions,
    token: Option<&CancellationToken>,
) -> Result<Vec<TransposedRow>> {
    fold_groups_observed(layout, options, token, || {})
}

/// `after_fold` runs once per folded file.
fn fold_groups_observed<F>(
    layout: &Layout<'_>,
    options: &TransposeOptions,
    token: Option<&CancellationToken>,
    after_fold: F,
) -> Result<Vec<TransposedRow>>
where
    F: Fn() + Sync,
{
    let columns = layout.columns.as_slice();
    let fold = |group: &Vec<&ColumnStatRecord>| -> Result<TransposedRow> {
        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        let row = fold_file(columns, group);
        after_fold();
        Ok(row)
    };

    if layout.groups.len() < options.parallel_threshold {
        return layout.groups.iter().map(fold).collect();
    }

    match &options.pool {
        FoldPool::Global => layout.groups.par_iter().map(fold).collect(),
        FoldPool::Dedicated(pool) => pool.install(|| layout.groups.par_iter().map(fold).collect()),
    }
}

/// Aligns one file's records to `columns`. `group` is never empty: a group
/// only exists once a record has been placed in it.
fn fold_file(columns: &[&str], group: &[&ColumnStatRecord]) -> TransposedRow {
    let first = group[0];
    let value_count = first.value_count;

    let by_column: HashMap<&str, &ColumnStatRecord> = group
        .iter()
        .map(|record| (record.column_name.as_str(), *record))
        .collect();

    let stats = columns
        .iter()
        .map(|column| match by_column.get(column) {
            Some(record) => record.triplet(),
            None => StatTriplet::all_null(value_count),
        })
        .collect();

    trace!(file = %first.file_name, value_count, present = by_column.len(), "Folded file stats");

    TransposedRow {
        file_name: first.file_name.clone(),
        value_count,
        stats,
    }
}
