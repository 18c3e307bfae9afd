use crate::value::StatValue;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Statistics of one column within one data file, as stored in the
/// column stats partition of the metadata index.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct ColumnStatRecord {
    pub file_name: String,
    pub column_name: String,
    pub min_value: StatValue,
    pub max_value: StatValue,
    pub null_count: u64,
    /// Row count of the whole file, repeated on every column's record
    pub value_count: u64,
    pub total_size: u64,
    pub total_uncompressed_size: u64,
    pub is_deleted: bool,
}

impl ColumnStatRecord {
    pub fn new(
        file_name: impl Into<String>,
        column_name: impl Into<String>,
        min_value: impl Into<StatValue>,
        max_value: impl Into<StatValue>,
        null_count: u64,
        value_count: u64,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            column_name: column_name.into(),
            min_value: min_value.into(),
            max_value: max_value.into(),
            null_count,
            value_count,
            total_size: 0,
            total_uncompressed_size: 0,
            is_deleted: false,
        }
    }

    pub fn with_sizes(mut self, total_size: u64, total_uncompressed_size: u64) -> Self {
        self.total_size = total_size;
        self.total_uncompressed_size = total_uncompressed_size;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }

    pub fn triplet(&self) -> StatTriplet {
        StatTriplet {
            min_value: self.min_value.clone(),
            max_value: self.max_value.clone(),
            null_count: self.null_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatTriplet {
    pub min_value: StatValue,
    pub max_value: StatValue,
    pub null_count: u64,
}

impl StatTriplet {
    /// Stats of a column that has no index entry for a file. Treated the
    /// same as a column whose every value is null.
    pub fn all_null(value_count: u64) -> Self {
        Self {
            min_value: StatValue::Absent,
            max_value: StatValue::Absent,
            null_count: value_count,
        }
    }

    pub fn is_all_null(&self, value_count: u64) -> bool {
        self.min_value.is_absent() && self.max_value.is_absent() && self.null_count == value_count
    }
}

/// One field of the flat folded row layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowField<'a> {
    FileName(&'a str),
    Count(u64),
    Value(&'a StatValue),
}

/// Statistics of a single file aligned to a table's effective column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransposedRow {
    pub file_name: String,
    pub value_count: u64,
    pub stats: Vec<StatTriplet>,
}

impl TransposedRow {
    /// Number of fields in the flat layout:
    /// `file_name, value_count` followed by `min, max, null_count` per column.
    pub fn arity(&self) -> usize {
        2 + 3 * self.stats.len()
    }

    pub fn fields(&self) -> Vec<RowField<'_>> {
        let mut fields = Vec::with_capacity(self.arity());
        fields.push(RowField::FileName(&self.file_name));
        fields.push(RowField::Count(self.value_count));
        for triplet in &self.stats {
            fields.push(RowField::Value(&triplet.min_value));
            fields.push(RowField::Value(&triplet.max_value));
            fields.push(RowField::Count(triplet.null_count));
        }
        fields
    }

    pub fn column_stats(&self, position: usize) -> Option<&StatTriplet> {
        self.stats.get(position)
    }
}
