use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column-type-tagged statistic bound.
///
/// `Absent` is the only way a missing bound is expressed: a column that is
/// entirely null in a file, or that was never indexed for it, carries
/// `Absent` for both min and max. No other variant (zero, empty string)
/// stands in for it.
///
/// Values are moved through the transposer untouched. Nothing in this crate
/// orders or compares bounds of different files; that belongs to the
/// predicate evaluator.
#[derive(Debug, Clone, PartialEq, Default, Encode, Decode, Serialize, Deserialize)]
pub enum StatValue {
    #[default]
    Absent,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal {
        unscaled: i128,
        precision: u8,
        scale: i8,
    },
    String(String),
    Bytes(Vec<u8>),
    /// Days since the unix epoch
    Date(i32),
    TimeMicros(i64),
    TimestampMicros(i64),
}

impl StatValue {
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, StatValue::Absent)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StatValue::Absent => "absent",
            StatValue::Boolean(_) => "boolean",
            StatValue::Int32(_) => "int32",
            StatValue::Int64(_) => "int64",
            StatValue::Float32(_) => "float32",
            StatValue::Float64(_) => "float64",
            StatValue::Decimal { .. } => "decimal",
            StatValue::String(_) => "string",
            StatValue::Bytes(_) => "bytes",
            StatValue::Date(_) => "date",
            StatValue::TimeMicros(_) => "time_micros",
            StatValue::TimestampMicros(_) => "timestamp_micros",
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Absent => write!(f, "null"),
            StatValue::Boolean(v) => write!(f, "{}", v),
            StatValue::Int32(v) => write!(f, "{}", v),
            StatValue::Int64(v) => write!(f, "{}", v),
            StatValue::Float32(v) => write!(f, "{}", v),
            StatValue::Float64(v) => write!(f, "{}", v),
            StatValue::Decimal {
                unscaled, scale, ..
            } => {
                if *scale <= 0 {
                    return write!(f, "{}e{}", unscaled, -(*scale as i32));
                }
                let scale = *scale as u32;
                let Some(divisor) = 10u128.checked_pow(scale) else {
                    return write!(f, "{}e-{}", unscaled, scale);
                };
                let sign = if *unscaled < 0 { "-" } else { "" };
                let magnitude = unscaled.unsigned_abs();
                write!(
                    f,
                    "{}{}.{:0width$}",
                    sign,
                    magnitude / divisor,
                    magnitude % divisor,
                    width = scale as usize
                )
            }
            StatValue::String(v) => write!(f, "{}", v),
            StatValue::Bytes(v) => {
                write!(f, "0x")?;
                for byte in v {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            StatValue::Date(days) => write!(f, "date({})", days),
            StatValue::TimeMicros(v) => write!(f, "time({}us)", v),
            StatValue::TimestampMicros(v) => write!(f, "ts({}us)", v),
        }
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        StatValue::Boolean(v)
    }
}

impl From<i32> for StatValue {
    fn from(v: i32) -> Self {
        StatValue::Int32(v)
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Int64(v)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float64(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::String(v.to_string())
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::String(v)
    }
}

impl<T: Into<StatValue>> From<Option<T>> for StatValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(StatValue::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_default_and_distinct_from_zero() {
        assert!(StatValue::default().is_absent());
        assert_ne!(StatValue::Absent, StatValue::Int64(0));
        assert_ne!(StatValue::Absent, StatValue::String(String::new()));
        assert!(!StatValue::Int32(0).is_absent());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(StatValue::from(None::<i64>), StatValue::Absent);
        assert_eq!(StatValue::from(Some(7i64)), StatValue::Int64(7));
    }

    #[test]
    fn test_display() {
        assert_eq!(StatValue::Absent.to_string(), "null");
        assert_eq!(StatValue::Int64(-5).to_string(), "-5");
        assert_eq!(StatValue::Bytes(vec![0xab, 0x01]).to_string(), "0xab01");
        let dec = StatValue::Decimal {
            unscaled: -12345,
            precision: 10,
            scale: 2,
        };
        assert_eq!(dec.to_string(), "-123.45");
        let small = StatValue::Decimal {
            unscaled: 5,
            precision: 4,
            scale: 3,
        };
        assert_eq!(small.to_string(), "0.005");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(StatValue::Absent.kind(), "absent");
        assert_eq!(StatValue::TimestampMicros(1).kind(), "timestamp_micros");
    }
}
