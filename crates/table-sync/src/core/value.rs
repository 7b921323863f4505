//! Engine-native scalar values and rows.
//!
//! Drivers convert whatever their client library returns into [`SqlValue`].
//! Row identity and change detection compare the `Display` form of values,
//! so two values are "equal" when they print the same.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Printed form of a NULL value.
pub const NULL_DISPLAY: &str = "<nil>";

/// A single column value as returned by a driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer of any width.
    Int(i64),

    /// Unsigned integer (MySQL `BIGINT UNSIGNED`).
    UInt(u64),

    /// Floating point of any width.
    Float(f64),

    /// Exact numeric.
    Decimal(Decimal),

    /// Character data.
    Text(String),

    /// Binary data. Printed as lossy UTF-8.
    Bytes(Vec<u8>),

    /// UUID/GUID value.
    Uuid(Uuid),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeTz(DateTime<FixedOffset>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convenience constructor for text values.
    pub fn text(s: impl Into<String>) -> Self {
        SqlValue::Text(s.into())
    }

    /// Identity key of a primary-key value.
    ///
    /// Returns `None` for values that cannot identify a row: NULL, the empty
    /// string, and anything that prints as [`NULL_DISPLAY`].
    #[must_use]
    pub fn pk_key(&self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        let key = self.to_string();
        if key.is_empty() || key == NULL_DISPLAY {
            None
        } else {
            Some(key)
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str(NULL_DISPLAY),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::UInt(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Decimal(v) => write!(f, "{}", v),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
            SqlValue::Uuid(v) => write!(f, "{}", v),
            SqlValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            SqlValue::Time(v) => write!(f, "{}", v),
            SqlValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            SqlValue::DateTimeTz(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f %:z")),
        }
    }
}

/// Printed form of an optional column value; a missing column prints like NULL.
pub fn display_or_null(value: Option<&SqlValue>) -> String {
    value.map_or_else(|| NULL_DISPLAY.to_string(), ToString::to_string)
}

// From implementations for common types
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::UInt(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        SqlValue::DateTimeTz(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One table row: column name to value. Column order is not significant.
pub type Row = BTreeMap<String, SqlValue>;

/// Build a row from `(column, value)` pairs.
pub fn row<I, K, V>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<SqlValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
