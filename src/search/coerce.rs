//! Type-directed coercion of raw values into index keys.
//!
//! The same rules run at ingestion (building index keys) and at query time
//! (building lookup keys), which is what makes the two comparable:
//!
//! - empty string (and JSON `null`) becomes the empty key for any type
//! - `String` is lower-cased
//! - `Integer` is a base-10 literal
//! - `Boolean` accepts `true`/`false` and the strings `"true"`/`"false"`
//! - `Time` needs an explicit UTC offset and is split into
//!   `[year, month, day, hour, minute, second]` after normalizing to UTC
//!
//! Array attributes are never coerced as a whole; callers coerce each element
//! with [`ValueType::element_type`](crate::schema::ValueType::element_type).

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use serde::Serialize;
use serde_json::Value;
use smallvec::{SmallVec, smallvec};
use thiserror::Error;

use crate::schema::ScalarType;

/// Accepted timestamp layouts besides RFC 3339. All carry an explicit offset.
const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S %:z",
    "%Y-%m-%dT%H:%M:%S%.f %:z",
    "%Y-%m-%dT%H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S %:z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// One step of an index path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Segment {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Segment {
    pub fn empty() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Segment {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Segment {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Segments a single coerced value contributes to an index path.
pub type ValueSegments = SmallVec<[Segment; 6]>;

/// A raw value after coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerced {
    Empty,
    Text(String),
    Integer(i64),
    Boolean(bool),
    Time(DateTime<Utc>),
}

impl Coerced {
    /// Path segments for this value: one for scalars, six for a time.
    pub fn segments(&self) -> ValueSegments {
        match self {
            Self::Empty => smallvec![Segment::empty()],
            Self::Text(s) => smallvec![Segment::Text(s.clone())],
            Self::Integer(n) => smallvec![Segment::Int(*n)],
            Self::Boolean(b) => smallvec![Segment::Bool(*b)],
            Self::Time(t) => time_segments(t).into_iter().map(Segment::Int).collect(),
        }
    }

    /// Single-segment form used as a primary key in the record table.
    pub fn into_key(self) -> Segment {
        match self {
            Self::Empty => Segment::empty(),
            Self::Text(s) => Segment::Text(s),
            Self::Integer(n) => Segment::Int(n),
            Self::Boolean(b) => Segment::Bool(b),
            Self::Time(t) => Segment::Text(t.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provided value {value} for type {expected} is invalid")]
pub struct CoercionError {
    pub value: String,
    pub expected: ScalarType,
}

impl CoercionError {
    fn new(value: &Value, expected: ScalarType) -> Self {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self { value, expected }
    }
}

/// Coerce one raw JSON scalar according to a declared scalar type.
pub fn coerce(raw: &Value, ty: ScalarType) -> Result<Coerced, CoercionError> {
    match raw {
        Value::Null => return Ok(Coerced::Empty),
        Value::String(s) if s.is_empty() => return Ok(Coerced::Empty),
        _ => {}
    }

    let coerced = match ty {
        ScalarType::String => match raw {
            Value::String(s) => Some(Coerced::Text(s.to_lowercase())),
            Value::Number(n) => Some(Coerced::Text(n.to_string())),
            Value::Bool(b) => Some(Coerced::Text(b.to_string())),
            _ => None,
        },
        ScalarType::Integer => match raw {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).and_then(f64_to_i64))
                .map(Coerced::Integer),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Coerced::Integer),
            _ => None,
        },
        ScalarType::Boolean => match raw {
            Value::Bool(b) => Some(Coerced::Boolean(*b)),
            Value::String(s) if s == "true" => Some(Coerced::Boolean(true)),
            Value::String(s) if s == "false" => Some(Coerced::Boolean(false)),
            _ => None,
        },
        ScalarType::Time => match raw {
            Value::String(s) => parse_time(s).map(Coerced::Time),
            _ => None,
        },
    };

    coerced.ok_or_else(|| CoercionError::new(raw, ty))
}

/// Coerce a value typed at the prompt or on the command line.
pub fn coerce_str(raw: &str, ty: ScalarType) -> Result<Coerced, CoercionError> {
    coerce(&Value::String(raw.to_string()), ty)
}

fn f64_to_i64(f: f64) -> Option<i64> {
    if f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Parse a timestamp with an explicit offset and normalize it to UTC.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    TIME_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Split a UTC instant into `[year, month, day, hour, minute, second]`.
pub fn time_segments(t: &DateTime<Utc>) -> [i64; 6] {
    [
        i64::from(t.year()),
        i64::from(t.month()),
        i64::from(t.day()),
        i64::from(t.hour()),
        i64::from(t.minute()),
        i64::from(t.second()),
    ]
}

/// Rebuild the UTC instant described by six time segments.
pub fn time_from_segments(segments: &[i64; 6]) -> Option<DateTime<Utc>> {
    let [year, month, day, hour, minute, second] = *segments;
    let date = NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )?;
    let naive = date.and_hms_opt(
        u32::try_from(hour).ok()?,
        u32::try_from(minute).ok()?,
        u32::try_from(second).ok()?,
    )?;
    Utc.from_local_datetime(&naive).single()
}
