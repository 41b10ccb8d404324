use super::error::{QueryError, QueryResult};
use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Largest magnitude at which an integral f64 is still printed without a fraction.
const INTEGRAL_DISPLAY_LIMIT: f64 = 1e15;

/// A single field value.
///
/// Comparison comes in two flavours:
/// - [`Scalar::compare`] backs the `<`, `<=`, `>`, `>=` operators and coerces
///   numeric strings the way loose comparison does;
/// - [`Scalar::sort_cmp`] is a total order (Null < Boolean < Number < String)
///   used for ORDER BY and MIN/MAX.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Scalar {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }

    /// Number ≠ 0, non-empty string and `true` are truthy; everything else is not.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
        }
    }

    /// Numeric view of the value: numbers as-is, strings only when they spell a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => parse_numeric(s),
            _ => None,
        }
    }

    /// Like [`Scalar::as_number`], but failing with an `EvaluationError`.
    pub fn to_number(&self) -> QueryResult<f64> {
        self.as_number().ok_or_else(|| {
            QueryError::evaluation(format!(
                "expected a numeric operand, got {} {}",
                self.kind_name(),
                self.quoted()
            ))
        })
    }

    /// Loose equality used by `=` and `!=`.
    ///
    /// Values of unrelated kinds are unequal rather than an error.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Boolean(_), _) | (_, Self::Boolean(_)) => false,
            _ => self.compare(other).is_ok_and(Ordering::is_eq),
        }
    }

    /// Ordering for the relational operators.
    ///
    /// Null sorts below everything. A number meeting a string compares numerically
    /// when the string parses as a number, lexically against the number's text otherwise.
    /// Booleans only order against booleans.
    pub fn compare(&self, other: &Self) -> QueryResult<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Ok(Ordering::Equal),
            (Self::Null, _) => Ok(Ordering::Less),
            (_, Self::Null) => Ok(Ordering::Greater),
            (Self::Number(a), Self::Number(b)) => Ok(numeric_cmp(*a, *b)),
            (Self::String(a), Self::String(b)) => Ok(a.cmp(b)),
            (Self::Number(a), Self::String(s)) => Ok(match parse_numeric(s) {
                Some(b) => numeric_cmp(*a, b),
                None => format_number(*a).as_str().cmp(s.as_str()),
            }),
            (Self::String(s), Self::Number(b)) => Ok(match parse_numeric(s) {
                Some(a) => numeric_cmp(a, *b),
                None => s.as_str().cmp(format_number(*b).as_str()),
            }),
            (Self::Boolean(a), Self::Boolean(b)) => Ok(a.cmp(b)),
            (a, b) => Err(QueryError::evaluation(format!(
                "cannot compare {} with {}",
                a.kind_name(),
                b.kind_name()
            ))),
        }
    }

    /// Total order: Null < Boolean < Number < String, natural order within a kind.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => numeric_cmp(*a, *b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Number(_) => 2,
            Self::String(_) => 3,
        }
    }

    /// Text used when building group keys. Null stringifies to the empty string.
    #[must_use]
    pub fn key_fragment(&self) -> String {
        match self {
            Self::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn quoted(&self) -> String {
        match self {
            Self::String(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }
}

/// Parses a string as a plain decimal number; rejects `inf`, `NaN` and friends.
#[must_use]
pub fn parse_numeric(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')) {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Total order on finite numbers where `-0` equals `0`.
fn numeric_cmp(a: f64, b: f64) -> Ordering {
    (a + 0.0).total_cmp(&(b + 0.0))
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < INTEGRAL_DISPLAY_LIMIT {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<u32> for Scalar {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<usize> for Scalar {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Self>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < INTEGRAL_DISPLAY_LIMIT => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flat value (null, boolean, number or string)")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
        Ok(Scalar::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
        Ok(Scalar::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
        Ok(Scalar::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
        Ok(Scalar::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
        Ok(Scalar::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
        Ok(Scalar::String(v))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}
