//! Value Objects for the storefront

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Defines an opaque string identifier assigned by a remote collaborator.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self { Self(value.to_string()) }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self { Self(value) }
        }
    };
}

define_id!(ProductId);
define_id!(CategoryId);
define_id!(IdentityId);

/// Price value object. Currency-agnostic; stored remotely as a JSON number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn times(&self, qty: Quantity) -> Price { Price(self.0 * Decimal::from(qty.value())) }

    /// Renders the amount with thousands separators and at most three
    /// fraction digits, e.g. `1,234.5`.
    pub fn grouped(&self) -> String {
        let value = self.0.round_dp(3).normalize();
        let digits = value.abs().to_string();
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (digits.as_str(), None),
        };
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if value.is_sign_negative() && !value.is_zero() { out.push('-'); }
        let len = int_part.len();
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 { out.push(','); }
            out.push(ch);
        }
        if let Some(frac) = frac_part {
            out.push('.');
            out.push_str(frac);
        }
        out
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Self { Price(iter.map(|p| p.0).sum()) }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.grouped()) }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        rust_decimal::serde::float::deserialize(deserializer).map(Price)
    }
}

impl Price {
    /// Reads a remotely written price. Numeric text is parsed; anything else
    /// that is not a number becomes zero.
    pub fn deserialize_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = match Value::deserialize(deserializer)? {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        };
        Ok(amount.map_or(Price::ZERO, Price))
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
}

/// Quantity value object. Never below one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Self { Self(value.max(1)) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }

    /// `max(1, self + delta)`, saturating at `u32::MAX`.
    pub fn apply_delta(&self, delta: i64) -> Self {
        let next = i64::from(self.0).saturating_add(delta).clamp(1, i64::from(u32::MAX));
        Self(u32::try_from(next).unwrap_or(u32::MAX))
    }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }
impl From<u32> for Quantity { fn from(value: u32) -> Self { Self::new(value) } }
impl From<Quantity> for u32 { fn from(q: Quantity) -> Self { q.0 } }

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Creation token supplied by the remote store. Only ever compared, never
/// shown as a wall-clock value. A pending or missing token orders as oldest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CreatedAt(Option<DateTime<Utc>>);

impl CreatedAt {
    pub const MISSING: CreatedAt = CreatedAt(None);

    pub fn at(timestamp: DateTime<Utc>) -> Self { Self(Some(timestamp)) }
    pub fn from_millis(millis: i64) -> Self { Self(DateTime::from_timestamp_millis(millis)) }
    pub fn is_missing(&self) -> bool { self.ordering_key() == 0 }
    pub fn ordering_key(&self) -> i64 { self.0.map_or(0, |t| t.timestamp_millis()) }
}

impl CreatedAt {
    /// Reads a remotely written creation time: integer milliseconds or a
    /// `{ seconds, nanoseconds }` timestamp object. Anything else is missing.
    pub fn deserialize_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let millis = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_i64(),
            Value::Object(map) => map.get("seconds").and_then(Value::as_i64).map(|secs| {
                let nanos = map.get("nanoseconds").and_then(Value::as_i64).unwrap_or(0);
                secs.saturating_mul(1000).saturating_add(nanos / 1_000_000)
            }),
            _ => None,
        };
        Ok(millis.map_or(CreatedAt::MISSING, CreatedAt::from_millis))
    }
}

impl Serialize for CreatedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        chrono::serde::ts_milliseconds_option::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for CreatedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        chrono::serde::ts_milliseconds_option::deserialize(deserializer).map(CreatedAt)
    }
}
