use super::error::{Error, Result};
use crate::codepage;
use crate::mach::{Kind, Val};
use std::convert::TryFrom;

/// A value on the host side of the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<HostValue>),
}

/// A host type a value can be asked to convert to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Int,
    Float,
    Bool,
    Bytes,
    Text,
}

impl HostValue {
    /// The kind of a scalar. Lists have none.
    pub fn kind(&self) -> Option<HostKind> {
        match self {
            HostValue::Int(_) => Some(HostKind::Int),
            HostValue::Float(_) => Some(HostKind::Float),
            HostValue::Bool(_) => Some(HostKind::Bool),
            HostValue::Bytes(_) => Some(HostKind::Bytes),
            HostValue::Text(_) => Some(HostKind::Text),
            HostValue::List(_) => None,
        }
    }
}

impl From<i64> for HostValue {
    fn from(n: i64) -> HostValue {
        HostValue::Int(n)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> HostValue {
        HostValue::Int(i64::from(n))
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> HostValue {
        HostValue::Float(n)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> HostValue {
        HostValue::Bool(b)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> HostValue {
        HostValue::Text(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> HostValue {
        HostValue::Text(s)
    }
}

impl From<&[u8]> for HostValue {
    fn from(b: &[u8]) -> HostValue {
        HostValue::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(b: Vec<u8>) -> HostValue {
        HostValue::Bytes(b)
    }
}

impl<T: Into<HostValue>> From<Vec<Vec<T>>> for HostValue {
    fn from(rows: Vec<Vec<T>>) -> HostValue {
        HostValue::List(
            rows.into_iter()
                .map(|row| HostValue::List(row.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

/// Text rendering of a number, as `STR$` would produce it.
fn number_text(value: &HostValue) -> Result<String> {
    let val = match value {
        HostValue::Int(n) => match i16::try_from(*n) {
            Ok(n) => Val::Integer(n),
            Err(_) => Val::Double(*n as f64),
        },
        HostValue::Float(n) => Val::Double(*n),
        HostValue::Bool(b) => Val::from_bool(*b),
        _ => return Err(Error::usage("NOT A NUMBER")),
    };
    Ok(val.to_str()?)
}

/// Convert a host value to another host kind, following BASIC rules.
/// Strings never turn into numbers.
pub fn convert(value: HostValue, kind: Option<HostKind>) -> Result<HostValue> {
    use HostValue::*;
    let kind = match kind {
        None => return Ok(value),
        Some(kind) => kind,
    };
    if let List(items) = value {
        let items: Result<Vec<HostValue>> =
            items.into_iter().map(|v| convert(v, Some(kind))).collect();
        return Ok(List(items?));
    }
    if value.kind() == Some(kind) {
        return Ok(value);
    }
    Ok(match (value, kind) {
        (Bytes(b), HostKind::Text) => Text(codepage::decode(&b)),
        (Bytes(_), _) | (Text(_), HostKind::Int) | (Text(_), HostKind::Float) | (Text(_), HostKind::Bool) => {
            return Err(Error::usage("CANNOT CONVERT A STRING TO A NUMBER"))
        }
        (Text(s), HostKind::Bytes) => match codepage::encode(&s) {
            Ok(bytes) => Bytes(bytes),
            Err(c) => return Err(Error::usage(format!("{:?} IS NOT IN THE CODE PAGE", c))),
        },
        (Int(n), HostKind::Float) => Float(n as f64),
        (Int(n), HostKind::Bool) => Bool(n != 0),
        (Float(n), HostKind::Int) => {
            let n = n.floor();
            if !n.is_finite() || n < i64::min_value() as f64 || n > i64::max_value() as f64 {
                return Err(Error::from(crate::error!(Overflow)));
            }
            Int(n as i64)
        }
        (Float(n), HostKind::Bool) => Bool(n != 0.0),
        (Bool(b), HostKind::Int) => Int(if b { -1 } else { 0 }),
        (Bool(b), HostKind::Float) => Float(if b { -1.0 } else { 0.0 }),
        (value, HostKind::Text) => Text(number_text(&value)?),
        (value, HostKind::Bytes) => Bytes(number_text(&value)?.into_bytes()),
        (value, _) => value,
    })
}

/// The nearest host value to a BASIC value.
pub fn to_host(val: &Val) -> HostValue {
    match val {
        Val::Integer(n) => HostValue::Int(i64::from(*n)),
        Val::Single(n) => HostValue::Float(single_to_f64(*n)),
        Val::Double(n) => HostValue::Float(*n),
        Val::String(s) => HostValue::Bytes(s.to_vec()),
    }
}

/// Widen through the shortest decimal form so `0.1!` reads back as `0.1`.
fn single_to_f64(n: f32) -> f64 {
    match n.to_string().parse() {
        Ok(d) => d,
        Err(_) => f64::from(n),
    }
}

/// A host value as a BASIC value of the given kind.
pub fn to_val(value: &HostValue, kind: Kind) -> Result<Val> {
    let val = match value {
        HostValue::Int(n) => match i16::try_from(*n) {
            Ok(n) => Val::Integer(n),
            Err(_) => Val::Double(*n as f64),
        },
        HostValue::Float(n) => Val::Double(*n),
        HostValue::Bool(b) => Val::from_bool(*b),
        HostValue::Bytes(b) => Val::from_bytes(b),
        HostValue::Text(s) => match codepage::encode(s) {
            Ok(bytes) => Val::from_bytes(&bytes),
            Err(c) => return Err(Error::usage(format!("{:?} IS NOT IN THE CODE PAGE", c))),
        },
        HostValue::List(_) => return Err(Error::usage("A LIST IS NOT A SCALAR")),
    };
    match (val.kind(), kind) {
        (Kind::String, Kind::String) => Ok(val),
        (Kind::String, _) => Err(Error::usage("CANNOT STORE A STRING IN A NUMERIC VARIABLE")),
        (_, Kind::String) => Err(Error::usage("CANNOT STORE A NUMBER IN A STRING VARIABLE")),
        _ => Ok(val.coerce(kind)?),
    }
}
