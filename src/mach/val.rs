use crate::codepage;
use crate::error;
use crate::lang::Error;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Typed value
///
/// Every value the machine handles is one of the four BASIC types.
/// Strings are bytes in the machine's code page.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Val {
    Integer(i16),
    Single(f32),
    Double(f64),
    String(Rc<[u8]>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Integer,
    Single,
    Double,
    String,
}

impl Kind {
    pub fn from_sigil(c: char) -> Option<Kind> {
        match c {
            '%' => Some(Kind::Integer),
            '!' => Some(Kind::Single),
            '#' => Some(Kind::Double),
            '$' => Some(Kind::String),
            _ => None,
        }
    }

    /// Kind of a variable name. Names without a sigil are single precision.
    pub fn of(var_name: &str) -> Kind {
        var_name
            .chars()
            .last()
            .and_then(Kind::from_sigil)
            .unwrap_or(Kind::Single)
    }

    pub fn sigil(self) -> char {
        match self {
            Kind::Integer => '%',
            Kind::Single => '!',
            Kind::Double => '#',
            Kind::String => '$',
        }
    }

    pub fn zero(self) -> Val {
        match self {
            Kind::Integer => Val::Integer(0),
            Kind::Single => Val::Single(0.0),
            Kind::Double => Val::Double(0.0),
            Kind::String => Val::String(Rc::from(&[][..])),
        }
    }

    /// Bytes a value of this kind occupies in variable memory.
    /// Strings count their descriptor here; the characters are charged
    /// separately when stored.
    pub fn size(self) -> u32 {
        match self {
            Kind::Integer => 2,
            Kind::Single => 4,
            Kind::Double => 8,
            Kind::String => 3,
        }
    }
}

impl Val {
    pub fn kind(&self) -> Kind {
        match self {
            Val::Integer(_) => Kind::Integer,
            Val::Single(_) => Kind::Single,
            Val::Double(_) => Kind::Double,
            Val::String(_) => Kind::String,
        }
    }

    pub fn from_bool(b: bool) -> Val {
        Val::Integer(if b { -1 } else { 0 })
    }

    pub fn from_bytes(bytes: &[u8]) -> Val {
        Val::String(Rc::from(bytes))
    }

    /// Convert to another kind. Numbers widen exactly and floor on the
    /// way to an integer.
    pub fn coerce(self, kind: Kind) -> Result<Val> {
        if self.kind() == kind {
            return Ok(self);
        }
        match kind {
            Kind::Integer => Ok(Val::Integer(i16::try_from(self)?)),
            Kind::Single => Ok(Val::Single(f32::try_from(self)?)),
            Kind::Double => Ok(Val::Double(f64::try_from(self)?)),
            Kind::String => Err(error!(TypeMismatch)),
        }
    }

    pub fn is_true(&self) -> Result<bool> {
        match self {
            Val::Integer(n) => Ok(*n != 0),
            Val::Single(n) => Ok(*n != 0.0),
            Val::Double(n) => Ok(*n != 0.0),
            Val::String(_) => Err(error!(TypeMismatch)),
        }
    }

    /// The text `STR$` produces: a leading space for non-negative numbers.
    pub fn to_str(&self) -> Result<String> {
        let s = match self {
            Val::Integer(n) => n.to_string(),
            Val::Single(n) => format_float(f64::from(*n), 7, 'E'),
            Val::Double(n) => format_float(*n, 16, 'D'),
            Val::String(_) => return Err(error!(TypeMismatch)),
        };
        if s.starts_with('-') {
            Ok(s)
        } else {
            Ok(format!(" {}", s))
        }
    }

    /// The bytes `PRINT` writes. Numbers are followed by a space.
    pub fn to_print(&self) -> Vec<u8> {
        match self {
            Val::String(s) => s.to_vec(),
            _ => match self.to_str() {
                Ok(s) => format!("{} ", s).into_bytes(),
                Err(_) => vec![],
            },
        }
    }
}

fn format_float(n: f64, digits: usize, exp_char: char) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let rounded: f64 = match format!("{:.*e}", digits - 1, n).parse() {
        Ok(r) => r,
        Err(_) => n,
    };
    let magnitude = rounded.abs();
    if magnitude >= 10f64.powi(digits as i32) || magnitude < 1e-7 {
        let s = if digits <= 7 {
            format!("{:e}", rounded as f32)
        } else {
            format!("{:e}", rounded)
        };
        let (mantissa, exp) = match s.find('e') {
            Some(i) => (&s[..i], &s[i + 1..]),
            None => (&s[..], "0"),
        };
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}{}{}{:02}", mantissa, exp_char, sign, exp.abs());
    }
    if digits <= 7 {
        format!("{}", rounded as f32)
    } else {
        format!("{}", rounded)
    }
}

impl TryFrom<Val> for i16 {
    type Error = Error;
    fn try_from(val: Val) -> std::result::Result<Self, Self::Error> {
        let n = match val {
            Val::Integer(n) => return Ok(n),
            Val::Single(n) => f64::from(n),
            Val::Double(n) => n,
            Val::String(_) => return Err(error!(TypeMismatch)),
        };
        let n = n.floor();
        if n.is_nan() || n < f64::from(i16::min_value()) || n > f64::from(i16::max_value()) {
            return Err(error!(Overflow));
        }
        Ok(n as i16)
    }
}

impl TryFrom<Val> for f32 {
    type Error = Error;
    fn try_from(val: Val) -> std::result::Result<Self, Self::Error> {
        match val {
            Val::Integer(n) => Ok(f32::from(n)),
            Val::Single(n) => Ok(n),
            Val::Double(n) => {
                if n.is_finite() && n.abs() > f64::from(f32::MAX) {
                    Err(error!(Overflow))
                } else {
                    Ok(n as f32)
                }
            }
            Val::String(_) => Err(error!(TypeMismatch)),
        }
    }
}

impl TryFrom<Val> for f64 {
    type Error = Error;
    fn try_from(val: Val) -> std::result::Result<Self, Self::Error> {
        match val {
            Val::Integer(n) => Ok(f64::from(n)),
            Val::Single(n) => Ok(f64::from(n)),
            Val::Double(n) => Ok(n),
            Val::String(_) => Err(error!(TypeMismatch)),
        }
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Val::String(s) => write!(f, "{}", codepage::decode(s)),
            _ => write!(f, "{}", codepage::decode(&self.to_print())),
        }
    }
}
