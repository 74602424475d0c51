use super::Val;
use crate::error;
use crate::lang::Error;
use std::convert::TryFrom;

type Result<T> = std::result::Result<T, Error>;

/// ## Operators
///
/// Mixed arithmetic promotes to the wider operand. Integer arithmetic
/// that leaves the 16-bit range is an overflow, as is a float result
/// that is no longer finite.

pub struct Operation {}

enum Pair {
    Integer(i16, i16),
    Single(f32, f32),
    Double(f64, f64),
    String(std::rc::Rc<[u8]>, std::rc::Rc<[u8]>),
}

impl Pair {
    fn new(lhs: Val, rhs: Val) -> Result<Pair> {
        use Val::*;
        Ok(match (lhs, rhs) {
            (Integer(l), Integer(r)) => Pair::Integer(l, r),
            (String(l), String(r)) => Pair::String(l, r),
            (String(_), _) | (_, String(_)) => return Err(error!(TypeMismatch)),
            (Double(l), r) => Pair::Double(l, f64::try_from(r)?),
            (l, Double(r)) => Pair::Double(f64::try_from(l)?, r),
            (l, r) => Pair::Single(f32::try_from(l)?, f32::try_from(r)?),
        })
    }

    fn floats(lhs: Val, rhs: Val) -> Result<Pair> {
        match Pair::new(lhs, rhs)? {
            Pair::Integer(l, r) => Ok(Pair::Single(f32::from(l), f32::from(r))),
            pair => Ok(pair),
        }
    }
}

fn single(n: f32) -> Result<Val> {
    if n.is_finite() {
        Ok(Val::Single(n))
    } else {
        Err(error!(Overflow))
    }
}

fn double(n: f64) -> Result<Val> {
    if n.is_finite() {
        Ok(Val::Double(n))
    } else {
        Err(error!(Overflow))
    }
}

fn integer(n: Option<i16>) -> Result<Val> {
    match n {
        Some(n) => Ok(Val::Integer(n)),
        None => Err(error!(Overflow)),
    }
}

impl Operation {
    pub fn negate(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Integer(n) => match n.checked_neg() {
                Some(n) => Ok(Integer(n)),
                None => Ok(Single(-f32::from(n))),
            },
            Single(n) => Ok(Single(-n)),
            Double(n) => Ok(Double(-n)),
            String(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn power(lhs: Val, rhs: Val) -> Result<Val> {
        match Pair::floats(lhs, rhs)? {
            Pair::Single(l, r) => single(l.powf(r)),
            Pair::Double(l, r) => double(l.powf(r)),
            _ => Err(error!(TypeMismatch)),
        }
    }

    pub fn multiply(lhs: Val, rhs: Val) -> Result<Val> {
        match Pair::new(lhs, rhs)? {
            Pair::Integer(l, r) => integer(l.checked_mul(r)),
            Pair::Single(l, r) => single(l * r),
            Pair::Double(l, r) => double(l * r),
            Pair::String(..) => Err(error!(TypeMismatch)),
        }
    }

    pub fn divide(lhs: Val, rhs: Val) -> Result<Val> {
        match Pair::floats(lhs, rhs)? {
            Pair::Single(_, r) if r == 0.0 => Err(error!(DivisionByZero)),
            Pair::Double(_, r) if r == 0.0 => Err(error!(DivisionByZero)),
            Pair::Single(l, r) => single(l / r),
            Pair::Double(l, r) => double(l / r),
            _ => Err(error!(TypeMismatch)),
        }
    }

    fn integers(lhs: Val, rhs: Val) -> Result<(i16, i16)> {
        if let (Val::String(_), _) | (_, Val::String(_)) = (&lhs, &rhs) {
            return Err(error!(TypeMismatch));
        }
        Ok((i16::try_from(lhs)?, i16::try_from(rhs)?))
    }

    pub fn divide_int(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = Operation::integers(lhs, rhs)?;
        if r == 0 {
            return Err(error!(DivisionByZero));
        }
        integer(l.checked_div(r))
    }

    pub fn modulus(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = Operation::integers(lhs, rhs)?;
        if r == 0 {
            return Err(error!(DivisionByZero));
        }
        integer(l.checked_rem(r))
    }

    pub fn sum(lhs: Val, rhs: Val) -> Result<Val> {
        match Pair::new(lhs, rhs)? {
            Pair::Integer(l, r) => integer(l.checked_add(r)),
            Pair::Single(l, r) => single(l + r),
            Pair::Double(l, r) => double(l + r),
            Pair::String(l, r) => {
                if l.len() + r.len() > 255 {
                    return Err(error!(StringTooLong));
                }
                let mut s = l.to_vec();
                s.extend_from_slice(&r);
                Ok(Val::from_bytes(&s))
            }
        }
    }

    pub fn subtract(lhs: Val, rhs: Val) -> Result<Val> {
        match Pair::new(lhs, rhs)? {
            Pair::Integer(l, r) => integer(l.checked_sub(r)),
            Pair::Single(l, r) => single(l - r),
            Pair::Double(l, r) => double(l - r),
            Pair::String(..) => Err(error!(TypeMismatch)),
        }
    }

    fn compare(lhs: Val, rhs: Val) -> Result<std::cmp::Ordering> {
        use std::cmp::Ordering;
        Ok(match Pair::new(lhs, rhs)? {
            Pair::Integer(l, r) => l.cmp(&r),
            Pair::Single(l, r) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
            Pair::Double(l, r) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
            Pair::String(l, r) => l.cmp(&r),
        })
    }

    pub fn equal(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(Operation::compare(lhs, rhs)?.is_eq()))
    }

    pub fn not_equal(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(Operation::compare(lhs, rhs)?.is_ne()))
    }

    pub fn less(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(Operation::compare(lhs, rhs)?.is_lt()))
    }

    pub fn less_equal(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(Operation::compare(lhs, rhs)?.is_le()))
    }

    pub fn greater(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(Operation::compare(lhs, rhs)?.is_gt()))
    }

    pub fn greater_equal(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(Operation::compare(lhs, rhs)?.is_ge()))
    }

    pub fn not(val: Val) -> Result<Val> {
        if let Val::String(_) = val {
            return Err(error!(TypeMismatch));
        }
        Ok(Val::Integer(!i16::try_from(val)?))
    }

    pub fn and(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = Operation::integers(lhs, rhs)?;
        Ok(Val::Integer(l & r))
    }

    pub fn or(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = Operation::integers(lhs, rhs)?;
        Ok(Val::Integer(l | r))
    }

    pub fn xor(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = Operation::integers(lhs, rhs)?;
        Ok(Val::Integer(l ^ r))
    }

    pub fn imp(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = Operation::integers(lhs, rhs)?;
        Ok(Val::Integer(!l | r))
    }

    pub fn eqv(lhs: Val, rhs: Val) -> Result<Val> {
        let (l, r) = Operation::integers(lhs, rhs)?;
        Ok(Val::Integer(!(l ^ r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    #[test]
    fn test_promotion() {
        assert_eq!(Operation::sum(Val::Integer(1), Val::Single(0.5)), Ok(Val::Single(1.5)));
        assert_eq!(Operation::sum(Val::Single(1.0), Val::Double(0.5)), Ok(Val::Double(1.5)));
        assert_eq!(Operation::divide(Val::Integer(1), Val::Integer(4)), Ok(Val::Single(0.25)));
    }

    #[test]
    fn test_integer_overflow() {
        let e = Operation::sum(Val::Integer(32767), Val::Integer(1)).unwrap_err();
        assert_eq!(e.code(), ErrorCode::Overflow as u16);
    }

    #[test]
    fn test_division_by_zero() {
        let e = Operation::divide(Val::Integer(1), Val::Integer(0)).unwrap_err();
        assert_eq!(e.code(), ErrorCode::DivisionByZero as u16);
        assert!(Operation::modulus(Val::Integer(1), Val::Integer(0)).is_err());
    }

    #[test]
    fn test_strings() {
        let a = Val::from_bytes(b"AB");
        let b = Val::from_bytes(b"B");
        assert_eq!(Operation::less(a.clone(), b.clone()), Ok(Val::Integer(-1)));
        assert_eq!(Operation::sum(a.clone(), b), Ok(Val::from_bytes(b"ABB")));
        assert!(Operation::sum(a, Val::Integer(1)).is_err());
    }

    #[test]
    fn test_logic() {
        assert_eq!(Operation::not(Val::Integer(0)), Ok(Val::Integer(-1)));
        assert_eq!(Operation::and(Val::Integer(6), Val::Integer(3)), Ok(Val::Integer(2)));
        assert_eq!(Operation::imp(Val::Integer(0), Val::Integer(0)), Ok(Val::Integer(-1)));
    }
}
