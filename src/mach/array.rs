use super::{Kind, Val};
use crate::error;
use crate::lang::Error;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

type Result<T> = std::result::Result<T, Error>;

/// Arrays spring into existence with this upper bound in every dimension
/// the first access uses.
pub const DEFAULT_ARRAY_BOUND: u16 = 10;

/// ## Array storage
///
/// A flat buffer in row-major order. Each dimension `d` holds indices
/// `0..=bounds[d]`. Alongside each element is the longest string it has
/// ever held, so string space is only charged when that grows.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    bounds: Vec<u16>,
    data: Vec<Val>,
    reserved: Vec<u8>,
}

impl Array {
    pub fn new(bounds: Vec<u16>, kind: Kind) -> Array {
        let len = Array::element_count(&bounds);
        Array {
            bounds,
            data: vec![kind.zero(); len],
            reserved: vec![0; len],
        }
    }

    pub fn element_count(bounds: &[u16]) -> usize {
        bounds.iter().map(|b| *b as usize + 1).product()
    }

    pub fn bounds(&self) -> &[u16] {
        &self.bounds
    }

    pub fn values(&self) -> &[Val] {
        &self.data
    }

    pub fn offset(&self, indices: &[u16]) -> Result<usize> {
        if indices.len() != self.bounds.len() {
            return Err(error!(SubscriptOutOfRange));
        }
        let mut offset = 0;
        for (index, bound) in indices.iter().zip(&self.bounds) {
            if index > bound {
                return Err(error!(SubscriptOutOfRange));
            }
            offset = offset * (*bound as usize + 1) + *index as usize;
        }
        Ok(offset)
    }

    pub fn get(&self, indices: &[u16]) -> Result<&Val> {
        let offset = self.offset(indices)?;
        self.data
            .get(offset)
            .ok_or_else(|| error!(InternalError; "ARRAY OFFSET"))
    }

    /// String space needed to store a string of `len` bytes at `indices`.
    pub fn growth(&self, indices: &[u16], len: u8) -> Result<u32> {
        let offset = self.offset(indices)?;
        match self.reserved.get(offset) {
            Some(peak) => Ok(u32::from(len.saturating_sub(*peak))),
            None => Err(error!(InternalError; "ARRAY OFFSET")),
        }
    }

    pub fn set(&mut self, indices: &[u16], val: Val) -> Result<()> {
        let offset = self.offset(indices)?;
        let len = match &val {
            Val::String(s) => u8::try_from(s.len()).unwrap_or(u8::max_value()),
            _ => 0,
        };
        match (self.data.get_mut(offset), self.reserved.get_mut(offset)) {
            (Some(slot), Some(peak)) => {
                *slot = val;
                *peak = (*peak).max(len);
                Ok(())
            }
            _ => Err(error!(InternalError; "ARRAY OFFSET")),
        }
    }

    /// Every element back to zero. Reserved string space is kept.
    pub fn reset(&mut self, kind: Kind) {
        for slot in self.data.iter_mut() {
            *slot = kind.zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major() {
        let mut arr = Array::new(vec![1, 2], Kind::Integer);
        assert_eq!(arr.values().len(), 6);
        arr.set(&[1, 0], Val::Integer(7)).unwrap();
        assert_eq!(arr.values()[3], Val::Integer(7));
        assert_eq!(arr.get(&[1, 0]).unwrap(), &Val::Integer(7));
    }

    #[test]
    fn test_growth_follows_peak() {
        let mut arr = Array::new(vec![2], Kind::String);
        assert_eq!(arr.growth(&[1], 5), Ok(5));
        arr.set(&[1], Val::from_bytes(b"hello")).unwrap();
        assert_eq!(arr.growth(&[1], 3), Ok(0));
        assert_eq!(arr.growth(&[1], 7), Ok(2));
        assert_eq!(arr.growth(&[0], 3), Ok(3));
        arr.reset(Kind::String);
        assert_eq!(arr.get(&[1]).unwrap(), &Val::from_bytes(b""));
        assert_eq!(arr.growth(&[1], 5), Ok(0));
    }

    #[test]
    fn test_out_of_range() {
        let arr = Array::new(vec![DEFAULT_ARRAY_BOUND], Kind::Single);
        assert!(arr.get(&[10]).is_ok());
        assert!(arr.get(&[11]).is_err());
        assert!(arr.get(&[1, 1]).is_err());
    }
}
