use super::{Array, Kind, Val, DEFAULT_ARRAY_BOUND};
use crate::error;
use crate::lang::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Variable memory
///
/// Scalars and arrays live in separate namespaces keyed by upper case
/// name with sigil. Every commit of new storage is charged against a
/// free memory counter which only ever goes down. A string slot is
/// charged for its longest value so far, not for every assignment.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Var {
    vars: HashMap<Rc<str>, Val>,
    arrays: HashMap<Rc<str>, Array>,
    reserved: HashMap<Rc<str>, u8>,
    free: u32,
}

impl Var {
    pub fn new(memory: u32) -> Var {
        Var {
            vars: HashMap::default(),
            arrays: HashMap::default(),
            reserved: HashMap::default(),
            free: memory,
        }
    }

    /// Drops every variable. Memory is not given back.
    pub fn clear(&mut self) {
        self.vars.clear();
        self.arrays.clear();
        self.reserved.clear();
    }

    pub fn free(&self) -> u32 {
        self.free
    }

    fn charge(&mut self, bytes: u32) -> Result<()> {
        match self.free.checked_sub(bytes) {
            Some(free) => {
                self.free = free;
                Ok(())
            }
            None => Err(error!(OutOfMemory)),
        }
    }

    fn string_len(value: &Val) -> Result<u8> {
        match value {
            Val::String(s) => match u8::try_from(s.len()) {
                Ok(len) => Ok(len),
                Err(_) => Err(error!(StringTooLong; "MAXIMUM STRING LENGTH IS 255")),
            },
            _ => Ok(0),
        }
    }

    fn array_cost(var_name: &str, bounds: &[u16], kind: Kind) -> Result<u32> {
        let elements = Array::element_count(bounds) as u64 * u64::from(kind.size());
        let header = var_name.len() as u64 + 4 + 2 * bounds.len() as u64;
        match u32::try_from(elements + header) {
            Ok(cost) => Ok(cost),
            Err(_) => Err(error!(OutOfMemory)),
        }
    }

    pub fn fetch(&self, var_name: &str) -> Val {
        match self.vars.get(var_name) {
            Some(val) => val.clone(),
            None => Kind::of(var_name).zero(),
        }
    }

    pub fn store(&mut self, var_name: &Rc<str>, value: Val) -> Result<()> {
        let kind = Kind::of(var_name);
        let value = value.coerce(kind)?;
        let len = Var::string_len(&value)?;
        let peak = self.reserved.get(var_name).copied().unwrap_or(0);
        let mut cost = u32::from(len.saturating_sub(peak));
        if !self.vars.contains_key(var_name) {
            cost += var_name.len() as u32 + 2 + kind.size();
        }
        self.charge(cost)?;
        self.vars.insert(var_name.clone(), value);
        if len > peak {
            self.reserved.insert(var_name.clone(), len);
        }
        Ok(())
    }

    pub fn array(&self, var_name: &str) -> Option<&Array> {
        self.arrays.get(var_name)
    }

    pub fn bounds(&self, var_name: &str) -> Option<&[u16]> {
        self.arrays.get(var_name).map(|a| a.bounds())
    }

    pub fn dimension(&mut self, var_name: &Rc<str>, bounds: Vec<u16>) -> Result<()> {
        if self.arrays.contains_key(var_name) {
            return Err(error!(RedimensionedArray));
        }
        let kind = Kind::of(var_name);
        let cost = Var::array_cost(var_name, &bounds, kind)?;
        self.charge(cost)?;
        self.arrays
            .insert(var_name.clone(), Array::new(bounds, kind));
        Ok(())
    }

    pub fn dimension_array(&mut self, var_name: &Rc<str>, bounds: Vec<Val>) -> Result<()> {
        let bounds = Var::subscripts(bounds)?;
        self.dimension(var_name, bounds)
    }

    pub fn fetch_array(&mut self, var_name: &Rc<str>, indices: Vec<Val>) -> Result<Val> {
        let indices = Var::subscripts(indices)?;
        self.auto_dimension(var_name, indices.len())?;
        match self.arrays.get(var_name) {
            Some(arr) => Ok(arr.get(&indices)?.clone()),
            None => Err(error!(InternalError; "ARRAY VANISHED")),
        }
    }

    pub fn store_array(&mut self, var_name: &Rc<str>, indices: Vec<Val>, value: Val) -> Result<()> {
        let indices = Var::subscripts(indices)?;
        self.store_element(var_name, &indices, value)
    }

    pub fn store_element(&mut self, var_name: &Rc<str>, indices: &[u16], value: Val) -> Result<()> {
        let value = value.coerce(Kind::of(var_name))?;
        self.auto_dimension(var_name, indices.len())?;
        let len = Var::string_len(&value)?;
        let cost = match self.arrays.get(var_name) {
            Some(arr) => arr.growth(indices, len)?,
            None => return Err(error!(InternalError; "ARRAY VANISHED")),
        };
        self.charge(cost)?;
        match self.arrays.get_mut(var_name) {
            Some(arr) => arr.set(indices, value),
            None => Err(error!(InternalError; "ARRAY VANISHED")),
        }
    }

    /// Replace the whole contents of an array. `bounds` dimensions it
    /// when it does not exist yet. Elements not listed become zero. The
    /// cost is worked out first, so on error nothing has changed.
    pub fn fill_array(
        &mut self,
        var_name: &Rc<str>,
        bounds: Vec<u16>,
        elements: Vec<(Vec<u16>, Val)>,
    ) -> Result<()> {
        let kind = Kind::of(var_name);
        let (mut array, mut cost) = match self.arrays.get(var_name) {
            Some(existing) => (existing.clone(), 0),
            None => {
                let cost = Var::array_cost(var_name, &bounds, kind)?;
                (Array::new(bounds, kind), cost)
            }
        };
        array.reset(kind);
        for (indices, value) in elements {
            let value = value.coerce(kind)?;
            cost += array.growth(&indices, Var::string_len(&value)?)?;
            array.set(&indices, value)?;
        }
        self.charge(cost)?;
        self.arrays.insert(var_name.clone(), array);
        Ok(())
    }

    fn auto_dimension(&mut self, var_name: &Rc<str>, dimensions: usize) -> Result<()> {
        if self.arrays.contains_key(var_name) {
            return Ok(());
        }
        self.dimension(var_name, vec![DEFAULT_ARRAY_BOUND; dimensions])
    }

    fn subscripts(vals: Vec<Val>) -> Result<Vec<u16>> {
        let mut v: Vec<u16> = vec![];
        for val in vals {
            let i = i16::try_from(val)?;
            if i < 0 {
                return Err(error!(SubscriptOutOfRange));
            }
            v.push(i as u16);
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    fn name(s: &str) -> Rc<str> {
        s.into()
    }

    #[test]
    fn test_unset_reads_zero() {
        let var = Var::new(1000);
        assert_eq!(var.fetch("A%"), Val::Integer(0));
        assert_eq!(var.fetch("A$"), Val::from_bytes(b""));
    }

    #[test]
    fn test_store_coerces_to_sigil() {
        let mut var = Var::new(1000);
        var.store(&name("A%"), Val::Single(2.7)).unwrap();
        assert_eq!(var.fetch("A%"), Val::Integer(2));
        assert!(var.store(&name("A$"), Val::Integer(1)).is_err());
    }

    #[test]
    fn test_free_memory_only_decreases() {
        let mut var = Var::new(1000);
        var.store(&name("A!"), Val::Single(1.0)).unwrap();
        let after_first = var.free();
        assert_eq!(after_first, 1000 - (2 + 2 + 4));
        var.store(&name("A!"), Val::Single(2.0)).unwrap();
        assert_eq!(var.free(), after_first);
        var.store(&name("S$"), Val::from_bytes(b"abc")).unwrap();
        assert_eq!(var.free(), after_first - (2 + 2 + 3) - 3);
        let before_clear = var.free();
        var.clear();
        assert_eq!(var.free(), before_clear);
    }

    #[test]
    fn test_string_charged_by_peak_length() {
        let mut var = Var::new(1000);
        let s = name("S$");
        var.store(&s, Val::from_bytes(b"hello")).unwrap();
        let after_first = var.free();
        assert_eq!(after_first, 1000 - (2 + 2 + 3) - 5);
        for _ in 0..100 {
            var.store(&s, Val::from_bytes(b"hello")).unwrap();
        }
        var.store(&s, Val::from_bytes(b"hi")).unwrap();
        assert_eq!(var.free(), after_first);
        var.store(&s, Val::from_bytes(b"goodbye")).unwrap();
        assert_eq!(var.free(), after_first - 2);

        let a = name("A$");
        var.store_array(&a, vec![Val::Integer(1)], Val::from_bytes(b"abc"))
            .unwrap();
        let after_element = var.free();
        var.store_array(&a, vec![Val::Integer(1)], Val::from_bytes(b"xyz"))
            .unwrap();
        assert_eq!(var.free(), after_element);
        var.store_array(&a, vec![Val::Integer(2)], Val::from_bytes(b"xyz"))
            .unwrap();
        assert_eq!(var.free(), after_element - 3);
    }

    #[test]
    fn test_fill_array_is_all_or_nothing() {
        let mut var = Var::new(60);
        let a = name("A$");
        var.fill_array(&a, vec![2], vec![(vec![0], Val::from_bytes(b"ab"))])
            .unwrap();
        let free = var.free();
        let big = Val::from_bytes(&[b'x'; 200]);
        let e = var
            .fill_array(&a, vec![2], vec![(vec![1], Val::from_bytes(b"cd")), (vec![2], big)])
            .unwrap_err();
        assert_eq!(e.code(), ErrorCode::OutOfMemory as u16);
        assert_eq!(var.free(), free);
        assert_eq!(
            var.fetch_array(&a, vec![Val::Integer(0)]),
            Ok(Val::from_bytes(b"ab"))
        );
        assert_eq!(
            var.fetch_array(&a, vec![Val::Integer(1)]),
            Ok(Val::from_bytes(b""))
        );
        var.fill_array(&a, vec![2], vec![(vec![1], Val::from_bytes(b"cd"))])
            .unwrap();
        assert_eq!(var.free(), free - 2);
        assert_eq!(
            var.fetch_array(&a, vec![Val::Integer(0)]),
            Ok(Val::from_bytes(b""))
        );
    }

    #[test]
    fn test_out_of_memory_leaves_state() {
        let mut var = Var::new(10);
        let e = var.dimension(&name("A!"), vec![10]).unwrap_err();
        assert_eq!(e.code(), ErrorCode::OutOfMemory as u16);
        assert_eq!(var.free(), 10);
        assert!(var.array("A!").is_none());
    }

    #[test]
    fn test_auto_dimension() {
        let mut var = Var::new(60000);
        let a = name("A!");
        var.store_array(&a, vec![Val::Integer(10), Val::Integer(3)], Val::Integer(5))
            .unwrap();
        assert_eq!(var.bounds("A!"), Some(&[10u16, 10][..]));
        assert_eq!(
            var.fetch_array(&a, vec![Val::Integer(10), Val::Integer(3)]),
            Ok(Val::Single(5.0))
        );
        let e = var.fetch_array(&a, vec![Val::Integer(11), Val::Integer(0)]);
        assert_eq!(e.unwrap_err().code(), ErrorCode::SubscriptOutOfRange as u16);
    }

    #[test]
    fn test_redimension() {
        let mut var = Var::new(60000);
        var.dimension_array(&name("B%"), vec![Val::Integer(3)]).unwrap();
        let e = var.dimension_array(&name("B%"), vec![Val::Integer(3)]);
        assert_eq!(e.unwrap_err().code(), ErrorCode::RedimensionedArray as u16);
    }
}
