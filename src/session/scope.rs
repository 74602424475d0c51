use super::convert::{to_host, to_val, HostValue};
use super::error::{Error, Result};
use crate::codepage::BasicText;
use crate::mach::{Array, Kind, Val, Var, DEFAULT_ARRAY_BOUND};
use std::rc::Rc;

/// ## Variables as seen by an extension
///
/// Borrows the session's own variable table, so reads see what the
/// program stored and writes are visible to it straight away.

pub struct Scope<'a> {
    var: &'a mut Var,
}

impl<'a> Scope<'a> {
    pub fn new(var: &'a mut Var) -> Scope<'a> {
        Scope { var }
    }

    pub fn get_variable<T: BasicText>(&self, name: T) -> Result<HostValue> {
        read_variable(&*self.var, &name.to_text())
    }

    pub fn set_variable<T: BasicText, V: Into<HostValue>>(&mut self, name: T, value: V) -> Result<()> {
        write_variable(&mut *self.var, &name.to_text(), value.into())
    }

    pub fn free(&self) -> u32 {
        self.var.free()
    }
}

/// A host variable name: `A%`, `NAME$`, `B!()`. The sigil is required.
struct Name {
    name: Rc<str>,
    kind: Kind,
    is_array: bool,
}

fn parse_name(text: &str) -> Result<Name> {
    let mut text = text.trim().to_ascii_uppercase();
    let is_array = text.ends_with("()");
    if is_array {
        text.truncate(text.len() - 2);
    }
    let kind = match text.chars().last().and_then(Kind::from_sigil) {
        Some(kind) => kind,
        None => {
            return Err(Error::usage(format!(
                "VARIABLE NAME {:?} NEEDS A TYPE SIGIL",
                text
            )))
        }
    };
    let base = &text[..text.len() - 1];
    let mut chars = base.chars();
    let valid = match chars.next() {
        Some(c) => c.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric() || c == '.'),
        None => false,
    };
    if !valid {
        return Err(Error::usage(format!("{:?} IS NOT A VARIABLE NAME", text)));
    }
    Ok(Name {
        name: text.into(),
        kind,
        is_array,
    })
}

fn array_to_host(array: &Array) -> HostValue {
    fn nest(bounds: &[u16], values: &[Val]) -> HostValue {
        match bounds.split_first() {
            None => values.first().map(to_host).unwrap_or(HostValue::List(vec![])),
            Some((first, rest)) => {
                let stride = values.len() / (*first as usize + 1);
                HostValue::List(values.chunks(stride.max(1)).map(|c| nest(rest, c)).collect())
            }
        }
    }
    nest(array.bounds(), array.values())
}

/// Read a scalar, or a whole array as nested lists.
pub fn read_variable(var: &Var, text: &str) -> Result<HostValue> {
    let name = parse_name(text)?;
    if !name.is_array {
        return Ok(to_host(&var.fetch(&name.name)));
    }
    match var.array(&name.name) {
        Some(array) => Ok(array_to_host(array)),
        None => Ok(HostValue::List(vec![])),
    }
}

/// Shape of nested host lists, one extent per level.
fn shape(value: &HostValue, depth: usize, extents: &mut Vec<usize>) -> Result<()> {
    match value {
        HostValue::List(items) => {
            if extents.len() == depth {
                extents.push(0);
            }
            extents[depth] = extents[depth].max(items.len());
            for item in items {
                shape(item, depth + 1, extents)?;
            }
            Ok(())
        }
        _ => {
            if depth < extents.len() {
                return Err(Error::usage("ARRAY DATA IS NOT RECTANGULAR"));
            }
            Ok(())
        }
    }
}

fn elements<'v>(
    value: &'v HostValue,
    index: &mut Vec<u16>,
    out: &mut Vec<(Vec<u16>, &'v HostValue)>,
) -> Result<()> {
    match value {
        HostValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                index.push(i as u16);
                elements(item, index, out)?;
                index.pop();
            }
        }
        scalar => out.push((index.clone(), scalar)),
    }
    Ok(())
}

/// Store a scalar, or replace an array's contents with nested lists.
/// Cells the lists do not reach are reset to zero. A new array is
/// dimensioned big enough for the data; an existing one must already be.
/// On any error the array is left as it was.
pub fn write_variable(var: &mut Var, text: &str, value: HostValue) -> Result<()> {
    let name = parse_name(text)?;
    if !name.is_array {
        let val = to_val(&value, name.kind)?;
        return Ok(var.store(&name.name, val)?);
    }
    if !matches!(value, HostValue::List(_)) {
        return Err(Error::usage("ARRAY DATA MUST BE A LIST"));
    }
    let mut extents = vec![];
    shape(&value, 0, &mut extents)?;
    if extents.iter().any(|e| *e == 0) {
        return Ok(());
    }
    if extents.iter().any(|e| *e > u16::max_value() as usize) {
        return Err(Error::usage("ARRAY DATA IS TOO LARGE"));
    }
    let mut flat = vec![];
    elements(&value, &mut vec![], &mut flat)?;
    if flat.iter().any(|(index, _)| index.len() != extents.len()) {
        return Err(Error::usage("ARRAY DATA IS NOT RECTANGULAR"));
    }
    let mut converted = Vec::with_capacity(flat.len());
    for (index, value) in flat {
        converted.push((index, to_val(value, name.kind)?));
    }
    let bounds = extents
        .iter()
        .map(|e| (*e as u16 - 1).max(DEFAULT_ARRAY_BOUND))
        .collect();
    Ok(var.fill_array(&name.name, bounds, converted)?)
}
