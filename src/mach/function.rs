use super::{Opcode, Val};
use crate::error;
use crate::lang::Error;
use std::convert::TryFrom;
use std::ops::RangeInclusive;

type Result<T> = std::result::Result<T, Error>;

/// ## Built-in functions
///
/// Pure functions of their arguments. Functions that read machine
/// registers are executed by the runtime directly.

pub struct Function {}

impl Function {
    pub fn opcode_and_arity(func_name: &str, args: usize) -> Option<(Opcode, RangeInclusive<usize>)> {
        Some(match func_name {
            "ABS" => (Opcode::Abs, 1..=1),
            "ASC" => (Opcode::Asc, 1..=1),
            "CHR$" => (Opcode::Chr, 1..=1),
            "COS" => (Opcode::Cos, 1..=1),
            "CSRLIN" => (Opcode::Csrlin, 0..=0),
            "DATE$" => (Opcode::Date, 0..=0),
            "EOF" => (Opcode::Eof, 1..=1),
            "FRE" => (Opcode::Fre(args), 0..=1),
            "INT" => (Opcode::Int, 1..=1),
            "LEFT$" => (Opcode::Left, 2..=2),
            "LEN" => (Opcode::Len, 1..=1),
            "MID$" => (Opcode::Mid(args), 2..=3),
            "POS" => (Opcode::Pos(args), 0..=1),
            "RIGHT$" => (Opcode::Right, 2..=2),
            "RND" => (Opcode::Rnd(args), 0..=1),
            "SIN" => (Opcode::Sin, 1..=1),
            "SQR" => (Opcode::Sqr, 1..=1),
            "STR$" => (Opcode::Str, 1..=1),
            "STRING$" => (Opcode::Strings, 2..=2),
            "TIME$" => (Opcode::Time, 0..=0),
            "VAL" => (Opcode::Value, 1..=1),
            _ => return None,
        })
    }

    fn string(val: Val) -> Result<std::rc::Rc<[u8]>> {
        match val {
            Val::String(s) => Ok(s),
            _ => Err(error!(TypeMismatch)),
        }
    }

    fn count(val: Val) -> Result<usize> {
        let n = i16::try_from(val)?;
        if n < 0 {
            return Err(error!(IllegalFunctionCall));
        }
        Ok(n as usize)
    }

    pub fn abs(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Integer(n) => match n.checked_abs() {
                Some(n) => Ok(Integer(n)),
                None => Ok(Single(-f32::from(n))),
            },
            Single(n) => Ok(Single(n.abs())),
            Double(n) => Ok(Double(n.abs())),
            String(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn asc(val: Val) -> Result<Val> {
        match Function::string(val)?.first() {
            Some(b) => Ok(Val::Integer(i16::from(*b))),
            None => Err(error!(IllegalFunctionCall)),
        }
    }

    pub fn chr(val: Val) -> Result<Val> {
        let n = i16::try_from(val)?;
        match u8::try_from(n) {
            Ok(b) => Ok(Val::from_bytes(&[b])),
            Err(_) => Err(error!(IllegalFunctionCall)),
        }
    }

    pub fn cos(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Integer(n) => Ok(Single(f32::from(n).cos())),
            Single(n) => Ok(Single(n.cos())),
            Double(n) => Ok(Double(n.cos())),
            String(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn int(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Integer(n) => Ok(Integer(n)),
            Single(n) => Ok(Single(n.floor())),
            Double(n) => Ok(Double(n.floor())),
            String(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn left(string: Val, len: Val) -> Result<Val> {
        let s = Function::string(string)?;
        let n = Function::count(len)?.min(s.len());
        Ok(Val::from_bytes(&s[..n]))
    }

    pub fn len(val: Val) -> Result<Val> {
        Ok(Val::Integer(Function::string(val)?.len() as i16))
    }

    pub fn mid(string: Val, start: Val, len: Option<Val>) -> Result<Val> {
        let s = Function::string(string)?;
        let start = Function::count(start)?;
        if start < 1 {
            return Err(error!(IllegalFunctionCall));
        }
        let len = match len {
            Some(len) => Function::count(len)?,
            None => s.len(),
        };
        if start > s.len() {
            return Ok(Val::from_bytes(b""));
        }
        let end = (start - 1).saturating_add(len).min(s.len());
        Ok(Val::from_bytes(&s[start - 1..end]))
    }

    pub fn right(string: Val, len: Val) -> Result<Val> {
        let s = Function::string(string)?;
        let n = Function::count(len)?.min(s.len());
        Ok(Val::from_bytes(&s[s.len() - n..]))
    }

    pub fn sin(val: Val) -> Result<Val> {
        use Val::*;
        match val {
            Integer(n) => Ok(Single(f32::from(n).sin())),
            Single(n) => Ok(Single(n.sin())),
            Double(n) => Ok(Double(n.sin())),
            String(_) => Err(error!(TypeMismatch)),
        }
    }

    pub fn sqr(val: Val) -> Result<Val> {
        use Val::*;
        let negative = match &val {
            Integer(n) => *n < 0,
            Single(n) => *n < 0.0,
            Double(n) => *n < 0.0,
            String(_) => return Err(error!(TypeMismatch)),
        };
        if negative {
            return Err(error!(IllegalFunctionCall));
        }
        match val {
            Double(n) => Ok(Double(n.sqrt())),
            _ => Ok(Single(f32::try_from(val)?.sqrt())),
        }
    }

    pub fn str(val: Val) -> Result<Val> {
        Ok(Val::from_bytes(val.to_str()?.as_bytes()))
    }

    pub fn string_of(len: Val, fill: Val) -> Result<Val> {
        let n = Function::count(len)?;
        if n > 255 {
            return Err(error!(IllegalFunctionCall));
        }
        let byte = match fill {
            Val::String(s) => match s.first() {
                Some(b) => *b,
                None => return Err(error!(IllegalFunctionCall)),
            },
            number => match u8::try_from(i16::try_from(number)?) {
                Ok(b) => b,
                Err(_) => return Err(error!(IllegalFunctionCall)),
            },
        };
        Ok(Val::from_bytes(&vec![byte; n]))
    }

    pub fn val(val: Val) -> Result<Val> {
        let s = Function::string(val)?;
        Ok(Function::parse_number(&s))
    }

    /// Read the longest number at the start of `s`, ignoring leading
    /// blanks. Anything unreadable is zero.
    pub fn parse_number(s: &[u8]) -> Val {
        let text: String = s
            .iter()
            .map(|b| *b as char)
            .skip_while(|c| *c == ' ' || *c == '\t')
            .collect();
        let mut end = 0;
        let mut digits = 0;
        let mut seen_dot = false;
        let mut seen_exp = false;
        let mut double = false;
        let chars: Vec<char> = text.chars().collect();
        while end < chars.len() {
            let c = chars[end].to_ascii_uppercase();
            match c {
                '+' | '-' if end == 0 => {}
                '+' | '-' if seen_exp && matches!(chars[end - 1].to_ascii_uppercase(), 'E' | 'D') => {}
                '0'..='9' => {
                    if !seen_exp {
                        digits += 1;
                    }
                }
                '.' if !seen_dot && !seen_exp => seen_dot = true,
                'E' | 'D' if !seen_exp && digits > 0 => {
                    seen_exp = true;
                    double = c == 'D';
                }
                _ => break,
            }
            end += 1;
        }
        let mut number: String = chars[..end].iter().collect();
        number = number.to_ascii_uppercase().replace('D', "E");
        while number.ends_with(|c: char| c == 'E' || c == '+' || c == '-') {
            number.pop();
        }
        let n: f64 = number.parse().unwrap_or(0.0);
        if double || digits > 7 {
            Val::Double(n)
        } else {
            Val::Single(n as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Val {
        Val::from_bytes(v.as_bytes())
    }

    #[test]
    fn test_string_slicing() {
        assert_eq!(Function::left(s("HELLO"), Val::Integer(2)), Ok(s("HE")));
        assert_eq!(Function::right(s("HELLO"), Val::Integer(9)), Ok(s("HELLO")));
        assert_eq!(
            Function::mid(s("HELLO"), Val::Integer(2), Some(Val::Integer(3))),
            Ok(s("ELL"))
        );
        assert_eq!(Function::mid(s("HELLO"), Val::Integer(9), None), Ok(s("")));
        assert!(Function::mid(s("HELLO"), Val::Integer(0), None).is_err());
    }

    #[test]
    fn test_val() {
        assert_eq!(Function::val(s("  12.5xyz")), Ok(Val::Single(12.5)));
        assert_eq!(Function::val(s("-3e2")), Ok(Val::Single(-300.0)));
        assert_eq!(Function::val(s("abc")), Ok(Val::Single(0.0)));
        assert_eq!(Function::val(s("1d3")), Ok(Val::Double(1000.0)));
    }

    #[test]
    fn test_chr_asc() {
        assert_eq!(Function::chr(Val::Integer(65)), Ok(s("A")));
        assert!(Function::chr(Val::Integer(256)).is_err());
        assert_eq!(Function::asc(s("A")), Ok(Val::Integer(65)));
        assert!(Function::asc(s("")).is_err());
    }

    #[test]
    fn test_string_of() {
        assert_eq!(Function::string_of(Val::Integer(3), s("xy")), Ok(s("xxx")));
        assert_eq!(Function::string_of(Val::Integer(2), Val::Integer(42)), Ok(s("**")));
    }
}
