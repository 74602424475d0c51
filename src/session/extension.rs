use super::convert::{to_host, HostValue};
use super::scope::Scope;
use crate::codepage;
use crate::error;
use crate::lang;
use crate::mach::{Extend, Val, Var};
use log::debug;
use std::collections::BTreeMap;

/// Errors a host function may return. The message reaches BASIC.
pub type HostError = Box<dyn std::error::Error>;

type Callable = Box<dyn FnMut(&mut Scope<'_>, &[HostValue]) -> Result<HostValue, HostError>>;

/// ## Extension
///
/// Host functions callable from BASIC as `_NAME`. The table is built
/// once, before the session starts, and can't change afterwards.
///
/// ```
/// use basic::session::{Extension, HostValue, Session};
///
/// let extension = Extension::new().function("twice", |args| match args {
///     [HostValue::Float(x)] => Ok(x * 2.0),
///     _ => Err("expected one number".into()),
/// });
/// let mut session = Session::builder().extension(extension).build();
/// session.execute("a = _twice(1.5)").unwrap();
/// assert_eq!(session.get_variable("A!").unwrap(), HostValue::Float(3.0));
/// ```

#[derive(Default)]
pub struct Extension {
    table: BTreeMap<String, Callable>,
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

fn wrap<F, R>(mut f: F) -> Callable
where
    F: FnMut(&mut Scope<'_>, &[HostValue]) -> Result<R, HostError> + 'static,
    R: Into<HostValue>,
{
    Box::new(move |scope: &mut Scope<'_>, args: &[HostValue]| f(scope, args).map(Into::into))
}

fn lookup_key(name: &str) -> String {
    name.trim_start_matches('_')
        .trim_end_matches(|c: char| matches!(c, '%' | '!' | '#' | '$'))
        .to_ascii_uppercase()
}

impl Extension {
    pub fn new() -> Extension {
        Extension::default()
    }

    fn register(mut self, name: &str, callable: Callable) -> Extension {
        let name = name.trim();
        if name.is_empty() || name.starts_with('_') {
            debug!("extension {:?} is private and was not registered", name);
            return self;
        }
        debug!("registered extension _{}", name.to_ascii_uppercase());
        self.table.insert(name.to_ascii_uppercase(), callable);
        self
    }

    /// Register a function of its arguments.
    pub fn function<F, R>(self, name: &str, mut f: F) -> Extension
    where
        F: FnMut(&[HostValue]) -> Result<R, HostError> + 'static,
        R: Into<HostValue>,
    {
        self.register(name, wrap(move |_: &mut Scope<'_>, args: &[HostValue]| f(args)))
    }

    /// Register a function that also works on the session's variables.
    pub fn method<F, R>(self, name: &str, f: F) -> Extension
    where
        F: FnMut(&mut Scope<'_>, &[HostValue]) -> Result<R, HostError> + 'static,
        R: Into<HostValue>,
    {
        self.register(name, wrap(f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(|k| k.as_str())
    }
}

/// Bring a host result back into BASIC. Numbers come back double.
fn from_host(value: HostValue) -> Result<Val, lang::Error> {
    let bytes = match value {
        HostValue::Int(n) => return Ok(Val::Double(n as f64)),
        HostValue::Float(n) => return Ok(Val::Double(n)),
        HostValue::Bool(b) => return Ok(Val::Double(if b { -1.0 } else { 0.0 })),
        HostValue::Bytes(b) => b,
        HostValue::Text(s) => match codepage::encode(&s) {
            Ok(b) => b,
            Err(_) => return Err(error!(IllegalFunctionCall; "TEXT NOT IN CODE PAGE")),
        },
        HostValue::List(_) => return Err(error!(TypeMismatch)),
    };
    if bytes.len() > 255 {
        return Err(error!(StringTooLong));
    }
    Ok(Val::from_bytes(&bytes))
}

impl Extend for Extension {
    fn call(&mut self, name: &str, var: &mut Var, args: Vec<Val>) -> Result<Val, lang::Error> {
        let callable = match self.table.get_mut(&lookup_key(name)) {
            Some(callable) => callable,
            None => return Err(error!(UndefinedUserFunction)),
        };
        let args: Vec<HostValue> = args.iter().map(to_host).collect();
        let mut scope = Scope::new(var);
        match callable(&mut scope, &args) {
            Ok(value) => from_host(value),
            Err(e) => Err(error!(IllegalFunctionCall; e.to_string())),
        }
    }
}
