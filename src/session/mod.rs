/*!
## Rust Session Module

A session is one BASIC machine driven by a host program. The host runs
statements, reads and writes variables, evaluates expressions, binds its
own files and functions into the machine, and can suspend the whole
machine to disk to pick it up again in another process.

```
use basic::session::{HostValue, Session};

let mut session = Session::new();
session.execute("a% = 40").unwrap();
session.set_variable("B%", 2i64).unwrap();
assert_eq!(session.evaluate("a% + b%", None).unwrap(), HostValue::Int(42));
```

*/

mod convert;
mod error;
mod extension;
mod scope;
mod snapshot;

pub use self::convert::{convert, HostKind, HostValue};
pub use self::error::{Error, Result};
pub use self::extension::{Extension, HostError};
pub use self::scope::Scope;
pub use self::snapshot::VERSION;

use self::convert::to_host;
use self::scope::{read_variable, write_variable};
use crate::codepage::{self, BasicText};
use crate::config::Config;
use crate::lang::ast::FileMode;
use crate::lang::ErrorCode;
use crate::mach::{BoundFile, Event, Extend, Runtime, Target};
use log::{debug, info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Instructions run between checks for a finished statement.
const CYCLES: usize = 10_000;

/// How a call to `execute` finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ready,
    /// The program ran `SYSTEM`. The host may suspend the session now.
    System,
}

/// The BASIC file name of a bound file, like `@:00000001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceName(String);

impl DeviceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BasicText for DeviceName {
    fn to_text(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed(&self.0)
    }
}

/// A host file to bind into a session.
#[derive(Debug)]
pub enum BindTarget {
    Handle(File),
    Path(PathBuf),
}

impl From<File> for BindTarget {
    fn from(file: File) -> BindTarget {
        BindTarget::Handle(file)
    }
}

impl From<PathBuf> for BindTarget {
    fn from(path: PathBuf) -> BindTarget {
        BindTarget::Path(path)
    }
}

impl From<&Path> for BindTarget {
    fn from(path: &Path) -> BindTarget {
        BindTarget::Path(path.to_path_buf())
    }
}

impl From<&str> for BindTarget {
    fn from(path: &str) -> BindTarget {
        BindTarget::Path(PathBuf::from(path))
    }
}

impl From<String> for BindTarget {
    fn from(path: String) -> BindTarget {
        BindTarget::Path(PathBuf::from(path))
    }
}

/// Assembles the configuration and extension of a new session.
#[derive(Debug, Default)]
pub struct SessionBuilder {
    config: Config,
    extension: Option<Extension>,
}

impl SessionBuilder {
    /// Make a host directory available as a drive letter.
    pub fn mount<P: Into<PathBuf>>(mut self, drive: char, path: P) -> SessionBuilder {
        self.config = self.config.mount(drive, path);
        self
    }

    pub fn current_drive(mut self, drive: char) -> SessionBuilder {
        self.config.current_drive = drive.to_ascii_uppercase();
        self
    }

    pub fn max_files(mut self, max_files: usize) -> SessionBuilder {
        self.config.max_files = max_files;
        self
    }

    pub fn memory(mut self, memory: u32) -> SessionBuilder {
        self.config.memory = memory;
        self
    }

    pub fn seed(mut self, seed: u64) -> SessionBuilder {
        self.config.seed = seed;
        self
    }

    pub fn extension(mut self, extension: Extension) -> SessionBuilder {
        self.extension = Some(extension);
        self
    }

    pub fn build(self) -> Session {
        info!("new session with {:?}", self.config);
        let mut runtime = Runtime::new(self.config);
        runtime.set_extension(boxed(self.extension));
        Session {
            runtime,
            closed: false,
        }
    }
}

fn boxed(extension: Option<Extension>) -> Option<Box<dyn Extend>> {
    match extension {
        Some(extension) => Some(Box::new(extension)),
        None => None,
    }
}

/// ## Session
///
/// Files are flushed and closed when the session is closed or dropped,
/// unless it was suspended first.

pub struct Session {
    runtime: Runtime,
    closed: bool,
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Session {
        SessionBuilder::default().build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::usage("SESSION IS CLOSED"));
        }
        Ok(())
    }

    /// Run BASIC text, one line at a time. Numbered lines are stored in
    /// the program; other lines run immediately.
    pub fn execute<T: BasicText>(&mut self, text: T) -> Result<Outcome> {
        self.check_open()?;
        let text = text.to_text();
        for line in text.split(|c: char| c == '\n' || c == '\r') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.runtime.enter(line);
            loop {
                match self.runtime.execute(CYCLES) {
                    Event::Running => continue,
                    Event::Stopped => break,
                    Event::System => return Ok(Outcome::System),
                    Event::Errors(errors) => {
                        return Err(match errors.first() {
                            Some(e) => Error::Engine(e.clone()),
                            None => Error::Engine(crate::error!(InternalError)),
                        })
                    }
                }
            }
        }
        Ok(Outcome::Ready)
    }

    /// Evaluate an expression and convert the result.
    pub fn evaluate<T: BasicText>(&mut self, text: T, kind: Option<HostKind>) -> Result<HostValue> {
        self.check_open()?;
        let val = self.runtime.evaluate(&text.to_text())?;
        convert(to_host(&val), kind)
    }

    pub fn get_variable<T: BasicText>(&self, name: T) -> Result<HostValue> {
        self.check_open()?;
        read_variable(self.runtime.var(), &name.to_text())
    }

    pub fn set_variable<T: BasicText, V: Into<HostValue>>(&mut self, name: T, value: V) -> Result<()> {
        self.check_open()?;
        write_variable(self.runtime.var_mut(), &name.to_text(), value.into())
    }

    pub fn convert(&self, value: HostValue, kind: Option<HostKind>) -> Result<HostValue> {
        convert(value, kind)
    }

    /// Give BASIC access to a host file. The returned name can be used
    /// in `OPEN`. A path may name a mounted drive, as in `Z:DATA.TXT`.
    pub fn bind_file<B: Into<BindTarget>>(&mut self, target: B, create: bool) -> Result<DeviceName> {
        self.check_open()?;
        let bound = match target.into() {
            BindTarget::Handle(file) => BoundFile::Handle(file),
            BindTarget::Path(path) => BoundFile::Path {
                path: self.host_path(&path, create)?,
                create,
            },
        };
        Ok(DeviceName(self.runtime.bind(bound)))
    }

    fn host_path(&self, path: &Path, create: bool) -> Result<PathBuf> {
        let text = path.to_string_lossy();
        if text.trim().is_empty() {
            return Err(Error::usage("EMPTY FILE NAME"));
        }
        let devices = self.runtime.devices();
        let path = if devices.is_mounted_name(&text) {
            let mode = if create { FileMode::Output } else { FileMode::Input };
            match devices.resolve(&codepage::encode_lossy(&text), mode) {
                Ok((Target::Path(path), _)) => path,
                Ok(_) => return Err(Error::usage(format!("{} IS NOT A PATH", text))),
                Err(e) if e.code() == ErrorCode::FileNotFound as u16 => {
                    return Err(Error::resource(format!("{} not found", text), None))
                }
                Err(e) => return Err(Error::usage(format!("{}: {}", text, e))),
            }
        } else {
            path.to_path_buf()
        };
        if !create && !path.exists() {
            return Err(Error::resource(
                format!("{} not found", path.display()),
                None,
            ));
        }
        Ok(path)
    }

    /// Write the whole machine to `path`. The session is spent afterwards;
    /// its open files now belong to the snapshot and are left untouched.
    pub fn suspend<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.check_open()?;
        let path = path.as_ref();
        let state = self
            .runtime
            .capture()
            .map_err(|e| Error::resource(format!("cannot suspend session: {}", e), None))?;
        snapshot::write(path, &state)?;
        self.runtime.detach();
        self.closed = true;
        info!("suspended session to {}", path.display());
        Ok(())
    }

    /// Pick up a suspended session. Every file it had open is reopened
    /// where it was left.
    pub fn resume<P: AsRef<Path>>(path: P, extension: Option<Extension>) -> Result<Session> {
        let path = path.as_ref();
        let state = snapshot::read(path)?;
        let mut runtime = Runtime::restore(state)
            .map_err(|e| Error::resource(format!("cannot resume session: {}", e), None))?;
        runtime.set_extension(boxed(extension));
        info!("resumed session from {}", path.display());
        Ok(Session {
            runtime,
            closed: false,
        })
    }

    /// Flush and close every file and release bound files. Closing twice
    /// does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("closing session");
        Ok(self.runtime.close()?)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether `CONT` would carry on with a stopped program.
    pub fn can_continue(&self) -> bool {
        self.runtime.can_continue()
    }

    /// Cursor row, counted from 1.
    pub fn csrlin(&self) -> u16 {
        self.runtime.csrlin()
    }

    /// Cursor column, counted from 1.
    pub fn pos(&self) -> u16 {
        self.runtime.pos()
    }

    /// Console output since the last call.
    pub fn take_output(&mut self) -> String {
        self.runtime.take_output()
    }

    /// The `FRE` counter.
    pub fn free(&self) -> u32 {
        self.runtime.var().free()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error closing session: {}", e);
        }
    }
}
