//! # BASIC Session
//!
//! The BASIC programming language as it was in the 8-bit era, embedded in
//! a host program.
//!
//! A [`Session`](session::Session) runs statements and programs, lets the
//! host read and write BASIC variables and arrays, evaluate expressions,
//! call host functions from BASIC as `_NAME(...)`, hand BASIC host files
//! to `OPEN`, and suspend the whole machine to disk to resume it later,
//! possibly in a different process.
//!
//! ```
//! use basic::session::{HostValue, Outcome, Session};
//!
//! let mut session = Session::new();
//! session.execute("10 FOR I = 1 TO 3: S = S + I: NEXT\n20 SYSTEM").unwrap();
//! assert_eq!(session.execute("RUN").unwrap(), Outcome::System);
//! assert_eq!(session.get_variable("S!").unwrap(), HostValue::Float(6.0));
//! ```
//!
//! Strings inside BASIC are bytes in code page 437. Host text is encoded
//! on the way in and decoded on the way out.

pub mod codepage;
pub mod config;
pub mod lang;
pub mod mach;
pub mod session;

pub use config::Config;
pub use session::{
    BindTarget, DeviceName, Error, Extension, HostKind, HostValue, Outcome, Session,
    SessionBuilder,
};
