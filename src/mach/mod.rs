/*!
## Rust Machine Module

This Rust module is a compiler and virtual machine for BASIC, along with
the variable memory, files and devices a running program works with.

*/

pub type Address = usize;

mod array;
mod compile;
mod console;
mod device;
mod file;
mod function;
mod link;
mod listing;
mod opcode;
mod operation;
mod program;
mod random;
mod runtime;
mod stack;
mod state;
mod val;
mod var;

pub use array::Array;
pub use array::DEFAULT_ARRAY_BOUND;
pub use console::Console;
pub use device::{BoundFile, Devices, Origin, Target, BOUND_PREFIX};
pub use file::{FileState, Files, TextFile};
pub use function::Function;
pub use link::Link;
pub use listing::Listing;
pub use listing::MAX_LINE_LEN;
pub use opcode::Opcode;
pub use operation::Operation;
pub use program::Program;
pub use random::Random;
pub use runtime::{Event, Extend, ForFrame, Runtime};
pub use stack::Stack;
pub use state::State;
pub use val::{Kind, Val};
pub use var::Var;
