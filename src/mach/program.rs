use super::compile::{compile, compile_expression};
use super::{Address, Link, Listing, Opcode};
use crate::lang::ast::Expression;
use crate::lang::{Column, Error, Line, LineNumber};
use log::debug;
use std::sync::Arc;

type Result<T> = std::result::Result<T, Error>;

/// ## Compiled program
///
/// The listing compiles to the low addresses and ends with `End`.
/// Direct statements and expressions are compiled after it, replacing
/// whatever direct code was there before.

#[derive(Debug, Default)]
pub struct Program {
    ops: Vec<Opcode>,
    link: Link,
    direct_address: Address,
    indirect_errors: Arc<Vec<Error>>,
}

impl Program {
    pub fn clear(&mut self) {
        self.ops.clear();
        self.link.clear();
        self.direct_address = 0;
        self.indirect_errors = Arc::default();
    }

    pub fn len(&self) -> Address {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn op(&self, addr: Address) -> Option<&Opcode> {
        self.ops.get(addr)
    }

    pub fn push(&mut self, op: Opcode) -> Result<()> {
        self.ops.push(op);
        Ok(())
    }

    pub fn set(&mut self, addr: Address, op: Opcode) {
        if let Some(slot) = self.ops.get_mut(addr) {
            *slot = op;
        }
    }

    pub fn push_goto(&mut self, col: &Column, line_number: u16) -> Result<()> {
        self.link.link_addr_to_line_number(self.ops.len(), col, line_number);
        self.push(Opcode::Jump(0))
    }

    pub fn push_gosub(&mut self, col: &Column, line_number: u16) -> Result<()> {
        self.link.link_addr_to_line_number(self.ops.len(), col, line_number);
        self.push(Opcode::Gosub(0))
    }

    pub fn push_run(&mut self, col: &Column, line_number: Option<u16>) -> Result<()> {
        if let Some(line_number) = line_number {
            self.link.link_addr_to_line_number(self.ops.len(), col, line_number);
        }
        self.push(Opcode::Run(None))
    }

    pub fn direct_address(&self) -> Address {
        self.direct_address
    }

    pub fn is_indirect(&self, addr: Address) -> bool {
        addr < self.direct_address
    }

    pub fn indirect_errors(&self) -> Arc<Vec<Error>> {
        Arc::clone(&self.indirect_errors)
    }

    pub fn line_number_for(&self, addr: Address) -> LineNumber {
        if self.is_indirect(addr) {
            self.link.line_number_for(addr)
        } else {
            None
        }
    }

    pub fn compile_listing(&mut self, listing: &Listing) {
        self.clear();
        let mut errors: Vec<Error> = vec![];
        for line in listing.lines() {
            if let Some(number) = line.number() {
                self.link.insert(number, self.ops.len());
            }
            let result = line
                .ast()
                .and_then(|ast| compile(self, &ast))
                .map_err(|e| e.in_line_number(line.number()));
            if let Err(e) = result {
                errors.push(e);
            }
        }
        if let Err(e) = self.push(Opcode::End) {
            errors.push(e);
        }
        self.direct_address = self.ops.len();
        errors.append(&mut self.link.link(&mut self.ops, self.direct_address));
        debug!(
            "compiled {} ops with {} errors",
            self.direct_address,
            errors.len()
        );
        self.indirect_errors = Arc::new(errors);
    }

    fn rewind(&mut self) {
        self.ops.truncate(self.direct_address);
        self.link.truncate(self.direct_address);
    }

    pub fn compile_direct(&mut self, line: &Line) -> Result<Address> {
        self.rewind();
        let ast = line.ast()?;
        compile(self, &ast)?;
        self.push(Opcode::Ready)?;
        match self.link.link(&mut self.ops, self.direct_address).into_iter().next() {
            Some(e) => Err(e),
            None => Ok(self.direct_address),
        }
    }

    pub fn compile_expression(&mut self, expr: &Expression) -> Result<Address> {
        self.rewind();
        compile_expression(self, expr)?;
        self.push(Opcode::Yield)?;
        Ok(self.direct_address)
    }
}
