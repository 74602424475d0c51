use super::{Address, Opcode};
use crate::error;
use crate::lang::{Column, Error, LineNumber};
use std::collections::{BTreeMap, HashMap};

/// ## Line number linker
///
/// Branches to line numbers are compiled with a placeholder address
/// and patched once every line's address is known.

#[derive(Debug, Default)]
pub struct Link {
    symbols: BTreeMap<u16, Address>,
    unlinked: HashMap<Address, (Column, u16)>,
}

impl Link {
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.unlinked.clear();
    }

    pub fn insert(&mut self, line_number: u16, addr: Address) {
        self.symbols.insert(line_number, addr);
    }

    pub fn link_addr_to_line_number(&mut self, addr: Address, col: &Column, line_number: u16) {
        self.unlinked.insert(addr, (col.clone(), line_number));
    }

    /// Forget pending fixups at or beyond `addr`.
    pub fn truncate(&mut self, addr: Address) {
        self.unlinked.retain(|a, _| *a < addr);
    }

    pub fn line_number_for(&self, op_addr: Address) -> LineNumber {
        for (line_number, symbol_addr) in self.symbols.iter().rev() {
            if op_addr >= *symbol_addr {
                return Some(*line_number);
            }
        }
        None
    }

    pub fn link(&mut self, ops: &mut Vec<Opcode>, direct_address: Address) -> Vec<Error> {
        let mut errors: Vec<Error> = vec![];
        let mut unlinked: Vec<(Address, (Column, u16))> = self.unlinked.drain().collect();
        unlinked.sort_by_key(|(addr, _)| *addr);
        for (op_addr, (col, line_number)) in unlinked {
            let error_line = if op_addr < direct_address {
                self.line_number_for(op_addr)
            } else {
                None
            };
            let dest = match self.symbols.get(&line_number) {
                Some(dest) => *dest,
                None => {
                    errors.push(error!(UndefinedLine, error_line, ..&col));
                    continue;
                }
            };
            let patched = match ops.get(op_addr) {
                Some(Opcode::Jump(_)) => Some(Opcode::Jump(dest)),
                Some(Opcode::Gosub(_)) => Some(Opcode::Gosub(dest)),
                Some(Opcode::Run(_)) => Some(Opcode::Run(Some(dest))),
                _ => None,
            };
            match (patched, ops.get_mut(op_addr)) {
                (Some(new_op), Some(op)) => *op = new_op,
                _ => errors.push(error!(InternalError, error_line, ..&col; "LINK FAILURE")),
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_and_undefined() {
        let mut link = Link::default();
        let mut ops = vec![Opcode::Jump(0), Opcode::Gosub(0), Opcode::Ready];
        link.insert(10, 0);
        link.insert(20, 2);
        link.link_addr_to_line_number(0, &(5..7), 20);
        link.link_addr_to_line_number(1, &(8..10), 30);
        let errors = link.link(&mut ops, 3);
        assert_eq!(ops[0], Opcode::Jump(2));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_number(), Some(10));
        assert_eq!(link.line_number_for(2), Some(20));
    }
}
