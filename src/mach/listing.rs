use crate::error;
use crate::lang::{Error, Line, LineNumber};
use std::collections::{btree_map::Values, BTreeMap};

pub const MAX_LINE_LEN: usize = 255;

/// ## Program listing
///
/// The numbered lines of the stored program, in order.

#[derive(Debug, Clone, Default)]
pub struct Listing {
    source: BTreeMap<LineNumber, Line>,
}

impl Listing {
    pub fn insert(&mut self, line: Line) -> Option<Line> {
        self.source.insert(line.number(), line)
    }

    pub fn remove(&mut self, ln: LineNumber) -> Option<Line> {
        self.source.remove(&ln)
    }

    pub fn lines(&self) -> Values<'_, LineNumber, Line> {
        self.source.values()
    }

    /// The source text of every line, for writing the listing out.
    pub fn sources(&self) -> Vec<String> {
        self.lines().map(|l| l.source().to_string()).collect()
    }

    /// Load one line of a listing, as when a snapshot is restored.
    pub fn load_str(&mut self, line: &str) -> Result<(), Error> {
        if line.len() > MAX_LINE_LEN {
            return Err(error!(LineBufferOverflow));
        }
        let line = Line::new(line);
        if line.is_direct() {
            return Err(error!(SyntaxError; "DIRECT STATEMENT IN LISTING"));
        }
        if line.is_empty() {
            self.remove(line.number());
        } else {
            self.insert(line);
        }
        Ok(())
    }
}
