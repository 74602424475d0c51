use crate::codepage;
use serde::{Deserialize, Serialize};

pub const ZONE_WIDTH: usize = 14;

/// ## Console
///
/// Text printed to the screen is collected for the host to drain. Only
/// the cursor is modelled, with rows and columns counted from 1.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Console {
    row: u16,
    col: u16,
    width: u16,
    height: u16,
    #[serde(skip)]
    output: String,
}

impl Default for Console {
    fn default() -> Console {
        Console {
            row: 1,
            col: 1,
            width: 80,
            height: 25,
            output: String::new(),
        }
    }
}

impl Console {
    pub fn row(&self) -> u16 {
        self.row
    }

    pub fn col(&self) -> u16 {
        self.col
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for b in bytes {
            if self.col > self.width {
                self.newline();
            }
            self.output.push(codepage::decode_byte(*b));
            self.col += 1;
        }
    }

    /// Pad to the start of the next print zone, or wrap when no zone fits.
    pub fn comma(&mut self) {
        let col = self.col as usize - 1;
        let next = (col / ZONE_WIDTH + 1) * ZONE_WIDTH;
        if next + ZONE_WIDTH > self.width as usize {
            self.newline();
        } else {
            let pad = vec![b' '; next - col];
            self.write(&pad);
        }
    }

    pub fn newline(&mut self) {
        self.output.push('\n');
        self.col = 1;
        if self.row < self.height - 1 {
            self.row += 1;
        }
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor() {
        let mut console = Console::default();
        assert_eq!((console.row(), console.col()), (1, 1));
        console.write(b"hi");
        assert_eq!(console.col(), 3);
        console.comma();
        assert_eq!(console.col(), 15);
        console.newline();
        assert_eq!((console.row(), console.col()), (2, 1));
        assert_eq!(console.take_output(), "hi            \n");
        assert_eq!(console.take_output(), "");
    }

    #[test]
    fn test_scrolls_at_bottom() {
        let mut console = Console::default();
        for _ in 0..40 {
            console.newline();
        }
        assert_eq!(console.row(), 24);
    }
}
