use super::console::ZONE_WIDTH;
use super::device::{Origin, Target};
use super::{Function, Val};
use crate::error;
use crate::lang::ast::FileMode;
use crate::lang::Error;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

type Result<T> = std::result::Result<T, Error>;

const BUFFER_SIZE: usize = 128;
const EOF_MARKER: u8 = 0x1A;

fn io_error(e: std::io::Error) -> Error {
    error!(DiskIoError; e.to_string())
}

/// Everything needed to pick an open file back up in another process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileState {
    pub number: u16,
    pub mode: FileMode,
    pub origin: Origin,
    pub position: u64,
    pub buffer: Vec<u8>,
    pub col: u16,
}

/// ## Text file
///
/// Output is buffered and written in blocks. Input files are read whole
/// when opened and consumed field by field.

#[derive(Debug)]
pub struct TextFile {
    file: File,
    mode: FileMode,
    origin: Origin,
    buffer: Vec<u8>,
    col: u16,
    flushed: u64,
    data: Vec<u8>,
    pos: usize,
}

impl TextFile {
    pub fn open(target: Target, origin: Origin, mode: FileMode) -> Result<TextFile> {
        let file = match target {
            Target::File(file) => {
                if mode == FileMode::Output {
                    file.set_len(0).map_err(io_error)?;
                }
                file
            }
            Target::Path(path) => {
                let mut options = OpenOptions::new();
                match mode {
                    FileMode::Input => options.read(true),
                    FileMode::Output => options.write(true).create(true).truncate(true),
                    FileMode::Append => options.read(true).write(true).create(true),
                };
                match options.open(&path) {
                    Ok(file) => file,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(error!(FileNotFound))
                    }
                    Err(e) => return Err(io_error(e)),
                }
            }
        };
        let mut text_file = TextFile {
            file,
            mode,
            origin,
            buffer: vec![],
            col: 1,
            flushed: 0,
            data: vec![],
            pos: 0,
        };
        match mode {
            FileMode::Input => {
                let file = &mut text_file.file;
                file.seek(SeekFrom::Start(0)).map_err(io_error)?;
                file.read_to_end(&mut text_file.data).map_err(io_error)?;
            }
            FileMode::Output => {
                let file = &mut text_file.file;
                text_file.flushed = file.seek(SeekFrom::Start(0)).map_err(io_error)?;
            }
            FileMode::Append => {
                let file = &mut text_file.file;
                text_file.flushed = file.seek(SeekFrom::End(0)).map_err(io_error)?;
                text_file.drop_eof_marker()?;
            }
        }
        Ok(text_file)
    }

    /// Appending continues over an old end of file marker.
    fn drop_eof_marker(&mut self) -> Result<()> {
        if self.flushed == 0 {
            return Ok(());
        }
        self.file
            .seek(SeekFrom::Start(self.flushed - 1))
            .map_err(io_error)?;
        let mut last = [0u8];
        self.file.read_exact(&mut last).map_err(io_error)?;
        if last[0] == EOF_MARKER {
            self.flushed -= 1;
            self.file.set_len(self.flushed).map_err(io_error)?;
        }
        self.file
            .seek(SeekFrom::Start(self.flushed))
            .map_err(io_error)?;
        Ok(())
    }

    /// Pick up a file from a snapshot without truncating it.
    pub fn reopen(target: Target, state: &FileState) -> Result<TextFile> {
        let mut text_file = match state.mode {
            FileMode::Input => TextFile::open(target, state.origin.clone(), FileMode::Input)?,
            _ => {
                let file = match target {
                    Target::File(file) => file,
                    Target::Path(path) => OpenOptions::new()
                        .write(true)
                        .create(true)
                        .open(&path)
                        .map_err(io_error)?,
                };
                TextFile {
                    file,
                    mode: state.mode,
                    origin: state.origin.clone(),
                    buffer: vec![],
                    col: 1,
                    flushed: 0,
                    data: vec![],
                    pos: 0,
                }
            }
        };
        match state.mode {
            FileMode::Input => text_file.pos = state.position as usize,
            _ => {
                text_file
                    .file
                    .seek(SeekFrom::Start(state.position))
                    .map_err(io_error)?;
                text_file.flushed = state.position;
                text_file.buffer = state.buffer.clone();
                text_file.col = state.col;
            }
        }
        Ok(text_file)
    }

    pub fn state(&self, number: u16) -> FileState {
        let position = match self.mode {
            FileMode::Input => self.pos as u64,
            _ => self.flushed,
        };
        FileState {
            number,
            mode: self.mode,
            origin: self.origin.clone(),
            position,
            buffer: self.buffer.clone(),
            col: self.col,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.file.write_all(&self.buffer).map_err(io_error)?;
        self.flushed += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.mode == FileMode::Input {
            return Err(error!(BadFileMode));
        }
        for b in bytes {
            self.buffer.push(*b);
            match b {
                b'\r' | b'\n' => self.col = 1,
                _ => self.col = self.col.saturating_add(1),
            }
        }
        if self.buffer.len() >= BUFFER_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    pub fn newline(&mut self) -> Result<()> {
        self.write(b"\r\n")
    }

    pub fn comma(&mut self) -> Result<()> {
        let col = self.col as usize - 1;
        let next = (col / ZONE_WIDTH + 1) * ZONE_WIDTH;
        self.write(&vec![b' '; next - col])
    }

    /// Flush and mark the end of an output file.
    pub fn close(mut self) -> Result<()> {
        if self.mode != FileMode::Input {
            self.buffer.push(EOF_MARKER);
            self.flush()?;
        }
        debug!("closed {:?}", self.origin);
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        match self.data.get(self.pos) {
            Some(&EOF_MARKER) | None => None,
            Some(b) => Some(*b),
        }
    }

    pub fn eof(&self) -> Result<bool> {
        if self.mode != FileMode::Input {
            return Err(error!(BadFileMode));
        }
        Ok(self.peek().is_none())
    }

    /// Read one comma or line separated field.
    pub fn read_field(&mut self, is_string: bool) -> Result<Val> {
        if self.mode != FileMode::Input {
            return Err(error!(BadFileMode));
        }
        while let Some(b) = self.peek() {
            match b {
                b' ' => self.pos += 1,
                b'\r' | b'\n' if !is_string => self.pos += 1,
                _ => break,
            }
        }
        if self.peek().is_none() {
            return Err(error!(InputPastEnd));
        }
        let mut field: Vec<u8> = vec![];
        if is_string && self.peek() == Some(b'"') {
            self.pos += 1;
            while let Some(b) = self.peek() {
                self.pos += 1;
                if b == b'"' {
                    break;
                }
                field.push(b);
            }
            while let Some(b) = self.peek() {
                if b == b',' || b == b'\r' || b == b'\n' {
                    break;
                }
                self.pos += 1;
            }
        } else {
            while let Some(b) = self.peek() {
                if b == b',' || b == b'\r' || b == b'\n' || (b == b' ' && !is_string) {
                    break;
                }
                field.push(b);
                self.pos += 1;
            }
            while field.last() == Some(&b' ') {
                field.pop();
            }
            if !is_string {
                while self.peek() == Some(b' ') {
                    self.pos += 1;
                }
            }
        }
        match self.peek() {
            Some(b',') | Some(b'\n') => self.pos += 1,
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            _ => {}
        }
        if is_string {
            Ok(Val::from_bytes(&field))
        } else {
            Ok(Function::parse_number(&field))
        }
    }
}

/// ## Open file table
///
/// File numbers run from 1 to the configured maximum.

#[derive(Debug)]
pub struct Files {
    max_files: usize,
    open: BTreeMap<u16, TextFile>,
}

impl Files {
    pub fn new(max_files: usize) -> Files {
        Files {
            max_files,
            open: BTreeMap::new(),
        }
    }

    /// Validate a file number given as a BASIC value.
    pub fn number(&self, val: Val) -> Result<u16> {
        let n = match i16::try_from(val) {
            Ok(n) => n,
            Err(_) => return Err(error!(BadFileNumber)),
        };
        if n < 1 || n as usize > self.max_files {
            return Err(error!(BadFileNumber));
        }
        Ok(n as u16)
    }

    pub fn is_open(&self, number: u16) -> bool {
        self.open.contains_key(&number)
    }

    pub fn insert(&mut self, number: u16, file: TextFile) -> Result<()> {
        if self.is_open(number) {
            return Err(error!(FileAlreadyOpen));
        }
        debug!("opened #{} {:?}", number, file.origin());
        self.open.insert(number, file);
        Ok(())
    }

    pub fn get(&mut self, number: u16) -> Result<&mut TextFile> {
        match self.open.get_mut(&number) {
            Some(file) => Ok(file),
            None => Err(error!(BadFileNumber)),
        }
    }

    pub fn close(&mut self, number: u16) -> Result<()> {
        match self.open.remove(&number) {
            Some(file) => file.close(),
            None => Ok(()),
        }
    }

    /// Close every file, reporting the first failure.
    pub fn close_all(&mut self) -> Result<()> {
        let mut result = Ok(());
        let open = std::mem::take(&mut self.open);
        for (_, file) in open {
            if let Err(e) = file.close() {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    pub fn states(&self) -> Vec<FileState> {
        self.open
            .iter()
            .map(|(number, file)| file.state(*number))
            .collect()
    }

    pub fn origins(&self) -> impl Iterator<Item = &Origin> {
        self.open.values().map(|f| f.origin())
    }

    /// Let go of the host files without flushing or marking them.
    pub fn detach(&mut self) {
        self.open.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(path: &std::path::Path) -> TextFile {
        TextFile::open(
            Target::Path(path.to_path_buf()),
            Origin::Path(path.to_path_buf()),
            FileMode::Output,
        )
        .unwrap()
    }

    #[test]
    fn test_output_crlf_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("OUT.TXT");
        let mut file = output(&path);
        file.write(&Val::Integer(1).to_print()).unwrap();
        file.newline().unwrap();
        file.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b" 1 \r\n\x1a".to_vec());
    }

    #[test]
    fn test_reopen_keeps_pending_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("OUT.TXT");
        let mut file = output(&path);
        file.write(b"hello").unwrap();
        let state = file.state(1);
        drop(file);
        assert_eq!(std::fs::read(&path).unwrap(), b"".to_vec());
        let mut file = TextFile::reopen(Target::Path(path.clone()), &state).unwrap();
        file.newline().unwrap();
        file.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello\r\n\x1a".to_vec());
    }

    #[test]
    fn test_read_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IN.TXT");
        std::fs::write(&path, b" 1 , 2.5\r\n\"a,b\",xyz \r\n\x1a").unwrap();
        let mut file = TextFile::open(
            Target::Path(path.clone()),
            Origin::Path(path),
            FileMode::Input,
        )
        .unwrap();
        assert_eq!(file.read_field(false), Ok(Val::Single(1.0)));
        assert_eq!(file.read_field(false), Ok(Val::Single(2.5)));
        assert_eq!(file.read_field(true), Ok(Val::from_bytes(b"a,b")));
        assert_eq!(file.eof(), Ok(false));
        assert_eq!(file.read_field(true), Ok(Val::from_bytes(b"xyz")));
        assert_eq!(file.eof(), Ok(true));
        assert!(file.read_field(false).is_err());
    }

    #[test]
    fn test_file_numbers() {
        let files = Files::new(3);
        assert_eq!(files.number(Val::Integer(3)), Ok(3));
        assert!(files.number(Val::Integer(0)).is_err());
        assert!(files.number(Val::Integer(4)).is_err());
    }
}
