use crate::codepage;
use crate::error;
use crate::lang::ast::FileMode;
use crate::lang::Error;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, Error>;

/// Prefix of the device names handed out for bound files.
pub const BOUND_PREFIX: &str = "@:";

/// A host file made reachable from BASIC under a generated name.
#[derive(Debug)]
pub enum BoundFile {
    Handle(File),
    Path { path: PathBuf, create: bool },
}

/// Where an open file came from, kept so it can be found again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Origin {
    Bound(String),
    Path(PathBuf),
}

/// What a BASIC file name resolved to.
#[derive(Debug)]
pub enum Target {
    File(File),
    Path(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    counter: u32,
    paths: Vec<(String, PathBuf, bool)>,
}

/// ## Drives and bound files
///
/// File names are `[D:]NAME` in the DOS manner. Drive letters map to host
/// directories and names starting with `@:` map to files the host bound.

#[derive(Debug, Default)]
pub struct Devices {
    mount: BTreeMap<char, PathBuf>,
    current_drive: char,
    bound: BTreeMap<String, BoundFile>,
    counter: u32,
}

impl Devices {
    pub fn new(mount: BTreeMap<char, PathBuf>, current_drive: char) -> Devices {
        Devices {
            mount,
            current_drive: current_drive.to_ascii_uppercase(),
            bound: BTreeMap::new(),
            counter: 0,
        }
    }

    fn next_name(&mut self) -> String {
        self.counter += 1;
        format!("{}{:08X}", BOUND_PREFIX, self.counter)
    }

    pub fn bind(&mut self, file: BoundFile) -> String {
        let name = self.next_name();
        debug!("bound {:?} as {}", file, name);
        self.bound.insert(name.clone(), file);
        name
    }

    pub fn is_handle(&self, name: &str) -> bool {
        matches!(self.bound.get(name), Some(BoundFile::Handle(_)))
    }

    /// Release every bound file.
    pub fn unbind_all(&mut self) {
        self.bound.clear();
    }

    /// Path bindings survive a snapshot. Handles belong to this process.
    pub fn state(&self) -> DeviceState {
        let paths = self
            .bound
            .iter()
            .filter_map(|(name, file)| match file {
                BoundFile::Path { path, create } => Some((name.clone(), path.clone(), *create)),
                BoundFile::Handle(_) => None,
            })
            .collect();
        DeviceState {
            counter: self.counter,
            paths,
        }
    }

    pub fn restore(&mut self, state: DeviceState) {
        self.counter = state.counter;
        for (name, path, create) in state.paths {
            self.bound.insert(name, BoundFile::Path { path, create });
        }
    }

    /// Whether a name starts with a mounted drive, like `Z:DATA.TXT`.
    pub fn is_mounted_name(&self, name: &str) -> bool {
        match split_drive(name.trim()) {
            Some((drive, _)) => self.mount.contains_key(&drive),
            None => false,
        }
    }

    /// Find the host file a BASIC file name refers to.
    pub fn resolve(&self, name: &[u8], mode: FileMode) -> Result<(Target, Origin)> {
        let name = codepage::decode(name);
        let name = name.trim();
        if name.is_empty() {
            return Err(error!(BadFileName));
        }
        if name.len() > BOUND_PREFIX.len() && name.starts_with(BOUND_PREFIX) {
            return self.resolve_bound(&name.to_ascii_uppercase(), mode);
        }
        let (drive, rest) = match split_drive(name) {
            Some((drive, rest)) => (drive, rest),
            None => (self.current_drive, name),
        };
        let dir = match self.mount.get(&drive) {
            Some(dir) => dir,
            None => return Err(error!(PathNotFound)),
        };
        let path = find_path(dir, rest, mode)?;
        Ok((Target::Path(path.clone()), Origin::Path(path)))
    }

    fn resolve_bound(&self, name: &str, mode: FileMode) -> Result<(Target, Origin)> {
        let origin = Origin::Bound(name.to_string());
        match self.bound.get(name) {
            Some(BoundFile::Handle(file)) => match file.try_clone() {
                Ok(file) => Ok((Target::File(file), origin)),
                Err(e) => Err(error!(DiskIoError; e.to_string())),
            },
            Some(BoundFile::Path { path, create }) => {
                if !path.exists() && (mode == FileMode::Input || !create) {
                    return Err(error!(FileNotFound));
                }
                Ok((Target::Path(path.clone()), origin))
            }
            None => Err(error!(FileNotFound)),
        }
    }

    /// Reopen the file an origin names, for a restored session.
    pub fn reopen(&self, origin: &Origin) -> Result<Target> {
        match origin {
            Origin::Path(path) => Ok(Target::Path(path.clone())),
            Origin::Bound(name) => match self.bound.get(name) {
                Some(BoundFile::Path { path, .. }) => Ok(Target::Path(path.clone())),
                _ => Err(error!(FileNotFound)),
            },
        }
    }
}

fn split_drive(name: &str) -> Option<(char, &str)> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    if letter.is_ascii_alphabetic() && chars.next() == Some(':') {
        Some((letter.to_ascii_uppercase(), &name[2..]))
    } else {
        None
    }
}

fn find_entry(dir: &Path, component: &str) -> Option<PathBuf> {
    let exact = dir.join(component);
    if exact.exists() {
        return Some(exact);
    }
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().eq_ignore_ascii_case(component) {
            return Some(entry.path());
        }
    }
    None
}

fn find_path(dir: &Path, rest: &str, mode: FileMode) -> Result<PathBuf> {
    let components: Vec<&str> = rest
        .split(|c: char| c == '\\' || c == '/')
        .filter(|c| !c.is_empty())
        .collect();
    let (file_name, dirs) = match components.split_last() {
        Some(split) => split,
        None => return Err(error!(BadFileName)),
    };
    let mut path = dir.to_path_buf();
    for component in dirs {
        if *component == ".." || *component == "." {
            return Err(error!(PathNotFound));
        }
        path = match find_entry(&path, component) {
            Some(p) if p.is_dir() => p,
            _ => return Err(error!(PathNotFound)),
        };
    }
    if *file_name == ".." || *file_name == "." || file_name.contains(':') {
        return Err(error!(BadFileName));
    }
    match find_entry(&path, file_name) {
        Some(p) => Ok(p),
        None if mode == FileMode::Input => Err(error!(FileNotFound)),
        None => Ok(path.join(file_name.to_ascii_uppercase())),
    }
}
