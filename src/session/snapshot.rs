use super::error::{Error, Result};
use crate::mach::State;
use crc::crc32;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 8] = b"BASICSES";
const HEADER_LEN: usize = 16;

/// Snapshot format version. Records of any other version are refused.
pub const VERSION: u32 = 2;

fn temp_path(path: &Path) -> Result<PathBuf> {
    match path.file_name() {
        Some(name) => {
            let mut name = name.to_os_string();
            name.push(".tmp");
            Ok(path.with_file_name(name))
        }
        None => Err(Error::resource(
            format!("{} is not a file name", path.display()),
            None,
        )),
    }
}

/// Encode a state record: magic, version, CRC-32 of the payload, payload.
pub fn encode(state: &State) -> Result<Vec<u8>> {
    let payload = bincode::serialize(state)
        .map_err(|e| Error::resource(format!("cannot encode snapshot: {}", e), None))?;
    let mut record = Vec::with_capacity(HEADER_LEN + payload.len());
    record.extend_from_slice(MAGIC);
    record.extend_from_slice(&VERSION.to_le_bytes());
    record.extend_from_slice(&crc32::checksum_ieee(&payload).to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

pub fn decode(record: &[u8]) -> Result<State> {
    if record.len() < HEADER_LEN || &record[..8] != MAGIC {
        return Err(Error::resource("not a session snapshot", None));
    }
    let word = |at: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&record[at..at + 4]);
        u32::from_le_bytes(bytes)
    };
    let version = word(8);
    if version != VERSION {
        return Err(Error::resource(
            format!("snapshot version {} is not supported", version),
            None,
        ));
    }
    let payload = &record[HEADER_LEN..];
    if crc32::checksum_ieee(payload) != word(12) {
        return Err(Error::resource("snapshot checksum mismatch", None));
    }
    bincode::deserialize(payload)
        .map_err(|e| Error::resource(format!("cannot decode snapshot: {}", e), None))
}

/// Write the record next to its destination and move it into place.
pub fn write(path: &Path, state: &State) -> Result<()> {
    let record = encode(state)?;
    let temp = temp_path(path)?;
    if let Err(e) = fs::write(&temp, &record) {
        let _ = fs::remove_file(&temp);
        return Err(Error::resource(
            format!("cannot write {}", temp.display()),
            Some(e),
        ));
    }
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(Error::resource(
            format!("cannot write {}", path.display()),
            Some(e),
        ));
    }
    debug!("wrote {} byte snapshot to {}", record.len(), path.display());
    Ok(())
}

pub fn read(path: &Path) -> Result<State> {
    let record = fs::read(path)
        .map_err(|e| Error::resource(format!("cannot read {}", path.display()), Some(e)))?;
    decode(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::Runtime;

    #[test]
    fn test_rejects_damage() {
        let mut runtime = Runtime::default();
        runtime.enter("10 a=1");
        let record = encode(&runtime.capture().unwrap()).unwrap();
        assert!(decode(&record).is_ok());

        let mut bad_version = record.clone();
        bad_version[8] = 2;
        assert!(matches!(decode(&bad_version), Err(Error::Resource { .. })));

        let mut bad_payload = record.clone();
        let last = bad_payload.len() - 1;
        bad_payload[last] ^= 0xFF;
        assert!(matches!(decode(&bad_payload), Err(Error::Resource { .. })));

        assert!(decode(b"BASIC").is_err());
    }

    #[test]
    fn test_write_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.bin");
        let state = Runtime::default().capture().unwrap();
        write(&path, &state).unwrap();
        write(&path, &state).unwrap();
        assert!(read(&path).is_ok());
        assert!(!dir.path().join("session.bin.tmp").exists());
    }
}
